use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::Requester;
use crate::entities::{NewPlace, Place, PlaceChanges, User};
use crate::error::Error;

#[async_trait]
pub trait PlaceAPI {
    async fn find_place(&self, id: Uuid) -> Result<Place, Error>;

    async fn find_places_by_owner(&self, user_id: Uuid) -> Result<Vec<Place>, Error>;

    async fn create_place(&self, requester: Requester, params: NewPlace) -> Result<Place, Error>;

    async fn update_place(
        &self,
        requester: Requester,
        id: Uuid,
        changes: PlaceChanges,
    ) -> Result<Place, Error>;

    async fn delete_place(&self, requester: Requester, id: Uuid) -> Result<(), Error>;
}

#[async_trait]
pub trait UserAPI {
    async fn list_users(&self) -> Result<Vec<User>, Error>;
}

pub trait API: PlaceAPI + UserAPI {}
