mod memory;
mod postgres;

pub use memory::{FailPoint, MemoryStore};
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::entities::{Place, User};
use crate::error::Error;

/// Document store holding the `places` and `users` collections.
///
/// Reads and single-document writes go straight to the store. Anything that
/// touches both collections has to go through a [`UnitOfWork`] obtained from
/// [`Store::begin`].
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_place(&self, id: Uuid) -> Result<Option<Place>, Error>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, Error>;

    /// Resolves the given ids in order. Ids without a document are skipped.
    async fn find_places(&self, ids: &[Uuid]) -> Result<Vec<Place>, Error>;

    async fn list_users(&self) -> Result<Vec<User>, Error>;

    async fn update_place(&self, place: &Place) -> Result<(), Error>;

    async fn begin(&self) -> Result<Box<dyn UnitOfWork + '_>, Error>;
}

/// A group of writes across both collections that commits or rolls back as one.
///
/// Dropping a unit of work without calling [`UnitOfWork::commit`] discards every
/// staged write.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn insert_place(&mut self, place: &Place) -> Result<(), Error>;

    async fn remove_place(&mut self, id: Uuid) -> Result<(), Error>;

    /// Appends `place_id` to the `places` of `user_id`.
    async fn link_place(&mut self, user_id: Uuid, place_id: Uuid) -> Result<(), Error>;

    /// Removes `place_id` from the `places` of `user_id`.
    async fn unlink_place(&mut self, user_id: Uuid, place_id: Uuid) -> Result<(), Error>;

    async fn commit(self: Box<Self>) -> Result<(), Error>;
}
