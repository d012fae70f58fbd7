use axum::extract::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::User;
use crate::error::Error;
use crate::server::DynAPI;

/// A user as shown to other users: everything but the password.
#[derive(Serialize, Deserialize)]
pub struct Profile {
    id: Uuid,
    name: String,
    email: String,
    image: String,
    places: Vec<Uuid>,
}

impl From<User> for Profile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            image: user.image,
            places: user.places,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct UsersResponse {
    users: Vec<Profile>,
}

pub async fn list(Extension(api): Extension<DynAPI>) -> Result<Json<UsersResponse>, Error> {
    let users = api.list_users().await?;

    Ok(UsersResponse {
        users: users.into_iter().map(Profile::from).collect(),
    }
    .into())
}
