use super::Engine;

use async_trait::async_trait;

use crate::{
    api::UserAPI,
    entities::User,
    error::{store_unavailable_error, Error},
};

#[async_trait]
impl UserAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn list_users(&self) -> Result<Vec<User>, Error> {
        self.store.list_users().await.map_err(|err| {
            tracing::error!(%err, "listing users failed");
            store_unavailable_error("Fetching users failed, please try again later.")
        })
    }
}
