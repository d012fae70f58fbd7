mod place_api;
mod user_api;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use oso::Oso;

use crate::{
    api::API,
    auth::{authorizor, Requester},
    error::{forbidden_error, Error},
    external::GeoResolver,
    store::Store,
    uploads::ImageStore,
};

pub struct Engine {
    store: Arc<dyn Store>,
    geocoder: Arc<dyn GeoResolver>,
    images: Arc<ImageStore>,
    authorizor: Oso,
}

impl Engine {
    #[tracing::instrument(name = "Engine::new", skip_all)]
    pub fn new(
        store: Arc<dyn Store>,
        geocoder: Arc<dyn GeoResolver>,
        images: Arc<ImageStore>,
    ) -> Result<Self, Error> {
        Ok(Self {
            store,
            geocoder,
            images,
            authorizor: authorizor::new()?,
        })
    }
}

impl Engine {
    pub fn authorize<Resource>(
        &self,
        requester: Requester,
        action: &'static str,
        resource: Resource,
    ) -> Result<(), Error>
    where
        Resource: oso::ToPolar,
    {
        if self.authorizor.is_allowed(requester, action, resource)? {
            return Ok(());
        }

        tracing::info!(requester = %requester.id, action, "request denied");

        Err(forbidden_error(&format!(
            "You are not allowed to {} this place.",
            action
        )))
    }
}

impl API for Engine {}
