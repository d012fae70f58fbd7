use super::Engine;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    api::PlaceAPI,
    auth::Requester,
    entities::{NewPlace, Place, PlaceChanges, User},
    error::{
        create_failed_error, delete_failed_error, geocoding_failed_error, no_places_error,
        not_found_error, store_unavailable_error, update_failed_error,
        user_lookup_failed_error, Error,
    },
};

const PLACE_NOT_FOUND: &str = "Could not find a place for the provided id.";
const USER_NOT_FOUND: &str = "Could not find a user for the provided id.";

#[async_trait]
impl PlaceAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn find_place(&self, id: Uuid) -> Result<Place, Error> {
        self.store
            .find_place(id)
            .await
            .map_err(|err| {
                tracing::error!(%err, "place lookup failed");
                store_unavailable_error("Something went wrong, could not find a place.")
            })?
            .ok_or_else(|| not_found_error(PLACE_NOT_FOUND))
    }

    #[tracing::instrument(skip(self))]
    async fn find_places_by_owner(&self, user_id: Uuid) -> Result<Vec<Place>, Error> {
        let unavailable = |err: Error| {
            tracing::error!(%err, "owner lookup failed");
            store_unavailable_error("Fetching places failed, please try again later.")
        };

        let user = self
            .store
            .find_user(user_id)
            .await
            .map_err(unavailable)?
            .ok_or_else(|| not_found_error(USER_NOT_FOUND))?;

        if user.places.is_empty() {
            return Err(no_places_error());
        }

        let places = self
            .store
            .find_places(&user.places)
            .await
            .map_err(unavailable)?;

        if places.is_empty() {
            return Err(no_places_error());
        }

        Ok(places)
    }

    #[tracing::instrument(skip(self))]
    async fn create_place(&self, requester: Requester, params: NewPlace) -> Result<Place, Error> {
        let image = params.image.clone();

        let result = self.try_create_place(requester, params).await;

        // the upload is useless once creation failed
        if result.is_err() && !image.is_empty() {
            self.images.discard(image);
        }

        result
    }

    #[tracing::instrument(skip(self))]
    async fn update_place(
        &self,
        requester: Requester,
        id: Uuid,
        changes: PlaceChanges,
    ) -> Result<Place, Error> {
        changes.validate()?;

        let mut place = self
            .store
            .find_place(id)
            .await
            .map_err(|err| {
                tracing::error!(%err, "place lookup failed");
                store_unavailable_error("Something went wrong, could not update place.")
            })?
            .ok_or_else(|| not_found_error(PLACE_NOT_FOUND))?;

        self.authorize(requester, "update", place.clone())?;

        place.apply(changes);

        self.store.update_place(&place).await.map_err(|err| {
            tracing::error!(%err, "place update failed");
            update_failed_error()
        })?;

        Ok(place)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_place(&self, requester: Requester, id: Uuid) -> Result<(), Error> {
        let unavailable = |err: Error| {
            tracing::error!(%err, "place lookup failed");
            store_unavailable_error("Something went wrong, could not delete place.")
        };

        let place = self
            .store
            .find_place(id)
            .await
            .map_err(unavailable)?
            .ok_or_else(|| not_found_error(PLACE_NOT_FOUND))?;

        self.authorize(requester, "delete", place.clone())?;

        let creator = self
            .store
            .find_user(place.creator)
            .await
            .map_err(unavailable)?
            .ok_or_else(|| {
                tracing::error!(creator = %place.creator, "place references a missing user");
                delete_failed_error()
            })?;

        self.remove_place_of(&creator, &place)
            .await
            .map_err(|err| {
                tracing::error!(%err, "delete transaction failed");
                delete_failed_error()
            })?;

        tracing::info!(place_id = %place.id, "place deleted");

        self.images.discard(place.image);

        Ok(())
    }
}

impl Engine {
    async fn try_create_place(&self, requester: Requester, params: NewPlace) -> Result<Place, Error> {
        params.validate()?;

        let location = self
            .geocoder
            .resolve(&params.address)
            .await
            .map_err(|err| {
                if err.is_geocoding_error() {
                    err
                } else {
                    geocoding_failed_error(err)
                }
            })?;

        let place = Place::new(params, location, requester.id);

        let user = self
            .store
            .find_user(requester.id)
            .await
            .map_err(|err| {
                tracing::error!(%err, "creator lookup failed");
                user_lookup_failed_error()
            })?
            .ok_or_else(|| not_found_error(USER_NOT_FOUND))?;

        self.add_place_to(&user, &place).await.map_err(|err| {
            tracing::error!(%err, "create transaction failed");
            create_failed_error()
        })?;

        tracing::info!(place_id = %place.id, creator = %user.id, "place created");

        Ok(place)
    }

    /// Inserts `place` and links it to `user` in one unit of work.
    async fn add_place_to(&self, user: &User, place: &Place) -> Result<(), Error> {
        let mut tx = self.store.begin().await?;

        tx.insert_place(place).await?;
        tx.link_place(user.id, place.id).await?;

        tx.commit().await
    }

    /// Removes `place` and unlinks it from `user` in one unit of work.
    async fn remove_place_of(&self, user: &User, place: &Place) -> Result<(), Error> {
        let mut tx = self.store.begin().await?;

        tx.remove_place(place.id).await?;
        tx.unlink_place(user.id, place.id).await?;

        tx.commit().await
    }
}
