use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Extension, Json, Multipart, Path};
use axum::http::{header, StatusCode};
use serde::{Deserialize, Serialize};

use crate::auth::Requester;
use crate::entities::{NewPlace, Place, PlaceChanges};
use crate::error::{invalid_input_error, not_found_error, Error};
use crate::server::handlers::parse_id;
use crate::server::DynAPI;
use crate::uploads::{ImageStore, MAX_IMAGE_BYTES};

const MAX_TEXT_FIELD_BYTES: usize = 10_000;

#[derive(Serialize, Deserialize)]
pub struct PlaceResponse {
    place: Place,
}

#[derive(Serialize, Deserialize)]
pub struct PlacesResponse {
    places: Vec<Place>,
}

#[derive(Serialize, Deserialize)]
pub struct MessageResponse {
    message: String,
}

struct ImageField {
    content_type: String,
    data: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
pub struct UpdateParams {
    title: String,
    description: String,
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    Path(place_id): Path<String>,
) -> Result<Json<PlaceResponse>, Error> {
    let id = parse_id(&place_id, "Could not find a place for the provided id.")?;

    let place = api.find_place(id).await?;

    Ok(PlaceResponse { place }.into())
}

pub async fn find_by_owner(
    Extension(api): Extension<DynAPI>,
    Path((key, user_id)): Path<(String, String)>,
) -> Result<Json<PlacesResponse>, Error> {
    if key != "user" {
        return Err(not_found_error("Could not find the requested resource."));
    }

    let id = parse_id(&user_id, "Could not find a user for the provided id.")?;

    let places = api.find_places_by_owner(id).await?;

    Ok(PlacesResponse { places }.into())
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    Extension(images): Extension<Arc<ImageStore>>,
    requester: Requester,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<PlaceResponse>), Error> {
    let invalid_body = |_: MultipartError| invalid_input_error("Invalid multipart body.");

    let mut title = None;
    let mut description = None;
    let mut address = None;
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(invalid_body)? {
        let name = field.name().map(str::to_owned);

        match name.as_deref() {
            Some("title") => title = Some(read_text(field).await?),
            Some("description") => description = Some(read_text(field).await?),
            Some("address") => address = Some(read_text(field).await?),
            Some("image") => {
                let content_type = field
                    .headers()
                    .get(header::CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or_default()
                    .to_owned();
                let data = read_limited(field, MAX_IMAGE_BYTES)
                    .await?
                    .ok_or_else(|| invalid_input_error("Image must be between 1 and 500000 bytes."))?;
                image = Some(ImageField { content_type, data });
            }
            _ => return Err(invalid_input_error("Unexpected field in multipart body.")),
        }
    }

    let image = image.ok_or_else(|| invalid_input_error("An image is required."))?;
    let image = images.save(&image.content_type, &image.data).await?;

    let params = NewPlace {
        title: title.unwrap_or_default(),
        description: description.unwrap_or_default(),
        address: address.unwrap_or_default(),
        image,
    };

    let place = api.create_place(requester, params).await?;

    Ok((StatusCode::CREATED, PlaceResponse { place }.into()))
}

/// Reads a multipart field chunk by chunk. Returns `None` as soon as the field
/// grows past `limit`, leaving the rest of the body unread.
async fn read_limited(mut field: Field<'_>, limit: usize) -> Result<Option<Vec<u8>>, Error> {
    let mut data = Vec::new();

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|_| invalid_input_error("Invalid multipart body."))?
    {
        if data.len() + chunk.len() > limit {
            tracing::debug!(limit, "multipart field too large");
            return Ok(None);
        }
        data.extend_from_slice(&chunk);
    }

    Ok(Some(data))
}

async fn read_text(field: Field<'_>) -> Result<String, Error> {
    let data = read_limited(field, MAX_TEXT_FIELD_BYTES)
        .await?
        .ok_or_else(|| invalid_input_error("Invalid inputs passed, please check your data."))?;

    String::from_utf8(data).map_err(|_| invalid_input_error("Invalid multipart body."))
}

pub async fn update(
    Extension(api): Extension<DynAPI>,
    requester: Requester,
    Path(place_id): Path<String>,
    params: Result<Json<UpdateParams>, JsonRejection>,
) -> Result<Json<PlaceResponse>, Error> {
    let id = parse_id(&place_id, "Could not find a place for the provided id.")?;

    let Json(params) = params
        .map_err(|_| invalid_input_error("Invalid inputs passed, please check your data."))?;

    let changes = PlaceChanges {
        title: params.title,
        description: params.description,
    };

    let place = api.update_place(requester, id, changes).await?;

    Ok(PlaceResponse { place }.into())
}

pub async fn delete(
    Extension(api): Extension<DynAPI>,
    requester: Requester,
    Path(place_id): Path<String>,
) -> Result<Json<MessageResponse>, Error> {
    let id = parse_id(&place_id, "Could not find a place for the provided id.")?;

    api.delete_place(requester, id).await?;

    Ok(MessageResponse {
        message: "Deleted place.".into(),
    }
    .into())
}
