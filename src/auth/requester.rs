use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRequest, RequestParts};
use axum::http::header;
use oso::PolarClass;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::TokenVerifier;
use crate::error::{internal_error, unauthenticated_error, Error};

/// Identity of the caller of a mutating operation, as established from its bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub id: Uuid,
}

impl Requester {
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }
}

impl PolarClass for Requester {
    fn get_polar_class_builder() -> oso::ClassBuilder<Requester> {
        oso::Class::builder()
            .name("Requester")
            .add_attribute_getter("id", |recv: &Requester| recv.id.to_string())
    }

    fn get_polar_class() -> oso::Class {
        let builder = Requester::get_polar_class_builder();
        builder.build()
    }
}

#[async_trait]
impl<B> FromRequest<B> for Requester
where
    B: Send,
{
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let verifier = req
            .extensions()
            .get::<Arc<TokenVerifier>>()
            .cloned()
            .ok_or_else(|| internal_error("token verifier extension missing"))?;

        // tokens will start with "Bearer " so we need to remove that
        let token = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(unauthenticated_error)?;

        let claims = verifier.verify(token).ok_or_else(|| {
            tracing::info!("rejecting request with invalid token");
            unauthenticated_error()
        })?;

        Ok(Requester::new(claims.user_id))
    }
}
