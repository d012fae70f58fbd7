mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};

use crate::server::handlers::{places, users};
use crate::{
    api::API,
    auth::TokenVerifier,
    error::{internal_error, Error},
    uploads::ImageStore,
};

pub type DynAPI = Arc<dyn API + Send + Sync>;

pub fn router(api: DynAPI, images: Arc<ImageStore>, tokens: Arc<TokenVerifier>) -> Router {
    Router::new()
        .route("/api/places", post(places::create))
        // `user` sits where a place id goes; both routes share the parameter name
        .route("/api/places/:key/:user_id", get(places::find_by_owner))
        .route(
            "/api/places/:key",
            get(places::find)
                .patch(places::update)
                .delete(places::delete),
        )
        .route("/api/users", get(users::list))
        .layer(Extension(api))
        .layer(Extension(images))
        .layer(Extension(tokens))
}

pub async fn serve(addr: SocketAddr, app: Router) -> Result<(), Error> {
    let server = axum::Server::try_bind(&addr).map_err(internal_error)?;

    tracing::info!("listening on {}", addr);

    server
        .serve(app.into_make_service())
        .await
        .map_err(internal_error)
}
