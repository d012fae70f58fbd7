use std::sync::Arc;

use waypoint::auth::TokenVerifier;
use waypoint::config::Config;
use waypoint::engine::Engine;
use waypoint::error::Error;
use waypoint::external::GoogleGeocoder;
use waypoint::server;
use waypoint::store::PgStore;
use waypoint::uploads::ImageStore;

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;

    let store = PgStore::new(&config.database_url, config.database_max_connections).await?;
    let geocoder = GoogleGeocoder::new(
        config.google_maps_api_base.clone(),
        config.google_maps_api_key.clone(),
    );
    let images = Arc::new(ImageStore::new(&config.upload_dir).await?);
    let tokens = Arc::new(TokenVerifier::new(&config.jwt_secret, &config.jwt_issuer)?);

    let engine = Engine::new(Arc::new(store), Arc::new(geocoder), images.clone())?;

    let app = server::router(Arc::new(engine), images, tokens);

    server::serve(config.bind_address, app).await
}
