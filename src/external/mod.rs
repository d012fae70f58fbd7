pub mod google_maps;

use async_trait::async_trait;

use crate::entities::Coordinates;
use crate::error::Error;

pub use google_maps::GoogleGeocoder;

/// Resolves a free-text address to coordinates. Implementations fail closed:
/// anything short of a usable result is an error.
#[async_trait]
pub trait GeoResolver: Send + Sync {
    async fn resolve(&self, address: &str) -> Result<Coordinates, Error>;
}
