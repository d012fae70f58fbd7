use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    entities::Coordinates,
    error::{address_not_found_error, geocoding_failed_error, Error},
    external::GeoResolver,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub formatted_address: String,
    pub geometry: Geometry,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Geometry {
    pub location: Coordinates,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Response<T> {
    status: String,
    results: Option<T>,
    error_message: Option<String>,
}

pub struct GoogleGeocoder {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(api_base: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base,
            api_key,
        }
    }
}

#[async_trait]
impl GeoResolver for GoogleGeocoder {
    #[tracing::instrument(skip(self))]
    async fn resolve(&self, address: &str) -> Result<Coordinates, Error> {
        let url = format!("https://{}/maps/api/geocode/json", self.api_base);

        let res = self
            .client
            .get(url)
            .query(&[("key", self.api_key.as_str())])
            .query(&[("address", address)])
            .send()
            .await?;

        let status_code = res.status().as_u16();

        if status_code != 200 {
            return Err(geocoding_failed_error(format!("http status {}", status_code)));
        }

        let data: Response<Vec<GeocodeResult>> = res.json().await?;

        coordinates_from_response(data)
    }
}

fn coordinates_from_response(data: Response<Vec<GeocodeResult>>) -> Result<Coordinates, Error> {
    match data.status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" => return Err(address_not_found_error()),
        status => {
            let detail = data.error_message.unwrap_or_default();
            return Err(geocoding_failed_error(format!("{} {}", status, detail)));
        }
    }

    let first = data
        .results
        .and_then(|results| results.into_iter().next())
        .ok_or_else(address_not_found_error)?;

    tracing::debug!(formatted_address = %first.formatted_address, "address resolved");

    Ok(first.geometry.location)
}
