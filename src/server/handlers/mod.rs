pub mod places;
pub mod users;

use uuid::Uuid;

use crate::error::{not_found_error, Error};

/// Ids that do not parse cannot name an existing document.
fn parse_id(raw: &str, not_found_message: &str) -> Result<Uuid, Error> {
    Uuid::parse_str(raw).map_err(|_| not_found_error(not_found_message))
}
