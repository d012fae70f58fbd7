mod location;
mod place;
mod user;

pub use location::Coordinates;
pub use place::{NewPlace, Place, PlaceChanges, MIN_DESCRIPTION_LENGTH};
pub use user::User;
