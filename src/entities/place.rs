use oso::PolarClass;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::Coordinates;
use crate::error::{invalid_input_error, Error};

pub const MIN_DESCRIPTION_LENGTH: usize = 5;

const INVALID_INPUT_MESSAGE: &str = "Invalid inputs passed, please check your data.";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Place {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub address: String,
    pub location: Coordinates,
    pub image: String,
    pub creator: Uuid,
}

impl Place {
    pub fn new(params: NewPlace, location: Coordinates, creator: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: params.title,
            description: params.description,
            address: params.address,
            location,
            image: params.image,
            creator,
        }
    }

    pub fn apply(&mut self, changes: PlaceChanges) {
        self.title = changes.title;
        self.description = changes.description;
    }
}

impl PolarClass for Place {
    fn get_polar_class_builder() -> oso::ClassBuilder<Place> {
        oso::Class::builder()
            .name("Place")
            .add_attribute_getter("id", |recv: &Place| recv.id.to_string())
            .add_attribute_getter("creator", |recv: &Place| recv.creator.to_string())
    }

    fn get_polar_class() -> oso::Class {
        let builder = Place::get_polar_class_builder();
        builder.build()
    }
}

/// Input of a place creation. `image` is the path of the already stored upload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewPlace {
    pub title: String,
    pub description: String,
    pub address: String,
    pub image: String,
}

impl NewPlace {
    pub fn validate(&self) -> Result<(), Error> {
        validate_title_and_description(&self.title, &self.description)?;

        if self.address.is_empty() || self.image.is_empty() {
            return Err(invalid_input_error(INVALID_INPUT_MESSAGE));
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlaceChanges {
    pub title: String,
    pub description: String,
}

impl PlaceChanges {
    pub fn validate(&self) -> Result<(), Error> {
        validate_title_and_description(&self.title, &self.description)
    }
}

fn validate_title_and_description(title: &str, description: &str) -> Result<(), Error> {
    if title.is_empty() || description.chars().count() < MIN_DESCRIPTION_LENGTH {
        return Err(invalid_input_error(INVALID_INPUT_MESSAGE));
    }

    Ok(())
}
