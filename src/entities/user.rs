use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account document. Credentials are issued and hashed outside this service;
/// the only field written here is `places`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password: String,
    pub image: String,
    pub places: Vec<Uuid>,
}

impl User {
    pub fn new(name: String, email: String, password: String, image: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            password,
            image,
            places: vec![],
        }
    }

    pub fn owns(&self, place_id: &Uuid) -> bool {
        self.places.contains(place_id)
    }

    pub fn link_place(&mut self, place_id: Uuid) {
        if !self.owns(&place_id) {
            self.places.push(place_id);
        }
    }

    pub fn unlink_place(&mut self, place_id: &Uuid) {
        self.places.retain(|id| id != place_id);
    }
}
