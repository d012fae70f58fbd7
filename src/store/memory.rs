use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::entities::{Place, User};
use crate::error::{database_error, transaction_aborted_error, Error};
use crate::store::{Store, UnitOfWork};

/// Store operations that can be made to fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    FindPlace,
    FindUser,
    FindPlaces,
    UpdatePlace,
    Begin,
    InsertPlace,
    RemovePlace,
    LinkPlace,
    UnlinkPlace,
    Commit,
}

#[derive(Default, Clone)]
struct Collections {
    places: HashMap<Uuid, Place>,
    users: HashMap<Uuid, User>,
}

enum Write {
    InsertPlace(Place),
    RemovePlace(Uuid),
    LinkPlace { user_id: Uuid, place_id: Uuid },
    UnlinkPlace { user_id: Uuid, place_id: Uuid },
}

/// In-process store with the same transactional guarantees as [`super::PgStore`]:
/// a unit of work stages its writes and applies all of them, or none, on commit.
///
/// This is the test double for the service and HTTP tests. The server binary
/// always runs on [`super::PgStore`]. Seeding helpers and [`FailPoint`]
/// injection exist only to drive those tests.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
    fail_points: Mutex<HashSet<FailPoint>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: User) -> Result<(), Error> {
        let mut collections = self.collections.lock().await;

        if collections.users.values().any(|u| u.email == user.email) {
            return Err(database_error(format!("duplicate email {}", user.email)));
        }

        collections.users.insert(user.id, user);

        Ok(())
    }

    /// Drops a user document without touching the places that reference it.
    pub async fn remove_user(&self, id: Uuid) -> Option<User> {
        self.collections.lock().await.users.remove(&id)
    }

    pub async fn fail_on(&self, point: FailPoint) {
        self.fail_points.lock().await.insert(point);
    }

    pub async fn recover(&self, point: FailPoint) {
        self.fail_points.lock().await.remove(&point);
    }

    pub async fn place_count(&self) -> usize {
        self.collections.lock().await.places.len()
    }

    async fn check(&self, point: FailPoint) -> Result<(), Error> {
        if self.fail_points.lock().await.contains(&point) {
            return Err(database_error(format!("injected failure at {:?}", point)));
        }

        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_place(&self, id: Uuid) -> Result<Option<Place>, Error> {
        self.check(FailPoint::FindPlace).await?;

        Ok(self.collections.lock().await.places.get(&id).cloned())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, Error> {
        self.check(FailPoint::FindUser).await?;

        Ok(self.collections.lock().await.users.get(&id).cloned())
    }

    async fn find_places(&self, ids: &[Uuid]) -> Result<Vec<Place>, Error> {
        self.check(FailPoint::FindPlaces).await?;

        let collections = self.collections.lock().await;

        Ok(ids
            .iter()
            .filter_map(|id| collections.places.get(id).cloned())
            .collect())
    }

    async fn list_users(&self) -> Result<Vec<User>, Error> {
        let mut users: Vec<User> = self
            .collections
            .lock()
            .await
            .users
            .values()
            .cloned()
            .collect();

        users.sort_by(|a, b| a.email.cmp(&b.email));

        Ok(users)
    }

    async fn update_place(&self, place: &Place) -> Result<(), Error> {
        self.check(FailPoint::UpdatePlace).await?;

        let mut collections = self.collections.lock().await;

        match collections.places.get_mut(&place.id) {
            Some(stored) => {
                *stored = place.clone();
                Ok(())
            }
            None => Err(database_error(format!("place {} vanished", place.id))),
        }
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork + '_>, Error> {
        self.check(FailPoint::Begin).await?;

        Ok(Box::new(MemoryUnitOfWork {
            store: self,
            writes: vec![],
        }))
    }
}

pub struct MemoryUnitOfWork<'a> {
    store: &'a MemoryStore,
    writes: Vec<Write>,
}

#[async_trait]
impl<'a> UnitOfWork for MemoryUnitOfWork<'a> {
    async fn insert_place(&mut self, place: &Place) -> Result<(), Error> {
        self.store.check(FailPoint::InsertPlace).await?;
        self.writes.push(Write::InsertPlace(place.clone()));
        Ok(())
    }

    async fn remove_place(&mut self, id: Uuid) -> Result<(), Error> {
        self.store.check(FailPoint::RemovePlace).await?;
        self.writes.push(Write::RemovePlace(id));
        Ok(())
    }

    async fn link_place(&mut self, user_id: Uuid, place_id: Uuid) -> Result<(), Error> {
        self.store.check(FailPoint::LinkPlace).await?;
        self.writes.push(Write::LinkPlace { user_id, place_id });
        Ok(())
    }

    async fn unlink_place(&mut self, user_id: Uuid, place_id: Uuid) -> Result<(), Error> {
        self.store.check(FailPoint::UnlinkPlace).await?;
        self.writes.push(Write::UnlinkPlace { user_id, place_id });
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), Error> {
        let MemoryUnitOfWork { store, writes } = *self;

        store
            .check(FailPoint::Commit)
            .await
            .map_err(|_| transaction_aborted_error())?;

        let mut collections = store.collections.lock().await;

        // apply to a copy so a failing write leaves the live collections untouched
        let mut staged = collections.clone();
        for write in writes {
            apply(&mut staged, write)?;
        }

        *collections = staged;

        Ok(())
    }
}

fn apply(collections: &mut Collections, write: Write) -> Result<(), Error> {
    match write {
        Write::InsertPlace(place) => {
            if !collections.users.contains_key(&place.creator) {
                return Err(transaction_aborted_error());
            }
            if collections.places.insert(place.id, place).is_some() {
                return Err(transaction_aborted_error());
            }
        }
        Write::RemovePlace(id) => {
            collections
                .places
                .remove(&id)
                .ok_or_else(transaction_aborted_error)?;
        }
        Write::LinkPlace { user_id, place_id } => {
            collections
                .users
                .get_mut(&user_id)
                .ok_or_else(transaction_aborted_error)?
                .link_place(place_id);
        }
        Write::UnlinkPlace { user_id, place_id } => {
            collections
                .users
                .get_mut(&user_id)
                .ok_or_else(transaction_aborted_error)?
                .unlink_place(&place_id);
        }
    }

    Ok(())
}
