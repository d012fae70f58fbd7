use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use uuid::Uuid;

use super::Engine;
use crate::api::PlaceAPI;
use crate::auth::Requester;
use crate::entities::{Coordinates, NewPlace, PlaceChanges, User};
use crate::error::{address_not_found_error, Error, ErrorKind};
use crate::external::GeoResolver;
use crate::store::{FailPoint, MemoryStore, Store};
use crate::uploads::ImageStore;

struct FixedResolver {
    coordinates: Option<Coordinates>,
    calls: AtomicUsize,
}

#[async_trait]
impl GeoResolver for FixedResolver {
    async fn resolve(&self, _address: &str) -> Result<Coordinates, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.coordinates.ok_or_else(address_not_found_error)
    }
}

struct Harness {
    engine: Engine,
    store: Arc<MemoryStore>,
    images: Arc<ImageStore>,
    resolver: Arc<FixedResolver>,
    _dir: TempDir,
}

async fn harness(coordinates: Option<Coordinates>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let images = Arc::new(ImageStore::new(dir.path()).await.unwrap());
    let resolver = Arc::new(FixedResolver {
        coordinates,
        calls: AtomicUsize::new(0),
    });

    let engine = Engine::new(store.clone(), resolver.clone(), images.clone()).unwrap();

    Harness {
        engine,
        store,
        images,
        resolver,
        _dir: dir,
    }
}

fn resolved() -> Option<Coordinates> {
    Some(Coordinates {
        lat: 37.42,
        lng: -122.08,
    })
}

impl Harness {
    async fn seed_user(&self, email: &str) -> Requester {
        let user = User::new(
            "Test User".into(),
            email.into(),
            "hashed".into(),
            "uploads/images/avatar.png".into(),
        );
        let id = user.id;
        self.store.insert_user(user).await.unwrap();
        Requester::new(id)
    }

    async fn new_place(&self, title: &str, description: &str, address: &str) -> NewPlace {
        let image = self.images.save("image/png", b"png").await.unwrap();

        NewPlace {
            title: title.into(),
            description: description.into(),
            address: address.into(),
            image,
        }
    }

    async fn places_of(&self, requester: Requester) -> Vec<Uuid> {
        self.store
            .find_user(requester.id)
            .await
            .unwrap()
            .unwrap()
            .places
    }
}

async fn eventually_removed(path: &str) -> bool {
    for _ in 0..50 {
        if !Path::new(path).exists() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn created_place_is_readable_and_listed() {
    let h = harness(resolved()).await;
    let owner = h.seed_user("u1@example.com").await;

    let params = h.new_place("T", "12345", "A").await;
    let created = h.engine.create_place(owner, params).await.unwrap();

    let found = h.engine.find_place(created.id).await.unwrap();
    assert_eq!(found.creator, owner.id);
    assert_eq!(found.title, "T");
    assert_eq!(found.description, "12345");
    assert_eq!(found.location, resolved().unwrap());

    let listed = h.engine.find_places_by_owner(owner.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created.id);
}

#[tokio::test]
async fn resolved_location_is_stored_and_owner_list_grows() {
    let h = harness(resolved()).await;
    let owner = h.seed_user("u1@example.com").await;
    assert!(h.places_of(owner).await.is_empty());

    let params = h
        .new_place("Googleplex", "Google headquarters", "1600 Amphitheatre Parkway")
        .await;
    let created = h.engine.create_place(owner, params).await.unwrap();

    assert_eq!(created.location.lat, 37.42);
    assert_eq!(created.location.lng, -122.08);
    assert_eq!(h.places_of(owner).await, vec![created.id]);
    assert_eq!(h.resolver.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn owner_places_keep_creation_order() {
    let h = harness(resolved()).await;
    let owner = h.seed_user("u1@example.com").await;

    let mut ids = vec![];
    for title in ["first", "second", "third"] {
        let params = h.new_place(title, "a description", "somewhere").await;
        ids.push(h.engine.create_place(owner, params).await.unwrap().id);
    }

    let listed: Vec<Uuid> = h
        .engine
        .find_places_by_owner(owner.id)
        .await
        .unwrap()
        .iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(listed, ids);
}

#[tokio::test]
async fn geocoding_failure_leaves_no_trace() {
    let h = harness(None).await;
    let owner = h.seed_user("u1@example.com").await;

    let params = h.new_place("T", "12345", "nowhere at all").await;
    let image = params.image.clone();
    let err = h.engine.create_place(owner, params).await.unwrap_err();

    assert!(err.is_geocoding_error());
    assert_eq!(h.store.place_count().await, 0);
    assert!(h.places_of(owner).await.is_empty());
    assert!(eventually_removed(&image).await);
}

#[tokio::test]
async fn invalid_input_is_rejected_before_geocoding() {
    let h = harness(resolved()).await;
    let owner = h.seed_user("u1@example.com").await;

    let params = h.new_place("T", "1234", "A").await;
    let err = h.engine.create_place(owner, params).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::InvalidInput);
    assert_eq!(h.resolver.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.store.place_count().await, 0);
}

#[tokio::test]
async fn create_for_unknown_user_is_not_found() {
    let h = harness(resolved()).await;

    let params = h.new_place("T", "12345", "A").await;
    let err = h
        .engine
        .create_place(Requester::new(Uuid::new_v4()), params)
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(h.store.place_count().await, 0);
}

#[tokio::test]
async fn creator_lookup_failure_is_reported() {
    let h = harness(resolved()).await;
    let owner = h.seed_user("u1@example.com").await;
    h.store.fail_on(FailPoint::FindUser).await;

    let params = h.new_place("T", "12345", "A").await;
    let err = h.engine.create_place(owner, params).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::UserLookupFailed);
    assert_eq!(h.store.place_count().await, 0);
}

#[tokio::test]
async fn failed_create_transaction_mutates_nothing() {
    for point in [FailPoint::Begin, FailPoint::InsertPlace, FailPoint::LinkPlace, FailPoint::Commit] {
        let h = harness(resolved()).await;
        let owner = h.seed_user("u1@example.com").await;
        h.store.fail_on(point).await;

        let params = h.new_place("T", "12345", "A").await;
        let err = h.engine.create_place(owner, params).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::CreateFailed, "{:?}", point);
        assert_eq!(h.store.place_count().await, 0, "{:?}", point);
        assert!(h.places_of(owner).await.is_empty(), "{:?}", point);
    }
}

#[tokio::test]
async fn creator_updates_title_and_description() {
    let h = harness(resolved()).await;
    let owner = h.seed_user("u1@example.com").await;
    let params = h.new_place("T", "12345", "A").await;
    let place = h.engine.create_place(owner, params).await.unwrap();

    let changes = PlaceChanges {
        title: "New title".into(),
        description: "New description".into(),
    };
    let updated = h.engine.update_place(owner, place.id, changes).await.unwrap();

    assert_eq!(updated.title, "New title");
    let found = h.engine.find_place(place.id).await.unwrap();
    assert_eq!(found.title, "New title");
    assert_eq!(found.description, "New description");
    assert_eq!(found.address, "A");
}

#[tokio::test]
async fn stranger_cannot_update() {
    let h = harness(resolved()).await;
    let owner = h.seed_user("u1@example.com").await;
    let stranger = h.seed_user("u2@example.com").await;
    let params = h.new_place("T", "12345", "A").await;
    let place = h.engine.create_place(owner, params).await.unwrap();

    let changes = PlaceChanges {
        title: "Hijacked".into(),
        description: "Hijacked description".into(),
    };
    let err = h
        .engine
        .update_place(stranger, place.id, changes)
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Forbidden);
    let found = h.engine.find_place(place.id).await.unwrap();
    assert_eq!(found.title, "T");
    assert_eq!(found.description, "12345");
}

#[tokio::test]
async fn update_of_missing_place_is_not_found() {
    let h = harness(resolved()).await;
    let owner = h.seed_user("u1@example.com").await;

    let changes = PlaceChanges {
        title: "T".into(),
        description: "12345".into(),
    };
    let err = h
        .engine
        .update_place(owner, Uuid::new_v4(), changes)
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn update_failures_are_classified() {
    let h = harness(resolved()).await;
    let owner = h.seed_user("u1@example.com").await;
    let params = h.new_place("T", "12345", "A").await;
    let place = h.engine.create_place(owner, params).await.unwrap();

    let invalid = PlaceChanges {
        title: "".into(),
        description: "12345".into(),
    };
    let err = h.engine.update_place(owner, place.id, invalid).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);

    let changes = PlaceChanges {
        title: "T2".into(),
        description: "12345".into(),
    };

    h.store.fail_on(FailPoint::FindPlace).await;
    let err = h
        .engine
        .update_place(owner, place.id, changes.clone())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::StoreUnavailable);
    h.store.recover(FailPoint::FindPlace).await;

    h.store.fail_on(FailPoint::UpdatePlace).await;
    let err = h
        .engine
        .update_place(owner, place.id, changes)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::UpdateFailed);
}

#[tokio::test]
async fn deleted_place_is_gone_everywhere() {
    let h = harness(resolved()).await;
    let owner = h.seed_user("u1@example.com").await;
    let kept = h.engine.create_place(owner, h.new_place("kept", "12345", "A").await).await.unwrap();
    let doomed = h.engine.create_place(owner, h.new_place("doomed", "12345", "B").await).await.unwrap();

    h.engine.delete_place(owner, doomed.id).await.unwrap();

    let err = h.engine.find_place(doomed.id).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(h.places_of(owner).await, vec![kept.id]);
    assert!(eventually_removed(&doomed.image).await);
    assert!(Path::new(&kept.image).exists());
}

#[tokio::test]
async fn stranger_cannot_delete() {
    let h = harness(resolved()).await;
    let owner = h.seed_user("u1@example.com").await;
    let stranger = h.seed_user("u2@example.com").await;
    let place = h.engine.create_place(owner, h.new_place("T", "12345", "A").await).await.unwrap();

    let err = h.engine.delete_place(stranger, place.id).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Forbidden);
    assert!(h.engine.find_place(place.id).await.is_ok());
    assert_eq!(h.places_of(owner).await, vec![place.id]);
    assert!(Path::new(&place.image).exists());
}

#[tokio::test]
async fn delete_of_missing_place_is_not_found() {
    let h = harness(resolved()).await;
    let owner = h.seed_user("u1@example.com").await;

    let err = h.engine.delete_place(owner, Uuid::new_v4()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn failed_delete_transaction_mutates_nothing() {
    for point in [
        FailPoint::Begin,
        FailPoint::RemovePlace,
        FailPoint::UnlinkPlace,
        FailPoint::Commit,
    ] {
        let h = harness(resolved()).await;
        let owner = h.seed_user("u1@example.com").await;
        let place = h.engine.create_place(owner, h.new_place("T", "12345", "A").await).await.unwrap();
        h.store.fail_on(point).await;

        let err = h.engine.delete_place(owner, place.id).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::DeleteFailed, "{:?}", point);
        assert_eq!(h.store.place_count().await, 1, "{:?}", point);
        assert_eq!(h.places_of(owner).await, vec![place.id], "{:?}", point);
        assert!(Path::new(&place.image).exists(), "{:?}", point);
    }
}

#[tokio::test]
async fn missing_owner_and_empty_owner_are_distinct() {
    let h = harness(resolved()).await;
    let owner = h.seed_user("u1@example.com").await;

    let err = h.engine.find_places_by_owner(Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let err = h.engine.find_places_by_owner(owner.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NoPlaces);
}

#[tokio::test]
async fn read_failures_are_store_unavailable() {
    let h = harness(resolved()).await;
    let owner = h.seed_user("u1@example.com").await;

    h.store.fail_on(FailPoint::FindPlace).await;
    let err = h.engine.find_place(Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::StoreUnavailable);

    h.store.fail_on(FailPoint::FindUser).await;
    let err = h.engine.find_places_by_owner(owner.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::StoreUnavailable);
}

#[tokio::test]
async fn delete_lookup_failures_are_store_unavailable() {
    for point in [FailPoint::FindPlace, FailPoint::FindUser] {
        let h = harness(resolved()).await;
        let owner = h.seed_user("u1@example.com").await;
        let place = h.engine.create_place(owner, h.new_place("T", "12345", "A").await).await.unwrap();
        h.store.fail_on(point).await;

        let err = h.engine.delete_place(owner, place.id).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::StoreUnavailable, "{:?}", point);
        h.store.recover(point).await;
        assert_eq!(h.store.place_count().await, 1, "{:?}", point);
        assert_eq!(h.places_of(owner).await, vec![place.id], "{:?}", point);
        assert!(Path::new(&place.image).exists(), "{:?}", point);
    }
}

#[tokio::test]
async fn delete_with_missing_creator_fails_without_mutation() {
    let h = harness(resolved()).await;
    let owner = h.seed_user("u1@example.com").await;
    let place = h.engine.create_place(owner, h.new_place("T", "12345", "A").await).await.unwrap();
    h.store.remove_user(owner.id).await.unwrap();

    let err = h.engine.delete_place(owner, place.id).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::DeleteFailed);
    assert!(h.engine.find_place(place.id).await.is_ok());
    assert!(Path::new(&place.image).exists());
}

#[tokio::test]
async fn owner_places_lookup_failure_is_store_unavailable() {
    let h = harness(resolved()).await;
    let owner = h.seed_user("u1@example.com").await;
    h.engine.create_place(owner, h.new_place("T", "12345", "A").await).await.unwrap();
    h.store.fail_on(FailPoint::FindPlaces).await;

    let err = h.engine.find_places_by_owner(owner.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::StoreUnavailable);

    h.store.recover(FailPoint::FindPlaces).await;
    assert_eq!(h.engine.find_places_by_owner(owner.id).await.unwrap().len(), 1);
}
