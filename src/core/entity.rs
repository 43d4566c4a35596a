// src/core/entity.rs
//! Entities, their snapshots, and the identity map that keeps them unique.
//!
//! An [`Entity`] is the process-wide handle of one remote object. It holds two
//! independent slots: `latest`, the authoritative snapshot, and `preview`, a
//! speculative one (for instance restored from a backup). The
//! [`IdentityMap`] guarantees at most one live entity per `(kind, id)`.

use super::client::NotionClient;
use super::fields::Fields;
use super::serialization::Deserializable;
use super::time::next_timestamp;
use crate::error::{AppError, SerializationError};
use crate::types::{NotionId, ValidationError};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

/// Fills the attributes a fresh snapshot lacks from an older one.
pub trait Coalesce {
    /// Copies every attribute that is unset on `self` and set on `preview`.
    /// Attributes already set on `self` are never overwritten.
    fn coalesce_from(&mut self, preview: &Self);
}

/// One kind of remote object: page, database, block or user.
pub trait EntityKind: fmt::Debug + Clone + Send + Sync + 'static {
    /// Value of the `"object"` field in the kind's payloads.
    const OBJECT: &'static str;

    /// The proper attributes of the kind.
    type Attrs: Deserializable + Coalesce + Clone + fmt::Debug + Send + Sync + 'static;

    fn retrieve(client: &NotionClient, id: NotionId) -> Result<Arc<Snapshot<Self>>, AppError>;
}

/// Immutable, timestamped view of one entity's attributes.
#[derive(Debug, Clone)]
pub struct Snapshot<K: EntityKind> {
    id: NotionId,
    attrs: K::Attrs,
    raw: Value,
    timestamp: i64,
}

impl<K: EntityKind> Snapshot<K> {
    pub fn new(id: NotionId, attrs: K::Attrs, raw: Value) -> Self {
        Self {
            id,
            attrs,
            raw,
            timestamp: next_timestamp(),
        }
    }

    /// Deserializes a full API payload, keeping it verbatim as `raw`.
    pub fn from_json(value: &Value) -> Result<Self, SerializationError> {
        let fields = Fields::of(value, K::OBJECT)?;
        if let Some(object) = fields.raw("object") {
            if object.as_str() != Some(K::OBJECT) {
                return Err(SerializationError::new(format!(
                    "expected a {} payload",
                    K::OBJECT
                ))
                .with_value(object)
                .at("object"));
            }
        }
        let id = fields.required("id")?;
        let attrs = K::Attrs::deserialize(value)?;
        Ok(Self::new(id, attrs, value.clone()))
    }

    /// Replaces the construction timestamp; used to replay stored snapshots.
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn id(&self) -> NotionId {
        self.id
    }

    pub fn attrs(&self) -> &K::Attrs {
        &self.attrs
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

impl<K: EntityKind> Deserializable for Snapshot<K> {
    fn deserialize(value: &Value) -> Result<Self, SerializationError> {
        Self::from_json(value)
    }
}

#[derive(Debug)]
struct Slots<K: EntityKind> {
    latest: Option<Arc<Snapshot<K>>>,
    preview: Option<Arc<Snapshot<K>>>,
}

/// Process-unique handle of a remote object.
#[derive(Debug)]
pub struct Entity<K: EntityKind> {
    id: NotionId,
    slots: RwLock<Slots<K>>,
}

impl<K: EntityKind> Entity<K> {
    fn new(id: NotionId) -> Self {
        Self {
            id,
            slots: RwLock::new(Slots {
                latest: None,
                preview: None,
            }),
        }
    }

    pub fn id(&self) -> NotionId {
        self.id
    }

    /// The latest snapshot, fetched through `client` when none is held yet.
    pub fn data(&self, client: &NotionClient) -> Result<Arc<Snapshot<K>>, AppError> {
        match self.latest() {
            Some(latest) => Ok(latest),
            None => self.refresh(client),
        }
    }

    /// Fetches unconditionally and returns whichever snapshot ends up latest.
    pub fn refresh(&self, client: &NotionClient) -> Result<Arc<Snapshot<K>>, AppError> {
        let fetched = K::retrieve(client, self.id)?;
        // already merged when the client shares this entity's map
        if !self.latest().is_some_and(|latest| Arc::ptr_eq(&latest, &fetched)) {
            self.set_latest(Arc::clone(&fetched));
        }
        Ok(self.latest().unwrap_or(fetched))
    }

    pub fn latest(&self) -> Option<Arc<Snapshot<K>>> {
        self.slots.read().latest.clone()
    }

    pub fn preview(&self) -> Option<Arc<Snapshot<K>>> {
        self.slots.read().preview.clone()
    }

    /// Stores `snapshot` as latest if it is strictly newer than the current one.
    ///
    /// Returns whether the slot changed; stale snapshots are dropped.
    pub fn set_latest(&self, snapshot: Arc<Snapshot<K>>) -> bool {
        let mut slots = self.slots.write();
        let current = slots.latest.as_ref().map_or(0, |latest| latest.timestamp);
        if snapshot.timestamp > current {
            slots.latest = Some(snapshot);
            true
        } else {
            log::debug!(
                "{} {}: dropped snapshot {} older than {}",
                K::OBJECT,
                self.id,
                snapshot.timestamp,
                current
            );
            false
        }
    }

    pub fn set_preview(&self, snapshot: Arc<Snapshot<K>>) {
        self.slots.write().preview = Some(snapshot);
    }

    /// Coalesces `snapshot` with the preview slot and offers it as latest.
    ///
    /// Returns the snapshot that is latest afterwards.
    pub fn accept(&self, mut snapshot: Snapshot<K>) -> Arc<Snapshot<K>> {
        if let Some(preview) = self.preview() {
            snapshot.attrs.coalesce_from(&preview.attrs);
        }
        let snapshot = Arc::new(snapshot);
        self.set_latest(Arc::clone(&snapshot));
        self.latest().unwrap_or(snapshot)
    }
}

/// A decoded snapshot together with the entity it was merged into.
///
/// Holding a record keeps its entity alive, so the identity map answers
/// later lookups for the same id with this snapshot.
#[derive(Debug, Clone)]
pub struct Record<K: EntityKind> {
    entity: Arc<Entity<K>>,
    snapshot: Arc<Snapshot<K>>,
}

impl<K: EntityKind> Record<K> {
    /// A record whose entity belongs to no identity map.
    pub fn detached(snapshot: Snapshot<K>) -> Self {
        let entity = Arc::new(Entity::new(snapshot.id()));
        let snapshot = entity.accept(snapshot);
        Self { entity, snapshot }
    }

    /// Merges the snapshot into `identities`, dropping any detached entity.
    pub fn register(self, identities: &IdentityMap) -> Self {
        if identities.holds(&self.entity) {
            return self;
        }
        drop(self.entity);
        identities.accept(Arc::unwrap_or_clone(self.snapshot))
    }

    pub fn entity(&self) -> &Arc<Entity<K>> {
        &self.entity
    }

    pub fn snapshot(&self) -> &Arc<Snapshot<K>> {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> Arc<Snapshot<K>> {
        self.snapshot
    }
}

impl<K: EntityKind> Deref for Record<K> {
    type Target = Snapshot<K>;

    fn deref(&self) -> &Snapshot<K> {
        &self.snapshot
    }
}

type ErasedEntity = Weak<dyn Any + Send + Sync>;

static GLOBAL: Lazy<Arc<IdentityMap>> = Lazy::new(|| Arc::new(IdentityMap::new()));

/// `(kind, id)` → live entity, holding weak references only.
///
/// An entity disappears from the map once its last strong reference is
/// dropped; dead entries are pruned on lookup and by [`purge`](Self::purge).
#[derive(Default)]
pub struct IdentityMap {
    entries: DashMap<(TypeId, NotionId), ErasedEntity>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide map clients use unless given another one.
    pub fn global() -> Arc<IdentityMap> {
        Arc::clone(&GLOBAL)
    }

    /// Parses any accepted id form (dashed, undashed, URL) and returns its entity.
    pub fn get_or_create<K: EntityKind>(
        &self,
        id_or_url: &str,
    ) -> Result<Arc<Entity<K>>, ValidationError> {
        NotionId::parse(id_or_url).map(|id| self.entity(id))
    }

    /// The live entity for `id`, created empty when none exists.
    pub fn entity<K: EntityKind>(&self, id: NotionId) -> Arc<Entity<K>> {
        match self.entries.entry((TypeId::of::<K>(), id)) {
            Entry::Occupied(mut occupied) => {
                if let Some(live) = upgrade::<K>(occupied.get()) {
                    return live;
                }
                let fresh = Arc::new(Entity::new(id));
                occupied.insert(erase(&fresh));
                fresh
            }
            Entry::Vacant(vacant) => {
                let fresh = Arc::new(Entity::new(id));
                vacant.insert(erase(&fresh));
                fresh
            }
        }
    }

    /// Merges `snapshot` into its entity and returns both.
    pub fn accept<K: EntityKind>(&self, snapshot: Snapshot<K>) -> Record<K> {
        let entity = self.entity::<K>(snapshot.id());
        let snapshot = entity.accept(snapshot);
        Record { entity, snapshot }
    }

    fn holds<K: EntityKind>(&self, entity: &Arc<Entity<K>>) -> bool {
        self.get::<K>(entity.id())
            .is_some_and(|live| Arc::ptr_eq(&live, entity))
    }

    pub fn get<K: EntityKind>(&self, id: NotionId) -> Option<Arc<Entity<K>>> {
        let key = (TypeId::of::<K>(), id);
        let live = self.entries.get(&key).and_then(|weak| upgrade::<K>(&weak));
        if live.is_none() {
            self.entries.remove_if(&key, |_, weak| weak.strong_count() == 0);
        }
        live
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value().strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops the entries of entities nobody references any more.
    pub fn purge(&self) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, weak| {
            let live = weak.strong_count() > 0;
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }
}

impl fmt::Debug for IdentityMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityMap")
            .field("entries", &self.entries.len())
            .finish()
    }
}

fn erase<K: EntityKind>(entity: &Arc<Entity<K>>) -> ErasedEntity {
    let erased: Arc<dyn Any + Send + Sync> = Arc::clone(entity) as _;
    Arc::downgrade(&erased)
}

fn upgrade<K: EntityKind>(weak: &ErasedEntity) -> Option<Arc<Entity<K>>> {
    weak.upgrade()?.downcast::<Entity<K>>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct NoteAttrs {
        title: Option<String>,
        done: Option<bool>,
    }

    impl Deserializable for NoteAttrs {
        fn deserialize(value: &Value) -> Result<Self, SerializationError> {
            let fields = Fields::of(value, "Note")?;
            Ok(Self {
                title: fields.optional("title")?,
                done: fields.optional("done")?,
            })
        }
    }

    impl Coalesce for NoteAttrs {
        fn coalesce_from(&mut self, preview: &Self) {
            if self.title.is_none() {
                self.title = preview.title.clone();
            }
            if self.done.is_none() {
                self.done = preview.done;
            }
        }
    }

    #[derive(Debug, Clone)]
    struct Note;

    impl EntityKind for Note {
        const OBJECT: &'static str = "note";
        type Attrs = NoteAttrs;

        fn retrieve(_: &NotionClient, id: NotionId) -> Result<Arc<Snapshot<Self>>, AppError> {
            Err(AppError::MalformedResponse {
                request: format!("note {}", id),
                reason: "notes cannot be fetched".into(),
            })
        }
    }

    const ID: &str = "550e8400-e29b-41d4-a716-446655440000";

    fn snapshot(title: Option<&str>, done: Option<bool>) -> Snapshot<Note> {
        let attrs = NoteAttrs {
            title: title.map(str::to_string),
            done,
        };
        Snapshot::new(NotionId::parse(ID).unwrap(), attrs, Value::Null)
    }

    #[test]
    fn test_every_id_form_maps_to_one_entity() {
        let map = IdentityMap::new();
        let dashed = map.get_or_create::<Note>(ID).unwrap();
        let undashed = map
            .get_or_create::<Note>("550e8400e29b41d4a716446655440000")
            .unwrap();
        let url = map
            .get_or_create::<Note>("https://www.notion.so/ws/Daily-550e8400e29b41d4a716446655440000")
            .unwrap();

        assert!(Arc::ptr_eq(&dashed, &undashed));
        assert!(Arc::ptr_eq(&dashed, &url));
        assert_eq!(map.len(), 1);
        assert!(map.get_or_create::<Note>("not-an-id").is_err());
    }

    #[test]
    fn test_dropped_entities_leave_the_map() {
        let map = IdentityMap::new();
        let id = NotionId::parse(ID).unwrap();
        let entity = map.entity::<Note>(id);
        assert!(map.get::<Note>(id).is_some());

        drop(entity);
        assert!(map.get::<Note>(id).is_none());
        assert!(map.is_empty());

        let _again = map.entity::<Note>(id);
        let _other = map.entity::<Note>(NotionId::from_uuid(uuid::Uuid::new_v4()));
        drop(_other);
        assert_eq!(map.purge(), 1);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_newer_snapshot_wins() {
        let map = IdentityMap::new();
        let entity = map.get_or_create::<Note>(ID).unwrap();
        let older = Arc::new(snapshot(Some("old"), None));
        let newer = Arc::new(snapshot(Some("new"), None));
        assert!(older.timestamp() < newer.timestamp());

        assert!(entity.set_latest(Arc::clone(&newer)));
        assert!(!entity.set_latest(Arc::clone(&older)));
        assert!(Arc::ptr_eq(&entity.latest().unwrap(), &newer));
    }

    #[test]
    fn test_accept_coalesces_from_preview() {
        let map = IdentityMap::new();
        let entity = map.get_or_create::<Note>(ID).unwrap();
        entity.set_preview(Arc::new(snapshot(Some("from backup"), Some(true))));

        let accepted = entity.accept(snapshot(Some("live"), None));
        assert_eq!(
            accepted.attrs(),
            &NoteAttrs {
                title: Some("live".into()),
                done: Some(true),
            }
        );
        assert!(Arc::ptr_eq(&entity.latest().unwrap(), &accepted));
    }

    #[test]
    fn test_snapshot_checks_object_kind() {
        let payload = json!({"object": "note", "id": ID, "title": "hello"});
        let parsed = Snapshot::<Note>::from_json(&payload).unwrap();
        assert_eq!(parsed.id(), NotionId::parse(ID).unwrap());
        assert_eq!(parsed.attrs().title.as_deref(), Some("hello"));
        assert_eq!(parsed.raw(), &payload);

        let err = Snapshot::<Note>::from_json(&json!({"object": "page", "id": ID})).unwrap_err();
        assert_eq!(err.path_string(), "object");
    }

    #[test]
    fn test_record_keeps_its_entity_alive() {
        let map = IdentityMap::new();
        let id = NotionId::parse(ID).unwrap();
        let record = map.accept(snapshot(Some("kept"), None));

        let entity = map.get::<Note>(id).unwrap();
        assert!(Arc::ptr_eq(&entity, record.entity()));
        assert!(Arc::ptr_eq(&entity.latest().unwrap(), record.snapshot()));
        assert_eq!(record.attrs().title.as_deref(), Some("kept"));

        drop((entity, record));
        assert!(map.get::<Note>(id).is_none());
    }

    #[test]
    fn test_detached_record_registers_once() {
        let map = IdentityMap::new();
        let detached = Record::detached(snapshot(Some("search hit"), None));
        assert!(map.is_empty());

        let registered = detached.register(&map);
        let again = registered.clone().register(&map);
        assert!(Arc::ptr_eq(registered.entity(), again.entity()));
        assert!(Arc::ptr_eq(registered.snapshot(), again.snapshot()));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_purge_while_inserting() {
        let map = Arc::new(IdentityMap::new());
        let writer = {
            let map = Arc::clone(&map);
            std::thread::spawn(move || {
                for _ in 0..2000 {
                    map.entity::<Note>(NotionId::from_uuid(uuid::Uuid::new_v4()));
                }
            })
        };
        let mut purged = 0;
        while !writer.is_finished() {
            purged += map.purge();
        }
        writer.join().unwrap();
        purged += map.purge();

        assert_eq!(purged, 2000);
        assert!(map.is_empty());
        assert_eq!(map.purge(), 0);
    }

    #[test]
    fn test_concurrent_creation_yields_one_instance() {
        let map = Arc::new(IdentityMap::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let map = Arc::clone(&map);
                std::thread::spawn(move || map.get_or_create::<Note>(ID).unwrap())
            })
            .collect();
        let entities: Vec<Arc<Entity<Note>>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(entities.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    }
}
