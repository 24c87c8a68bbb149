use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

use crate::api::query::{OrderDirection, QueryDefinition};
use crate::api::DocumentSnapshot;
use crate::error::{internal_error, FirestoreResult};
use crate::model::{DocumentKey, FieldPath, ResourcePath, Timestamp};
use crate::value::{FirestoreValue, MapValue, ValueKind};

use super::Datastore;

#[derive(Clone, Debug)]
struct StoredDocument {
    data: MapValue,
    create_time: Timestamp,
    update_time: Timestamp,
}

/// Process-local backend that evaluates equality filters, ordering, limit and
/// projection itself. Clones share the same store.
#[derive(Clone, Default)]
pub struct InMemoryDatastore {
    documents: Arc<Mutex<BTreeMap<ResourcePath, StoredDocument>>>,
}

impl InMemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.store().map(|store| store.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn store(&self) -> FirestoreResult<MutexGuard<'_, BTreeMap<ResourcePath, StoredDocument>>> {
        self.documents
            .lock()
            .map_err(|_| internal_error("In-memory document store lock poisoned"))
    }

    fn write(&self, key: &DocumentKey, data: MapValue) -> FirestoreResult<()> {
        let mut store = self.store()?;
        insert_document(&mut store, key, data);
        Ok(())
    }
}

/// Stores `data` under `key`, keeping the original create time of an existing document.
fn insert_document(store: &mut BTreeMap<ResourcePath, StoredDocument>, key: &DocumentKey, data: MapValue) {
    let now = Timestamp::now();
    let create_time = store
        .get(key.path())
        .map(|existing| existing.create_time)
        .unwrap_or(now);
    store.insert(
        key.path().clone(),
        StoredDocument {
            data,
            create_time,
            update_time: now,
        },
    );
}

#[async_trait]
impl Datastore for InMemoryDatastore {
    async fn get_document(&self, key: &DocumentKey) -> FirestoreResult<DocumentSnapshot> {
        let store = self.store()?;
        Ok(match store.get(key.path()) {
            Some(stored) => snapshot(key.clone(), stored, None),
            None => DocumentSnapshot::missing(key.clone()),
        })
    }

    async fn create_document(
        &self,
        collection_path: &ResourcePath,
        data: MapValue,
    ) -> FirestoreResult<DocumentKey> {
        let mut store = self.store()?;
        let key = loop {
            let candidate = DocumentKey::from_path(collection_path.child([generate_auto_id()]))?;
            if !store.contains_key(candidate.path()) {
                break candidate;
            }
        };
        insert_document(&mut store, &key, data);
        Ok(key)
    }

    async fn update_document(
        &self,
        key: &DocumentKey,
        data: MapValue,
        field_paths: Vec<FieldPath>,
    ) -> FirestoreResult<()> {
        let mut store = self.store()?;
        let mut fields = store
            .get(key.path())
            .map(|stored| stored.data.fields().clone())
            .unwrap_or_default();
        for path in &field_paths {
            match data.get_path(path) {
                Some(value) => set_at_path(&mut fields, path.segments(), value.clone()),
                None => remove_at_path(&mut fields, path.segments()),
            }
        }
        insert_document(&mut store, key, MapValue::new(fields));
        Ok(())
    }

    async fn set_document(&self, key: &DocumentKey, data: MapValue) -> FirestoreResult<()> {
        self.write(key, data)
    }

    async fn delete_document(&self, key: &DocumentKey) -> FirestoreResult<()> {
        self.store()?.remove(key.path());
        Ok(())
    }

    async fn run_query(&self, query: &QueryDefinition) -> FirestoreResult<Vec<DocumentSnapshot>> {
        let store = self.store()?;
        let mut matches: Vec<(DocumentKey, &StoredDocument)> = Vec::new();
        for (path, stored) in store.iter() {
            let key = DocumentKey::from_path(path.clone())?;
            if &key.collection_path() != query.collection_path() {
                continue;
            }
            if !query.filters().iter().all(|filter| {
                stored
                    .data
                    .get_path(filter.field())
                    .is_some_and(|value| value.compare(filter.value()) == Ordering::Equal)
            }) {
                continue;
            }
            // Documents missing an ordered field are excluded, as on the server.
            if !query
                .order_by()
                .iter()
                .all(|order| stored.data.get_path(order.field()).is_some())
            {
                continue;
            }
            matches.push((key, stored));
        }

        matches.sort_by(|(left_key, left), (right_key, right)| {
            for order in query.order_by() {
                let left_value = left.data.get_path(order.field());
                let right_value = right.data.get_path(order.field());
                let ordering = match (left_value, right_value) {
                    (Some(l), Some(r)) => l.compare(r),
                    _ => Ordering::Equal,
                };
                let ordering = match order.direction() {
                    OrderDirection::Ascending => ordering,
                    OrderDirection::Descending => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            let by_name = left_key.path().cmp(right_key.path());
            match query.order_by().last().map(|order| order.direction()) {
                Some(OrderDirection::Descending) => by_name.reverse(),
                _ => by_name,
            }
        });

        let limit = query
            .limit()
            .map(|limit| limit.max(1) as usize)
            .unwrap_or(usize::MAX);
        Ok(matches
            .into_iter()
            .take(limit)
            .map(|(key, stored)| snapshot(key, stored, query.projection()))
            .collect())
    }
}

fn snapshot(key: DocumentKey, stored: &StoredDocument, projection: Option<&[FieldPath]>) -> DocumentSnapshot {
    let data = match projection {
        Some(paths) => stored.data.project(paths),
        None => stored.data.clone(),
    };
    DocumentSnapshot::new(key, data).with_times(Some(stored.create_time), Some(stored.update_time))
}

fn set_at_path(fields: &mut BTreeMap<String, FirestoreValue>, segments: &[String], value: FirestoreValue) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        fields.insert(first.clone(), value);
        return;
    }
    let mut child = match fields.get(first).map(FirestoreValue::kind) {
        Some(ValueKind::Map(map)) => map.fields().clone(),
        _ => BTreeMap::new(),
    };
    set_at_path(&mut child, rest, value);
    fields.insert(first.clone(), FirestoreValue::from_map(child));
}

fn remove_at_path(fields: &mut BTreeMap<String, FirestoreValue>, segments: &[String]) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        fields.remove(first);
        return;
    }
    if let Some(ValueKind::Map(map)) = fields.get(first).map(FirestoreValue::kind) {
        let mut child = map.fields().clone();
        remove_at_path(&mut child, rest);
        fields.insert(first.clone(), FirestoreValue::from_map(child));
    }
}

fn generate_auto_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .map(char::from)
        .take(20)
        .collect()
}
