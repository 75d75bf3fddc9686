//! Item create/update/delete use-cases.
//!
//! # Responsibility
//! - Validate payloads against the node's form schema before any write.
//! - Stamp taxonomy path and timestamps, then write through the routed
//!   collection.
//! - Offer read-for-edit and metadata pre-fill helpers.
//!
//! # Invariants
//! - These are the only writers of persisted item state.
//! - Items are only created under leaf nodes that resolve at write time.
//! - `id`, `created_at` and the taxonomy path never change after create.
//! - `updated_at` strictly increases on every update.
//! - Logs carry ids, collections and timings; never titles or notes.

use crate::clock::Clock;
use crate::error::{EngineError, EngineResult};
use crate::model::collection::CollectionId;
use crate::model::item::{FieldValue, Item, ItemId, ItemPayload};
use crate::model::taxonomy::TaxonomyPath;
use crate::repo::item_store::{
    record_to_item, Condition, ItemStore, Predicate, Record, StoreWindow,
};
use crate::schema::validate::{validate_create, validate_patch, FieldProblem, ValidationError};
use crate::schema::{FormSchema, FormSchemaProvider};
use crate::service::metadata_search::{CandidateAttributes, MetadataSearch};
use crate::taxonomy::router::CollectionRouter;
use log::{info, warn};
use std::time::Instant;

/// Minimum query length forwarded to metadata providers.
const MIN_PREFILL_QUERY_CHARS: usize = 2;

/// Write-side service for tracked items.
pub struct ItemLifecycleManager<'a, S: ItemStore, C: Clock> {
    router: &'a CollectionRouter,
    store: S,
    clock: C,
}

/// Resolved write target of one leaf.
struct WriteTarget {
    collection: CollectionId,
    schema: FormSchema,
}

impl<'a, S: ItemStore, C: Clock> ItemLifecycleManager<'a, S, C> {
    pub fn new(router: &'a CollectionRouter, store: S, clock: C) -> Self {
        Self {
            router,
            store,
            clock,
        }
    }

    /// Validates and stores a new item under leaf `path`.
    ///
    /// # Errors
    /// - `UnknownNode` when `path` does not resolve.
    /// - `Validation` for schema violations or a non-leaf `path`.
    /// - `Store` when the write fails; the insert is never retried.
    pub fn create(&self, path: &TaxonomyPath, payload: &ItemPayload) -> EngineResult<Item> {
        let started_at = Instant::now();
        let target = self.write_target(path)?;
        let fields = validate_create(&target.schema, payload)?;
        let now = self.clock.now_ms();

        let mut record = path_record(path);
        record.extend(fields);
        record.insert("created_at", FieldValue::Integer(now));
        record.insert("updated_at", FieldValue::Integer(now));

        let id = self
            .store
            .insert(target.collection, &record)
            .map_err(|err| {
                warn!(
                    "event=item_create module=lifecycle status=error collection={} error={err}",
                    target.collection
                );
                EngineError::store("create", path, err)
            })?;
        let item = self.find(target.collection, id, path, "create")?;

        info!(
            "event=item_create module=lifecycle status=ok collection={} id={id} duration_ms={}",
            target.collection,
            started_at.elapsed().as_millis()
        );
        Ok(item)
    }

    /// Applies a partial update to item `id` under leaf `path`.
    ///
    /// Only fields whose value changes are written, together with a new
    /// `updated_at`. `null` clears an optional field.
    pub fn update(&self, id: ItemId, path: &TaxonomyPath, patch: &ItemPayload) -> EngineResult<Item> {
        let started_at = Instant::now();
        let target = self.write_target(path)?;
        let existing = self.find(target.collection, id, path, "update")?;
        let fields = validate_patch(&target.schema, patch)?;
        ensure_required_after_merge(&target.schema, &existing, &fields)?;

        let mut changes = fields
            .into_iter()
            .filter(|(name, value)| existing.field(name) != *value)
            .collect::<Record>();
        let changed_fields = changes.len();
        let updated_at = self.clock.now_ms().max(existing.updated_at + 1);
        changes.insert("updated_at", FieldValue::Integer(updated_at));

        let affected = self
            .store
            .update_by_id(target.collection, id, &changes)
            .map_err(|err| EngineError::store("update", path, err))?;
        if affected == 0 {
            return Err(EngineError::NotFound {
                id,
                path: path.clone(),
            });
        }
        let item = self.find(target.collection, id, path, "update")?;

        info!(
            "event=item_update module=lifecycle status=ok collection={} id={id} changed_fields={changed_fields} duration_ms={}",
            target.collection,
            started_at.elapsed().as_millis()
        );
        Ok(item)
    }

    /// Removes item `id` under leaf `path`. A second delete fails.
    pub fn delete(&self, id: ItemId, path: &TaxonomyPath) -> EngineResult<()> {
        let started_at = Instant::now();
        let target = self.write_target(path)?;
        self.find(target.collection, id, path, "delete")?;

        let affected = self
            .store
            .delete_by_id(target.collection, id)
            .map_err(|err| EngineError::store("delete", path, err))?;
        if affected == 0 {
            return Err(EngineError::NotFound {
                id,
                path: path.clone(),
            });
        }

        info!(
            "event=item_delete module=lifecycle status=ok collection={} id={id} duration_ms={}",
            target.collection,
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    /// Loads item `id` under leaf `path`, e.g. to populate an edit form.
    pub fn get(&self, id: ItemId, path: &TaxonomyPath) -> EngineResult<Item> {
        let target = self.write_target(path)?;
        self.find(target.collection, id, path, "get")
    }

    /// Asks a metadata provider for candidate attribute sets.
    ///
    /// Queries shorter than two characters return nothing without calling
    /// the provider. Candidates are reduced to writable schema fields;
    /// provider failures are logged and yield an empty list.
    pub fn prefill(
        &self,
        search: &dyn MetadataSearch,
        query: &str,
        path: &TaxonomyPath,
    ) -> EngineResult<Vec<CandidateAttributes>> {
        let target = self.write_target(path)?;
        let query = query.trim();
        if query.chars().count() < MIN_PREFILL_QUERY_CHARS {
            return Ok(Vec::new());
        }

        let candidates = match search.search(query, path) {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(
                    "event=metadata_search module=lifecycle status=error provider={} collection={}",
                    err.provider, target.collection
                );
                return Ok(Vec::new());
            }
        };

        Ok(candidates
            .into_iter()
            .map(|candidate| {
                candidate
                    .into_iter()
                    .filter(|(key, value)| !value.is_null() && target.schema.field(key).is_some())
                    .collect::<CandidateAttributes>()
            })
            .filter(|candidate| !candidate.is_empty())
            .collect())
    }

    fn write_target(&self, path: &TaxonomyPath) -> EngineResult<WriteTarget> {
        let node = self.router.registry().get_node(path)?;
        if !node.is_leaf() {
            return Err(ValidationError::single("path", FieldProblem::NotLeaf).into());
        }
        let schema = FormSchemaProvider::new(self.router)
            .get_schema(path)
            .map_err(EngineError::unrouted)?;
        Ok(WriteTarget {
            collection: schema.collection,
            schema,
        })
    }

    fn find(
        &self,
        collection: CollectionId,
        id: ItemId,
        path: &TaxonomyPath,
        operation: &'static str,
    ) -> EngineResult<Item> {
        let predicate = Predicate::under(path).and(Condition::Eq("id", id.into()));
        let records = self
            .store
            .query(
                collection,
                &predicate,
                &[],
                StoreWindow {
                    limit: Some(1),
                    offset: 0,
                },
            )
            .map_err(|err| EngineError::store(operation, path, err))?;
        let record = records.first().ok_or_else(|| EngineError::NotFound {
            id,
            path: path.clone(),
        })?;
        record_to_item(collection, record).map_err(|err| EngineError::store(operation, path, err))
    }
}

fn path_record(path: &TaxonomyPath) -> Record {
    let mut record = Record::new();
    record.insert("domain", FieldValue::from(path.domain.as_str()));
    record.insert("category", FieldValue::from(path.category.clone()));
    record.insert("subcategory", FieldValue::from(path.subcategory.clone()));
    record
}

/// Required fields must still hold a value once the patch is applied.
fn ensure_required_after_merge(
    schema: &FormSchema,
    existing: &Item,
    patch: &Record,
) -> Result<(), ValidationError> {
    let missing = schema
        .fields
        .iter()
        .filter(|field| field.required)
        .find(|field| {
            patch
                .get(field.name)
                .cloned()
                .unwrap_or_else(|| existing.field(field.name))
                .is_null()
        });
    match missing {
        Some(field) => Err(ValidationError::single(field.name, FieldProblem::Missing)),
        None => Ok(()),
    }
}
