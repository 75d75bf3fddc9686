//! Form schemas per taxonomy node.
//!
//! # Responsibility
//! - Compose the universal item fields with the routed collection's
//!   attribute fields into one ordered form.
//! - Host payload validation (`validate`).
//!
//! # Invariants
//! - Universal fields always come first, in fixed order.
//! - A node's schema is fully determined by its route; nodes sharing a
//!   collection share a schema.

pub mod fields;
pub mod validate;

use crate::model::collection::CollectionId;
use crate::model::schema::FieldSpec;
use crate::model::taxonomy::TaxonomyPath;
use crate::schema::fields::UNIVERSAL_FIELDS;
use crate::taxonomy::router::CollectionRouter;
use crate::taxonomy::UnknownNodeError;
use serde::Serialize;

/// Ordered field list for one node's create/edit form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormSchema {
    pub path: TaxonomyPath,
    pub collection: CollectionId,
    pub fields: Vec<FieldSpec>,
}

impl FormSchema {
    /// Looks a field up by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Names of free-text fields (`Text` and `LongText`), in form order.
    pub fn text_field_names(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|field| field.kind.is_text())
            .map(|field| field.name)
            .collect()
    }

    /// Names of collection-specific attribute fields, in form order.
    pub fn attribute_names(&self) -> Vec<&'static str> {
        self.fields[UNIVERSAL_FIELDS.len()..]
            .iter()
            .map(|field| field.name)
            .collect()
    }
}

/// Resolves form schemas through a router.
#[derive(Debug, Clone, Copy)]
pub struct FormSchemaProvider<'a> {
    router: &'a CollectionRouter,
}

impl<'a> FormSchemaProvider<'a> {
    pub fn new(router: &'a CollectionRouter) -> Self {
        Self { router }
    }

    /// Returns the form schema of the node at `path`.
    pub fn get_schema(&self, path: &TaxonomyPath) -> Result<FormSchema, UnknownNodeError> {
        let route = self.router.resolve(path)?;
        Ok(FormSchema {
            path: path.clone(),
            collection: route.collection,
            fields: UNIVERSAL_FIELDS
                .iter()
                .chain(route.schema.iter())
                .copied()
                .collect(),
        })
    }
}
