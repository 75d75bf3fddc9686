//! Item store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the four storage operations the engine consumes: `query`,
//!   `insert`, `update_by_id`, `delete_by_id`.
//! - Keep SQL text construction inside the persistence boundary.
//!
//! # Invariants
//! - Table and column identifiers come only from `CollectionId::table_name`
//!   and static schema field names; every value is a bound parameter.
//! - Read paths reject invalid persisted values instead of masking them.
//! - Each write is a single statement, atomic on its own.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::collection::CollectionId;
use crate::model::item::{FieldValue, Item, ItemId, ItemStatus};
use crate::model::taxonomy::TaxonomyPath;
use crate::schema::fields::attribute_fields;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params_from_iter, Connection, Row};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Columns shared by every collection table, in select order.
pub const UNIVERSAL_COLUMNS: &[&str] = &[
    "id",
    "domain",
    "category",
    "subcategory",
    "title",
    "status",
    "rating",
    "notes",
    "created_at",
    "updated_at",
];

/// One stored row (read) or column assignment set (write).
pub type Record = BTreeMap<&'static str, FieldValue>;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from item store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// A predicate, order term or record names a column the table lacks.
    UnknownColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted into a valid item.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "item store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "item store requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "item store requires column `{column}` in table `{table}`"
            ),
            Self::UnknownColumn { table, column } => {
                write!(f, "table `{table}` has no column `{column}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted item data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
            Self::MissingRequiredColumn { .. } => None,
            Self::UnknownColumn { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// One typed row condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `column = value`; a `Null` value renders as `IS NULL`.
    Eq(&'static str, FieldValue),
    IsNull(&'static str),
    /// `column >= value`.
    AtLeast(&'static str, i64),
    /// `column <= value`.
    AtMost(&'static str, i64),
}

impl Condition {
    fn column(&self) -> &'static str {
        match self {
            Self::Eq(column, _) | Self::IsNull(column) => *column,
            Self::AtLeast(column, _) | Self::AtMost(column, _) => *column,
        }
    }
}

/// Conjunction of conditions. An empty predicate matches every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    pub conditions: Vec<Condition>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches every item classified at or below `path`.
    pub fn under(path: &TaxonomyPath) -> Self {
        let mut predicate = Self::new().and(Condition::Eq("domain", path.domain.clone().into()));
        if let Some(category) = &path.category {
            predicate = predicate.and(Condition::Eq("category", category.clone().into()));
        }
        if let Some(subcategory) = &path.subcategory {
            predicate = predicate.and(Condition::Eq("subcategory", subcategory.clone().into()));
        }
        predicate
    }

    pub fn and(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }
}

/// One `ORDER BY` term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTerm {
    pub column: &'static str,
    pub descending: bool,
    pub nulls_last: bool,
    /// Compare text case-insensitively (`COLLATE NOCASE`).
    pub nocase: bool,
}

impl OrderTerm {
    pub const fn asc(column: &'static str) -> Self {
        Self {
            column,
            descending: false,
            nulls_last: false,
            nocase: false,
        }
    }

    pub const fn desc(column: &'static str) -> Self {
        Self {
            column,
            descending: true,
            nulls_last: false,
            nocase: false,
        }
    }

    pub const fn nulls_last(mut self) -> Self {
        self.nulls_last = true;
        self
    }

    pub const fn nocase(mut self) -> Self {
        self.nocase = true;
        self
    }
}

/// Read bounds pushed down to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreWindow {
    /// `None` returns every remaining row.
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Storage collaborator consumed by the engine.
pub trait ItemStore {
    /// Returns matching rows of one collection.
    fn query(
        &self,
        collection: CollectionId,
        predicate: &Predicate,
        order: &[OrderTerm],
        window: StoreWindow,
    ) -> StoreResult<Vec<Record>>;

    /// Inserts one row and returns its assigned id.
    fn insert(&self, collection: CollectionId, record: &Record) -> StoreResult<ItemId>;

    /// Assigns `patch` to the row with `id`; returns the affected row count.
    fn update_by_id(&self, collection: CollectionId, id: ItemId, patch: &Record)
        -> StoreResult<usize>;

    /// Deletes the row with `id`; returns the affected row count.
    fn delete_by_id(&self, collection: CollectionId, id: ItemId) -> StoreResult<usize>;
}

impl<S: ItemStore + ?Sized> ItemStore for &S {
    fn query(
        &self,
        collection: CollectionId,
        predicate: &Predicate,
        order: &[OrderTerm],
        window: StoreWindow,
    ) -> StoreResult<Vec<Record>> {
        (**self).query(collection, predicate, order, window)
    }

    fn insert(&self, collection: CollectionId, record: &Record) -> StoreResult<ItemId> {
        (**self).insert(collection, record)
    }

    fn update_by_id(
        &self,
        collection: CollectionId,
        id: ItemId,
        patch: &Record,
    ) -> StoreResult<usize> {
        (**self).update_by_id(collection, id, patch)
    }

    fn delete_by_id(&self, collection: CollectionId, id: ItemId) -> StoreResult<usize> {
        (**self).delete_by_id(collection, id)
    }
}

/// SQLite-backed item store.
pub struct SqliteItemStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteItemStore<'conn> {
    /// Constructs a store from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_store_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ItemStore for SqliteItemStore<'_> {
    fn query(
        &self,
        collection: CollectionId,
        predicate: &Predicate,
        order: &[OrderTerm],
        window: StoreWindow,
    ) -> StoreResult<Vec<Record>> {
        let table = collection.table_name();
        let columns = columns_of(collection);

        let mut sql = format!("SELECT {} FROM {table} WHERE 1 = 1", columns.join(", "));
        let mut bind_values: Vec<Value> = Vec::new();

        for condition in &predicate.conditions {
            let column = checked_column(collection, condition.column())?;
            match condition {
                Condition::Eq(_, FieldValue::Null) | Condition::IsNull(_) => {
                    sql.push_str(&format!(" AND {column} IS NULL"));
                }
                Condition::Eq(_, value) => {
                    sql.push_str(&format!(" AND {column} = ?"));
                    bind_values.push(to_sql_value(value));
                }
                Condition::AtLeast(_, bound) => {
                    sql.push_str(&format!(" AND {column} >= ?"));
                    bind_values.push(Value::Integer(*bound));
                }
                Condition::AtMost(_, bound) => {
                    sql.push_str(&format!(" AND {column} <= ?"));
                    bind_values.push(Value::Integer(*bound));
                }
            }
        }

        if !order.is_empty() {
            let terms = order
                .iter()
                .map(|term| {
                    let column = checked_column(collection, term.column)?;
                    let mut rendered = column.to_string();
                    if term.nocase {
                        rendered.push_str(" COLLATE NOCASE");
                    }
                    rendered.push_str(if term.descending { " DESC" } else { " ASC" });
                    if term.nulls_last {
                        rendered.push_str(" NULLS LAST");
                    }
                    Ok(rendered)
                })
                .collect::<StoreResult<Vec<_>>>()?;
            sql.push_str(&format!(" ORDER BY {}", terms.join(", ")));
        }

        if let Some(limit) = window.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if window.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(window.offset)));
            }
        } else if window.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(window.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record_row(row, table, &columns)?);
        }
        Ok(records)
    }

    fn insert(&self, collection: CollectionId, record: &Record) -> StoreResult<ItemId> {
        let table = collection.table_name();
        if record.is_empty() {
            return Err(StoreError::InvalidData(format!(
                "cannot insert an empty record into `{table}`"
            )));
        }

        let mut columns = Vec::with_capacity(record.len());
        let mut bind_values = Vec::with_capacity(record.len());
        for (column, value) in record {
            if *column == "id" {
                return Err(StoreError::InvalidData(format!(
                    "`{table}.id` is assigned by storage"
                )));
            }
            columns.push(checked_column(collection, *column)?);
            bind_values.push(to_sql_value(value));
        }

        let placeholders = vec!["?"; columns.len()].join(", ");
        self.conn.execute(
            &format!(
                "INSERT INTO {table} ({}) VALUES ({placeholders});",
                columns.join(", ")
            ),
            params_from_iter(bind_values),
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_by_id(
        &self,
        collection: CollectionId,
        id: ItemId,
        patch: &Record,
    ) -> StoreResult<usize> {
        let table = collection.table_name();
        if patch.is_empty() {
            return Ok(0);
        }

        let mut assignments = Vec::with_capacity(patch.len());
        let mut bind_values = Vec::with_capacity(patch.len() + 1);
        for (column, value) in patch {
            if *column == "id" {
                return Err(StoreError::InvalidData(format!(
                    "`{table}.id` is immutable"
                )));
            }
            assignments.push(format!("{} = ?", checked_column(collection, *column)?));
            bind_values.push(to_sql_value(value));
        }
        bind_values.push(Value::Integer(id));

        let changed = self.conn.execute(
            &format!(
                "UPDATE {table} SET {} WHERE id = ?;",
                assignments.join(", ")
            ),
            params_from_iter(bind_values),
        )?;
        Ok(changed)
    }

    fn delete_by_id(&self, collection: CollectionId, id: ItemId) -> StoreResult<usize> {
        let changed = self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1;", collection.table_name()),
            [id],
        )?;
        Ok(changed)
    }
}

/// Every column of a collection table: universal columns, then attributes.
pub fn columns_of(collection: CollectionId) -> Vec<&'static str> {
    UNIVERSAL_COLUMNS
        .iter()
        .copied()
        .chain(attribute_fields(collection).iter().map(|field| field.name))
        .collect()
}

fn checked_column(collection: CollectionId, column: &'static str) -> StoreResult<&'static str> {
    let known = UNIVERSAL_COLUMNS.contains(&column)
        || attribute_fields(collection)
            .iter()
            .any(|field| field.name == column);
    if known {
        Ok(column)
    } else {
        Err(StoreError::UnknownColumn {
            table: collection.table_name(),
            column,
        })
    }
}

fn to_sql_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Integer(number) => Value::Integer(*number),
        FieldValue::Text(text) => Value::Text(text.clone()),
    }
}

fn parse_record_row(
    row: &Row<'_>,
    table: &'static str,
    columns: &[&'static str],
) -> StoreResult<Record> {
    let mut record = Record::new();
    for (index, column) in columns.iter().enumerate() {
        let value = match row.get_ref(index)? {
            ValueRef::Null => FieldValue::Null,
            ValueRef::Integer(number) => FieldValue::Integer(number),
            ValueRef::Text(bytes) => FieldValue::Text(
                std::str::from_utf8(bytes)
                    .map_err(|_| {
                        StoreError::InvalidData(format!("non-utf8 text in {table}.{column}"))
                    })?
                    .to_string(),
            ),
            ValueRef::Real(_) | ValueRef::Blob(_) => {
                return Err(StoreError::InvalidData(format!(
                    "unsupported value type in {table}.{column}"
                )));
            }
        };
        record.insert(*column, value);
    }
    Ok(record)
}

/// Converts one stored row of `collection` into the canonical item shape.
pub fn record_to_item(collection: CollectionId, record: &Record) -> StoreResult<Item> {
    let table = collection.table_name();
    let text = |column: &'static str| -> StoreResult<Option<String>> {
        match record.get(column) {
            None | Some(FieldValue::Null) => Ok(None),
            Some(FieldValue::Text(value)) => Ok(Some(value.clone())),
            Some(FieldValue::Integer(_)) => Err(StoreError::InvalidData(format!(
                "expected text in {table}.{column}"
            ))),
        }
    };
    let integer = |column: &'static str| -> StoreResult<Option<i64>> {
        match record.get(column) {
            None | Some(FieldValue::Null) => Ok(None),
            Some(FieldValue::Integer(value)) => Ok(Some(*value)),
            Some(FieldValue::Text(_)) => Err(StoreError::InvalidData(format!(
                "expected integer in {table}.{column}"
            ))),
        }
    };
    let missing = |column: &str| StoreError::InvalidData(format!("missing {table}.{column}"));

    let id = integer("id")?.ok_or_else(|| missing("id"))?;
    let domain = text("domain")?.ok_or_else(|| missing("domain"))?;
    let path = TaxonomyPath {
        domain,
        category: text("category")?,
        subcategory: text("subcategory")?,
    };

    let status_text = text("status")?.ok_or_else(|| missing("status"))?;
    let status = ItemStatus::parse(&status_text).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid status `{status_text}` in {table}.status"))
    })?;

    let rating = match integer("rating")? {
        Some(value) => Some(
            u8::try_from(value)
                .ok()
                .filter(|rating| *rating <= 5)
                .ok_or_else(|| {
                    StoreError::InvalidData(format!("invalid rating `{value}` in {table}.rating"))
                })?,
        ),
        None => None,
    };

    let attributes = attribute_fields(collection)
        .iter()
        .filter_map(|field| match record.get(field.name) {
            None | Some(FieldValue::Null) => None,
            Some(value) => Some((field.name.to_string(), value.clone())),
        })
        .collect();

    Ok(Item {
        id,
        path,
        title: text("title")?.ok_or_else(|| missing("title"))?,
        status,
        rating,
        notes: text("notes")?,
        attributes,
        created_at: integer("created_at")?.ok_or_else(|| missing("created_at"))?,
        updated_at: integer("updated_at")?.ok_or_else(|| missing("updated_at"))?,
    })
}

fn ensure_store_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for collection in CollectionId::ALL {
        let table = collection.table_name();
        if !table_exists(conn, table)? {
            return Err(StoreError::MissingRequiredTable(table));
        }
        let present = table_columns(conn, table)?;
        if let Some(column) = columns_of(collection)
            .into_iter()
            .find(|column| !present.iter().any(|name| name == column))
        {
            return Err(StoreError::MissingRequiredColumn { table, column });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::{
        record_to_item, Condition, ItemStore, OrderTerm, Predicate, Record, SqliteItemStore,
        StoreError, StoreWindow,
    };
    use crate::db::open_db_in_memory;
    use crate::model::collection::CollectionId;
    use crate::model::item::{FieldValue, ItemStatus};
    use crate::model::taxonomy::TaxonomyPath;
    use rusqlite::Connection;

    fn book(title: &str, rating: Option<i64>, created_at: i64) -> Record {
        let mut record = Record::new();
        record.insert("domain", "intellectual".into());
        record.insert("category", "books".into());
        record.insert("title", title.into());
        record.insert("status", "wishlist".into());
        record.insert("rating", rating.into());
        record.insert("created_at", created_at.into());
        record.insert("updated_at", created_at.into());
        record
    }

    #[test]
    fn try_new_rejects_unmigrated_connection() {
        let conn = Connection::open_in_memory().unwrap();
        let err = SqliteItemStore::try_new(&conn).err().unwrap();
        assert!(matches!(
            err,
            StoreError::UninitializedConnection {
                actual_version: 0,
                ..
            }
        ));
    }

    #[test]
    fn insert_query_update_delete_cycle() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteItemStore::try_new(&conn).unwrap();

        let id = store
            .insert(CollectionId::ReadingList, &book("Dune", Some(5), 100))
            .unwrap();
        let rows = store
            .query(
                CollectionId::ReadingList,
                &Predicate::new().and(Condition::Eq("id", id.into())),
                &[],
                StoreWindow::default(),
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        let item = record_to_item(CollectionId::ReadingList, &rows[0]).unwrap();
        assert_eq!(item.title, "Dune");
        assert_eq!(item.status, ItemStatus::Wishlist);
        assert_eq!(item.path, TaxonomyPath::category("intellectual", "books"));

        let mut patch = Record::new();
        patch.insert("rating", FieldValue::Integer(3));
        assert_eq!(
            store
                .update_by_id(CollectionId::ReadingList, id, &patch)
                .unwrap(),
            1
        );
        assert_eq!(store.delete_by_id(CollectionId::ReadingList, id).unwrap(), 1);
        assert_eq!(store.delete_by_id(CollectionId::ReadingList, id).unwrap(), 0);
    }

    #[test]
    fn order_terms_put_missing_ratings_last() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteItemStore::try_new(&conn).unwrap();
        for (title, rating) in [("a", None), ("b", Some(2)), ("c", Some(4))] {
            store
                .insert(CollectionId::ReadingList, &book(title, rating, 1))
                .unwrap();
        }

        let rows = store
            .query(
                CollectionId::ReadingList,
                &Predicate::under(&TaxonomyPath::domain("intellectual")),
                &[OrderTerm::desc("rating").nulls_last(), OrderTerm::asc("id")],
                StoreWindow {
                    limit: Some(10),
                    offset: 0,
                },
            )
            .unwrap();
        let titles = rows
            .iter()
            .map(|row| row["title"].as_text().unwrap().to_string())
            .collect::<Vec<_>>();
        assert_eq!(titles, ["c", "b", "a"]);
    }

    #[test]
    fn unknown_columns_are_rejected_before_sql() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteItemStore::try_new(&conn).unwrap();
        let mut record = book("x", None, 1);
        record.insert("cuisine", "thai".into());
        let err = store.insert(CollectionId::ReadingList, &record).unwrap_err();
        assert!(matches!(
            err,
            StoreError::UnknownColumn {
                table: "reading_list",
                column: "cuisine"
            }
        ));
    }
}
