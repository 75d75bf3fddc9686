//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose engine operations to Dart via FRB as sync calls.
//! - Carry structured payloads as JSON strings inside one response envelope.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Failures always carry a stable `error_kind` from `ErrorKind::as_str`
//!   or one of the shell-local kinds below (`bad_request`, `startup`,
//!   `internal`).
//! - Taxonomy paths cross the boundary as `domain[/category[/subcategory]]`.

use cerebral_core::db::open_db;
use cerebral_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    CollectionRouter, Engine, EngineConfig, EngineError, EngineSettings, ItemFilter, ItemId,
    ItemPayload, PageRequest, SortOrder, SqliteItemStore, TaxonomyPath,
};
use log::warn;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::OnceLock;

const ENGINE_DB_FILE_NAME: &str = "cerebral.sqlite3";
const KIND_BAD_REQUEST: &str = "bad_request";
const KIND_STARTUP: &str = "startup";
const KIND_INTERNAL: &str = "internal";

static RUNTIME: OnceLock<Result<FfiRuntime, String>> = OnceLock::new();

/// Process-wide engine inputs resolved once from config and environment.
struct FfiRuntime {
    router: CollectionRouter,
    settings: EngineSettings,
    db_path: PathBuf,
}

/// Response envelope shared by every engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineResponse {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Machine-readable failure class; `None` on success.
    pub error_kind: Option<String>,
    /// Human-readable message for diagnostics/UI.
    pub message: String,
    /// JSON result on success; validation issues on `validation` failures.
    pub data_json: Option<String>,
}

impl EngineResponse {
    fn success(message: impl Into<String>, data: &impl Serialize) -> Self {
        match serde_json::to_string(data) {
            Ok(data_json) => Self {
                ok: true,
                error_kind: None,
                message: message.into(),
                data_json: Some(data_json),
            },
            Err(err) => Self::failure(KIND_INTERNAL, format!("response encoding failed: {err}")),
        }
    }

    fn failure(kind: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error_kind: Some(kind.to_string()),
            message: message.into(),
            data_json: None,
        }
    }

    fn from_engine_error(operation: &str, err: &EngineError) -> Self {
        let mut response = Self::failure(err.kind().as_str(), format!("{operation} failed: {err}"));
        if let EngineError::Validation(validation) = err {
            response.data_json = serde_json::to_string(validation).ok();
        }
        response
    }
}

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts with different level or directory return error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Returns the node at `path`; an empty `path` returns the domain list.
#[flutter_rust_bridge::frb(sync)]
pub fn taxonomy_node(path: String) -> EngineResponse {
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(response) => return response,
    };
    if path.trim().is_empty() {
        return EngineResponse::success("Domains.", &runtime.router.registry().domains());
    }
    let path = match parse_path(&path) {
        Ok(path) => path,
        Err(response) => return response,
    };
    match runtime.router.registry().get_node(&path) {
        Ok(node) => EngineResponse::success("Node found.", node),
        Err(err) => EngineResponse::from_engine_error("taxonomy_node", &err.into()),
    }
}

/// Returns the direct children of `path` in declaration order.
#[flutter_rust_bridge::frb(sync)]
pub fn taxonomy_children(path: String) -> EngineResponse {
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(response) => return response,
    };
    let path = match parse_path(&path) {
        Ok(path) => path,
        Err(response) => return response,
    };
    match runtime.router.registry().list_children(&path) {
        Ok(children) => EngineResponse::success(format!("{} child node(s).", children.len()), &children),
        Err(err) => EngineResponse::from_engine_error("taxonomy_children", &err.into()),
    }
}

/// Returns the form schema for leaf or branch `path`.
#[flutter_rust_bridge::frb(sync)]
pub fn form_schema(path: String) -> EngineResponse {
    let path = match parse_path(&path) {
        Ok(path) => path,
        Err(response) => return response,
    };
    with_engine("form_schema", |engine| {
        engine
            .get_schema(&path)
            .map_err(EngineError::from)
            .map(|schema| EngineResponse::success("Schema resolved.", &schema))
    })
}

/// Lists items under `path`.
///
/// Input semantics:
/// - `filter_json`: `{"status": "...", "search_text": "..."}`; empty means no filter.
/// - `sort`: `recent|oldest|name|rating`; empty means `recent`.
/// - `limit`: `None` or `0` applies the configured default page size.
#[flutter_rust_bridge::frb(sync)]
pub fn items_query(
    path: String,
    filter_json: String,
    sort: String,
    offset: u32,
    limit: Option<u32>,
) -> EngineResponse {
    let path = match parse_path(&path) {
        Ok(path) => path,
        Err(response) => return response,
    };
    let filter = match parse_filter(&filter_json) {
        Ok(filter) => filter,
        Err(response) => return response,
    };
    let sort = match parse_sort(&sort) {
        Ok(sort) => sort,
        Err(response) => return response,
    };
    let page = PageRequest { offset, limit };
    with_engine("items_query", |engine| {
        engine.query(&path, &filter, sort, page).map(|page| {
            EngineResponse::success(format!("Found {} item(s).", page.total), &page)
        })
    })
}

/// Searches titles and text fields across every collection.
#[flutter_rust_bridge::frb(sync)]
pub fn items_search(text: String, offset: u32, limit: Option<u32>) -> EngineResponse {
    let page = PageRequest { offset, limit };
    with_engine("items_search", |engine| {
        engine
            .search_everywhere(&text, SortOrder::Recent, page)
            .map(|page| EngineResponse::success(format!("Found {} item(s).", page.total), &page))
    })
}

/// Returns the most recently created items across every collection.
#[flutter_rust_bridge::frb(sync)]
pub fn items_recent(limit: Option<u32>) -> EngineResponse {
    with_engine("items_recent", |engine| {
        engine
            .recent_items(limit)
            .map(|items| EngineResponse::success(format!("{} recent item(s).", items.len()), &items))
    })
}

/// Returns aggregate stats for `path`; an empty `path` returns all domains.
#[flutter_rust_bridge::frb(sync)]
pub fn node_stats(path: String) -> EngineResponse {
    if path.trim().is_empty() {
        return with_engine("node_stats", |engine| {
            engine
                .overview()
                .map(|stats| EngineResponse::success("Overview computed.", &stats))
        });
    }
    let path = match parse_path(&path) {
        Ok(path) => path,
        Err(response) => return response,
    };
    with_engine("node_stats", |engine| {
        engine
            .node_stats(&path)
            .map(|stats| EngineResponse::success("Stats computed.", &stats))
    })
}

/// Returns aggregate stats for every child of `path`.
#[flutter_rust_bridge::frb(sync)]
pub fn child_stats(path: String) -> EngineResponse {
    let path = match parse_path(&path) {
        Ok(path) => path,
        Err(response) => return response,
    };
    with_engine("child_stats", |engine| {
        engine
            .child_stats(&path)
            .map(|stats| EngineResponse::success("Stats computed.", &stats))
    })
}

/// Creates an item under leaf `path` from a JSON object payload.
#[flutter_rust_bridge::frb(sync)]
pub fn item_create(path: String, payload_json: String) -> EngineResponse {
    let path = match parse_path(&path) {
        Ok(path) => path,
        Err(response) => return response,
    };
    let payload = match parse_payload(&payload_json) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    with_engine("item_create", |engine| {
        engine
            .create(&path, &payload)
            .map(|item| EngineResponse::success("Item created.", &item))
    })
}

/// Applies a partial update; `null` values clear optional fields.
#[flutter_rust_bridge::frb(sync)]
pub fn item_update(path: String, id: ItemId, patch_json: String) -> EngineResponse {
    let path = match parse_path(&path) {
        Ok(path) => path,
        Err(response) => return response,
    };
    let patch = match parse_payload(&patch_json) {
        Ok(patch) => patch,
        Err(response) => return response,
    };
    with_engine("item_update", |engine| {
        engine
            .update(id, &path, &patch)
            .map(|item| EngineResponse::success("Item updated.", &item))
    })
}

/// Deletes item `id` under leaf `path`.
#[flutter_rust_bridge::frb(sync)]
pub fn item_delete(path: String, id: ItemId) -> EngineResponse {
    let path = match parse_path(&path) {
        Ok(path) => path,
        Err(response) => return response,
    };
    with_engine("item_delete", |engine| {
        engine
            .delete(id, &path)
            .map(|()| EngineResponse::success("Item deleted.", &id))
    })
}

fn runtime() -> Result<&'static FfiRuntime, EngineResponse> {
    RUNTIME
        .get_or_init(load_runtime)
        .as_ref()
        .map_err(|message| EngineResponse::failure(KIND_STARTUP, message.clone()))
}

fn load_runtime() -> Result<FfiRuntime, String> {
    let config = EngineConfig::load(None).map_err(|err| format!("engine config failed: {err}"))?;
    let router = config
        .load_router()
        .map_err(|err| format!("taxonomy load failed: {err}"))?;
    let db_path = config
        .db_path
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join(ENGINE_DB_FILE_NAME));
    Ok(FfiRuntime {
        router,
        settings: config.settings(),
        db_path,
    })
}

fn with_engine(
    operation: &str,
    f: impl FnOnce(&Engine<SqliteItemStore<'_>>) -> Result<EngineResponse, EngineError>,
) -> EngineResponse {
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(response) => return response,
    };
    let conn = match open_db(&runtime.db_path) {
        Ok(conn) => conn,
        Err(err) => {
            warn!("event=db_open module=ffi status=error operation={operation} error={err}");
            return EngineResponse::failure(KIND_STARTUP, format!("engine DB open failed: {err}"));
        }
    };
    let store = match SqliteItemStore::try_new(&conn) {
        Ok(store) => store,
        Err(err) => {
            return EngineResponse::failure(KIND_STARTUP, format!("item store init failed: {err}"))
        }
    };
    let engine = Engine::new(runtime.router.clone(), store).with_settings(runtime.settings);
    match f(&engine) {
        Ok(response) => response,
        Err(err) => EngineResponse::from_engine_error(operation, &err),
    }
}

fn parse_path(raw: &str) -> Result<TaxonomyPath, EngineResponse> {
    TaxonomyPath::parse(raw).ok_or_else(|| {
        EngineResponse::failure(
            KIND_BAD_REQUEST,
            format!("`{}` is not a taxonomy path", raw.trim()),
        )
    })
}

fn parse_payload(raw: &str) -> Result<ItemPayload, EngineResponse> {
    if raw.trim().is_empty() {
        return Ok(ItemPayload::new());
    }
    serde_json::from_str::<ItemPayload>(raw).map_err(|err| {
        EngineResponse::failure(KIND_BAD_REQUEST, format!("payload must be a JSON object: {err}"))
    })
}

fn parse_filter(raw: &str) -> Result<ItemFilter, EngineResponse> {
    if raw.trim().is_empty() {
        return Ok(ItemFilter::default());
    }
    serde_json::from_str::<ItemFilter>(raw).map_err(|err| {
        EngineResponse::failure(KIND_BAD_REQUEST, format!("invalid filter: {err}"))
    })
}

fn parse_sort(raw: &str) -> Result<SortOrder, EngineResponse> {
    if raw.trim().is_empty() {
        return Ok(SortOrder::default());
    }
    SortOrder::parse(raw).ok_or_else(|| {
        EngineResponse::failure(
            KIND_BAD_REQUEST,
            format!("unsupported sort `{}`; expected recent|oldest|name|rating", raw.trim()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::{
        child_stats, core_version, form_schema, init_logging, item_create, item_delete,
        item_update, items_query, items_search, node_stats, ping, taxonomy_children,
        taxonomy_node, EngineResponse,
    };
    use serde_json::Value;
    use std::collections::BTreeMap;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "/tmp/cerebral-logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn taxonomy_calls_expose_builtin_tree() {
        let domains = taxonomy_node(String::new());
        assert!(domains.ok, "{}", domains.message);
        assert_eq!(data(&domains.data_json).as_array().map(Vec::len), Some(4));

        let children = taxonomy_children("intellectual/professional".to_string());
        assert!(children.ok, "{}", children.message);
        assert_eq!(data(&children.data_json).as_array().map(Vec::len), Some(6));

        let unknown = taxonomy_node("intellectual/nonsense".to_string());
        assert!(!unknown.ok);
        assert_eq!(unknown.error_kind.as_deref(), Some("unknown_node"));
    }

    #[test]
    fn malformed_inputs_are_bad_requests() {
        let bad_path = items_query(" / ".to_string(), String::new(), String::new(), 0, None);
        assert_eq!(bad_path.error_kind.as_deref(), Some("bad_request"));

        let bad_sort = items_query(
            "intellectual".to_string(),
            String::new(),
            "loudest".to_string(),
            0,
            None,
        );
        assert_eq!(bad_sort.error_kind.as_deref(), Some("bad_request"));

        let bad_payload = item_create("intellectual/books".to_string(), "[1, 2]".to_string());
        assert_eq!(bad_payload.error_kind.as_deref(), Some("bad_request"));
    }

    #[test]
    fn item_lifecycle_round_trips_through_envelopes() {
        let title = unique_token("ffi-book");
        let created = item_create(
            "intellectual/books".to_string(),
            format!(r#"{{"title": "{title}", "author": "Frank Herbert"}}"#),
        );
        assert!(created.ok, "{}", created.message);
        let item = data(&created.data_json);
        let id = item["id"].as_i64().unwrap();
        assert_eq!(item["status"], "wishlist");

        let updated = item_update(
            "intellectual/books".to_string(),
            id,
            r#"{"status": "completed", "rating": 5}"#.to_string(),
        );
        assert!(updated.ok, "{}", updated.message);
        assert_eq!(data(&updated.data_json)["rating"], 5);

        let found = items_query(
            "intellectual".to_string(),
            format!(r#"{{"search_text": "{title}"}}"#),
            "name".to_string(),
            0,
            Some(5),
        );
        assert!(found.ok, "{}", found.message);
        assert_eq!(data(&found.data_json)["total"], 1);

        let searched = items_search(title.clone(), 0, None);
        assert_eq!(data(&searched.data_json)["total"], 1);

        let deleted = item_delete("intellectual/books".to_string(), id);
        assert!(deleted.ok, "{}", deleted.message);
        let again = item_delete("intellectual/books".to_string(), id);
        assert_eq!(again.error_kind.as_deref(), Some("not_found"));
    }

    #[test]
    fn validation_failures_carry_field_issues() {
        let response = item_create(
            "physical/restaurants".to_string(),
            r#"{"title": "Noma", "rating": 9}"#.to_string(),
        );
        assert!(!response.ok);
        assert_eq!(response.error_kind.as_deref(), Some("validation"));
        let issues = data(&response.data_json);
        let fields = issues["issues"]
            .as_array()
            .unwrap()
            .iter()
            .map(|issue| issue["field"].as_str().unwrap().to_string())
            .collect::<Vec<_>>();
        assert_eq!(fields, ["location", "rating"]);
    }

    #[test]
    fn unencodable_results_are_internal_failures() {
        let response = EngineResponse::success("Done.", &BTreeMap::from([(vec![1u8], 1u8)]));
        assert!(!response.ok);
        assert_eq!(response.error_kind.as_deref(), Some("internal"));
        assert!(response.data_json.is_none());
    }

    #[test]
    fn stats_and_schema_calls_succeed() {
        let overview = node_stats(String::new());
        assert!(overview.ok, "{}", overview.message);
        assert_eq!(data(&overview.data_json).as_array().map(Vec::len), Some(4));

        let children = child_stats("beyond".to_string());
        assert!(children.ok, "{}", children.message);

        let schema = form_schema("emotional/movies".to_string());
        assert!(schema.ok, "{}", schema.message);
        assert_eq!(data(&schema.data_json)["collection"], "media");
    }

    fn data(raw: &Option<String>) -> Value {
        serde_json::from_str(raw.as_deref().unwrap_or("null")).unwrap()
    }

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }
}
