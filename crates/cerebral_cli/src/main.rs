//! Command-line shell over the cerebral engine.
//!
//! # Responsibility
//! - Map subcommands onto engine operations against one database file.
//! - Print results as pretty JSON on stdout; errors go to stderr.
//!
//! # Invariants
//! - Exit status is non-zero whenever the engine reports an error.

use anyhow::{anyhow, bail, Context, Result};
use cerebral_core::db::open_db;
use cerebral_core::model::schema::FieldKind;
use cerebral_core::{
    init_logging, Engine, EngineConfig, FormSchema, ItemFilter, ItemId, ItemPayload, ItemStatus,
    PageRequest, SortOrder, SqliteItemStore, TaxonomyPath,
};
use clap::{Parser, Subcommand};
use log::warn;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

const DEFAULT_DB_FILE_NAME: &str = "cerebral.sqlite3";

#[derive(Debug, Parser)]
#[command(name = "cerebral", version, about = "Track what you read, watch, visit and practise")]
struct Cli {
    /// JSON config file; `CEREBRAL_*` variables still override it.
    #[arg(long, env = "CEREBRAL_CONFIG")]
    config: Option<PathBuf>,

    /// Database file, overriding config and environment.
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the full taxonomy tree.
    Tree,
    /// List the children of a node.
    Children { path: String },
    /// Show the form schema of a node.
    Schema { path: String },
    /// Aggregate stats for a node, or every domain when omitted.
    Stats { path: Option<String> },
    /// List items under a node.
    List {
        path: String,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        search: Option<String>,
        /// recent|oldest|name|rating
        #[arg(long, default_value = "recent")]
        sort: String,
        #[arg(long, default_value_t = 0)]
        offset: u32,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Search every collection by title and text fields.
    Search {
        text: String,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Most recently created items across all collections.
    Recent {
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show one item.
    Show { path: String, id: ItemId },
    /// Create an item under a leaf node.
    Add {
        path: String,
        #[arg(long)]
        title: String,
        /// Extra field as `name=value`, typed by the node's form schema;
        /// `null` clears a field.
        #[arg(long = "field", value_name = "NAME=VALUE")]
        fields: Vec<String>,
    },
    /// Update fields of an existing item.
    Update {
        path: String,
        id: ItemId,
        #[arg(long = "field", value_name = "NAME=VALUE")]
        fields: Vec<String>,
    },
    /// Delete an item.
    Rm { path: String, id: ItemId },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = EngineConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(log_dir) = config.log_dir.as_deref().and_then(|dir| dir.to_str()) {
        if let Err(err) = init_logging(&config.log_level, log_dir) {
            eprintln!("warning: file logging disabled: {err}");
        }
    }

    let router = config.load_router().context("loading taxonomy")?;
    let db_path = cli
        .db
        .or_else(|| config.db_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE_NAME));
    let conn = open_db(&db_path).with_context(|| format!("opening `{}`", db_path.display()))?;
    let store = SqliteItemStore::try_new(&conn)?;
    let engine = Engine::new(router, store).with_settings(config.settings());

    execute(&engine, cli.command)
}

fn execute(engine: &Engine<SqliteItemStore<'_>>, command: Command) -> Result<()> {
    match command {
        Command::Tree => print_json(&engine.domains()),
        Command::Children { path } => print_json(&engine.list_children(&parse_path(&path)?)?),
        Command::Schema { path } => print_json(&engine.get_schema(&parse_path(&path)?)?),
        Command::Stats { path: None } => print_json(&engine.overview()?),
        Command::Stats { path: Some(path) } => {
            let path = parse_path(&path)?;
            print_json(&engine.node_stats(&path)?)
        }
        Command::List {
            path,
            status,
            search,
            sort,
            offset,
            limit,
        } => {
            let filter = ItemFilter {
                status: status.as_deref().map(parse_status).transpose()?,
                search_text: search,
            };
            let page = engine.query(
                &parse_path(&path)?,
                &filter,
                parse_sort(&sort)?,
                PageRequest { offset, limit },
            )?;
            print_json(&page)
        }
        Command::Search { text, limit } => print_json(&engine.search_everywhere(
            &text,
            SortOrder::Recent,
            PageRequest { offset: 0, limit },
        )?),
        Command::Recent { limit } => print_json(&engine.recent_items(limit)?),
        Command::Show { path, id } => print_json(&engine.get(id, &parse_path(&path)?)?),
        Command::Add {
            path,
            title,
            fields,
        } => {
            let path = parse_path(&path)?;
            let mut payload = parse_fields(&fields, &engine.get_schema(&path)?)?;
            payload.insert("title".to_string(), Value::from(title));
            print_json(&engine.create(&path, &payload)?)
        }
        Command::Update { path, id, fields } => {
            let path = parse_path(&path)?;
            let patch = parse_fields(&fields, &engine.get_schema(&path)?)?;
            if patch.is_empty() {
                warn!("event=cli_update module=cli status=noop id={id}");
            }
            print_json(&engine.update(id, &path, &patch)?)
        }
        Command::Rm { path, id } => {
            engine.delete(id, &parse_path(&path)?)?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_path(raw: &str) -> Result<TaxonomyPath> {
    TaxonomyPath::parse(raw).ok_or_else(|| anyhow!("`{raw}` is not a taxonomy path"))
}

fn parse_sort(raw: &str) -> Result<SortOrder> {
    SortOrder::parse(raw)
        .ok_or_else(|| anyhow!("unsupported sort `{raw}`; expected recent|oldest|name|rating"))
}

fn parse_status(raw: &str) -> Result<ItemStatus> {
    ItemStatus::parse(raw.trim()).ok_or_else(|| anyhow!("unsupported status `{raw}`"))
}

/// Parses repeated `name=value` pairs into a payload typed by `schema`.
///
/// Text, enumerated and date fields keep the raw string, so `isbn=0441013597`
/// stays text. Numeric fields become integers when the value parses as one.
/// A bare `null` clears the field. Anything else is passed through as a
/// string and left to engine validation.
fn parse_fields(raw: &[String], schema: &FormSchema) -> Result<ItemPayload> {
    let mut payload = ItemPayload::new();
    for pair in raw {
        let Some((name, value)) = pair.split_once('=') else {
            bail!("field `{pair}` must look like NAME=VALUE");
        };
        let name = name.trim();
        if name.is_empty() {
            bail!("field `{pair}` has an empty name");
        }
        let kind = schema.field(name).map(|spec| spec.kind);
        payload.insert(name.to_string(), field_value(kind, value.trim()));
    }
    Ok(payload)
}

fn field_value(kind: Option<FieldKind>, value: &str) -> Value {
    if value == "null" {
        return Value::Null;
    }
    match kind {
        Some(FieldKind::Integer | FieldKind::Year | FieldKind::Rating) => value
            .parse::<i64>()
            .map_or_else(|_| Value::from(value), Value::from),
        _ => Value::from(value),
    }
}
