//! sqlshim CLI
//!
//! Runs one schema or CRUD operation against a database and prints the
//! result envelope as JSON.

use std::fs;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use sqlshim::{
    ColumnDefinition, ConnectionConfig, Database, DefaultValue, Filter, Join, Message,
    QueryResult, Record, SelectQuery, TableSchema,
};

/// Uniform CRUD and schema operations over an embedded SQL engine.
#[derive(Parser)]
#[command(name = "sqlshim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database location: a file path, or `:memory:`.
    #[arg(short, long, env = "SQLSHIM_DATABASE", default_value = "sqlshim.db")]
    database: String,

    /// Database driver.
    #[arg(long, default_value = "sqlite")]
    driver: String,

    /// Enable verbose output (logs every SQL statement).
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a table unless it already exists.
    CreateTable {
        /// Table schema as JSON, or `@path` to read it from a file.
        #[arg(long)]
        schema: String,
    },

    /// Insert one row.
    Insert {
        table: String,

        /// Row as a JSON object of column to value.
        #[arg(long)]
        row: String,
    },

    /// Select rows.
    Select {
        table: String,

        /// Comma-separated columns (all if not specified).
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,

        /// Conditions as a JSON object of field to condition.
        #[arg(long = "where")]
        filter: Option<String>,

        /// Join descriptors as a JSON array.
        #[arg(long)]
        joins: Option<String>,
    },

    /// Update matching rows.
    Update {
        table: String,

        /// Assignments as a JSON object of column to value.
        #[arg(long)]
        set: String,

        /// Conditions as a JSON object (every row if not specified).
        #[arg(long = "where")]
        filter: Option<String>,
    },

    /// Delete matching rows.
    Delete {
        table: String,

        /// Conditions as a JSON object (every row if not specified).
        #[arg(long = "where")]
        filter: Option<String>,
    },

    /// Walk through table creation, insert, select, update and a rolled
    /// back transaction.
    Demo,
}

/// A command with its JSON arguments decoded.
#[derive(Debug)]
enum Request {
    CreateTable(TableSchema),
    Insert {
        table: String,
        row: Record,
    },
    Select {
        table: String,
        query: SelectQuery,
    },
    Update {
        table: String,
        changes: Record,
        filter: Filter,
    },
    Delete {
        table: String,
        filter: Filter,
    },
    Demo,
}

/// Parses inline JSON, or the contents of the file named after a leading `@`.
fn parse_json<T: DeserializeOwned>(what: &str, input: &str) -> anyhow::Result<T> {
    let text = match input.strip_prefix('@') {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {what} from {path}"))?,
        None => input.to_string(),
    };
    serde_json::from_str(&text).with_context(|| format!("invalid {what} JSON"))
}

fn parse_filter(input: Option<&str>) -> anyhow::Result<Filter> {
    Ok(input
        .map(|json| parse_json("where", json))
        .transpose()?
        .unwrap_or_default())
}

impl TryFrom<Commands> for Request {
    type Error = anyhow::Error;

    fn try_from(command: Commands) -> anyhow::Result<Self> {
        let request = match command {
            Commands::CreateTable { schema } => Self::CreateTable(parse_json("schema", &schema)?),
            Commands::Insert { table, row } => Self::Insert {
                table,
                row: parse_json("row", &row)?,
            },
            Commands::Select {
                table,
                columns,
                filter,
                joins,
            } => {
                let joins: Vec<Join> = joins
                    .as_deref()
                    .map(|json| parse_json("joins", json))
                    .transpose()?
                    .unwrap_or_default();
                let mut query = SelectQuery::new()
                    .columns(columns)
                    .filter(parse_filter(filter.as_deref())?);
                for join in joins {
                    query = query.join(join);
                }
                Self::Select { table, query }
            }
            Commands::Update { table, set, filter } => Self::Update {
                table,
                changes: parse_json("set", &set)?,
                filter: parse_filter(filter.as_deref())?,
            },
            Commands::Delete { table, filter } => Self::Delete {
                table,
                filter: parse_filter(filter.as_deref())?,
            },
            Commands::Demo => Self::Demo,
        };
        Ok(request)
    }
}

async fn execute(db: &Database, request: Request) -> QueryResult {
    match request {
        Request::CreateTable(schema) => db
            .create_table(&schema)
            .await
            .map(|()| Message {
                message: format!("Table {} ready", schema.name),
            })
            .into(),
        Request::Insert { table, row } => db.insert(&table, &row).await.into(),
        Request::Select { table, query } => db.select(&table, &query).await.into(),
        Request::Update {
            table,
            changes,
            filter,
        } => db.update(&table, &changes, &filter).await.into(),
        Request::Delete { table, filter } => db.delete(&table, &filter).await.into(),
        Request::Demo => demo(db).await,
    }
}

/// Collects the envelope of every demo step under its name.
#[derive(Default)]
struct Walkthrough {
    steps: Map<String, Value>,
    failed: Option<String>,
}

impl Walkthrough {
    fn record(&mut self, step: &str, result: QueryResult) {
        info!(step, success = result.success, "Demo step finished");
        if !result.success && self.failed.is_none() {
            self.failed = Some(step.to_string());
        }
        let value = serde_json::to_value(&result).unwrap_or(Value::Null);
        self.steps.insert(step.to_string(), value);
    }

    fn finish(self) -> QueryResult {
        QueryResult {
            success: self.failed.is_none(),
            data: Some(Value::Object(self.steps)),
            error: self.failed.map(|step| format!("demo step {step} failed")),
        }
    }
}

fn demo_users() -> TableSchema {
    TableSchema::new("users")
        .column(
            ColumnDefinition::new("id", "INTEGER")
                .primary_key()
                .auto_increment(),
        )
        .column(ColumnDefinition::new("username", "TEXT").not_null().unique())
        .column(ColumnDefinition::new("email", "TEXT").not_null())
        .column(
            ColumnDefinition::new("created_at", "DATETIME")
                .default(DefaultValue::CurrentTimestamp),
        )
}

async fn demo(db: &Database) -> QueryResult {
    let mut walkthrough = Walkthrough::default();
    let by_username = |name: &str| Filter::new().eq("username", name);

    walkthrough.record("create_table", db.create_table(&demo_users()).await.into());

    // Reruns against the same file would otherwise trip the UNIQUE constraint.
    walkthrough.record(
        "cleanup",
        db.delete("users", &by_username("testuser")).await.into(),
    );

    let user = Record::new()
        .set("username", "testuser")
        .set("email", "test@example.com");
    walkthrough.record("insert", db.insert("users", &user).await.into());

    let query = SelectQuery::new().columns(["id", "username", "email", "created_at"]);
    walkthrough.record("select", db.select("users", &query).await.into());

    let changes = Record::new().set("email", "updated@example.com");
    walkthrough.record(
        "update",
        db.update("users", &changes, &by_username("testuser"))
            .await
            .into(),
    );

    let rolled_back: sqlshim::Result<Message> = async {
        let mut tx = db.begin_transaction().await?;
        let inserted = db
            .insert(
                "users",
                &Record::new()
                    .set("username", "transient")
                    .set("email", "transient@example.com"),
            )
            .await;
        tx.rollback().await?;
        inserted.map(|inserted| Message {
            message: format!("insert of row {} rolled back", inserted.id),
        })
    }
    .await;
    walkthrough.record("transaction", rolled_back.into());

    let query = SelectQuery::new().filter(by_username("transient"));
    walkthrough.record("after_rollback", db.select("users", &query).await.into());

    walkthrough.finish()
}

fn emit(result: &QueryResult) -> anyhow::Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let db = Database::new(&cli.driver)?;
    let request = Request::try_from(cli.command)?;

    if let Err(err) = db.connect(&ConnectionConfig::sqlite(cli.database)).await {
        return emit(&QueryResult::failure(err));
    }
    let result = execute(&db, request).await;
    db.disconnect().await?;

    emit(&result)
}
