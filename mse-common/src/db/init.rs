//! Database initialization
//!
//! Creates the SQLite file on first run and brings the schema up to date.
//! Every statement is idempotent, so opening an existing database re-runs
//! the same sequence safely.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Current schema version recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

/// How long a connection waits on a held write lock before `SQLITE_BUSY`
pub const BUSY_TIMEOUT_MS: u64 = 5000;

const POOL_SIZE: u32 = 10;

/// Initialize database connection and create tables if needed
///
/// Foreign keys, WAL and the busy timeout are connection options, so every
/// connection the pool opens carries them.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // WAL lets judge devices read while another submission is being written
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(POOL_SIZE)
        .min_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory database with the full schema
///
/// The pool is pinned to a single connection that never expires, since each
/// SQLite memory connection is its own database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;

    // Rule catalog (authored externally, read-only to the engine)
    create_modalities_table(pool).await?;
    create_scoring_models_table(pool).await?;
    create_rule_fields_table(pool).await?;
    create_team_members_table(pool).await?;

    // Engine-owned tables
    create_heats_table(pool).await?;
    create_score_records_table(pool).await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_modalities_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS modalities (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            rule_type TEXT NOT NULL CHECK (rule_type IN ('time', 'distance', 'points', 'sets', 'arrows')),
            uses_heats INTEGER NOT NULL DEFAULT 0,
            lane_count INTEGER,
            allows_final_heat INTEGER NOT NULL DEFAULT 0,
            is_team INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_scoring_models_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scoring_models (
            guid TEXT PRIMARY KEY,
            modality_id TEXT NOT NULL UNIQUE REFERENCES modalities(guid) ON DELETE CASCADE,
            rule_type TEXT NOT NULL CHECK (rule_type IN ('time', 'distance', 'points', 'sets', 'arrows'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Rule fields
///
/// `category` separates judge-entered scoring fields from model-level
/// configuration switches. Configuration rows use `value`; scoring rows use
/// `input_kind` and `metadata` (JSON).
async fn create_rule_fields_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rule_fields (
            model_id TEXT NOT NULL REFERENCES scoring_models(guid) ON DELETE CASCADE,
            field_key TEXT NOT NULL,
            category TEXT NOT NULL CHECK (category IN ('scoring', 'configuration')),
            label TEXT NOT NULL DEFAULT '',
            input_kind TEXT CHECK (input_kind IN ('numeric', 'integer', 'text', 'selection', 'calculated')),
            required INTEGER NOT NULL DEFAULT 0,
            display_order INTEGER NOT NULL DEFAULT 0,
            metadata TEXT NOT NULL DEFAULT '{}',
            value TEXT,
            PRIMARY KEY (model_id, field_key)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_team_members_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS team_members (
            team_id TEXT NOT NULL,
            event_id TEXT NOT NULL,
            modality_id TEXT NOT NULL,
            athlete_id TEXT NOT NULL,
            PRIMARY KEY (team_id, event_id, modality_id, athlete_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Heats (batteries)
///
/// Number 999 is the reserved final heat; the unique key allows at most one
/// per modality.
async fn create_heats_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS heats (
            modality_id TEXT NOT NULL,
            number INTEGER NOT NULL CHECK (number > 0),
            created_at TEXT NOT NULL,
            PRIMARY KEY (modality_id, number)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Score records
///
/// One row per (event, modality, athlete, heat). A NULL heat is a key of its
/// own, hence the IFNULL in the unique index.
async fn create_score_records_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS score_records (
            guid TEXT PRIMARY KEY,
            event_id TEXT NOT NULL,
            modality_id TEXT NOT NULL,
            athlete_id TEXT NOT NULL,
            team_id TEXT,
            heat_number INTEGER CHECK (heat_number IS NULL OR heat_number > 0),
            judge_id TEXT NOT NULL,
            magnitude TEXT NOT NULL,
            unit TEXT NOT NULL CHECK (unit IN ('time', 'meters', 'points')),
            lane INTEGER,
            attempt_values TEXT NOT NULL DEFAULT '{}',
            notes TEXT,
            recorded_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_score_records_key
        ON score_records (event_id, modality_id, athlete_id, IFNULL(heat_number, 0))
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_score_records_team
        ON score_records (event_id, modality_id, team_id)
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
