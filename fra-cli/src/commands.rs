//! Subcommand implementations
//!
//! Every command starts the same way: create the root folder if needed,
//! open or create the database under it, then wire up whichever engine the
//! command needs. Results print to stdout as pretty JSON.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use fra_common::config;
use fra_common::db::claims;
use fra_common::db::init::init_database;
use fra_common::events::EventBus;
use fra_dss::{DssService, Scheme, ScoreQuery};
use fra_recon::{normalizer, BulkImporter, ReconcileEngine};
use serde_json::json;
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::{Command, StatsKind};

const EVENT_BUS_CAPACITY: usize = 64;

pub async fn run(command: Command, root_folder: PathBuf) -> Result<()> {
    config::ensure_root_folder(&root_folder)
        .with_context(|| format!("Failed to create root folder {}", root_folder.display()))?;
    let db_path = config::database_path(&root_folder);
    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    match command {
        Command::Init => init(&root_folder, &db_path),
        Command::Reconcile {
            file,
            source,
            actor,
        } => reconcile(&pool, &file, &source, actor.as_deref()).await,
        Command::ImportClaims { csv } => import_claims(&pool, &csv).await,
        Command::Resync { skip_scorer } => resync(&pool, &root_folder, skip_scorer).await,
        Command::ResyncStatus => resync_status(&pool, &root_folder).await,
        Command::Scores {
            claim_id,
            state,
            district,
            village,
        } => {
            let query = ScoreQuery {
                claim_id,
                state,
                district,
                village,
            };
            scores(&pool, &root_folder, query).await
        }
        Command::Recommend { claim_id } => recommend(&pool, &root_folder, &claim_id).await,
        Command::Stats { kind } => stats(&pool, &root_folder, kind).await,
        Command::TopVillages { scheme, limit } => {
            top_villages(&pool, &root_folder, &scheme, limit).await
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Decision-support service wired from the root folder and config file.
fn dss_service(pool: &Pool<Sqlite>, root_folder: &Path) -> DssService {
    let file_config = config::load_file_config();
    DssService::new(
        pool.clone(),
        EventBus::new(EVENT_BUS_CAPACITY),
        config::snapshot_path(root_folder, &file_config),
        config::scorer_command(root_folder, &file_config),
    )
}

fn init(root_folder: &Path, db_path: &Path) -> Result<()> {
    // Opening the pool above already created the folder and schema
    print_json(&json!({
        "root_folder": root_folder.display().to_string(),
        "database": db_path.display().to_string(),
        "status": "ready",
    }))
}

async fn reconcile(
    pool: &Pool<Sqlite>,
    file: &Path,
    source: &str,
    actor: Option<&str>,
) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let raw: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", file.display()))?;
    let record = match raw.as_object() {
        Some(record) => record,
        None => bail!(
            "{} must contain one JSON object of extracted fields",
            file.display()
        ),
    };

    let engine = ReconcileEngine::new(pool.clone(), EventBus::new(EVENT_BUS_CAPACITY));
    let outcome = engine
        .reconcile(&normalizer::normalize(record), source, actor)
        .await?;
    print_json(&outcome)
}

async fn import_claims(pool: &Pool<Sqlite>, csv: &Path) -> Result<()> {
    let engine = Arc::new(ReconcileEngine::new(
        pool.clone(),
        EventBus::new(EVENT_BUS_CAPACITY),
    ));
    let summary = BulkImporter::new(engine).import_csv(csv, "csv_import").await?;
    print_json(&summary)
}

async fn resync(pool: &Pool<Sqlite>, root_folder: &Path, skip_scorer: bool) -> Result<()> {
    let service = dss_service(pool, root_folder);
    let summary = service.resync_now(skip_scorer).await?;
    print_json(&summary)
}

async fn resync_status(pool: &Pool<Sqlite>, root_folder: &Path) -> Result<()> {
    let service = dss_service(pool, root_folder);
    let status = service.resync_handle().status().await;
    print_json(&status)
}

async fn scores(pool: &Pool<Sqlite>, root_folder: &Path, query: ScoreQuery) -> Result<()> {
    let service = dss_service(pool, root_folder);
    let listing = service.scores(&query).await?;
    print_json(&json!({
        "origin": listing.origin,
        "count": listing.rows.len(),
        "rows": &*listing.rows,
    }))
}

async fn recommend(pool: &Pool<Sqlite>, root_folder: &Path, claim_id: &Uuid) -> Result<()> {
    let service = dss_service(pool, root_folder);
    match service.recommend_for_claim(claim_id).await? {
        Some(recommendation) => print_json(&recommendation),
        None => print_json(&json!({
            "claimId": claim_id,
            "status": "not_available",
        })),
    }
}

async fn stats(pool: &Pool<Sqlite>, root_folder: &Path, kind: StatsKind) -> Result<()> {
    match kind {
        StatsKind::Claims => {
            let statistics = claims::claim_statistics(pool).await?;
            print_json(&statistics)
        }
        StatsKind::Schemes => {
            let service = dss_service(pool, root_folder);
            let (statistics, origin) = service.score_statistics().await?;
            print_json(&json!({
                "origin": origin,
                "statistics": statistics,
            }))
        }
    }
}

async fn top_villages(
    pool: &Pool<Sqlite>,
    root_folder: &Path,
    scheme: &str,
    limit: usize,
) -> Result<()> {
    let scheme = match Scheme::parse(scheme) {
        Some(scheme) => scheme,
        None => bail!(
            "Unknown scheme '{}', expected one of jal_jeevan_mission, dajgua, mgnrega, pm_kisan, pmay",
            scheme
        ),
    };
    let service = dss_service(pool, root_folder);
    let (villages, origin) = service.top_villages(scheme, limit).await?;
    print_json(&json!({
        "scheme": scheme.slug(),
        "origin": origin,
        "count": villages.len(),
        "villages": villages,
    }))
}
