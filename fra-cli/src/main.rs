//! fra - forest-rights claims backend CLI
//!
//! One binary wrapping the reconciliation engine and the decision-support
//! service: initialize a root folder, feed extracted records and legacy
//! registers in, run score resyncs, and read scores, recommendations, and
//! statistics back out as JSON.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

mod commands;

/// Command-line arguments for fra
#[derive(Parser, Debug)]
#[command(name = "fra")]
#[command(about = "Forest-rights claims digitization backend")]
#[command(version)]
struct Args {
    /// Root folder holding the claims database and scorer files
    #[arg(short, long, env = "FRA_ROOT_FOLDER")]
    root_folder: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the root folder and database schema
    Init,
    /// Reconcile one extracted record from a JSON file
    Reconcile {
        /// JSON object of raw extracted fields
        #[arg(long)]
        file: PathBuf,
        /// Upload channel recorded on the claim
        #[arg(long, default_value = "upload")]
        source: String,
        /// Operator recorded in the audit trail
        #[arg(long)]
        actor: Option<String>,
    },
    /// Import a claims register CSV through the reconciliation engine
    ImportClaims {
        /// Register export with one claim per row
        csv: PathBuf,
    },
    /// Run the batch scorer and import its snapshot
    Resync {
        /// Import the existing snapshot without running the scorer
        #[arg(long)]
        skip_scorer: bool,
    },
    /// Report the resync worker state for this process
    ResyncStatus,
    /// List scheme scores, optionally filtered
    Scores {
        #[arg(long)]
        claim_id: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        district: Option<String>,
        #[arg(long)]
        village: Option<String>,
    },
    /// Scheme recommendations for one claim
    Recommend {
        claim_id: Uuid,
    },
    /// Aggregate statistics over claims or scheme scores
    Stats {
        #[arg(value_enum, default_value_t = StatsKind::Claims)]
        kind: StatsKind,
    },
    /// Villages ranked by average priority for one scheme
    TopVillages {
        /// Scheme name or alias (jjm, dajgua, mgnrega, pm-kisan, pmay)
        scheme: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StatsKind {
    Claims,
    Schemes,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; logs go to stderr so stdout stays parseable JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fra=info,fra_common=info,fra_recon=info,fra_dss=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    info!("Starting fra claims backend");
    info!(
        "Version: {} ({} {}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE"),
        env!("BUILD_TIMESTAMP")
    );

    let root_folder = fra_common::config::resolve_root_folder(
        args.root_folder.as_deref(),
        "FRA_ROOT_FOLDER",
        Some("root_folder"),
    )?;
    info!("Root folder: {}", root_folder.display());

    commands::run(args.command, root_folder).await
}
