//! # Replica Scan CLI (`repscan`)
//!
//! The `repscan` binary drives the detection pipeline: registering images,
//! requesting analysis, and reviewing the detection records it produces.
//!
//! ## Usage
//!
//! ```bash
//! repscan --config ./config/repscan.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `repscan init` | Create the SQLite database and run schema migrations |
//! | `repscan register <url>` | Register an image for analysis |
//! | `repscan analyze <id>` | Run annotation + extraction + detection dedup |
//! | `repscan redetect <id> <feature>` | Re-run a single feature, overwriting stored data |
//! | `repscan show <id>` | Print a content item with its labels and text |
//! | `repscan detections <id>` | List detection records for a content item |
//! | `repscan review <detection-id> <verdict>` | Record a reviewer verdict |
//! | `repscan complete <id>` | Mark a content item complete (reviewer action) |
//! | `repscan stats <id>` | Detection counts by review status |

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use replica_scan::analyze::{self, RedetectFeature};
use replica_scan::annotate::{AnnotationClient, FeatureSet};
use replica_scan::config::{self, Config};
use replica_scan::db;
use replica_scan::migrate;
use replica_scan::models::ReviewStatus;
use replica_scan::review;
use replica_scan::show;
use replica_scan::store;
use replica_scan::validate::UrlValidator;

/// Replica Scan — detects unauthorized re-publication of registered images.
#[derive(Parser)]
#[command(
    name = "repscan",
    about = "Detects unauthorized re-publication of registered images, with an admin review workflow",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/repscan.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables (contents,
    /// labels, text_words, detections). Idempotent.
    Init,

    /// Register an image URL as a new content item.
    ///
    /// The item starts with analysis status `pending`; nothing is analyzed
    /// until `analyze` is run for it.
    Register {
        /// URL of the image to watch for re-publication.
        image_url: String,

        /// Optional human-readable title.
        #[arg(long)]
        title: Option<String>,
    },

    /// Run an analysis pass for a content item.
    ///
    /// Calls the annotation service once with the requested features,
    /// stores extracted labels and text, validates web-detection candidates,
    /// and inserts new detection records. Re-running with `--reanalyze`
    /// skips source pages already recorded for this item.
    Analyze {
        /// Content item id.
        content_id: String,

        /// Comma-separated features to request: `label`, `text`, `web`.
        #[arg(long, default_value = "label,text,web")]
        features: String,

        /// This is a re-request: keep the current status and skip source
        /// pages that already have detection records.
        #[arg(long)]
        reanalyze: bool,
    },

    /// Re-run a single feature and overwrite its stored data.
    ///
    /// Unlike `analyze`, this path has no dependency on prior state: the
    /// stored labels or text are unconditionally replaced.
    Redetect {
        /// Content item id.
        content_id: String,

        /// Feature to re-run: `label` or `text`.
        feature: String,
    },

    /// Print a content item with its labels and recognized text.
    Show {
        /// Content item id.
        content_id: String,
    },

    /// List detection records for a content item.
    Detections {
        /// Content item id.
        content_id: String,

        /// Filter by review status: `pending`, `match`, `no_match`,
        /// `cannot_compare`.
        #[arg(long)]
        status: Option<String>,
    },

    /// Record a reviewer verdict on a detection record.
    Review {
        /// Detection record id.
        detection_id: String,

        /// Verdict: `match`, `no_match`, or `cannot_compare`.
        verdict: String,

        /// Reviewer identity recorded with the verdict.
        #[arg(long)]
        reviewer: String,
    },

    /// Mark a content item complete.
    ///
    /// The explicit, human transition the analysis pipeline never makes.
    Complete {
        /// Content item id.
        content_id: String,

        /// Optional user-facing completion note.
        #[arg(long)]
        note: Option<String>,
    },

    /// Detection counts by review status for a content item.
    Stats {
        /// Content item id.
        content_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Register { image_url, title } => {
            let pool = db::connect(&cfg).await?;
            let content = store::create_content(&pool, &image_url, title.as_deref()).await?;
            println!("registered {}", content.id);
            pool.close().await;
        }
        Commands::Analyze {
            content_id,
            features,
            reanalyze,
        } => {
            let features = parse_features(&features)?;
            let pool = db::connect(&cfg).await?;
            let annotator = annotation_client(&cfg)?;
            let probe = UrlValidator::new(Duration::from_secs(cfg.validation.timeout_secs))?;

            let summary =
                analyze::run_analysis(&pool, &annotator, &probe, &content_id, features, reanalyze)
                    .await?;

            println!("analysis {}", content_id);
            println!("  labels: {}", summary.labels);
            println!("  text found: {}", summary.text_found);
            println!("  new detections: {}", summary.new_detections);
            pool.close().await;
        }
        Commands::Redetect {
            content_id,
            feature,
        } => {
            let feature = match feature.as_str() {
                "label" => RedetectFeature::Label,
                "text" => RedetectFeature::Text,
                other => anyhow::bail!("unknown feature: '{}'. Must be label or text", other),
            };
            let pool = db::connect(&cfg).await?;
            let annotator = annotation_client(&cfg)?;

            let summary = analyze::run_redetect(&pool, &annotator, &content_id, feature).await?;

            match feature {
                RedetectFeature::Label => println!("labels: {}", summary.labels),
                RedetectFeature::Text => println!("text found: {}", summary.text_found),
            }
            pool.close().await;
        }
        Commands::Show { content_id } => {
            let pool = db::connect(&cfg).await?;
            show::run_show(&pool, &content_id).await?;
            pool.close().await;
        }
        Commands::Detections { content_id, status } => {
            let pool = db::connect(&cfg).await?;
            show::run_detections(&pool, &content_id, status.as_deref()).await?;
            pool.close().await;
        }
        Commands::Review {
            detection_id,
            verdict,
            reviewer,
        } => {
            let verdict = match ReviewStatus::parse(&verdict) {
                Some(v) => v,
                None => anyhow::bail!(
                    "unknown verdict: '{}'. Must be match, no_match, or cannot_compare",
                    verdict
                ),
            };
            let pool = db::connect(&cfg).await?;
            review::record_verdict(&pool, &detection_id, verdict, &reviewer).await?;
            println!("recorded {} for {}", verdict.as_str(), detection_id);
            pool.close().await;
        }
        Commands::Complete { content_id, note } => {
            let pool = db::connect(&cfg).await?;
            review::complete_content(&pool, &content_id, note.as_deref()).await?;
            println!("content {} marked complete", content_id);
            pool.close().await;
        }
        Commands::Stats { content_id } => {
            let pool = db::connect(&cfg).await?;
            show::run_stats(&pool, &content_id).await?;
            pool.close().await;
        }
    }

    Ok(())
}

fn annotation_client(cfg: &Config) -> anyhow::Result<AnnotationClient> {
    AnnotationClient::new(
        cfg.annotation.endpoint.clone(),
        cfg.annotation.resolve_api_key(),
        Duration::from_secs(cfg.annotation.timeout_secs),
    )
}

/// Parse a comma-separated feature list into a feature set.
fn parse_features(s: &str) -> anyhow::Result<FeatureSet> {
    let mut features = FeatureSet::default();
    for part in s.split(',') {
        match part.trim() {
            "" => {}
            "label" => features.label = true,
            "text" => features.text = true,
            "web" => features.web = true,
            other => anyhow::bail!("unknown feature: '{}'. Must be label, text, or web", other),
        }
    }
    if features.is_empty() {
        anyhow::bail!("at least one feature is required");
    }
    Ok(features)
}
