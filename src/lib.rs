//! # Replica Scan
//!
//! Detects unauthorized re-publication of registered images elsewhere on the
//! web, with an admin review workflow to confirm true positives.
//!
//! The pipeline sends a registered image to an external annotation service,
//! turns the raw "pages with matching images" results into deduplicated,
//! typed detection records, and validates that every candidate match URL
//! truly serves image bytes before it is trusted. Two independent state
//! machines drive the product: automated analysis status and human review
//! status.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌────────────┐
//! │ Annotation │──▶│  Extractors  │──▶│   SQLite    │
//! │  service   │   │ labels/text/ │   │ contents +  │
//! └────────────┘   │ web + dedup  │   │ detections  │
//!                  └──────┬───────┘   └─────┬──────┘
//!                         │                 │
//!                  ┌──────▼───────┐   ┌─────▼──────┐
//!                  │ URL validator │   │  Reviewer   │
//!                  │ HEAD/GET/sniff│   │  verdicts   │
//!                  └──────────────┘   └────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types and state machines |
//! | [`sniff`] | Image format detection from leading bytes |
//! | [`validate`] | Candidate image URL validation |
//! | [`annotate`] | Annotation service client |
//! | [`extract`] | Label/text/web-detection extraction and dedup |
//! | [`analyze`] | Analysis orchestration |
//! | [`review`] | Reviewer verdicts and completion |
//! | [`store`] | SQLite persistence |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod analyze;
pub mod annotate;
pub mod config;
pub mod db;
pub mod extract;
pub mod migrate;
pub mod models;
pub mod review;
pub mod show;
pub mod sniff;
pub mod store;
pub mod validate;
