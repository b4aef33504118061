//! # pirate-recorder
//!
//! Consumes the `recorder` queue and writes each reconciled record to the
//! dated output tree (`daily/<date>/scrapers/<scraper>/<job>.json` plus a
//! `summary.json` index and a `latest/<scraper>_latest.json` pointer),
//! every write atomic via temp-file-then-rename. [`archive::archive_day`]
//! bundles a day's tree into a single gzip file on request.

pub mod archive;
pub mod config;
pub mod error;
pub mod recorder;
pub mod summary;
pub mod writer;

pub use archive::archive_day;
pub use config::RecorderConfig;
pub use error::{RecorderError, RecorderResult};
pub use recorder::Recorder;
pub use summary::DailySummary;
pub use writer::{FsRecordWriter, RecordWriter};
