//! ETL pipeline stages for shelfmark.
//!
//! Implements the clean, classify, emotions, and index stages as
//! treadle `Stage` implementations, plus the HTTP clients for the
//! external classification and emotion models.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod classify;
pub mod clean;
pub mod config;
pub mod emotions;
pub mod error;
pub mod index;
pub mod pipeline;
pub mod resilience;
pub mod work_item;

pub use classify::{ClassifyStage, ZeroShotClient};
pub use clean::CleanStage;
pub use config::Config;
pub use emotions::{EmotionClient, EmotionStage};
pub use error::{ServiceError, ServiceResult};
pub use index::IndexStage;
pub use pipeline::build_pipeline;
pub use work_item::CatalogJob;
