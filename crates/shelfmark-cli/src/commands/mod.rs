pub mod classify;
pub mod config;
pub mod emotions;
pub mod index;
pub mod load;
pub mod query;
pub mod run;
pub mod status;

pub use classify::run_classify;
pub use emotions::run_emotions;
pub use index::run_index;
pub use load::run_load;
pub use query::run_query;
pub use run::run_pipeline;
pub use status::show_status;
