pub mod category;
pub mod tone;

pub use category::{CategoryMap, CANDIDATE_LABELS};
pub use tone::Tone;
