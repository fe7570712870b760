pub mod book;
pub mod classification;
pub mod emotion;
pub mod isbn;

pub use book::BookRecord;
pub use classification::{Classification, UNKNOWN_LABEL};
pub use emotion::{Emotion, EmotionProfile};
pub use isbn::Isbn13;
