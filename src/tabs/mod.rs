pub mod cache;

pub use cache::{Restoration, TabTranscriptCache};
