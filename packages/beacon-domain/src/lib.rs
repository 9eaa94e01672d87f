pub mod entry;
pub mod estimate;
pub mod heuristics;
pub mod preferences;
pub mod prompt;
pub mod source;
pub mod truncate;
