pub mod db;
pub mod entries;
pub mod jobs;
pub mod models;
pub mod preferences;
pub mod projects;
pub mod schema;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
