//! Movie catalog migration - extract from SQLite, normalize, load into PostgreSQL

pub mod error;
pub mod extract;
pub mod load;
pub mod report;
pub mod transform;
pub mod types;
pub mod utils;

pub use error::{MigrationError, Result};
pub use types::*;
