//! Schema module - Genome, configuration and result types for path search.

mod config;
mod path;
mod result;

pub use config::*;
pub use path::*;
pub use result::*;
