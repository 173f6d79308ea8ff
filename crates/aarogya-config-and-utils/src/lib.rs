//! Core configuration, paths, and logging setup shared by the Aarogya crates.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, DEFAULT_DOSE_EVENTS_ROUTE, DEFAULT_LOG_LEVEL, DEFAULT_SUPABASE_PUBLISHABLE_KEY,
    DEFAULT_SUPABASE_URL,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
