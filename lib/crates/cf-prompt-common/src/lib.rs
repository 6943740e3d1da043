pub mod config;
pub mod short_id;
pub mod types;

pub use config::{ConfigError, PrompterConfig};
pub use short_id::{SHORT_ID_LEN, matches_short_id, short_id};
pub use types::*;
