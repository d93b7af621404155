pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_from_str, load_or_default, validate_config};
pub use schema::{Config, LogFormat, LoggingConfig, NamingConfig, RetrievalConfig};
