mod settings;

pub use settings::{GoogleConfig, LoggingConfig, ServerConfig, Settings, UpdaterConfig};
