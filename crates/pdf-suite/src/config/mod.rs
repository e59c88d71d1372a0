pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_from_env, load_config_from_str, CONFIG_ENV_VAR};
pub use schema::{
    BatchConfig, Config, ConversionConfig, OcrConfig, ServerConfig, ToolsConfig,
};
