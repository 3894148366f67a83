mod debug_config;
mod env_vars;

pub use debug_config::{DebugConfig, ProfileSettings, StorageConfig};
pub use env_vars::expand_env_vars;
