pub mod errors;
pub mod logging;
pub mod proxy;
pub mod root;

pub use errors::ConfigError;
pub use logging::LoggingConfig;
pub use proxy::{ProxyEndpoint, ProxyScheme, ShadowsocksCredentials, ShadowsocksMethod};
pub use root::{CliOverrides, Config};
