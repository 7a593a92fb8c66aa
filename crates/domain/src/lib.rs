//! Ferrous Forwarder Domain Layer
pub mod config;
pub mod errors;
pub mod question;
pub mod subnet;
pub mod upstream_spec;

pub use config::{
    CliOverrides, Config, ConfigError, LoggingConfig, ProxyEndpoint, ProxyScheme,
    ShadowsocksCredentials, ShadowsocksMethod,
};
pub use errors::DomainError;
pub use question::Question;
pub use subnet::SubnetPrefix;
pub use upstream_spec::{UpstreamAddr, UpstreamSpec};
