use anyhow::Context;
use ferrous_forwarder_domain::{CliOverrides, Config};

pub fn load_config(
    config_path: Option<&str>,
    cli_overrides: CliOverrides,
) -> anyhow::Result<Config> {
    let config = Config::load(config_path, cli_overrides).with_context(|| {
        format!(
            "failed to load configuration from {}",
            config_path.unwrap_or("default locations")
        )
    })?;
    config.validate().context("invalid configuration")?;

    Ok(config)
}
