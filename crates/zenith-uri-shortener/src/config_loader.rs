//! Thin JSON config loader. `spec.md` names a protobuf-JSON path as well;
//! that format is an explicit Non-goal here, so JSON is the only source.

use std::path::Path;

use zenith_pipeline::ServiceConfig;

const DEFAULT_CONFIG_PATH: &str = "config/uri_shortener.json";

pub fn load(path: Option<&str>) -> anyhow::Result<ServiceConfig> {
    let path = path.unwrap_or(DEFAULT_CONFIG_PATH);
    if !Path::new(path).exists() {
        tracing::info!(%path, "no config file found, using defaults");
        return Ok(ServiceConfig::default());
    }
    let raw = std::fs::read_to_string(path)?;
    let config: ServiceConfig = serde_json::from_str(&raw)?;
    config.validate()?;
    Ok(config)
}
