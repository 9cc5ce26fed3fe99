//! Startup configuration
//!
//! Settings and reference data must both load; the server never starts on
//! fallback defaults after a broken config file.

use anyhow::Context;

use lead_agent_config::{load_settings_from, ReferenceData, Settings};

/// Load layered settings from `dir` and the reference data they point at
///
/// Priority: env vars > {dir}/{env}.yaml > {dir}/default.yaml > defaults
pub fn load_configuration(
    dir: &str,
    env: Option<&str>,
) -> anyhow::Result<(Settings, ReferenceData)> {
    let settings = load_settings_from(dir, env).with_context(|| {
        format!(
            "Failed to load configuration from {} (env: {})",
            dir,
            env.unwrap_or("default")
        )
    })?;

    let reference_data = ReferenceData::load(settings.reference_data_path.as_deref())
        .context("Failed to load reference data")?;

    Ok((settings, reference_data))
}
