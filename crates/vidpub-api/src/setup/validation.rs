//! Configuration validation
//!
//! Runs once at startup so misconfiguration fails before the listener binds.

use anyhow::Result;
use vidpub_core::Config;
use vidpub_processing::process::validate_executable;

/// Validate configuration values and the media tool paths
pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    validate_executable(config.ffprobe_path())
        .map_err(|e| anyhow::anyhow!("FFPROBE_PATH: {}", e))?;
    validate_executable(config.ffmpeg_path()).map_err(|e| anyhow::anyhow!("FFMPEG_PATH: {}", e))?;

    Ok(())
}
