use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use verify_core::modules::config as core_config;

pub fn show_config(path: &Path, json: bool) -> Result<()> {
    let config = core_config::load_config(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let source = if path.exists() { path.display().to_string() } else { "defaults".to_string() };
    println!("{} ({})", "Verification Policy:".cyan().bold(), source);
    println!("  Poll interval: {} ms", config.poll_interval_ms);
    println!("  Max attempts: {}", config.max_attempts);
    println!("  Startup delay: {} ms", config.startup_delay_ms);
    println!("  Retries before backoff: {}", config.max_retries);
    println!("  Retry backoff: {} ms", config.retry_backoff_ms);
    println!("  Resume delay: {} ms", config.resume_delay_ms);
    println!("  Resend cooldown: {} s", config.resend_cooldown_secs);
    println!("  Resend suppression: {} ms", config.resend_suppress_ms);
    println!("  Polling budget: {:?}", config.polling_budget());
    Ok(())
}

/// Persist the effective policy, env overrides included.
pub fn write_config(path: &Path) -> Result<()> {
    let config = core_config::load_config(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    core_config::save_config(path, &config)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    println!("{} Config written to {}", "✓".green(), path.display());
    Ok(())
}
