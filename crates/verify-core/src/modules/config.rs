use std::fs;
use std::path::{Path, PathBuf};

use verify_types::{ConfigError, VerificationConfig};

use crate::modules::logger;

pub const CONFIG_FILE: &str = "verification.json";

const ENV_PREFIX: &str = "VERIFY_";

/// Load the verification policy.
///
/// A missing file yields defaults. `VERIFY_*` environment variables override
/// file values (e.g. `VERIFY_POLL_INTERVAL_MS=3000`).
pub fn load_config(path: &Path) -> Result<VerificationConfig, ConfigError> {
    let mut config = if path.exists() {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| ConfigError::from_json_error(&e))?
    } else {
        VerificationConfig::default()
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Save the verification policy (temp file + rename).
pub fn save_config(path: &Path, config: &VerificationConfig) -> Result<(), ConfigError> {
    config.validate()?;

    let content =
        serde_json::to_string_pretty(config).map_err(|e| ConfigError::from_json_error(&e))?;

    let temp_path = temp_path_for(path);
    fs::write(&temp_path, content).map_err(|e| ConfigError::from_io_error(&e))?;
    fs::rename(&temp_path, path).map_err(|e| ConfigError::from_io_error(&e))?;

    logger::log_info(&format!("Verification config saved to {}", path.display()));
    Ok(())
}

/// Override fields from `lookup(VERIFY_<FIELD>)`.
pub fn apply_env_overrides<F>(config: &mut VerificationConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let read_u64 = |field: &str| -> Result<Option<u64>, ConfigError> {
        let key = format!("{}{}", ENV_PREFIX, field.to_uppercase());
        match lookup(&key) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|e| ConfigError::invalid(field, format!("{}={}: {}", key, raw, e))),
            None => Ok(None),
        }
    };
    let read_u32 = |field: &str| -> Result<Option<u32>, ConfigError> {
        read_u64(field)?
            .map(|v| u32::try_from(v).map_err(|e| ConfigError::invalid(field, e.to_string())))
            .transpose()
    };

    if let Some(v) = read_u64("poll_interval_ms")? {
        config.poll_interval_ms = v;
    }
    if let Some(v) = read_u32("max_attempts")? {
        config.max_attempts = v;
    }
    if let Some(v) = read_u64("startup_delay_ms")? {
        config.startup_delay_ms = v;
    }
    if let Some(v) = read_u32("max_retries")? {
        config.max_retries = v;
    }
    if let Some(v) = read_u64("retry_backoff_ms")? {
        config.retry_backoff_ms = v;
    }
    if let Some(v) = read_u64("resume_delay_ms")? {
        config.resume_delay_ms = v;
    }
    if let Some(v) = read_u64("resend_cooldown_secs")? {
        config.resend_cooldown_secs = v;
    }
    if let Some(v) = read_u64("resend_suppress_ms")? {
        config.resend_suppress_ms = v;
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, VerificationConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let config = VerificationConfig { poll_interval_ms: 3000, ..Default::default() };

        save_config(&path, &config).unwrap();
        assert!(!temp_path_for(&path).exists());
        assert_eq!(load_config(&path).unwrap().poll_interval_ms, 3000);
    }

    #[test]
    fn test_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> =
            [("VERIFY_MAX_ATTEMPTS", "3"), ("VERIFY_POLL_INTERVAL_MS", " 1000 ")].into();
        let mut config = VerificationConfig::default();

        apply_env_overrides(&mut config, |key| env.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.resend_cooldown_secs, 60);
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut config = VerificationConfig::default();
        let result = apply_env_overrides(&mut config, |key| {
            (key == "VERIFY_MAX_RETRIES").then(|| "three".to_string())
        });
        assert!(matches!(result, Err(ConfigError::ValidationError { field, .. }) if field == "max_retries"));
    }
}
