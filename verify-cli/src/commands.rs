use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use verify_core::backend::{
    FirebaseIdentityGateway, FirestoreProfileStore, MemoryIdentityGateway, MemoryProfileStore,
    ReloadStep,
};
use verify_core::modules::config as core_config;
use verify_core::VerificationPoller;
use verify_types::{
    ErrorClass, GatewayError, SessionSnapshot, UserProfile, UserType, VerificationConfig,
    VerificationEvent,
};

const SIMULATED_SUBJECT: &str = "sim-user";

pub struct SimulateOverrides {
    pub poll_interval_ms: u64,
    pub max_attempts: Option<u32>,
}

pub async fn watch(
    config_path: &Path,
    subject: &str,
    api_key: &str,
    id_token: &str,
    project_id: &str,
) -> Result<()> {
    let config = load(config_path)?;
    let gateway = Arc::new(FirebaseIdentityGateway::new(api_key, id_token)?);
    let store = Arc::new(FirestoreProfileStore::new(project_id, id_token)?);

    println!(
        "{} Watching {} (every {:?}, up to {} checks per round)",
        "→".cyan(),
        subject.bold(),
        config.poll_interval(),
        config.max_attempts
    );

    let poller = VerificationPoller::new(subject, config, gateway, store);
    let snapshot = drive(&poller).await?;
    print_snapshot(&snapshot);
    Ok(())
}

pub async fn simulate(
    config_path: &Path,
    verify_after: u32,
    fail_transient: u32,
    overrides: SimulateOverrides,
) -> Result<()> {
    let config = simulation_config(load(config_path)?, &overrides)?;

    let failures = (0..fail_transient)
        .map(|i| ReloadStep::Fail(GatewayError::network(format!("simulated outage #{}", i + 1))));
    let pending = std::iter::repeat(ReloadStep::Pending).take(verify_after as usize);
    let gateway =
        MemoryIdentityGateway::with_steps(failures.chain(pending).chain([ReloadStep::Confirmed]));

    let store = MemoryProfileStore::new();
    store.insert(UserProfile::new(
        SIMULATED_SUBJECT,
        "sim-user@example.com",
        UserType::User,
        Some("Simulated User".to_string()),
    ));

    println!(
        "{} Simulating {} transient failures, then {} unconfirmed checks",
        "→".cyan(),
        fail_transient,
        verify_after
    );

    let poller = VerificationPoller::new(
        SIMULATED_SUBJECT,
        config,
        gateway.clone(),
        store.clone(),
    );
    let snapshot = drive(&poller).await?;
    print_snapshot(&snapshot);

    let verified = store.get(SIMULATED_SUBJECT).is_some_and(|p| p.email_verified);
    println!(
        "  Provider checks: {}, profile writes: {}, stored flag: {}",
        gateway.reload_calls(),
        store.write_count(),
        verified
    );
    Ok(())
}

/// Compress every delay to the simulated poll interval.
fn simulation_config(
    mut config: VerificationConfig,
    overrides: &SimulateOverrides,
) -> Result<VerificationConfig> {
    config.poll_interval_ms = overrides.poll_interval_ms;
    config.startup_delay_ms = overrides.poll_interval_ms;
    config.retry_backoff_ms = overrides.poll_interval_ms.saturating_mul(2);
    config.resume_delay_ms = overrides.poll_interval_ms;
    if let Some(max_attempts) = overrides.max_attempts {
        config.max_attempts = max_attempts;
    }
    config.validate()?;
    Ok(config)
}

/// Start the session and print events until it verifies, fails fatally, or
/// the user interrupts. Timeouts are acknowledged immediately.
async fn drive(poller: &VerificationPoller) -> Result<SessionSnapshot> {
    let mut events = poller.subscribe();
    poller.start();

    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = tokio::signal::ctrl_c() => {
                println!("{} Interrupted", "✗".yellow());
                poller.stop();
                return Ok(poller.snapshot());
            },
        };

        match event {
            Ok(VerificationEvent::Verified { subject_id }) => {
                println!("{} Email confirmed for {}", "✓".green(), subject_id);
                return Ok(poller.snapshot());
            },
            Ok(VerificationEvent::TimedOut { attempts }) => {
                println!(
                    "{} Still unconfirmed after {} checks, resuming",
                    "⚠".yellow(),
                    attempts
                );
                poller.acknowledge_timeout();
            },
            Ok(VerificationEvent::Error { class: ErrorClass::Transient, error }) => {
                println!("{} Provider unreachable, backing off: {}", "⚠".yellow(), error);
            },
            Ok(VerificationEvent::Error { class: ErrorClass::Fatal, error }) => {
                poller.stop();
                if error.requires_reauthentication() {
                    println!(
                        "{} Sign in again and export a fresh FIREBASE_ID_TOKEN",
                        "✗".red()
                    );
                }
                return Err(error).context("Verification stopped");
            },
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!("Event stream lagged, {} events skipped", skipped);
            },
            Err(RecvError::Closed) => return Ok(poller.snapshot()),
        }
    }
}

fn load(path: &Path) -> Result<VerificationConfig> {
    core_config::load_config(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

fn print_snapshot(snapshot: &SessionSnapshot) {
    println!(
        "  Session {}: state={}, attempts={}, resend cooldown={}s",
        snapshot.subject_id,
        snapshot.state,
        snapshot.attempt_count,
        snapshot.resend_cooldown_remaining
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulation_config_compresses_delays() {
        let overrides = SimulateOverrides { poll_interval_ms: 200, max_attempts: Some(4) };
        let config = simulation_config(VerificationConfig::default(), &overrides).unwrap();

        assert_eq!(config.poll_interval_ms, 200);
        assert_eq!(config.startup_delay_ms, 200);
        assert_eq!(config.retry_backoff_ms, 400);
        assert_eq!(config.resume_delay_ms, 200);
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.resend_cooldown_secs, 60);
    }

    #[test]
    fn test_simulation_config_saturates_backoff() {
        let overrides = SimulateOverrides { poll_interval_ms: u64::MAX, max_attempts: None };
        let config = simulation_config(VerificationConfig::default(), &overrides).unwrap();

        assert_eq!(config.retry_backoff_ms, u64::MAX);
        assert_eq!(config.max_attempts, VerificationConfig::default().max_attempts);
    }

    #[test]
    fn test_simulation_config_rejects_zero_interval() {
        let overrides = SimulateOverrides { poll_interval_ms: 0, max_attempts: None };
        assert!(simulation_config(VerificationConfig::default(), &overrides).is_err());
    }
}
