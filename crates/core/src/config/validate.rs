use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Scheduler concurrency, attempt budget and call timeout are not 0
/// - Retry base delay does not exceed the max delay
/// - Oracle endpoint is not empty when an oracle is configured
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let scheduler = &config.scheduler;

    if scheduler.concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.concurrency cannot be 0".to_string(),
        ));
    }

    if scheduler.retry.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.retry.max_attempts cannot be 0".to_string(),
        ));
    }

    if scheduler.retry.base_delay_ms > scheduler.retry.max_delay_ms {
        return Err(ConfigError::ValidationError(format!(
            "scheduler.retry.base_delay_ms ({}) exceeds max_delay_ms ({})",
            scheduler.retry.base_delay_ms, scheduler.retry.max_delay_ms
        )));
    }

    if scheduler.call_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.call_timeout_secs cannot be 0".to_string(),
        ));
    }

    if let Some(ref oracle) = config.oracle {
        if oracle.endpoint.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "oracle.endpoint cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}
