use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port, run concurrency and retained runs are not 0
/// - Run sizing (workers, batch size, deadline, queue, tick) is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }
    if config.server.max_concurrent_runs == 0 {
        return Err(ConfigError::ValidationError(
            "server.max_concurrent_runs cannot be 0".to_string(),
        ));
    }
    if config.server.retained_runs == 0 {
        return Err(ConfigError::ValidationError(
            "server.retained_runs cannot be 0".to_string(),
        ));
    }

    // Run validation
    let run = &config.run;
    let zero_checks = [
        (run.worker_count == 0, "run.worker_count"),
        (run.max_batch_size_bytes == 0, "run.max_batch_size_bytes"),
        (run.deadline_secs == 0, "run.deadline_secs"),
        (run.queue_capacity == 0, "run.queue_capacity"),
        (run.tick_interval_ms == 0, "run.tick_interval_ms"),
    ];
    if let Some((_, field)) = zero_checks.iter().find(|(is_zero, _)| *is_zero) {
        return Err(ConfigError::ValidationError(format!("{} cannot be 0", field)));
    }

    if config.converter.max_fps == 0 {
        return Err(ConfigError::ValidationError(
            "converter.max_fps cannot be 0".to_string(),
        ));
    }

    Ok(())
}
