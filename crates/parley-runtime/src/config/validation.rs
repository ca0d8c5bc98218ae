//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotConfig, DispatchConfig, LogOutput, LoggingConfig, ParleyConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &ParleyConfig) -> ConfigResult<()> {
    validate_bot_config(&config.bot)?;
    validate_dispatch_config(&config.dispatch)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_bot_config(bot: &BotConfig) -> ConfigResult<()> {
    if bot.name.trim().is_empty() {
        return Err(ConfigError::missing_field("bot.name"));
    }
    Ok(())
}

fn validate_dispatch_config(dispatch: &DispatchConfig) -> ConfigResult<()> {
    if dispatch.max_text_bytes == 0 {
        return Err(ConfigError::validation(
            "dispatch.max_text_bytes must be greater than 0",
        ));
    }

    if dispatch.regex_size_limit == 0 {
        return Err(ConfigError::validation(
            "dispatch.regex_size_limit must be greater than 0",
        ));
    }

    if dispatch.idle_timeout_secs == Some(0) {
        return Err(ConfigError::validation(
            "dispatch.idle_timeout_secs must be greater than 0 when set",
        ));
    }

    if dispatch.max_missed_turns == Some(0) {
        return Err(ConfigError::validation(
            "dispatch.max_missed_turns must be greater than 0 when set",
        ));
    }

    if dispatch.queue_capacity == 0 {
        return Err(ConfigError::validation(
            "dispatch.queue_capacity must be greater than 0",
        ));
    }

    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if let Some((module, _)) = logging.filters.iter().find(|(m, _)| m.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Invalid logging filter target: {module:?}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&ParleyConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_limits_rejected() {
        let mut config = ParleyConfig::default();
        config.dispatch.max_text_bytes = 0;
        assert!(validate_config(&config).is_err());

        let mut config = ParleyConfig::default();
        config.dispatch.max_missed_turns = Some(0);
        assert!(validate_config(&config).is_err());

        let mut config = ParleyConfig::default();
        config.dispatch.idle_timeout_secs = Some(0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_file_output_requires_path() {
        let mut config = ParleyConfig::default();
        config.logging.output = LogOutput::File;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { field }) if field == "logging.file_path"
        ));

        config.logging.file_path = Some("parley.log".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_blank_bot_name_rejected() {
        let mut config = ParleyConfig::default();
        config.bot.name = "  ".into();
        assert!(validate_config(&config).is_err());
    }
}
