//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use super::settings::GatewayKind;
use super::Settings;
use crate::utils::errors::{ClubHubError, Result};

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_database_config(&settings.database)?;
    validate_auth_config(&settings.auth)?;
    validate_payments_config(&settings.payments)?;
    validate_storage_config(&settings.storage)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(ClubHubError::Config("Database URL is required".to_string()));
    }

    if config.max_connections == 0 {
        return Err(ClubHubError::Config(
            "Max connections must be greater than 0".to_string(),
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(ClubHubError::Config(
            "Min connections cannot be greater than max connections".to_string(),
        ));
    }

    Ok(())
}

/// Validate identity configuration
fn validate_auth_config(config: &super::AuthConfig) -> Result<()> {
    if config.jwt_secret.is_empty() {
        return Err(ClubHubError::Config("JWT secret is required".to_string()));
    }

    if config.token_ttl_hours <= 0 {
        return Err(ClubHubError::Config(
            "Token TTL must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate payment gateway configuration
fn validate_payments_config(config: &super::PaymentsConfig) -> Result<()> {
    if config.key_secret.is_empty() {
        return Err(ClubHubError::Config(
            "Payment key secret is required to verify signatures".to_string(),
        ));
    }

    if config.gateway == GatewayKind::Razorpay {
        if config.key_id.is_empty() {
            return Err(ClubHubError::Config(
                "Razorpay key id is required".to_string(),
            ));
        }

        url::Url::parse(&config.api_url).map_err(|e| {
            ClubHubError::Config(format!("Invalid payment API URL {}: {}", config.api_url, e))
        })?;
    }

    if config.currency.len() != 3 {
        return Err(ClubHubError::Config(format!(
            "Currency must be a 3-letter ISO code, got {}",
            config.currency
        )));
    }

    if config.timeout_seconds == 0 {
        return Err(ClubHubError::Config(
            "Payment gateway timeout must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate blob storage configuration
fn validate_storage_config(config: &super::StorageConfig) -> Result<()> {
    if config.root_dir.is_empty() {
        return Err(ClubHubError::Config(
            "Storage root directory is required".to_string(),
        ));
    }

    let base = url::Url::parse(&config.public_base_url).map_err(|e| {
        ClubHubError::Config(format!(
            "Invalid public base URL {}: {}",
            config.public_base_url, e
        ))
    })?;

    if !base.path().ends_with('/') {
        return Err(ClubHubError::Config(
            "Public base URL must end with '/'".to_string(),
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(ClubHubError::Config("Log level is required".to_string()));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(ClubHubError::Config(format!(
            "Invalid log level: {}. Valid levels: {:?}",
            config.level, valid_levels
        )));
    }

    Ok(())
}
