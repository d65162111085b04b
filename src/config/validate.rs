//! Configuration validation.

use crate::config::Config;
use crate::constants::threshold;
use crate::error::{Error, Result};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_defaults(config)?;
    validate_processing(config)?;
    validate_stitching(config)?;
    Ok(())
}

/// Validate default settings.
#[allow(clippy::neg_cmp_op_on_partial_ord)]
fn validate_defaults(config: &Config) -> Result<()> {
    let defaults = &config.defaults;

    // Negated so NaN is rejected too
    if !(defaults.threshold > 0.0 && defaults.threshold <= threshold::MAX) {
        return Err(Error::ConfigValidation {
            message: format!(
                "threshold must be in (0, {}], got {}",
                threshold::MAX,
                defaults.threshold
            ),
        });
    }

    if defaults.save_individual && defaults.formats.is_empty() {
        return Err(Error::ConfigValidation {
            message: "at least one output format is required when saving individual results"
                .to_string(),
        });
    }

    if defaults.class_name.trim().is_empty() {
        return Err(Error::ConfigValidation {
            message: "class_name must not be empty".to_string(),
        });
    }

    Ok(())
}

/// Validate batch processing settings.
fn validate_processing(config: &Config) -> Result<()> {
    let processing = &config.processing;

    if processing.jobs == 0 {
        return Err(Error::ConfigValidation {
            message: "jobs must be at least 1".to_string(),
        });
    }

    if processing.chunk_workers == 0 {
        return Err(Error::ConfigValidation {
            message: "chunk_workers must be at least 1".to_string(),
        });
    }

    if processing.file_timeout_secs == Some(0) {
        return Err(Error::ConfigValidation {
            message: "file_timeout_secs must be at least 1".to_string(),
        });
    }

    Ok(())
}

/// Validate stitching settings.
fn validate_stitching(config: &Config) -> Result<()> {
    if let Some(tolerance) = config.stitching.dedup_tolerance
        && !(tolerance.is_finite() && tolerance >= 0.0)
    {
        return Err(Error::ConfigValidation {
            message: format!("dedup_tolerance must be a non-negative number, got {tolerance}"),
        });
    }

    Ok(())
}
