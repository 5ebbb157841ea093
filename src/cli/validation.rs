//! CLI argument validation functions
//!
//! Custom value parsers for arguments clap cannot check on its own.

use std::fs;
use std::path::PathBuf;

/// Validate that a file path is accessible (exists and is readable)
pub fn validate_config_file_path(path_str: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(format!("Configuration file does not exist: '{}'", path_str));
    }

    if !path.is_file() {
        return Err(format!("Configuration path is not a file: '{}'", path_str));
    }

    match fs::File::open(&path) {
        Ok(_) => Ok(path),
        Err(e) => Err(format!(
            "Cannot read configuration file '{}': {}",
            path_str, e
        )),
    }
}

/// Validate a discovery window given in seconds (1-3600)
pub fn validate_timeout_secs(value: &str) -> Result<u64, String> {
    let secs: u64 = value.parse().map_err(|_| {
        format!(
            "Timeout must be a whole number of seconds, got: '{}'",
            value
        )
    })?;

    if secs == 0 || secs > 3600 {
        return Err("Timeout must be between 1 and 3600 seconds".to_string());
    }

    Ok(secs)
}
