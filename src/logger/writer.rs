//! File sink for the logger

use std::fs::{File, OpenOptions};
use std::sync::Mutex;

use crate::logger::config::FileConfig;
use crate::logger::error::LoggerError;

/// Open the configured log file, creating its parent directory first.
///
/// The returned mutex is used directly as the layer's `MakeWriter`.
pub(crate) fn open_log_file(config: &FileConfig) -> Result<Mutex<File>, LoggerError> {
    if let Some(parent) = config.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut options = OpenOptions::new();
    options.create(true);
    if config.append {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }

    Ok(Mutex::new(options.open(&config.path)?))
}
