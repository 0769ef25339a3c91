//! Filesystem locations

use std::path::PathBuf;

/// Data directory (`~/.nimbus`, or `./.nimbus` without a home directory)
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".nimbus"))
        .unwrap_or_else(|| PathBuf::from(".nimbus"))
}

pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// File checkpoint store location
pub fn sessions_dir() -> PathBuf {
    data_dir().join("threads")
}

pub fn trace_log_path() -> PathBuf {
    data_dir().join("trace.jsonl")
}
