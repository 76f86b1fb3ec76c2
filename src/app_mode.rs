//! Run modes for the organizer binary.

use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Scan on the cron schedule until interrupted
    Daemon,
    /// One scan, then exit
    Once,
    /// Audit library file names, then exit
    Audit,
}

impl RunMode {
    pub fn from_env() -> Self {
        env::var("ORGANIZER_RUN_MODE")
            .ok()
            .as_deref()
            .and_then(Self::from_arg)
            .unwrap_or(RunMode::Daemon)
    }

    pub fn from_arg(value: &str) -> Option<Self> {
        match value {
            "daemon" => Some(RunMode::Daemon),
            "once" => Some(RunMode::Once),
            "audit" => Some(RunMode::Audit),
            _ => None,
        }
    }
}
