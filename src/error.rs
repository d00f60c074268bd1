use crate::settings::PowerSource;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("command line for {0} is empty; check the [commands] config section")]
    EmptyCommand(&'static str),

    #[error("could not find Hardware UUID in hardware report")]
    HardwareUuidNotFound,

    #[error("no policies found for this device")]
    NoDeviceRecord,

    #[error(
        "policy '{name}' not found for this device (available policies: {})",
        .available.join(", ")
    )]
    PolicyNotFound {
        name: String,
        available: Vec<String>,
    },

    #[error(
        "failed to apply {failed} settings (already applied: {})",
        format_applied(.applied)
    )]
    PartialApply {
        failed: PowerSource,
        applied: Vec<PowerSource>,
        source: Box<Error>,
    },

    #[error("store write failed: {path}: {source}")]
    StoreWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("store serialization failed: {0}")]
    StoreEncode(#[from] serde_json::Error),
}

fn format_applied(applied: &[PowerSource]) -> String {
    if applied.is_empty() {
        return "none".to_string();
    }
    applied
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, Error>;
