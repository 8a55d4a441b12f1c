use std::{io, path::PathBuf};

use thiserror::Error;

/// Camera device failures. All of these are fatal: the run stops rather
/// than risk CSV rows without matching images.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to open camera device {index}")]
    Open {
        index: i32,
        #[source]
        source: opencv::Error,
    },

    #[error("camera device {index} is not available")]
    Unavailable { index: i32 },

    #[error("camera returned an empty frame, device may be disconnected")]
    EmptyFrame,

    #[error("camera backend error")]
    Backend(#[from] opencv::Error),
}

/// Failures while persisting session output. Fatal; a local file write
/// either succeeds or the run aborts.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to create output directory {path:?}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open session index {path:?}")]
    OpenIndex {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write image {path:?}")]
    WriteImage {
        path: PathBuf,
        #[source]
        source: opencv::Error,
    },

    #[error("image encoder rejected {path:?}")]
    EncodeImage { path: PathBuf },

    #[error("failed to append row to session index")]
    Append(#[from] csv::Error),

    #[error("failed to flush session index")]
    Flush(#[from] io::Error),
}

/// Invalid or missing startup configuration. Fatal before the loop begins.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not parse {input:?}, expected \"width,height\"")]
    Dimensions { input: String },

    #[error("could not parse {input:?}, expected \"ROWSxCOLS\"")]
    Grid { input: String },

    #[error("monitor geometry could not be detected, pass --monitor-mm and --monitor-pixels")]
    MonitorDetection,
}
