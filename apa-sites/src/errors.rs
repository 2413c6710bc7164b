use thiserror::Error;

use apa_core::errors::ApaCoreError;
use apa_io::ApaIoError;

#[derive(Error, Debug)]
pub enum SiteCallerError {
    #[error("Can't read alignments from {path}: {message}")]
    AlignmentReadError { path: String, message: String },

    #[error("Sequence lookup failed for {chr}:{pos} ({read}): {source}")]
    SequenceError {
        chr: String,
        pos: u32,
        read: String,
        #[source]
        source: ApaCoreError,
    },

    #[error(transparent)]
    Core(#[from] ApaCoreError),

    #[error(transparent)]
    IoFormat(#[from] ApaIoError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
