use statrs::distribution::HypergeometricError;
use thiserror::Error;

use apa_core::errors::ApaCoreError;
use apa_io::ApaIoError;

#[derive(Error, Debug)]
pub enum CompsError {
    #[error("Error parsing comparison definition {path}:{line}: {message}")]
    ConfigParseError {
        path: String,
        line: usize,
        message: String,
    },

    #[error("Comparison {0} needs at least one control and one test replicate")]
    MissingGroup(String),

    #[error("Experiments of comparison {comps_id} map to more than one genome: {genomes}")]
    MixedGenomes { comps_id: String, genomes: String },

    #[error("Comparison {comps_id} has no genome annotation (gtf) for {genome}")]
    MissingAnnotation { comps_id: String, genome: String },

    #[error("Error parsing annotation {path}:{line}: {message}")]
    AnnotationParseError {
        path: String,
        line: usize,
        message: String,
    },

    #[error("External tool failed: `{command}` exited with {status}")]
    ExternalTool { command: String, status: String },

    #[error("Can't read differential expression result {path}: {message}")]
    DeResultError { path: String, message: String },

    #[error("Invalid contingency table: {0}")]
    Statistics(#[from] HypergeometricError),

    #[error(transparent)]
    Core(#[from] ApaCoreError),

    #[error(transparent)]
    IoFormat(#[from] ApaIoError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
