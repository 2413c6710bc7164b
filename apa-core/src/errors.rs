use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApaCoreError {
    #[error("Invalid strand symbol: {0}")]
    InvalidStrand(String),

    #[error("Unknown chromosome: {0}")]
    UnknownChromosome(String),

    #[error("Error reading genome file: {0}")]
    GenomeReadError(String),

    #[error("Invalid experiment identifier (expected <lib>_e<N>): {0}")]
    InvalidExperimentId(String),

    #[error("Unknown experiment: {0}")]
    UnknownExperiment(String),

    #[error("Experiment {experiment} maps to unknown genome {genome}")]
    UnknownGenome { experiment: String, genome: String },

    #[error("Can't parse project configuration {path}: {message}")]
    ProjectConfigError { path: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
