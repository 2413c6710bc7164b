//! Poly(A) site calling and expression overlay.
//!
//! [`SiteCaller`] turns the aligned reads of one sample into two site
//! tables: every candidate cleavage position (raw) and the positions whose
//! sequence context looks like a genuine cleavage site (true). [`SitesJob`]
//! and [`ExpressionJob`] wrap the per-sample steps with their on-disk
//! artifacts and status markers.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use apa_core::models::Genome;
//! use apa_core::project::Project;
//! use apa_sites::SitesJob;
//!
//! let project = Project::from_path(Path::new("apa.toml")).unwrap();
//! let experiment = project.experiment("lib1_e1").unwrap();
//! let genome = Genome::from_fasta(&project.genome(experiment).unwrap().fasta).unwrap();
//!
//! let job = SitesJob::new(experiment.id.parse().unwrap(), experiment.method, &project.layout());
//! job.run(&genome, false).unwrap();
//! ```

pub mod bam;
pub mod caller;
pub mod errors;
pub mod jobs;
pub mod pas;
pub mod protocol;
pub mod record;

// re-exports
pub use bam::BamAlignments;
pub use caller::{CallerStats, SiteCaller, SiteCalls};
pub use errors::SiteCallerError;
pub use jobs::{ExpressionJob, JobOutcome, SitesJob, load_reference};
pub use record::{AlignmentRecord, CigarKind, CigarOp};
