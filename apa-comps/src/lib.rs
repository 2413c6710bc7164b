//! # Poly(A) site usage comparisons
//!
//! Compares control and test replicates of a set of experiments: expression
//! at reference sites is grouped by gene, filtered for presence, and the two
//! strongest sites of every gene are tested for a shift in usage.
//!
//! ```no_run
//! use apa_comps::{Comparison, ComparisonConfig, GtfAnnotation};
//! use apa_core::models::Genome;
//! use apa_core::project::Project;
//! use std::path::Path;
//!
//! let project = Project::from_path(Path::new("apa.toml")).unwrap();
//! let layout = project.layout();
//! let config = ComparisonConfig::from_path("kd", &layout.comps_config_path("kd")).unwrap();
//! let genome_name = config.genome(&project).unwrap();
//! let annotation = GtfAnnotation::from_path(Path::new("hg38.gtf.gz")).unwrap();
//!
//! let summary = Comparison::<_, Genome> {
//!     config: &config,
//!     layout: &layout,
//!     genome_name,
//!     annotation: &annotation,
//!     genome: None,
//!     de: None,
//!     fasta: false,
//! }
//! .run()
//! .unwrap();
//! println!("{} site pairs", summary.pairs);
//! ```
pub mod aggregate;
pub mod annotation;
pub mod comparison;
pub mod config;
pub mod de;
pub mod errors;
pub mod histogram;
pub mod motifs;
pub mod pairs;
pub mod regulation;
pub mod stats;

pub use aggregate::{GeneSiteMatrix, GeneTable, ReplicateColumn};
pub use annotation::{Gene, GtfAnnotation, LocusAnnotation, PairType};
pub use comparison::{Comparison, ComparisonSummary};
pub use config::{ComparisonConfig, Group, Replicate, Thresholds};
pub use de::{DeTable, DifferentialExpression, RScriptService};
pub use errors::CompsError;
pub use pairs::PairResult;
