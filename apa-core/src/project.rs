//! Project configuration: where genomes, experiments and comparisons live.
//!
//! A project is described by a TOML file:
//!
//! ```toml
//! data_folder = "data"
//! comps_folder = "comps"
//!
//! [genomes.hg38]
//! fasta = "genomes/hg38.fa.gz"
//! gtf = "genomes/hg38.gtf.gz"
//! polyadb = "polyadb/hg38.bed.gz"
//!
//! [[experiments]]
//! id = "lib1_e1"
//! genome = "hg38"
//! method = "pAseq"
//! umi_separator = "_"
//! ```
//!
//! Relative paths are resolved against the directory of the TOML file.

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ApaCoreError;

/// Library preparation protocol of an experiment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    /// Reads end at the cleavage site on the mapped strand.
    #[serde(rename = "pAseq", alias = "standard")]
    Standard,
    /// Reads start from the opposite primer; strand is inverted.
    #[serde(rename = "paseqx", alias = "inverted")]
    Inverted,
}

impl Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Standard => write!(f, "pAseq"),
            Protocol::Inverted => write!(f, "paseqx"),
        }
    }
}

///
/// Experiment identifier of the form `<lib>_e<N>`, e.g. `20150203_e7`.
///
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExperimentId {
    pub lib_id: String,
    pub exp_id: u32,
}

impl FromStr for ExperimentId {
    type Err = ApaCoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ApaCoreError::InvalidExperimentId(s.to_string());
        let (lib_id, exp) = s.rsplit_once('_').ok_or_else(invalid)?;
        let exp_id = exp
            .strip_prefix('e')
            .and_then(|n| n.parse::<u32>().ok())
            .ok_or_else(invalid)?;
        if lib_id.is_empty() {
            return Err(invalid());
        }
        Ok(ExperimentId {
            lib_id: lib_id.to_string(),
            exp_id,
        })
    }
}

impl Display for ExperimentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_e{}", self.lib_id, self.exp_id)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct GenomeConfig {
    pub fasta: PathBuf,
    pub gtf: Option<PathBuf>,
    pub polyadb: PathBuf,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Experiment {
    pub id: String,
    pub genome: String,
    pub method: Protocol,
    /// Alignment file; defaults to the data folder layout.
    pub bam: Option<PathBuf>,
    /// Read names carry the molecule barcode after the last separator.
    pub umi_separator: Option<char>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Project {
    pub data_folder: PathBuf,
    pub comps_folder: PathBuf,
    #[serde(default)]
    pub genomes: BTreeMap<String, GenomeConfig>,
    #[serde(default)]
    pub experiments: Vec<Experiment>,
}

impl Project {
    ///
    /// Read and validate a project file.
    ///
    pub fn from_path(path: &Path) -> Result<Project, ApaCoreError> {
        let config_error = |message: String| ApaCoreError::ProjectConfigError {
            path: path.display().to_string(),
            message,
        };

        let raw = std::fs::read_to_string(path)?;
        let mut project: Project = toml::from_str(&raw).map_err(|e| config_error(e.to_string()))?;

        let root = path.parent().unwrap_or_else(|| Path::new("."));
        project.resolve_paths(root);

        for experiment in &project.experiments {
            experiment.id.parse::<ExperimentId>()?;
            if !project.genomes.contains_key(&experiment.genome) {
                return Err(ApaCoreError::UnknownGenome {
                    experiment: experiment.id.clone(),
                    genome: experiment.genome.clone(),
                });
            }
        }

        Ok(project)
    }

    fn resolve_paths(&mut self, root: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = root.join(&*p);
            }
        };
        resolve(&mut self.data_folder);
        resolve(&mut self.comps_folder);
        for genome in self.genomes.values_mut() {
            resolve(&mut genome.fasta);
            resolve(&mut genome.polyadb);
            if let Some(gtf) = genome.gtf.as_mut() {
                resolve(gtf);
            }
        }
        for experiment in self.experiments.iter_mut() {
            if let Some(bam) = experiment.bam.as_mut() {
                resolve(bam);
            }
        }
    }

    pub fn experiment(&self, id: &str) -> Result<&Experiment, ApaCoreError> {
        self.experiments
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| ApaCoreError::UnknownExperiment(id.to_string()))
    }

    pub fn genome(&self, experiment: &Experiment) -> Result<&GenomeConfig, ApaCoreError> {
        self.genomes
            .get(&experiment.genome)
            .ok_or_else(|| ApaCoreError::UnknownGenome {
                experiment: experiment.id.clone(),
                genome: experiment.genome.clone(),
            })
    }

    ///
    /// Reference poly(A) sites an experiment's raw sites are overlaid onto.
    ///
    /// Inverted protocol experiments may take the sites of another genome
    /// entry (`polyid`); everything else uses the sites of its own genome.
    ///
    pub fn reference_sites(&self, experiment: &Experiment, polyid: Option<&str>) -> Result<&Path, ApaCoreError> {
        match (experiment.method, polyid) {
            (Protocol::Inverted, Some(polyid)) => self
                .genomes
                .get(polyid)
                .map(|genome| genome.polyadb.as_path())
                .ok_or_else(|| ApaCoreError::UnknownGenome {
                    experiment: experiment.id.clone(),
                    genome: polyid.to_string(),
                }),
            _ => Ok(self.genome(experiment)?.polyadb.as_path()),
        }
    }

    pub fn layout(&self) -> Layout {
        Layout {
            data_folder: self.data_folder.clone(),
            comps_folder: self.comps_folder.clone(),
        }
    }
}

///
/// File naming scheme for per-experiment artifacts and comparisons.
///
#[derive(Clone, Debug)]
pub struct Layout {
    pub data_folder: PathBuf,
    pub comps_folder: PathBuf,
}

impl Layout {
    fn experiment_file(&self, id: &ExperimentId, suffix: &str) -> PathBuf {
        self.data_folder
            .join(&id.lib_id)
            .join(format!("e{}", id.exp_id))
            .join("m1")
            .join(format!("{}_e{}_m1{}", id.lib_id, id.exp_id, suffix))
    }

    pub fn bam_path(&self, id: &ExperimentId) -> PathBuf {
        self.experiment_file(id, ".bam")
    }

    /// Raw site intervals.
    pub fn r_path(&self, id: &ExperimentId) -> PathBuf {
        self.experiment_file(id, ".R.bed")
    }

    /// True site intervals.
    pub fn t_path(&self, id: &ExperimentId) -> PathBuf {
        self.experiment_file(id, ".T.bed")
    }

    /// Expression intervals.
    pub fn e_path(&self, id: &ExperimentId) -> PathBuf {
        self.experiment_file(id, ".E.bed")
    }

    /// Expression intervals with a genome browser track header.
    pub fn e_track_path(&self, id: &ExperimentId) -> PathBuf {
        self.experiment_file(id, ".E.track.bed")
    }

    pub fn sites_status_path(&self, id: &ExperimentId) -> PathBuf {
        self.experiment_file(id, ".RT.status")
    }

    pub fn expression_status_path(&self, id: &ExperimentId) -> PathBuf {
        self.experiment_file(id, ".E.status")
    }

    pub fn comps_dir(&self, comps_id: &str) -> PathBuf {
        self.comps_folder.join(comps_id)
    }

    pub fn comps_config_path(&self, comps_id: &str) -> PathBuf {
        self.comps_dir(comps_id).join(format!("{}.config", comps_id))
    }

    pub fn comps_file(&self, comps_id: &str, suffix: &str) -> PathBuf {
        self.comps_dir(comps_id)
            .join(format!("{}.{}", comps_id, suffix))
    }
}
