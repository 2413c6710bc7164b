//! Comparison definitions.
//!
//! A comparison file is tab separated. Lines starting with `#` are comments,
//! the first other line is the header (`id experiments name`). Each row
//! defines one replicate: ids starting with `c` are control, `t` test, and
//! experiments is a comma separated list of experiment ids pooled into that
//! replicate. Single column `key:value` lines override thresholds:
//!
//! ```text
//! # knockdown vs wild type
//! id	experiments	name
//! c1	lib1_e1,lib1_e2	wt rep1
//! t1	lib1_e3	kd rep1
//! pc_thr:0.2
//! control_name:wt
//! ```

use std::collections::BTreeSet;
use std::io::BufRead;
use std::path::Path;

use apa_core::project::Project;
use apa_core::utils::{get_dynamic_reader, trim_line_end};

use crate::errors::CompsError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Group {
    Control,
    Test,
}

/// One column of the comparison: the pooled expression of its experiments.
#[derive(Clone, Debug, PartialEq)]
pub struct Replicate {
    pub id: String,
    pub experiments: Vec<String>,
    pub name: String,
}

impl Replicate {
    pub fn group(&self) -> Group {
        if self.id.starts_with('c') {
            Group::Control
        } else {
            Group::Test
        }
    }

    /// Column header used in the expression tables.
    pub fn long_name(&self) -> String {
        format!("{}:{}", self.id, self.name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Thresholds {
    /// Minimum cDNA for a replicate to count as expressing a site.
    pub cdna_thr: u64,
    /// A site is kept if at least `n / presence_thr` replicates express it.
    pub presence_thr: f64,
    pub pc_thr: f64,
    pub fisher_thr: f64,
    pub control_thr: f64,
    pub pair_dist: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            cdna_thr: 5,
            presence_thr: 2.0,
            pc_thr: 0.1,
            fisher_thr: 0.1,
            control_thr: 0.025,
            pair_dist: 450,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ComparisonConfig {
    pub comps_id: String,
    pub control: Vec<Replicate>,
    pub test: Vec<Replicate>,
    pub control_name: String,
    pub test_name: String,
    pub thresholds: Thresholds,
}

impl ComparisonConfig {
    pub fn new(comps_id: &str) -> Self {
        ComparisonConfig {
            comps_id: comps_id.to_string(),
            control: Vec::new(),
            test: Vec::new(),
            control_name: String::new(),
            test_name: String::new(),
            thresholds: Thresholds::default(),
        }
    }

    pub fn from_path(comps_id: &str, path: &Path) -> Result<Self, CompsError> {
        let reader = get_dynamic_reader(path).map_err(|e| CompsError::ConfigParseError {
            path: path.display().to_string(),
            line: 0,
            message: e.to_string(),
        })?;
        Self::parse(comps_id, reader, &path.display().to_string())
    }

    ///
    /// Parse a comparison definition.
    ///
    /// # Arguments
    /// - comps_id: comparison identifier
    /// - reader: definition text
    /// - source: name used in error messages
    pub fn parse<R: BufRead>(comps_id: &str, reader: R, source: &str) -> Result<Self, CompsError> {
        let mut config = ComparisonConfig::new(comps_id);
        let mut lines = reader.lines().enumerate();

        let mut header: Option<Vec<String>> = None;
        for (_, line) in lines.by_ref() {
            let line = line?;
            let line = trim_line_end(&line);
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            header = Some(line.split('\t').map(|c| c.trim().to_string()).collect());
            break;
        }
        let Some(columns) = header else {
            return Ok(config);
        };

        for (idx, line) in lines {
            let line = line?;
            let line = trim_line_end(&line);
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            let error = |message: String| CompsError::ConfigParseError {
                path: source.to_string(),
                line: idx + 1,
                message,
            };

            let fields: Vec<&str> = line.split('\t').collect();
            if let Some((key, value)) = fields[0].split_once(':') {
                if fields.iter().skip(1).all(|f| f.trim().is_empty()) {
                    config.apply_override(key.trim(), value.trim()).map_err(&error)?;
                    continue;
                }
            }

            let field = |name: &str| -> Result<String, CompsError> {
                columns
                    .iter()
                    .position(|c| c == name)
                    .and_then(|i| fields.get(i))
                    .map(|f| f.trim().to_string())
                    .ok_or_else(|| error(format!("missing column '{}'", name)))
            };

            let replicate = Replicate {
                id: field("id")?,
                experiments: field("experiments")?
                    .split(',')
                    .map(|e| e.trim().to_string())
                    .filter(|e| !e.is_empty())
                    .collect(),
                name: field("name")?,
            };
            if replicate.experiments.is_empty() {
                return Err(error(format!("replicate {} lists no experiments", replicate.id)));
            }

            if replicate.id.starts_with('c') {
                config.control.push(replicate);
            } else if replicate.id.starts_with('t') {
                config.test.push(replicate);
            } else {
                return Err(error(format!(
                    "replicate id '{}' must start with 'c' (control) or 't' (test)",
                    replicate.id
                )));
            }
        }

        Ok(config)
    }

    fn apply_override(&mut self, key: &str, value: &str) -> Result<(), String> {
        fn number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, String> {
            value
                .parse::<T>()
                .map_err(|_| format!("invalid value for {}: '{}'", key, value))
        }

        let t = &mut self.thresholds;
        match key {
            "cDNA_thr" => t.cdna_thr = number(key, value)?,
            "presence_thr" => t.presence_thr = number(key, value)?,
            "pc_thr" => t.pc_thr = number(key, value)?,
            "fisher_thr" => t.fisher_thr = number(key, value)?,
            "control_thr" => t.control_thr = number(key, value)?,
            "pair_dist" => t.pair_dist = number::<f64>(key, value)? as u32,
            "control_name" => self.control_name = value.to_string(),
            "test_name" => self.test_name = value.to_string(),
            // reserved for iCLIP overlays, which are not part of this pipeline
            "iCLIP" => log::warn!("{}: ignoring iCLIP:{}", self.comps_id, value),
            other => return Err(format!("unknown setting '{}'", other)),
        }
        Ok(())
    }

    /// Control and test replicates ordered by id.
    pub fn replicates(&self) -> Vec<&Replicate> {
        let mut replicates: Vec<&Replicate> = self.control.iter().chain(self.test.iter()).collect();
        replicates.sort_by(|a, b| a.id.cmp(&b.id));
        replicates
    }

    /// Every experiment used by the comparison.
    pub fn experiments(&self) -> BTreeSet<&str> {
        self.control
            .iter()
            .chain(self.test.iter())
            .flat_map(|r| r.experiments.iter().map(|e| e.as_str()))
            .collect()
    }

    ///
    /// The single genome all experiments of the comparison map to.
    ///
    pub fn genome<'a>(&self, project: &'a Project) -> Result<&'a str, CompsError> {
        if self.control.is_empty() || self.test.is_empty() {
            return Err(CompsError::MissingGroup(self.comps_id.clone()));
        }

        let mut genomes = BTreeSet::new();
        for id in self.experiments() {
            genomes.insert(project.experiment(id)?.genome.as_str());
        }

        if genomes.len() == 1 {
            if let Some(genome) = genomes.pop_first() {
                return Ok(genome);
            }
        }
        Err(CompsError::MixedGenomes {
            comps_id: self.comps_id.clone(),
            genomes: genomes.into_iter().collect::<Vec<_>>().join(", "),
        })
    }
}
