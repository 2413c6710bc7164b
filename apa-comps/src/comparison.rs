use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use apa_core::models::{CountTrack, SequenceSource};
use apa_core::project::{ExperimentId, Layout};
use apa_io::{IntervalWrite, read_intervals};

use crate::aggregate::{GeneSiteMatrix, ReplicateColumn};
use crate::annotation::LocusAnnotation;
use crate::config::{ComparisonConfig, Group, Replicate};
use crate::de::{DeTable, DifferentialExpression};
use crate::errors::CompsError;
use crate::histogram::{distance_histogram, write_histogram};
use crate::pairs::{pair_results, write_pairs};
use crate::regulation::{Regulation, write_fasta};

pub const GENES_SUFFIX: &str = "expression_genes.tab";
pub const SITES_SUFFIX: &str = "expression_sites.tab";
pub const DE_SUFFIX: &str = "genes_de.tab";
pub const PAIRS_SUFFIX: &str = "pairs_de.tab";
pub const DISTANCE_SUFFIX: &str = "pairs_distance.tab";

///
/// Remove everything in a comparison folder except its `*.config` files.
///
pub fn clean_comps_dir(dir: &Path) -> std::io::Result<()> {
    if !dir.exists() {
        return std::fs::create_dir_all(dir);
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            std::fs::remove_dir_all(&path)?;
        } else if path.extension().is_none_or(|ext| ext != "config") {
            std::fs::remove_file(&path)?;
        }
    }
    Ok(())
}

///
/// Expression of a replicate: the sum of the expression files of its
/// experiments.
///
pub fn load_replicate(layout: &Layout, replicate: &Replicate) -> Result<CountTrack, CompsError> {
    let mut track = CountTrack::new();
    for experiment in &replicate.experiments {
        let id: ExperimentId = experiment.parse()?;
        track.merge(&read_intervals(&layout.e_path(&id))?);
    }
    log::debug!(
        "{}: {} cDNA at {} sites from {} experiments",
        replicate.id,
        track.total(),
        track.len(),
        replicate.experiments.len()
    );
    Ok(track)
}

fn create(path: &Path) -> Result<BufWriter<File>, CompsError> {
    Ok(BufWriter::new(File::create(path)?))
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComparisonSummary {
    pub genes: usize,
    pub pairs: usize,
    pub de: Option<DeTable>,
    pub regulation: BTreeMap<Regulation, usize>,
}

///
/// One control vs test comparison with everything it needs from outside.
///
pub struct Comparison<'a, A: LocusAnnotation, S: SequenceSource> {
    pub config: &'a ComparisonConfig,
    pub layout: &'a Layout,
    /// Genome id written into track headers.
    pub genome_name: &'a str,
    pub annotation: &'a A,
    /// Enables UG scores and flanking sequence export.
    pub genome: Option<&'a S>,
    pub de: Option<&'a dyn DifferentialExpression>,
    pub fasta: bool,
}

impl<'a, A: LocusAnnotation, S: SequenceSource> Comparison<'a, A, S> {
    fn path(&self, suffix: &str) -> std::path::PathBuf {
        self.layout.comps_file(&self.config.comps_id, suffix)
    }

    fn write_beds(&self, replicates: &[&Replicate], tracks: &[CountTrack]) -> Result<(), CompsError> {
        let comps_id = &self.config.comps_id;
        let beds = self.layout.comps_dir(comps_id).join("beds");
        let genome = Some(self.genome_name);

        std::fs::create_dir_all(&beds)?;
        let mut combined = create(&beds.join(format!("{}_all.bed", comps_id)))?;
        let mut pooled: BTreeMap<Group, CountTrack> = BTreeMap::new();
        for (replicate, track) in replicates.iter().zip(tracks) {
            let name = format!("{}.{}", comps_id, replicate.id);
            track.write_track(beds.join(format!("{}.E.bed", name)), &name, genome)?;
            track.write_track_to(&mut combined, &name, genome)?;
            pooled.entry(replicate.group()).or_default().merge(track);
        }
        combined.flush()?;
        for (group, track) in pooled {
            let label = match group {
                Group::Control => "control_all",
                Group::Test => "test_all",
            };
            let name = format!("{}.{}", comps_id, label);
            track.write_track(beds.join(format!("{}.E.bed", name)), &name, genome)?;
        }
        Ok(())
    }

    ///
    /// Run the comparison, replacing every earlier output in its folder.
    ///
    pub fn run(&self) -> Result<ComparisonSummary, CompsError> {
        let config = self.config;
        let comps_id = &config.comps_id;
        clean_comps_dir(&self.layout.comps_dir(comps_id))?;

        let replicates = config.replicates();
        let tracks = replicates
            .iter()
            .map(|r| load_replicate(self.layout, r))
            .collect::<Result<Vec<_>, _>>()?;
        self.write_beds(&replicates, &tracks)?;

        let columns = replicates.iter().map(|r| ReplicateColumn::from(*r)).collect();
        let matrix = GeneSiteMatrix::build(columns, &tracks, self.annotation, &config.thresholds);

        let table = matrix.gene_table();
        let mut writer = create(&self.path(GENES_SUFFIX))?;
        table.write(&mut writer)?;
        writer.flush()?;
        let mut writer = create(&self.path(SITES_SUFFIX))?;
        matrix.write_site_table(&mut writer)?;
        writer.flush()?;

        let de = match self.de {
            Some(service) => {
                let result = service.run(&table)?;
                log::info!(
                    "{}: {} of {} genes with FDR < {}",
                    comps_id,
                    result.significant(config.thresholds.fisher_thr),
                    result.rows.len(),
                    config.thresholds.fisher_thr
                );
                Some(result)
            }
            None => None,
        };

        let pairs = pair_results(&matrix, self.annotation, self.genome)?;
        let mut writer = create(&self.path(PAIRS_SUFFIX))?;
        write_pairs(&pairs, &config.control_name, &config.test_name, &mut writer)?;
        writer.flush()?;

        let mut writer = create(&self.path(DISTANCE_SUFFIX))?;
        write_histogram(&distance_histogram(&pairs), &mut writer)?;
        writer.flush()?;

        let regulation = match (self.fasta, self.genome) {
            (true, Some(genome)) => write_fasta(
                &pairs,
                genome,
                &config.thresholds,
                &self.layout.comps_dir(comps_id).join("fasta"),
            )?,
            (true, None) => {
                log::warn!("{}: no genome sequence, skipping fasta export", comps_id);
                BTreeMap::new()
            }
            (false, _) => BTreeMap::new(),
        };

        log::info!("{}: {} genes, {} site pairs", comps_id, matrix.len(), pairs.len());
        Ok(ComparisonSummary {
            genes: matrix.len(),
            pairs: pairs.len(),
            de,
            regulation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_clean_keeps_config() {
        let dir = tempfile::tempdir().unwrap();
        let comps = dir.path().join("kd");
        std::fs::create_dir_all(comps.join("beds")).unwrap();
        std::fs::write(comps.join("kd.config"), "id\texperiments\tname\n").unwrap();
        std::fs::write(comps.join("kd.pairs_de.tab"), "old").unwrap();
        std::fs::write(comps.join("beds/kd.c1.E.bed"), "old").unwrap();

        clean_comps_dir(&comps).unwrap();

        let mut left: Vec<String> = std::fs::read_dir(&comps)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        left.sort();
        assert_eq!(left, vec!["kd.config"]);
    }

    #[rstest]
    fn test_load_replicate_pools_experiments() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout {
            data_folder: dir.path().join("data"),
            comps_folder: dir.path().join("comps"),
        };
        for (exp, count) in [("lib1_e1", 2), ("lib1_e2", 3)] {
            let mut track = CountTrack::new();
            track.add("chr1", apa_core::models::Strand::Reverse, 40, count);
            track.write_intervals(layout.e_path(&exp.parse().unwrap())).unwrap();
        }

        let replicate = Replicate {
            id: "c1".to_string(),
            experiments: vec!["lib1_e1".to_string(), "lib1_e2".to_string()],
            name: "wt".to_string(),
        };
        let track = load_replicate(&layout, &replicate).unwrap();
        assert_eq!(track.get("chr1", apa_core::models::Strand::Reverse, 40), 5);

        let missing = Replicate {
            experiments: vec!["lib1_e9".to_string()],
            ..replicate
        };
        assert!(load_replicate(&layout, &missing).is_err());
    }
}
