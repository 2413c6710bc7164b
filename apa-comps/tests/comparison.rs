use std::cell::RefCell;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use rstest::*;

use apa_comps::de::DeRow;
use apa_comps::{
    Comparison, ComparisonConfig, CompsError, DeTable, DifferentialExpression, Gene, GeneTable, GtfAnnotation,
    LocusAnnotation, PairType,
};
use apa_core::models::{ExpressionTable, Genome, ReferenceSites, SiteTable, Strand};
use apa_core::project::{ExperimentId, Layout};
use apa_io::{IntervalWrite, read_intervals};

/// One gene covering everything on chr1 +, every pair tandem.
struct SingleGene {
    gene: Gene,
}

impl SingleGene {
    fn new() -> Self {
        SingleGene {
            gene: Gene {
                gene_id: "G1".to_string(),
                gene_name: "GENE1".to_string(),
                gene_biotype: "protein_coding".to_string(),
                chr: "chr1".to_string(),
                strand: Strand::Forward,
                start: 0,
                stop: 1000,
                exons: vec![],
            },
        }
    }
}

impl LocusAnnotation for SingleGene {
    fn gene_at(&self, chr: &str, strand: Strand, pos: u32) -> Option<&Gene> {
        (chr == self.gene.chr && strand == self.gene.strand && self.gene.contains(pos)).then_some(&self.gene)
    }

    fn gene(&self, gene_id: &str) -> Option<&Gene> {
        (gene_id == self.gene.gene_id).then_some(&self.gene)
    }

    fn pair_type(&self, _gene: &Gene, _proximal: u32, _distal: u32) -> PairType {
        PairType::Tandem
    }
}

/// Records what it was given and answers with a fixed result.
#[derive(Default)]
struct StubDe {
    seen: RefCell<Option<(usize, usize, usize)>>,
}

impl DifferentialExpression for StubDe {
    fn run(&self, table: &GeneTable) -> Result<DeTable, CompsError> {
        *self.seen.borrow_mut() = Some((
            table.rows.len(),
            table.count_in(apa_comps::Group::Control),
            table.count_in(apa_comps::Group::Test),
        ));
        Ok(DeTable {
            rows: table
                .rows
                .iter()
                .map(|r| DeRow {
                    gene_id: r.gene.gene_id.clone(),
                    log_fc: 0.0,
                    p_value: 1.0,
                    fdr: 1.0,
                })
                .collect(),
        })
    }
}

fn get_test_path(file_name: &str) -> PathBuf {
    std::env::current_dir()
        .unwrap()
        .join("../tests/data")
        .join(file_name)
}

fn layout(root: &Path) -> Layout {
    Layout {
        data_folder: root.join("data"),
        comps_folder: root.join("comps"),
    }
}

/// Raw molecules per position overlaid onto the reference, written as the
/// experiment's expression file.
fn write_expression(layout: &Layout, experiment: &str, strand: Strand, molecules: &[(u32, usize)], reference: &[u32]) {
    let mut sites = SiteTable::new();
    for (pos, n) in molecules {
        for m in 0..*n {
            sites.insert("chr1", strand, *pos, &format!("{}_{}", pos, m));
        }
    }

    let mut reference_sites = ReferenceSites::new();
    for pos in reference {
        reference_sites.insert("chr1", strand, *pos);
    }

    let mut expression = ExpressionTable::new();
    expression.overlay(&reference_sites, &sites.to_counts(), 100, 25);
    let id: ExperimentId = experiment.parse().unwrap();
    expression.track().write_intervals(layout.e_path(&id)).unwrap();
}

fn config(text: &str) -> ComparisonConfig {
    ComparisonConfig::parse("kd", text.as_bytes(), "kd.config").unwrap()
}

#[rstest]
fn test_two_sample_comparison() {
    let dir = tempfile::tempdir().unwrap();
    let layout = layout(dir.path());
    write_expression(&layout, "lib1_e1", Strand::Forward, &[(100, 3), (200, 1)], &[100, 200]);
    write_expression(&layout, "lib1_e2", Strand::Forward, &[(100, 3), (200, 1)], &[100, 200]);

    let config = config("id\texperiments\tname\nc1\tlib1_e1\twt\nt1\tlib1_e2\tkd\ncDNA_thr:1\n");
    std::fs::create_dir_all(layout.comps_dir("kd")).unwrap();
    std::fs::write(layout.comps_config_path("kd"), "kept").unwrap();
    std::fs::write(layout.comps_file("kd", "stale.tab"), "old").unwrap();

    let annotation = SingleGene::new();
    let de = StubDe::default();
    let summary = Comparison::<_, Genome> {
        config: &config,
        layout: &layout,
        genome_name: "hg38",
        annotation: &annotation,
        genome: None,
        de: Some(&de),
        fasta: false,
    }
    .run()
    .unwrap();

    assert_eq!(summary.genes, 1);
    assert_eq!(summary.pairs, 1);
    assert_eq!(summary.de.unwrap().rows.len(), 1);
    assert_eq!(*de.seen.borrow(), Some((1, 1, 1)));

    // earlier outputs are gone, the definition is kept
    assert!(!layout.comps_file("kd", "stale.tab").exists());
    assert_eq!(std::fs::read_to_string(layout.comps_config_path("kd")).unwrap(), "kept");

    let pairs = std::fs::read_to_string(layout.comps_file("kd", "pairs_de.tab")).unwrap();
    let rows: Vec<Vec<&str>> = pairs.lines().map(|l| l.split('\t').collect()).collect();
    assert_eq!(rows.len(), 2);
    let header = &rows[0];
    let row = &rows[1];
    let value = |name: &str| row[header.iter().position(|h| *h == name).unwrap()];

    assert_eq!(value("gene_id"), "G1");
    assert_eq!(value("siteup_pos"), "100");
    assert_eq!(value("siteup_exp"), "6");
    assert_eq!(value("sitedown_pos"), "200");
    assert_eq!(value("sitedown_exp"), "2");
    assert_eq!(value("up_control"), "3");
    assert_eq!(value("down_test_sum"), "1");
    assert_eq!(value("pc"), "0.00000");
    assert_eq!(value("fisher"), "1.00000");
    assert_eq!(value("pair_type"), "tandem");

    let genes = std::fs::read_to_string(layout.comps_file("kd", "expression_genes.tab")).unwrap();
    assert_eq!(
        genes.lines().nth(1).unwrap(),
        "chr1\t+\tchr1:0-1000\tG1\tGENE1\tprotein_coding\t100:6;200:2\t2\t8\t4\t4"
    );

    let pooled = read_intervals(&layout.comps_dir("kd").join("beds/kd.control_all.E.bed")).unwrap();
    assert_eq!(pooled.get("chr1", Strand::Forward, 100), 3);
    let track = std::fs::read_to_string(layout.comps_dir("kd").join("beds/kd.t1.E.bed")).unwrap();
    assert!(track.starts_with("track type=bedGraph name=\"kd.t1\""));

    // the combined browser file holds every replicate track in order
    let beds = layout.comps_dir("kd").join("beds");
    let combined = std::fs::read_to_string(beds.join("kd_all.bed")).unwrap();
    let replicate_files: String = ["kd.c1.E.bed", "kd.t1.E.bed"]
        .iter()
        .map(|f| std::fs::read_to_string(beds.join(f)).unwrap())
        .collect();
    assert_eq!(combined, replicate_files);
    assert_eq!(combined.lines().filter(|l| l.starts_with("track")).count(), 2);
    let union = read_intervals(&beds.join("kd_all.bed")).unwrap();
    assert_eq!(union.get("chr1", Strand::Forward, 100), 6);
    assert_eq!(union.get("chr1", Strand::Forward, 200), 2);

    assert!(layout.comps_file("kd", "pairs_distance.tab").exists());
}

#[rstest]
fn test_comparison_with_gtf_and_genome() {
    let dir = tempfile::tempdir().unwrap();
    let layout = layout(dir.path());
    // GENE2 on the reverse strand: exons 600-700 and 900-1000
    write_expression(&layout, "lib1_e1", Strand::Reverse, &[(650, 8), (950, 2)], &[650, 950]);
    write_expression(&layout, "lib1_e2", Strand::Reverse, &[(650, 8), (950, 2)], &[650, 950]);
    write_expression(&layout, "lib2_e1", Strand::Reverse, &[(650, 1), (950, 9)], &[650, 950]);

    let config = config(
        "id\texperiments\tname\nc1\tlib1_e1,lib1_e2\twt\nt1\tlib2_e1\tkd\ncontrol_name:wt\ntest_name:kd\ncDNA_thr:1\n",
    );
    let annotation = GtfAnnotation::from_path(&get_test_path("genes.gtf")).unwrap();
    let genome = Genome::from_iter([("chr1", "ACGT".repeat(300))]);

    let summary = Comparison {
        config: &config,
        layout: &layout,
        genome_name: "hg38",
        annotation: &annotation,
        genome: Some(&genome),
        de: None,
        fasta: true,
    }
    .run()
    .unwrap();
    assert_eq!(summary.pairs, 1);
    assert!(summary.de.is_none());

    let pairs = std::fs::read_to_string(layout.comps_file("kd", "pairs_de.tab")).unwrap();
    let rows: Vec<Vec<&str>> = pairs.lines().map(|l| l.split('\t').collect()).collect();
    let value = |name: &str| rows[1][rows[0].iter().position(|h| *h == name).unwrap()];

    assert_eq!(value("gene_id"), "G2");
    // the site at 950 comes first in transcription direction
    assert_eq!(value("siteup_pos"), "950");
    assert_eq!(value("sitedown_pos"), "650");
    assert_eq!(value("siteup_UG"), "0");
    assert_eq!(value("up_control [wt]"), "4");
    assert_eq!(value("up_control_sum [wt]"), "4");
    assert_eq!(value("up_test_sum [kd]"), "9");
    assert_eq!(value("pair_type"), "skipped");
    assert!(value("pc").starts_with("-0.70"));

    // skipped pairs are not exported
    assert!(summary.regulation.is_empty());
}
