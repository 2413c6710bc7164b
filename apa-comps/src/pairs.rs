//! Differential usage of site pairs.
//!
//! For every gene the two strongest sites form a pair. Sites are oriented
//! along the transcript: the proximal (upstream) site is the one nearer the
//! gene start. The usage shift `pc` compares the proximal share between test
//! and control, a Fisher exact test gives its significance.

use std::cmp::Ordering;
use std::io::Write;

use apa_core::models::{SequenceSource, Strand};

use crate::aggregate::{GeneSiteMatrix, GeneSites, SiteExpression};
use crate::annotation::{Gene, LocusAnnotation, PairType};
use crate::config::Group;
use crate::errors::CompsError;
use crate::motifs::site_ug_score;
use crate::stats::fisher_exact;

/// The weaker site must carry at least 1/20 of the stronger one.
pub const MINOR_SITE_DIVISOR: u64 = 20;

/// One site of a pair with its counts split by group.
#[derive(Clone, Debug, PartialEq)]
pub struct PairSite {
    pub pos: u32,
    pub cdna_sum: u64,
    pub ug: Option<u32>,
    pub control: Vec<u64>,
    pub test: Vec<u64>,
}

impl PairSite {
    pub fn control_sum(&self) -> u64 {
        self.control.iter().sum()
    }

    pub fn test_sum(&self) -> u64 {
        self.test.iter().sum()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PairResult {
    pub gene: Gene,
    pub num_sites: usize,
    pub proximal: PairSite,
    pub distal: PairSite,
    pub pc: f64,
    pub fisher: f64,
    pub pair_type: PairType,
}

impl PairResult {
    /// Genomic distance between the two sites.
    pub fn distance(&self) -> u32 {
        self.proximal.pos.abs_diff(self.distal.pos)
    }
}

///
/// The two highest expressed sites of a gene, strongest first.
///
/// Ties in expression go to the lower position. Returns `None` if the gene
/// has fewer than two sites or the weaker site is below 1/20 of the stronger.
///
pub fn select_pair(sites: &GeneSites) -> Option<(&SiteExpression, &SiteExpression)> {
    let mut ranked: Vec<&SiteExpression> = sites.sites.values().collect();
    ranked.sort_by(|a, b| b.cdna_sum.cmp(&a.cdna_sum).then_with(|| a.pos.cmp(&b.pos)));

    let (major, minor) = match ranked.as_slice() {
        [major, minor, ..] => (*major, *minor),
        _ => return None,
    };
    if minor.cdna_sum * MINOR_SITE_DIVISOR < major.cdna_sum {
        return None;
    }
    Some((major, minor))
}

/// (proximal, distal) of two positions on `strand`.
pub fn orient(strand: Strand, a: u32, b: u32) -> (u32, u32) {
    match strand {
        Strand::Forward => (a.min(b), a.max(b)),
        Strand::Reverse => (a.max(b), a.min(b)),
    }
}

///
/// Shift in proximal site usage from control to test. A group with no
/// counts on either site makes the shift 0.
///
pub fn usage_shift(up_control: u64, down_control: u64, up_test: u64, down_test: u64) -> f64 {
    let control = up_control + down_control;
    let test = up_test + down_test;
    if control == 0 || test == 0 {
        return 0.0;
    }
    up_control as f64 / control as f64 - up_test as f64 / test as f64
}

/// The value as printed with five decimals.
fn printed(value: f64) -> f64 {
    format!("{:.5}", value).parse().unwrap_or(value)
}

///
/// Output order of pair results: pair type label descending, then Fisher
/// p-value ascending, then |pc| descending. Values are compared as printed.
///
pub fn compare_pairs(a: &PairResult, b: &PairResult) -> Ordering {
    b.pair_type
        .as_str()
        .cmp(a.pair_type.as_str())
        .then_with(|| printed(a.fisher).total_cmp(&printed(b.fisher)))
        .then_with(|| printed(b.pc).abs().total_cmp(&printed(a.pc).abs()))
}

fn pair_site<S: SequenceSource>(
    matrix: &GeneSiteMatrix,
    gene: &Gene,
    site: &SiteExpression,
    genome: Option<&S>,
) -> Result<PairSite, CompsError> {
    let ug = match genome {
        Some(genome) => Some(site_ug_score(genome, &gene.chr, gene.strand, site.pos)?),
        None => None,
    };
    Ok(PairSite {
        pos: site.pos,
        cdna_sum: site.cdna_sum,
        ug,
        control: site.group_counts(matrix.columns(), Group::Control),
        test: site.group_counts(matrix.columns(), Group::Test),
    })
}

///
/// Pair analysis of every gene of the matrix, in output order.
///
/// # Arguments
/// - matrix: site expression per gene
/// - annotation: classifies the pairs
/// - genome: if given, UG scores are computed for both sites
pub fn pair_results<A, S>(
    matrix: &GeneSiteMatrix,
    annotation: &A,
    genome: Option<&S>,
) -> Result<Vec<PairResult>, CompsError>
where
    A: LocusAnnotation,
    S: SequenceSource,
{
    let mut results = Vec::new();
    for gene_sites in matrix.genes() {
        let Some((major, minor)) = select_pair(gene_sites) else {
            continue;
        };
        let gene = &gene_sites.gene;
        let (up_pos, _) = orient(gene.strand, major.pos, minor.pos);
        let (up, down) = if up_pos == major.pos { (major, minor) } else { (minor, major) };

        let proximal = pair_site(matrix, gene, up, genome)?;
        let distal = pair_site(matrix, gene, down, genome)?;

        let (up_c, up_t) = (proximal.control_sum(), proximal.test_sum());
        let (down_c, down_t) = (distal.control_sum(), distal.test_sum());

        results.push(PairResult {
            gene: gene.clone(),
            num_sites: gene_sites.sites.len(),
            pc: usage_shift(up_c, down_c, up_t, down_t),
            fisher: fisher_exact(up_c, up_t, down_c, down_t)?,
            pair_type: annotation.pair_type(gene, proximal.pos, distal.pos),
            proximal,
            distal,
        });
    }

    results.sort_by(compare_pairs);
    log::info!("{} genes with a site pair", results.len());
    Ok(results)
}

fn group_header(base: &str, name: &str) -> String {
    if name.is_empty() {
        base.to_string()
    } else {
        format!("{} [{}]", base, name)
    }
}

fn joined(counts: &[u64]) -> String {
    counts.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(";")
}

fn ug_column(ug: Option<u32>) -> String {
    ug.map(|u| u.to_string()).unwrap_or_default()
}

///
/// Write the pairs table. Group columns are labeled with `control_name`
/// and `test_name` when these are set.
///
pub fn write_pairs<W: Write>(
    results: &[PairResult],
    control_name: &str,
    test_name: &str,
    writer: &mut W,
) -> std::io::Result<()> {
    let mut header: Vec<String> = [
        "chr", "strand", "gene_locus", "gene_id", "gene_name", "gene_biotype", "num_sites",
        "siteup_pos", "siteup_exp", "siteup_UG", "sitedown_pos", "sitedown_exp", "sitedown_UG",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    for (base, name) in [
        ("up_control", control_name),
        ("up_control_sum", control_name),
        ("down_control", control_name),
        ("down_control_sum", control_name),
        ("up_test", test_name),
        ("up_test_sum", test_name),
        ("down_test", test_name),
        ("down_test_sum", test_name),
    ] {
        header.push(group_header(base, name));
    }
    header.extend(["pc", "fisher", "pair_type"].iter().map(|s| s.to_string()));
    writeln!(writer, "{}", header.join("\t"))?;

    for r in results {
        let row = [
            r.gene.chr.clone(),
            r.gene.strand.to_string(),
            r.gene.locus(),
            r.gene.gene_id.clone(),
            r.gene.gene_name.clone(),
            r.gene.gene_biotype.clone(),
            r.num_sites.to_string(),
            r.proximal.pos.to_string(),
            r.proximal.cdna_sum.to_string(),
            ug_column(r.proximal.ug),
            r.distal.pos.to_string(),
            r.distal.cdna_sum.to_string(),
            ug_column(r.distal.ug),
            joined(&r.proximal.control),
            r.proximal.control_sum().to_string(),
            joined(&r.distal.control),
            r.distal.control_sum().to_string(),
            joined(&r.proximal.test),
            r.proximal.test_sum().to_string(),
            joined(&r.distal.test),
            r.distal.test_sum().to_string(),
            format!("{:.5}", r.pc),
            format!("{:.5}", r.fisher),
            r.pair_type.to_string(),
        ];
        writeln!(writer, "{}", row.join("\t"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use apa_core::models::Genome;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::collections::BTreeMap;

    use crate::aggregate::ReplicateColumn;
    use crate::annotation::GtfAnnotation;
    use crate::config::{Replicate, Thresholds};
    use apa_core::models::CountTrack;

    fn gene(gene_id: &str, strand: Strand) -> Gene {
        Gene {
            gene_id: gene_id.to_string(),
            gene_name: gene_id.to_lowercase(),
            gene_biotype: "protein_coding".to_string(),
            chr: "chr1".to_string(),
            strand,
            start: 0,
            stop: 1000,
            exons: vec![(0, 1000)],
        }
    }

    fn gene_sites(sites: &[(u32, u64)]) -> GeneSites {
        GeneSites {
            gene: gene("G1", Strand::Forward),
            sites: sites
                .iter()
                .map(|&(pos, cdna_sum)| {
                    (
                        pos,
                        SiteExpression {
                            pos,
                            counts: vec![cdna_sum],
                            cdna_sum,
                        },
                    )
                })
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn columns() -> Vec<ReplicateColumn> {
        ["c1", "c2", "t1"]
            .iter()
            .map(|id| {
                ReplicateColumn::from(&Replicate {
                    id: id.to_string(),
                    experiments: vec![],
                    name: id.to_string(),
                })
            })
            .collect()
    }

    fn result(pair_type: PairType, fisher: f64, pc: f64) -> PairResult {
        let site = PairSite {
            pos: 0,
            cdna_sum: 0,
            ug: None,
            control: vec![],
            test: vec![],
        };
        PairResult {
            gene: gene("G", Strand::Forward),
            num_sites: 2,
            proximal: site.clone(),
            distal: site,
            pc,
            fisher,
            pair_type,
        }
    }

    #[rstest]
    #[case(&[(100, 100), (200, 5)], Some((100, 200)))]
    #[case(&[(100, 1000), (200, 49)], None)]
    #[case(&[(100, 7)], None)]
    #[case(&[(100, 10), (200, 10), (300, 10)], Some((100, 200)))]
    #[case(&[(100, 2), (200, 10), (300, 8)], Some((200, 300)))]
    fn test_select_pair(#[case] sites: &[(u32, u64)], #[case] expected: Option<(u32, u32)>) {
        let sites = gene_sites(sites);
        assert_eq!(select_pair(&sites).map(|(a, b)| (a.pos, b.pos)), expected);
    }

    #[rstest]
    fn test_orient() {
        assert_eq!(orient(Strand::Forward, 500, 100), (100, 500));
        assert_eq!(orient(Strand::Reverse, 100, 500), (500, 100));
    }

    #[rstest]
    #[case((3, 1, 3, 1), 0.0)]
    #[case((8, 2, 2, 8), 0.6)]
    #[case((0, 0, 3, 1), 0.0)]
    #[case((3, 1, 0, 0), 0.0)]
    fn test_usage_shift(#[case] counts: (u64, u64, u64, u64), #[case] expected: f64) {
        let (uc, dc, ut, dt) = counts;
        assert!((usage_shift(uc, dc, ut, dt) - expected).abs() < 1e-12);
    }

    #[rstest]
    fn test_ordering() {
        let mut results = vec![
            result(PairType::Composite, 0.001, 0.9),
            result(PairType::Tandem, 0.5, 0.9),
            result(PairType::Tandem, 0.01, 0.1),
            result(PairType::Tandem, 0.01, -0.4),
            result(PairType::Skipped, 0.2, 0.1),
        ];
        results.sort_by(compare_pairs);

        let order: Vec<(PairType, f64, f64)> = results.iter().map(|r| (r.pair_type, r.fisher, r.pc)).collect();
        assert_eq!(
            order,
            vec![
                (PairType::Tandem, 0.01, -0.4),
                (PairType::Tandem, 0.01, 0.1),
                (PairType::Tandem, 0.5, 0.9),
                (PairType::Skipped, 0.2, 0.1),
                (PairType::Composite, 0.001, 0.9),
            ]
        );
    }

    #[rstest]
    fn test_ordering_uses_printed_values() {
        // fisher values equal at five decimals: the larger |pc| wins
        let mut results = vec![
            result(PairType::Tandem, 0.0100001, 0.2),
            result(PairType::Tandem, 0.0100004, 0.3),
        ];
        results.sort_by(compare_pairs);
        assert_eq!(results[0].pc, 0.3);
    }

    #[rstest]
    fn test_pair_results_reverse_strand() {
        let mut g = gene("G2", Strand::Reverse);
        g.exons = vec![(0, 150), (250, 1000)];
        let annotation = GtfAnnotation::from_genes([g]);

        let mut c1 = CountTrack::new();
        let mut c2 = CountTrack::new();
        let mut t1 = CountTrack::new();
        c1.add("chr1", Strand::Reverse, 100, 4);
        c1.add("chr1", Strand::Reverse, 300, 6);
        c2.add("chr1", Strand::Reverse, 100, 2);
        c2.add("chr1", Strand::Reverse, 300, 8);
        t1.add("chr1", Strand::Reverse, 100, 9);
        t1.add("chr1", Strand::Reverse, 300, 1);

        let thresholds = Thresholds {
            cdna_thr: 1,
            ..Thresholds::default()
        };
        let matrix = GeneSiteMatrix::build(columns(), &[c1, c2, t1], &annotation, &thresholds);
        let results = pair_results(&matrix, &annotation, None::<&Genome>).unwrap();

        assert_eq!(results.len(), 1);
        let r = &results[0];
        // 300 comes first in transcription direction on the reverse strand
        assert_eq!(r.proximal.pos, 300);
        assert_eq!(r.proximal.control, vec![6, 8]);
        assert_eq!(r.proximal.test, vec![1]);
        assert_eq!(r.distal.pos, 100);
        assert_eq!(r.pair_type, PairType::Skipped);
        assert!((r.pc - (14.0 / 20.0 - 1.0 / 10.0)).abs() < 1e-12);
        assert!((r.fisher - fisher_exact(14, 1, 6, 9).unwrap()).abs() < 1e-12);
        assert_eq!(r.distance(), 200);

        let mut out = Vec::new();
        write_pairs(&results, "wt", "", &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].contains("\tup_control [wt]\tup_control_sum [wt]\t"));
        assert!(lines[0].contains("\tup_test\tup_test_sum\tdown_test\tdown_test_sum\tpc\tfisher\tpair_type"));
        assert!(lines[1].starts_with("chr1\t-\tchr1:0-1000\tG2\tg2\tprotein_coding\t2\t300\t15\t\t100\t15\t\t6;8\t14\t4;2\t6\t1\t1\t9\t9\t0.60000\t"));
        assert!(lines[1].ends_with("\tskipped"));
    }
}
