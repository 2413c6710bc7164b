use pretty_assertions::assert_eq;
use rstest::*;

use apa_core::models::{ExpressionTable, ReferenceSites, SiteTable, Strand};
use apa_io::{IntervalWrite, read_intervals};

#[fixture]
fn sites() -> SiteTable {
    let mut sites = SiteTable::new();
    for (chr, strand, pos, molecules) in [
        ("chr1", Strand::Forward, 100, 3),
        ("chr1", Strand::Forward, 250, 1),
        ("chr1", Strand::Reverse, 80, 2),
        ("chr2", Strand::Reverse, 5, 4),
    ] {
        for m in 0..molecules {
            sites.insert(chr, strand, pos, &format!("read{}", m));
        }
    }
    // PCR duplicate of an already counted molecule
    sites.insert("chr1", Strand::Reverse, 80, "read0");
    sites
}

#[rstest]
fn test_sites_survive_serializer_and_zero_window_overlay(sites: SiteTable) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lib1/e1/m1/lib1_e1_m1.R.bed");
    let counts = sites.to_counts();

    counts.write_intervals(&path).unwrap();
    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.lines().any(|l| l == "chr1\t80\t81\t-2"));
    assert!(raw.lines().any(|l| l == "chr2\t5\t6\t-4"));

    let loaded = read_intervals(&path).unwrap();
    assert_eq!(loaded, counts);

    // the file's own positions as reference, nothing may move
    let reference = ReferenceSites::from(&loaded);
    let mut expression = ExpressionTable::new();
    let stats = expression.overlay(&reference, &loaded, 0, 0);

    assert_eq!(stats.dropped, 0);
    assert_eq!(stats.assigned, 10);
    assert_eq!(expression.track(), &counts);
    for (chr, strand, pos) in [
        ("chr1", Strand::Forward, 100),
        ("chr1", Strand::Forward, 250),
        ("chr1", Strand::Reverse, 80),
        ("chr2", Strand::Reverse, 5),
    ] {
        assert_eq!(
            expression.get_value(chr, strand, pos),
            sites.molecule_count(chr, strand, pos) as u64
        );
    }
}
