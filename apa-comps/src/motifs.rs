use apa_core::errors::ApaCoreError;
use apa_core::models::{SequenceSource, Strand};

pub const UG_MOTIFS: [&str; 2] = ["TGT", "GTG"];
/// Bases scanned upstream of the site, in transcript orientation.
pub const UG_UPSTREAM: i64 = 100;
/// Bases scanned downstream of the site, in transcript orientation.
pub const UG_DOWNSTREAM: i64 = 60;
pub const UG_HALF_WINDOW: usize = 25;
pub const UG_MIN_HITS: u32 = 17;

/// 1 at every offset where one of `motifs` starts, 0 elsewhere.
pub fn motif_vector(seq: &str, motifs: &[&str]) -> Vec<u8> {
    let bytes = seq.as_bytes();
    (0..bytes.len())
        .map(|i| {
            let hit = motifs
                .iter()
                .any(|m| bytes[i..].starts_with(m.as_bytes()));
            u8::from(hit)
        })
        .collect()
}

///
/// Keep only marks that sit in a dense cluster: a mark at `i` survives if
/// the marks in `[i - half_window, i + half_window]` sum to at least
/// `min_hits`.
///
pub fn cluster_filter(marks: &[u8], half_window: usize, min_hits: u32) -> Vec<u8> {
    marks
        .iter()
        .enumerate()
        .map(|(i, &mark)| {
            if mark == 0 {
                return 0;
            }
            let lo = i.saturating_sub(half_window);
            let hi = (i + half_window + 1).min(marks.len());
            let hits: u32 = marks[lo..hi].iter().map(|&m| m as u32).sum();
            u8::from(hits >= min_hits)
        })
        .collect()
}

/// Number of clustered UG marks in `seq`.
pub fn ug_score(seq: &str) -> u32 {
    let marks = motif_vector(seq, &UG_MOTIFS);
    cluster_filter(&marks, UG_HALF_WINDOW, UG_MIN_HITS)
        .iter()
        .map(|&m| m as u32)
        .sum()
}

///
/// UG score of the region around a site, read in transcript orientation.
///
pub fn site_ug_score<S: SequenceSource>(
    genome: &S,
    chr: &str,
    strand: Strand,
    pos: u32,
) -> Result<u32, ApaCoreError> {
    let pos = pos as i64;
    let seq = match strand {
        Strand::Forward => genome.seq(chr, strand, pos - UG_UPSTREAM, pos + UG_DOWNSTREAM)?,
        Strand::Reverse => genome.seq(chr, strand, pos - UG_DOWNSTREAM, pos + UG_UPSTREAM)?,
    };
    Ok(ug_score(&seq))
}
