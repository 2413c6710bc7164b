use std::collections::BTreeMap;

use crate::models::Strand;

///
/// Per-position counts keyed by chromosome and strand.
///
/// This is the shape every interval artifact of the pipeline reduces to:
/// raw/true site files, expression files and pooled replicate tracks.
/// Iteration is always chromosome, then strand (`+` first), then position
/// ascending.
///
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CountTrack {
    counts: BTreeMap<String, BTreeMap<Strand, BTreeMap<u32, u64>>>,
}

impl CountTrack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` to the value stored at the position.
    pub fn add(&mut self, chr: &str, strand: Strand, pos: u32, count: u64) {
        let per_chr = self.counts.entry(chr.to_string()).or_default();
        *per_chr
            .entry(strand)
            .or_default()
            .entry(pos)
            .or_insert(0) += count;
    }

    /// Accumulate every position of `other` into this track.
    pub fn merge(&mut self, other: &CountTrack) {
        for (chr, strand, pos, count) in other.iter() {
            self.add(chr, strand, pos, count);
        }
    }

    pub fn get(&self, chr: &str, strand: Strand, pos: u32) -> u64 {
        self.counts
            .get(chr)
            .and_then(|per_strand| per_strand.get(&strand))
            .and_then(|positions| positions.get(&pos))
            .copied()
            .unwrap_or(0)
    }

    pub fn positions(&self, chr: &str, strand: Strand) -> Option<&BTreeMap<u32, u64>> {
        self.counts.get(chr).and_then(|per_strand| per_strand.get(&strand))
    }

    /// (chromosome, strand) groups present in the track, in emission order.
    pub fn groups(&self) -> impl Iterator<Item = (&str, Strand, &BTreeMap<u32, u64>)> {
        self.counts.iter().flat_map(|(chr, per_strand)| {
            per_strand
                .iter()
                .map(move |(strand, positions)| (chr.as_str(), *strand, positions))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Strand, u32, u64)> {
        self.groups().flat_map(|(chr, strand, positions)| {
            positions
                .iter()
                .map(move |(pos, count)| (chr, strand, *pos, *count))
        })
    }

    /// Number of distinct positions.
    pub fn len(&self) -> usize {
        self.groups().map(|(_, _, positions)| positions.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total(&self) -> u64 {
        self.iter().map(|(_, _, _, count)| count).sum()
    }
}
