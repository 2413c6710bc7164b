use std::collections::BTreeMap;

use crate::models::{CountTrack, Strand};

/// Default window upstream of a reference site that still counts towards it.
pub const DEFAULT_REGION_UP: u32 = 100;
/// Default window downstream of a reference site that still counts towards it.
pub const DEFAULT_REGION_DOWN: u32 = 25;

///
/// Curated reference poly(A) positions (the "poly(A) database") of one genome.
///
#[derive(Clone, Debug, Default)]
pub struct ReferenceSites {
    positions: BTreeMap<String, BTreeMap<Strand, Vec<u32>>>,
}

impl ReferenceSites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, chr: &str, strand: Strand, pos: u32) {
        let positions = self
            .positions
            .entry(chr.to_string())
            .or_default()
            .entry(strand)
            .or_default();
        if let Err(idx) = positions.binary_search(&pos) {
            positions.insert(idx, pos);
        }
    }

    pub fn len(&self) -> usize {
        self.positions
            .values()
            .flat_map(|per_strand| per_strand.values())
            .map(|positions| positions.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    ///
    /// Find the reference site a raw position belongs to.
    ///
    /// With `d` the offset of `pos` from a reference site in transcription
    /// direction, the site is eligible when `-region_up <= d <= region_down`.
    /// The nearest eligible site wins; two equally near sites make the
    /// assignment ambiguous and `None` is returned.
    ///
    pub fn nearest(
        &self,
        chr: &str,
        strand: Strand,
        pos: u32,
        region_up: u32,
        region_down: u32,
    ) -> Option<u32> {
        let positions = self.positions.get(chr)?.get(&strand)?;

        // genomic span of eligible reference positions
        let pos = pos as i64;
        let (lo, hi) = match strand {
            Strand::Forward => (pos - region_down as i64, pos + region_up as i64),
            Strand::Reverse => (pos - region_up as i64, pos + region_down as i64),
        };

        let first = positions.partition_point(|&r| (r as i64) < lo);
        let mut best: Option<(u32, i64)> = None;
        let mut tied = false;
        for &r in positions[first..].iter().take_while(|&&r| (r as i64) <= hi) {
            let distance = (r as i64 - pos).abs();
            match best {
                Some((_, best_distance)) if distance > best_distance => {}
                Some((_, best_distance)) if distance == best_distance => tied = true,
                _ => {
                    best = Some((r, distance));
                    tied = false;
                }
            }
        }

        if tied { None } else { best.map(|(r, _)| r) }
    }
}

impl From<&CountTrack> for ReferenceSites {
    fn from(track: &CountTrack) -> Self {
        let mut sites = ReferenceSites::new();
        for (chr, strand, pos, _) in track.iter() {
            sites.insert(chr, strand, pos);
        }
        sites
    }
}

/// Bookkeeping of a single overlay pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OverlayStats {
    pub assigned: u64,
    pub dropped: u64,
}

///
/// Per reference position cDNA counts of one sample.
///
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpressionTable {
    track: CountTrack,
}

impl ExpressionTable {
    pub fn new() -> Self {
        Self::default()
    }

    ///
    /// Overlay raw site counts onto the reference positions.
    ///
    /// Counts are added to whatever the table already holds, so several runs
    /// of one logical sample can be overlaid into the same table.
    ///
    /// # Arguments
    /// - reference: curated reference positions
    /// - raw: raw site counts of the sample
    /// - region_up: eligible distance upstream of a reference position
    /// - region_down: eligible distance downstream of a reference position
    pub fn overlay(
        &mut self,
        reference: &ReferenceSites,
        raw: &CountTrack,
        region_up: u32,
        region_down: u32,
    ) -> OverlayStats {
        let mut stats = OverlayStats::default();
        for (chr, strand, pos, count) in raw.iter() {
            match reference.nearest(chr, strand, pos, region_up, region_down) {
                Some(site) => {
                    self.track.add(chr, strand, site, count);
                    stats.assigned += count;
                }
                None => stats.dropped += count,
            }
        }
        stats
    }

    /// Add an already computed expression track (e.g. loaded from disk).
    pub fn accumulate(&mut self, other: &CountTrack) {
        self.track.merge(other);
    }

    pub fn get_value(&self, chr: &str, strand: Strand, pos: u32) -> u64 {
        self.track.get(chr, strand, pos)
    }

    pub fn track(&self) -> &CountTrack {
        &self.track
    }

    pub fn into_track(self) -> CountTrack {
        self.track
    }
}

impl From<CountTrack> for ExpressionTable {
    fn from(track: CountTrack) -> Self {
        ExpressionTable { track }
    }
}
