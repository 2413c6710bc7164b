use std::collections::{BTreeMap, HashSet};

use crate::models::{CountTrack, Strand};

///
/// Candidate cleavage positions with the distinct molecules supporting them.
///
/// Keyed by chromosome and strand, then by 0-based position. The size of a
/// position's molecule set is its cDNA count; inserting the same molecule
/// twice at one position does not change it.
///
#[derive(Clone, Debug, Default)]
pub struct SiteTable {
    sites: BTreeMap<String, BTreeMap<Strand, BTreeMap<u32, HashSet<String>>>>,
}

impl SiteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `molecule` at the position. Returns false when the molecule was
    /// already counted there.
    pub fn insert(&mut self, chr: &str, strand: Strand, pos: u32, molecule: &str) -> bool {
        let per_chr = self.sites.entry(chr.to_string()).or_default();
        let molecules = per_chr.entry(strand).or_default().entry(pos).or_default();
        if molecules.contains(molecule) {
            return false;
        }
        molecules.insert(molecule.to_string())
    }

    pub fn molecule_count(&self, chr: &str, strand: Strand, pos: u32) -> usize {
        self.sites
            .get(chr)
            .and_then(|per_strand| per_strand.get(&strand))
            .and_then(|positions| positions.get(&pos))
            .map_or(0, |molecules| molecules.len())
    }

    /// Number of distinct positions across all chromosomes and strands.
    pub fn len(&self) -> usize {
        self.sites
            .values()
            .flat_map(|per_strand| per_strand.values())
            .map(|positions| positions.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Collapse molecule sets into cDNA counts.
    pub fn to_counts(&self) -> CountTrack {
        let mut track = CountTrack::new();
        for (chr, per_strand) in &self.sites {
            for (strand, positions) in per_strand {
                for (pos, molecules) in positions {
                    track.add(chr, *strand, *pos, molecules.len() as u64);
                }
            }
        }
        track
    }
}
