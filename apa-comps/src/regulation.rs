use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt::{self, Display};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use apa_core::models::SequenceSource;

use crate::annotation::PairType;
use crate::config::Thresholds;
use crate::errors::CompsError;
use crate::pairs::PairResult;

/// Bases written on each side of a site.
pub const FLANK: i64 = 50;
/// Pairs spanning at most this many bases are short.
pub const SHORT_DISTANCE: u32 = 200;

/// Response of a site to the test condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Regulation {
    Repressed,
    Enhanced,
    Control,
}

impl Regulation {
    pub fn code(&self) -> char {
        match self {
            Regulation::Repressed => 'r',
            Regulation::Enhanced => 'e',
            Regulation::Control => 'c',
        }
    }

    /// Class of the opposite site of the pair.
    pub fn mirrored(&self) -> Self {
        match self {
            Regulation::Repressed => Regulation::Enhanced,
            Regulation::Enhanced => Regulation::Repressed,
            Regulation::Control => Regulation::Control,
        }
    }
}

///
/// Class of the proximal site of a pair, `None` if the pair is neither
/// regulated nor clearly unchanged.
///
pub fn classify(pc: f64, fisher: f64, thresholds: &Thresholds) -> Option<Regulation> {
    if fisher > 0.5 {
        return Some(Regulation::Control);
    }
    if pc.abs() > thresholds.pc_thr && fisher < thresholds.fisher_thr {
        return Some(if pc >= 0.0 {
            Regulation::Repressed
        } else {
            Regulation::Enhanced
        });
    }
    None
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistanceClass {
    Short,
    Medium,
    Long,
}

impl DistanceClass {
    /// `span` counts both sites, one more than their distance.
    pub fn of(span: u32, pair_dist: u32) -> Self {
        if span <= SHORT_DISTANCE {
            DistanceClass::Short
        } else if span <= pair_dist {
            DistanceClass::Medium
        } else {
            DistanceClass::Long
        }
    }
}

impl Display for DistanceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DistanceClass::Short => "short",
            DistanceClass::Medium => "medium",
            DistanceClass::Long => "long",
        };
        write!(f, "{}", label)
    }
}

///
/// Write the flanking sequence of both sites of every classified tandem pair
/// to `<folder>/<siteup|sitedown>.<class>.fasta`.
///
/// Returns how many pairs ended up in each class.
///
pub fn write_fasta<S: SequenceSource>(
    results: &[PairResult],
    genome: &S,
    thresholds: &Thresholds,
    folder: &Path,
) -> Result<BTreeMap<Regulation, usize>, CompsError> {
    std::fs::create_dir_all(folder)?;

    let mut writers: BTreeMap<(&str, Regulation), BufWriter<File>> = BTreeMap::new();
    let mut counts: BTreeMap<Regulation, usize> = BTreeMap::new();

    for r in results.iter().filter(|r| r.pair_type == PairType::Tandem) {
        let Some(class) = classify(r.pc, r.fisher, thresholds) else {
            continue;
        };
        let n = counts.entry(class).or_insert(0);
        *n += 1;
        let n = *n;
        let distance = DistanceClass::of(r.distance() + 1, thresholds.pair_dist);

        for (site, pos, site_class) in [
            ("siteup", r.proximal.pos, class),
            ("sitedown", r.distal.pos, class.mirrored()),
        ] {
            let pos = pos as i64;
            let seq = genome.seq(&r.gene.chr, r.gene.strand, pos - FLANK, pos + FLANK)?;

            let writer = match writers.entry((site, site_class)) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(e) => {
                    let path = folder.join(format!("{}.{}.fasta", site, site_class.code()));
                    e.insert(BufWriter::new(File::create(path)?))
                }
            };
            writeln!(
                writer,
                ">{}.{}.{} {} {}\n{}",
                site,
                site_class.code(),
                n,
                r.gene.gene_id,
                distance,
                seq
            )?;
        }
    }

    for writer in writers.values_mut() {
        writer.flush()?;
    }
    log::info!(
        "Wrote flanking sequences of {} regulated pairs to {}",
        counts.values().sum::<usize>(),
        folder.display()
    );
    Ok(counts)
}
