use apa_core::models::{SequenceSource, SiteTable, Strand};
use apa_core::project::Protocol;

use crate::errors::SiteCallerError;
use crate::pas::{downstream_a_rich, find_pas, upstream_a_rich};
use crate::protocol::{DOWNSTREAM_WINDOW, Thresholds, UPSTREAM_WINDOW};
use crate::record::AlignmentRecord;

/// Records between two progress log lines.
pub const PROGRESS_INTERVAL: u64 = 10_000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallerStats {
    pub records: u64,
    pub spliced: u64,
    /// Candidates with a PAS hexamer upstream, before A-richness checks.
    pub pas: u64,
    pub true_sites: u64,
}

///
/// Output of one site calling run: every candidate position (raw) and the
/// subset passing the sequence context checks (true).
///
#[derive(Clone, Debug, Default)]
pub struct SiteCalls {
    pub raw: SiteTable,
    pub true_sites: SiteTable,
    pub stats: CallerStats,
}

///
/// Converts aligned reads of one sample into cleavage site tables.
///
pub struct SiteCaller<'a, S: SequenceSource> {
    genome: &'a S,
    protocol: Protocol,
    thresholds: Thresholds,
    umi_separator: Option<char>,
    calls: SiteCalls,
}

impl<'a, S: SequenceSource> SiteCaller<'a, S> {
    pub fn new(genome: &'a S, protocol: Protocol) -> Self {
        SiteCaller {
            genome,
            protocol,
            thresholds: Thresholds::for_protocol(protocol),
            umi_separator: None,
            calls: SiteCalls::default(),
        }
    }

    pub fn with_umi_separator(mut self, separator: Option<char>) -> Self {
        self.umi_separator = separator;
        self
    }

    ///
    /// Strand, cleavage position and 3' soft clip of a record.
    ///
    /// In the inverted protocol the read starts at the poly(A) end, so the
    /// position comes from the opposite alignment end and the strand is
    /// flipped afterwards.
    ///
    fn cleavage_site(&self, record: &AlignmentRecord) -> (Strand, u32, u32) {
        let last_base = record.end.saturating_sub(1);
        match (self.protocol, record.strand) {
            (Protocol::Standard, Strand::Forward) => {
                (Strand::Forward, last_base, record.trailing_soft_clip())
            }
            (Protocol::Standard, Strand::Reverse) => {
                (Strand::Reverse, record.start, record.leading_soft_clip())
            }
            (Protocol::Inverted, strand) => {
                let (pos, clip) = match strand {
                    Strand::Forward => (record.start, record.leading_soft_clip()),
                    Strand::Reverse => (last_base, record.trailing_soft_clip()),
                };
                (strand.flipped(), pos, clip)
            }
        }
    }

    fn is_true_site(
        &mut self,
        record: &AlignmentRecord,
        strand: Strand,
        pos: u32,
        clip: u32,
    ) -> Result<bool, SiteCallerError> {
        if let Some(min_clip) = self.thresholds.min_clip {
            if clip < min_clip {
                return Ok(false);
            }
        }

        let p = pos as i64;
        let (down_start, down_stop, up_start, up_stop) = match strand {
            Strand::Forward => (p + 1, p + DOWNSTREAM_WINDOW, p - UPSTREAM_WINDOW, p - 1),
            Strand::Reverse => (p - DOWNSTREAM_WINDOW, p - 1, p + 1, p + UPSTREAM_WINDOW),
        };

        let lookup = |start: i64, stop: i64| {
            self.genome
                .seq(&record.chr, strand, start, stop)
                .map_err(|source| SiteCallerError::SequenceError {
                    chr: record.chr.clone(),
                    pos,
                    read: record.name.clone(),
                    source,
                })
        };
        let upstream = lookup(up_start, up_stop)?;
        let downstream = lookup(down_start, down_stop)?;

        if find_pas(&upstream).is_none() {
            return Ok(false);
        }
        self.calls.stats.pas += 1;

        if downstream_a_rich(&downstream, &self.thresholds.downstream) {
            return Ok(false);
        }
        if let Some(rule) = &self.thresholds.upstream {
            if upstream_a_rich(&upstream, rule) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    ///
    /// Process a single mapped record.
    ///
    /// Spliced reads are ignored. Every other read adds its molecule to the
    /// raw table and, if its sequence context qualifies, to the true table.
    ///
    pub fn process(&mut self, record: &AlignmentRecord) -> Result<(), SiteCallerError> {
        self.calls.stats.records += 1;
        if record.is_spliced() {
            self.calls.stats.spliced += 1;
            return Ok(());
        }

        let (strand, pos, clip) = self.cleavage_site(record);
        let molecule = record.molecule_id(self.umi_separator);
        self.calls.raw.insert(&record.chr, strand, pos, molecule);

        if self.is_true_site(record, strand, pos, clip)? {
            self.calls.stats.true_sites += 1;
            self.calls.true_sites.insert(&record.chr, strand, pos, molecule);
        }
        Ok(())
    }

    ///
    /// Consume a record stream and return the site tables.
    ///
    /// # Arguments
    /// - records: mapped records of one sample
    /// - source: sample identifier used in progress messages
    pub fn run<I>(mut self, records: I, source: &str) -> Result<SiteCalls, SiteCallerError>
    where
        I: IntoIterator<Item = Result<AlignmentRecord, SiteCallerError>>,
    {
        for record in records {
            self.process(&record?)?;
            let stats = &self.calls.stats;
            if stats.records % PROGRESS_INTERVAL == 0 {
                log::info!(
                    "{}: {}K records processed, {} with PAS hexamer",
                    source,
                    stats.records / 1000,
                    stats.pas
                );
            }
        }

        let stats = &self.calls.stats;
        log::info!(
            "{}: done, {} records ({} spliced), {} raw / {} true positions",
            source,
            stats.records,
            stats.spliced,
            self.calls.raw.len(),
            self.calls.true_sites.len()
        );
        Ok(self.finish())
    }

    pub fn finish(self) -> SiteCalls {
        self.calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apa_core::models::Genome;
    use pretty_assertions::assert_eq;
    use rstest::*;

    use crate::record::{CigarKind, CigarOp};

    // GC background with a forward PAS upstream of 190 and a reverse PAS
    // (TTTATT on +) upstream of 20 on the minus strand.
    fn genome_with(edits: &[(usize, &[u8])]) -> Genome {
        let mut seq = "GC".repeat(100).into_bytes();
        for (at, bases) in edits {
            seq[*at..*at + bases.len()].copy_from_slice(bases);
        }
        Genome::from_iter([("chr1", seq)])
    }

    #[fixture]
    fn genome() -> Genome {
        genome_with(&[(170, b"AATAAA"), (30, b"TTTATT")])
    }

    fn read(strand: Strand, start: u32, end: u32, cigar: &[(CigarKind, u32)], name: &str) -> AlignmentRecord {
        AlignmentRecord {
            chr: "chr1".to_string(),
            strand,
            cigar: cigar.iter().map(|(k, l)| CigarOp::new(*k, *l)).collect(),
            start,
            end,
            name: name.to_string(),
        }
    }

    fn forward_read(name: &str) -> AlignmentRecord {
        read(
            Strand::Forward,
            140,
            191,
            &[(CigarKind::Match, 51), (CigarKind::SoftClip, 10)],
            name,
        )
    }

    fn reverse_read(name: &str) -> AlignmentRecord {
        read(
            Strand::Reverse,
            20,
            70,
            &[(CigarKind::SoftClip, 8), (CigarKind::Match, 50)],
            name,
        )
    }

    #[rstest]
    fn test_standard_positions(genome: Genome) {
        let mut caller = SiteCaller::new(&genome, Protocol::Standard);
        caller.process(&forward_read("r1")).unwrap();
        caller.process(&reverse_read("r2")).unwrap();
        let calls = caller.finish();

        assert_eq!(calls.raw.molecule_count("chr1", Strand::Forward, 190), 1);
        assert_eq!(calls.raw.molecule_count("chr1", Strand::Reverse, 20), 1);
        assert_eq!(calls.true_sites.molecule_count("chr1", Strand::Forward, 190), 1);
        assert_eq!(calls.true_sites.molecule_count("chr1", Strand::Reverse, 20), 1);
        assert_eq!(calls.stats.true_sites, 2);
    }

    #[rstest]
    fn test_inverted_positions(genome: Genome) {
        // reverse mapped read ending at 190 is a + site, forward one starting
        // at 20 is a - site
        let reverse = read(Strand::Reverse, 140, 191, &[(CigarKind::Match, 51)], "r1");
        let forward = read(Strand::Forward, 20, 70, &[(CigarKind::Match, 50)], "r2");

        let mut caller = SiteCaller::new(&genome, Protocol::Inverted);
        caller.process(&reverse).unwrap();
        caller.process(&forward).unwrap();
        let calls = caller.finish();

        assert_eq!(calls.raw.molecule_count("chr1", Strand::Forward, 190), 1);
        assert_eq!(calls.raw.molecule_count("chr1", Strand::Reverse, 20), 1);
        // no soft clip needed in this protocol
        assert_eq!(calls.true_sites.len(), 2);
    }

    #[rstest]
    fn test_spliced_reads_are_ignored(genome: Genome) {
        let spliced = read(
            Strand::Forward,
            100,
            191,
            &[(CigarKind::Match, 20), (CigarKind::Skip, 40), (CigarKind::Match, 31), (CigarKind::SoftClip, 10)],
            "r1",
        );
        let mut caller = SiteCaller::new(&genome, Protocol::Standard);
        caller.process(&spliced).unwrap();
        let calls = caller.finish();

        assert!(calls.raw.is_empty());
        assert!(calls.true_sites.is_empty());
        assert_eq!(calls.stats.spliced, 1);
    }

    #[rstest]
    fn test_missing_hexamer_is_not_true() {
        let genome = genome_with(&[]);
        let mut caller = SiteCaller::new(&genome, Protocol::Standard);
        caller.process(&forward_read("r1")).unwrap();
        let calls = caller.finish();

        assert_eq!(calls.raw.len(), 1);
        assert!(calls.true_sites.is_empty());
    }

    #[rstest]
    fn test_short_clip_is_not_true(genome: Genome) {
        let short = read(
            Strand::Forward,
            140,
            191,
            &[(CigarKind::Match, 51), (CigarKind::SoftClip, 5)],
            "r1",
        );
        let mut caller = SiteCaller::new(&genome, Protocol::Standard);
        caller.process(&short).unwrap();
        let calls = caller.finish();

        assert_eq!(calls.raw.len(), 1);
        assert!(calls.true_sites.is_empty());
    }

    #[rstest]
    #[case(Protocol::Standard, b"AAAA", false)]
    #[case(Protocol::Inverted, b"AAAA", true)]
    #[case(Protocol::Inverted, b"AAAAA", false)]
    fn test_downstream_a_stretch(#[case] protocol: Protocol, #[case] stretch: &[u8], #[case] is_true: bool) {
        let genome = genome_with(&[(170, b"AATAAA"), (191, stretch)]);
        // both protocols call + at 190: forward read in standard, reverse in inverted
        let strand = match protocol {
            Protocol::Standard => Strand::Forward,
            Protocol::Inverted => Strand::Reverse,
        };
        let record = read(strand, 140, 191, &[(CigarKind::Match, 51), (CigarKind::SoftClip, 10)], "r1");

        let mut caller = SiteCaller::new(&genome, protocol);
        caller.process(&record).unwrap();
        let calls = caller.finish();

        assert_eq!(calls.true_sites.molecule_count("chr1", Strand::Forward, 190), is_true as usize);
    }

    #[rstest]
    fn test_upstream_a_stretch_only_checked_in_standard() {
        let genome = genome_with(&[(170, b"AATAAA"), (186, b"AAAA")]);

        let mut standard = SiteCaller::new(&genome, Protocol::Standard);
        standard.process(&forward_read("r1")).unwrap();
        assert!(standard.finish().true_sites.is_empty());

        let reverse = read(Strand::Reverse, 140, 191, &[(CigarKind::Match, 51)], "r1");
        let mut inverted = SiteCaller::new(&genome, Protocol::Inverted);
        inverted.process(&reverse).unwrap();
        assert_eq!(inverted.finish().true_sites.len(), 1);
    }

    #[rstest]
    fn test_umi_deduplication(genome: Genome) {
        let mut caller = SiteCaller::new(&genome, Protocol::Standard).with_umi_separator(Some('_'));
        caller.process(&forward_read("read1_AACG")).unwrap();
        caller.process(&forward_read("read2_AACG")).unwrap();
        caller.process(&forward_read("read3_TTGC")).unwrap();
        let calls = caller.finish();

        assert_eq!(calls.raw.molecule_count("chr1", Strand::Forward, 190), 2);
        assert_eq!(calls.stats.records, 3);
    }

    #[rstest]
    fn test_run_propagates_errors(genome: Genome) {
        let records: Vec<Result<AlignmentRecord, SiteCallerError>> = vec![
            Ok(forward_read("r1")),
            Err(SiteCallerError::AlignmentReadError {
                path: "sample.bam".to_string(),
                message: "truncated".to_string(),
            }),
        ];
        let caller = SiteCaller::new(&genome, Protocol::Standard);
        assert!(caller.run(records, "lib1_e1").is_err());
    }

    #[rstest]
    fn test_unknown_chromosome_is_an_error(genome: Genome) {
        let mut record = forward_read("r1");
        record.chr = "chrM".to_string();
        let mut caller = SiteCaller::new(&genome, Protocol::Standard);
        assert!(matches!(
            caller.process(&record),
            Err(SiteCallerError::SequenceError { .. })
        ));
    }
}
