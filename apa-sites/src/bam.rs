use std::fs::File;
use std::path::{Path, PathBuf};

use noodles::bam;
use noodles::bgzf;
use noodles::sam;
use noodles::sam::alignment::Record as _;
use noodles::sam::alignment::record::cigar::op::Kind;

use apa_core::models::Strand;

use crate::errors::SiteCallerError;
use crate::record::{AlignmentRecord, CigarKind, CigarOp};

fn cigar_kind(kind: Kind) -> CigarKind {
    match kind {
        Kind::Match => CigarKind::Match,
        Kind::Insertion => CigarKind::Insertion,
        Kind::Deletion => CigarKind::Deletion,
        Kind::Skip => CigarKind::Skip,
        Kind::SoftClip => CigarKind::SoftClip,
        Kind::HardClip => CigarKind::HardClip,
        Kind::Pad => CigarKind::Pad,
        Kind::SequenceMatch => CigarKind::SequenceMatch,
        Kind::SequenceMismatch => CigarKind::SequenceMismatch,
    }
}

///
/// Streams mapped records of a BAM file as [`AlignmentRecord`]s.
///
/// Unmapped records and records without a reference or alignment start are
/// skipped.
///
pub struct BamAlignments {
    reader: bam::io::Reader<bgzf::Reader<File>>,
    header: sam::Header,
    record: bam::Record,
    path: PathBuf,
}

impl BamAlignments {
    pub fn open(path: &Path) -> Result<Self, SiteCallerError> {
        let read_error = |message: String| SiteCallerError::AlignmentReadError {
            path: path.display().to_string(),
            message,
        };

        let file = File::open(path).map_err(|e| read_error(e.to_string()))?;
        let mut reader = bam::io::reader::Builder::default().build_from_reader(file);
        let header = reader
            .read_header()
            .map_err(|e| read_error(format!("failed to read header: {}", e)))?;

        Ok(BamAlignments {
            reader,
            header,
            record: bam::Record::default(),
            path: path.to_path_buf(),
        })
    }

    fn read_error(&self, message: String) -> SiteCallerError {
        SiteCallerError::AlignmentReadError {
            path: self.path.display().to_string(),
            message,
        }
    }

    fn convert(&self) -> Result<Option<AlignmentRecord>, SiteCallerError> {
        let record = &self.record;
        let flags = record.flags();
        if flags.is_unmapped() {
            return Ok(None);
        }

        let chr = match record.reference_sequence_id() {
            Some(Ok(idx)) => match self.header.reference_sequences().get_index(idx) {
                Some((name, _)) => name.to_string(),
                None => return Err(self.read_error(format!("unknown reference id {}", idx))),
            },
            Some(Err(e)) => return Err(self.read_error(e.to_string())),
            None => return Ok(None),
        };

        let start = match record.alignment_start() {
            Some(Ok(pos)) => pos.get() - 1,
            Some(Err(e)) => return Err(self.read_error(e.to_string())),
            None => return Ok(None),
        };
        let span = match record.alignment_span() {
            Some(Ok(span)) => span,
            Some(Err(e)) => return Err(self.read_error(e.to_string())),
            None => return Ok(None),
        };

        let mut cigar = Vec::new();
        for op in record.cigar().iter() {
            let op = op.map_err(|e| self.read_error(e.to_string()))?;
            cigar.push(CigarOp::new(cigar_kind(op.kind()), op.len() as u32));
        }

        let name = record.name().map(|n| n.to_string()).unwrap_or_default();

        Ok(Some(AlignmentRecord {
            chr,
            strand: Strand::from_reverse_flag(flags.is_reverse_complemented()),
            cigar,
            start: start as u32,
            end: (start + span) as u32,
            name,
        }))
    }
}

impl Iterator for BamAlignments {
    type Item = Result<AlignmentRecord, SiteCallerError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.reader.read_record(&mut self.record) {
                // end of file
                Ok(0) => return None,
                Ok(_) => match self.convert() {
                    Ok(Some(record)) => return Some(Ok(record)),
                    Ok(None) => continue,
                    Err(e) => return Some(Err(e)),
                },
                Err(e) => return Some(Err(self.read_error(e.to_string()))),
            }
        }
    }
}
