use apa_core::models::Strand;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CigarKind {
    Match,
    Insertion,
    Deletion,
    /// Spliced gap (`N`).
    Skip,
    SoftClip,
    HardClip,
    Pad,
    SequenceMatch,
    SequenceMismatch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CigarOp {
    pub kind: CigarKind,
    pub len: u32,
}

impl CigarOp {
    pub fn new(kind: CigarKind, len: u32) -> Self {
        CigarOp { kind, len }
    }
}

///
/// A mapped read as seen by the site caller.
///
/// `start` is the 0-based first aligned reference base, `end` is one past
/// the last aligned reference base. `strand` is the mapping orientation.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlignmentRecord {
    pub chr: String,
    pub strand: Strand,
    pub cigar: Vec<CigarOp>,
    pub start: u32,
    pub end: u32,
    pub name: String,
}

fn soft_clip_len(op: Option<&CigarOp>) -> u32 {
    match op {
        Some(op) if op.kind == CigarKind::SoftClip => op.len,
        _ => 0,
    }
}

impl AlignmentRecord {
    pub fn is_spliced(&self) -> bool {
        self.cigar.iter().any(|op| op.kind == CigarKind::Skip)
    }

    /// Soft clip at the leftmost end of the alignment.
    pub fn leading_soft_clip(&self) -> u32 {
        soft_clip_len(self.cigar.first())
    }

    /// Soft clip at the rightmost end of the alignment.
    pub fn trailing_soft_clip(&self) -> u32 {
        soft_clip_len(self.cigar.last())
    }

    /// Molecule identifier: the barcode after the last `separator` in the
    /// read name, or the read name itself.
    pub fn molecule_id(&self, separator: Option<char>) -> &str {
        separator
            .and_then(|sep| self.name.rsplit_once(sep))
            .map(|(_, umi)| umi)
            .unwrap_or(self.name.as_str())
    }
}
