use std::collections::HashMap;
use std::path::Path;

use bio::alphabets::dna::revcomp;
use bio::io::fasta;

use crate::errors::ApaCoreError;
use crate::models::Strand;
use crate::utils::get_dynamic_reader;

///
/// Strand-aware access to a reference genome.
///
/// Coordinates are 0-based and inclusive on both ends. For the reverse
/// strand the reverse complement is returned, so the string always reads in
/// transcription direction. Windows running off a chromosome are clipped.
///
pub trait SequenceSource {
    fn seq(&self, chr: &str, strand: Strand, start: i64, stop: i64) -> Result<String, ApaCoreError>;
}

/// Whole-genome sequences held in memory, upper-cased.
pub struct Genome {
    seq_map: HashMap<String, Vec<u8>>,
}

impl Genome {
    ///
    /// Load a genome from a (optionally gzipped) fasta file.
    ///
    pub fn from_fasta(path: &Path) -> Result<Genome, ApaCoreError> {
        let reader = get_dynamic_reader(path)
            .map_err(|e| ApaCoreError::GenomeReadError(format!("{}: {}", path.display(), e)))?;
        let genome = fasta::Reader::new(reader);

        let mut seq_map: HashMap<String, Vec<u8>> = HashMap::new();
        for record in genome.records() {
            match record {
                Ok(record) => {
                    seq_map.insert(record.id().to_string(), record.seq().to_ascii_uppercase());
                }
                Err(e) => {
                    return Err(ApaCoreError::GenomeReadError(format!(
                        "{}: {}",
                        path.display(),
                        e
                    )));
                }
            }
        }

        log::info!("Loaded genome {} ({} sequences)", path.display(), seq_map.len());
        Ok(Genome { seq_map })
    }
}

impl<S: Into<String>, T: AsRef<[u8]>> FromIterator<(S, T)> for Genome {
    fn from_iter<I: IntoIterator<Item = (S, T)>>(iter: I) -> Self {
        let seq_map = iter
            .into_iter()
            .map(|(chr, seq)| (chr.into(), seq.as_ref().to_ascii_uppercase()))
            .collect();
        Genome { seq_map }
    }
}

impl SequenceSource for Genome {
    fn seq(&self, chr: &str, strand: Strand, start: i64, stop: i64) -> Result<String, ApaCoreError> {
        let seq = self
            .seq_map
            .get(chr)
            .ok_or_else(|| ApaCoreError::UnknownChromosome(chr.to_string()))?;

        let start = start.max(0);
        let stop = stop.min(seq.len() as i64 - 1);
        if stop < start {
            return Ok(String::new());
        }

        let slice = &seq[start as usize..=stop as usize];
        let bytes = match strand {
            Strand::Forward => slice.to_vec(),
            Strand::Reverse => revcomp(slice),
        };
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
