use std::collections::HashMap;
use std::fmt::{self, Display};
use std::io::BufRead;
use std::path::Path;

use apa_core::models::Strand;
use apa_core::utils::{get_dynamic_reader, trim_line_end};

use crate::errors::CompsError;

///
/// A gene with its exons. Coordinates are 0-based, half-open.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Gene {
    pub gene_id: String,
    pub gene_name: String,
    pub gene_biotype: String,
    pub chr: String,
    pub strand: Strand,
    pub start: u32,
    pub stop: u32,
    pub exons: Vec<(u32, u32)>,
}

impl Gene {
    pub fn contains(&self, pos: u32) -> bool {
        self.start <= pos && pos < self.stop
    }

    /// Index of the (merged) exon containing `pos`.
    pub fn exon_index(&self, pos: u32) -> Option<usize> {
        self.exons.iter().position(|&(s, e)| s <= pos && pos < e)
    }

    /// `chr<chr>:<start>-<stop>`, without doubling an existing `chr` prefix.
    pub fn locus(&self) -> String {
        let chr = self.chr.strip_prefix("chr").unwrap_or(&self.chr);
        format!("chr{}:{}-{}", chr, self.start, self.stop)
    }
}

/// Spatial relation of two sites within one gene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PairType {
    /// Both sites in the same exon.
    Tandem,
    /// Exactly one site in an exon.
    Composite,
    /// Sites in two different exons.
    Skipped,
    /// Neither site in an exon.
    Intronic,
}

impl PairType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PairType::Tandem => "tandem",
            PairType::Composite => "composite",
            PairType::Skipped => "skipped",
            PairType::Intronic => "intronic",
        }
    }

    pub fn classify(gene: &Gene, a: u32, b: u32) -> PairType {
        match (gene.exon_index(a), gene.exon_index(b)) {
            (Some(x), Some(y)) if x == y => PairType::Tandem,
            (Some(_), Some(_)) => PairType::Skipped,
            (Some(_), None) | (None, Some(_)) => PairType::Composite,
            (None, None) => PairType::Intronic,
        }
    }
}

impl Display for PairType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

///
/// Gene membership of genomic positions.
///
pub trait LocusAnnotation {
    /// Gene enclosing the position on the given strand.
    fn gene_at(&self, chr: &str, strand: Strand, pos: u32) -> Option<&Gene>;

    fn gene(&self, gene_id: &str) -> Option<&Gene>;

    /// Classify a pair of sites of `gene`.
    fn pair_type(&self, gene: &Gene, proximal: u32, distal: u32) -> PairType {
        PairType::classify(gene, proximal, distal)
    }
}

///
/// Gene annotation loaded from a GTF file.
///
#[derive(Clone, Debug, Default)]
pub struct GtfAnnotation {
    genes: HashMap<String, Gene>,
    // gene ids per chromosome and strand, ordered by gene start
    index: HashMap<(String, Strand), Vec<(u32, u32, String)>>,
    // longest gene per chromosome and strand, bounds the backward scan
    max_len: HashMap<(String, Strand), u32>,
}

/// Extract `key "VALUE"` from a GTF attributes string (column 9).
fn gtf_attribute<'a>(attrs: &'a str, key: &str) -> Option<&'a str> {
    let marker = format!("{} \"", key);
    let start = attrs.find(&marker)? + marker.len();
    let end = start + attrs[start..].find('"')?;
    Some(&attrs[start..end])
}

fn merge_intervals(mut intervals: Vec<(u32, u32)>) -> Vec<(u32, u32)> {
    intervals.sort_unstable();
    let mut merged: Vec<(u32, u32)> = Vec::with_capacity(intervals.len());
    for (start, end) in intervals {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

impl GtfAnnotation {
    pub fn from_path(path: &Path) -> Result<Self, CompsError> {
        let reader = get_dynamic_reader(path).map_err(|e| CompsError::AnnotationParseError {
            path: path.display().to_string(),
            line: 0,
            message: e.to_string(),
        })?;
        let annotation = Self::from_reader(reader, &path.display().to_string())?;
        log::info!("Loaded {} genes from {}", annotation.len(), path.display());
        Ok(annotation)
    }

    ///
    /// Read `gene` and `exon` features of a GTF.
    ///
    /// Exons of all transcripts of a gene are merged. A gene without its own
    /// `gene` line spans its exons.
    ///
    pub fn from_reader<R: BufRead>(reader: R, source: &str) -> Result<Self, CompsError> {
        let mut genes: HashMap<String, Gene> = HashMap::new();
        let mut exons: HashMap<String, Vec<(u32, u32)>> = HashMap::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = trim_line_end(&line);
            if line.starts_with('#') || line.is_empty() {
                continue;
            }

            let error = |message: String| CompsError::AnnotationParseError {
                path: source.to_string(),
                line: idx + 1,
                message,
            };

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 9 {
                return Err(error(format!("expected 9 columns, found {}", fields.len())));
            }

            let feature_type = fields[2];
            if feature_type != "gene" && feature_type != "exon" {
                continue;
            }

            // GTF is 1-based inclusive
            let start = fields[3]
                .parse::<u32>()
                .map_err(|e| error(format!("parsing start: {}", e)))?
                .saturating_sub(1);
            let end = fields[4]
                .parse::<u32>()
                .map_err(|e| error(format!("parsing end: {}", e)))?;
            let strand: Strand = fields[6].parse().map_err(|e| error(format!("{}", e)))?;

            let attrs = fields[8];
            let gene_id = gtf_attribute(attrs, "gene_id")
                .ok_or_else(|| error("missing gene_id".to_string()))?;

            let gene = genes.entry(gene_id.to_string()).or_insert_with(|| Gene {
                gene_id: gene_id.to_string(),
                gene_name: gtf_attribute(attrs, "gene_name").unwrap_or(gene_id).to_string(),
                gene_biotype: gtf_attribute(attrs, "gene_biotype")
                    .or_else(|| gtf_attribute(attrs, "gene_type"))
                    .unwrap_or("")
                    .to_string(),
                chr: fields[0].to_string(),
                strand,
                start,
                stop: end,
                exons: Vec::new(),
            });

            match feature_type {
                "gene" => {
                    gene.start = start;
                    gene.stop = end;
                }
                _ => {
                    gene.start = gene.start.min(start);
                    gene.stop = gene.stop.max(end);
                    exons.entry(gene_id.to_string()).or_default().push((start, end));
                }
            }
        }

        for (gene_id, gene_exons) in exons {
            if let Some(gene) = genes.get_mut(&gene_id) {
                gene.exons = merge_intervals(gene_exons);
            }
        }

        Ok(GtfAnnotation::from_genes(genes.into_values()))
    }

    pub fn from_genes<I: IntoIterator<Item = Gene>>(genes: I) -> Self {
        let mut annotation = GtfAnnotation::default();
        for gene in genes {
            let key = (gene.chr.clone(), gene.strand);
            annotation
                .index
                .entry(key.clone())
                .or_default()
                .push((gene.start, gene.stop, gene.gene_id.clone()));
            let longest = annotation.max_len.entry(key).or_insert(0);
            *longest = (*longest).max(gene.stop.saturating_sub(gene.start));
            annotation.genes.insert(gene.gene_id.clone(), gene);
        }
        for entries in annotation.index.values_mut() {
            entries.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.2.cmp(&b.2)));
        }
        annotation
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

impl LocusAnnotation for GtfAnnotation {
    ///
    /// Of several genes overlapping the position, the one starting first
    /// (then lowest gene id) is returned.
    ///
    fn gene_at(&self, chr: &str, strand: Strand, pos: u32) -> Option<&Gene> {
        let key = (chr.to_string(), strand);
        let entries = self.index.get(&key)?;
        let longest = self.max_len.get(&key).copied().unwrap_or(0);

        let lowest_start = pos.saturating_sub(longest);
        let first = entries.partition_point(|(start, _, _)| *start < lowest_start);
        entries[first..]
            .iter()
            .take_while(|(start, _, _)| *start <= pos)
            .find(|(start, stop, _)| *start <= pos && pos < *stop)
            .and_then(|(_, _, gene_id)| self.genes.get(gene_id))
    }

    fn gene(&self, gene_id: &str) -> Option<&Gene> {
        self.genes.get(gene_id)
    }
}
