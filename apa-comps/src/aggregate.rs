use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use apa_core::models::{CountTrack, Strand};

use crate::annotation::{Gene, LocusAnnotation};
use crate::config::{Group, Replicate, Thresholds};

/// A column of the matrix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplicateColumn {
    pub id: String,
    pub long_name: String,
    pub group: Group,
}

impl From<&Replicate> for ReplicateColumn {
    fn from(replicate: &Replicate) -> Self {
        ReplicateColumn {
            id: replicate.id.clone(),
            long_name: replicate.long_name(),
            group: replicate.group(),
        }
    }
}

/// Counts of one site across replicates, in column order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SiteExpression {
    pub pos: u32,
    pub counts: Vec<u64>,
    pub cdna_sum: u64,
}

impl SiteExpression {
    /// Counts of the replicates in `group`, in column order.
    pub fn group_counts(&self, columns: &[ReplicateColumn], group: Group) -> Vec<u64> {
        columns
            .iter()
            .zip(self.counts.iter())
            .filter(|(column, _)| column.group == group)
            .map(|(_, count)| *count)
            .collect()
    }
}

#[derive(Clone, Debug)]
pub struct GeneSites {
    pub gene: Gene,
    pub sites: BTreeMap<u32, SiteExpression>,
}

impl GeneSites {
    /// Per replicate totals over all sites of the gene.
    pub fn totals(&self, n_columns: usize) -> Vec<u64> {
        let mut totals = vec![0; n_columns];
        for site in self.sites.values() {
            for (total, count) in totals.iter_mut().zip(site.counts.iter()) {
                *total += count;
            }
        }
        totals
    }

    pub fn cdna_sum(&self) -> u64 {
        self.sites.values().map(|s| s.cdna_sum).sum()
    }
}

fn gene_columns(gene: &Gene) -> [String; 6] {
    [
        gene.chr.clone(),
        gene.strand.to_string(),
        gene.locus(),
        gene.gene_id.clone(),
        gene.gene_name.clone(),
        gene.gene_biotype.clone(),
    ]
}

#[derive(Clone, Debug, PartialEq)]
pub struct GeneRow {
    pub gene: Gene,
    /// (position, cDNA) of every kept site.
    pub sites: Vec<(u32, u64)>,
    /// Per replicate totals, in column order.
    pub totals: Vec<u64>,
}

impl GeneRow {
    pub fn cdna_sum(&self) -> u64 {
        self.totals.iter().sum()
    }
}

///
/// Gene level expression: one row per gene with per replicate totals.
///
#[derive(Clone, Debug, PartialEq)]
pub struct GeneTable {
    pub columns: Vec<ReplicateColumn>,
    pub rows: Vec<GeneRow>,
}

impl GeneTable {
    pub fn count_in(&self, group: Group) -> usize {
        self.columns.iter().filter(|c| c.group == group).count()
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut header: Vec<String> = [
            "chr", "strand", "gene_locus", "gene_id", "gene_name", "gene_biotype",
            "sites_position_cDNA", "sites_num", "cDNA_sum",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        header.extend(self.columns.iter().map(|c| c.long_name.clone()));
        writeln!(writer, "{}", header.join("\t"))?;

        for row in &self.rows {
            let mut fields: Vec<String> = gene_columns(&row.gene).to_vec();
            fields.push(
                row.sites
                    .iter()
                    .map(|(pos, count)| format!("{}:{}", pos, count))
                    .collect::<Vec<_>>()
                    .join(";"),
            );
            fields.push(row.sites.len().to_string());
            fields.push(row.cdna_sum().to_string());
            fields.extend(row.totals.iter().map(|c| c.to_string()));
            writeln!(writer, "{}", fields.join("\t"))?;
        }
        Ok(())
    }
}

///
/// Site expression of all replicates grouped by gene.
///
#[derive(Clone, Debug)]
pub struct GeneSiteMatrix {
    columns: Vec<ReplicateColumn>,
    genes: BTreeMap<String, GeneSites>,
}

/// Whether enough replicates express a site: `expressed >= n / presence_thr`.
pub fn passes_presence(counts: &[u64], thresholds: &Thresholds) -> bool {
    let expressed = counts.iter().filter(|&&c| c >= thresholds.cdna_thr).count();
    expressed as f64 >= counts.len() as f64 / thresholds.presence_thr
}

impl GeneSiteMatrix {
    ///
    /// Build the matrix from one expression track per replicate.
    ///
    /// Every position covered by any replicate is looked up in the
    /// annotation; positions outside genes and positions failing the
    /// presence filter are dropped.
    ///
    /// # Arguments
    /// - columns: replicate columns, parallel to `expression`
    /// - expression: expression track of each replicate
    /// - annotation: gene membership of positions
    /// - thresholds: presence filter settings
    pub fn build<A: LocusAnnotation>(
        columns: Vec<ReplicateColumn>,
        expression: &[CountTrack],
        annotation: &A,
        thresholds: &Thresholds,
    ) -> Self {
        let mut positions: BTreeSet<(&str, Strand, u32)> = BTreeSet::new();
        for track in expression {
            positions.extend(track.iter().map(|(chr, strand, pos, _)| (chr, strand, pos)));
        }

        let mut genes: BTreeMap<String, GeneSites> = BTreeMap::new();
        let mut outside = 0usize;
        let mut filtered = 0usize;
        for (chr, strand, pos) in positions {
            let Some(gene) = annotation.gene_at(chr, strand, pos) else {
                outside += 1;
                continue;
            };

            let counts: Vec<u64> = expression.iter().map(|t| t.get(chr, strand, pos)).collect();
            if !passes_presence(&counts, thresholds) {
                filtered += 1;
                continue;
            }

            let cdna_sum = counts.iter().sum();
            genes
                .entry(gene.gene_id.clone())
                .or_insert_with(|| GeneSites {
                    gene: gene.clone(),
                    sites: BTreeMap::new(),
                })
                .sites
                .insert(pos, SiteExpression { pos, counts, cdna_sum });
        }

        log::info!(
            "{} genes with expressed sites ({} positions outside genes, {} below presence threshold)",
            genes.len(),
            outside,
            filtered
        );
        GeneSiteMatrix { columns, genes }
    }

    pub fn columns(&self) -> &[ReplicateColumn] {
        &self.columns
    }

    pub fn genes(&self) -> impl Iterator<Item = &GeneSites> {
        self.genes.values()
    }

    #[cfg(test)]
    fn gene(&self, gene_id: &str) -> Option<&GeneSites> {
        self.genes.get(gene_id)
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Per gene totals, the input of differential expression.
    pub fn gene_table(&self) -> GeneTable {
        GeneTable {
            columns: self.columns.clone(),
            rows: self
                .genes
                .values()
                .map(|g| GeneRow {
                    gene: g.gene.clone(),
                    sites: g.sites.values().map(|s| (s.pos, s.cdna_sum)).collect(),
                    totals: g.totals(self.columns.len()),
                })
                .collect(),
        }
    }

    ///
    /// Site level table: one row per gene and site.
    ///
    pub fn write_site_table<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut header: Vec<String> = [
            "chr", "strand", "gene_locus", "gene_id", "gene_name", "gene_biotype", "site_pos",
            "cDNA_sum",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        header.extend(self.columns.iter().map(|c| c.long_name.clone()));
        writeln!(writer, "{}", header.join("\t"))?;

        for gene_sites in self.genes.values() {
            let gene = gene_columns(&gene_sites.gene);
            for site in gene_sites.sites.values() {
                let mut row: Vec<String> = gene.to_vec();
                row.push(site.pos.to_string());
                row.push(site.cdna_sum.to_string());
                row.extend(site.counts.iter().map(|c| c.to_string()));
                writeln!(writer, "{}", row.join("\t"))?;
            }
        }
        Ok(())
    }
}
