use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::aggregate::GeneTable;
use crate::config::Group;
use crate::errors::CompsError;

#[derive(Clone, Debug, PartialEq)]
pub struct DeRow {
    pub gene_id: String,
    pub log_fc: f64,
    pub p_value: f64,
    pub fdr: f64,
}

/// Per gene differential expression result.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeTable {
    pub rows: Vec<DeRow>,
}

impl DeTable {
    /// Genes with FDR below `threshold`.
    pub fn significant(&self, threshold: f64) -> usize {
        self.rows.iter().filter(|r| r.fdr < threshold).count()
    }

    ///
    /// Parse a tab separated result with `logFC`, `PValue` (or `P.Value`)
    /// and `FDR` (or `adj.P.Val`) columns.
    ///
    /// The gene id is taken from a `gene_id` column, or from a leading row
    /// name when rows carry one more field than the header, or else from
    /// the first column. `NA` parses as NaN.
    ///
    pub fn parse<R: BufRead>(reader: R, source: &str) -> Result<Self, CompsError> {
        let error = |message: String| CompsError::DeResultError {
            path: source.to_string(),
            message,
        };

        let mut lines = reader.lines();
        let header = match lines.next() {
            Some(line) => line?,
            None => return Ok(DeTable::default()),
        };
        let header: Vec<String> = header
            .trim_end()
            .split('\t')
            .map(|h| h.trim_matches('"').to_string())
            .collect();
        let column = |names: &[&str]| -> Result<usize, CompsError> {
            header
                .iter()
                .position(|h| names.contains(&h.as_str()))
                .ok_or_else(|| error(format!("missing column {}", names.join(" or "))))
        };
        let log_fc = column(&["logFC"])?;
        let p_value = column(&["PValue", "P.Value"])?;
        let fdr = column(&["FDR", "adj.P.Val"])?;
        let gene_id = header.iter().position(|h| h == "gene_id");

        let mut rows = Vec::new();
        for (idx, line) in lines.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let mut fields: Vec<&str> = line.trim_end().split('\t').map(|f| f.trim_matches('"')).collect();
            let row_name = if fields.len() == header.len() + 1 {
                Some(fields.remove(0).to_string())
            } else {
                None
            };
            if fields.len() != header.len() {
                return Err(error(format!(
                    "line {}: expected {} fields, found {}",
                    idx + 2,
                    header.len(),
                    fields.len()
                )));
            }

            let number = |i: usize| -> Result<f64, CompsError> {
                match fields[i] {
                    "NA" => Ok(f64::NAN),
                    value => value
                        .parse()
                        .map_err(|_| error(format!("line {}: invalid number '{}'", idx + 2, value))),
                }
            };
            rows.push(DeRow {
                gene_id: match (gene_id, row_name) {
                    (Some(i), _) => fields[i].to_string(),
                    (None, Some(name)) => name,
                    (None, None) => fields[0].to_string(),
                },
                log_fc: number(log_fc)?,
                p_value: number(p_value)?,
                fdr: number(fdr)?,
            });
        }
        Ok(DeTable { rows })
    }

    pub fn from_path(path: &Path) -> Result<Self, CompsError> {
        let reader = BufReader::new(File::open(path)?);
        Self::parse(reader, &path.display().to_string())
    }
}

///
/// Gene level differential expression between the control and test
/// replicates of a gene table.
///
pub trait DifferentialExpression {
    fn run(&self, table: &GeneTable) -> Result<DeTable, CompsError>;
}

///
/// Runs an R script as `Rscript <script> <input> <output> <n_control> <n_test>`.
///
/// The gene table is written to `input`, the script is expected to leave
/// its result in `output`.
///
#[derive(Clone, Debug)]
pub struct RScriptService {
    pub program: String,
    pub script: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
}

impl RScriptService {
    pub fn new(script: &Path, input: &Path, output: &Path) -> Self {
        RScriptService {
            program: "Rscript".to_string(),
            script: script.to_path_buf(),
            input: input.to_path_buf(),
            output: output.to_path_buf(),
        }
    }

    /// Use another interpreter than `Rscript`.
    pub fn with_program(mut self, program: &str) -> Self {
        self.program = program.to_string();
        self
    }
}

impl DifferentialExpression for RScriptService {
    fn run(&self, table: &GeneTable) -> Result<DeTable, CompsError> {
        let mut writer = BufWriter::new(File::create(&self.input)?);
        table.write(&mut writer)?;
        writer.flush()?;

        let n_control = table.count_in(Group::Control).to_string();
        let n_test = table.count_in(Group::Test).to_string();
        let mut command = Command::new(&self.program);
        command
            .arg(&self.script)
            .arg(&self.input)
            .arg(&self.output)
            .arg(&n_control)
            .arg(&n_test);

        let rendered = format!(
            "{} {} {} {} {} {}",
            self.program,
            self.script.display(),
            self.input.display(),
            self.output.display(),
            n_control,
            n_test
        );
        log::info!("Running {}", rendered);

        let status = command.status()?;
        if !status.success() {
            return Err(CompsError::ExternalTool {
                command: rendered,
                status: status.to_string(),
            });
        }

        DeTable::from_path(&self.output)
    }
}
