use std::fmt::{self, Display};
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use apa_core::models::{CountTrack, Strand};
use apa_core::utils::{get_dynamic_reader, trim_line_end};

use crate::error::{ApaIoError, Result};

///
/// One row of an interval file: a single position with its count.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntervalRecord {
    pub chr: String,
    pub strand: Strand,
    pub start: u32,
    pub count: u64,
}

impl IntervalRecord {
    pub fn end(&self) -> u32 {
        self.start + 1
    }

    /// Count with the strand folded into its sign.
    ///
    /// A zero count has no sign and reads back as `+`. Site and expression
    /// tracks only hold positions with molecules, so this never applies to
    /// them.
    pub fn signed_count(&self) -> i64 {
        match self.strand {
            Strand::Forward => self.count as i64,
            Strand::Reverse => -(self.count as i64),
        }
    }
}

impl Display for IntervalRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.chr,
            self.start,
            self.end(),
            self.signed_count()
        )
    }
}

///
/// Flatten a track into interval rows: chromosome, then strand (`+` first),
/// then position ascending.
///
pub fn to_intervals(track: &CountTrack) -> Vec<IntervalRecord> {
    track
        .iter()
        .map(|(chr, strand, start, count)| IntervalRecord {
            chr: chr.to_string(),
            strand,
            start,
            count,
        })
        .collect()
}

///
/// Header line for the genome browser variant of an interval file.
///
pub fn track_header(name: &str, genome: Option<&str>) -> String {
    let mut header = format!(
        "track type=bedGraph name=\"{}\" description=\"{}\"",
        name, name
    );
    if let Some(genome) = genome {
        header.push_str(&format!(" db={}", genome));
    }
    header
}

fn emit<W: Write>(track: &CountTrack, header: Option<&str>, writer: &mut W) -> std::io::Result<()> {
    if let Some(header) = header {
        writeln!(writer, "{}", header)?;
    }
    for record in to_intervals(track) {
        writeln!(writer, "{}", record)?;
    }
    Ok(())
}

fn create_with_parents(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    File::create(path)
}

pub trait IntervalWrite {
    ///
    /// Write the track to disk as an interval file
    ///
    /// # Arguments
    /// - path: the path to the file to dump to
    fn write_intervals<T: AsRef<Path>>(&self, path: T) -> std::io::Result<()>;

    ///
    /// Write the track with a genome browser header line
    ///
    /// # Arguments
    /// - path: the path to the file to dump to
    /// - name: track name and description
    /// - genome: genome assembly for the `db=` attribute
    fn write_track<T: AsRef<Path>>(&self, path: T, name: &str, genome: Option<&str>) -> std::io::Result<()>;

    ///
    /// Append the track with its header line to an open writer, e.g. to
    /// collect several tracks in one browser file
    ///
    /// # Arguments
    /// - writer: destination
    /// - name: track name and description
    /// - genome: genome assembly for the `db=` attribute
    fn write_track_to<W: Write>(&self, writer: &mut W, name: &str, genome: Option<&str>) -> std::io::Result<()>;
}

impl IntervalWrite for CountTrack {
    fn write_intervals<T: AsRef<Path>>(&self, path: T) -> std::io::Result<()> {
        let mut writer = BufWriter::new(create_with_parents(path.as_ref())?);
        emit(self, None, &mut writer)?;
        writer.flush()
    }

    fn write_track<T: AsRef<Path>>(&self, path: T, name: &str, genome: Option<&str>) -> std::io::Result<()> {
        let mut writer = BufWriter::new(create_with_parents(path.as_ref())?);
        self.write_track_to(&mut writer, name, genome)?;
        writer.flush()
    }

    fn write_track_to<W: Write>(&self, writer: &mut W, name: &str, genome: Option<&str>) -> std::io::Result<()> {
        emit(self, Some(&track_header(name, genome)), writer)
    }
}

fn parse_count(raw: &str) -> Option<i64> {
    if raw == "." {
        return Some(0);
    }
    raw.parse::<i64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().map(|v| v.round() as i64))
}

fn parse_row(fields: &[&str]) -> std::result::Result<(Strand, u32, u64), String> {
    let start = fields[1]
        .parse::<u32>()
        .map_err(|_| format!("invalid start '{}'", fields[1]))?;

    // BED6 rows carry the strand explicitly and the count in the score column
    if fields.len() >= 6 && (fields[5] == "+" || fields[5] == "-") {
        let strand: Strand = fields[5].parse().map_err(|e| format!("{}", e))?;
        let count =
            parse_count(fields[4]).ok_or_else(|| format!("invalid score '{}'", fields[4]))?;
        return Ok((strand, start, count.unsigned_abs()));
    }

    let value = parse_count(fields[3]).ok_or_else(|| format!("invalid value '{}'", fields[3]))?;
    let strand = Strand::from_reverse_flag(value < 0 || fields[3].starts_with('-'));
    Ok((strand, start, value.unsigned_abs()))
}

///
/// Read an interval file (optionally gzipped) back into a track.
///
/// Rows are either `chr start end value` with the strand encoded in the sign
/// of value, or BED6 rows with an explicit strand column. `track`,
/// `browser` and `#` lines are skipped. Repeated positions are summed.
///
pub fn read_intervals(path: &Path) -> Result<CountTrack> {
    let reader = get_dynamic_reader(path)
        .map_err(|e| ApaIoError::FileReadError(format!("{}: {}", path.display(), e)))?;

    let mut track = CountTrack::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = trim_line_end(&line);
        if line.is_empty()
            || line.starts_with('#')
            || line.starts_with("track")
            || line.starts_with("browser")
        {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        let malformed = |message: String| ApaIoError::MalformedLine {
            path: path.display().to_string(),
            line: idx + 1,
            message,
        };
        if fields.len() < 4 {
            return Err(malformed(format!("expected at least 4 columns, found {}", fields.len())));
        }

        let (strand, start, count) = parse_row(&fields).map_err(malformed)?;
        track.add(fields[0], strand, start, count);
    }

    Ok(track)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn track() -> CountTrack {
        let mut track = CountTrack::new();
        track.add("chr1", Strand::Reverse, 50, 2);
        track.add("chr1", Strand::Forward, 200, 1);
        track.add("chr1", Strand::Forward, 100, 3);
        track.add("chr2", Strand::Forward, 7, 4);
        track
    }

    #[rstest]
    fn test_rows_are_sorted_and_signed(track: CountTrack) {
        let rows: Vec<String> = to_intervals(&track).iter().map(|r| r.to_string()).collect();
        assert_eq!(
            rows,
            vec![
                "chr1\t100\t101\t3",
                "chr1\t200\t201\t1",
                "chr1\t50\t51\t-2",
                "chr2\t7\t8\t4",
            ]
        );
    }

    #[rstest]
    fn test_zero_count_has_no_sign() {
        let record = IntervalRecord {
            chr: "chr1".to_string(),
            strand: Strand::Reverse,
            start: 5,
            count: 0,
        };
        assert_eq!(record.to_string(), "chr1\t5\t6\t0");
    }

    #[rstest]
    fn test_write_and_read(track: CountTrack) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/sample.R.bed");

        track.write_intervals(&path).unwrap();
        assert_eq!(read_intervals(&path).unwrap(), track);
    }

    #[rstest]
    fn test_read_gz(track: CountTrack) {
        use flate2::Compression;
        use flate2::write::GzEncoder;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polyadb.bed.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        emit(&track, None, &mut encoder).unwrap();
        encoder.finish().unwrap();

        assert_eq!(read_intervals(&path).unwrap(), track);
    }

    #[rstest]
    fn test_track_header_is_skipped_on_read(track: CountTrack) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.E.track.bed");

        track.write_track(&path, "lib1_e1", Some("hg38")).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            raw.lines().next().unwrap(),
            "track type=bedGraph name=\"lib1_e1\" description=\"lib1_e1\" db=hg38"
        );
        assert_eq!(read_intervals(&path).unwrap(), track);
    }

    #[rstest]
    fn test_read_bed6_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polyadb.bed");
        std::fs::write(
            &path,
            "# reference sites\nchr1\t100\t101\tpas1\t12\t+\nchr1\t300\t301\tpas2\t.\t-\n",
        )
        .unwrap();

        let track = read_intervals(&path).unwrap();
        assert_eq!(track.get("chr1", Strand::Forward, 100), 12);
        assert_eq!(track.len(), 2);
        assert!(track.positions("chr1", Strand::Reverse).unwrap().contains_key(&300));
    }

    #[rstest]
    #[case("chr1\t100\t101\n")]
    #[case("chr1\tx\t101\t3\n")]
    #[case("chr1\t100\t101\tmany\n")]
    fn test_malformed_rows(#[case] content: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.bed");
        std::fs::write(&path, content).unwrap();

        assert!(matches!(
            read_intervals(&path),
            Err(ApaIoError::MalformedLine { line: 1, .. })
        ));
    }

    #[rstest]
    fn test_missing_file() {
        assert!(matches!(
            read_intervals(Path::new("/nonexistent/sample.R.bed")),
            Err(ApaIoError::FileReadError(_))
        ));
    }
}
