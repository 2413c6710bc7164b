use std::path::{Path, PathBuf};

use apa_core::models::{CountTrack, ExpressionTable, ReferenceSites, SequenceSource};
use apa_core::project::{ExperimentId, Layout, Protocol};
use apa_io::{IntervalWrite, RunStatus, StatusMarker, read_intervals};

use crate::bam::BamAlignments;
use crate::caller::{CallerStats, SiteCaller};
use crate::errors::SiteCallerError;
use crate::record::AlignmentRecord;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobOutcome<T> {
    Skipped,
    Completed(T),
}

///
/// Decide whether a job should run and claim it if so.
///
/// Without `force` a job whose marker says in progress is skipped. A done
/// job is skipped only while all of its artifacts exist; otherwise it is
/// released and claimed again. A job without marker whose artifacts are all
/// present is skipped too (data from before markers existed).
///
fn claim(marker: &StatusMarker, artifacts: &[&Path], force: bool, name: &str) -> Result<bool, SiteCallerError> {
    if !force {
        let complete = artifacts.iter().all(|p| p.exists());
        match marker.status()? {
            RunStatus::Done if complete => {
                log::info!("{}: already processed, skipping", name);
                return Ok(false);
            }
            RunStatus::Done => {
                log::warn!("{}: marked done but artifacts are missing, processing again", name);
                marker.clear()?;
            }
            RunStatus::InProgress => {
                log::warn!(
                    "{}: in progress or crashed earlier ({}), skipping; force to rerun",
                    name,
                    marker.path().display()
                );
                return Ok(false);
            }
            RunStatus::NotStarted if complete => {
                log::info!("{}: artifacts present, skipping", name);
                return Ok(false);
            }
            RunStatus::NotStarted => {}
        }
    }
    Ok(marker.claim(force)?)
}

/// Run `work` under the marker, leaving it done on success and removing it
/// on failure.
fn guarded<T, F>(marker: &StatusMarker, work: F) -> Result<T, SiteCallerError>
where
    F: FnOnce() -> Result<T, SiteCallerError>,
{
    match work() {
        Ok(value) => {
            marker.mark_done()?;
            Ok(value)
        }
        Err(e) => {
            marker.clear()?;
            Err(e)
        }
    }
}

///
/// Site calling for one experiment: alignments in, raw and true interval
/// files out.
///
#[derive(Clone, Debug)]
pub struct SitesJob {
    pub id: ExperimentId,
    pub protocol: Protocol,
    pub umi_separator: Option<char>,
    pub bam: PathBuf,
    pub r_path: PathBuf,
    pub t_path: PathBuf,
    pub status: PathBuf,
}

impl SitesJob {
    pub fn new(id: ExperimentId, protocol: Protocol, layout: &Layout) -> Self {
        SitesJob {
            protocol,
            umi_separator: None,
            bam: layout.bam_path(&id),
            r_path: layout.r_path(&id),
            t_path: layout.t_path(&id),
            status: layout.sites_status_path(&id),
            id,
        }
    }

    fn claim(&self, force: bool) -> Result<Option<StatusMarker>, SiteCallerError> {
        let marker = StatusMarker::new(&self.status);
        let claimed = claim(&marker, &[self.r_path.as_path(), self.t_path.as_path()], force, &self.id.to_string())?;
        Ok(claimed.then_some(marker))
    }

    fn call<S, I>(&self, genome: &S, records: I) -> Result<JobOutcome<CallerStats>, SiteCallerError>
    where
        S: SequenceSource,
        I: IntoIterator<Item = Result<AlignmentRecord, SiteCallerError>>,
    {
        let calls = SiteCaller::new(genome, self.protocol)
            .with_umi_separator(self.umi_separator)
            .run(records, &self.id.to_string())?;
        calls.raw.to_counts().write_intervals(&self.r_path)?;
        calls.true_sites.to_counts().write_intervals(&self.t_path)?;
        Ok(JobOutcome::Completed(calls.stats))
    }

    /// Run on an arbitrary record stream.
    pub fn run_records<S, I>(&self, genome: &S, records: I, force: bool) -> Result<JobOutcome<CallerStats>, SiteCallerError>
    where
        S: SequenceSource,
        I: IntoIterator<Item = Result<AlignmentRecord, SiteCallerError>>,
    {
        match self.claim(force)? {
            Some(marker) => guarded(&marker, || self.call(genome, records)),
            None => Ok(JobOutcome::Skipped),
        }
    }

    /// Run on the experiment's BAM file.
    pub fn run<S: SequenceSource>(&self, genome: &S, force: bool) -> Result<JobOutcome<CallerStats>, SiteCallerError> {
        match self.claim(force)? {
            Some(marker) => guarded(&marker, || {
                let records = BamAlignments::open(&self.bam)?;
                self.call(genome, records)
            }),
            None => Ok(JobOutcome::Skipped),
        }
    }
}

///
/// Expression overlay for one experiment: raw sites onto the reference
/// poly(A) positions of its genome.
///
#[derive(Clone, Debug)]
pub struct ExpressionJob {
    pub id: ExperimentId,
    pub genome: String,
    pub r_path: PathBuf,
    pub e_path: PathBuf,
    pub e_track_path: PathBuf,
    pub status: PathBuf,
    pub region_up: u32,
    pub region_down: u32,
}

impl ExpressionJob {
    pub fn new(id: ExperimentId, genome: &str, layout: &Layout, region_up: u32, region_down: u32) -> Self {
        ExpressionJob {
            genome: genome.to_string(),
            r_path: layout.r_path(&id),
            e_path: layout.e_path(&id),
            e_track_path: layout.e_track_path(&id),
            status: layout.expression_status_path(&id),
            region_up,
            region_down,
            id,
        }
    }

    pub fn run(&self, reference: &ReferenceSites, force: bool) -> Result<JobOutcome<CountTrack>, SiteCallerError> {
        let marker = StatusMarker::new(&self.status);
        let name = self.id.to_string();
        let artifacts = [self.e_path.as_path(), self.e_track_path.as_path()];
        if !claim(&marker, &artifacts, force, &name)? {
            return Ok(JobOutcome::Skipped);
        }

        guarded(&marker, || {
            let raw = read_intervals(&self.r_path)?;
            let mut expression = ExpressionTable::new();
            let stats = expression.overlay(reference, &raw, self.region_up, self.region_down);
            log::info!(
                "{}: {} cDNA assigned to reference sites, {} dropped",
                name,
                stats.assigned,
                stats.dropped
            );

            let track = expression.into_track();
            track.write_intervals(&self.e_path)?;
            track.write_track(&self.e_track_path, &name, Some(&self.genome))?;
            Ok(JobOutcome::Completed(track))
        })
    }
}

/// Load the reference poly(A) positions of a genome.
pub fn load_reference(path: &Path) -> Result<ReferenceSites, SiteCallerError> {
    let track = read_intervals(path)?;
    log::info!("Loaded {} reference sites from {}", track.len(), path.display());
    Ok(ReferenceSites::from(&track))
}
