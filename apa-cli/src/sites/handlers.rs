use anyhow::{Context, Result};
use clap::ArgMatches;
use rayon::prelude::*;

use apa_core::models::Genome;
use apa_core::project::{Experiment, ExperimentId, Layout};
use apa_sites::{CallerStats, JobOutcome, SitesJob};

use crate::common::{experiments_by_genome, load_project, progress_bar, thread_pool};

fn call_sites(experiment: &Experiment, genome: &Genome, layout: &Layout, force: bool) -> Result<()> {
    let id: ExperimentId = experiment.id.parse()?;
    let mut job = SitesJob::new(id, experiment.method, layout);
    job.umi_separator = experiment.umi_separator;
    if let Some(bam) = &experiment.bam {
        job.bam = bam.clone();
    }

    match job
        .run(genome, force)
        .with_context(|| format!("Site calling failed for {}", experiment.id))?
    {
        JobOutcome::Completed(CallerStats {
            records,
            spliced,
            pas,
            true_sites,
        }) => log::info!(
            "{}: {} records ({} spliced), {} with PAS, {} true sites",
            experiment.id,
            records,
            spliced,
            pas,
            true_sites
        ),
        JobOutcome::Skipped => {}
    }
    Ok(())
}

pub fn run_sites(matches: &ArgMatches) -> Result<()> {
    let project = load_project(matches)?;
    let layout = project.layout();
    let force = matches.get_flag("force");
    let grouped = experiments_by_genome(&project, matches)?;
    let pool = thread_pool(matches)?;

    let pb = progress_bar(grouped.values().map(Vec::len).sum(), "calling sites")?;
    for experiments in grouped.values() {
        let genome_config = project.genome(experiments[0])?;
        let genome = Genome::from_fasta(&genome_config.fasta)
            .with_context(|| format!("Failed to load genome {}", genome_config.fasta.display()))?;

        pool.install(|| {
            experiments.par_iter().try_for_each(|experiment| {
                let result = call_sites(experiment, &genome, &layout, force);
                pb.inc(1);
                result
            })
        })?;
    }
    pb.finish_with_message("done");

    Ok(())
}
