use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ArgMatches;
use rayon::prelude::*;

use apa_core::models::ReferenceSites;
use apa_core::project::{Experiment, ExperimentId, Layout};
use apa_sites::{ExpressionJob, JobOutcome, load_reference};

use crate::common::{experiments_by_genome, load_project, progress_bar, thread_pool};

struct Overlay<'a> {
    genome: &'a str,
    reference: &'a ReferenceSites,
    layout: &'a Layout,
    up: u32,
    down: u32,
    force: bool,
}

impl Overlay<'_> {
    fn run(&self, experiment: &Experiment) -> Result<()> {
        let id: ExperimentId = experiment.id.parse()?;
        let job = ExpressionJob::new(id, self.genome, self.layout, self.up, self.down);
        if let JobOutcome::Completed(track) = job
            .run(self.reference, self.force)
            .with_context(|| format!("Expression overlay failed for {}", experiment.id))?
        {
            log::info!(
                "{}: {} cDNA at {} reference sites",
                experiment.id,
                track.total(),
                track.len()
            );
        }
        Ok(())
    }
}

pub fn run_expression(matches: &ArgMatches) -> Result<()> {
    let project = load_project(matches)?;
    let layout = project.layout();
    let force = matches.get_flag("force");
    let up = *matches.get_one::<u32>("up").expect("up has a default");
    let down = *matches.get_one::<u32>("down").expect("down has a default");
    let polyid = matches.get_one::<String>("polyid").map(String::as_str);
    let grouped = experiments_by_genome(&project, matches)?;
    let pool = thread_pool(matches)?;

    let pb = progress_bar(grouped.values().map(Vec::len).sum(), "expression")?;
    for (genome, experiments) in &grouped {
        let mut by_reference: BTreeMap<&Path, Vec<&Experiment>> = BTreeMap::new();
        for experiment in experiments {
            by_reference
                .entry(project.reference_sites(experiment, polyid)?)
                .or_default()
                .push(*experiment);
        }

        for (polyadb, experiments) in &by_reference {
            let reference = load_reference(polyadb)
                .with_context(|| format!("Failed to load reference sites {}", polyadb.display()))?;

            let overlay = Overlay {
                genome,
                reference: &reference,
                layout: &layout,
                up,
                down,
                force,
            };
            pool.install(|| {
                experiments.par_iter().try_for_each(|experiment| {
                    let result = overlay.run(experiment);
                    pb.inc(1);
                    result
                })
            })?;
        }
    }
    pb.finish_with_message("done");

    Ok(())
}
