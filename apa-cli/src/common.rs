use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, value_parser};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::ThreadPool;

use apa_core::project::{Experiment, Project};

pub fn project_arg() -> Arg {
    Arg::new("project")
        .long("project")
        .short('p')
        .required(true)
        .help("Project configuration (TOML)")
}

pub fn experiment_arg() -> Arg {
    Arg::new("experiment")
        .long("experiment")
        .short('e')
        .action(ArgAction::Append)
        .help("Experiment id to process (<lib>_e<N>); repeat for several. Default: all experiments")
}

pub fn force_arg() -> Arg {
    Arg::new("force")
        .long("force")
        .short('f')
        .action(ArgAction::SetTrue)
        .help("Process experiments again even if already done or in progress")
}

pub fn threads_arg() -> Arg {
    Arg::new("threads")
        .long("threads")
        .short('t')
        .value_parser(value_parser!(usize))
        .default_value("1")
        .help("Number of experiments processed in parallel")
}

pub fn load_project(matches: &ArgMatches) -> Result<Project> {
    let path = matches
        .get_one::<String>("project")
        .expect("A project configuration is required.");
    Project::from_path(Path::new(path)).with_context(|| format!("Failed to load project {}", path))
}

///
/// Experiments named on the command line, or all experiments of the
/// project, grouped by genome.
///
pub fn experiments_by_genome<'a>(
    project: &'a Project,
    matches: &ArgMatches,
) -> Result<BTreeMap<&'a str, Vec<&'a Experiment>>> {
    let selected: Vec<&Experiment> = match matches.get_many::<String>("experiment") {
        Some(ids) => ids
            .map(|id| project.experiment(id))
            .collect::<Result<Vec<_>, _>>()?,
        None => project.experiments.iter().collect(),
    };
    if selected.is_empty() {
        bail!("No experiments to process");
    }

    let mut grouped: BTreeMap<&str, Vec<&Experiment>> = BTreeMap::new();
    for experiment in selected {
        grouped.entry(experiment.genome.as_str()).or_default().push(experiment);
    }
    Ok(grouped)
}

pub fn thread_pool(matches: &ArgMatches) -> Result<ThreadPool> {
    let threads = matches.get_one::<usize>("threads").copied().unwrap_or(1).max(1);
    log::debug!("Using {} threads", threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("Failed to configure thread pool")
}

pub fn progress_bar(len: usize, message: &'static str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?);
    pb.set_message(message);
    Ok(pb)
}
