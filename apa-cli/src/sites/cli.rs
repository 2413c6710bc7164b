use clap::Command;

use crate::common::{experiment_arg, force_arg, project_arg, threads_arg};

pub const SITES_CMD: &str = "sites";

pub fn create_sites_cli() -> Command {
    Command::new(SITES_CMD)
        .about("Call raw and true poly(A) sites from the alignments of each experiment.")
        .arg(project_arg())
        .arg(experiment_arg())
        .arg(force_arg())
        .arg(threads_arg())
}
