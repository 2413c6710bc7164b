use clap::{Arg, ArgAction, Command};

use crate::common::project_arg;

pub const COMPS_CMD: &str = "comps";

pub fn create_comps_cli() -> Command {
    Command::new(COMPS_CMD)
        .about("Compare poly(A) site usage between the control and test replicates of a comparison.")
        .arg(project_arg())
        .arg(
            Arg::new("comps")
                .long("comps")
                .short('c')
                .required(true)
                .help("Comparison id; its definition is <comps_folder>/<id>/<id>.config"),
        )
        .arg(
            Arg::new("rscript")
                .long("rscript")
                .help("R script computing gene level differential expression"),
        )
        .arg(
            Arg::new("fasta")
                .long("fasta")
                .action(ArgAction::SetTrue)
                .help("Export flanking sequences of regulated tandem site pairs"),
        )
}
