use clap::{Arg, Command, value_parser};

use crate::common::{experiment_arg, force_arg, project_arg, threads_arg};

pub const EXPRESSION_CMD: &str = "expression";

pub fn create_expression_cli() -> Command {
    Command::new(EXPRESSION_CMD)
        .about("Assign raw site counts of each experiment to the reference poly(A) sites of its genome.")
        .arg(project_arg())
        .arg(experiment_arg())
        .arg(force_arg())
        .arg(threads_arg())
        .arg(
            Arg::new("up")
                .long("up")
                .value_parser(value_parser!(u32))
                .default_value("100")
                .help("Bases upstream of a reference site that are assigned to it"),
        )
        .arg(
            Arg::new("down")
                .long("down")
                .value_parser(value_parser!(u32))
                .default_value("25")
                .help("Bases downstream of a reference site that are assigned to it"),
        )
        .arg(
            Arg::new("polyid")
                .long("polyid")
                .help("Genome entry whose reference sites paseqx experiments are overlaid onto"),
        )
}
