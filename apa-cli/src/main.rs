mod common;
mod comps;
mod expression;
mod sites;

use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use log::Level;

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const BIN_NAME: &str = "apa";
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .about("Poly(A) site calling from aligned reads, expression at reference sites and differential site usage between conditions.")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log debug messages"),
        )
        .subcommand(sites::cli::create_sites_cli())
        .subcommand(expression::cli::create_expression_cli())
        .subcommand(comps::cli::create_comps_cli())
}

fn main() -> Result<()> {
    let app = build_parser();
    let matches = app.get_matches();

    let level = if matches.get_flag("verbose") {
        Level::Debug
    } else {
        Level::Info
    };
    simple_logger::init_with_level(level)?;

    match matches.subcommand() {
        //
        // SITE CALLING
        //
        Some((sites::cli::SITES_CMD, matches)) => {
            sites::handlers::run_sites(matches)?;
        }

        //
        // EXPRESSION OVERLAY
        //
        Some((expression::cli::EXPRESSION_CMD, matches)) => {
            expression::handlers::run_expression(matches)?;
        }

        //
        // COMPARISONS
        //
        Some((comps::cli::COMPS_CMD, matches)) => {
            comps::handlers::run_comps(matches)?;
        }

        _ => unreachable!("Subcommand not found"),
    };

    Ok(())
}
