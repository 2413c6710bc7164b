use std::path::Path;

use anyhow::{Context, Result};
use clap::ArgMatches;

use apa_comps::comparison::{DE_SUFFIX, GENES_SUFFIX};
use apa_comps::{
    Comparison, ComparisonConfig, CompsError, DifferentialExpression, GtfAnnotation, RScriptService,
};
use apa_core::models::Genome;

use crate::common::load_project;

pub fn run_comps(matches: &ArgMatches) -> Result<()> {
    let project = load_project(matches)?;
    let layout = project.layout();
    let comps_id = matches
        .get_one::<String>("comps")
        .expect("A comparison id is required.");

    let config_path = layout.comps_config_path(comps_id);
    let config = ComparisonConfig::from_path(comps_id, &config_path)
        .with_context(|| format!("Failed to read comparison {}", config_path.display()))?;
    let genome_name = config.genome(&project)?;
    let genome_config = project
        .genomes
        .get(genome_name)
        .ok_or_else(|| CompsError::MissingAnnotation {
            comps_id: comps_id.clone(),
            genome: genome_name.to_string(),
        })?;
    let gtf = genome_config.gtf.as_ref().ok_or_else(|| CompsError::MissingAnnotation {
        comps_id: comps_id.clone(),
        genome: genome_name.to_string(),
    })?;

    log::info!(
        "{}: {} control and {} test replicates on {}",
        comps_id,
        config.control.len(),
        config.test.len(),
        genome_name
    );
    let annotation =
        GtfAnnotation::from_path(gtf).with_context(|| format!("Failed to load annotation {}", gtf.display()))?;
    let genome = Genome::from_fasta(&genome_config.fasta)
        .with_context(|| format!("Failed to load genome {}", genome_config.fasta.display()))?;

    let rscript = matches.get_one::<String>("rscript").map(|script| {
        RScriptService::new(
            Path::new(script),
            &layout.comps_file(comps_id, GENES_SUFFIX),
            &layout.comps_file(comps_id, DE_SUFFIX),
        )
    });

    let summary = Comparison {
        config: &config,
        layout: &layout,
        genome_name,
        annotation: &annotation,
        genome: Some(&genome),
        de: rscript.as_ref().map(|s| s as &dyn DifferentialExpression),
        fasta: matches.get_flag("fasta"),
    }
    .run()
    .with_context(|| format!("Comparison {} failed", comps_id))?;

    log::info!(
        "{}: {} genes, {} site pairs written to {}",
        comps_id,
        summary.genes,
        summary.pairs,
        layout.comps_dir(comps_id).display()
    );
    for (class, n) in &summary.regulation {
        log::info!("{}: {} pairs in class {}", comps_id, n, class.code());
    }

    Ok(())
}
