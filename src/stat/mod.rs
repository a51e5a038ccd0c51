pub mod archive;
pub mod compile;
pub mod config;
pub mod derive;
pub mod normalize;
pub mod report;

use crate::core::artifact::{Artifact, Kind};
use crate::core::population::{PopulationList, PopulationMap};
use crate::stat::config::PipelineConfig;
use crate::stat::report::{Outcome, RunReport, Step};
use crate::vcftools::{Statistic, Vcftools};
use color_eyre::eyre::eyre;
use color_eyre::{Help, Result};
use log::info;
use std::path::Path;

fn compute_all(
    vcftools: &Vcftools,
    vcf: &Path,
    lists: &[PopulationList],
    statistics: &[Statistic],
    report: &mut RunReport,
) -> Result<()> {
    for list in lists {
        for &statistic in statistics {
            let outcome = vcftools.compute(vcf, list, statistic)?;
            report.record(statistic.step(), &list.population, outcome);
        }
    }
    Ok(())
}

fn finalize_all(
    dir: &Path,
    lists: &[PopulationList],
    kind: Kind,
    step: Step,
    report: &mut RunReport,
) -> Result<()> {
    for list in lists {
        let outcome = normalize::finalize(dir, &Artifact::new(kind, &list.population))?;
        report.record(step, &list.population, outcome);
    }
    Ok(())
}

pub fn run_pipeline(config: &PipelineConfig) -> Result<RunReport> {
    let dir = config.workdir.as_path();
    let vcftools = Vcftools::new(&config.vcftools, dir);
    let mut report = RunReport::new();

    let pop_map = PopulationMap::from_file(&config.popfile)?;
    if pop_map.num_populations() == 0 {
        return Err(eyre!(
            "No populations found in {}",
            config.popfile.display()
        ))
        .suggestion("The population file needs one 'sample<TAB>population' line per sample");
    }
    info!(
        "Found {} population(s) in {}",
        pop_map.num_populations(),
        config.popfile.display()
    );
    let lists = pop_map.write_lists(dir)?;

    info!("Computing site Pi and Tajima's D from {}", config.vcf.display());
    compute_all(
        &vcftools,
        &config.vcf,
        &lists,
        &[Statistic::SitePi, Statistic::TajimaD(config.tajima_window)],
        &mut report,
    )?;
    finalize_all(dir, &lists, Kind::SitePi, Step::NormalizePi, &mut report)?;

    let filtered = config.filtered_vcf();
    info!(
        "Filtering {} with maf {} and thin {}",
        config.vcf.display(),
        config.maf.as_str(),
        config.thin
    );
    let outcome = vcftools.filter(
        &config.vcf,
        config.maf.as_str(),
        config.thin,
        &config.filtered_prefix(),
    )?;
    report.record(Step::Filter, filtered.display().to_string(), outcome);

    info!("Computing heterozygosity and Hardy-Weinberg from {}", filtered.display());
    compute_all(
        &vcftools,
        &filtered,
        &lists,
        &[Statistic::Het, Statistic::Hardy],
        &mut report,
    )?;
    finalize_all(dir, &lists, Kind::Hardy, Step::NormalizeHardy, &mut report)?;

    for list in &lists {
        let outcome = derive::write_proportions(dir, &list.population)?;
        report.record(Step::Proportions, &list.population, outcome);
    }
    for list in &lists {
        let outcome = derive::write_fis(dir, &list.population)?;
        report.record(Step::Fis, &list.population, outcome);
    }
    derive::remove_proportions(dir)?;

    finalize_all(dir, &lists, Kind::TajimaD, Step::NormalizeTajima, &mut report)?;

    let summary_path = config.population_summary();
    let summary = compile::compile_summary(dir)?;
    compile::write_summary(&summary_path, &summary)?;
    report.record(
        Step::Summary,
        summary_path.display().to_string(),
        Outcome::Processed,
    );

    let individual_path = config.individual_summary();
    let outcome = compile::combine_het(dir, &individual_path)?;
    report.record(
        Step::CombineHet,
        individual_path.display().to_string(),
        outcome,
    );

    archive::archive(dir, &config.archive_dir)?;
    report.record(
        Step::Archive,
        config.archive_dir.display().to_string(),
        Outcome::Processed,
    );

    Ok(report)
}
