use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;
use log::info;
use std::fs;
use std::path::Path;

use crate::core::artifact::{Artifact, Kind, Stage};
use crate::core::table::{format_number, mean, Table};
use crate::stat::report::Outcome;

/// Columns the proportion step reads
pub const PROPORTION_INPUTS: [&str; 4] = ["OBS_HOM1", "OBS_HOM2", "OBS_HET", "EXP_HET"];

/// Columns the FIS step reads
pub const FIS_INPUTS: [&str; 2] = ["EXP_HET_prop", "OBS_HET_prop"];

/// Result of deriving columns for one table
#[derive(Debug, PartialEq)]
pub enum Derivation {
    Done,
    MissingColumns(Vec<String>),
}

fn check_columns(table: &Table, required: &[&str]) -> Option<Derivation> {
    let missing = table.missing_columns(required);
    if missing.is_empty() {
        None
    } else {
        Some(Derivation::MissingColumns(
            missing.into_iter().map(str::to_string).collect(),
        ))
    }
}

/// Column values as numbers. Empty cells are undefined (NaN).
fn values(table: &Table, name: &str) -> Result<Vec<f64>> {
    let Some(idx) = table.column_index(name) else {
        bail!("Missing column {}", name);
    };
    table
        .rows()
        .iter()
        .enumerate()
        .map(|(row_idx, row)| {
            let cell = row[idx].trim();
            if cell.is_empty() {
                return Ok(f64::NAN);
            }
            cell.parse::<f64>().wrap_err_with(|| {
                format!(
                    "Non-numeric value '{}' in column {} row {}",
                    cell,
                    name,
                    row_idx + 1
                )
            })
        })
        .collect()
}

fn formatted(values: impl IntoIterator<Item = f64>) -> Vec<String> {
    values.into_iter().map(format_number).collect()
}

/// Add total observed homozygotes and the observed homozygote, observed
/// heterozygote and expected heterozygote proportions, each relative to the
/// observed genotype count of the row.
pub fn add_proportions(table: &mut Table) -> Result<Derivation> {
    if let Some(missing) = check_columns(table, &PROPORTION_INPUTS) {
        return Ok(missing);
    }

    let hom1 = values(table, "OBS_HOM1")?;
    let hom2 = values(table, "OBS_HOM2")?;
    let het = values(table, "OBS_HET")?;
    let exp_het = values(table, "EXP_HET")?;

    let hom_total: Vec<f64> = hom1.iter().zip(&hom2).map(|(a, b)| a + b).collect();
    let genotypes: Vec<f64> = hom_total.iter().zip(&het).map(|(a, b)| a + b).collect();
    let proportion = |numerators: &[f64]| {
        formatted(numerators.iter().zip(&genotypes).map(|(n, d)| n / d))
    };

    let hom_prop = proportion(&hom_total[..]);
    let het_prop = proportion(&het[..]);
    let exp_het_prop = proportion(&exp_het[..]);

    table.set_column("OBS_HOM_Total", formatted(hom_total.iter().copied()))?;
    table.set_column("OBS_HOM_prop", hom_prop)?;
    table.set_column("OBS_HET_prop", het_prop)?;
    table.set_column("EXP_HET_prop", exp_het_prop)?;
    Ok(Derivation::Done)
}

/// FIS for one site; zero where no heterozygosity is expected
pub fn fis(exp_het_prop: f64, obs_het_prop: f64) -> f64 {
    if exp_het_prop == 0.0 {
        0.0
    } else {
        (exp_het_prop - obs_het_prop) / exp_het_prop
    }
}

/// Add a FIS column computed for every row but the last, which is the
/// averages row and receives the mean FIS of the other rows (undefined
/// values counted as zero).
pub fn add_fis(table: &mut Table) -> Result<Derivation> {
    if let Some(missing) = check_columns(table, &FIS_INPUTS) {
        return Ok(missing);
    }

    let exp_het = values(table, "EXP_HET_prop")?;
    let obs_het = values(table, "OBS_HET_prop")?;
    let site_rows = table.num_rows().saturating_sub(1);

    let per_site: Vec<f64> = exp_het
        .iter()
        .zip(&obs_het)
        .take(site_rows)
        .map(|(&exp, &obs)| fis(exp, obs))
        .collect();
    let zero_filled: Vec<f64> = per_site
        .iter()
        .map(|&v| if v.is_nan() { 0.0 } else { v })
        .collect();

    let mut column = per_site;
    if table.num_rows() > 0 {
        column.push(mean(&zero_filled));
    }
    table.set_column("FIS", formatted(column))?;
    Ok(Derivation::Done)
}

fn derive_file(
    dir: &Path,
    input: &Artifact,
    output_kind: Kind,
    derive: fn(&mut Table) -> Result<Derivation>,
) -> Result<Outcome> {
    let input_path = input.path(dir);
    if !input_path.is_file() {
        return Ok(Outcome::Skipped(format!("{} not found", input)));
    }

    let mut table = match Table::from_path(&input_path) {
        Ok(table) => table,
        Err(e) => return Ok(Outcome::Failed(format!("{:#}", e))),
    };
    match derive(&mut table) {
        Ok(Derivation::Done) => {}
        Ok(Derivation::MissingColumns(missing)) => {
            return Ok(Outcome::Skipped(format!(
                "required columns not found: {}",
                missing.join(", ")
            )))
        }
        Err(e) => return Ok(Outcome::Failed(format!("{:#}", e))),
    }

    let output = input.with_kind(output_kind);
    table.write_path(&output.path(dir))?;
    info!("Processed {}, saved as {}", input, output);
    Ok(Outcome::Processed)
}

/// `<pop>_HWE.csv` to `prop_<pop>_HWE.csv`
pub fn write_proportions(dir: &Path, population: &str) -> Result<Outcome> {
    derive_file(
        dir,
        &Artifact::new(Kind::HardyTable, population),
        Kind::HardyProportions,
        add_proportions,
    )
}

/// `prop_<pop>_HWE.csv` to `FIS_<pop>_HWE.csv`
pub fn write_fis(dir: &Path, population: &str) -> Result<Outcome> {
    derive_file(
        dir,
        &Artifact::new(Kind::HardyProportions, population),
        Kind::HardyFis,
        add_fis,
    )
}

/// Delete every `prop_` intermediate in `dir`, returning how many were removed.
pub fn remove_proportions(dir: &Path) -> Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let is_proportions = name
            .to_str()
            .and_then(Artifact::parse)
            .is_some_and(|a| a.stage() == Stage::Proportions);
        if is_proportions && entry.file_type()?.is_file() {
            fs::remove_file(entry.path())
                .wrap_err_with(|| format!("Failed to remove {}", entry.path().display()))?;
            removed += 1;
        }
    }
    Ok(removed)
}
