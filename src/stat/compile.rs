use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::path::Path;

use crate::core::artifact::{Artifact, Kind, Stage};
use crate::core::table::Table;
use crate::stat::report::Outcome;

pub const SUMMARY_HEADER: [&str; 6] = ["population", "Pi", "TjD", "FIS", "EXP_HET", "OBS_HET"];

/// One row of the population summary table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulationSummary {
    pub population: String,
    pub pi: Option<f64>,
    pub tajima_d: Option<f64>,
    pub fis: Option<f64>,
    pub exp_het: Option<f64>,
    pub obs_het: Option<f64>,
}

impl PopulationSummary {
    fn empty(population: &str) -> Self {
        Self {
            population: population.to_string(),
            pi: None,
            tajima_d: None,
            fis: None,
            exp_het: None,
            obs_het: None,
        }
    }
}

/// All artifacts in `dir` whose names are recognised
pub fn scan_artifacts(dir: &Path) -> Result<Vec<Artifact>> {
    let mut artifacts = Vec::new();
    for entry in
        fs::read_dir(dir).wrap_err_with(|| format!("Failed to list {}", dir.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(artifact) = entry.file_name().to_str().and_then(Artifact::parse) {
            artifacts.push(artifact);
        }
    }
    artifacts.sort();
    Ok(artifacts)
}

/// Populations with at least one finalized Pi, Tajima's D or HWE table
pub fn discover_populations(dir: &Path) -> Result<BTreeSet<String>> {
    Ok(scan_artifacts(dir)?
        .into_iter()
        .filter(|a| a.stage() == Stage::Finalized)
        .map(|a| a.population)
        .collect())
}

/// Last-row value of a column, if the table has the column and it holds a number
fn last_number(table: &Table, column: &str, artifact: &Artifact) -> Option<f64> {
    let Some(cell) = table.last_value(column) else {
        warn!("{} has no {} column", artifact, column);
        return None;
    };
    cell.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

fn read_table(dir: &Path, artifact: &Artifact) -> Result<Option<Table>> {
    let path = artifact.path(dir);
    if !path.is_file() {
        return Ok(None);
    }
    Table::from_path(&path).map(Some)
}

/// Summarise one population from its finalized tables. Absent tables leave
/// their fields empty.
pub fn summarize_population(dir: &Path, population: &str) -> Result<PopulationSummary> {
    let mut summary = PopulationSummary::empty(population);

    let pi = Artifact::new(Kind::PiTable, population);
    if let Some(table) = read_table(dir, &pi)? {
        summary.pi = last_number(&table, "PI", &pi);
    }

    let tajima = Artifact::new(Kind::TajimaTable, population);
    if let Some(table) = read_table(dir, &tajima)? {
        summary.tajima_d = last_number(&table, "TajimaD", &tajima);
    }

    let fis = Artifact::new(Kind::HardyFis, population);
    if let Some(table) = read_table(dir, &fis)? {
        summary.fis = last_number(&table, "FIS", &fis);
        summary.exp_het = last_number(&table, "EXP_HET_prop", &fis);
        summary.obs_het = last_number(&table, "OBS_HET_prop", &fis);
    }

    Ok(summary)
}

pub fn compile_summary(dir: &Path) -> Result<Vec<PopulationSummary>> {
    discover_populations(dir)?
        .iter()
        .map(|population| summarize_population(dir, population))
        .collect()
}

pub fn write_summary(path: &Path, rows: &[PopulationSummary]) -> Result<()> {
    let file = File::create(path)
        .wrap_err_with(|| format!("Couldn't create output file: {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    writer.write_record(SUMMARY_HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!(
        "Compiled {} population(s) into {}",
        rows.len(),
        path.display()
    );
    Ok(())
}

/// Stack every `<pop>.het` table into one, tagging rows with their
/// population. All tables must share the same columns.
pub fn combine_het(dir: &Path, output: &Path) -> Result<Outcome> {
    let het_tables: Vec<Artifact> = scan_artifacts(dir)?
        .into_iter()
        .filter(|a| a.kind == Kind::Het)
        .collect();
    if het_tables.is_empty() {
        return Ok(Outcome::Skipped("no .het tables found".to_string()));
    }

    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    for artifact in &het_tables {
        let table = Table::from_path(&artifact.path(dir))?;
        let expected = headers.get_or_insert_with(|| table.headers().to_vec());
        if expected.as_slice() != table.headers() {
            bail!(
                "Columns of {} ({}) do not match earlier .het tables ({})",
                artifact,
                table.headers().join(", "),
                expected.join(", ")
            );
        }
        for row in table.rows() {
            let mut row = row.clone();
            row.push(artifact.population.clone());
            rows.push(row);
        }
    }

    let mut headers = headers.unwrap_or_default();
    headers.push("population".to_string());
    let combined = Table::new(headers, rows)?;
    combined.write_path(output)?;

    info!(
        "Combined {} individual(s) from {} population(s) into {}",
        combined.num_rows(),
        het_tables.len(),
        output.display()
    );
    Ok(Outcome::Processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn populated_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        let path = dir.path();
        write(path, "A_Pi.csv", "CHROM,POS,PI\nc,1,0.1\nc,2,0.3\nAverages,1.5,0.2\n");
        write(path, "A_TjD.csv", "CHROM,BIN_START,N_SNPS,TajimaD\nc,0,2,1\nAverages,0,2,1\n");
        write(path, "A_HWE.csv", "CHR,POS\nc,1\nAverages,1\n");
        write(
            path,
            "FIS_A_HWE.csv",
            "CHR,EXP_HET_prop,OBS_HET_prop,FIS\nc,0.15,0.1,0.3\nAverages,0.15,0.1,0.3\n",
        );
        write(path, "North_East_Pi.csv", "CHROM,POS,PI\nc,1,0.5\nAverages,1,0.5\n");
        dir
    }

    #[test]
    fn test_discover_populations() {
        let dir = populated_dir();
        write(dir.path(), "prop_Z_HWE.csv", "CHR\n");
        write(dir.path(), "A.het", "INDV\n");
        let pops = discover_populations(dir.path()).unwrap();
        assert_eq!(
            pops.into_iter().collect::<Vec<_>>(),
            vec!["A".to_string(), "North_East".to_string()]
        );
    }

    #[test]
    fn test_compile_summary() {
        let dir = populated_dir();
        let summary = compile_summary(dir.path()).unwrap();
        assert_eq!(summary.len(), 2);

        assert_eq!(
            summary[0],
            PopulationSummary {
                population: "A".to_string(),
                pi: Some(0.2),
                tajima_d: Some(1.0),
                fis: Some(0.3),
                exp_het: Some(0.15),
                obs_het: Some(0.1),
            }
        );

        let ne = &summary[1];
        assert_eq!(ne.population, "North_East");
        assert_eq!(ne.pi, Some(0.5));
        assert_eq!(ne.tajima_d, None);
        assert_eq!(ne.fis, None);
    }

    #[test]
    fn test_write_summary() {
        let dir = populated_dir();
        let out = dir.path().join("populations_statistics_maf05_thin200.csv");
        let summary = compile_summary(dir.path()).unwrap();
        write_summary(&out, &summary).unwrap();

        let content = fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "population,Pi,TjD,FIS,EXP_HET,OBS_HET");
        assert!(lines[1].starts_with("A,0.2,"));
        assert_eq!(lines[2], "North_East,0.5,,,,");
    }

    #[test]
    fn test_write_empty_summary_has_header() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("summary.csv");
        write_summary(&out, &[]).unwrap();
        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            "population,Pi,TjD,FIS,EXP_HET,OBS_HET\n"
        );
    }

    #[test]
    fn test_combine_het() {
        let dir = TempDir::new().unwrap();
        let header = "INDV\tO(HOM)\tE(HOM)\tN_SITES\tF\n";
        write(dir.path(), "A.het", &format!("{header}S1\t10\t8.5\t20\t0.13\n"));
        write(
            dir.path(),
            "B.het",
            &format!("{header}S2\t9\t8.0\t20\t0.08\nS3\t7\t8.0\t20\t-0.08\n"),
        );

        let out = dir.path().join("ind_population_stats.csv");
        assert_eq!(combine_het(dir.path(), &out).unwrap(), Outcome::Processed);

        let content = fs::read_to_string(&out).unwrap();
        assert_eq!(
            content,
            "INDV,O(HOM),E(HOM),N_SITES,F,population\n\
             S1,10,8.5,20,0.13,A\n\
             S2,9,8.0,20,0.08,B\n\
             S3,7,8.0,20,-0.08,B\n"
        );
    }

    #[test]
    fn test_combine_het_mismatched_columns() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "A.het", "INDV\tF\nS1\t0.1\n");
        write(dir.path(), "B.het", "INDV\tN_SITES\nS2\t3\n");
        let out = dir.path().join("ind_population_stats.csv");
        assert!(combine_het(dir.path(), &out).is_err());
    }

    #[test]
    fn test_combine_het_without_tables() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("ind_population_stats.csv");
        assert!(matches!(
            combine_het(dir.path(), &out).unwrap(),
            Outcome::Skipped(_)
        ));
        assert!(!out.exists());
    }
}
