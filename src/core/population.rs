use color_eyre::{
    eyre::{bail, Context},
    Result,
};
use indexmap::IndexMap;
use log::{info, warn};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::artifact::{Artifact, Kind};

/// A single population with its samples
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Population {
    pub name: String,
    samples: Vec<String>,
}

impl Population {
    pub fn new(name: String, samples: Vec<String>) -> Self {
        Self { name, samples }
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }
}

impl fmt::Display for Population {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A population's sample list as written to disk for `--keep`
#[derive(Debug, Clone)]
pub struct PopulationList {
    pub population: String,
    pub path: PathBuf,
}

/// Check that a population label can be used as a file name prefix.
pub fn validate_label(label: &str) -> Result<()> {
    if label.is_empty() {
        bail!("Population label is empty");
    }
    if label == "." || label == ".." {
        bail!("Population label '{}' is not a valid file name", label);
    }
    if label.contains(['/', '\\', '\0']) {
        bail!(
            "Population label '{}' contains a path separator or NUL byte",
            label
        );
    }
    // Every file named after the label must parse back to the same
    // population, or `prop_A` and `FIS_A` would pass for files of `A`.
    for kind in Kind::ALL {
        let artifact = Artifact::new(kind, label);
        if Artifact::parse(&artifact.file_name()).as_ref() != Some(&artifact) {
            bail!(
                "Population label '{}' clashes with derived file name {}",
                label,
                artifact
            );
        }
    }
    Ok(())
}

/// Maps samples to populations, in first-seen order
#[derive(Debug, Clone)]
pub struct PopulationMap {
    populations: IndexMap<String, Population>,
}

impl PopulationMap {
    /// Create from a tab-separated file: sample\tpopulation (no header)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to open population file: {}", path.display()))?;

        Self::parse(&content).wrap_err_with(|| format!("Invalid population file: {}", path.display()))
    }

    /// Parse population file contents. Blank lines are skipped.
    pub fn parse(content: &str) -> Result<Self> {
        let mut pop_data: IndexMap<String, Vec<String>> = IndexMap::new();

        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let parts: Vec<&str> = line.split('\t').collect();
            if parts.len() != 2 {
                bail!(
                    "Invalid line {}: expected 2 tab-separated columns, got {}",
                    line_num + 1,
                    parts.len()
                );
            }

            let sample_name = parts[0].to_string();
            let pop_name = parts[1].to_string();
            validate_label(&pop_name).wrap_err_with(|| format!("On line {}", line_num + 1))?;

            let samples = pop_data.entry(pop_name).or_default();
            if !samples.contains(&sample_name) {
                samples.push(sample_name);
            }
        }

        let pop_map = Self::from_populations(pop_data);
        pop_map.warn_shared_samples();
        Ok(pop_map)
    }

    pub fn from_populations(pop_data: IndexMap<String, Vec<String>>) -> Self {
        let populations = pop_data
            .into_iter()
            .map(|(name, samples)| (name.clone(), Population::new(name, samples)))
            .collect();
        Self { populations }
    }

    /// Samples listed under more than one population, with their labels
    pub fn shared_samples(&self) -> Vec<(String, Vec<String>)> {
        let mut memberships: IndexMap<&str, Vec<String>> = IndexMap::new();
        for pop in self.populations() {
            for sample in pop.samples() {
                memberships
                    .entry(sample.as_str())
                    .or_default()
                    .push(pop.name.clone());
            }
        }
        memberships
            .into_iter()
            .filter(|(_, pops)| pops.len() > 1)
            .map(|(sample, pops)| (sample.to_string(), pops))
            .collect()
    }

    fn warn_shared_samples(&self) {
        for (sample, pops) in self.shared_samples() {
            warn!(
                "Sample '{}' is assigned to multiple populations ({}); it will be included in each",
                sample,
                pops.join(", ")
            );
        }
    }

    /// Write one `<population>_poplist.txt` per population into `dir`.
    pub fn write_lists(&self, dir: &Path) -> Result<Vec<PopulationList>> {
        let mut lists = Vec::with_capacity(self.num_populations());
        for pop in self.populations() {
            let path = Artifact::new(Kind::Poplist, &pop.name).path(dir);
            let file = File::create(&path)
                .wrap_err_with(|| format!("Failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            for sample in pop.samples() {
                writeln!(writer, "{}", sample)?;
            }
            writer.flush()?;

            info!(
                "Wrote {} sample(s) for population {} to {}",
                pop.num_samples(),
                pop,
                path.display()
            );
            lists.push(PopulationList {
                population: pop.name.clone(),
                path,
            });
        }
        Ok(lists)
    }

    /// Get population by name
    pub fn get_population(&self, name: &str) -> Option<&Population> {
        self.populations.get(name)
    }

    /// Iterate over all populations
    pub fn populations(&self) -> impl Iterator<Item = &Population> {
        self.populations.values()
    }

    /// Number of populations
    pub fn num_populations(&self) -> usize {
        self.populations.len()
    }
}
