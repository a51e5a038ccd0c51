use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

use crate::stat::compile::scan_artifacts;

/// Move every archivable per-population file from `dir` into `archive_dir`,
/// replacing files of the same name there. Returns the new paths.
pub fn archive(dir: &Path, archive_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(archive_dir)
        .wrap_err_with(|| format!("Failed to create {}", archive_dir.display()))?;

    let mut moved = Vec::new();
    for artifact in scan_artifacts(dir)?
        .into_iter()
        .filter(|a| a.kind.archived())
    {
        let from = artifact.path(dir);
        let to = artifact.path(archive_dir);
        if to.is_file() {
            fs::remove_file(&to)?;
        }
        fs::rename(&from, &to).wrap_err_with(|| {
            format!("Failed to move {} to {}", from.display(), to.display())
        })?;
        debug!("Moved {} to {}", artifact, archive_dir.display());
        moved.push(to);
    }

    info!(
        "Moved {} intermediate file(s) to {}",
        moved.len(),
        archive_dir.display()
    );
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ARCHIVED: [&str; 11] = [
        "A_poplist.txt",
        "A.log",
        "A.sites.pi",
        "A.het",
        "A.hwe",
        "A_Pi.csv",
        "A_TjD.csv",
        "A_HWE.csv",
        "FIS_A_HWE.csv",
        "prop_A_HWE.csv",
        "maf05_thin200_snps.log",
    ];

    const KEPT: [&str; 5] = [
        "populations_statistics_maf05_thin200.csv",
        "ind_population_stats.csv",
        "maf05_thin200_snps.recode.vcf",
        "A.Tajima.D",
        "pops.tsv",
    ];

    #[test]
    fn test_archive() {
        let dir = TempDir::new().unwrap();
        for name in ARCHIVED.iter().chain(KEPT.iter()) {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        let archive_dir = dir.path().join("popstat_files");

        let moved = archive(dir.path(), &archive_dir).unwrap();
        assert_eq!(moved.len(), ARCHIVED.len());

        for name in ARCHIVED {
            assert!(!dir.path().join(name).exists(), "{} left behind", name);
            assert!(archive_dir.join(name).exists(), "{} not archived", name);
        }
        for name in KEPT {
            assert!(dir.path().join(name).exists(), "{} was moved", name);
        }
    }

    #[test]
    fn test_archive_is_repeatable() {
        let dir = TempDir::new().unwrap();
        let archive_dir = dir.path().join("popstat_files");
        fs::write(dir.path().join("A.het"), "old").unwrap();
        archive(dir.path(), &archive_dir).unwrap();

        fs::write(dir.path().join("A.het"), "new").unwrap();
        let moved = archive(dir.path(), &archive_dir).unwrap();
        assert_eq!(moved, vec![archive_dir.join("A.het")]);
        assert_eq!(fs::read_to_string(archive_dir.join("A.het")).unwrap(), "new");
    }
}
