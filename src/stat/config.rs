use color_eyre::eyre::{bail, eyre, WrapErr};
use color_eyre::{Help, Result};
use std::path::{Component, Path, PathBuf};

use crate::vcftools::recode_path;

/// Name of the summary table left at the top level of the working directory
pub const INDIVIDUAL_SUMMARY: &str = "ind_population_stats.csv";

/// Directory intermediate files are archived into unless overridden
pub const DEFAULT_ARCHIVE_DIR: &str = "popstat_files";

/// Minor allele frequency threshold, kept as the user wrote it for file names
#[derive(Debug, Clone, PartialEq)]
pub struct Maf {
    text: String,
}

impl Maf {
    pub fn parse(text: &str) -> Result<Self> {
        let value: f64 = text
            .trim()
            .parse()
            .map_err(|_| eyre!("Invalid minor allele frequency: '{}'", text))?;
        if !(0.0..=0.5).contains(&value) {
            bail!(
                "Minor allele frequency must be between 0 and 0.5, got {}",
                text
            );
        }
        Ok(Self {
            text: text.trim().to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The threshold as it appears in file names: `.05` becomes `05`
    pub fn tag(&self) -> String {
        self.text.replace('.', "")
    }
}

pub struct PipelineConfig {
    pub workdir: PathBuf,
    pub popfile: PathBuf,
    pub vcf: PathBuf,
    pub tajima_window: u64,
    pub maf: Maf,
    pub thin: u64,
    pub vcftools: PathBuf,
    pub archive_dir: PathBuf,
}

impl PipelineConfig {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        workdir: &Path,
        popfile: &Path,
        vcf: &Path,
        tajima_window: u64,
        maf: Maf,
        thin: u64,
        vcftools: PathBuf,
        archive_dir: &str,
    ) -> Result<Self> {
        let workdir = workdir
            .canonicalize()
            .wrap_err_with(|| format!("Working directory not found: {}", workdir.display()))?;
        if !workdir.is_dir() {
            bail!("Working directory is not a directory: {}", workdir.display());
        }

        if tajima_window == 0 {
            return Err(eyre!("Tajima's D window size must be greater than 0"))
                .suggestion("Pass a window size in base pairs, e.g. --tajimawind 10000");
        }

        let archive_name = Path::new(archive_dir);
        let mut components = archive_name.components();
        if !matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) {
            bail!(
                "Archive directory must be a plain directory name, got '{}'",
                archive_dir
            );
        }

        let popfile = workdir.join(popfile);
        let vcf = workdir.join(vcf);
        let archive_dir = workdir.join(archive_name);

        Ok(Self {
            workdir,
            popfile,
            vcf,
            tajima_window,
            maf,
            thin,
            vcftools,
            archive_dir,
        })
    }

    /// `--out` prefix of the maf/thin filtered VCF
    pub fn filtered_prefix(&self) -> PathBuf {
        self.workdir
            .join(format!("maf{}_thin{}_snps", self.maf.tag(), self.thin))
    }

    pub fn filtered_vcf(&self) -> PathBuf {
        recode_path(&self.filtered_prefix())
    }

    pub fn population_summary(&self) -> PathBuf {
        self.workdir.join(format!(
            "populations_statistics_maf{}_thin{}.csv",
            self.maf.tag(),
            self.thin
        ))
    }

    pub fn individual_summary(&self) -> PathBuf {
        self.workdir.join(INDIVIDUAL_SUMMARY)
    }
}
