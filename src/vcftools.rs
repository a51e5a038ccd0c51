use color_eyre::eyre::WrapErr;
use color_eyre::{Help, Result};
use log::debug;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::core::artifact::{Artifact, Kind};
use crate::core::population::PopulationList;
use crate::core::utils::create_spinner;
use crate::stat::report::{Outcome, Step};

/// A per-population statistic computed by vcftools
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    SitePi,
    /// Windowed Tajima's D with the window size in bp
    TajimaD(u64),
    Het,
    Hardy,
}

impl Statistic {
    fn flags(self) -> Vec<OsString> {
        match self {
            Statistic::SitePi => vec!["--site-pi".into()],
            Statistic::TajimaD(window) => vec!["--TajimaD".into(), window.to_string().into()],
            Statistic::Het => vec!["--het".into()],
            Statistic::Hardy => vec!["--hardy".into()],
        }
    }

    /// Kind of the file vcftools writes for this statistic
    pub fn output_kind(self) -> Kind {
        match self {
            Statistic::SitePi => Kind::SitePi,
            Statistic::TajimaD(_) => Kind::TajimaD,
            Statistic::Het => Kind::Het,
            Statistic::Hardy => Kind::Hardy,
        }
    }

    pub fn step(self) -> Step {
        match self {
            Statistic::SitePi => Step::SitePi,
            Statistic::TajimaD(_) => Step::TajimaD,
            Statistic::Het => Step::Het,
            Statistic::Hardy => Step::Hardy,
        }
    }
}

/// Arguments for one statistic restricted to the samples in `keep`
pub fn statistic_args(vcf: &Path, keep: &Path, statistic: Statistic, out: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--vcf".into(),
        vcf.into(),
        "--keep".into(),
        keep.into(),
    ];
    args.extend(statistic.flags());
    args.extend(["--out".into(), out.into()]);
    args
}

/// Arguments for the minor allele frequency and distance filter
pub fn filter_args(vcf: &Path, maf: &str, thin: u64, out: &Path) -> Vec<OsString> {
    vec![
        "--vcf".into(),
        vcf.into(),
        "--maf".into(),
        maf.into(),
        "--thin".into(),
        thin.to_string().into(),
        "--recode".into(),
        "--recode-INFO-all".into(),
        "--out".into(),
        out.into(),
    ]
}

/// Path of the VCF written by a `--recode` run with the given `--out` prefix
pub fn recode_path(out: &Path) -> PathBuf {
    let mut name = out.as_os_str().to_owned();
    name.push(".recode.vcf");
    PathBuf::from(name)
}

/// Runs the vcftools binary from the working directory
#[derive(Debug, Clone)]
pub struct Vcftools {
    program: PathBuf,
    workdir: PathBuf,
}

impl Vcftools {
    pub fn new(program: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            workdir: workdir.into(),
        }
    }

    /// Compute one statistic for one population; output goes to `<workdir>/<population>.*`
    pub fn compute(
        &self,
        vcf: &Path,
        list: &PopulationList,
        statistic: Statistic,
    ) -> Result<Outcome> {
        let out = Artifact::out_prefix(&list.population, &self.workdir);
        let args = statistic_args(vcf, &list.path, statistic, &out);
        self.run(
            &args,
            &format!("vcftools {} for {}", statistic.step(), list.population),
        )
    }

    pub fn filter(&self, vcf: &Path, maf: &str, thin: u64, out: &Path) -> Result<Outcome> {
        let args = filter_args(vcf, maf, thin, out);
        self.run(&args, &format!("vcftools --maf {} --thin {}", maf, thin))
    }

    /// Spawn and wait. A non-zero exit is an outcome, not an error; only a
    /// failure to start the process is.
    fn run(&self, args: &[OsString], message: &str) -> Result<Outcome> {
        debug!(
            "{} {}",
            self.program.display(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let spinner = create_spinner(message);
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .wrap_err_with(|| format!("Failed to run {}", self.program.display()))
            .suggestion("Make sure vcftools is installed and on PATH, or pass --vcftools")?;
        spinner.finish_and_clear();

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!("{}", stderr.trim_end());
        }

        if output.status.success() {
            Ok(Outcome::Processed)
        } else {
            Ok(Outcome::Failed(format!("vcftools exited with {}", output.status)))
        }
    }
}
