use clap::Parser;
use color_eyre::Result;
use popstat::stat::config::{Maf, PipelineConfig, DEFAULT_ARCHIVE_DIR};
use popstat::stat::run_pipeline;
use std::ffi::OsString;
use std::path::PathBuf;

/// Single-dash spellings accepted for compatibility with older wrapper scripts
const LEGACY_FLAGS: [(&str, &str); 6] = [
    ("-wd", "--workingdir"),
    ("-pop", "--popfile"),
    ("-vcf", "--variants"),
    ("-tjd", "--tajimawind"),
    ("-maf", "--maf"),
    ("-thin", "--thin"),
];

/// Per-population diversity statistics with vcftools
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Per-population Pi, Tajima's D, heterozygosity and FIS with vcftools"
)]
pub struct Cli {
    /// Working directory; inputs are resolved against it and all outputs are written to it
    #[arg(long = "workingdir", visible_alias = "wd")]
    pub workingdir: PathBuf,

    /// Path to file that defines populations. Tab separated: sample\tpopulation_name
    #[arg(long = "popfile", visible_alias = "pop")]
    pub popfile: PathBuf,

    /// VCF used for population statistics; sample IDs must match the population file
    #[arg(long = "variants", visible_alias = "vcf")]
    pub variants: PathBuf,

    /// Window size in base pairs for Tajima's D
    #[arg(long = "tajimawind", visible_alias = "tjd")]
    pub tajimawind: u64,

    /// Minor allele frequency filter (e.g. .05)
    #[arg(long = "maf", allow_hyphen_values = true)]
    pub maf: String,

    /// Minimum distance in base pairs between retained SNPs (e.g. 200)
    #[arg(long = "thin")]
    pub thin: u64,

    /// vcftools executable
    #[arg(long = "vcftools", env = "VCFTOOLS", default_value = "vcftools")]
    pub vcftools: PathBuf,

    /// Subdirectory of the working directory that receives intermediate files
    #[arg(long = "archive-dir", default_value = DEFAULT_ARCHIVE_DIR)]
    pub archive_dir: String,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let maf = Maf::parse(&self.maf)?;
        let config = PipelineConfig::new(
            &self.workingdir,
            &self.popfile,
            &self.variants,
            self.tajimawind,
            maf,
            self.thin,
            self.vcftools,
            &self.archive_dir,
        )?;

        let report = run_pipeline(&config)?;
        report.log_summary();
        Ok(())
    }
}

/// Rewrite `-wd DIR` / `-wd=DIR` style flags to their long forms. Everything
/// after a bare `--` is left alone.
fn rewrite_legacy_flags<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut rewritten = Vec::new();
    let mut passthrough = false;
    for arg in args {
        if passthrough {
            rewritten.push(arg);
            continue;
        }
        let Some(text) = arg.to_str() else {
            rewritten.push(arg);
            continue;
        };
        if text == "--" {
            passthrough = true;
            rewritten.push(arg);
            continue;
        }

        let (flag, value) = match text.split_once('=') {
            Some((flag, value)) => (flag, Some(value)),
            None => (text, None),
        };
        let replacement = LEGACY_FLAGS
            .iter()
            .find(|(legacy, _)| *legacy == flag)
            .map(|(_, long)| match value {
                Some(value) => OsString::from(format!("{}={}", long, value)),
                None => OsString::from(*long),
            });
        rewritten.push(replacement.unwrap_or(arg));
    }
    rewritten
}

// Main entry point
pub fn main() -> Result<()> {
    color_eyre::install()?;
    use env_logger::Env;

    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse_from(rewrite_legacy_flags(std::env::args_os()));
    cli.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<OsString> {
        items.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_rewrite_legacy_flags() {
        let rewritten = rewrite_legacy_flags(args(&[
            "popstat", "-wd", "/data", "-pop", "pops.tsv", "-vcf", "in.vcf", "-tjd=10000",
            "-maf", ".05", "-thin", "200",
        ]));
        assert_eq!(
            rewritten,
            args(&[
                "popstat",
                "--workingdir",
                "/data",
                "--popfile",
                "pops.tsv",
                "--variants",
                "in.vcf",
                "--tajimawind=10000",
                "--maf",
                ".05",
                "--thin",
                "200",
            ])
        );
    }

    #[test]
    fn test_rewrite_leaves_other_args() {
        let original = args(&["popstat", "--vcftools", "/opt/vcftools", "--", "-wd"]);
        assert_eq!(rewrite_legacy_flags(original.clone()), original);
    }

    #[test]
    fn test_parse_legacy_command_line() {
        let cli = Cli::try_parse_from(rewrite_legacy_flags(args(&[
            "popstat", "-wd", "/data", "-pop", "pops.tsv", "-vcf", "in.vcf", "-tjd", "10000",
            "-maf", ".05", "-thin", "200",
        ])))
        .unwrap();
        assert_eq!(cli.workingdir, PathBuf::from("/data"));
        assert_eq!(cli.tajimawind, 10000);
        assert_eq!(cli.maf, ".05");
        assert_eq!(cli.thin, 200);
        assert_eq!(cli.archive_dir, "popstat_files");
    }

    #[test]
    fn test_missing_required_flag() {
        let result = Cli::try_parse_from(args(&[
            "popstat", "--workingdir", "/data", "--popfile", "pops.tsv",
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
