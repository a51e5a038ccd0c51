use std::fmt;
use std::path::{Path, PathBuf};

/// Processing stage a file on disk has reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Written by us as input to vcftools
    Input,
    /// Written by vcftools, untouched
    Raw,
    /// Delimiters normalised and averages row appended
    Finalized,
    /// Hardy-Weinberg table with genotype proportions
    Proportions,
    /// Hardy-Weinberg table with per-site and mean FIS
    Fis,
}

/// Every per-population file the pipeline reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Poplist,
    Log,
    SitePi,
    TajimaD,
    Het,
    Hardy,
    PiTable,
    TajimaTable,
    HardyTable,
    HardyProportions,
    HardyFis,
}

impl Kind {
    pub const ALL: [Kind; 11] = [
        Kind::Poplist,
        Kind::Log,
        Kind::SitePi,
        Kind::TajimaD,
        Kind::Het,
        Kind::Hardy,
        Kind::PiTable,
        Kind::TajimaTable,
        Kind::HardyTable,
        Kind::HardyProportions,
        Kind::HardyFis,
    ];

    pub fn stage(self) -> Stage {
        match self {
            Kind::Poplist => Stage::Input,
            Kind::Log | Kind::SitePi | Kind::TajimaD | Kind::Het | Kind::Hardy => Stage::Raw,
            Kind::PiTable | Kind::TajimaTable | Kind::HardyTable => Stage::Finalized,
            Kind::HardyProportions => Stage::Proportions,
            Kind::HardyFis => Stage::Fis,
        }
    }

    /// The file name prefix and suffix around the population label
    fn affixes(self) -> (&'static str, &'static str) {
        match self {
            Kind::Poplist => ("", "_poplist.txt"),
            Kind::Log => ("", ".log"),
            Kind::SitePi => ("", ".sites.pi"),
            Kind::TajimaD => ("", ".Tajima.D"),
            Kind::Het => ("", ".het"),
            Kind::Hardy => ("", ".hwe"),
            Kind::PiTable => ("", "_Pi.csv"),
            Kind::TajimaTable => ("", "_TjD.csv"),
            Kind::HardyTable => ("", "_HWE.csv"),
            Kind::HardyProportions => ("prop_", "_HWE.csv"),
            Kind::HardyFis => ("FIS_", "_HWE.csv"),
        }
    }

    /// The finalized table produced from a raw vcftools table
    pub fn finalized(self) -> Option<Kind> {
        match self {
            Kind::SitePi => Some(Kind::PiTable),
            Kind::TajimaD => Some(Kind::TajimaTable),
            Kind::Hardy => Some(Kind::HardyTable),
            _ => None,
        }
    }

    /// Whether files of this kind are moved into the archive directory
    pub fn archived(self) -> bool {
        !matches!(self, Kind::TajimaD)
    }
}

/// A per-population file identified by what it holds rather than by name matching
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Artifact {
    pub kind: Kind,
    pub population: String,
}

impl Artifact {
    pub fn new(kind: Kind, population: &str) -> Self {
        Self {
            kind,
            population: population.to_string(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.kind.stage()
    }

    /// Same population, different kind
    pub fn with_kind(&self, kind: Kind) -> Self {
        Self::new(kind, &self.population)
    }

    pub fn file_name(&self) -> String {
        let (prefix, suffix) = self.kind.affixes();
        format!("{}{}{}", prefix, self.population, suffix)
    }

    pub fn path(&self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }

    /// Prefix passed to `vcftools --out`; vcftools appends its own suffix.
    pub fn out_prefix(population: &str, dir: &Path) -> PathBuf {
        dir.join(population)
    }

    /// Recognise a file name. When several kinds match, the one with the
    /// longest affixes wins, so `FIS_A_HWE.csv` is population `A`, not `FIS_A`.
    pub fn parse(file_name: &str) -> Option<Self> {
        Kind::ALL
            .iter()
            .filter_map(|&kind| {
                let (prefix, suffix) = kind.affixes();
                let population = file_name.strip_prefix(prefix)?.strip_suffix(suffix)?;
                if population.is_empty() {
                    return None;
                }
                Some((prefix.len() + suffix.len(), Self::new(kind, population)))
            })
            .max_by_key(|(affix_len, _)| *affix_len)
            .map(|(_, artifact)| artifact)
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_name())
    }
}
