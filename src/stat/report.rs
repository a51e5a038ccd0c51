use log::{info, warn};
use std::fmt;

/// One unit of pipeline work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    SitePi,
    TajimaD,
    Filter,
    Het,
    Hardy,
    NormalizePi,
    NormalizeTajima,
    NormalizeHardy,
    Proportions,
    Fis,
    Summary,
    CombineHet,
    Archive,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::SitePi => "site-pi",
            Step::TajimaD => "tajima-d",
            Step::Filter => "maf/thin filter",
            Step::Het => "het",
            Step::Hardy => "hardy",
            Step::NormalizePi => "normalize pi",
            Step::NormalizeTajima => "normalize tajima-d",
            Step::NormalizeHardy => "normalize hardy",
            Step::Proportions => "proportions",
            Step::Fis => "fis",
            Step::Summary => "summary",
            Step::CombineHet => "combine het",
            Step::Archive => "archive",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Processed,
    Skipped(String),
    Failed(String),
}

impl Outcome {
    pub fn is_processed(&self) -> bool {
        matches!(self, Outcome::Processed)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Processed => write!(f, "processed"),
            Outcome::Skipped(reason) => write!(f, "skipped: {}", reason),
            Outcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StepRecord {
    pub step: Step,
    /// Population label or file the step ran on
    pub target: String,
    pub outcome: Outcome,
}

/// Outcomes of every step of a run, in execution order
#[derive(Debug, Default)]
pub struct RunReport {
    records: Vec<StepRecord>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, step: Step, target: impl Into<String>, outcome: Outcome) {
        let target = target.into();
        match &outcome {
            Outcome::Processed => {}
            Outcome::Skipped(reason) => warn!("Skipping {} for {}: {}", step, target, reason),
            Outcome::Failed(reason) => warn!("{} failed for {}: {}", step, target, reason),
        }
        self.records.push(StepRecord {
            step,
            target,
            outcome,
        });
    }

    pub fn processed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Processed))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.records.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn log_summary(&self) {
        for record in self.records.iter().filter(|r| !r.outcome.is_processed()) {
            warn!("{} [{}]: {}", record.step, record.target, record.outcome);
        }
        info!(
            "Run finished: {} step(s) processed, {} skipped, {} failed",
            self.processed(),
            self.skipped(),
            self.failed()
        );
    }
}
