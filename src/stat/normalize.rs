use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;
use log::info;
use std::fs;
use std::path::Path;

use crate::core::artifact::{Artifact, Kind};
use crate::core::table::Table;
use crate::stat::report::Outcome;

/// Header written over vcftools' Hardy-Weinberg header. vcftools packs the
/// genotype counts as `HOM1/HET/HOM2`, which splitting on `/` unpacks into
/// these columns.
pub const HARDY_HEADER: [&str; 12] = [
    "CHR",
    "POS",
    "OBS_HOM1",
    "OBS_HET",
    "OBS_HOM2",
    "EXP_HOM1",
    "EXP_HET",
    "EXP_HOM2",
    "ChiSq_HWE",
    "P_HWE",
    "P_HET_DEFICIT",
    "P_HET_EXCESS",
];

const MISSING_TOKENS: [&str; 2] = ["nan", "-nan"];

/// Characters that separate fields in each raw vcftools table
fn separators(kind: Kind) -> &'static [char] {
    match kind {
        Kind::Hardy => &['\t', '/'],
        _ => &['\t'],
    }
}

fn is_missing(field: &str) -> bool {
    let field = field.trim();
    MISSING_TOKENS
        .iter()
        .any(|token| field.eq_ignore_ascii_case(token))
}

/// Rewrite delimited text as comma-separated, with missing-value tokens
/// replaced by `0`. Blank lines are dropped. Comma-separated input without
/// missing tokens comes back unchanged.
pub fn normalize_delimiters(text: &str, separators: &[char]) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines().filter(|line| !line.trim().is_empty()) {
        let fields: Vec<&str> = line
            .split(|c| separators.contains(&c))
            .map(|field| if is_missing(field) { "0" } else { field })
            .collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

/// Replace the first line with [`HARDY_HEADER`] if it is vcftools' header.
pub fn replace_hardy_header(text: &str) -> Option<String> {
    let (first, rest) = text.split_once('\n').unwrap_or((text, ""));
    if !first.contains("P_HET_EXCESS") {
        return None;
    }
    Some(format!("{}\n{}", HARDY_HEADER.join(","), rest))
}

/// Normalise raw vcftools text of `kind` into a table with an averages row.
pub fn normalize_text(text: &str, kind: Kind) -> Result<Option<Table>> {
    let text = if kind == Kind::Hardy {
        match replace_hardy_header(text) {
            Some(text) => text,
            None => return Ok(None),
        }
    } else {
        text.to_string()
    };

    let normalized = normalize_delimiters(&text, separators(kind));
    let mut table = Table::from_reader(normalized.as_bytes(), b',')?;
    table.append_averages();
    Ok(Some(table))
}

/// Normalise a raw vcftools table in place, then rename it to its finalized name.
pub fn finalize(dir: &Path, raw: &Artifact) -> Result<Outcome> {
    let Some(finalized_kind) = raw.kind.finalized() else {
        bail!("{} is not a table that can be finalized", raw);
    };

    let raw_path = raw.path(dir);
    if !raw_path.is_file() {
        return Ok(Outcome::Skipped(format!("{} not found", raw)));
    }

    let text = fs::read_to_string(&raw_path)
        .wrap_err_with(|| format!("Failed to read {}", raw_path.display()))?;
    let table = match normalize_text(&text, raw.kind) {
        Ok(Some(table)) => table,
        Ok(None) => {
            return Ok(Outcome::Skipped(format!(
                "{} has no P_HET_EXCESS header line",
                raw
            )))
        }
        Err(e) => return Ok(Outcome::Failed(format!("{:#}", e))),
    };

    table.write_path(&raw_path)?;
    let finalized = raw.with_kind(finalized_kind);
    let finalized_path = finalized.path(dir);
    fs::rename(&raw_path, &finalized_path).wrap_err_with(|| {
        format!(
            "Failed to rename {} to {}",
            raw_path.display(),
            finalized_path.display()
        )
    })?;

    info!(
        "Averaged {} row(s) of {} into {}",
        table.num_rows().saturating_sub(1),
        raw,
        finalized
    );
    Ok(Outcome::Processed)
}
