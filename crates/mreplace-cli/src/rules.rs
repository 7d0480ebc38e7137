//! Rule suppliers: config tables, rule files and command-line pairs
//!
//! Rule files are TOML or JSON, chosen by extension:
//!
//! ```toml
//! [[rules]]
//! from = "colour"
//! to = "color"
//! ```
//!
//! ```json
//! [{"from": "colour", "to": "color"}, ["flavour", "flavor"]]
//! ```

use anyhow::{Context, Result};
use mreplace_core::RuleSet;
use serde::Deserialize;
use std::path::Path;

/// One raw (before, after) pair as written by the user
///
/// No filtering happens here; empty patterns are dropped when the rule set is built.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RuleEntry {
    Table {
        from: String,
        #[serde(default)]
        to: String,
    },
    Pair(String, String),
}

impl RuleEntry {
    pub fn into_pair(self) -> (String, String) {
        match self {
            RuleEntry::Table { from, to } => (from, to),
            RuleEntry::Pair(from, to) => (from, to),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TomlRulesFile {
    rules: Vec<RuleEntry>,
}

/// Load rule entries from a `.json` or `.toml` file
pub fn load_rules_file(path: &Path) -> Result<Vec<RuleEntry>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read rules file: {}", path.display()))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let entries = if is_json {
        serde_json::from_str::<Vec<RuleEntry>>(&contents)
            .with_context(|| format!("Failed to parse rules file: {}", path.display()))?
    } else {
        toml::from_str::<TomlRulesFile>(&contents)
            .with_context(|| format!("Failed to parse rules file: {}", path.display()))?
            .rules
    };

    tracing::debug!(path = %path.display(), count = entries.len(), "loaded rules file");
    Ok(entries)
}

/// Turn flat `--replace FROM TO` values into entries
pub fn entries_from_args(values: &[String]) -> Vec<RuleEntry> {
    values
        .chunks_exact(2)
        .map(|pair| RuleEntry::Pair(pair[0].clone(), pair[1].clone()))
        .collect()
}

/// Collect command-line rule sources in supply order
///
/// Returns `None` when neither rule files nor `--replace` pairs were given,
/// meaning the config's rules should be used.
pub fn collect_cli_rules(
    rule_files: &[impl AsRef<Path>],
    replace_args: &[String],
) -> Result<Option<Vec<RuleEntry>>> {
    if rule_files.is_empty() && replace_args.is_empty() {
        return Ok(None);
    }

    let mut entries = Vec::new();
    for file in rule_files {
        entries.extend(load_rules_file(file.as_ref())?);
    }
    entries.extend(entries_from_args(replace_args));

    Ok(Some(entries))
}

/// Build the rule set, logging pairs dropped for an empty pattern
pub fn build_rule_set(pairs: Vec<(String, String)>) -> RuleSet {
    let mut rules = RuleSet::new();
    for (position, (from, to)) in pairs.into_iter().enumerate() {
        if let Some(previous) = rules.get(&from) {
            tracing::debug!(pattern = %from, previous, replacement = %to, "later rule overrides earlier one");
        }
        if !rules.insert(from, to) {
            tracing::warn!(position = position + 1, "ignoring rule with empty search text");
        }
    }
    rules
}
