//! Output formatting for mreplace
//!
//! Supports text (colored terminal), JSON and unified diff output formats.

use colored::*;
use serde::Serialize;
use std::io::{self, Write};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Diff,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<OutputFormat> {
        match s.to_lowercase().as_str() {
            "text" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            "diff" => Some(OutputFormat::Diff),
            _ => None,
        }
    }
}

/// Information about a single substitution
#[derive(Debug, Clone, Serialize)]
pub struct EditInfo {
    /// Pattern of the rule that matched
    pub rule: String,
    pub replacement: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Outcome for the processed document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Unchanged,
    Preview,
    Applied,
    Declined,
    Error,
}

/// Result of processing the document
#[derive(Debug, Clone, Serialize)]
pub struct DocumentResult {
    pub path: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub edits: Vec<EditInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentResult {
    pub fn success(path: &str, status: Status, edits: Vec<EditInfo>) -> Self {
        Self {
            path: path.to_string(),
            status,
            edits,
            error: None,
        }
    }

    pub fn error(path: &str, error: String) -> Self {
        Self {
            path: path.to_string(),
            status: Status::Error,
            edits: Vec::new(),
            error: Some(error),
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.edits.is_empty()
    }
}

/// Summary statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub rules: usize,
    pub replacements: usize,
    pub changed: bool,
    pub written: bool,
    pub errors: usize,
}

/// Full JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput {
    pub version: String,
    pub summary: Summary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentResult>,
}

/// Reporter for accumulating and outputting results
pub struct Reporter<W: Write> {
    out: W,
    format: OutputFormat,
    verbose: bool,
    result: Option<DocumentResult>,
    summary: Summary,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, format: OutputFormat, verbose: bool, rule_count: usize) -> Self {
        Self {
            out,
            format,
            verbose,
            result: None,
            summary: Summary {
                rules: rule_count,
                ..Summary::default()
            },
        }
    }

    fn record(&mut self, result: DocumentResult) {
        if result.has_changes() {
            self.summary.changed = true;
            self.summary.replacements = result.edits.len();
        }
        self.result = Some(result);
    }

    /// Report what would change (check mode, or before a commit decision)
    pub fn report_check(&mut self, path: &str, edits: Vec<EditInfo>, old_source: &str, new_source: &str) -> io::Result<()> {
        match self.format {
            OutputFormat::Text => {
                writeln!(self.out, "{}", path.bold())?;
                write_diff(&mut self.out, old_source, new_source)?;
                writeln!(self.out)?;
                write_rule_counts(&mut self.out, &edits)?;
                writeln!(self.out)?;
            }
            OutputFormat::Diff => {
                write_unified_diff(&mut self.out, path, old_source, new_source)?;
            }
            OutputFormat::Json => {
                // JSON output is handled in finish()
            }
        }

        self.record(DocumentResult::success(path, Status::Preview, edits));
        Ok(())
    }

    /// Report a document after its changes were written to the sink
    pub fn report_fix(&mut self, path: &str, edits: Vec<EditInfo>) -> io::Result<()> {
        self.summary.written = true;

        if self.format == OutputFormat::Text {
            writeln!(self.out, "{}", path.bold())?;
            writeln!(self.out, "  {} Applied {} replacement(s)", "OK".green(), edits.len())?;
            if self.verbose {
                write_rule_counts(&mut self.out, &edits)?;
            }
            writeln!(self.out)?;
        }

        self.record(DocumentResult::success(path, Status::Applied, edits));
        Ok(())
    }

    /// Report a document whose changes were rejected at the commit gate
    pub fn report_declined(&mut self, path: &str, edits: Vec<EditInfo>) -> io::Result<()> {
        if self.format == OutputFormat::Text {
            writeln!(self.out, "{}: {}", path, "Changes discarded".yellow())?;
        }

        self.record(DocumentResult::success(path, Status::Declined, edits));
        Ok(())
    }

    /// Report a document no rule matched
    pub fn report_skipped(&mut self, path: &str) -> io::Result<()> {
        if self.format == OutputFormat::Text {
            writeln!(self.out, "{}: No replacements made", path)?;
        }
        self.record(DocumentResult::success(path, Status::Unchanged, vec![]));
        Ok(())
    }

    /// Report an error processing the document
    pub fn report_error(&mut self, path: &str, error: &str) -> io::Result<()> {
        self.summary.errors += 1;

        if self.format == OutputFormat::Text {
            writeln!(self.out, "{}: {} - {}", "Warning".yellow(), path, error)?;
        }

        self.record(DocumentResult::error(path, error.to_string()));
        Ok(())
    }

    /// Print final summary/output
    pub fn finish(mut self, check_mode: bool) -> io::Result<W> {
        match self.format {
            OutputFormat::Text => {
                if self.verbose || self.summary.changed {
                    writeln!(self.out, "{}", "Summary".bold().underline())?;
                    writeln!(self.out, "  Rules: {}", self.summary.rules)?;
                    writeln!(self.out, "  Replacements: {}", self.summary.replacements)?;
                    if self.summary.errors > 0 {
                        writeln!(self.out, "  Errors: {}", self.summary.errors)?;
                    }
                }

                if check_mode && self.summary.changed {
                    writeln!(self.out)?;
                    writeln!(self.out, "{}", "Run with --fix to apply changes".yellow())?;
                }
            }
            OutputFormat::Json => {
                let output = JsonOutput {
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    summary: self.summary,
                    document: self.result,
                };
                serde_json::to_writer_pretty(&mut self.out, &output)?;
                writeln!(self.out)?;
            }
            OutputFormat::Diff => {
                // Patch-compatible output carries no summary
            }
        }

        self.out.flush()?;
        Ok(self.out)
    }

    /// Get summary for exit code determination
    pub fn summary(&self) -> &Summary {
        &self.summary
    }
}

/// Per-rule match counts in first-seen order
fn write_rule_counts(out: &mut impl Write, edits: &[EditInfo]) -> io::Result<()> {
    let mut counts: Vec<(&EditInfo, usize)> = Vec::new();
    for edit in edits {
        match counts.iter_mut().find(|(seen, _)| seen.rule == edit.rule) {
            Some((_, count)) => *count += 1,
            None => counts.push((edit, 1)),
        }
    }

    for (edit, count) in counts {
        writeln!(out, "  {} {} (x{})", "->".green(), edit.message, count)?;
    }
    Ok(())
}

/// Write a colored diff of the changed lines
fn write_diff(out: &mut impl Write, old: &str, new: &str) -> io::Result<()> {
    for diff_result in diff::lines(old, new) {
        match diff_result {
            diff::Result::Left(l) => {
                writeln!(out, "  {}", format!("- {}", l).red())?;
            }
            diff::Result::Right(r) => {
                writeln!(out, "  {}", format!("+ {}", r).green())?;
            }
            diff::Result::Both(_, _) => {
                // Skip unchanged lines for cleaner output
            }
        }
    }
    Ok(())
}

/// Write unified diff format (standard diff -u compatible)
fn write_unified_diff(out: &mut impl Write, path: &str, old: &str, new: &str) -> io::Result<()> {
    use similar::{ChangeTag, TextDiff};

    let diff = TextDiff::from_lines(old, new);

    writeln!(out, "--- a/{}", path)?;
    writeln!(out, "+++ b/{}", path)?;

    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        writeln!(out, "{}", hunk.header())?;
        for change in hunk.iter_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => "-",
                ChangeTag::Insert => "+",
                ChangeTag::Equal => " ",
            };
            write!(out, "{}{}", sign, change)?;
            if change.missing_newline() {
                writeln!(out)?;
            }
        }
    }
    Ok(())
}
