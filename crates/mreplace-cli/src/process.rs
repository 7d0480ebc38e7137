//! Document processing: read, substitute, describe, write

use anyhow::{Context, Result};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use mreplace_core::SubstitutionEngine;

use crate::output::EditInfo;

/// Where the document text comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Stdin,
    File(PathBuf),
}

impl DocumentSource {
    /// `-` means standard input
    pub fn from_arg(path: &Path) -> Self {
        if path.as_os_str() == "-" {
            DocumentSource::Stdin
        } else {
            DocumentSource::File(path.to_path_buf())
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            DocumentSource::Stdin => None,
            DocumentSource::File(path) => Some(path),
        }
    }

    /// Read the whole document as UTF-8
    pub fn read(&self) -> Result<String> {
        match self {
            DocumentSource::Stdin => {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("Failed to read document from stdin")?;
                Ok(buf)
            }
            DocumentSource::File(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read file: {}", path.display())),
        }
    }
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::Stdin => f.write_str("<stdin>"),
            DocumentSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Result of processing a single document
pub struct ProcessResult {
    /// Substitutions that were found
    pub edits: Vec<EditInfo>,
    /// Original text
    pub old_source: String,
    /// New text after substitution (only if something matched)
    pub new_source: Option<String>,
}

impl ProcessResult {
    pub fn has_changes(&self) -> bool {
        self.new_source.is_some()
    }

    /// Text to hand to the sink: the new text if anything changed, else the original
    pub fn final_text(&self) -> &str {
        self.new_source.as_deref().unwrap_or(&self.old_source)
    }
}

/// Apply the engine to a document and describe every substitution
#[tracing::instrument(level = "debug", skip_all, fields(bytes = source_code.len()))]
pub fn process_document(source_code: String, engine: &SubstitutionEngine<'_>) -> Result<ProcessResult> {
    let (edits, new_source) = {
        let substitution = engine
            .apply(&source_code)
            .context("Failed to apply replacement rules")?;

        if substitution.is_unchanged() {
            (Vec::new(), None)
        } else {
            let rules = engine.rules();
            let mut positions = LineTracker::new(&source_code);
            let edits: Vec<EditInfo> = substitution
                .matches()
                .iter()
                .map(|m| {
                    let rule = &rules.rules()[m.rule];
                    let (line, column) = positions.advance_to(m.start);
                    EditInfo {
                        rule: rule.pattern.clone(),
                        replacement: rule.replacement.clone(),
                        line,
                        column,
                        message: describe(&rule.pattern, &rule.replacement),
                    }
                })
                .collect();
            (edits, Some(substitution.into_text().into_owned()))
        }
    };

    tracing::debug!(replacements = edits.len(), "substitution finished");

    Ok(ProcessResult {
        edits,
        old_source: source_code,
        new_source,
    })
}

/// Write the processed result to the file
pub fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write file: {}", path.display()))
}

fn describe(pattern: &str, replacement: &str) -> String {
    if replacement.is_empty() {
        format!("Delete {:?}", pattern)
    } else {
        format!("Replace {:?} with {:?}", pattern, replacement)
    }
}

/// Converts ascending byte offsets to 1-based line/column without rescanning
struct LineTracker<'a> {
    source: &'a str,
    offset: usize,
    line: usize,
    column: usize,
}

impl<'a> LineTracker<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Offsets must be non-decreasing and on char boundaries
    fn advance_to(&mut self, offset: usize) -> (usize, usize) {
        for ch in self.source[self.offset..offset].chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.offset = offset;
        (self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mreplace_core::RuleSet;
    use tempfile::TempDir;

    #[test]
    fn test_line_tracker() {
        let source = "line1\nline2\nline3";
        let mut tracker = LineTracker::new(source);
        assert_eq!(tracker.advance_to(0), (1, 1));
        assert_eq!(tracker.advance_to(5), (1, 6)); // newline
        assert_eq!(tracker.advance_to(6), (2, 1)); // start of line2
        assert_eq!(tracker.advance_to(12), (3, 1)); // start of line3
    }

    #[test]
    fn test_line_tracker_counts_codepoints() {
        let source = "日本語 cat";
        let mut tracker = LineTracker::new(source);
        assert_eq!(tracker.advance_to(source.find("cat").unwrap()), (1, 5));
    }

    #[test]
    fn test_process_document_with_changes() {
        let rules = RuleSet::build([("cat", "dog"), ("this", "")]);
        let engine = SubstitutionEngine::new(&rules);

        let result = process_document("a cat\nremove this cat".to_string(), &engine).unwrap();

        assert!(result.has_changes());
        assert_eq!(result.final_text(), "a dog\nremove  dog");
        assert_eq!(result.edits.len(), 3);
        assert_eq!((result.edits[0].line, result.edits[0].column), (1, 3));
        assert_eq!((result.edits[1].line, result.edits[1].column), (2, 8));
        assert_eq!(result.edits[1].message, "Delete \"this\"");
        assert_eq!(result.edits[2].message, "Replace \"cat\" with \"dog\"");
    }

    #[test]
    fn test_process_document_without_changes() {
        let rules = RuleSet::build([("zzz", "y")]);
        let engine = SubstitutionEngine::new(&rules);

        let result = process_document("nothing".to_string(), &engine).unwrap();

        assert!(!result.has_changes());
        assert!(result.edits.is_empty());
        assert_eq!(result.final_text(), "nothing");
    }

    #[test]
    fn test_document_source_from_arg() {
        assert_eq!(DocumentSource::from_arg(Path::new("-")), DocumentSource::Stdin);
        let source = DocumentSource::from_arg(Path::new("notes.txt"));
        assert_eq!(source.path(), Some(Path::new("notes.txt")));
        assert_eq!(source.to_string(), "notes.txt");
        assert_eq!(DocumentSource::Stdin.to_string(), "<stdin>");
    }

    #[test]
    fn test_read_and_write_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("doc.txt");
        write_file(&path, "héllo").unwrap();

        let source = DocumentSource::File(path);
        assert_eq!(source.read().unwrap(), "héllo");
    }

    #[test]
    fn test_read_invalid_utf8_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bin.dat");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        assert!(DocumentSource::File(path).read().is_err());
    }
}
