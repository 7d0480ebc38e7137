//! Single-pass substitution over a document
//!
//! The engine walks the input once with a monotonic cursor. At each position
//! the longest matching pattern wins; equal lengths fall back to rule set
//! order. Replacement text is appended to a separate output buffer and never
//! scanned again, so one rule's output can't trigger another rule.

use std::borrow::Cow;
use std::ops::Range;

use crate::error::SubstituteError;
use crate::rule::{Rule, RuleSet};

/// One applied substitution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// Index of the rule in the rule set's retained order
    pub rule: usize,
    /// Byte offset where the consumed input starts
    pub start: usize,
    /// Byte offset where the consumed input ends (exclusive)
    pub end: usize,
}

impl Match {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Result of one pass over a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution<'d> {
    text: Cow<'d, str>,
    matches: Vec<Match>,
}

impl<'d> Substitution<'d> {
    fn unchanged(document: &'d str) -> Self {
        Self {
            text: Cow::Borrowed(document),
            matches: Vec::new(),
        }
    }

    /// The substituted document
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> Cow<'d, str> {
        self.text
    }

    /// Matches in input order; spans are disjoint and ascending
    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn replacement_count(&self) -> usize {
        self.matches.len()
    }

    /// True when no rule applied and the text is the input itself
    pub fn is_unchanged(&self) -> bool {
        self.matches.is_empty()
    }
}

/// A rule set prepared for scanning
///
/// Candidates are bucketed by the first byte of their pattern and each bucket
/// is ordered longest first. The sort is stable, so equal-length candidates
/// keep rule set order and the first candidate that matches is always the
/// best one at that position.
///
/// The engine holds no mutable state and can be shared between threads.
#[derive(Debug, Clone)]
pub struct SubstitutionEngine<'r> {
    rules: &'r RuleSet,
    buckets: Vec<Vec<usize>>,
}

impl<'r> SubstitutionEngine<'r> {
    pub fn new(rules: &'r RuleSet) -> Self {
        let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); 256];
        for (idx, rule) in rules.iter().enumerate() {
            // RuleSet never keeps empty patterns
            if let Some(&first) = rule.pattern.as_bytes().first() {
                buckets[first as usize].push(idx);
            }
        }
        for bucket in &mut buckets {
            bucket.sort_by_key(|&idx| std::cmp::Reverse(rules.rules()[idx].pattern_len()));
        }

        Self { rules, buckets }
    }

    pub fn rules(&self) -> &'r RuleSet {
        self.rules
    }

    /// Best rule matching at byte offset `pos`
    fn match_at(&self, haystack: &[u8], pos: usize) -> Option<usize> {
        let rest = &haystack[pos..];
        let first = *rest.first()?;
        self.buckets[first as usize]
            .iter()
            .copied()
            .find(|&idx| rest.starts_with(self.rules.rules()[idx].pattern.as_bytes()))
    }

    /// Iterate over the matches a pass over `document` would apply
    pub fn find_iter<'e, 'd>(&'e self, document: &'d str) -> Matches<'e, 'r, 'd> {
        Matches {
            engine: self,
            document,
            pos: 0,
        }
    }

    /// Number of substitutions a pass over `document` would make
    pub fn count(&self, document: &str) -> usize {
        if self.rules.is_empty() {
            return 0;
        }
        self.find_iter(document).count()
    }

    /// Apply the rule set to `document`
    ///
    /// Returns the input borrowed when nothing matched. Fails only when the
    /// output or match buffers cannot be allocated.
    pub fn apply<'d>(&self, document: &'d str) -> Result<Substitution<'d>, SubstituteError> {
        if document.is_empty() || self.rules.is_empty() {
            return Ok(Substitution::unchanged(document));
        }

        let mut output = String::new();
        let mut matches = Vec::new();
        // Start of the verbatim run not yet copied to output
        let mut copied = 0;

        for m in self.find_iter(document) {
            if matches.is_empty() {
                output.try_reserve(document.len())?;
            }
            let replacement = &self.rules.rules()[m.rule].replacement;
            push_str(&mut output, &document[copied..m.start])?;
            push_str(&mut output, replacement)?;
            matches.try_reserve(1)?;
            matches.push(m);
            copied = m.end;
        }

        if matches.is_empty() {
            return Ok(Substitution::unchanged(document));
        }
        push_str(&mut output, &document[copied..])?;

        Ok(Substitution {
            text: Cow::Owned(output),
            matches,
        })
    }
}

/// Append without ever hitting the infallible reallocation path
fn push_str(buf: &mut String, s: &str) -> Result<(), SubstituteError> {
    buf.try_reserve(s.len())?;
    buf.push_str(s);
    Ok(())
}

/// Iterator over the matches of one pass, in input order
#[derive(Debug, Clone)]
pub struct Matches<'e, 'r, 'd> {
    engine: &'e SubstitutionEngine<'r>,
    document: &'d str,
    pos: usize,
}

impl<'e, 'r, 'd> Matches<'e, 'r, 'd> {
    /// Rule that produced a match
    pub fn rule(&self, m: &Match) -> &'r Rule {
        &self.engine.rules.rules()[m.rule]
    }
}

impl Iterator for Matches<'_, '_, '_> {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        let haystack = self.document.as_bytes();

        while self.pos < haystack.len() {
            if let Some(rule) = self.engine.match_at(haystack, self.pos) {
                let start = self.pos;
                self.pos += self.engine.rules.rules()[rule].pattern_len();
                return Some(Match {
                    rule,
                    start,
                    end: self.pos,
                });
            }

            // No match: step over exactly one codepoint
            self.pos += self.document[self.pos..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);
        }

        None
    }
}

/// Apply `rules` to `document` in a single pass
///
/// Convenience wrapper that prepares a throwaway engine. Prefer
/// [`SubstitutionEngine`] when the same rule set is applied repeatedly.
pub fn apply<'d>(document: &'d str, rules: &RuleSet) -> Result<Cow<'d, str>, SubstituteError> {
    let engine = SubstitutionEngine::new(rules);
    Ok(engine.apply(document)?.into_text())
}
