//! Substitution rules and the ordered rule set

use std::collections::HashMap;

/// A single literal substitution: every occurrence of `pattern` becomes `replacement`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Literal text to search for (never empty)
    pub pattern: String,
    /// Text written in place of a match (may be empty)
    pub replacement: String,
}

impl Rule {
    /// Pattern length in bytes
    pub fn pattern_len(&self) -> usize {
        self.pattern.len()
    }

    /// Whether this rule deletes its matches
    pub fn is_deletion(&self) -> bool {
        self.replacement.is_empty()
    }
}

/// Ordered collection of rules with distinct patterns
///
/// Behaves as a mapping from pattern to replacement with last-write-wins
/// semantics. The position of a rule is fixed by the first time its pattern
/// was inserted; later inserts of the same pattern only update the
/// replacement. That position is the tie-break order used by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
    index: HashMap<String, usize>,
}

impl RuleSet {
    /// Create an empty rule set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a rule set from raw (pattern, replacement) pairs
    ///
    /// Pairs with an empty pattern are dropped. Never fails; the result may be empty.
    pub fn build<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut set = Self::new();
        set.extend(pairs);
        set
    }

    /// Insert a rule, returning `false` if it was dropped for having an empty pattern
    pub fn insert(&mut self, pattern: impl Into<String>, replacement: impl Into<String>) -> bool {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return false;
        }
        let replacement = replacement.into();

        match self.index.get(&pattern) {
            Some(&idx) => self.rules[idx].replacement = replacement,
            None => {
                self.index.insert(pattern.clone(), self.rules.len());
                self.rules.push(Rule {
                    pattern,
                    replacement,
                });
            }
        }
        true
    }

    /// True iff no rules remain after filtering
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Retained rules in first-insertion order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    /// Rule at a position in retained order
    pub fn rule(&self, index: usize) -> Option<&Rule> {
        self.rules.get(index)
    }

    /// Current replacement for a pattern
    pub fn get(&self, pattern: &str) -> Option<&str> {
        self.index
            .get(pattern)
            .map(|&idx| self.rules[idx].replacement.as_str())
    }

    /// Length in bytes of the longest pattern, or 0 for an empty set
    pub fn longest_pattern_len(&self) -> usize {
        self.rules.iter().map(Rule::pattern_len).max().unwrap_or(0)
    }
}

impl<K, V> Extend<(K, V)> for RuleSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (pattern, replacement) in iter {
            self.insert(pattern, replacement);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for RuleSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::build(iter)
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
