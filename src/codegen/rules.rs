//! Emitting Rules
//!
//! Include/exclude identifier sets deciding which declarations a target
//! generates. A rule is one of:
//! - `*` (everything),
//! - `squareup.dinosaurs.*` (a package and its subpackages),
//! - `squareup.dinosaurs.Dinosaur` (a type, its nested types and members),
//! - `squareup.dinosaurs.Dinosaur#name` (one member).
//!
//! When both lists match, the more specific rule wins; ties go to the exclude.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use tracing::warn;

use crate::schema::ProtoType;

const WILDCARD: &str = "*";

#[derive(Debug, Clone)]
pub struct EmittingRules {
    includes: Vec<String>,
    excludes: Vec<String>,
    /// Empty includes mean `*` unless only explicit rules are honored
    implicit_wildcard: bool,
    /// Rules that matched at least once, shared with [`EmittingRules::explicit`]
    used: Rc<RefCell<BTreeSet<String>>>,
}

impl Default for EmittingRules {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

impl EmittingRules {
    pub fn new(includes: Vec<String>, excludes: Vec<String>) -> Self {
        Self {
            includes,
            excludes,
            implicit_wildcard: true,
            used: Rc::new(RefCell::new(BTreeSet::new())),
        }
    }

    /// The same rules without `*` includes, for files off the source path
    pub fn explicit(&self) -> Self {
        Self {
            includes: self.includes.iter().filter(|rule| *rule != WILDCARD).cloned().collect(),
            excludes: self.excludes.clone(),
            implicit_wildcard: false,
            used: Rc::clone(&self.used),
        }
    }

    /// Whether any include rule can match at all
    pub fn has_includes(&self) -> bool {
        self.implicit_wildcard || !self.includes.is_empty()
    }

    pub fn includes(&self, ty: &ProtoType) -> bool {
        self.includes_identifier(&ty.to_string())
    }

    pub fn includes_identifier(&self, identifier: &str) -> bool {
        let include = if self.includes.is_empty() && self.implicit_wildcard {
            Some((0, None))
        } else {
            best_match(&self.includes, identifier).map(|(score, rule)| (score, Some(rule)))
        };
        let exclude = best_match(&self.excludes, identifier);

        match (include, exclude) {
            (None, _) => false,
            (Some((include_score, _)), Some((exclude_score, rule))) if exclude_score >= include_score => {
                self.mark_used(rule);
                false
            }
            (Some((_, rule)), _) => {
                if let Some(rule) = rule {
                    self.mark_used(rule);
                }
                true
            }
        }
    }

    fn mark_used(&self, rule: &str) {
        self.used.borrow_mut().insert(rule.to_string());
    }

    pub fn unused_includes(&self) -> Vec<String> {
        let used = self.used.borrow();
        self.includes.iter().filter(|rule| !used.contains(*rule)).cloned().collect()
    }

    pub fn unused_excludes(&self) -> Vec<String> {
        let used = self.used.borrow();
        self.excludes.iter().filter(|rule| !used.contains(*rule)).cloned().collect()
    }

    /// Warn about rules that never matched a declaration
    pub fn log_unused(&self, target: &str) {
        for rule in self.unused_includes() {
            if rule != WILDCARD {
                warn!(target_name = target, rule = %rule, "Unused include rule");
            }
        }
        for rule in self.unused_excludes() {
            warn!(target_name = target, rule = %rule, "Unused exclude rule");
        }
    }
}

/// Score of the most specific rule matching `identifier`
fn best_match<'r>(rules: &'r [String], identifier: &str) -> Option<(usize, &'r str)> {
    rules
        .iter()
        .filter_map(|rule| specificity(rule, identifier).map(|score| (score, rule.as_str())))
        .max_by_key(|(score, _)| *score)
}

/// Longer matched prefixes are more specific; `*` matches with score 0
fn specificity(rule: &str, identifier: &str) -> Option<usize> {
    if rule == WILDCARD {
        return Some(0);
    }
    if let Some(package) = rule.strip_suffix(".*") {
        let matches = identifier
            .strip_prefix(package)
            .is_some_and(|rest| rest.starts_with('.'));
        return matches.then_some(package.len() + 1);
    }
    let matches = identifier == rule
        || identifier
            .strip_prefix(rule)
            .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('#'));
    matches.then_some(rule.len() + 1)
}
