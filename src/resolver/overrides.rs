//! Per-source exceptions to the extractor's output.
//!
//! Some sources produce payloads the extraction service handles badly
//! (comics, image-first pages). Rules are matched by URL prefix and applied
//! in declaration order; new exceptions are configuration, not code.

use serde::{Deserialize, Serialize};

use crate::domain::Article;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideAction {
    /// Keep the article's own stored content instead of the extracted one.
    UseArticleContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRule {
    pub prefix: String,
    pub action: OverrideAction,
}

impl OverrideRule {
    pub fn new(prefix: impl Into<String>, action: OverrideAction) -> Self {
        Self {
            prefix: prefix.into(),
            action,
        }
    }

    pub fn matches(&self, url: &str) -> bool {
        !self.prefix.is_empty() && url.starts_with(&self.prefix)
    }
}

/// Content fields that override rules may rewrite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentFields {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverrideTable {
    rules: Vec<OverrideRule>,
}

impl Default for OverrideTable {
    fn default() -> Self {
        Self {
            rules: vec![OverrideRule::new(
                "https://xkcd",
                OverrideAction::UseArticleContent,
            )],
        }
    }
}

impl OverrideTable {
    pub fn new(rules: Vec<OverrideRule>) -> Self {
        Self { rules }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn rules(&self) -> &[OverrideRule] {
        &self.rules
    }

    pub fn push(&mut self, rule: OverrideRule) {
        self.rules.push(rule);
    }

    pub fn matching<'a>(&'a self, url: &'a str) -> impl Iterator<Item = &'a OverrideRule> + 'a {
        self.rules.iter().filter(move |rule| rule.matches(url))
    }

    /// Apply every rule matching `article.url` to `fields`.
    /// Returns how many rules fired.
    pub fn apply(&self, article: &Article, fields: &mut ContentFields) -> usize {
        let mut applied = 0;
        for rule in self.matching(&article.url) {
            match rule.action {
                OverrideAction::UseArticleContent => {
                    fields.content = article.content.clone();
                }
            }
            applied += 1;
        }
        applied
    }
}
