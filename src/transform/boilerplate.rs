//! Export boilerplate filters.
//!
//! Blogging platforms wrap exported posts in author bylines, follow buttons
//! and reading-time badges that are noise in an archive. Each platform's
//! pattern is one [`BoilerplateRule`] variant; rules that do not match are
//! no-ops.

use crate::config::HeaderPolicy;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Medium byline: one or more links on a line, the last of which carries
/// the `-----<post id>--------------------------------` tracking marker,
/// followed by a blank line. The label of that last link is captured.
static MEDIUM_BYLINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?:\[[^\n]*\]\([^\n]*?\))?",
        r"\[(?P<label>[^\[\]\n]*)\]",
        r"\([^()\s]*-----[^()\s]*?--------------------------------\)",
        r"\n\n",
    ))
    .unwrap()
});

/// A boilerplate pattern and what to do with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoilerplateRule {
    /// Medium's author/date byline block.
    MediumByline(HeaderPolicy),
}

impl BoilerplateRule {
    /// Built-in rules for a header policy.
    pub fn defaults(policy: HeaderPolicy) -> Vec<BoilerplateRule> {
        vec![BoilerplateRule::MediumByline(policy)]
    }

    pub fn apply(&self, markdown: &str) -> String {
        match self {
            BoilerplateRule::MediumByline(policy) => MEDIUM_BYLINE
                .replace_all(markdown, |caps: &Captures<'_>| {
                    medium_byline_replacement(&caps["label"], *policy)
                })
                .into_owned(),
        }
    }
}

fn medium_byline_replacement(label: &str, policy: HeaderPolicy) -> String {
    let label = label.trim();
    match policy {
        HeaderPolicy::KeepReadingTime if label.ends_with("read") => {
            let kept = label.split('·').next().unwrap_or_default().trim();
            format!("{kept}\n\n---\n\n")
        }
        _ => String::new(),
    }
}

/// Apply every rule in order.
pub fn strip_boilerplate(markdown: &str, rules: &[BoilerplateRule]) -> String {
    rules
        .iter()
        .fold(markdown.to_string(), |text, rule| rule.apply(&text))
}
