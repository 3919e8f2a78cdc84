//! Content policy: named denylist rule sets shared by every endpoint.
//!
//! Two built-in sets:
//! - `generic_xss`: script tags, `javascript:`/`vbscript:` URIs, any HTML tag.
//! - `image_prompt`: everything in `generic_xss` plus an explicit-content term list.
//!
//! All patterns are case-insensitive.

use std::sync::OnceLock;

use regex::Regex;

const SCRIPT_TAG: &str = r"(?i)<\s*/?\s*script\b";
const JAVASCRIPT_URI: &str = r"(?i)javascript\s*:";
const VBSCRIPT_URI: &str = r"(?i)vbscript\s*:";
const HTML_TAG: &str = r"<[^>]*>";
const EXPLICIT_TERMS: &str =
    r"(?i)\b(nude|nudity|naked|nsfw|porn\w*|sexual|sexy|explicit|erotic\w*|gore|gory|topless|genitals?)\b";

/// One named pattern.
#[derive(Debug, Clone)]
pub struct Rule {
    name: &'static str,
    pattern: Regex,
}

/// An ordered, named collection of denylist rules. The first matching rule wins.
#[derive(Debug, Clone)]
pub struct RuleSet {
    name: &'static str,
    rules: Vec<Rule>,
}

impl RuleSet {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self { name, rules: Vec::new() }
    }

    /// Append a rule.
    ///
    /// # Errors
    ///
    /// Returns the regex compile error if `pattern` is invalid.
    pub fn with_rule(mut self, name: &'static str, pattern: &str) -> Result<Self, regex::Error> {
        self.rules.push(Rule { name, pattern: Regex::new(pattern)? });
        Ok(self)
    }

    /// Append every rule of another set.
    #[must_use]
    pub fn extend(mut self, other: &RuleSet) -> Self {
        self.rules.extend(other.rules.iter().cloned());
        self
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Name of the first rule matching `text`, if any.
    #[must_use]
    pub fn first_violation(&self, text: &str) -> Option<&'static str> {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(text))
            .map(|rule| rule.name)
    }
}

fn build_generic_xss() -> Result<RuleSet, regex::Error> {
    RuleSet::new("generic_xss")
        .with_rule("script_tag", SCRIPT_TAG)?
        .with_rule("javascript_uri", JAVASCRIPT_URI)?
        .with_rule("vbscript_uri", VBSCRIPT_URI)?
        .with_rule("html_tag", HTML_TAG)
}

/// Rule set applied to every textual field of every inbound request.
///
/// # Panics
///
/// Panics only if a built-in pattern fails to compile, which the unit tests rule out.
#[must_use]
pub fn generic_xss() -> &'static RuleSet {
    static SET: OnceLock<RuleSet> = OnceLock::new();
    SET.get_or_init(|| build_generic_xss().expect("built-in generic_xss patterns compile"))
}

/// Rule set applied to image prompts.
///
/// # Panics
///
/// Panics only if a built-in pattern fails to compile, which the unit tests rule out.
#[must_use]
pub fn image_prompt() -> &'static RuleSet {
    static SET: OnceLock<RuleSet> = OnceLock::new();
    SET.get_or_init(|| {
        RuleSet::new("image_prompt")
            .extend(generic_xss())
            .with_rule("explicit_content", EXPLICIT_TERMS)
            .expect("built-in image_prompt patterns compile")
    })
}

#[cfg(test)]
#[path = "policy_test.rs"]
mod tests;
