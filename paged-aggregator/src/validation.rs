//! Field-level validators used to gate form submission.
//!
//! Failures are values, not errors: a form shows the `reason` inline and
//! keeps its submit control disabled until every field reports valid.

use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    pub reason: Option<String>,
}

impl Validation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

pub fn required(value: &str) -> Validation {
    if value.trim().is_empty() {
        Validation::fail("This field is required")
    } else {
        Validation::ok()
    }
}

/// Empty input passes; pair with `required` when the field is mandatory.
pub fn email(value: &str) -> Validation {
    let value = value.trim();
    if value.is_empty() || email_regex().is_match(value) {
        Validation::ok()
    } else {
        Validation::fail("Enter a valid email address")
    }
}

pub fn min_length(value: &str, min: usize) -> Validation {
    let len = value.trim().chars().count();
    if len == 0 || len >= min {
        Validation::ok()
    } else {
        Validation::fail(format!("Must be at least {} characters", min))
    }
}

pub fn max_length(value: &str, max: usize) -> Validation {
    if value.chars().count() <= max {
        Validation::ok()
    } else {
        Validation::fail(format!("Must be at most {} characters", max))
    }
}

/// Empty input passes; otherwise an absolute http(s) URL is required.
pub fn url(value: &str) -> Validation {
    let value = value.trim();
    if value.is_empty() {
        return Validation::ok();
    }
    match Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some() => Validation::ok(),
        _ => Validation::fail("Enter a valid URL"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Required,
    Email,
    MinLength(usize),
    MaxLength(usize),
    Url,
}

impl Rule {
    pub fn check(&self, value: &str) -> Validation {
        match self {
            Rule::Required => required(value),
            Rule::Email => email(value),
            Rule::MinLength(min) => min_length(value, *min),
            Rule::MaxLength(max) => max_length(value, *max),
            Rule::Url => url(value),
        }
    }
}

/// Rules per field of one form.
#[derive(Debug, Clone, Default)]
pub struct FormValidator {
    fields: BTreeMap<String, Vec<Rule>>,
}

impl FormValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.fields.entry(name.into()).or_default().extend(rules);
        self
    }

    /// Validates every configured field; a missing value counts as empty.
    /// Each field reports its first failing rule.
    pub fn validate(&self, values: &HashMap<String, String>) -> FormReport {
        let fields = self
            .fields
            .iter()
            .map(|(name, rules)| {
                let value = values.get(name).map(String::as_str).unwrap_or("");
                let result = rules
                    .iter()
                    .map(|rule| rule.check(value))
                    .find(|validation| !validation.valid)
                    .unwrap_or_else(Validation::ok);
                (name.clone(), result)
            })
            .collect();
        FormReport { fields }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormReport {
    pub fields: BTreeMap<String, Validation>,
}

impl FormReport {
    pub fn can_submit(&self) -> bool {
        self.fields.values().all(|validation| validation.valid)
    }

    pub fn reason(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(|validation| validation.reason.as_deref())
    }

    pub fn invalid_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, validation)| !validation.valid)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
