//! Prompt document schema.
//!
//! A prompt config is a YAML document with one required field, `template`,
//! holding a Tera template. Example:
//!
//! ```yaml
//! name: question_and_answer
//! description: Generate grounded question/answer pairs
//! expected_inputs: [dataset_entry, user_supplied_suffix]
//! template: |
//!   Context: {{ dataset_entry }}
//!   {{ user_supplied_suffix }}
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::TemplateError;

/// A prompt config as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptDocument {
    /// Informational name; the file stem is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Free-form description of what the prompt produces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Placeholders that must have a value at render time.
    ///
    /// Discovered from the template body when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_inputs: Option<Vec<String>>,

    /// Tera template body.
    #[serde(alias = "raw_text")]
    pub template: String,
}

impl PromptDocument {
    /// Parses a document from YAML text. `path` is only used in error messages.
    pub fn from_yaml(content: &str, path: &str) -> Result<Self, TemplateError> {
        let document: PromptDocument =
            serde_yaml::from_str(content).map_err(|e| TemplateError::ParseError {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        if document.template.trim().is_empty() {
            return Err(TemplateError::EmptyTemplate(path.to_string()));
        }
        Ok(document)
    }

    /// Placeholders that must be resolvable when rendering.
    pub fn required_placeholders(&self) -> Vec<String> {
        match &self.expected_inputs {
            Some(inputs) => inputs.clone(),
            None => discover_placeholders(&self.template),
        }
    }
}

/// Collects the root variable names referenced by `{{ ... }}` expressions.
///
/// The iterable of a `{% for %}` loop is also a placeholder. Names bound inside
/// the template by `{% for %}` or `{% set %}` are excluded. Expression
/// references come first, in order of appearance, followed by loop iterables.
pub fn discover_placeholders(template: &str) -> Vec<String> {
    let (Ok(expr), Ok(for_binding), Ok(set_binding)) = (
        Regex::new(r"\{\{-?\s*([A-Za-z_][A-Za-z0-9_]*)"),
        Regex::new(
            r"\{%-?\s*for\s+([A-Za-z_][A-Za-z0-9_]*)(?:\s*,\s*([A-Za-z_][A-Za-z0-9_]*))?\s+in\s+([A-Za-z_][A-Za-z0-9_]*)",
        ),
        Regex::new(r"\{%-?\s*set(?:_global)?\s+([A-Za-z_][A-Za-z0-9_]*)\s*="),
    ) else {
        return Vec::new();
    };

    let mut bound: Vec<&str> = vec!["loop"];
    let mut iterables: Vec<&str> = Vec::new();
    for caps in for_binding.captures_iter(template) {
        bound.extend([caps.get(1), caps.get(2)].into_iter().flatten().map(|m| m.as_str()));
        if let Some(iterable) = caps.get(3) {
            iterables.push(iterable.as_str());
        }
    }
    for caps in set_binding.captures_iter(template) {
        if let Some(name) = caps.get(1) {
            bound.push(name.as_str());
        }
    }

    let referenced = expr
        .captures_iter(template)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .chain(iterables);

    let mut placeholders: Vec<String> = Vec::new();
    for name in referenced {
        if is_literal_keyword(name) || bound.contains(&name) {
            continue;
        }
        if !placeholders.iter().any(|p| p == name) {
            placeholders.push(name.to_string());
        }
    }
    placeholders
}

fn is_literal_keyword(name: &str) -> bool {
    matches!(name, "true" | "false" | "True" | "False" | "not")
}
