//! Versioned prompt templates.
//!
//! A [`PromptRegistry`] maps a task id to a [`PromptTemplate`]. Templates use
//! `{name}` placeholders; `{{` and `}}` produce literal braces. Every
//! placeholder must be supplied by the caller; there are no defaults.
//!
//! ```
//! use std::collections::BTreeMap;
//! use taskroute::prompts::PromptRegistry;
//!
//! let registry = PromptRegistry::builtin();
//! let mut values = BTreeMap::new();
//! values.insert("content".to_string(), "Buy cheap watches!!!".to_string());
//!
//! let (prompt, version) = registry.render("moderator", &values).unwrap();
//! assert!(prompt.contains("Content: Buy cheap watches!!!"));
//! assert_eq!(version, "v1.0");
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Template text plus the version tag recorded alongside every rendering.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PromptTemplate {
    pub template: String,
    pub version: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            version: version.into(),
        }
    }

    /// Names of every placeholder in order of first appearance.
    pub fn placeholders(&self) -> std::result::Result<Vec<String>, String> {
        let mut names = Vec::new();
        for segment in parse(&self.template)? {
            if let Segment::Placeholder(name) = segment
                && !names.iter().any(|n| n == name)
            {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }
}

const MODERATOR_TEMPLATE: &str = "\
You are a content moderator. Review the following content for any inappropriate, harmful, or unsafe material.

Content: {content}

Please analyze the content and provide:
1. A safety assessment
2. Any concerning elements
3. Recommendations for improvement

Your response:";

const THEME_CODER_TEMPLATE: &str = "\
You are an expert at extracting key emotional or conceptual themes from user feedback.

Given the following feedback, identify and summarize the main themes (e.g., frustration with onboarding, joy around collaboration tools, confusion about pricing, etc.):

Feedback: {requirements}

Please provide:
1. A list of the main themes you identified
2. A brief explanation for each theme
3. Any suggestions for addressing negative themes

Your response:";

const TRANSLATOR_TEMPLATE: &str = "\
You are a translator. Translate the following text from {source_language} to {target_language}:

Text: {text}

Please provide:
1. The translated text
2. Any cultural context notes if relevant

Your response:";

/// Lookup table from task id to template.
#[derive(Debug, Clone, Default)]
pub struct PromptRegistry {
    templates: HashMap<String, PromptTemplate>,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock templates for `moderator`, `theme_coder`, and `translator`.
    pub fn builtin() -> Self {
        Self::new()
            .with_template("moderator", PromptTemplate::new(MODERATOR_TEMPLATE, "v1.0"))
            .with_template(
                "theme_coder",
                PromptTemplate::new(THEME_CODER_TEMPLATE, "v1.0"),
            )
            .with_template(
                "translator",
                PromptTemplate::new(TRANSLATOR_TEMPLATE, "v1.0"),
            )
    }

    /// Register or replace the template for a task.
    pub fn with_template(mut self, task_id: impl Into<String>, template: PromptTemplate) -> Self {
        self.templates.insert(task_id.into(), template);
        self
    }

    pub fn get(&self, task_id: &str) -> Option<&PromptTemplate> {
        self.templates.get(task_id)
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.templates.contains_key(task_id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Render the template for `task_id`, returning the prompt and its version.
    pub fn render(
        &self,
        task_id: &str,
        values: &BTreeMap<String, String>,
    ) -> Result<(String, String)> {
        let template = self
            .templates
            .get(task_id)
            .ok_or_else(|| Error::UnknownTask(task_id.to_string()))?;

        let segments = parse(&template.template).map_err(|reason| Error::MalformedTemplate {
            task: task_id.to_string(),
            reason,
        })?;

        let mut rendered = String::with_capacity(template.template.len());
        for segment in segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Brace(c) => rendered.push(c),
                Segment::Placeholder(name) => {
                    let value = values.get(name).ok_or_else(|| Error::MissingPlaceholder {
                        task: task_id.to_string(),
                        name: name.to_string(),
                    })?;
                    rendered.push_str(value);
                }
            }
        }

        Ok((rendered, template.version.clone()))
    }
}

// ── Template parsing ───────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Brace(char),
    Placeholder(&'a str),
}

fn parse(template: &str) -> std::result::Result<Vec<Segment<'_>>, String> {
    let mut segments = Vec::new();
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        let (literal, tail) = rest.split_at(pos);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        if let Some(after) = tail.strip_prefix("{{") {
            segments.push(Segment::Brace('{'));
            rest = after;
        } else if let Some(after) = tail.strip_prefix("}}") {
            segments.push(Segment::Brace('}'));
            rest = after;
        } else if let Some(after) = tail.strip_prefix('{') {
            let close = match after.find(['}', '{']) {
                Some(i) if after.as_bytes()[i] == b'}' => i,
                _ => return Err("unclosed '{'".to_string()),
            };
            let (name, remainder) = after.split_at(close);
            if !is_identifier(name) {
                return Err(format!("invalid placeholder name '{name}'"));
            }
            segments.push(Segment::Placeholder(name));
            rest = remainder.strip_prefix('}').unwrap_or(remainder);
        } else {
            return Err("single '}' encountered".to_string());
        }
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }
    Ok(segments)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn builtin_tasks_render_with_version() {
        let registry = PromptRegistry::builtin();
        let cases = [
            ("moderator", values(&[("content", "hello")])),
            ("theme_coder", values(&[("requirements", "onboarding is slow")])),
            (
                "translator",
                values(&[
                    ("source_language", "English"),
                    ("target_language", "Spanish"),
                    ("text", "Hi"),
                ]),
            ),
        ];
        for (task, vals) in cases {
            let (prompt, version) = registry.render(task, &vals).unwrap();
            assert!(!prompt.is_empty(), "{task} rendered empty");
            assert!(!prompt.contains('{'), "{task} left a placeholder");
            assert_eq!(version, "v1.0");
        }
    }

    #[test]
    fn translator_substitutes_every_value() {
        let registry = PromptRegistry::builtin();
        let (prompt, _) = registry
            .render(
                "translator",
                &values(&[
                    ("source_language", "English"),
                    ("target_language", "Spanish"),
                    ("text", "Hello, how are you?"),
                ]),
            )
            .unwrap();
        assert!(prompt.contains("from English to Spanish:"));
        assert!(prompt.contains("Text: Hello, how are you?"));
    }

    #[test]
    fn unknown_task_fails() {
        let registry = PromptRegistry::builtin();
        let err = registry.render("summarizer", &values(&[])).unwrap_err();
        assert_eq!(err, Error::UnknownTask("summarizer".into()));
    }

    #[test]
    fn missing_placeholder_fails_without_default() {
        let registry = PromptRegistry::builtin();
        let err = registry
            .render(
                "translator",
                &values(&[("source_language", "English"), ("text", "Hi")]),
            )
            .unwrap_err();
        assert_eq!(
            err,
            Error::MissingPlaceholder {
                task: "translator".into(),
                name: "target_language".into(),
            }
        );
    }

    #[test]
    fn extra_values_are_ignored() {
        let registry = PromptRegistry::builtin();
        let (prompt, _) = registry
            .render("moderator", &values(&[("content", "x"), ("unused", "y")]))
            .unwrap();
        assert!(prompt.contains("Content: x"));
    }

    #[test]
    fn escaped_braces_render_literally() {
        let registry = PromptRegistry::new()
            .with_template("json", PromptTemplate::new("Return {{\"id\": {id}}}", "v2"));
        let (prompt, version) = registry
            .render("json", &values(&[("id", "42")]))
            .unwrap();
        assert_eq!(prompt, "Return {\"id\": 42}");
        assert_eq!(version, "v2");
    }

    #[test]
    fn repeated_placeholder_substituted_everywhere() {
        let registry =
            PromptRegistry::new().with_template("echo", PromptTemplate::new("{a}-{a}", "v1"));
        let (prompt, _) = registry.render("echo", &values(&[("a", "z")])).unwrap();
        assert_eq!(prompt, "z-z");
    }

    #[test]
    fn malformed_templates_are_rejected() {
        for text in ["open {brace", "stray } brace", "{not a name}", "{}"] {
            let registry =
                PromptRegistry::new().with_template("bad", PromptTemplate::new(text, "v1"));
            let err = registry.render("bad", &values(&[])).unwrap_err();
            assert!(
                matches!(err, Error::MalformedTemplate { .. }),
                "{text:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn placeholders_listed_once_in_order() {
        let template = PromptTemplate::new(TRANSLATOR_TEMPLATE, "v1.0");
        assert_eq!(
            template.placeholders().unwrap(),
            vec!["source_language", "target_language", "text"]
        );
    }
}
