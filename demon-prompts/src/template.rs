//! Technique templates with `{variable}` substitution.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Result alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur during template operations.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// A required variable was not provided.
    #[error("missing required variable: {name}")]
    MissingVariable {
        /// Name of the missing variable.
        name: String,
    },

    /// A declared variable name is not a valid placeholder identifier.
    #[error("invalid variable name `{name}`")]
    InvalidVariable {
        /// Offending name.
        name: String,
    },
}

/// A technique template such as `Think step by step: {query}`.
///
/// Placeholders are `{name}` where `name` is a lowercase identifier. Braces that
/// do not enclose an identifier (JSON snippets, for example) are left untouched.
///
/// # Examples
///
/// ```
/// use demon_prompts::template::PromptTemplate;
///
/// let template = PromptTemplate::builder("Think step by step: {query}")
///     .with_variable("query", "What is 2+2?")
///     .build()
///     .unwrap();
///
/// assert_eq!(template.render().unwrap(), "Think step by step: What is 2+2?");
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PromptTemplate {
    template: String,
    variables: HashMap<String, String>,
    required_variables: Vec<String>,
}

impl PromptTemplate {
    /// Creates a new template with the supplied text.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            variables: HashMap::new(),
            required_variables: Vec::new(),
        }
    }

    /// Returns a builder for constructing templates.
    #[must_use]
    pub fn builder(template: impl Into<String>) -> TemplateBuilder {
        TemplateBuilder::new(template)
    }

    /// Sets a variable value.
    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    /// Returns the value of a variable if set.
    #[must_use]
    pub fn get_variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    /// Renders the template with the current variables.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::MissingVariable`] if a required variable is not set.
    pub fn render(&self) -> TemplateResult<String> {
        self.render_with(&HashMap::new())
    }

    /// Renders the template with additional runtime variables.
    ///
    /// Runtime variables override template variables; unset optional variables
    /// render as the empty string.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::MissingVariable`] if a required variable is not set.
    pub fn render_with(&self, runtime_vars: &HashMap<String, String>) -> TemplateResult<String> {
        let mut result = self.template.clone();

        for var_name in extract_variable_refs(&self.template) {
            let value = runtime_vars
                .get(&var_name)
                .or_else(|| self.variables.get(&var_name));

            let value = if let Some(v) = value {
                v.as_str()
            } else {
                if self.required_variables.contains(&var_name) {
                    return Err(TemplateError::MissingVariable { name: var_name });
                }
                ""
            };

            let placeholder = format!("{{{var_name}}}");
            result = result.replace(&placeholder, value);
        }

        Ok(result)
    }

    /// Returns true when the template references `name`.
    #[must_use]
    pub fn references(&self, name: &str) -> bool {
        extract_variable_refs(&self.template)
            .iter()
            .any(|candidate| candidate == name)
    }

    /// Returns the raw template string.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.template)
    }
}

/// Builder for constructing prompt templates.
pub struct TemplateBuilder {
    template: String,
    variables: HashMap<String, String>,
    required_variables: Vec<String>,
}

impl TemplateBuilder {
    /// Creates a new builder with the supplied template text.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            variables: HashMap::new(),
            required_variables: Vec::new(),
        }
    }

    /// Sets a variable with a default value.
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Declares a required variable (must be provided at render time).
    #[must_use]
    pub fn with_required_variable(mut self, name: impl Into<String>) -> Self {
        self.required_variables.push(name.into());
        self
    }

    /// Builds the template.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::InvalidVariable`] if a declared variable name could
    /// never appear as a placeholder.
    pub fn build(self) -> TemplateResult<PromptTemplate> {
        if let Some(bad) = self
            .variables
            .keys()
            .chain(self.required_variables.iter())
            .find(|name| !is_placeholder_name(name))
        {
            return Err(TemplateError::InvalidVariable { name: bad.clone() });
        }

        Ok(PromptTemplate {
            template: self.template,
            variables: self.variables,
            required_variables: self.required_variables,
        })
    }
}

fn is_placeholder_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Extracts distinct placeholder names in order of first appearance.
fn extract_variable_refs(template: &str) -> Vec<String> {
    let mut vars: Vec<String> = Vec::new();

    for (start, _) in template.match_indices('{') {
        let rest = &template[start + 1..];
        let Some(end) = rest.find('}') else {
            break;
        };
        let name = &rest[..end];
        if is_placeholder_name(name) && !vars.iter().any(|v| v == name) {
            vars.push(name.to_owned());
        }
    }

    vars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_simple_template() {
        let template = PromptTemplate::builder("Hello {name}!")
            .with_variable("name", "World")
            .build()
            .unwrap();

        assert_eq!(template.render().unwrap(), "Hello World!");
    }

    #[test]
    fn runtime_variables_override_defaults() {
        let template = PromptTemplate::builder("Hello {name}!")
            .with_variable("name", "World")
            .build()
            .unwrap();

        let mut runtime = HashMap::new();
        runtime.insert("name".to_owned(), "Alice".to_owned());

        assert_eq!(template.render_with(&runtime).unwrap(), "Hello Alice!");
    }

    #[test]
    fn required_variables_error_when_missing() {
        let template = PromptTemplate::builder("Hello {name}!")
            .with_required_variable("name")
            .build()
            .unwrap();

        let err = template.render().expect_err("should error");
        assert!(matches!(err, TemplateError::MissingVariable { .. }));
    }

    #[test]
    fn optional_variables_render_empty() {
        let template = PromptTemplate::new("Tone: {tone}.");
        assert_eq!(template.render().unwrap(), "Tone: .");
    }

    #[test]
    fn json_braces_are_left_alone() {
        let template = PromptTemplate::new(r#"Reply as {"answer": "..."} for {query}"#);
        let mut runtime = HashMap::new();
        runtime.insert("query".to_owned(), "q".to_owned());
        assert_eq!(
            template.render_with(&runtime).unwrap(),
            r#"Reply as {"answer": "..."} for q"#
        );
    }

    #[test]
    fn extracts_distinct_refs() {
        let vars = extract_variable_refs("{query} then {format} then {query}");
        assert_eq!(vars, vec!["query", "format"]);
        assert!(PromptTemplate::new("{query}").references("query"));
    }

    #[test]
    fn rejects_invalid_variable_names() {
        let err = PromptTemplate::builder("x")
            .with_variable("Bad Name", "v")
            .build()
            .expect_err("invalid name");
        assert!(matches!(err, TemplateError::InvalidVariable { .. }));
    }
}
