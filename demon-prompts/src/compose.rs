//! Assembles the upgraded prompt from ordered technique templates.

use std::collections::HashMap;

use crate::template::{PromptTemplate, TemplateResult};

/// One technique's contribution to the upgraded prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptFragment {
    name: String,
    template: String,
}

impl PromptFragment {
    /// Creates a fragment from a technique display name and template.
    #[must_use]
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }

    /// Technique display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builds the final prompt text handed to the execution backend.
///
/// Fragments render in the order they are added, so callers pass them already
/// sorted by execution order. When no fragment places `{query}` itself, the query
/// is appended after the fragments.
#[derive(Clone, Debug)]
pub struct PromptComposer {
    query: String,
    format: Option<String>,
    tone: Option<String>,
    fragments: Vec<PromptFragment>,
    contract: Option<String>,
}

impl PromptComposer {
    /// Starts composing around the user's residual query text.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            format: None,
            tone: None,
            fragments: Vec::new(),
            contract: None,
        }
    }

    /// Sets the requested output format exposed as `{format}`.
    #[must_use]
    pub fn with_format(mut self, format: Option<&str>) -> Self {
        self.format = format.map(str::to_owned);
        self
    }

    /// Sets the requested tone exposed as `{tone}`.
    #[must_use]
    pub fn with_tone(mut self, tone: Option<&str>) -> Self {
        self.tone = tone.map(str::to_owned);
        self
    }

    /// Appends a technique fragment.
    #[must_use]
    pub fn fragment(mut self, fragment: PromptFragment) -> Self {
        self.fragments.push(fragment);
        self
    }

    /// Sets the output contract announced at the end of the prompt.
    #[must_use]
    pub fn contract(mut self, contract: impl Into<String>) -> Self {
        self.contract = Some(contract.into());
        self
    }

    /// Renders all fragments into the upgraded prompt.
    ///
    /// # Errors
    ///
    /// Propagates [`crate::template::TemplateError`] from fragment rendering.
    pub fn compose(&self) -> TemplateResult<String> {
        let mut vars = HashMap::new();
        vars.insert("query".to_owned(), self.query.clone());
        if let Some(format) = &self.format {
            vars.insert("format".to_owned(), format.clone());
        }
        if let Some(tone) = &self.tone {
            vars.insert("tone".to_owned(), tone.clone());
        }

        let mut sections = Vec::with_capacity(self.fragments.len() + 2);
        let mut query_placed = false;
        for fragment in &self.fragments {
            if fragment.template.trim().is_empty() {
                sections.push(format!("Apply {}.", fragment.name));
                continue;
            }
            let template = PromptTemplate::new(fragment.template.as_str());
            query_placed |= template.references("query");
            sections.push(template.render_with(&vars)?.trim().to_owned());
        }

        if !query_placed && !self.query.is_empty() {
            sections.push(self.query.clone());
        }
        if let Some(contract) = &self.contract {
            sections.push(format!("Output contract: {contract}."));
        }

        Ok(sections.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_fragments_in_order() {
        let prompt = PromptComposer::new("What is 2+2?")
            .fragment(PromptFragment::new("Persona", "You are a patient tutor."))
            .fragment(PromptFragment::new("CoT", "Think step by step: {query}"))
            .contract("paragraphs_and_bullets")
            .compose()
            .unwrap();

        assert_eq!(
            prompt,
            "You are a patient tutor.\n\nThink step by step: What is 2+2?\n\nOutput contract: paragraphs_and_bullets."
        );
    }

    #[test]
    fn appends_query_when_no_fragment_places_it() {
        let prompt = PromptComposer::new("hello")
            .fragment(PromptFragment::new("Teaser", ""))
            .compose()
            .unwrap();
        assert_eq!(prompt, "Apply Teaser.\n\nhello");
    }

    #[test]
    fn exposes_format_and_tone() {
        let prompt = PromptComposer::new("q")
            .with_format(Some("json"))
            .with_tone(None)
            .fragment(PromptFragment::new("Schema", "Answer {query} as {format}{tone}."))
            .compose()
            .unwrap();
        assert_eq!(prompt, "Answer q as json.");
    }
}
