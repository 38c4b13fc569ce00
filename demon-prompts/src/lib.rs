//! Prompt-side building blocks: PFCL directive parsing, technique templates, and
//! composition of the upgraded prompt.

#![warn(missing_docs, clippy::pedantic)]

pub mod compose;
pub mod pfcl;
pub mod template;

pub use compose::{PromptComposer, PromptFragment};
pub use pfcl::{DirectiveParser, ParsedInput, parse};
pub use template::{PromptTemplate, TemplateBuilder, TemplateError, TemplateResult};
