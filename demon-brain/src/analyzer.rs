//! Lexical query classification plus a timeout-bounded embedding.

use std::sync::Arc;
use std::time::Duration;

use demon_embeddings::{EmbeddingProvider, EmbeddingVector, embed_with_timeout};
use demon_primitives::text::{is_stopword, tokenize};
use demon_primitives::{Command, Difficulty};
use demon_prompts::DirectiveParser;
use tracing::{debug, warn};

use crate::analysis::{IntentType, QueryAnalysis};

/// Confidence multiplier applied when the embedding could not be computed.
pub const DEGRADED_CONFIDENCE_FACTOR: f64 = 0.6;

const EXPLANATION_TERMS: &[&str] = &[
    "explain", "how", "why", "what", "describe", "understand", "meaning", "teach", "define",
    "works",
];
const CREATIVE_TERMS: &[&str] = &[
    "create", "write", "story", "poem", "plan", "brainstorm", "design", "imagine", "invent",
    "slogan", "business", "idea", "ideas", "generate", "draft", "compose",
];
const CODE_TERMS: &[&str] = &[
    "code", "function", "bug", "debug", "compile", "implement", "script", "class", "method",
    "api", "refactor", "rust", "python", "javascript", "typescript", "sql", "regex", "exception",
    "stacktrace", "unit",
];
const ANALYSIS_TERMS: &[&str] = &[
    "analyze", "analyse", "compare", "evaluate", "assess", "pros", "cons", "tradeoffs",
    "tradeoff", "critique", "metrics", "trend", "trends", "versus", "vs",
];
const SUMMARIZATION_TERMS: &[&str] = &[
    "summarize", "summarise", "summary", "tldr", "condense", "shorten", "recap", "overview",
    "gist",
];
const FORMAT_CUES: &[&str] = &["json", "markdown", "yaml", "table", "csv", "bullets", "bullet"];
const TONE_CUES: &[&str] = &[
    "formal",
    "casual",
    "friendly",
    "professional",
    "playful",
    "academic",
    "persuasive",
    "enthusiastic",
];
const NEGATION_CUES: &[&str] = &["no", "without", "avoid", "skip"];

/// Tie-break order when two intents score the same.
const INTENT_PRIORITY: &[(IntentType, &[&str])] = &[
    (IntentType::Code, CODE_TERMS),
    (IntentType::Creative, CREATIVE_TERMS),
    (IntentType::Explanation, EXPLANATION_TERMS),
    (IntentType::Analysis, ANALYSIS_TERMS),
    (IntentType::Summarization, SUMMARIZATION_TERMS),
];

/// Classifies queries and embeds their cleaned text.
pub struct QueryAnalyzer {
    provider: Arc<dyn EmbeddingProvider>,
    timeout: Duration,
    parser: DirectiveParser,
}

impl std::fmt::Debug for QueryAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryAnalyzer")
            .field("model", &self.provider.model())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl QueryAnalyzer {
    /// Creates an analyzer that bounds each embedding call by `timeout`.
    #[must_use]
    pub fn new(provider: Arc<dyn EmbeddingProvider>, timeout: Duration) -> Self {
        Self {
            provider,
            timeout,
            parser: DirectiveParser::new(),
        }
    }

    /// Embedding provider used for queries.
    #[must_use]
    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// Full analysis including the query embedding.
    ///
    /// Never fails: when the provider errors or times out the embedding is a zero
    /// vector and confidence is scaled by [`DEGRADED_CONFIDENCE_FACTOR`].
    pub async fn analyze(&self, raw_query: &str) -> QueryAnalysis {
        let mut analysis = self.analyze_lexical(raw_query);

        match embed_with_timeout(self.provider.as_ref(), &analysis.cleaned_query, self.timeout)
            .await
        {
            Ok(vector) => analysis.query_embedding = vector,
            Err(err) => {
                warn!(
                    error = %err,
                    model = self.provider.model(),
                    "query embedding unavailable, using lexical fallback"
                );
                analysis.confidence_score *= DEGRADED_CONFIDENCE_FACTOR;
            }
        }

        debug!(
            intent = %analysis.intent_type,
            complexity = %analysis.complexity_level,
            confidence = analysis.confidence_score,
            "analyzed query"
        );
        analysis
    }

    /// Analysis without an embedding: the vector is all zeros and confidence is
    /// left untouched.
    #[must_use]
    pub fn analyze_lexical(&self, raw_query: &str) -> QueryAnalysis {
        let (commands, remainder) = self.parser.parse(raw_query).into_parts();
        lexical_analysis(raw_query, commands, &remainder, self.provider.dimensions())
    }
}

/// Builds an analysis from already-parsed parts with a zero embedding of
/// `dimensions` components.
#[must_use]
pub fn lexical_analysis(
    raw_query: &str,
    commands: Vec<Command>,
    remainder: &str,
    dimensions: usize,
) -> QueryAnalysis {
    let cleaned_query = remainder.trim().to_lowercase();
    let tokens = tokenize(&cleaned_query);
    let code_shaped = looks_like_code(remainder);

    let (intent_type, hits) = classify_intent(&tokens, code_shaped);
    let confidence_score = if hits == 0 {
        0.5
    } else {
        #[allow(clippy::cast_precision_loss)]
        let boosted = 0.6 + 0.1 * hits as f64;
        boosted.min(0.95)
    };

    let constraints = extract_constraints(&tokens, &commands);
    let complexity_level = estimate_complexity(remainder, &tokens, code_shaped, constraints.len());

    QueryAnalysis {
        raw_query: raw_query.to_owned(),
        output_format_requested: directive_arg(&commands, "format")
            .or_else(|| first_cue(&tokens, FORMAT_CUES).map(normalize_format)),
        tone_requested: directive_arg(&commands, "tone")
            .or_else(|| first_cue(&tokens, TONE_CUES).map(str::to_owned)),
        cleaned_query,
        intent_type,
        complexity_level,
        constraints,
        pfcl_commands: commands,
        query_embedding: EmbeddingVector::zeros(dimensions),
        confidence_score,
    }
}

fn classify_intent(tokens: &[String], code_shaped: bool) -> (IntentType, usize) {
    let mut best = (IntentType::Conversation, 0_usize);
    for (intent, terms) in INTENT_PRIORITY {
        let mut hits = tokens
            .iter()
            .filter(|token| terms.contains(&token.as_str()))
            .count();
        if *intent == IntentType::Code && code_shaped {
            hits += 2;
        }
        // Strictly greater keeps the earlier intent on ties.
        if hits > best.1 {
            best = (*intent, hits);
        }
    }
    best
}

fn looks_like_code(text: &str) -> bool {
    text.contains("```")
        || text.contains("fn ")
        || text.contains("def ")
        || text.contains("=>")
        || text.contains("();")
        || text
            .lines()
            .any(|line| line.trim_end().ends_with(';') || line.trim_end().ends_with('{'))
}

fn estimate_complexity(
    text: &str,
    tokens: &[String],
    code_shaped: bool,
    constraint_count: usize,
) -> Difficulty {
    let mut points = 0;
    if tokens.len() >= 40 {
        points += 1;
    }
    if tokens.len() >= 120 {
        points += 1;
    }
    let long_words = tokens.iter().filter(|t| t.chars().count() >= 9).count();
    if !tokens.is_empty() && long_words * 4 > tokens.len() {
        points += 1;
    }
    if text.lines().filter(|line| !line.trim().is_empty()).count() > 3 {
        points += 1;
    }
    if code_shaped {
        points += 1;
    }
    if constraint_count >= 2 {
        points += 1;
    }

    match points {
        0 => Difficulty::Beginner,
        1 | 2 => Difficulty::Intermediate,
        3 => Difficulty::Advanced,
        _ => Difficulty::Expert,
    }
}

fn extract_constraints(tokens: &[String], commands: &[Command]) -> Vec<String> {
    let mut constraints: Vec<String> = Vec::new();
    let mut push = |term: &str| {
        let term = term.trim().to_lowercase();
        if !term.is_empty() && !constraints.contains(&term) {
            constraints.push(term);
        }
    };

    for (idx, token) in tokens.iter().enumerate() {
        if !NEGATION_CUES.contains(&token.as_str()) {
            continue;
        }
        if let Some(next) = tokens[idx + 1..]
            .iter()
            .find(|candidate| !is_stopword(candidate) && !NEGATION_CUES.contains(&candidate.as_str()))
        {
            push(next.as_str());
        }
    }

    for command in commands {
        if let Some(avoid) = command.arg("avoid") {
            avoid.split(',').for_each(&mut push);
        }
    }

    constraints
}

fn directive_arg(commands: &[Command], key: &str) -> Option<String> {
    commands
        .iter()
        .find_map(|command| command.arg(key))
        .map(str::to_lowercase)
}

fn first_cue<'a>(tokens: &[String], cues: &[&'a str]) -> Option<&'a str> {
    tokens
        .iter()
        .find_map(|token| cues.iter().find(|cue| **cue == token.as_str()).copied())
}

fn normalize_format(cue: &str) -> String {
    match cue {
        "bullet" => "bullets".to_owned(),
        other => other.to_owned(),
    }
}
