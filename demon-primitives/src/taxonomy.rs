//! Closed taxonomies shared by the compendium, matcher, and router.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

macro_rules! string_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// Every variant in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Returns the canonical snake_case label.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                let normalized = s.trim().to_ascii_lowercase();
                match normalized.as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(Error::UnknownVariant {
                        kind: $kind,
                        value: s.to_owned(),
                    }),
                }
            }
        }
    };
}

/// Family a technique belongs to. Drives execution ordering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Basic framing techniques applied before anything else.
    #[default]
    Foundational,
    /// Step-wise or structured reasoning.
    Reasoning,
    /// Ideation and content generation.
    CreativeAndGenerative,
    /// Output shaping (schemas, outlines, lists).
    StructuredOutput,
    /// Self-checks and acceptance criteria.
    Verification,
    /// Frameworks composed from other techniques.
    MetaFramework,
}

string_enum!(Category, "category", {
    Foundational => "foundational",
    Reasoning => "reasoning",
    CreativeAndGenerative => "creative_and_generative",
    StructuredOutput => "structured_output",
    Verification => "verification",
    MetaFramework => "meta_framework",
});

impl Category {
    /// Ordering priority inside a phase; lower runs first.
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Foundational => 0,
            Self::Reasoning => 1,
            Self::CreativeAndGenerative | Self::StructuredOutput | Self::Verification => 2,
            Self::MetaFramework => 3,
        }
    }
}

/// Difficulty of a technique or complexity of a query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// Short, single-step requests.
    Beginner,
    /// Typical multi-sentence requests.
    #[default]
    Intermediate,
    /// Long or structured requests.
    Advanced,
    /// Long requests with code, structure, and constraints.
    Expert,
}

string_enum!(Difficulty, "difficulty", {
    Beginner => "beginner",
    Intermediate => "intermediate",
    Advanced => "advanced",
    Expert => "expert",
});

/// Stage of prompt assembly a technique applies to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Framing applied before the request body.
    Pre,
    /// Transformations of the request body itself.
    #[default]
    Core,
    /// Output shaping and verification.
    Post,
}

string_enum!(Phase, "phase", {
    Pre => "pre",
    Core => "core",
    Post => "post",
});

/// Entitlement tier of a caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Free plan.
    #[default]
    Free,
    /// Paid plan.
    Pro,
}

string_enum!(Tier, "tier", {
    Free => "free",
    Pro => "pro",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_match_wire_names() {
        assert_eq!(Difficulty::Beginner.as_str(), "beginner");
        assert_eq!(Difficulty::Expert.to_string(), "expert");
        assert_eq!(Category::CreativeAndGenerative.as_str(), "creative_and_generative");
        assert_eq!(
            serde_json::to_string(&Category::Reasoning).unwrap(),
            "\"reasoning\""
        );
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(" PRO ".parse::<Tier>().unwrap(), Tier::Pro);
        assert_eq!("post".parse::<Phase>().unwrap(), Phase::Post);
        let err = "enterprise".parse::<Tier>().expect_err("unknown tier");
        assert!(matches!(err, Error::UnknownVariant { kind: "tier", .. }));
    }

    #[test]
    fn foundational_runs_before_meta() {
        assert!(Category::Foundational.priority() < Category::Reasoning.priority());
        assert!(Category::Reasoning.priority() < Category::MetaFramework.priority());
        assert!(Phase::Pre < Phase::Core && Phase::Core < Phase::Post);
    }
}
