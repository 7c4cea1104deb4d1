//! Closed label sets, one per pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A closed taxonomy the oracle must answer in.
///
/// `PROMPTED` members are offered to the oracle with their definitions. The fallback is
/// what a unit gets when the answer cannot be parsed or the call failed; it may or may
/// not be a prompted member.
pub trait Label:
    Copy + Eq + fmt::Debug + fmt::Display + Serialize + Send + Sync + 'static
{
    const PROMPTED: &'static [Self];

    fn fallback() -> Self;

    fn as_str(&self) -> &'static str;

    /// One-line definition shown in the prompt.
    fn definition(&self) -> &'static str;

    /// Accepted answer spellings, lowercase. The first one is what the prompt asks for.
    fn tokens(&self) -> &'static [&'static str];

    fn answer_token(&self) -> &'static str {
        self.tokens().first().copied().unwrap_or_else(|| self.as_str())
    }

    fn is_fallback(&self) -> bool {
        *self == Self::fallback()
    }

    /// Every member a record may carry: prompted members plus the fallback.
    fn members() -> Vec<Self> {
        let mut all = Self::PROMPTED.to_vec();
        if !all.contains(&Self::fallback()) {
            all.push(Self::fallback());
        }
        all
    }
}

macro_rules! impl_display_via_as_str {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Issue x user story relevance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchLabel {
    Match,
    /// Also the safe default for failed or unparsable pairs.
    NoMatch,
}

impl Label for MatchLabel {
    const PROMPTED: &'static [Self] = &[MatchLabel::Match, MatchLabel::NoMatch];

    fn fallback() -> Self {
        MatchLabel::NoMatch
    }

    fn as_str(&self) -> &'static str {
        match self {
            MatchLabel::Match => "Match",
            MatchLabel::NoMatch => "NoMatch",
        }
    }

    fn definition(&self) -> &'static str {
        match self {
            MatchLabel::Match => {
                "the issue affects the functionality and role covered by the user story \
                 (same domain, feature or system component)"
            }
            MatchLabel::NoMatch => "the issue does not affect what the user story covers",
        }
    }

    fn tokens(&self) -> &'static [&'static str] {
        match self {
            MatchLabel::Match => &["yes", "sim", "match", "true"],
            MatchLabel::NoMatch => &["no", "não", "nao", "no match", "nomatch", "no_match", "false"],
        }
    }
}

impl_display_via_as_str!(MatchLabel);

/// Relation between a new acceptance criterion and an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationLabel {
    Duplicate,
    Conflicting,
    Complementary,
    Irrelevant,
    /// Reserved for answers that could not be aligned or parsed.
    Unknown,
}

impl Label for RelationLabel {
    const PROMPTED: &'static [Self] = &[
        RelationLabel::Duplicate,
        RelationLabel::Conflicting,
        RelationLabel::Complementary,
        RelationLabel::Irrelevant,
    ];

    fn fallback() -> Self {
        RelationLabel::Unknown
    }

    fn as_str(&self) -> &'static str {
        match self {
            RelationLabel::Duplicate => "Duplicate",
            RelationLabel::Conflicting => "Conflicting",
            RelationLabel::Complementary => "Complementary",
            RelationLabel::Irrelevant => "Irrelevant",
            RelationLabel::Unknown => "Unknown",
        }
    }

    fn definition(&self) -> &'static str {
        match self {
            RelationLabel::Duplicate => {
                "describes exactly the same functionality or behaviour, with no important \
                 differences (redundant, should be avoided)"
            }
            RelationLabel::Conflicting => {
                "describes behaviour that is opposite to or incompatible with the new \
                 criterion (must be resolved)"
            }
            RelationLabel::Complementary => {
                "is related and adds details or conditions, but is neither equal nor \
                 conflicting (can coexist)"
            }
            RelationLabel::Irrelevant => "is not related to the new criterion",
            RelationLabel::Unknown => "the relation could not be determined",
        }
    }

    fn tokens(&self) -> &'static [&'static str] {
        match self {
            RelationLabel::Duplicate => &["duplicate", "duplicated", "duplicado", "duplicada"],
            RelationLabel::Conflicting => &["conflicting", "conflict", "conflitante", "conflito"],
            RelationLabel::Complementary => &["complementary", "complementar", "complements"],
            RelationLabel::Irrelevant => &["irrelevant", "irrelevante", "unrelated"],
            RelationLabel::Unknown => &[],
        }
    }
}

impl_display_via_as_str!(RelationLabel);

/// Whether an acceptance criterion agrees with its user story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConformanceLabel {
    Conforms,
    Violates,
    Unknown,
}

impl Label for ConformanceLabel {
    const PROMPTED: &'static [Self] = &[ConformanceLabel::Conforms, ConformanceLabel::Violates];

    fn fallback() -> Self {
        ConformanceLabel::Unknown
    }

    fn as_str(&self) -> &'static str {
        match self {
            ConformanceLabel::Conforms => "Conforms",
            ConformanceLabel::Violates => "Violates",
            ConformanceLabel::Unknown => "Unknown",
        }
    }

    fn definition(&self) -> &'static str {
        match self {
            ConformanceLabel::Conforms => "the criterion agrees with the user story",
            ConformanceLabel::Violates => "the criterion contradicts or ignores the user story",
            ConformanceLabel::Unknown => "conformance could not be determined",
        }
    }

    fn tokens(&self) -> &'static [&'static str] {
        match self {
            ConformanceLabel::Conforms => &["yes", "sim", "conforms", "conform", "agrees"],
            ConformanceLabel::Violates => &["no", "não", "nao", "violates", "violate", "does not conform"],
            ConformanceLabel::Unknown => &[],
        }
    }
}

impl_display_via_as_str!(ConformanceLabel);
