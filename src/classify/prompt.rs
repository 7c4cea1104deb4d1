//! Prompt templates per task.
//!
//! A prompt is: preamble, the label enumeration with one-line definitions, the evidence,
//! the subject texts and the answer instruction. The label block is generated from the
//! taxonomy so the prompt and the parser can never disagree.

use std::fmt::Write as _;

use serde::Serialize;

use super::taxonomy::Label;

/// Rendered prompt, ready for the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub system: Option<String>,
    pub user: String,
}

/// Fixed framing for one classification task.
#[derive(Debug, Clone, Copy)]
pub struct Template {
    pub system: Option<&'static str>,
    pub preamble: &'static str,
    pub evidence_heading: &'static str,
    /// Number evidence items so per-item answers can refer to them.
    pub numbered_evidence: bool,
    pub evidence_first: bool,
    /// `{count}` is replaced with the number of evidence items.
    pub instruction: &'static str,
}

pub const MATCHING: Template = Template {
    system: None,
    preamble: "Decide whether a reported issue is relevant to a user story of an \
               e-commerce product.",
    evidence_heading: "Context",
    numbered_evidence: false,
    evidence_first: true,
    instruction: "Question: based on the context provided, does the issue affect the \
                  functionality and the role covered by the user story? Consider whether \
                  they deal with the same domain, feature or system component.\n\
                  Answer only \"yes\" or \"no\".",
};

pub const CONFLICT: Template = Template {
    system: Some("You are a QA analyst experienced in agile methodologies."),
    preamble: "You analyse acceptance criteria written in BDD format. Compare a new \
               criterion with existing criteria and classify each existing criterion.",
    evidence_heading: "Existing criteria",
    numbered_evidence: true,
    evidence_first: false,
    instruction: "Classify each existing criterion against the new criterion and briefly \
                  explain why.\n\
                  Answer with exactly {count} lines, one per existing criterion, in the \
                  order listed. Each line must be \"<label>: <short reason>\" using only \
                  the labels above. Do not add any other text.",
};

pub const CONFORMANCE: Template = Template {
    system: None,
    preamble: "Below are a user story and an acceptance criterion. Evaluate whether the \
               criterion agrees with the user story.",
    evidence_heading: "Related context",
    numbered_evidence: false,
    evidence_first: true,
    instruction: "Start your answer with \"yes\" or \"no\" on the first line, followed by a \
                  justification of at most 2 sentences.",
};

impl Template {
    /// Renders the prompt for taxonomy `L`.
    ///
    /// `subject` holds `(heading, text)` pairs in display order.
    pub fn render<L: Label>(&self, subject: &[(&str, &str)], evidence: &[&str]) -> Prompt {
        let mut user = String::new();

        let _ = writeln!(user, "{}", self.preamble);
        let _ = writeln!(user);
        let _ = writeln!(user, "Labels:");
        for label in L::PROMPTED {
            let _ = writeln!(user, "- {}: {}", label.answer_token(), label.definition());
        }

        if self.evidence_first {
            self.write_evidence(&mut user, evidence);
            write_subject(&mut user, subject);
        } else {
            write_subject(&mut user, subject);
            self.write_evidence(&mut user, evidence);
        }

        let _ = writeln!(user);
        let _ = write!(
            user,
            "{}",
            self.instruction.replace("{count}", &evidence.len().to_string())
        );

        Prompt {
            system: self.system.map(str::to_string),
            user,
        }
    }

    fn write_evidence(&self, out: &mut String, evidence: &[&str]) {
        if evidence.is_empty() {
            return;
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "{}:", self.evidence_heading);
        for (i, text) in evidence.iter().enumerate() {
            if self.numbered_evidence {
                let _ = writeln!(out, "{}. \"{}\"", i + 1, text);
            } else {
                let _ = writeln!(out, "{}", text);
            }
        }
    }
}

fn write_subject(out: &mut String, subject: &[(&str, &str)]) {
    for (heading, text) in subject {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}:", heading);
        let _ = writeln!(out, "{}", text);
    }
}
