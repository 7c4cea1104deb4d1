use super::*;
use crate::corpus::ArtifactId;
use crate::oracle::{OracleError, ScriptedOracle};
use crate::retry::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(2),
        multiplier: 2,
        timeout: Duration::from_secs(5),
    }
}

fn ids(raw: &[&str]) -> Vec<ArtifactId> {
    raw.iter().map(|id| ArtifactId::new(*id)).collect()
}

mod parser_tests {
    use super::*;

    #[test]
    fn test_exact_and_case_insensitive() {
        assert_eq!(parse_label::<MatchLabel>("Yes"), Ok(MatchLabel::Match));
        assert_eq!(parse_label::<MatchLabel>("  NO  "), Ok(MatchLabel::NoMatch));
        assert_eq!(parse_label::<MatchLabel>("No match"), Ok(MatchLabel::NoMatch));
        assert_eq!(
            parse_label::<RelationLabel>("CONFLICTING"),
            Ok(RelationLabel::Conflicting)
        );
    }

    #[test]
    fn test_prefix_with_trailing_text() {
        assert_eq!(parse_label::<MatchLabel>("No."), Ok(MatchLabel::NoMatch));
        assert_eq!(
            parse_label::<MatchLabel>("Yes, the coupon flow is part of checkout"),
            Ok(MatchLabel::Match)
        );
        assert_eq!(
            parse_label::<ConformanceLabel>("No, the criterion ignores guest users."),
            Ok(ConformanceLabel::Violates)
        );
    }

    #[test]
    fn test_portuguese_answers() {
        assert_eq!(parse_label::<MatchLabel>("Sim"), Ok(MatchLabel::Match));
        assert_eq!(parse_label::<MatchLabel>("Não."), Ok(MatchLabel::NoMatch));
        assert_eq!(
            parse_label::<RelationLabel>("Conflitante: regras opostas"),
            Ok(RelationLabel::Conflicting)
        );
    }

    #[test]
    fn test_markdown_and_list_markers() {
        assert_eq!(parse_label::<MatchLabel>("**Yes**"), Ok(MatchLabel::Match));
        assert_eq!(parse_label::<MatchLabel>("- `no`"), Ok(MatchLabel::NoMatch));
        assert_eq!(
            parse_label::<RelationLabel>("2) \"Duplicate\": same checkout rule"),
            Ok(RelationLabel::Duplicate)
        );
        assert_eq!(normalize_line("  1. **Irrelevant**"), "irrelevant");
    }

    #[test]
    fn test_prefix_needs_word_boundary() {
        let err = parse_label::<MatchLabel>("Not sure").unwrap_err();
        assert_eq!(
            err,
            ParseError::NoLabel {
                line: "Not sure".to_string()
            }
        );
        assert!(parse_label::<MatchLabel>("Nobody knows").is_err());
    }

    #[test]
    fn test_inflected_answers() {
        assert_eq!(
            parse_label::<RelationLabel>("Conflicts with AC-2"),
            Ok(RelationLabel::Conflicting)
        );
        assert_eq!(
            parse_label::<RelationLabel>("Duplicates the checkout rule"),
            Ok(RelationLabel::Duplicate)
        );
        assert_eq!(parse_label::<MatchLabel>("Matches"), Ok(MatchLabel::Match));
        assert_eq!(parse_label::<MatchLabel>("Matched."), Ok(MatchLabel::Match));
        assert_eq!(
            parse_label::<MatchLabel>("No matches here"),
            Ok(MatchLabel::NoMatch)
        );
        assert_eq!(
            parse_label::<ConformanceLabel>("Conforms to the story"),
            Ok(ConformanceLabel::Conforms)
        );
        assert_eq!(
            parse_label::<ConformanceLabel>("Violated: guests are ignored"),
            Ok(ConformanceLabel::Violates)
        );
        assert!(parse_label::<RelationLabel>("Conflictual").is_err());
    }

    #[test]
    fn test_parse_each_accepts_inflections() {
        let verdicts = parse_each::<RelationLabel>("Conflicts: opposite rule\nIrrelevant", 2);

        assert_eq!(
            verdicts[0],
            Ok(Verdict {
                label: RelationLabel::Conflicting,
                reason: "opposite rule".to_string()
            })
        );
        assert_eq!(verdicts[1].as_ref().unwrap().label, RelationLabel::Irrelevant);
    }

    #[test]
    fn test_fallback_label_is_never_parsed() {
        assert!(parse_label::<RelationLabel>("Unknown").is_err());
        assert!(parse_label::<ConformanceLabel>("unknown").is_err());
    }

    #[test]
    fn test_parse_single_uses_first_non_blank_line() {
        assert_eq!(
            parse_single::<MatchLabel>("\n\n  Yes\nNo, wait"),
            Ok(MatchLabel::Match)
        );
        assert_eq!(parse_single::<MatchLabel>("  \n\t"), Err(ParseError::Empty));
        assert!(parse_single::<MatchLabel>("Maybe\nYes").is_err());
    }

    #[test]
    fn test_parse_each_aligns_by_line_order() {
        let verdicts = parse_each::<RelationLabel>(
            "Duplicate: same coupon rule\n\nComplementary - adds a limit",
            3,
        );

        assert_eq!(verdicts.len(), 3);
        assert_eq!(
            verdicts[0],
            Ok(Verdict {
                label: RelationLabel::Duplicate,
                reason: "same coupon rule".to_string()
            })
        );
        assert_eq!(
            verdicts[1],
            Ok(Verdict {
                label: RelationLabel::Complementary,
                reason: "adds a limit".to_string()
            })
        );
        assert_eq!(verdicts[2], Err(ParseError::MissingLine { index: 2 }));
    }

    #[test]
    fn test_parse_each_ignores_surplus_and_keeps_bad_slots() {
        let verdicts = parse_each::<RelationLabel>(
            "Irrelevant: other page\nprobably related\nConflicting: opposite\nDuplicate: extra",
            3,
        );

        assert_eq!(verdicts.len(), 3);
        assert_eq!(verdicts[0].as_ref().unwrap().label, RelationLabel::Irrelevant);
        assert!(matches!(verdicts[1], Err(ParseError::NoLabel { .. })));
        assert_eq!(verdicts[2].as_ref().unwrap().label, RelationLabel::Conflicting);
    }

    #[test]
    fn test_reason_defaults_to_whole_line() {
        let verdicts = parse_each::<RelationLabel>("Irrelevant", 1);
        assert_eq!(verdicts[0].as_ref().unwrap().reason, "Irrelevant");
    }
}

mod taxonomy_tests {
    use super::*;

    #[test]
    fn test_members_include_fallback() {
        assert_eq!(MatchLabel::members(), vec![MatchLabel::Match, MatchLabel::NoMatch]);
        assert_eq!(RelationLabel::members().len(), 5);
        assert!(RelationLabel::members().contains(&RelationLabel::Unknown));
        assert_eq!(
            ConformanceLabel::members().last(),
            Some(&ConformanceLabel::Unknown)
        );
    }

    #[test]
    fn test_answer_tokens() {
        assert_eq!(MatchLabel::Match.answer_token(), "yes");
        assert_eq!(RelationLabel::Duplicate.answer_token(), "duplicate");
        assert_eq!(RelationLabel::Unknown.answer_token(), "Unknown");
        assert!(MatchLabel::NoMatch.is_fallback());
        assert_eq!(RelationLabel::Complementary.to_string(), "Complementary");
    }
}

mod prompt_tests {
    use super::*;

    #[test]
    fn test_matching_prompt_lists_labels_and_context_first() {
        let prompt = MATCHING.render::<MatchLabel>(
            &[
                ("Issue", "Coupon code rejected at checkout"),
                ("User story", "As a buyer I want to apply discounts"),
            ],
            &["Coupons are validated by the pricing service"],
        );

        assert!(prompt.system.is_none());
        assert!(prompt.user.contains("Labels:"));
        assert!(prompt.user.contains(&format!(
            "- yes: {}",
            MatchLabel::Match.definition()
        )));
        assert!(prompt.user.contains("- no: "));

        let context = prompt.user.find("Context:").unwrap();
        let issue = prompt.user.find("Issue:").unwrap();
        let story = prompt.user.find("User story:").unwrap();
        assert!(context < issue && issue < story);
        assert!(prompt.user.ends_with("Answer only \"yes\" or \"no\"."));
    }

    #[test]
    fn test_empty_evidence_omits_heading() {
        let prompt = MATCHING.render::<MatchLabel>(&[("Issue", "Search is slow")], &[]);
        assert!(!prompt.user.contains("Context:"));
        assert!(prompt.user.contains("Issue:\nSearch is slow"));
    }

    #[test]
    fn test_conflict_prompt_numbers_candidates() {
        let prompt = CONFLICT.render::<RelationLabel>(
            &[("New criterion", "Given a cart, when I pay, then I get a receipt")],
            &["Receipt is emailed", "Cart is emptied"],
        );

        assert_eq!(
            prompt.system.as_deref(),
            Some("You are a QA analyst experienced in agile methodologies.")
        );
        assert!(prompt.user.contains("1. \"Receipt is emailed\""));
        assert!(prompt.user.contains("2. \"Cart is emptied\""));
        assert!(prompt.user.contains("exactly 2 lines"));
        assert!(prompt.user.contains("- duplicate: "));
        assert!(!prompt.user.contains("- Unknown"));
        assert!(
            prompt.user.find("New criterion:").unwrap()
                < prompt.user.find("Existing criteria:").unwrap()
        );
    }
}

mod engine_tests {
    use super::*;

    fn engine(oracle: Arc<ScriptedOracle>) -> ClassificationEngine {
        ClassificationEngine::new(oracle, fast_policy()).with_max_tokens(128)
    }

    fn matching_prompt(issue: &str) -> Prompt {
        MATCHING.render::<MatchLabel>(&[("Issue", issue), ("User story", "Apply discounts")], &[])
    }

    #[tokio::test]
    async fn test_judged_record_keeps_raw_response() {
        let oracle = Arc::new(ScriptedOracle::always("  Yes, coupons are discounts \n"));
        let engine = engine(oracle.clone());

        let record: ClassificationRecord<MatchLabel> = engine
            .classify(
                &ArtifactId::new("i1"),
                Some(&ArtifactId::new("s1")),
                &matching_prompt("Coupon rejected"),
            )
            .await;

        assert_eq!(record.label(), MatchLabel::Match);
        assert_eq!(record.status(), &RecordStatus::Judged);
        assert_eq!(record.rationale(), "Yes, coupons are discounts");
        assert_eq!(record.query_id().as_str(), "i1");
        assert_eq!(record.candidate_id().map(ArtifactId::as_str), Some("s1"));
        assert!(!record.is_degraded());

        let requests = oracle.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].temperature, 0.0);
        assert_eq!(requests[0].max_tokens, 128);
    }

    #[tokio::test]
    async fn test_unparsable_answer_falls_back() {
        let oracle = Arc::new(ScriptedOracle::always("It depends on the payment provider"));
        let record: ClassificationRecord<MatchLabel> = engine(oracle)
            .classify(&ArtifactId::new("i1"), None, &matching_prompt("Coupon"))
            .await;

        assert_eq!(record.label(), MatchLabel::NoMatch);
        assert_eq!(record.status(), &RecordStatus::Unparsed);
        assert_eq!(record.rationale(), "It depends on the payment provider");
        assert!(record.is_degraded());
        assert!(!record.is_failed());
    }

    #[tokio::test]
    async fn test_failed_call_gets_failure_rationale() {
        let oracle = Arc::new(ScriptedOracle::always("yes").fail_when(
            "Coupon",
            OracleError::Unauthorized {
                reason: "bad key".into(),
            },
        ));
        let record: ClassificationRecord<MatchLabel> = engine(oracle.clone())
            .classify(&ArtifactId::new("i1"), None, &matching_prompt("Coupon"))
            .await;

        assert_eq!(record.label(), MatchLabel::NoMatch);
        assert!(record.is_failed());
        assert!(record.rationale().starts_with("classification failed"));
        assert!(record.rationale().contains("bad key"));
        assert_eq!(oracle.calls(), 1);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let oracle = Arc::new(ScriptedOracle::always("yes").with_transient_failures(2));
        let record: ClassificationRecord<MatchLabel> = engine(oracle.clone())
            .classify(&ArtifactId::new("i1"), None, &matching_prompt("Coupon"))
            .await;

        assert_eq!(record.label(), MatchLabel::Match);
        assert_eq!(oracle.calls(), 3);
    }

    #[tokio::test]
    async fn test_classify_each_pads_missing_lines() {
        let oracle = Arc::new(ScriptedOracle::always(
            "Duplicate: same receipt rule\nIrrelevant: different page",
        ));
        let candidates = ids(&["c1", "c2", "c3"]);
        let prompt = CONFLICT.render::<RelationLabel>(
            &[("New criterion", "Receipt is emailed")],
            &["Receipt is emailed after payment", "Profile photo", "Refunds"],
        );

        let batch: BatchClassification<RelationLabel> = engine(oracle.clone())
            .classify_each(&ArtifactId::new("new"), &candidates, &prompt)
            .await;

        assert!(!batch.is_failed());
        let labels: Vec<_> = batch.records.iter().map(|r| r.label()).collect();
        assert_eq!(
            labels,
            vec![
                RelationLabel::Duplicate,
                RelationLabel::Irrelevant,
                RelationLabel::Unknown
            ]
        );
        assert_eq!(batch.records[0].rationale(), "same receipt rule");
        assert_eq!(batch.records[2].status(), &RecordStatus::Unparsed);
        assert_eq!(
            batch.records[2].candidate_id().map(ArtifactId::as_str),
            Some("c3")
        );

        let requests = oracle.requests();
        assert!(requests[0].system.is_some());
    }

    #[tokio::test]
    async fn test_classify_each_failure_marks_every_candidate() {
        let oracle = Arc::new(ScriptedOracle::always("Duplicate: x").timeout_when("Receipt"));
        let candidates = ids(&["c1", "c2"]);
        let prompt = CONFLICT.render::<RelationLabel>(
            &[("New criterion", "Receipt is emailed")],
            &["a", "b"],
        );

        let batch: BatchClassification<RelationLabel> = engine(oracle.clone())
            .classify_each(&ArtifactId::new("new"), &candidates, &prompt)
            .await;

        assert!(batch.is_failed());
        assert_eq!(batch.records.len(), 2);
        assert!(
            batch
                .records
                .iter()
                .all(|r| r.is_failed() && r.label() == RelationLabel::Unknown)
        );
        // timeouts are transient, so every attempt was spent
        assert_eq!(oracle.calls(), 3);
    }
}
