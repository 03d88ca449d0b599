//! Unit tests for the schema validator.

#[cfg(test)]
mod validator_tests {
    use crate::schema::*;
    use serde_json::json;

    fn overview_schema(verdicts: &[&str]) -> SchemaSpec {
        SchemaSpec::new()
            .required("verdict", FieldType::one_of(verdicts))
            .required("confidence_score", FieldType::ranged(0.0, 1.0))
            .optional("key_takeaway", FieldType::text())
    }

    // ============= Acceptance =============

    #[test]
    fn test_accepts_listed_verdict_with_score_in_range() {
        let schema = overview_schema(&["多方胜利", "多空势均力敌"]);
        let output = json!({
            "verdict": "多方胜利",
            "confidence_score": 0.85,
            "key_takeaway": "封板资金充足"
        });

        match validate(&output, &schema) {
            ValidationResult::Valid(v) => assert_eq!(v["verdict"], "多方胜利"),
            ValidationResult::Invalid(v) => panic!("unexpected violations: {:?}", v),
        }
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let schema = overview_schema(Verdict::LABELS);
        for score in [0.0, 1.0] {
            let output = json!({"verdict": "多方惨胜", "confidence_score": score});
            assert!(validate(&output, &schema).is_valid(), "score {}", score);
        }
    }

    #[test]
    fn test_numeric_string_is_coerced() {
        let schema = overview_schema(Verdict::LABELS);
        let output = json!({"verdict": "空方惨胜", "confidence_score": "0.6"});

        let ValidationResult::Valid(v) = validate(&output, &schema) else {
            panic!("numeric string should be accepted");
        };
        assert_eq!(v["confidence_score"], json!(0.6));
    }

    #[test]
    fn test_extra_keys_are_preserved() {
        let schema = overview_schema(Verdict::LABELS);
        let output = json!({"verdict": "多方惨胜", "confidence_score": 0.5, "note": "x"});

        let ValidationResult::Valid(v) = validate(&output, &schema) else {
            panic!("extra keys should not invalidate");
        };
        assert_eq!(v["note"], "x");
    }

    #[test]
    fn test_optional_field_may_be_absent_or_null() {
        let schema = overview_schema(Verdict::LABELS);
        let absent = json!({"verdict": "多方惨胜", "confidence_score": 0.5});
        let null = json!({"verdict": "多方惨胜", "confidence_score": 0.5, "key_takeaway": null});

        assert!(validate(&absent, &schema).is_valid());
        assert!(validate(&null, &schema).is_valid());
    }

    // ============= Rejection =============

    #[test]
    fn test_rejects_unknown_verdict_and_out_of_range_score() {
        let schema = overview_schema(Verdict::LABELS);
        let output = json!({"verdict": "胜利", "confidence_score": 1.5});

        let result = validate(&output, &schema);
        let violations = result.violations();
        assert_eq!(violations.len(), 2);
        assert!(violations
            .iter()
            .any(|v| v.path == "verdict" && matches!(v.kind, ViolationKind::NotInSet { .. })));
        assert!(violations.iter().any(|v| v.path == "confidence_score"
            && matches!(v.kind, ViolationKind::OutOfRange { value, .. } if value == 1.5)));
    }

    #[test]
    fn test_rejects_missing_required_field() {
        let schema = overview_schema(Verdict::LABELS);
        let output = json!({"verdict": "多方惨胜"});

        let result = validate(&output, &schema);
        assert_eq!(
            result.violations(),
            &[Violation::new("confidence_score", ViolationKind::Missing)]
        );
    }

    #[test]
    fn test_null_required_field_counts_as_missing() {
        let schema = overview_schema(Verdict::LABELS);
        let output = json!({"verdict": null, "confidence_score": 0.3});

        assert_eq!(
            validate(&output, &schema).violations(),
            &[Violation::new("verdict", ViolationKind::Missing)]
        );
    }

    #[test]
    fn test_enum_match_is_case_and_whitespace_sensitive() {
        let schema = SchemaSpec::new().required("side", FieldType::one_of(&["Buy", "Sell"]));

        assert!(!validate(&json!({"side": "buy"}), &schema).is_valid());
        assert!(!validate(&json!({"side": "Buy "}), &schema).is_valid());
        assert!(validate(&json!({"side": "Buy"}), &schema).is_valid());
    }

    #[test]
    fn test_wrong_type_reports_expected_and_found() {
        let schema = SchemaSpec::new().required("reasons", FieldType::list_of(FieldType::text()));
        let output = json!({"reasons": "涨幅偏离值达7%"});

        assert_eq!(
            validate(&output, &schema).violations(),
            &[Violation::new(
                "reasons",
                ViolationKind::WrongType {
                    expected: "array",
                    found: "string"
                }
            )]
        );
    }

    #[test]
    fn test_non_object_top_level_is_invalid_not_a_panic() {
        let schema = overview_schema(Verdict::LABELS);
        for output in [json!(null), json!([1, 2]), json!("多方惨胜"), json!(0.5)] {
            let result = validate(&output, &schema);
            assert!(!result.is_valid());
            assert_eq!(result.violations()[0].path, "$");
        }
    }

    #[test]
    fn test_nested_violations_carry_paths() {
        let level = SchemaSpec::new()
            .required("level", FieldType::one_of(SentimentLevel::LABELS))
            .required("interpretation", FieldType::text());
        let force = SchemaSpec::new().required("seat_name", FieldType::text());
        let schema = SchemaSpec::new()
            .required("market_sentiment", FieldType::object(level))
            .required("buying_force", FieldType::list_of(FieldType::object(force)));

        let output = json!({
            "market_sentiment": {"level": "狂热", "interpretation": "..."},
            "buying_force": [{"seat_name": "a"}, {"player": "b"}]
        });

        let paths: Vec<String> = validate(&output, &schema)
            .violations()
            .iter()
            .map(|v| v.path.clone())
            .collect();
        assert_eq!(paths, vec!["market_sentiment.level", "buying_force[1].seat_name"]);
    }

    // ============= Example rendering =============

    #[test]
    fn test_example_lists_enum_options_and_ranges() {
        let schema = overview_schema(&["多方惨胜", "空方惨胜"]);
        let example = schema.example();

        assert_eq!(
            example["verdict"],
            "string, must be one of ['多方惨胜', '空方惨胜']"
        );
        assert_eq!(example["confidence_score"], "number between 0 and 1");
        assert!(schema.example_text().contains("key_takeaway"));
    }
}
