//! Property-Based Tests for defaulting and acknowledgment
//!
//! Properties:
//! - The default policy never replaces a value that is already present
//! - Auto fields are idempotent
//! - A token verifies against the record it was issued for, and only that record
//! - Templates without placeholders pass through interpolation untouched

use chrono::{DateTime, Utc};
use proptest::prelude::*;

use tenet_core::{DefaultDefinition, Operation, ValidationIssue, Value};
use tenet_dsl::ExpressionEngine;
use tenet_test_utils::fixtures;
use tenet_test_utils::generators::{arb_identifier, arb_record, arb_timestamp};
use tenet_validation::*;

fn defaulting() -> DefaultingService {
    DefaultingService::new(ExpressionEngine::with_builtins())
}

fn acknowledgments() -> WarningAcknowledgmentService {
    WarningAcknowledgmentService::new("property-secret", 300).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_default_policy_keeps_present_values(rec in arb_record(), field in arb_identifier()) {
        let defaults = [DefaultDefinition::value(field.clone(), "filled")];
        let result = defaulting()
            .apply_defaults(&rec, &defaults, Operation::Create, None, None)
            .unwrap();

        match rec.get(&field) {
            Some(existing) if !existing.is_blank() => prop_assert_eq!(&result[&field], existing),
            _ => prop_assert_eq!(&result[&field], &Value::from("filled")),
        }
        for (key, value) in &rec {
            if key != &field {
                prop_assert_eq!(&result[key], value);
            }
        }
    }

    #[test]
    fn prop_auto_fields_are_idempotent(rec in arb_record(), now in arb_timestamp()) {
        let svc = defaulting();
        let user = fixtures::user();
        let fields = auto_fields(&fixtures::contact_entity());
        let later: DateTime<Utc> = now + chrono::Duration::hours(1);

        let once = svc.apply_auto_fields(&rec, Operation::Create, &fields, Some(&user), now);
        let twice = svc.apply_auto_fields(&once, Operation::Create, &fields, Some(&user), later);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_token_binds_record(rec in arb_record(), extra in arb_identifier()) {
        let svc = acknowledgments();
        let warnings = [ValidationIssue::warning("Check", "CHECK")];
        let now = Utc::now();
        let token = svc.generate_token_at("item", &rec, &warnings, now);

        prop_assert_eq!(svc.verify_token_at(&token, "item", &rec, &warnings, now), Ok(()));

        let mut changed = rec.clone();
        let marker = Value::from("__changed__");
        if changed.get(&extra) != Some(&marker) {
            changed.insert(extra, marker);
            prop_assert_eq!(
                svc.verify_token_at(&token, "item", &changed, &warnings, now),
                Err(AcknowledgmentError::DataChanged)
            );
        }
    }

    #[test]
    fn prop_plain_templates_unchanged(template in "[a-zA-Z0-9 .,!?']{0,40}", rec in arb_record()) {
        let interpolator = MessageInterpolator::new();
        prop_assert_eq!(interpolator.interpolate(&template, &rec, None), template);
    }
}
