//! Verify the JSON mapping of every entity against `test-vectors/models.json`.
//!
//! Each case holds a payload with exactly the entity's declared fields.
//! Hydrating it and serializing it back with `include_none = true` must
//! reproduce the payload; with `include_none = false` no `null` may remain.
//! Comparing parsed JSON (not raw strings) avoids false negatives from
//! field-ordering differences.

use serde_json::{Map, Value};
use testrail_core::{
    Attachment, CaseType, Configuration, GroupConfig, Model, Priority, ResultFields, Run, Section,
    Status, Template, TestResult, User,
};

fn vectors() -> Vec<Value> {
    let raw = include_str!("../../test-vectors/models.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    vectors["cases"].as_array().unwrap().clone()
}

fn contains_null(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.iter().any(contains_null),
        Value::Object(map) => map.values().any(contains_null),
        _ => false,
    }
}

/// Round-trip, sparse-form and strict-hydration checks for one entity type.
fn check<M: Model + PartialEq + std::fmt::Debug>(name: &str, payload: &Value) {
    let entity = M::from_json(payload.clone()).unwrap_or_else(|e| panic!("{name}: {e}"));

    let full = entity.to_json(true).unwrap();
    assert_eq!(&Value::Object(full.clone()), payload, "{name}: include_none round-trip");

    let again = M::from_json(Value::Object(full)).unwrap();
    assert_eq!(again, entity, "{name}: from_json(to_json(e)) == e");

    let sparse: Map<String, Value> = entity.to_json(false).unwrap();
    assert!(!contains_null(&Value::Object(sparse.clone())), "{name}: sparse form has nulls");
    let from_sparse = M::from_json(Value::Object(sparse)).unwrap();
    assert_eq!(from_sparse, entity, "{name}: sparse form hydrates to the same entity");

    M::from_json_strict(payload.clone()).unwrap_or_else(|e| panic!("{name}: strict: {e}"));
}

#[test]
fn model_test_vectors() {
    for case in vectors() {
        let name = case["name"].as_str().unwrap();
        let payload = &case["payload"];
        match case["entity"].as_str().unwrap() {
            "User" => check::<User>(name, payload),
            "Template" => check::<Template>(name, payload),
            "Status" => check::<Status>(name, payload),
            "Section" => check::<Section>(name, payload),
            "ResultFields" => check::<ResultFields>(name, payload),
            "CaseType" => check::<CaseType>(name, payload),
            "GroupConfig" => check::<GroupConfig>(name, payload),
            "Configuration" => check::<Configuration>(name, payload),
            "Priority" => check::<Priority>(name, payload),
            "Result" => check::<TestResult>(name, payload),
            "Run" => check::<Run>(name, payload),
            "Attachment" => check::<Attachment>(name, payload),
            other => panic!("{name}: unknown entity {other}"),
        }
    }
}

#[test]
fn missing_name_is_rejected() {
    for case in vectors() {
        let name = case["name"].as_str().unwrap();
        let entity = case["entity"].as_str().unwrap();
        let mut payload = case["payload"].clone();
        let required = match entity {
            "Result" => continue,
            "Run" | "Section" | "Attachment" | "User" | "Status" | "Template" | "CaseType"
            | "Priority" | "GroupConfig" | "Configuration" | "ResultFields" => "name",
            other => panic!("{name}: unknown entity {other}"),
        };
        payload.as_object_mut().unwrap().remove(required);

        let failed = match entity {
            "User" => User::from_json(payload).is_err(),
            "Template" => Template::from_json(payload).is_err(),
            "Status" => Status::from_json(payload).is_err(),
            "Section" => Section::from_json(payload).is_err(),
            "ResultFields" => ResultFields::from_json(payload).is_err(),
            "CaseType" => CaseType::from_json(payload).is_err(),
            "GroupConfig" => GroupConfig::from_json(payload).is_err(),
            "Configuration" => Configuration::from_json(payload).is_err(),
            "Priority" => Priority::from_json(payload).is_err(),
            "Run" => Run::from_json(payload).is_err(),
            "Attachment" => Attachment::from_json(payload).is_err(),
            _ => unreachable!(),
        };
        assert!(failed, "{name}: hydrated without required `{required}`");
    }
}
