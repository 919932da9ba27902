use super::*;
use crate::form_core::visibility::depends_on;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

fn gated_schema() -> FormSchema {
    FormSchema::from_yaml_str(
        r#"
id: gated
fields:
  - id: A
    label: A
    renderer: select
    props:
      data: [x, y, show, hide]
  - id: B
    label: B
    visibleWhen: { field: A, op: equals, value: x }
  - id: C
    label: C
    visibleWhen: { field: B, op: equals, value: hello }
  - id: D
    label: D
    defaultValue: untouched
"#,
    )
    .unwrap()
}

#[test]
fn hidden_field_value_is_cleared_in_the_same_update() {
    let mut form = FormController::new(gated_schema(), None);
    form.change("A", json!("x"));
    form.change("B", json!("hello"));
    assert_eq!(form.value("B"), Some(&json!("hello")));

    form.change("A", json!("y"));
    assert_eq!(form.value("B"), None);
}

#[test]
fn clearing_cascades_through_chained_conditions() {
    let mut form = FormController::new(gated_schema(), None);
    form.change("A", json!("x"));
    form.change("B", json!("hello"));
    form.change("C", json!("deep"));
    assert_eq!(form.value("C"), Some(&json!("deep")));

    form.change("A", json!("y"));
    assert_eq!(form.value("B"), None);
    assert_eq!(form.value("C"), None);
    assert_eq!(form.value("D"), Some(&json!("untouched")));
}

#[test]
fn changing_a_field_only_affects_its_dependents() {
    let mut form = FormController::new(gated_schema(), None);
    form.change("A", json!("x"));
    let before: Vec<(String, bool)> = form
        .schema()
        .fields()
        .iter()
        .map(|f| (f.id.clone(), form.is_field_visible(&f.id)))
        .collect();
    form.change("D", json!("edited"));
    for (id, was_visible) in before {
        assert_eq!(form.is_field_visible(&id), was_visible, "field {id}");
    }

    form.change("A", json!("y"));
    let d = form.schema().field("D").unwrap();
    assert!(!depends_on(d, "A"));
    assert!(form.is_field_visible("D"));
    assert!(!form.is_field_visible("B"));
}

#[test]
fn reset_restores_the_initial_snapshot() {
    let mut initial = ValueMap::new();
    initial.insert("A".into(), json!("x"));
    initial.insert("B".into(), json!("preset"));
    let mut form = FormController::new(gated_schema(), Some(&initial));
    let snapshot = form.values().clone();
    assert_eq!(snapshot.get("B"), Some(&json!("preset")));
    assert_eq!(snapshot.get("C"), Some(&json!("")));

    form.change("A", json!("y"));
    form.change("D", json!("changed"));
    let _ = form.submit();
    assert!(form.is_dirty());

    form.reset();
    assert_eq!(form.values(), &snapshot);
    assert!(form.errors().is_empty());
    assert_eq!(form.phase(), FormPhase::Initialized);
    assert!(!form.is_dirty());

    form.reset();
    assert_eq!(form.values(), &snapshot);
}

#[test]
fn submit_blocks_on_missing_required_value() {
    let schema = FormSchema::from_yaml_str(
        r#"
fields:
  - id: name
    label: Name
    rules: { required: Name is required }
"#,
    )
    .unwrap();
    let calls = Rc::new(RefCell::new(0));
    let seen = calls.clone();
    let mut form = FormController::new(schema, None).on_submit(move |_| *seen.borrow_mut() += 1);

    let outcome = form.submit();
    assert_eq!(*calls.borrow(), 0);
    let mut expected = ErrorMap::new();
    expected.insert("name".into(), "Name is required".into());
    assert_eq!(outcome, SubmitOutcome::Rejected(expected.clone()));
    assert_eq!(form.errors(), &expected);
    assert_eq!(form.phase(), FormPhase::Invalid);

    form.change("name", json!(""));
    assert_eq!(form.phase(), FormPhase::Invalid);
    form.change("name", json!("Ada"));
    assert!(form.errors().is_empty());
    assert_eq!(form.phase(), FormPhase::Editing);
    assert!(matches!(form.submit(), SubmitOutcome::Submitted(_)));
    assert_eq!(*calls.borrow(), 1);
    assert_eq!(form.phase(), FormPhase::Submitted);
}

#[test]
fn submit_omits_values_of_hidden_fields() {
    let schema = FormSchema::from_yaml_str(
        r#"
fields:
  - id: A
    renderer: select
    props: { data: [show, hide] }
  - id: B
    visibleWhen: { field: A, op: equals, value: show }
    rules: { required: true }
"#,
    )
    .unwrap();
    let received: Rc<RefCell<Option<ValueMap>>> = Rc::new(RefCell::new(None));
    let sink = received.clone();
    let mut form = FormController::new(schema, None)
        .on_submit(move |values| *sink.borrow_mut() = Some(values.clone()));

    form.change("A", json!("show"));
    form.change("B", json!("data"));
    form.change("A", json!("hide"));

    match form.submit() {
        SubmitOutcome::Submitted(values) => {
            assert_eq!(values.get("A"), Some(&json!("hide")));
            assert!(!values.contains_key("B"));
        }
        other => panic!("expected submission, got {other:?}"),
    }
    let delivered = received.borrow().clone().unwrap();
    assert!(!delivered.contains_key("B"));
}

#[test]
fn submit_skips_validation_of_hidden_fields() {
    let schema = FormSchema::from_yaml_str(
        r#"
fields:
  - id: kind
    defaultValue: person
  - id: company
    visibleWhen: { field: kind, op: equals, value: company }
    rules: { required: Company is required }
"#,
    )
    .unwrap();
    let mut form = FormController::new(schema, None);
    assert!(matches!(form.submit(), SubmitOutcome::Submitted(_)));

    form.change("kind", json!("company"));
    match form.submit() {
        SubmitOutcome::Rejected(errors) => {
            assert_eq!(errors.get("company").map(String::as_str), Some("Company is required"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[test]
fn change_revalidates_only_the_edited_field() {
    let schema = FormSchema::from_yaml_str(
        r#"
fields:
  - id: email
    rules:
      required: Email is required
      pattern: { value: "@", message: Invalid email }
  - id: name
    rules: { required: Name is required }
"#,
    )
    .unwrap();
    let mut form = FormController::new(schema, None);
    form.change("email", json!(""));
    assert_eq!(form.error("email"), Some("Email is required"));
    assert_eq!(form.error("name"), None);

    form.change("email", json!("nope"));
    assert_eq!(form.error("email"), Some("Invalid email"));

    form.change("email", json!("a@b"));
    assert_eq!(form.error("email"), None);
    assert_eq!(form.phase(), FormPhase::Editing);
}

#[test]
fn initial_data_overrides_defaults() {
    let schema = FormSchema::from_yaml_str(
        r#"
fields:
  - id: active
    renderer: switch
    defaultValue: true
  - id: tags
    renderer: multiselect
  - id: age
    renderer: number
    defaultValue: 30
"#,
    )
    .unwrap();
    let mut data = ValueMap::new();
    data.insert("active".into(), json!(false));
    data.insert("age".into(), json!("41"));
    let form = FormController::new(schema, Some(&data));
    assert_eq!(form.value("active"), Some(&json!(false)));
    assert_eq!(form.value("tags"), Some(&json!([])));
    assert_eq!(form.value("age"), Some(&json!(41)));
    assert_eq!(form.phase(), FormPhase::Initialized);
}

#[test]
fn custom_validators_run_on_submit() {
    let schema = FormSchema::from_yaml_str(
        r#"
fields:
  - id: password
  - id: confirm
    rules: { validate: same_as_password }
"#,
    )
    .unwrap();
    let validators = Validators::new().register("same_as_password", |v, all| {
        if v == all.get("password") {
            Ok(())
        } else {
            Err("Passwords do not match".to_string())
        }
    });
    let mut form = FormController::new(schema, None).with_validators(validators);
    form.change("password", json!("a"));
    form.change("confirm", json!("b"));
    assert_eq!(form.error("confirm"), Some("Passwords do not match"));
    form.change("confirm", json!("a"));
    assert!(matches!(form.submit(), SubmitOutcome::Submitted(_)));
}

#[test]
fn unknown_field_changes_are_ignored() {
    let mut form = FormController::new(gated_schema(), None);
    let before = form.values().clone();
    form.change("nope", json!(1));
    assert_eq!(form.values(), &before);
    assert_eq!(form.phase(), FormPhase::Initialized);
}
