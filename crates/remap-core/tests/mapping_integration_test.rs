//! Integration tests for building, sealing and executing mappings
//!
//! Exercises the public API end to end against the bundled schema registry:
//! - Rule semantics (reassign, replace sub-modes, nested mappers, collections)
//! - Completeness checks at seal time
//! - Error propagation from caller functions and hosts
//! - Sharing one sealed mapper across threads
//! - Loading a YAML project from disk

use std::error::Error as _;
use std::sync::Arc;
use std::thread;

use remap_core::property::{PropertyInfo, ValueType};
use remap_core::registry::{RecordSchema, SchemaRegistry};
use remap_core::{
    Error, ExecutionError, FunctionRegistry, Mapper, MappingOptions, MappingSpec, Project, Record,
    RecordHost, SpecificationError, Value, ValueSet, Violation,
};
use rstest::rstest;

fn t(s: &str) -> ValueType {
    s.parse().unwrap()
}

/// Person/PersonView plus nested address and friend types
fn host() -> Arc<dyn RecordHost> {
    Arc::new(
        SchemaRegistry::new()
            .with(
                RecordSchema::new("Person")
                    .property("name", t("string"))
                    .property("age", t("int"))
                    .property("nickname", t("string?")),
            )
            .with(
                RecordSchema::new("PersonView")
                    .property("fullName", t("string"))
                    .property("ageGroup", t("string"))
                    .property("nickname", t("string?")),
            )
            .with(RecordSchema::new("Address").property("city", t("string")))
            .with(RecordSchema::new("AddressView").property("city", t("string")))
            .with(
                RecordSchema::new("Customer")
                    .property("id", t("int"))
                    .property("home", t("Address?"))
                    .property("friends", t("list<Address>")),
            )
            .with(
                RecordSchema::new("CustomerView")
                    .property("id", t("int"))
                    .property("home", t("AddressView?"))
                    .property("friends", t("set<AddressView>")),
            )
            .with(
                RecordSchema::new("CustomerList")
                    .property("id", t("int"))
                    .property("home", t("AddressView?"))
                    .property("friends", t("list<AddressView>")),
            )
            .with(
                RecordSchema::new("CustomerAbstract")
                    .property("id", t("int"))
                    .property("home", t("AddressView?"))
                    .with(
                        PropertyInfo::new("friends", t("collection<AddressView>"))
                            .with_default(Value::Set(ValueSet::new())),
                    ),
            )
            .with(
                RecordSchema::new("CustomerUnclassified")
                    .property("id", t("int"))
                    .property("home", t("AddressView?"))
                    .property("friends", t("collection<AddressView>")),
            ),
    )
}

fn person_mapper() -> Mapper {
    MappingSpec::new(host(), "Person", "PersonView")
        .unwrap()
        .reassign("name")
        .to("fullName")
        .unwrap()
        .replace("age", "ageGroup")
        .with(|age| Value::from(if age.as_int() >= Some(18) { "adult" } else { "minor" }))
        .unwrap()
        .map("nickname")
        .unwrap()
        .seal()
        .unwrap()
}

fn address_mapper() -> Mapper {
    MappingSpec::new(host(), "Address", "AddressView")
        .unwrap()
        .seal()
        .unwrap()
}

fn address(city: &str) -> Record {
    Record::new("Address").with("city", city)
}

fn address_view(city: &str) -> Value {
    Value::Record(Record::new("AddressView").with("city", city))
}

fn customer(home: Option<Record>, friends: Vec<Record>) -> Record {
    Record::new("Customer")
        .with("id", 7)
        .with("home", home)
        .with("friends", friends)
}

fn customer_mapper(destination: &str) -> Mapper {
    let addresses = address_mapper();
    MappingSpec::new(host(), "Customer", destination)
        .unwrap()
        .map("id")
        .unwrap()
        .use_mapper_for("home", "home", &addresses)
        .unwrap()
        .map_collection("friends", "friends", &addresses)
        .unwrap()
        .seal()
        .unwrap()
}

// =============================================================================
// End-to-end
// =============================================================================

#[test]
fn test_person_to_view() {
    let view = person_mapper()
        .transform(&Record::new("Person").with("name", "Al").with("age", 30))
        .unwrap();

    assert_eq!(
        view,
        Record::new("PersonView")
            .with("fullName", "Al")
            .with("ageGroup", "adult")
            .with("nickname", Value::Null)
    );
}

#[test]
fn test_mapper_lists_rules_in_declaration_order() {
    let rendered = person_mapper().to_string();
    let lines: Vec<_> = rendered.lines().collect();
    assert_eq!(lines[0], "Mapping from Person to PersonView with transformations:");
    assert!(lines[1].starts_with("- Reassign"));
    assert!(lines[2].starts_with("- Replace"));
    assert!(lines[3].starts_with("- Map"));
}

#[test]
fn test_transform_all_and_wrong_source_type() {
    let mapper = person_mapper();
    let people = [
        Record::new("Person").with("name", "Al").with("age", 30),
        Record::new("Person").with("name", "Bo").with("age", 9),
    ];
    let views = mapper.transform_all(&people).unwrap();
    assert_eq!(views[1].get("ageGroup"), Some(&Value::from("minor")));

    let err = mapper.transform(&address("Oslo")).unwrap_err();
    assert!(matches!(err, ExecutionError::SourceTypeMismatch { .. }));
}

// =============================================================================
// Rule semantics
// =============================================================================

#[rstest]
#[case(Value::Null, Value::from("untouched"))]
#[case(Value::from("Ace"), Value::from("ACE"))]
fn test_replace_skip_when_null(#[case] nickname: Value, #[case] expected: Value) {
    let registry = SchemaRegistry::new()
        .with(RecordSchema::new("S").property("nick", t("string?")))
        .with(
            RecordSchema::new("D")
                .with(PropertyInfo::new("nick", t("string?")).with_default("untouched".into())),
        );
    let mapper = MappingSpec::new(Arc::new(registry), "S", "D")
        .unwrap()
        .replace("nick", "nick")
        .with_skip_when_null(|v| Value::from(v.as_str().unwrap_or_default().to_uppercase()))
        .unwrap()
        .seal()
        .unwrap();

    let out = mapper
        .transform(&Record::new("S").with("nick", nickname))
        .unwrap();
    assert_eq!(out.get("nick"), Some(&expected));
}

#[test]
fn test_strict_replace_sees_absent_value() {
    let registry = SchemaRegistry::new()
        .with(RecordSchema::new("S").property("nick", t("string?")))
        .with(RecordSchema::new("D").property("nick", t("string")));
    let mapper = MappingSpec::new(Arc::new(registry), "S", "D")
        .unwrap()
        .replace("nick", "nick")
        .with(|v| Value::from(if v.is_null() { "none" } else { "some" }))
        .unwrap()
        .seal()
        .unwrap();
    let out = mapper.transform(&Record::new("S")).unwrap();
    assert_eq!(out.get("nick"), Some(&Value::from("none")));
}

#[rstest]
#[case(t("int"), Value::Int(0))]
#[case(t("string"), Value::from(""))]
#[case(t("string?"), Value::Null)]
#[case(t("float"), Value::Float(-0.0))]
#[case(t("int"), Value::Int(i64::MIN))]
fn test_reassign_copies_boundary_values(#[case] value_type: ValueType, #[case] value: Value) {
    let registry = SchemaRegistry::new()
        .with(RecordSchema::new("S").property("a", value_type.clone()))
        .with(RecordSchema::new("D").property("b", value_type));
    let mapper = MappingSpec::new(Arc::new(registry), "S", "D")
        .unwrap()
        .reassign("a")
        .to("b")
        .unwrap()
        .seal()
        .unwrap();
    let out = mapper
        .transform(&Record::new("S").with("a", value.clone()))
        .unwrap();
    assert_eq!(out.get("b"), Some(&value));
}

#[test]
fn test_use_mapper_absent_and_present() {
    let mapper = customer_mapper("CustomerList");

    let out = mapper.transform(&customer(None, vec![])).unwrap();
    assert_eq!(out.get("home"), Some(&Value::Null));

    let out = mapper
        .transform(&customer(Some(address("Oslo")), vec![]))
        .unwrap();
    assert_eq!(out.get("home"), Some(&address_view("Oslo")));
}

#[derive(Debug, thiserror::Error)]
#[error("address mapper ran")]
struct AddressMapperRan;

#[test]
fn test_use_mapper_skips_nested_mapper_for_absent_value() {
    let failing = MappingSpec::new(host(), "Address", "AddressView")
        .unwrap()
        .replace("city", "city")
        .try_with(|_| Err::<Value, _>(AddressMapperRan))
        .unwrap()
        .seal()
        .unwrap();
    let mapper = MappingSpec::new(host(), "Customer", "CustomerList")
        .unwrap()
        .map("id")
        .unwrap()
        .use_mapper_for("home", "home", &failing)
        .unwrap()
        .map_collection("friends", "friends", &failing)
        .unwrap()
        .seal()
        .unwrap();

    let out = mapper.transform(&customer(None, vec![])).unwrap();
    assert_eq!(out.get("home"), Some(&Value::Null));

    let err = mapper
        .transform(&customer(Some(address("Oslo")), vec![]))
        .unwrap_err();
    let mut cause: Option<&(dyn std::error::Error + 'static)> = Some(&err);
    let mut ran = false;
    while let Some(current) = cause {
        ran |= current.downcast_ref::<AddressMapperRan>().is_some();
        cause = current.source();
    }
    assert!(ran, "{err}");
}

#[test]
fn test_map_collection_into_list_keeps_order() {
    let out = customer_mapper("CustomerList")
        .transform(&customer(None, vec![address("B"), address("A"), address("B")]))
        .unwrap();
    assert_eq!(
        out.get("friends"),
        Some(&Value::List(vec![
            address_view("B"),
            address_view("A"),
            address_view("B"),
        ]))
    );
}

#[test]
fn test_map_collection_into_set_collapses_duplicates() {
    let out = customer_mapper("CustomerView")
        .transform(&customer(None, vec![address("B"), address("A"), address("B")]))
        .unwrap();
    let expected: ValueSet = [address_view("A"), address_view("B")].into_iter().collect();
    assert_eq!(out.get("friends"), Some(&Value::Set(expected)));
}

#[test]
fn test_abstract_collection_takes_instance_kind() {
    let out = customer_mapper("CustomerAbstract")
        .transform(&customer(None, vec![address("A"), address("A")]))
        .unwrap();
    match out.get("friends") {
        Some(Value::Set(items)) => assert_eq!(items.len(), 1),
        other => panic!("Expected a set, got {other:?}"),
    }
}

#[test]
fn test_unclassifiable_collection_fails_at_runtime() {
    let err = customer_mapper("CustomerUnclassified")
        .transform(&customer(None, vec![address("A")]))
        .unwrap_err();
    assert!(matches!(err, ExecutionError::UnsupportedCollection { .. }));
}

#[test]
fn test_map_target_is_rejected_statically() {
    let registry = SchemaRegistry::new()
        .with(RecordSchema::new("Address").property("city", t("string")))
        .with(RecordSchema::new("AddressView").property("city", t("string")))
        .with(RecordSchema::new("S").property("xs", t("list<Address>")))
        .with(RecordSchema::new("D").property("xs", t("map<AddressView>")));
    let host: Arc<dyn RecordHost> = Arc::new(registry);
    let nested = MappingSpec::new(host.clone(), "Address", "AddressView")
        .unwrap()
        .seal()
        .unwrap();
    let err = MappingSpec::new(host, "S", "D")
        .unwrap()
        .map_collection("xs", "xs", &nested)
        .err()
        .unwrap();
    assert!(matches!(err, SpecificationError::UnsupportedCollection { .. }));
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
#[error("age out of range")]
struct AgeOutOfRange;

#[test]
fn test_replace_failure_preserves_cause() {
    let mapper = MappingSpec::new(host(), "Person", "PersonView")
        .unwrap()
        .reassign("name")
        .to("fullName")
        .unwrap()
        .replace("age", "ageGroup")
        .try_with(|_| Err::<Value, _>(AgeOutOfRange))
        .unwrap()
        .seal()
        .unwrap();

    let err = mapper
        .transform(&Record::new("Person").with("name", "Al").with("age", 300))
        .unwrap_err();
    let cause = err.source().unwrap();
    assert!(cause.downcast_ref::<AgeOutOfRange>().is_some());
}

#[test]
fn test_nested_failure_names_the_property() {
    let err = customer_mapper("CustomerList")
        .transform(&customer(Some(Record::new("Address").with("city", 5)), vec![]))
        .unwrap_err();
    match err {
        ExecutionError::Nested { property, .. } => assert_eq!(property.name(), "home"),
        other => panic!("Expected nested failure, got {other:?}"),
    }
}

#[test]
fn test_incomplete_spec_never_seals() {
    let err = MappingSpec::new(host(), "Person", "PersonView")
        .unwrap()
        .with_options(MappingOptions {
            implicit_mapping: false,
        })
        .reassign("name")
        .to("fullName")
        .unwrap()
        .seal()
        .unwrap_err();

    let properties: Vec<_> = err.violations.iter().map(Violation::property).collect();
    assert_eq!(properties, ["ageGroup", "nickname", "age", "nickname"]);
}

#[test]
fn test_second_rule_for_destination_is_rejected() {
    let err = MappingSpec::new(host(), "Person", "PersonView")
        .unwrap()
        .reassign("name")
        .to("fullName")
        .unwrap()
        .replace("nickname", "fullName")
        .with(|v| v)
        .err()
        .unwrap();
    assert!(matches!(err, SpecificationError::DuplicateDestination { .. }));
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_mapper_shared_across_threads() {
    let mapper = person_mapper();
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let mapper = mapper.clone();
            thread::spawn(move || {
                let person = Record::new("Person")
                    .with("name", format!("p{i}"))
                    .with("age", i * 5);
                mapper.transform(&person).unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let view = handle.join().unwrap();
        assert_eq!(view.get("fullName"), Some(&Value::from(format!("p{i}"))));
    }
}

// =============================================================================
// Project loading
// =============================================================================

#[test]
fn test_yaml_project_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("mappings")).unwrap();
    std::fs::write(
        dir.path().join("remap.yaml"),
        r#"
name: people
types:
  Person:
    name: string
    age: int
    nickname: string?
  PersonView:
    fullName: string
    ageGroup: string
    nickname: string?
"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("mappings/person.yaml"),
        r#"
name: person_view
from: Person
to: PersonView
rules:
  - reassign: { from: name, to: fullName }
  - replace: { from: age, to: ageGroup, function: to_string }
"#,
    )
    .unwrap();

    let project = Project::load(dir.path()).unwrap();
    let mappers = project
        .seal_all(&FunctionRegistry::with_builtins())
        .unwrap();
    let view = mappers["person_view"]
        .transform(&Record::new("Person").with("name", "Al").with("age", 30))
        .unwrap();
    assert_eq!(view.get("ageGroup"), Some(&Value::from("30")));
    assert_eq!(mappers["person_view"].declared_rules().count(), 2);

    let err = Project::load(dir.path().join("missing")).unwrap_err();
    assert!(matches!(err, Error::ConfigNotFound { .. }));
}
