use composable::core::registry::{App, AppOptions, AppRegistry, FnSignature};
use composable::core::tags::TypeHint;
use composable::core::types::{AppKind, ErrorCategory};
use composable::types::{Data, Outcome};
use std::collections::BTreeSet;

struct Echo;

impl App for Echo {
    const NAME: &'static str = "echo";
    const INPUT: TypeHint = TypeHint::Names(&["Text", "Sequences"]);
    const OUTPUT: TypeHint = TypeHint::Names(&["Text"]);

    fn main(&self, data: Data) -> anyhow::Result<Outcome> {
        Ok(data.into())
    }
}

struct NoInputHint;

impl App for NoInputHint {
    const NAME: &'static str = "no_input_hint";
    const OUTPUT: TypeHint = TypeHint::Names(&["Text"]);

    fn main(&self, data: Data) -> anyhow::Result<Outcome> {
        Ok(data.into())
    }
}

struct UnitOutput;

impl App for UnitOutput {
    const NAME: &'static str = "unit_output";
    const INPUT: TypeHint = TypeHint::Names(&["Text"]);
    const OUTPUT: TypeHint = TypeHint::Unit;

    fn main(&self, data: Data) -> anyhow::Result<Outcome> {
        Ok(data.into())
    }
}

struct DefinesInvoke;

impl App for DefinesInvoke {
    const NAME: &'static str = "defines_invoke";
    const INPUT: TypeHint = TypeHint::Names(&["Text"]);
    const OUTPUT: TypeHint = TypeHint::Names(&["Text"]);
    const MEMBERS: &'static [&'static str] = &["invoke", "helper"];

    fn main(&self, data: Data) -> anyhow::Result<Outcome> {
        Ok(data.into())
    }
}

struct DefinesDisconnect;

impl App for DefinesDisconnect {
    const NAME: &'static str = "defines_disconnect";
    const INPUT: TypeHint = TypeHint::Names(&["Text"]);
    const OUTPUT: TypeHint = TypeHint::Names(&["Text"]);
    const MEMBERS: &'static [&'static str] = &["disconnect"];

    fn main(&self, data: Data) -> anyhow::Result<Outcome> {
        Ok(data.into())
    }
}

struct Sealed;

impl App for Sealed {
    const NAME: &'static str = "sealed";
    const INPUT: TypeHint = TypeHint::Names(&["Text"]);
    const OUTPUT: TypeHint = TypeHint::Names(&["Text"]);
    const SEALED: bool = true;

    fn main(&self, data: Data) -> anyhow::Result<Outcome> {
        Ok(data.into())
    }
}

struct EchoChild;

impl App for EchoChild {
    const NAME: &'static str = "echo_child";
    const INPUT: TypeHint = TypeHint::Names(&["Text"]);
    const OUTPUT: TypeHint = TypeHint::Names(&["Text"]);
    const EXTENDS: Option<&'static str> = Some("Echo");

    fn main(&self, data: Data) -> anyhow::Result<Outcome> {
        Ok(data.into())
    }
}

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[test]
fn test_tags_derived_from_hints() {
    let registry = AppRegistry::new();
    let echo = registry.define::<Echo>(AppOptions::default()).unwrap();
    assert_eq!(echo.tags().input_types(), &set(&["Sequences", "Text"]));
    assert_eq!(echo.tags().data_types(), &set(&["Sequences", "Text"]));
    assert_eq!(echo.tags().output_types(), &set(&["Text"]));
    assert!(echo.type_name().ends_with("::Echo"));

    let stage = echo.build(Echo).unwrap();
    assert_eq!(stage.name(), "echo");
    assert_eq!(stage.kind(), AppKind::Generic);
    assert!(registry.is_composable_stage(&stage));
}

#[test]
fn test_missing_input_hint_rejected() {
    let registry = AppRegistry::new();
    let err = registry.define::<NoInputHint>(AppOptions::default()).err().unwrap();
    assert_eq!(err.category, ErrorCategory::RegistrationError);
    assert!(err.message.contains("first parameter"));
    assert!(!registry.contains("NoInputHint"));
}

#[test]
fn test_unit_return_hint_rejected() {
    let registry = AppRegistry::new();
    let err = registry.define::<UnitOutput>(AppOptions::default()).err().unwrap();
    assert!(err.message.contains("return type"));
}

#[test]
fn test_reserved_members_rejected() {
    let registry = AppRegistry::new();
    let err = registry.define::<DefinesInvoke>(AppOptions::default()).err().unwrap();
    assert_eq!(err.code, "CMP-REG-003");
    assert!(err.message.contains("invoke"));
    assert!(!err.message.contains("helper"));
}

#[test]
fn test_composable_members_reserved_only_for_composable_apps() {
    let registry = AppRegistry::new();
    assert!(registry
        .define::<DefinesDisconnect>(AppOptions::default())
        .is_err());
    let app = registry
        .define::<DefinesDisconnect>(AppOptions::non_composable())
        .unwrap();
    assert!(!app.is_composable());
    assert!(!registry.is_composable("DefinesDisconnect"));
    assert!(registry.contains("DefinesDisconnect"));
}

#[test]
fn test_sealed_layout_rejected() {
    let registry = AppRegistry::new();
    let err = registry.define::<Sealed>(AppOptions::default()).err().unwrap();
    assert!(err.message.contains("sealed"));
}

#[test]
fn test_extending_registered_app_rejected() {
    let registry = AppRegistry::new();
    assert!(registry.define::<EchoChild>(AppOptions::default()).is_ok());
    registry.remove("EchoChild");

    registry.define::<Echo>(AppOptions::default()).unwrap();
    let err = registry.define::<EchoChild>(AppOptions::default()).err().unwrap();
    assert_eq!(err.code, "CMP-REG-002");
    assert!(err.message.contains("composition"));
}

#[test]
fn test_registering_twice_rejected() {
    let registry = AppRegistry::new();
    registry.define::<Echo>(AppOptions::default()).unwrap();
    let err = registry.define::<Echo>(AppOptions::default()).err().unwrap();
    assert_eq!(err.code, "CMP-REG-001");
}

#[test]
fn test_registries_are_independent() {
    let first = AppRegistry::new();
    let second = AppRegistry::new();
    first.define::<Echo>(AppOptions::default()).unwrap();
    assert!(second.define::<Echo>(AppOptions::default()).is_ok());
}

#[test]
fn test_define_fn_records_qualified_name() {
    let registry = AppRegistry::new();
    let double = registry
        .define_fn(
            FnSignature {
                name: "double",
                module: "maths",
                input: TypeHint::Names(&["Count"]),
                output: TypeHint::Names(&["Count"]),
            },
            |data, _, _| {
                let n = data.value.as_i64().unwrap_or_default();
                Ok(Data::new("Count", n * 2).into())
            },
            AppOptions::default(),
        )
        .unwrap();
    assert_eq!(double.type_name(), "maths::double");
    assert!(registry.is_composable("maths::double"));
    assert!(registry.is_composable("double"));

    let stage = double.build(Vec::new(), Default::default());
    assert_eq!(stage.kind(), AppKind::Generic);
    assert_eq!(stage.to_string(), "double()");
    let result = stage.call(Data::new("Count", 4)).unwrap();
    assert_eq!(result.success().unwrap().value, serde_json::json!(8));
}

#[test]
fn test_define_fn_requires_hints() {
    let registry = AppRegistry::new();
    let result = registry.define_fn(
        FnSignature {
            name: "untyped",
            module: "maths",
            input: TypeHint::Missing,
            output: TypeHint::Names(&["Count"]),
        },
        |data, _, _| Ok(data.into()),
        AppOptions::default(),
    );
    assert!(result.is_err());
    assert!(!registry.contains("maths::untyped"));
}

#[test]
fn test_failed_registrations_not_recorded() {
    let registry = AppRegistry::new();
    assert!(registry.define::<Sealed>(AppOptions::default()).is_err());
    registry.define::<Echo>(AppOptions::default()).unwrap();
    assert!(registry.define::<UnitOutput>(AppOptions::default()).is_err());
    let names = registry.names();
    assert_eq!(names.len(), 1);
    assert!(names[0].ends_with("::Echo"));
}
