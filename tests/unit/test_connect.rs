use composable::backend::{DataStore, DirectoryDataStore, IfExists};
use composable::core::pipeline::{connect, Stage};
use composable::core::registry::{App, AppOptions, AppRegistry, AppType};
use composable::core::tags::{TypeHint, IDENTIFIER_TYPE};
use composable::core::types::{AppKind, ErrorCategory};
use composable::types::{Data, Outcome};
use std::sync::Arc;
use tempfile::TempDir;

struct Read;

impl App for Read {
    const NAME: &'static str = "read";
    const INPUT: TypeHint = TypeHint::Names(&[IDENTIFIER_TYPE]);
    const OUTPUT: TypeHint = TypeHint::Names(&["Text"]);

    fn main(&self, data: Data) -> anyhow::Result<Outcome> {
        Ok(Data::new("Text", format!("contents of {}", data.value)).into())
    }
}

struct Upper;

impl App for Upper {
    const NAME: &'static str = "upper";
    const INPUT: TypeHint = TypeHint::Names(&["Text"]);
    const OUTPUT: TypeHint = TypeHint::Names(&["Text"]);

    fn main(&self, data: Data) -> anyhow::Result<Outcome> {
        let text = data.value.as_str().unwrap_or_default().to_uppercase();
        Ok(Data::new("Text", text).into())
    }
}

struct Count;

impl App for Count {
    const NAME: &'static str = "count";
    const INPUT: TypeHint = TypeHint::Names(&["Text"]);
    const OUTPUT: TypeHint = TypeHint::Names(&["Count"]);

    fn main(&self, data: Data) -> anyhow::Result<Outcome> {
        let n = data.value.as_str().map(str::len).unwrap_or_default();
        Ok(Data::new("Count", n).into())
    }
}

struct Sink {
    store: Arc<dyn DataStore>,
}

impl App for Sink {
    const NAME: &'static str = "sink";
    const INPUT: TypeHint = TypeHint::Names(&["Text", "Count"]);
    const OUTPUT: TypeHint = TypeHint::Names(&[IDENTIFIER_TYPE]);

    fn main(&self, data: Data) -> anyhow::Result<Outcome> {
        Ok(Data::identifier(format!("stored {}", data.value)).into())
    }

    fn data_store(&self) -> Option<Arc<dyn DataStore>> {
        Some(Arc::clone(&self.store))
    }
}

struct Solo;

impl App for Solo {
    const NAME: &'static str = "solo";
    const INPUT: TypeHint = TypeHint::Names(&["Text"]);
    const OUTPUT: TypeHint = TypeHint::Names(&["Text"]);

    fn main(&self, data: Data) -> anyhow::Result<Outcome> {
        Ok(data.into())
    }
}

struct Fixture {
    read: AppType<Read>,
    upper: AppType<Upper>,
    count: AppType<Count>,
    sink: AppType<Sink>,
    solo: AppType<Solo>,
}

fn fixture() -> Fixture {
    let registry = AppRegistry::new();
    Fixture {
        read: registry.define::<Read>(AppOptions::loader()).unwrap(),
        upper: registry.define::<Upper>(AppOptions::default()).unwrap(),
        count: registry.define::<Count>(AppOptions::default()).unwrap(),
        sink: registry.define::<Sink>(AppOptions::writer()).unwrap(),
        solo: registry.define::<Solo>(AppOptions::non_composable()).unwrap(),
    }
}

fn names(stage: &Stage) -> Vec<String> {
    stage.chain().iter().map(|s| s.name().to_string()).collect()
}

#[test]
fn test_connect_compatible_stages() {
    let f = fixture();
    let read = f.read.build(Read).unwrap();
    let upper = f.upper.build(Upper).unwrap();
    let chained = connect(&read, &upper).unwrap();
    assert!(chained.ptr_eq(&upper));
    assert!(upper.predecessor().unwrap().ptr_eq(&read));
    assert!(read.has_successor());
}

#[test]
fn test_add_chains_three_stages() {
    let f = fixture();
    let chain = (f.read.build(Read).unwrap()
        + f.upper.build(Upper).unwrap()
        + f.count.build(Count).unwrap())
    .unwrap();
    assert_eq!(names(&chain), vec!["read", "upper", "count"]);
    let result = chain.call("a.txt").unwrap();
    let data = result.success().unwrap();
    assert_eq!(data.type_name, "Count");
    assert_eq!(data.value, serde_json::json!("CONTENTS OF \"A.TXT\"".len()));
}

#[test]
fn test_incompatible_types_name_both_sets() {
    let f = fixture();
    let count = f.count.build(Count).unwrap();
    let upper = f.upper.build(Upper).unwrap();
    let err = connect(&count, &upper).unwrap_err();
    assert_eq!(err.category, ErrorCategory::ConnectionError);
    assert_eq!(
        err.message,
        "upper() requires input type {'Text'}, count() produces {'Count'}"
    );
    assert!(upper.predecessor().is_none());
    assert!(!count.has_successor());
}

#[test]
fn test_connect_to_self_fails() {
    let f = fixture();
    let upper = f.upper.build(Upper).unwrap();
    let err = (upper.clone() + upper.clone()).unwrap_err();
    assert!(err.message.contains("to itself"));
}

#[test]
fn test_reconnect_requires_disconnect() {
    let f = fixture();
    let read = f.read.build(Read).unwrap();
    let upper = f.upper.build(Upper).unwrap();
    let other = f.upper.build(Upper).unwrap();
    connect(&read, &upper).unwrap();

    let err = connect(&other, &upper).unwrap_err();
    assert!(err.message.contains("already part of a composed function"));
    assert!(err.message.contains("disconnect()"));

    upper.disconnect();
    assert!(upper.predecessor().is_none());
    assert!(!read.has_successor());
    assert!(connect(&other, &upper).is_ok());
}

#[test]
fn test_producer_feeds_only_one_consumer() {
    let f = fixture();
    let upper = f.upper.build(Upper).unwrap();
    let count = f.count.build(Count).unwrap();
    let another = f.count.build(Count).unwrap();
    connect(&upper, &count).unwrap();
    let err = connect(&upper, &another).unwrap_err();
    assert!(err.message.starts_with("upper()"));
    assert!(another.predecessor().is_none());
}

#[test]
fn test_cycle_rejected() {
    let f = fixture();
    let first = f.upper.build(Upper).unwrap();
    let second = f.upper.build(Upper).unwrap();
    connect(&first, &second).unwrap();
    let err = connect(&second, &first).unwrap_err();
    assert!(err.message.contains("cycle"));
    assert!(first.predecessor().is_none());
}

#[test]
fn test_disconnect_clears_whole_chain() {
    let f = fixture();
    let read = f.read.build(Read).unwrap();
    let upper = f.upper.build(Upper).unwrap();
    let count = f.count.build(Count).unwrap();
    let chain = (read.clone() + upper.clone() + count.clone()).unwrap();
    chain.disconnect();
    for stage in [&read, &upper, &count] {
        assert!(stage.predecessor().is_none());
        assert!(!stage.has_successor());
    }
}

#[test]
fn test_writer_cannot_be_producer() {
    let f = fixture();
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn DataStore> =
        Arc::new(DirectoryDataStore::new(dir.path(), "txt", true, IfExists::Skip).unwrap());
    let sink = f.sink.build(Sink { store }).unwrap();
    assert_eq!(sink.kind(), AppKind::Writer);
    let upper = f.upper.build(Upper).unwrap();
    let err = connect(&sink, &upper).unwrap_err();
    assert!(err.message.contains("writer"));
}

#[test]
fn test_writer_kind_requires_store() {
    let f = fixture();
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn DataStore> =
        Arc::new(DirectoryDataStore::new(dir.path(), "txt", true, IfExists::Skip).unwrap());
    let sink = f.sink.build(Sink { store }).unwrap();
    assert!(sink.is_writer());

    let registry = AppRegistry::new();
    let storeless = registry.define::<Solo>(AppOptions::writer()).unwrap();
    let err = storeless.build(Solo).unwrap_err();
    assert_eq!(err.code, "CMP-REG-008");
    assert_eq!(err.category, ErrorCategory::RegistrationError);
}

#[test]
fn test_loader_cannot_be_consumer() {
    let f = fixture();
    let upper = f.upper.build(Upper).unwrap();
    let read = f.read.build(Read).unwrap();
    let err = connect(&upper, &read).unwrap_err();
    assert!(err.message.contains("loader"));
}

#[test]
fn test_non_composable_rejected_both_ways() {
    let f = fixture();
    let solo = f.solo.build(Solo).unwrap();
    let upper = f.upper.build(Upper).unwrap();
    assert!(connect(&solo, &upper).is_err());
    assert!(connect(&upper, &solo).is_err());
    assert!(solo.call(Data::new("Text", "still callable")).unwrap().is_success());
}

#[test]
fn test_chain_string_form() {
    let registry = AppRegistry::new();
    let stage1 = registry
        .define_fn(
            composable::core::registry::FnSignature {
                name: "stage1",
                module: "pipeline",
                input: TypeHint::Names(&["Text"]),
                output: TypeHint::Names(&["Text"]),
            },
            |data, _, _| Ok(data.into()),
            AppOptions::default(),
        )
        .unwrap();
    let stage2 = registry
        .define_fn(
            composable::core::registry::FnSignature {
                name: "stage2",
                module: "pipeline",
                input: TypeHint::Names(&["Text"]),
                output: TypeHint::Names(&["Text"]),
            },
            |data, _, _| Ok(data.into()),
            AppOptions::default(),
        )
        .unwrap();
    let a = stage1.build(vec![], composable::core::Params::new().with("a", 1));
    let b = stage2.build(vec![], composable::core::Params::new().with("b", 2));
    let chain = (a + b).unwrap();
    insta::assert_snapshot!(chain.to_string(), @"stage1(a=1) + stage2(b=2)");
}

#[test]
fn test_long_chain_string_wraps_without_breaking_words() {
    let f = fixture();
    let mut chain = f.read.build(Read).unwrap();
    for _ in 0..12 {
        chain = (chain + f.upper.build(Upper).unwrap()).unwrap();
    }
    let rendered = chain.to_string();
    assert!(rendered.lines().count() > 1);
    for line in rendered.lines() {
        assert!(line.len() <= 80);
        assert!(!line.starts_with(' '));
    }
    assert_eq!(rendered.split_whitespace().filter(|w| *w == "upper()").count(), 12);
}
