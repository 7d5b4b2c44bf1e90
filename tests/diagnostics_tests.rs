//! Checks the `tracing` events emitted while parsing and dumping trees.
//!
//! A capture layer records every event with its level, target and fields so
//! the tests can assert on what a log sink would receive.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use acm::{from_slice, parse, to_vec, Branch, ParseOptions, WriteOptions};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: Level,
    target: String,
    fields: HashMap<String, String>,
}

impl CapturedEvent {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default)]
struct EventStore(Arc<Mutex<Vec<CapturedEvent>>>);

impl EventStore {
    fn events(&self) -> Vec<CapturedEvent> {
        self.0.lock().unwrap().clone()
    }

    fn at_level(&self, level: Level) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.level == level)
            .collect()
    }
}

struct FieldVisitor(HashMap<String, String>);

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{:?}", value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }
}

struct EventCaptureLayer {
    store: EventStore,
}

impl<S: Subscriber> Layer<S> for EventCaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = FieldVisitor(HashMap::new());
        event.record(&mut fields);

        let meta = event.metadata();
        self.store.0.lock().unwrap().push(CapturedEvent {
            level: *meta.level(),
            target: meta.target().to_string(),
            fields: fields.0,
        });
    }
}

fn init_test_tracing() -> (EventStore, tracing::subscriber::DefaultGuard) {
    let store = EventStore::default();
    let layer = EventCaptureLayer {
        store: store.clone(),
    };
    let subscriber = tracing_subscriber::registry().with(layer);
    let guard = tracing::subscriber::set_default(subscriber);
    (store, guard)
}

#[test]
fn test_lenient_parse_warns_with_position() {
    let (store, _guard) = init_test_tracing();

    let text = "object cfg {\n\tint32 x 42\n\tbool flag maybe\n}\n";
    let options = ParseOptions::new().with_source("game.acm");
    let parsed = parse(text, &options).unwrap();

    assert_eq!(parsed.root.as_ref().map(Branch::len), Some(2));

    let warnings = store.at_level(Level::WARN);
    assert_eq!(warnings.len(), 1);
    let warning = &warnings[0];
    assert_eq!(warning.field("path"), Some("game.acm"));
    assert_eq!(warning.field("line"), Some("3"));
    assert_eq!(warning.field("column"), Some("12"));
    assert!(warning.field("message").unwrap().contains("maybe"));

    assert_eq!(parsed.diagnostics[0].line, 3);
    assert_eq!(parsed.diagnostics[0].column, 12);
}

#[test]
fn test_strict_parse_does_not_warn() {
    let (store, _guard) = init_test_tracing();

    let text = "object cfg { bool flag maybe }";
    assert!(parse(text, &ParseOptions::strict()).is_err());
    assert!(store.at_level(Level::WARN).is_empty());
}

#[test]
fn test_lexer_warns_on_unterminated_string() {
    let (store, _guard) = init_test_tracing();

    let parsed = parse("object cfg {\n\tstring s \"open\n}\n", &ParseOptions::default()).unwrap();
    assert!(parsed.root.is_some());

    let warnings = store.at_level(Level::WARN);
    assert!(warnings.iter().any(
        |w| w.field("message") == Some("Unterminated string") && w.field("line") == Some("2")
    ));
}

#[test]
fn test_binary_decode_warns_with_offset() {
    let (store, _guard) = init_test_tracing();

    let mut root = Branch::object("cfg");
    root.push_i32("a", 1).unwrap();
    root.push_i32("b", 2).unwrap();
    let mut bytes = to_vec(&root, &WriteOptions::binary()).unwrap();
    bytes.truncate(bytes.len() - 2);

    let back = from_slice(&bytes).unwrap();
    assert_eq!(back.len(), 1);

    let warnings = store.at_level(Level::WARN);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field("path"), Some("<buffer>"));
    let offset: usize = warnings[0].field("offset").unwrap().parse().unwrap();
    assert!(offset < bytes.len());
}

#[test]
fn test_unexpected_root_warns() {
    let (store, _guard) = init_test_tracing();

    let options = ParseOptions::new().with_expected_root("project");
    assert!(acm::from_str_with_options("object other { }", options).is_err());

    let warnings = store.at_level(Level::WARN);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field("expected"), Some("project"));
    assert_eq!(warnings[0].field("found"), Some("other"));
}

#[test]
fn test_print_tree_logs_each_line() {
    let (store, _guard) = init_test_tracing();

    let mut root = Branch::object("cfg");
    root.push_i32("x", 1).unwrap();
    root.push_array_i32("nums", &[4, 5]).unwrap();
    root.print_tree();

    let lines: Vec<_> = store
        .events()
        .into_iter()
        .filter(|e| e.target == "acm::tree" && e.level == Level::INFO)
        .filter_map(|e| e.field("message").map(str::to_string))
        .collect();
    assert_eq!(
        lines,
        vec![
            "cfg (object)",
            "\tint32 x 1",
            "\tnums (array int32)",
            "\t\tint32 4",
            "\t\tint32 5",
        ]
    );
    assert_eq!(lines.join("\n") + "\n", root.dump());
}

#[test]
fn test_clean_input_is_silent() {
    let (store, _guard) = init_test_tracing();

    let parsed = parse("object cfg { int32 x 1 }", &ParseOptions::default()).unwrap();
    assert!(parsed.diagnostics.is_empty());
    assert!(store.events().is_empty());
}
