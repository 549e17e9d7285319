use scriptbox_common::{EngineConfig, ErrorKind, ExecutionRequest, Language, TestCase};
use scriptbox_engine::console::{format_args, format_value, ConsoleValue};
use scriptbox_engine::runtime::markup::PREVIEW_NOTE;
use scriptbox_engine::{normalize_output, strip_type_annotations, Engine};
use proptest::prelude::*;

fn engine() -> Engine {
    Engine::new(EngineConfig::default())
}

#[tokio::test]
async fn javascript_console_log() {
    let result = engine().run_code("console.log(1+1)", "javascript", "").await;
    assert_eq!(result.error, None);
    assert!(result.output_lines.contains(&"2".to_string()));
}

#[tokio::test]
async fn javascript_throw_keeps_pre_throw_output() {
    let result = engine().run_code("throw new Error('boom')", "javascript", "").await;
    assert!(result.error.as_deref().unwrap().contains("Error: boom"));
    assert_eq!(result.error_kind, Some(ErrorKind::UserCode));
    assert!(result.output_lines.is_empty());

    let result = engine()
        .run_code("console.log('first');\nthrow new Error('boom')", "javascript", "")
        .await;
    assert_eq!(result.output_lines, vec!["first"]);
    assert!(result.error.as_deref().unwrap().contains("Error: boom"));
}

#[tokio::test]
async fn typescript_annotations_are_stripped() {
    let code = "const x: number = 5;\nconsole.log(x);";
    assert_eq!(strip_type_annotations(code), "const x = 5;\nconsole.log(x);");

    let result = engine().run_code(code, "typescript", "").await;
    assert_eq!(result.error, None);
    assert_eq!(result.output_lines, vec!["5"]);
}

#[tokio::test]
async fn typescript_interface_and_function() {
    let code = "interface Point { x: number; y: number }\n\
                function sum(p: Point): number { return p.x + p.y; }\n\
                console.log(sum({ x: 1, y: 2 }));";
    let result = engine().run_code(code, "ts", "").await;
    assert_eq!(result.error, None);
    assert_eq!(result.output_lines, vec!["3"]);
}

#[tokio::test]
async fn typescript_invalid_after_transform_is_flagged() {
    // a ternary branch that looks like a type annotation loses its else arm
    let code = "const ok = true;\nconst v = ok ? 1 : null;\nconsole.log(v);";
    let result = engine().run_code(code, "typescript", "").await;
    assert_eq!(result.error_kind, Some(ErrorKind::TransformMismatch));
}

#[tokio::test]
async fn suite_scores_each_case() {
    let code = "input.split(' ').reduce((a,b)=>+a+ +b)";
    let cases = vec![TestCase::new("add", "2 3", "5"), TestCase::new("fail", "2 3", "6")];
    let suite = engine().run_suite(code, "javascript", &cases).await;

    assert_eq!(suite.passed_count, 1);
    assert_eq!(suite.failed_count, 1);
    assert_eq!(suite.total_count, 2);
    assert_eq!(suite.outcomes[1].actual, "5");
    assert_eq!(suite.outcomes[1].expected, "6");
    assert!(!suite.outcomes[1].passed);
}

#[tokio::test]
async fn html_is_echoed() {
    let source = "<main>\n  <h1>Title</h1>\n</main>";
    let result = engine().run_code(source, "html", "").await;
    assert_eq!(result.error, None);
    assert_eq!(result.output_lines[0], PREVIEW_NOTE);
    assert!(result.output_lines.iter().any(|line| line == source));
}

#[test]
fn trailing_crlf_and_blank_lines_normalize_away() {
    assert_eq!(normalize_output("foo\r\n\r\n"), normalize_output("foo"));
}

#[tokio::test]
async fn console_error_is_not_a_failure() {
    let result = engine().run_code("console.error('x')", "javascript", "").await;
    assert_eq!(result.error, None);
    assert_eq!(result.output_lines, vec!["Errors:", "x"]);
}

#[tokio::test]
async fn failing_middle_case_does_not_stop_suite() {
    let code = "if (input === 'boom') { throw new Error('bad'); }\nconsole.log(input);";
    let cases = vec![
        TestCase::new("first", "a", "a"),
        TestCase::new("second", "boom", "boom"),
        TestCase::new("third", "c", "c"),
    ];
    let suite = engine().run_suite(code, "javascript", &cases).await;

    assert_eq!(suite.total_count, 3);
    assert_eq!(suite.passed_count, 2);
    assert!(suite.outcomes[1].actual.starts_with("Error: Error: bad"));
    let names: Vec<_> = suite.outcomes.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn unsupported_language_is_not_an_error() {
    let result = engine().run_code("fn main() {}", "rust", "").await;
    assert_eq!(result.error, None);
    assert_eq!(result.output_lines.len(), 1);
    assert!(result.output_lines[0].contains("'rust' is not supported"));
}

#[tokio::test]
async fn each_case_gets_a_fresh_context() {
    let code = "globalThis.count = (globalThis.count || 0) + 1;\nconsole.log(globalThis.count);";
    let cases = vec![TestCase::new("one", "", "1"), TestCase::new("two", "", "1")];
    let suite = engine().run_suite(code, "javascript", &cases).await;
    assert!(suite.all_passed());
}

#[tokio::test]
async fn runaway_javascript_times_out() {
    let engine = Engine::new(EngineConfig::default().with_timeout_ms(250));
    let result = engine.run_code("for (;;) {}", "javascript", "").await;
    assert_eq!(result.error_kind, Some(ErrorKind::TimedOut));
    assert!(result.elapsed_ms >= 250);

    // the engine stays usable after a termination
    let result = engine.run_code("console.log('alive')", "javascript", "").await;
    assert_eq!(result.output_lines, vec!["alive"]);
}

#[tokio::test]
async fn heap_exhaustion_is_reported() {
    let config = EngineConfig {
        js_heap_limit_mb: 16,
        ..EngineConfig::default()
    };
    let code = "const keep = [];\nwhile (true) { keep.push(new Array(1e5).fill(Math.random())); }";
    let result = Engine::new(config).run_code(code, "javascript", "").await;
    assert!(matches!(
        result.error_kind,
        Some(ErrorKind::ResourceExhausted) | Some(ErrorKind::TimedOut)
    ));
}

#[tokio::test]
async fn python_suite_with_input() {
    let code = "a, b = map(int, input().split())\nprint(a * b)";
    let cases = vec![TestCase::new("mul", "3 4", "12"), TestCase::new("zero", "0 9", "0")];
    let suite = engine().run_suite(code, Language::Python, &cases).await;
    assert!(suite.all_passed(), "{:?}", suite.outcomes);
}

#[tokio::test]
async fn python_error_is_interpreter_runtime() {
    let result = engine().run_code("print('ok')\nraise ValueError('nope')", "python", "").await;
    assert_eq!(result.output_lines, vec!["ok"]);
    assert_eq!(result.error_kind, Some(ErrorKind::InterpreterRuntime));
    assert_eq!(result.error.as_deref(), Some("ValueError: nope (line 2)"));
}

#[tokio::test]
async fn python_runaway_times_out() {
    let engine = Engine::new(EngineConfig::default().with_timeout_ms(300));
    let result = engine.run_code("while True:\n    pass", "python", "").await;
    assert_eq!(result.error_kind, Some(ErrorKind::TimedOut));
}

#[tokio::test]
async fn request_round_trips_through_json() {
    let request: ExecutionRequest =
        serde_json::from_str(r#"{"code":"console.log(input)","language":"js","input":"hey"}"#).unwrap();
    let result = engine().run(&request).await;
    assert_eq!(result.output_lines, vec!["hey"]);
}

fn console_value() -> impl Strategy<Value = ConsoleValue> {
    prop_oneof![
        Just(ConsoleValue::Undefined),
        Just(ConsoleValue::Null),
        ".{0,16}".prop_map(ConsoleValue::Text),
        "[0-9]{1,6}".prop_map(ConsoleValue::Coerced),
        "[\\[\\]{}\":,0-9a-z ]{0,24}".prop_map(ConsoleValue::Json),
    ]
}

proptest! {
    #[test]
    fn formatting_is_deterministic(values in proptest::collection::vec(console_value(), 0..6)) {
        prop_assert_eq!(format_args(&values), format_args(&values));
        for value in &values {
            prop_assert_eq!(format_value(value), format_value(value));
        }
    }

    #[test]
    fn normalization_is_idempotent(text in "\\PC{0,40}|[ \\r\\n\\ta-c]{0,40}") {
        let once = normalize_output(&text);
        prop_assert_eq!(normalize_output(&once), once);
    }
}
