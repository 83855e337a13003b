//! End-to-end runs with closure-injected completion functions.

use std::cell::Cell;
use std::fs;
use std::rc::Rc;

use evaluation_instruments::budget::TokenUsage;
use evaluation_instruments::data::{Dataset, Sample};
use evaluation_instruments::evaluation::{
    CompletionError, Evaluation, EvaluationBuilder, FailurePolicy, RunStatus,
};
use evaluation_instruments::instruments::pdsqi::{pdsqi_from_dir, PdsqiOptions};
use evaluation_instruments::prompt::{Message, OutputMode};
use evaluation_instruments::response::{
    ChatCompletionPostProcessor, Grade, Grades, MessagesPostProcessor,
};
use evaluation_instruments::runlog::{read_records, RunLogConfig};
use evaluation_instruments::EvaluationError;
use serde_json::{json, Map, Value};
use tempfile::TempDir;

const METRICS: [&str; 11] = [
    "citation",
    "accurate",
    "thorough",
    "useful",
    "organized",
    "comprehensible",
    "succinct",
    "abstraction",
    "synthesized",
    "voice_summ",
    "voice_note",
];

fn rows(n: usize) -> Dataset {
    let rows = (0..n)
        .map(|i| {
            let mut fields = Map::new();
            fields.insert("guid".to_string(), json!(format!("sample-{i}")));
            fields
        })
        .collect();
    Dataset::from_rows(rows).unwrap()
}

fn chat_response(content: String, total: u64) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}],
        "usage": {"prompt_tokens": total - 20, "completion_tokens": 20, "total_tokens": total}
    })
}

/// Grades in the shape the prompt asked for.
fn graded_content(messages: &[Message]) -> String {
    let prompt = &messages.last().unwrap().content;
    let explained = prompt.contains("\"explanation\" is a free text explanation");
    let grades: Map<String, Value> = METRICS
        .iter()
        .map(|metric| {
            let value = if explained {
                json!({"explanation": format!("{metric} looks fine {{mostly}}"), "score": 4})
            } else {
                json!(4)
            };
            (metric.to_string(), value)
        })
        .collect();
    format!("<think>checking each rubric</think>\n{}", Value::Object(grades))
}

fn write_samples(dir: &TempDir, n: usize) {
    for i in 0..n {
        let record = json!({
            "summary": format!("Patient {i} treated for pneumonia <Note ID:1>, discharged <Note ID:2>."),
            "notes": {
                "admission": "Admitted with fever and productive cough.",
                "discharge": "Afebrile on day 3, discharged on oral antibiotics."
            },
            "target_specialty": "internal medicine"
        });
        fs::write(dir.path().join(format!("sample-{i}.json")), record.to_string()).unwrap();
    }
}

fn pdsqi_builder(data_dir: &TempDir, log_dir: &TempDir, mode: OutputMode) -> EvaluationBuilder {
    Evaluation::builder()
        .prep(pdsqi_from_dir(
            data_dir.path().to_path_buf(),
            PdsqiOptions::default().with_output_mode(mode),
        )
        .unwrap())
        .log_config(RunLogConfig::new(log_dir.path(), 0))
}

#[test]
fn test_budget_abort_returns_partial_results() {
    crate::init_tracing();
    let data_dir = TempDir::new().unwrap();
    let log_dir = TempDir::new().unwrap();
    write_samples(&data_dir, 5);

    let evaluation = pdsqi_builder(&data_dir, &log_dir, OutputMode::Default)
        .completion_fn(|_, messages, _| Ok(chat_response(graded_content(messages), 400)))
        .build()
        .unwrap();

    // 400 + 400 = 800 <= 1000, 1200 > 1000
    let capacity = TokenUsage::capacity(1_000);
    let outcome = evaluation.run_dataset(&rows(5), None, Some(capacity)).unwrap();

    assert_eq!(outcome.status, RunStatus::BudgetExceeded);
    assert_eq!(outcome.results.keys().copied().collect::<Vec<_>>(), vec![0, 1, 2]);
    assert!(outcome.usage > capacity);
    assert_eq!(outcome.usage, TokenUsage::from_counts(1_140, 60, 1_200));
    assert_eq!(outcome.budget.rows, 3);
}

#[test]
fn test_log_has_one_line_per_processed_row() {
    let data_dir = TempDir::new().unwrap();
    let log_dir = TempDir::new().unwrap();
    write_samples(&data_dir, 4);

    let evaluation = pdsqi_builder(&data_dir, &log_dir, OutputMode::Default)
        .completion_fn(|_, messages, _| Ok(chat_response(graded_content(messages), 100)))
        .build()
        .unwrap();

    let outcome = evaluation.run_dataset(&rows(4), None, None).unwrap();
    assert!(outcome.is_complete());

    let log_path = outcome.log_path.clone().unwrap();
    assert!(log_path.starts_with(log_dir.path()));
    let name = log_path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("raw_content_") && name.ends_with(".jsonl"));

    let content = fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 4);
    for (ix, line) in lines.iter().enumerate() {
        let value: Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["sample_ix"], json!(ix));
        assert_eq!(value["raw_content"]["usage"]["total_tokens"], json!(100));
    }

    let records = read_records(&log_path).unwrap();
    assert_eq!(records.len(), 4);
}

#[test]
fn test_logging_disabled_writes_nothing() {
    let data_dir = TempDir::new().unwrap();
    let log_dir = TempDir::new().unwrap();
    write_samples(&data_dir, 2);

    let evaluation = pdsqi_builder(&data_dir, &log_dir, OutputMode::Default)
        .log_enabled(false)
        .completion_fn(|_, messages, _| Ok(chat_response(graded_content(messages), 100)))
        .build()
        .unwrap();

    let outcome = evaluation.run_dataset(&rows(2), None, None).unwrap();
    assert_eq!(outcome.results.len(), 2);
    assert!(outcome.log_path.is_none());
    assert_eq!(fs::read_dir(log_dir.path()).unwrap().count(), 0);
}

#[test]
fn test_score_mode_yields_bare_integers() {
    let data_dir = TempDir::new().unwrap();
    let log_dir = TempDir::new().unwrap();
    write_samples(&data_dir, 2);

    let outcome = pdsqi_builder(&data_dir, &log_dir, OutputMode::Score)
        .completion_fn(|_, messages, _| Ok(chat_response(graded_content(messages), 100)))
        .build()
        .unwrap()
        .run_dataset(&rows(2), None, None)
        .unwrap();

    for grades in outcome.results.values() {
        assert_eq!(grades.len(), METRICS.len());
        assert!(grades.values().all(Value::is_i64));
    }
}

#[test]
fn test_explanation_mode_yields_objects() {
    let data_dir = TempDir::new().unwrap();
    let log_dir = TempDir::new().unwrap();
    write_samples(&data_dir, 2);

    let outcome = pdsqi_builder(&data_dir, &log_dir, OutputMode::Explanation)
        .completion_fn(|_, messages, _| Ok(chat_response(graded_content(messages), 100)))
        .build()
        .unwrap()
        .run_dataset(&rows(2), None, None)
        .unwrap();

    for grades in outcome.results.values() {
        assert_eq!(grades.len(), METRICS.len());
        for value in grades.values() {
            assert!(value.get("explanation").is_some());
            assert!(value.get("score").is_some());
            let grade = Grade::from_value(value).unwrap();
            assert_eq!(grade.score().as_integer(), Some(4));
        }
    }
}

#[test]
fn test_unparseable_content_degrades_to_empty_grades() {
    let data_dir = TempDir::new().unwrap();
    let log_dir = TempDir::new().unwrap();
    write_samples(&data_dir, 3);

    let outcome = pdsqi_builder(&data_dir, &log_dir, OutputMode::Default)
        .completion_fn(|_, _, _| Ok(chat_response("I am unable to grade {this".to_string(), 50)))
        .build()
        .unwrap()
        .run_dataset(&rows(3), None, None)
        .unwrap();

    assert_eq!(outcome.results.len(), 3);
    assert!(outcome.results.values().all(Grades::is_empty));
    assert_eq!(outcome.usage.total(), 150);
}

#[test]
fn test_completion_error_propagates() {
    crate::init_tracing();
    let data_dir = TempDir::new().unwrap();
    let log_dir = TempDir::new().unwrap();
    write_samples(&data_dir, 3);

    let calls = Rc::new(Cell::new(0));
    let calls_in = Rc::clone(&calls);
    let evaluation = pdsqi_builder(&data_dir, &log_dir, OutputMode::Default)
        .completion_fn(move |_, messages, _| {
            calls_in.set(calls_in.get() + 1);
            if calls_in.get() == 2 {
                return Err(CompletionError::new("upstream returned 503"));
            }
            Ok(chat_response(graded_content(messages), 100))
        })
        .build()
        .unwrap();

    let err = evaluation.run_dataset(&rows(3), None, None).unwrap_err();
    assert_eq!(err.row_index(), Some(1));
    assert!(matches!(err.root(), EvaluationError::Completion(_)));
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_missing_sample_file_propagates() {
    let data_dir = TempDir::new().unwrap();
    let log_dir = TempDir::new().unwrap();
    write_samples(&data_dir, 1);

    let evaluation = pdsqi_builder(&data_dir, &log_dir, OutputMode::Default)
        .completion_fn(|_, messages, _| Ok(chat_response(graded_content(messages), 100)))
        .build()
        .unwrap();

    let err = evaluation.run_dataset(&rows(2), None, None).unwrap_err();
    assert_eq!(err.row_index(), Some(1));
    assert!(matches!(err.root(), EvaluationError::Data(_)));
}

#[test]
fn test_skip_row_policy_keeps_going() {
    crate::init_tracing();
    let data_dir = TempDir::new().unwrap();
    let log_dir = TempDir::new().unwrap();
    write_samples(&data_dir, 3);

    let outcome = pdsqi_builder(&data_dir, &log_dir, OutputMode::Default)
        .failure_policy(FailurePolicy::SkipRow)
        .completion_fn(|_, messages, _| Ok(chat_response(graded_content(messages), 100)))
        .build()
        .unwrap()
        // row 3 has no sample file
        .run_dataset(&rows(4), None, None)
        .unwrap();

    assert!(outcome.is_complete());
    assert_eq!(outcome.skipped, vec![3]);
    assert_eq!(outcome.results.len(), 3);
    assert_eq!(outcome.usage.total(), 300);
}

#[test]
fn test_skipped_unparseable_rows_still_spend_budget() {
    let data_dir = TempDir::new().unwrap();
    let log_dir = TempDir::new().unwrap();
    write_samples(&data_dir, 5);

    let calls = Rc::new(Cell::new(0));
    let calls_in = Rc::clone(&calls);
    let outcome = pdsqi_builder(&data_dir, &log_dir, OutputMode::Default)
        .post_process(ChatCompletionPostProcessor::new().strict(true))
        .failure_policy(FailurePolicy::SkipRow)
        .completion_fn(move |_, _, _| {
            calls_in.set(calls_in.get() + 1);
            Ok(chat_response("garbage".to_string(), 100))
        })
        .build()
        .unwrap()
        .run_dataset(&rows(5), None, Some(TokenUsage::capacity(150)))
        .unwrap();

    assert_eq!(calls.get(), 2);
    assert_eq!(outcome.status, RunStatus::BudgetExceeded);
    assert_eq!(outcome.skipped, vec![0, 1]);
    assert!(outcome.results.is_empty());
    assert_eq!(outcome.usage, TokenUsage::from_counts(160, 40, 200));

    let log_path = outcome.log_path.unwrap();
    assert_eq!(read_records(&log_path).unwrap().len(), 2);
}

#[test]
fn test_post_process_failure_still_logs_raw_response() {
    let log_dir = TempDir::new().unwrap();

    let evaluation = Evaluation::builder()
        .prep_fn(|sample: &Sample| Ok(vec![Message::user(format!("row {}", sample.index))]))
        .completion_fn(|_, _, _| Ok(json!({"content": [{"type": "text", "text": "{}"}]})))
        .post_process(MessagesPostProcessor::new())
        .log_config(RunLogConfig::new(log_dir.path(), 0))
        .build()
        .unwrap();

    let err = evaluation.run_dataset(&rows(2), None, None).unwrap_err();
    assert!(matches!(err.root(), EvaluationError::Response(_)));

    let logs: Vec<_> = fs::read_dir(log_dir.path()).unwrap().collect();
    assert_eq!(logs.len(), 1);
    let records = read_records(logs[0].as_ref().unwrap().path()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].sample_ix, 0);
}

#[test]
fn test_messages_shape_budget() {
    let evaluation = Evaluation::builder()
        .prep_fn(|_: &Sample| Ok(vec![Message::user("grade")]))
        .completion_fn(|_, _, _| {
            Ok(json!({
                "content": [{"type": "text", "text": "{\"useful\": 5}"}],
                "usage": {"input_tokens": 60, "output_tokens": 10}
            }))
        })
        .post_process(MessagesPostProcessor::new())
        .log_enabled(false)
        .max_tokens(100)
        .build()
        .unwrap();

    let outcome = evaluation.run_dataset(&rows(5), None, None).unwrap();
    assert_eq!(outcome.status, RunStatus::BudgetExceeded);
    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.usage, TokenUsage::from_counts(120, 20, 140));
}
