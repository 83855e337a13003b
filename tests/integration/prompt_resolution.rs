//! PDSQI-9 prompt resolution from sample files.

use std::fs;

use evaluation_instruments::data::{Dataset, JsonFileLoader, Sample};
use evaluation_instruments::evaluation::Evaluation;
use evaluation_instruments::instruments::pdsqi::{
    pdsqi_from_dir, pdsqi_from_file, Pdsqi, PdsqiOptions, PromptContext,
};
use evaluation_instruments::prompt::{OutputMode, Role, RubricError};
use evaluation_instruments::{EvaluationError, InputError};
use serde_json::{json, Map};
use tempfile::TempDir;

fn sample(guid: &str) -> Sample {
    let mut fields = Map::new();
    fields.insert("guid".to_string(), json!(guid));
    Sample::new(0, fields)
}

#[test]
fn test_prep_from_dir_numbers_notes_from_one() {
    let data_dir = TempDir::new().unwrap();
    fs::write(
        data_dir.path().join("a1.json"),
        json!({
            "summary": "Fever resolved <Note ID:2>.",
            "notes": {"n1": "Fever 39C.", "n2": "Afebrile."},
            "timestamps": {"n1": "2024-03-01 08:00", "n2": "2024-03-02 08:00"},
            "target_specialty": "cardiology"
        })
        .to_string(),
    )
    .unwrap();

    let prep = pdsqi_from_dir(data_dir.path().to_path_buf(), PdsqiOptions::default()).unwrap();
    let messages = prep(&sample("a1")).unwrap();

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::System);
    assert_eq!(messages[1].role, Role::User);

    let prompt = &messages[1].content;
    assert!(prompt.contains(
        "<NoteID:1>\nTimestamp: 2024-03-01 08:00\nNote: Fever 39C.\n<\\NoteID:1>\n<NoteID:2>"
    ));
    assert!(!prompt.contains("<NoteID:0>"));
    assert!(prompt.contains("for a clinician with specialty cardiology"));
    assert!(prompt.contains("<CLINICAL_SUMMARY>\nFever resolved <Note ID:2>.\n<\\CLINICAL_SUMMARY>"));
    assert!(!prompt.contains("{prompt_notes}"));
}

#[test]
fn test_without_system_message() {
    let data_dir = TempDir::new().unwrap();
    fs::write(
        data_dir.path().join("a1.json"),
        json!({"summary": "s", "notes": ["n"]}).to_string(),
    )
    .unwrap();

    let loader = JsonFileLoader::from_column("guid", Some(data_dir.path().to_path_buf()));
    let prep = pdsqi_from_file(
        loader,
        Pdsqi::new(PdsqiOptions::default().without_system_message()).unwrap(),
    );
    let messages = prep(&sample("a1")).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::User);
}

#[test]
fn test_mismatched_timestamps_fail_before_completion() {
    let data_dir = TempDir::new().unwrap();
    let log_dir = TempDir::new().unwrap();
    fs::write(
        data_dir.path().join("a1.json"),
        json!({
            "summary": "s",
            "notes": ["one", "two", "three"],
            "timestamps": ["2024-03-01", "2024-03-02"]
        })
        .to_string(),
    )
    .unwrap();

    let evaluation = Evaluation::builder()
        .prep(pdsqi_from_dir(data_dir.path().to_path_buf(), PdsqiOptions::default()).unwrap())
        .completion_fn(|_, _, _| panic!("completion must not be called"))
        .log_config(evaluation_instruments::runlog::RunLogConfig::new(log_dir.path(), 0))
        .build()
        .unwrap();

    let dataset = Dataset::from_json_str(r#"[{"guid": "a1"}]"#).unwrap();
    let err = evaluation.run_dataset(&dataset, None, None).unwrap_err();
    match err.root() {
        EvaluationError::Input(input) => assert_eq!(
            input,
            &InputError::LengthMismatch {
                notes: 3,
                timestamps: 2
            }
        ),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fs::read_dir(log_dir.path()).unwrap().count(), 0);
}

#[test]
fn test_output_modes_change_instructions_only() {
    let notes = ["Admitted.", "Discharged."];
    let context = PromptContext::default();

    let score = Pdsqi::new(PdsqiOptions::default().with_output_mode(OutputMode::Score))
        .unwrap()
        .resolve_prompt("summary", &notes, &context)
        .unwrap();
    let default = Pdsqi::default()
        .resolve_prompt("summary", &notes, &context)
        .unwrap();
    let explained = Pdsqi::new(PdsqiOptions::default().with_output_mode(OutputMode::Explanation))
        .unwrap()
        .resolve_prompt("summary", &notes, &context)
        .unwrap();

    assert_eq!(score, default);
    assert_ne!(score, explained);

    let explained_prompt = &explained[1].content;
    assert!(explained_prompt.contains("\"explanation\""));
    assert!(!explained_prompt.contains("values must ALL be an INTEGER"));
    assert!(score[1].content.contains("values must ALL be an INTEGER"));
}

#[test]
fn test_rubric_subset() {
    let pdsqi = Pdsqi::new(PdsqiOptions::default().with_rubric_keys(["citation", "useful"])).unwrap();
    let messages = pdsqi
        .resolve_prompt("summary", &["note"], &PromptContext::default())
        .unwrap();
    let prompt = &messages[1].content;

    assert!(prompt.contains("<citation>"));
    assert!(prompt.contains("<useful>"));
    assert!(!prompt.contains("<accurate>"));
    assert!(prompt.contains("\"citation\": 1"));
}

#[test]
fn test_unmatched_rubric_keys_never_reach_the_model() {
    let err = Pdsqi::new(PdsqiOptions::default().with_rubric_keys(["Citation", "Useful"]))
        .unwrap_err();
    assert!(matches!(err, RubricError::EmptySelection { requested } if requested.len() == 2));

    let data_dir = TempDir::new().unwrap();
    let err = pdsqi_from_dir(
        data_dir.path().to_path_buf(),
        PdsqiOptions::default().with_rubric_keys(["Citation"]),
    )
    .err()
    .unwrap();
    assert!(err.to_string().contains("no rubrics selected"));
}
