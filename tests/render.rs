// tests/render.rs

use std::sync::Arc;
use std::time::Duration;

use console::{Term, strip_ansi_codes};

use dagmaster::engine::{ExitOutcome, StatusRow, StatusTable, TaskState};
use dagmaster::render::{Renderer, format_row, format_rows, status_label};
use dagmaster::types::VerbosityType;

fn row(state: TaskState, outcome: Option<ExitOutcome>) -> StatusRow {
    StatusRow {
        index: 0,
        name: "build".to_string(),
        state,
        outcome,
    }
}

#[test]
fn labels_cover_every_state() {
    let cases = [
        (row(TaskState::Unknown, None), "STATUS UNKNOWN"),
        (row(TaskState::Queued, None), "QUEUED"),
        (row(TaskState::Running, None), "RUNNING"),
        (
            row(TaskState::Succeeded, Some(ExitOutcome::Exited(0))),
            "SUCCESS, CODE 0",
        ),
        (
            row(TaskState::Failed, Some(ExitOutcome::Exited(2))),
            "FAILED, CODE 2",
        ),
        (
            row(TaskState::Failed, Some(ExitOutcome::Signaled(9))),
            "FAILED, SIGNAL 9",
        ),
        (row(TaskState::Failed, None), "FAILED"),
    ];

    for (row, expected) in cases {
        assert_eq!(status_label(&row), expected);
        assert_eq!(
            strip_ansi_codes(&format_row(&row)),
            format!("build: {expected}")
        );
    }
}

#[test]
fn rows_follow_task_order() {
    let table = StatusTable::new(vec!["a".into(), "b".into(), "c".into()]);
    table.transition(1, TaskState::Queued);
    table.transition(2, TaskState::Queued);
    table.transition(2, TaskState::Running);

    let lines: Vec<String> = format_rows(&table.snapshot())
        .iter()
        .map(|l| strip_ansi_codes(l).into_owned())
        .collect();

    assert_eq!(lines, vec!["a: STATUS UNKNOWN", "b: QUEUED", "c: RUNNING"]);
}

#[test]
fn snapshot_copies_state_and_outcome() {
    let table = StatusTable::new(vec!["a".into(), "b".into()]);
    table.transition(0, TaskState::Queued);
    table.transition(0, TaskState::Running);
    table.record_outcome(0, ExitOutcome::Exited(0));
    table.transition(0, TaskState::Succeeded);

    let snapshot = table.snapshot();
    table.transition(1, TaskState::Failed);

    assert_eq!(snapshot.rows[0].outcome, Some(ExitOutcome::Exited(0)));
    assert_eq!(snapshot.state_of("a"), Some(TaskState::Succeeded));
    assert_eq!(
        snapshot.state_of("b"),
        Some(TaskState::Unknown),
        "snapshot is a copy"
    );
    assert_eq!(table.count(TaskState::Failed), 1);
}

#[test]
fn verbosity_none_disables_rendering() -> Result<(), Box<dyn std::error::Error>> {
    let table = Arc::new(StatusTable::new(vec!["a".into()]));
    let renderer = Renderer::spawn(table, VerbosityType::None, Duration::from_millis(10))?;
    assert!(renderer.is_none());
    Ok(())
}

#[test]
fn renderer_reads_while_table_is_written() -> Result<(), Box<dyn std::error::Error>> {
    let names: Vec<String> = (0..50).map(|i| format!("t{i}")).collect();
    let table = Arc::new(StatusTable::new(names));
    let renderer = Renderer::spawn(
        Arc::clone(&table),
        VerbosityType::Table,
        Duration::from_millis(1),
    )?
    .expect("table rendering enabled");

    for i in 0..50 {
        table.transition(i, TaskState::Queued);
        table.transition(i, TaskState::Running);
        table.record_outcome(i, ExitOutcome::Exited(0));
        table.transition(i, TaskState::Succeeded);
        std::thread::sleep(Duration::from_micros(200));
    }

    renderer.finish();
    assert_eq!(table.count(TaskState::Succeeded), 50);
    Ok(())
}

#[test]
fn verbosity_parses_case_insensitively() {
    assert_eq!("TABLE".parse::<VerbosityType>(), Ok(VerbosityType::Table));
    assert_eq!("none".parse::<VerbosityType>(), Ok(VerbosityType::None));
    assert!("GRAPH".parse::<VerbosityType>().is_err());
    assert_eq!(VerbosityType::default(), VerbosityType::Table);
}

#[cfg(unix)]
#[test]
fn non_terminal_output_gets_only_the_final_table() -> Result<(), Box<dyn std::error::Error>> {
    let out = tempfile::NamedTempFile::new()?;
    let term = Term::read_write_pair(out.reopen()?, out.reopen()?);

    let table = Arc::new(StatusTable::new(vec!["a".into(), "b".into()]));
    let renderer = Renderer::spawn_on(
        term,
        Arc::clone(&table),
        VerbosityType::Table,
        Duration::from_millis(1),
    )?
    .expect("table rendering enabled");

    table.transition(0, TaskState::Queued);
    std::thread::sleep(Duration::from_millis(20));
    table.transition(0, TaskState::Running);
    table.record_outcome(0, ExitOutcome::Exited(0));
    table.transition(0, TaskState::Succeeded);
    table.transition(1, TaskState::Failed);
    renderer.finish();

    let written = std::fs::read_to_string(out.path())?;
    assert_eq!(
        strip_ansi_codes(&written),
        "a: SUCCESS, CODE 0\nb: FAILED\n",
        "no redraws or cursor movement outside a terminal"
    );
    Ok(())
}
