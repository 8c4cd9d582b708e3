// src/render/table.rs

use console::{Style, style};

use crate::engine::{ExitOutcome, StatusRow, StatusSnapshot, TaskState};

/// Uncoloured status text, e.g. `SUCCESS, CODE 0` or `FAILED, SIGNAL 9`.
///
/// A failed task without an outcome never ran: one of its dependencies
/// failed.
pub fn status_label(row: &StatusRow) -> String {
    match (row.state, row.outcome) {
        (TaskState::Unknown, _) => "STATUS UNKNOWN".to_string(),
        (TaskState::Queued, _) => "QUEUED".to_string(),
        (TaskState::Running, _) => "RUNNING".to_string(),
        (TaskState::Succeeded, Some(ExitOutcome::Exited(code))) => format!("SUCCESS, CODE {code}"),
        (TaskState::Succeeded, _) => "SUCCESS".to_string(),
        (TaskState::Failed, Some(ExitOutcome::Exited(code))) => format!("FAILED, CODE {code}"),
        (TaskState::Failed, Some(ExitOutcome::Signaled(signal))) => {
            format!("FAILED, SIGNAL {signal}")
        }
        (TaskState::Failed, None) => "FAILED".to_string(),
    }
}

fn state_style(state: TaskState) -> Style {
    let base = Style::new().bold();
    match state {
        TaskState::Unknown => base.white(),
        TaskState::Queued => base.yellow(),
        TaskState::Running => base.blue(),
        TaskState::Succeeded => base.green(),
        TaskState::Failed => base.red(),
    }
}

/// `name: STATUS` with the status colour-coded by state.
pub fn format_row(row: &StatusRow) -> String {
    format!(
        "{}: {}",
        style(&row.name).bold(),
        state_style(row.state).apply_to(status_label(row))
    )
}

/// One line per task, in index order.
pub fn format_rows(snapshot: &StatusSnapshot) -> Vec<String> {
    snapshot.rows.iter().map(format_row).collect()
}
