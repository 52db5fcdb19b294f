//! Tables printed after a command.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use tsk_updater::{CleanupReport, PhaseReport, RunOutcome, RunReport, UpdateStatus};

/// Phase lines of a run as a table.
#[must_use]
pub fn phase_table(phases: &[PhaseReport]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Phase"),
        header_cell("Status"),
        header_cell("Details"),
    ]);
    apply_table_style(&mut table);
    for phase in phases {
        table.add_row(vec![
            Cell::new(phase.phase.label()),
            status_cell(phase.success, if phase.success { "ok" } else { "FAILED" }),
            Cell::new(&phase.message),
        ]);
    }
    table
}

/// Prints the phase table, warnings and the final outcome line.
pub fn print_run(report: &RunReport) {
    if !report.phases.is_empty() {
        println!("{}", phase_table(&report.phases));
    }
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    if let Some(error) = &report.error
        && !report.outcome.is_success()
    {
        eprintln!("error: {}", error.user_message());
    }
    if let Some(hint) = retry_hint(report) {
        eprintln!("hint: {hint}");
    }
    println!("{}", outcome_line(report.outcome));
}

/// Hint printed when the run failed for a reason that may go away by itself.
#[must_use]
pub fn retry_hint(report: &RunReport) -> Option<&'static str> {
    if report.outcome.is_success() {
        return None;
    }
    report
        .error
        .as_ref()
        .filter(|error| error.is_retryable())
        .map(|_| "this looks temporary, run the updater again later")
}

/// Prints what a cleanup removed and restored.
pub fn print_cleanup(report: &CleanupReport) {
    for path in &report.removed {
        println!("removed  {}", path.display());
    }
    for path in &report.restored {
        println!("restored {}", path.display());
    }
    for failure in &report.failures {
        eprintln!("warning: {failure}");
    }
    println!("Cleanup: {}", report.summary());
}

/// Installed version and last run as a two-column table.
#[must_use]
pub fn status_table(installed: Option<&str>, last: Option<&UpdateStatus>) -> Table {
    let mut table = Table::new();
    apply_table_style(&mut table);
    table.add_row(vec![
        header_cell("Installed version"),
        Cell::new(installed.unwrap_or("none")),
    ]);
    match last {
        Some(status) => {
            table.add_row(vec![
                header_cell("Last run"),
                Cell::new(status.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
            ]);
            table.add_row(vec![
                header_cell("Outcome"),
                status_cell(status.success, status.outcome.label()),
            ]);
            if let Some(version) = &status.version {
                table.add_row(vec![header_cell("Release"), Cell::new(version)]);
            }
            if let Some(error) = &status.error {
                table.add_row(vec![header_cell("Error"), Cell::new(error).fg(Color::Red)]);
            }
        }
        None => {
            table.add_row(vec![header_cell("Last run"), dim_cell("never")]);
        }
    }
    table
}

/// One-line outcome for the end of a run.
#[must_use]
pub fn outcome_line(outcome: RunOutcome) -> String {
    let status = if outcome.is_success() { "OK" } else { "FAILED" };
    format!("{status}: {outcome}")
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label).add_attribute(Attribute::Bold)
}

fn status_cell(success: bool, text: &str) -> Cell {
    if success {
        Cell::new(text).fg(Color::Green)
    } else {
        Cell::new(text).fg(Color::Red).add_attribute(Attribute::Bold)
    }
}

fn dim_cell(value: &str) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
