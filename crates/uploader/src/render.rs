//! Plain-text rendering of session snapshots.

use std::fmt::Write;

use car_upload_core::model::{status, Car, ResultRecord};
use car_upload_core::session::SessionSnapshot;

const HEADERS: [&str; 3] = ["ModelName", "CommandId", "Status"];

/// Progress line followed by the results table.
pub fn render(snapshot: &SessionSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "car {} | {:>5.1}% ({}/{} sent) | {:?}{}",
        snapshot.car.label(),
        snapshot.progress_percent(),
        snapshot.total - snapshot.remaining.min(snapshot.total),
        snapshot.total,
        snapshot.phase,
        if snapshot.cancelled { " (cancelled)" } else { "" },
    );

    if snapshot.records.is_empty() {
        out.push_str("waiting for upload jobs to be submitted\n");
        return out;
    }

    let rows: Vec<[&str; 3]> = snapshot
        .records
        .iter()
        .map(|r| [r.model_name.as_str(), r.command_id.as_str(), r.status.as_str()])
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }

    write_row(&mut out, &HEADERS, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("-+-"));
    for row in &rows {
        write_row(&mut out, row, &widths);
    }
    out
}

fn write_row(out: &mut String, cells: &[&str; 3], widths: &[usize; 3]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(c, w)| format!("{c:<width$}", width = *w))
        .collect();
    let _ = writeln!(out, "{}", line.join(" | ").trim_end());
}

/// Question asked before every model on `cars` is deleted.
pub fn clear_prompt(cars: &[Car]) -> String {
    let names: Vec<&str> = cars.iter().map(Car::label).collect();
    format!(
        "Delete all models on car(s) {}? [y/N] ",
        names.join(", ")
    )
}

/// Whether an answer to [`clear_prompt`] agrees to the delete.
pub fn is_confirmed(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Records whose command did not end in `Success`.
pub fn unsuccessful(records: &[ResultRecord]) -> Vec<&ResultRecord> {
    records
        .iter()
        .filter(|r| r.status != status::SUCCESS)
        .collect()
}
