use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::builds::{Activity, BuildStatus};

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

pub fn status_cell(status: &BuildStatus) -> Cell {
    let cell = Cell::new(status);
    match status {
        BuildStatus::Success => cell.fg(TableColor::Green),
        BuildStatus::Failure => cell.fg(TableColor::Red),
        BuildStatus::Other(_) => cell.fg(TableColor::Yellow),
    }
}

pub fn activity_cell(activity: &Activity) -> Cell {
    let cell = Cell::new(activity);
    match activity {
        Activity::Building => cell.fg(TableColor::Yellow),
        _ => cell,
    }
}
