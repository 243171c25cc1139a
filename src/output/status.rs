use std::fmt::Write;

use chrono::{DateTime, Local};
use comfy_table::Cell;

use crate::builds::Snapshot;
use crate::notifier::SlackChannel;

use super::styling::{bright, dim};
use super::tables::{activity_cell, create_table, header, status_cell};

/// Prints every project in the snapshot with its last build and activity.
pub fn print_snapshot(snapshot: &Snapshot, source: &str, fetched_at: DateTime<Local>) {
    println!("{}", render_snapshot(snapshot, source, fetched_at));
}

fn render_snapshot(snapshot: &Snapshot, source: &str, fetched_at: DateTime<Local>) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "{} {}", bright("📋"), bright("Builds").underlined());
    let _ = writeln!(
        output,
        "{}",
        dim(format!(
            "{} projects from {source} at {}",
            snapshot.len(),
            fetched_at.format("%Y-%m-%d %H:%M:%S")
        ))
    );

    let mut table = create_table();
    table.set_header(header(&["Project", "Last build", "Status", "Activity"]));
    for build in snapshot.iter() {
        table.add_row(vec![
            Cell::new(&build.name),
            Cell::new(&build.number),
            status_cell(&build.status),
            activity_cell(&build.activity),
        ]);
    }
    let _ = writeln!(output, "{table}");

    output
}

/// Prints the channels a token can post to.
pub fn print_channels(channels: &[SlackChannel]) {
    println!("{}", render_channels(channels));
}

fn render_channels(channels: &[SlackChannel]) -> String {
    let mut table = create_table();
    table.set_header(header(&["Name", "ID", "Private", "Member"]));
    for channel in channels {
        table.add_row(vec![
            Cell::new(&channel.name),
            Cell::new(&channel.id),
            Cell::new(if channel.is_private { "yes" } else { "no" }),
            Cell::new(if channel.is_member { "yes" } else { "no" }),
        ]);
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builds::record;

    #[test]
    fn test_render_snapshot_lists_projects() {
        let snapshot: Snapshot = vec![
            record("api", 41, "Success", "Sleeping"),
            record("web", 7, "Failure", "Building"),
        ]
        .into_iter()
        .collect();

        let output = render_snapshot(&snapshot, "https://ci.example.com/cc.xml", Local::now());

        assert!(output.contains("2 projects"));
        assert!(output.contains("api"));
        assert!(output.contains("41"));
        assert!(output.contains("Failure"));
        assert!(output.contains("Building"));
    }

    #[test]
    fn test_render_channels() {
        let channels = vec![SlackChannel {
            id: "C42".to_string(),
            name: "builds".to_string(),
            is_private: false,
            is_member: true,
        }];

        let output = render_channels(&channels);

        assert!(output.contains("builds"));
        assert!(output.contains("C42"));
    }
}
