//! Table rendering for command output.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use desk_modes::ModeRegistry;
use desk_persistence::{CheckpointEntry, Trigger};

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn flag_cell(present: bool) -> Cell {
    if present {
        Cell::new("yes").fg(Color::Green)
    } else {
        Cell::new("-").fg(Color::DarkGrey)
    }
}

fn trigger_cell(trigger: Trigger) -> Cell {
    match trigger {
        Trigger::Manual => Cell::new("manual")
            .fg(Color::Blue)
            .add_attribute(Attribute::Bold),
        Trigger::Automatic => Cell::new("auto"),
    }
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

/// One row per registered mode, in display order.
pub fn modes_table(registry: &ModeRegistry) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Mode"),
        header_cell("Label"),
        header_cell("Trigger"),
        header_cell("Toolbar"),
        header_cell("View"),
        header_cell("State"),
    ]);
    apply_table_style(&mut table);
    for descriptor in registry.descriptors() {
        table.add_row(vec![
            Cell::new(descriptor.name()).add_attribute(Attribute::Bold),
            Cell::new(descriptor.label()),
            flag_cell(descriptor.trigger().is_some()),
            flag_cell(descriptor.toolbar().is_some()),
            flag_cell(descriptor.view().is_some()),
            flag_cell(descriptor.has_state()),
        ]);
    }
    for index in 2..6 {
        align_column(&mut table, index, CellAlignment::Center);
    }
    table
}

/// Checkpoint history, oldest first. The last row is the current checkpoint.
pub fn history_table(entries: &[CheckpointEntry]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("#"),
        header_cell("Checkpoint"),
        header_cell("Trigger"),
        header_cell("Created (UTC)"),
        header_cell("Bytes"),
    ]);
    apply_table_style(&mut table);
    let last = entries.len().saturating_sub(1);
    for (index, entry) in entries.iter().enumerate() {
        let number = if index == last {
            Cell::new(format!("{} *", index + 1)).add_attribute(Attribute::Bold)
        } else {
            Cell::new(index + 1)
        };
        table.add_row(vec![
            number,
            Cell::new(entry.id),
            trigger_cell(entry.trigger),
            Cell::new(entry.created_at.format("%Y-%m-%d %H:%M:%S%.3f")),
            Cell::new(entry.size),
        ]);
    }
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Right);
    table
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use desk_modes::default_registry;
    use desk_persistence::CheckpointId;

    use super::*;

    #[test]
    fn test_modes_table_lists_catalog_in_order() {
        let rendered = modes_table(&default_registry()).to_string();
        let comment = rendered.find("comment").unwrap();
        let zap_prompt = rendered.find("zap-prompt").unwrap();
        assert!(comment < zap_prompt);
        assert!(rendered.contains("Create item"));
    }

    #[test]
    fn test_history_table_marks_current() {
        let entries = vec![
            CheckpointEntry {
                id: CheckpointId::new(),
                trigger: Trigger::Manual,
                created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap(),
                size: 12,
            },
            CheckpointEntry {
                id: CheckpointId::new(),
                trigger: Trigger::Automatic,
                created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 31, 0).unwrap(),
                size: 20,
            },
        ];

        let table = history_table(&entries);
        assert_eq!(table.row_count(), 2);
        let rendered = table.to_string();
        assert!(rendered.contains("2026-03-01 09:30:00.000"));
        assert!(rendered.contains("2 *"));
        assert!(rendered.contains("manual"));
    }
}
