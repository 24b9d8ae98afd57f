//! Table formatting using comfy-table.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use palisade::PermissionMatrix;

fn styled_table() -> Table {
    let mut table = Table::new();

    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table
}

fn header_cell(text: &str) -> Cell {
    if super::no_color() {
        Cell::new(text)
    } else {
        Cell::new(text).add_attribute(Attribute::Bold).fg(Color::Cyan)
    }
}

/// Creates a key-value info table (two columns: key and value).
pub fn info_table(entries: &[(&str, String)]) -> Table {
    let mut table = styled_table();

    for (key, value) in entries {
        let key_cell = if super::no_color() {
            Cell::new(key)
        } else {
            Cell::new(key).fg(Color::DarkGrey)
        };
        table.add_row(vec![key_cell, Cell::new(value)]);
    }

    table
}

/// One row per permission, one column per role.
///
/// Rows no role is granted are skipped unless `include_empty` is set.
pub fn matrix_table(matrix: &PermissionMatrix, include_empty: bool) -> Table {
    let mut table = styled_table();

    let mut header = vec![header_cell("permission")];
    header.extend(matrix.roles.iter().map(|role| header_cell(role.as_str())));
    table.set_header(header);

    for &key in &matrix.permissions {
        let granted: Vec<bool> = matrix
            .roles
            .iter()
            .map(|role| matrix.is_allowed(role, key))
            .collect();
        if !include_empty && !granted.contains(&true) {
            continue;
        }

        let mut row = vec![Cell::new(key.to_string())];
        row.extend(granted.into_iter().map(|allowed| match (allowed, super::no_color()) {
            (true, true) => Cell::new("yes"),
            (true, false) => Cell::new("✓").fg(Color::Green),
            (false, _) => Cell::new("-"),
        }));
        table.add_row(row);
    }

    table
}
