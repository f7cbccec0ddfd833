use std::fmt::Write as _;

use dearsql_db::TableData;
use dearsql_ui::{DataSourceRegistry, EditState, TabKind, TabManager, TableViewerTab};
use unicode_width::UnicodeWidthStr;

const CELL_GAP: &str = " | ";

/// Display width of every column, wide enough for its header and cells
fn column_widths<S: AsRef<str>>(headers: &[S], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths = headers
        .iter()
        .map(|name| UnicodeWidthStr::width(name.as_ref()))
        .collect::<Vec<usize>>();

    for row in rows {
        for (width, value) in widths.iter_mut().zip(row) {
            let cell_width = value
                .lines()
                .map(UnicodeWidthStr::width)
                .max()
                .unwrap_or(0);
            *width = (*width).max(cell_width);
        }
    }

    widths
}

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(UnicodeWidthStr::width(text));
    format!("{text}{}", " ".repeat(fill))
}

fn grid_line<S: AsRef<str>>(cells: &[S], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| pad(cell.as_ref(), *width))
        .collect::<Vec<_>>()
        .join(CELL_GAP)
        .trim_end()
        .to_string()
}

/// Render rows under a header as an aligned text grid
pub fn render_grid<S: AsRef<str>>(headers: &[S], rows: &[Vec<String>]) -> String {
    let widths = column_widths(headers, rows);

    let mut out = grid_line(headers, &widths);
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for row in rows {
        out.push_str(&grid_line(row, &widths));
        out.push('\n');
    }
    out
}

pub fn render_table_data<T: TableData>(items: &[T]) -> String {
    let rows = items.iter().map(TableData::ref_array).collect::<Vec<_>>();
    format!("{}\n{}", T::title(), render_grid(&T::cols(), &rows))
}

/// The database tree: one node per source, tables under expanded nodes
pub fn render_sidebar(registry: &DataSourceRegistry) -> String {
    if registry.is_empty() {
        return "No databases open. Use `open sqlite <name> <path>`.\n".to_string();
    }

    let mut out = String::new();
    for (index, source) in registry.iter().enumerate() {
        let marker = if registry.selected_index() == Some(index) { '*' } else { ' ' };
        let state = if source.is_connected() { "connected" } else { "disconnected" };
        let _ = writeln!(
            out,
            "{marker}[{index}] {} ({}, {state})",
            source.name(),
            source.kind()
        );

        if !source.is_expanded() {
            continue;
        }
        if source.tables().is_empty() {
            out.push_str("      No tables found\n");
            continue;
        }
        for (table_index, table) in source.tables().iter().enumerate() {
            let selected = registry.selected_index() == Some(index)
                && registry.selected_table() == Some(table_index);
            let _ = writeln!(
                out,
                "    {}[{table_index}] {}",
                if selected { '*' } else { ' ' },
                table.name
            );
            if table.expanded {
                for column in &table.columns {
                    let mut flags = Vec::new();
                    if column.is_primary_key {
                        flags.push("PK");
                    }
                    if column.is_not_null {
                        flags.push("NOT NULL");
                    }
                    let _ = writeln!(
                        out,
                        "          {} {} {}",
                        column.name,
                        column.data_type,
                        flags.join(" ")
                    );
                }
            }
        }
    }
    out
}

/// Summary of every open source
pub fn render_sources(registry: &DataSourceRegistry) -> String {
    let rows = registry
        .iter()
        .enumerate()
        .map(|(index, source)| {
            vec![
                index.to_string(),
                source.name().to_string(),
                source.kind().to_string(),
                source.path().to_string(),
                yes_no(source.is_connected()),
                source.tables().len().to_string(),
            ]
        })
        .collect::<Vec<_>>();

    render_grid(&["#", "Name", "Type", "Path", "Connected", "Tables"], &rows)
}

pub fn render_tabs(tabs: &TabManager, active: Option<usize>) -> String {
    if tabs.is_empty() {
        return "No tabs open.\n".to_string();
    }

    let mut out = String::new();
    for (index, tab) in tabs.iter().enumerate() {
        let kind = match tab.kind() {
            TabKind::SqlEditor(_) => "sql",
            TabKind::TableViewer(_) => "table",
        };
        let marker = if active == Some(index) { '*' } else { ' ' };
        let _ = writeln!(out, "{marker}[{index}] {} ({kind})", tab.name());
    }
    out
}

/// One page of a table viewer with its pager line
pub fn render_viewer(viewer: &TableViewerTab) -> String {
    let mut out = format!(
        "{}: page {} of {} ({} rows total)",
        viewer.table_name(),
        viewer.current_page() + 1,
        viewer.total_pages().max(1),
        viewer.total_rows()
    );
    if viewer.has_unsaved_changes() {
        out.push_str(" [unsaved changes]");
    }
    out.push('\n');

    if viewer.column_names().is_empty() {
        out.push_str("No data to display\n");
        return out;
    }

    let first_row = viewer.current_page() * viewer.rows_per_page();
    let mut headers = vec!["#".to_string()];
    headers.extend(viewer.column_names().iter().cloned());
    let rows = viewer
        .rows()
        .iter()
        .enumerate()
        .map(|(index, cells)| {
            let mut row = vec![(first_row + index).to_string()];
            row.extend(cells.iter().enumerate().map(|(col, cell)| {
                if viewer.selection() == Some((index, col)) {
                    format!("[{cell}]")
                } else {
                    cell.clone()
                }
            }));
            row
        })
        .collect::<Vec<_>>();
    out.push_str(&render_grid(&headers, &rows));

    if let EditState::Editing { row, col, buffer } = viewer.edit_state() {
        let _ = writeln!(out, "editing ({row}, {col}): {}", buffer.text());
    }
    out
}

fn yes_no(flag: bool) -> String {
    if flag { "yes" } else { "no" }.to_string()
}

#[cfg(test)]
mod tests {
    use dearsql_db::Column;

    use super::*;

    #[test]
    fn test_grid_aligns_wide_characters() {
        let rows = vec![
            vec!["1".to_string(), "日本".to_string()],
            vec!["22".to_string(), "ab".to_string()],
        ];
        let grid = render_grid(&["id", "name"], &rows);

        assert_eq!(
            grid,
            "id | name\n---+-----\n1  | 日本\n22 | ab\n"
        );
    }

    #[test]
    fn test_grid_ignores_extra_cells() {
        let rows = vec![vec!["1".to_string(), "extra".to_string()]];
        let grid = render_grid(&["id"], &rows);
        assert_eq!(grid, "id\n--\n1\n");
    }

    #[test]
    fn test_render_columns() {
        let columns = vec![Column {
            name: "id".to_string(),
            data_type: "INTEGER".to_string(),
            is_primary_key: true,
            is_not_null: true,
        }];
        let out = render_table_data(&columns);

        assert!(out.starts_with("Columns\nName | Type    | Primary Key | Not Null\n"));
        assert!(out.ends_with("id   | INTEGER | yes         | yes\n"));
    }

    #[test]
    fn test_empty_registry_hint() {
        let registry = DataSourceRegistry::new();
        assert!(render_sidebar(&registry).starts_with("No databases open"));
        assert_eq!(render_tabs(&TabManager::new(), None), "No tabs open.\n");
    }

    #[test]
    fn test_unloaded_viewer() {
        let viewer = TableViewerTab::new("/tmp/a.db", "users");
        assert_eq!(
            render_viewer(&viewer),
            "users: page 1 of 1 (0 rows total)\nNo data to display\n"
        );
    }
}
