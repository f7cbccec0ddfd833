use std::io::Write as _;

use color_eyre::Result;
use dearsql_ui::{
    DataSourceRegistry, Sidebar, Tab, TabKind, TabManager, TableViewerTab,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::{
    commands::{Command, HELP, PageMove},
    rendering::{
        render_sidebar, render_sources, render_table_data, render_tabs,
        render_viewer,
    },
};

pub const APP_NAME: &str = "dearsql";

const NO_SELECTION: &str = "No database selected. Use `select <n>`.";
const NO_VIEWER: &str = "The active tab is not a table viewer. Use `view <table>`.";

/// The console application: open databases, tabs and the active tab
#[derive(Default)]
pub struct App {
    /// Is the application running?
    running: bool,
    registry: DataSourceRegistry,
    tabs: TabManager,
    active_tab: Option<usize>,
}

impl App {
    /// Run the read-eval-print loop until `quit` or end of input
    pub async fn run(mut self) -> Result<()> {
        self.running = true;
        println!("{APP_NAME} {}. Type `help` for commands.", env!("CARGO_PKG_VERSION"));

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while self.running {
            print!("{APP_NAME}> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            match line.parse::<Command>() {
                Ok(command) => {
                    let output = self.execute(command).await;
                    if !output.is_empty() {
                        println!("{}", output.trim_end());
                    }
                }
                Err(e) => println!("{e}"),
            }
        }

        self.shutdown();
        Ok(())
    }

    /// Apply one command and return the text to show
    pub async fn execute(&mut self, command: Command) -> String {
        debug!(?command, "executing command");
        match command {
            Command::Open(descriptor) => match self.registry.open(&descriptor).await {
                Ok(index) => {
                    self.registry.select(index);
                    format!("Opened [{index}] {}\n", descriptor.name())
                }
                Err(e) => format!("Failed to open database: {e}"),
            },
            Command::List => render_sources(&self.registry),
            Command::Select(index) => {
                if self.registry.select(index) {
                    render_sidebar(&self.registry)
                } else {
                    format!("No database [{index}]")
                }
            }
            Command::Expand(index) => {
                if Sidebar::expand(&mut self.registry, index).await {
                    render_sidebar(&self.registry)
                } else {
                    format!("No database [{index}]")
                }
            }
            Command::Collapse(index) => {
                Sidebar::collapse(&mut self.registry, index);
                render_sidebar(&self.registry)
            }
            Command::ToggleTable(index, table) => {
                match Sidebar::toggle_table(&mut self.registry, index, table) {
                    Some(_) => render_sidebar(&self.registry),
                    None => format!("No table [{table}] in database [{index}]"),
                }
            }
            Command::Refresh(index) => {
                if Sidebar::refresh(&mut self.registry, index).await {
                    render_sidebar(&self.registry)
                } else {
                    format!("No database [{index}]")
                }
            }
            Command::RefreshAll => {
                self.registry.refresh_all().await;
                render_sidebar(&self.registry)
            }
            Command::Disconnect(index) => {
                if Sidebar::disconnect(&mut self.registry, index) {
                    format!("Disconnected [{index}]")
                } else {
                    format!("No database [{index}]")
                }
            }
            Command::Tables => render_sidebar(&self.registry),
            Command::Columns(table) => self.describe(&table),
            Command::Sql(query) => self.run_sql(query).await,
            Command::NewEditor(name) => {
                self.tabs.create_sql_editor(name.as_deref());
                self.follow_focus();
                render_tabs(&self.tabs, self.active_tab)
            }
            Command::View(table) => self.view(&table).await,
            Command::Page(step) => self.page(step).await,
            Command::SelectCell(row, col) => self.with_viewer(|viewer| {
                if viewer.select_cell(row, col) {
                    render_viewer(viewer)
                } else {
                    format!("No cell ({row}, {col}) on this page")
                }
            }),
            Command::Edit { row, col, text } => self.with_viewer(|viewer| {
                if !viewer.enter_edit_mode(row, col) {
                    return format!("No cell ({row}, {col}) on this page");
                }
                if let Some(buffer) = viewer.edit_buffer_mut() {
                    buffer.set_text(text);
                }
                viewer.exit_edit_mode(true);
                render_viewer(viewer)
            }),
            Command::Save => self.with_viewer(|viewer| {
                viewer.save_changes();
                render_viewer(viewer)
            }),
            Command::Cancel => self.with_viewer(|viewer| {
                viewer.cancel_changes();
                render_viewer(viewer)
            }),
            Command::Tabs => render_tabs(&self.tabs, self.active_tab),
            Command::SwitchTab(index) => {
                if index < self.tabs.len() {
                    self.active_tab = Some(index);
                    self.show_active_tab()
                } else {
                    format!("No tab [{index}]")
                }
            }
            Command::Close(name) => {
                if self.tabs.close(&name) {
                    self.active_tab = self.tabs.len().checked_sub(1);
                    render_tabs(&self.tabs, self.active_tab)
                } else {
                    format!("No tab named `{name}`")
                }
            }
            Command::Help => HELP.to_string(),
            Command::Quit => {
                self.quit();
                String::new()
            }
        }
    }

    fn describe(&self, table: &str) -> String {
        let Some(source) = self.registry.selected() else {
            return NO_SELECTION.to_string();
        };
        match source.tables().iter().find(|t| t.name == table) {
            Some(table) => render_table_data(&table.columns),
            None => format!("No table `{table}` in {}", source.name()),
        }
    }

    /// Run a query in the active SQL editor, opening one if needed
    async fn run_sql(&mut self, query: String) -> String {
        let index = match self.active_tab.filter(|index| {
            self.tabs
                .get(*index)
                .is_some_and(|tab| matches!(tab.kind(), TabKind::SqlEditor(_)))
        }) {
            Some(index) => index,
            None => {
                let index = self.tabs.create_sql_editor(None);
                self.follow_focus();
                index
            }
        };

        let Some(editor) =
            self.tabs.get_mut(index).and_then(Tab::as_sql_editor_mut)
        else {
            return String::new();
        };
        editor.set_query(query);
        if editor.execute(&mut self.registry).await {
            editor.result().to_string()
        } else {
            format!("{NO_SELECTION} (or it could not connect)")
        }
    }

    async fn view(&mut self, table: &str) -> String {
        let Some(index) = self.registry.selected_index() else {
            return NO_SELECTION.to_string();
        };
        let Some(source) = self.registry.get(index) else {
            return NO_SELECTION.to_string();
        };
        let identity = source.connection_identity().to_string();
        let position = source.tables().iter().position(|t| t.name == table);

        match position {
            Some(table_index) => {
                Sidebar::open_table(
                    &mut self.registry,
                    index,
                    table_index,
                    &mut self.tabs,
                )
                .await;
            }
            None => {
                self.tabs
                    .create_table_viewer(&mut self.registry, &identity, table)
                    .await;
            }
        }
        self.follow_focus();
        self.show_active_tab()
    }

    async fn page(&mut self, step: PageMove) -> String {
        let Some(viewer) = active_viewer(&mut self.tabs, self.active_tab) else {
            return NO_VIEWER.to_string();
        };

        let moved = match step {
            PageMove::Next => viewer.next_page(&mut self.registry).await,
            PageMove::Previous => viewer.previous_page(&mut self.registry).await,
            PageMove::First => viewer.first_page(&mut self.registry).await,
            PageMove::Last => viewer.last_page(&mut self.registry).await,
            PageMove::Reload => viewer.refresh_data(&mut self.registry).await,
        };

        let mut out = render_viewer(viewer);
        if !moved {
            out.push_str("(page unchanged)\n");
        }
        out
    }

    fn with_viewer(&mut self, f: impl FnOnce(&mut TableViewerTab) -> String) -> String {
        active_viewer(&mut self.tabs, self.active_tab)
            .map_or_else(|| NO_VIEWER.to_string(), f)
    }

    fn show_active_tab(&self) -> String {
        let Some(tab) = self.active_tab.and_then(|index| self.tabs.get(index)) else {
            return render_tabs(&self.tabs, self.active_tab);
        };
        match tab.kind() {
            TabKind::TableViewer(viewer) => render_viewer(viewer),
            TabKind::SqlEditor(editor) => {
                let mut out = format!("{}\n> {}\n", tab.name(), editor.query());
                out.push_str(editor.result());
                out
            }
        }
    }

    /// Make the tab that most recently asked for focus the active one
    fn follow_focus(&mut self) {
        if let Some(index) = self.tabs.take_focus() {
            self.active_tab = Some(index);
        }
    }

    fn shutdown(&mut self) {
        info!(databases = self.registry.len(), "shutting down");
        self.tabs.close_all();
        self.registry.disconnect_all();
    }

    /// Set running to false to quit the application.
    const fn quit(&mut self) {
        self.running = false;
    }
}

fn active_viewer(
    tabs: &mut TabManager,
    active: Option<usize>,
) -> Option<&mut TableViewerTab> {
    tabs.get_mut(active?)?.as_table_viewer_mut()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging;

    async fn run(app: &mut App, line: &str) -> String {
        app.execute(line.parse().unwrap()).await
    }

    /// An app with one SQLite database holding `users(id, name)`
    async fn app_with_users(dir: &std::path::Path, rows: usize) -> App {
        logging::init_test();
        let path = dir.join("app.db");
        let mut app = App::default();

        let out = run(&mut app, &format!("open sqlite app {}", path.display())).await;
        assert!(out.starts_with("Opened [0] app"), "{out}");

        run(
            &mut app,
            "sql CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
        )
        .await;
        for id in 1..=rows {
            run(&mut app, &format!("sql INSERT INTO users (name) VALUES ('user {id}')"))
                .await;
        }
        run(&mut app, "refresh 0").await;
        app
    }

    #[tokio::test]
    async fn test_sql_reports_results() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_users(dir.path(), 2).await;

        let out = run(&mut app, "sql SELECT name FROM users ORDER BY id").await;
        assert_eq!(out, "name\n----------\nuser 1\nuser 2\n");

        let out = run(&mut app, "sql DELETE FROM users WHERE id = 2").await;
        assert_eq!(out, "Query executed successfully. Rows affected: 1");

        let out = run(&mut app, "sql SELEC").await;
        assert!(out.starts_with("Error: "), "{out}");
        assert_eq!(app.tabs.len(), 1);
    }

    #[tokio::test]
    async fn test_sql_runs_scripts() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_users(dir.path(), 0).await;

        let out = run(
            &mut app,
            "sql CREATE TABLE tags (name TEXT); \
             INSERT INTO tags VALUES ('db'); SELECT name FROM tags",
        )
        .await;
        assert_eq!(out, "name\n----------\ndb\n");
    }

    #[tokio::test]
    async fn test_view_and_page() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_users(dir.path(), 120).await;

        let out = run(&mut app, "view users").await;
        assert!(out.starts_with("users: page 1 of 2 (120 rows total)"), "{out}");
        assert_eq!(app.registry.selected_table(), Some(0));

        let out = run(&mut app, "next").await;
        assert!(out.starts_with("users: page 2 of 2"), "{out}");
        assert!(out.contains("user 120"));

        let out = run(&mut app, "next").await;
        assert!(out.ends_with("(page unchanged)\n"), "{out}");

        run(&mut app, "first").await;
        run(&mut app, "view users").await;
        assert_eq!(app.tabs.len(), 2);
    }

    #[tokio::test]
    async fn test_edit_save_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_users(dir.path(), 3).await;
        run(&mut app, "view users").await;

        let out = run(&mut app, "edit 0 1 Ada Lovelace").await;
        assert!(out.contains("[unsaved changes]"), "{out}");
        assert!(out.contains("Ada Lovelace"));

        let out = run(&mut app, "cancel").await;
        assert!(!out.contains("Ada Lovelace"));
        assert!(out.contains("user 1"));

        run(&mut app, "edit 0 1 Ada").await;
        let out = run(&mut app, "save").await;
        assert!(!out.contains("[unsaved changes]"));
        assert!(out.contains("Ada"));

        // Nothing was written, so a reload shows the stored value
        let out = run(&mut app, "reload").await;
        assert!(out.contains("user 1"));

        let out = run(&mut app, "edit 9 9 nope").await;
        assert_eq!(out, "No cell (9, 9) on this page");
    }

    #[tokio::test]
    async fn test_commands_without_targets() {
        let mut app = App::default();

        assert_eq!(run(&mut app, "next").await, NO_VIEWER);
        assert_eq!(run(&mut app, "view users").await, NO_SELECTION);
        assert_eq!(run(&mut app, "columns users").await, NO_SELECTION);
        assert!(run(&mut app, "sql SELECT 1").await.starts_with(NO_SELECTION));
        assert_eq!(run(&mut app, "select 3").await, "No database [3]");
        assert_eq!(run(&mut app, "close nothing").await, "No tab named `nothing`");
    }

    #[tokio::test]
    async fn test_open_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = App::default();
        let path = dir.path().join("missing/dir/app.db");

        let out = run(&mut app, &format!("open sqlite app {}", path.display())).await;
        assert!(out.starts_with("Failed to open database"), "{out}");
        assert!(app.registry.is_empty());
    }

    #[tokio::test]
    async fn test_tree_and_tabs() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_users(dir.path(), 1).await;

        let out = run(&mut app, "expand 0").await;
        assert!(out.contains("[0] users"), "{out}");

        let out = run(&mut app, "toggle 0 0").await;
        assert!(out.contains("id INTEGER PK NOT NULL"), "{out}");

        let out = run(&mut app, "columns users").await;
        assert!(out.starts_with("Columns\n"), "{out}");

        run(&mut app, "editor scratch").await;
        let out = run(&mut app, "tabs").await;
        assert!(out.contains("*[1] scratch (sql)"), "{out}");

        let out = run(&mut app, "disconnect 0").await;
        assert_eq!(out, "Disconnected [0]");
        let out = run(&mut app, "tables").await;
        assert!(out.contains("disconnected"));
        assert!(out.contains("[0] users"));

        run(&mut app, "quit").await;
        assert!(!app.running);
        app.shutdown();
        assert!(app.tabs.is_empty());
    }
}
