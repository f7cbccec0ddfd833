pub mod sql_editor;
pub mod table_viewer;

use tracing::info;

pub use sql_editor::SqlEditorTab;
pub use table_viewer::{EditState, TableViewerTab};

use crate::registry::DataSourceRegistry;

const SQL_EDITOR_PREFIX: &str = "SQL Editor ";

#[derive(Debug, Clone)]
pub enum TabKind {
    SqlEditor(SqlEditorTab),
    TableViewer(TableViewerTab),
}

/// A named tab in the content area
#[derive(Debug, Clone)]
pub struct Tab {
    name: String,
    open: bool,
    should_focus: bool,
    kind: TabKind,
}

impl Tab {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: TabKind) -> Self {
        Self {
            name: name.into(),
            open: true,
            should_focus: false,
            kind,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    pub const fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    #[must_use]
    pub const fn should_focus(&self) -> bool {
        self.should_focus
    }

    pub const fn set_should_focus(&mut self, focus: bool) {
        self.should_focus = focus;
    }

    #[must_use]
    pub const fn kind(&self) -> &TabKind {
        &self.kind
    }

    pub const fn kind_mut(&mut self) -> &mut TabKind {
        &mut self.kind
    }

    #[must_use]
    pub const fn as_table_viewer(&self) -> Option<&TableViewerTab> {
        match &self.kind {
            TabKind::TableViewer(viewer) => Some(viewer),
            TabKind::SqlEditor(_) => None,
        }
    }

    pub fn as_table_viewer_mut(&mut self) -> Option<&mut TableViewerTab> {
        match &mut self.kind {
            TabKind::TableViewer(viewer) => Some(viewer),
            TabKind::SqlEditor(_) => None,
        }
    }

    pub fn as_sql_editor_mut(&mut self) -> Option<&mut SqlEditorTab> {
        match &mut self.kind {
            TabKind::SqlEditor(editor) => Some(editor),
            TabKind::TableViewer(_) => None,
        }
    }
}

/// Ordered set of open tabs
#[derive(Debug, Clone, Default)]
pub struct TabManager {
    tabs: Vec<Tab>,
}

impl TabManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tab and return its index
    pub fn add(&mut self, tab: Tab) -> usize {
        self.tabs.push(tab);
        self.tabs.len() - 1
    }

    /// Close the first tab with this name
    pub fn close(&mut self, name: &str) -> bool {
        let Some(index) = self.position(name) else {
            return false;
        };
        self.tabs.remove(index);
        true
    }

    pub fn close_all(&mut self) {
        self.tabs.clear();
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Tab> {
        self.tabs.iter().find(|tab| tab.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Tab> {
        self.tabs.iter_mut().find(|tab| tab.name == name)
    }

    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.tabs.iter().position(|tab| tab.name == name)
    }

    /// Index of the table viewer showing `table` from the source with this
    /// identity
    #[must_use]
    pub fn find_table_tab(&self, identity: &str, table: &str) -> Option<usize> {
        self.tabs.iter().position(|tab| {
            tab.as_table_viewer().is_some_and(|viewer| {
                viewer.identity() == identity && viewer.table_name() == table
            })
        })
    }

    #[must_use]
    pub fn has_tab(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Tab> {
        self.tabs.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Tab> {
        self.tabs.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tab> {
        self.tabs.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    /// Open a SQL editor, named "SQL Editor N" with the smallest free N when
    /// no name is given
    pub fn create_sql_editor(&mut self, name: Option<&str>) -> usize {
        let name = match name {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => self.next_sql_editor_name(),
        };

        let mut tab = Tab::new(name, TabKind::SqlEditor(SqlEditorTab::new()));
        tab.set_should_focus(true);
        self.add(tab)
    }

    /// Focus the viewer for this table, creating and loading one if needed
    pub async fn create_table_viewer(
        &mut self,
        registry: &mut DataSourceRegistry,
        identity: &str,
        table: &str,
    ) -> usize {
        if let Some(index) = self.find_table_tab(identity, table)
            && let Some(tab) = self.tabs.get_mut(index)
        {
            info!(%table, "table is already open, focusing existing tab");
            tab.set_should_focus(true);
            return index;
        }

        let mut viewer = TableViewerTab::new(identity, table);
        viewer.load_data(registry).await;

        let mut tab = Tab::new(table, TabKind::TableViewer(viewer));
        tab.set_should_focus(true);
        info!(%table, "created new tab for table");
        self.add(tab)
    }

    /// Clear every focus request, returning the index of the most recent one
    pub fn take_focus(&mut self) -> Option<usize> {
        let mut focused = None;
        for (index, tab) in self.tabs.iter_mut().enumerate() {
            if tab.should_focus {
                tab.should_focus = false;
                focused = Some(index);
            }
        }
        focused
    }

    /// Drop tabs the user has closed
    pub fn prune_closed(&mut self) {
        self.tabs.retain(Tab::is_open);
    }

    fn next_sql_editor_name(&self) -> String {
        (1..)
            .map(|count| format!("{SQL_EDITOR_PREFIX}{count}"))
            .find(|name| !self.has_tab(name))
            .unwrap_or_else(|| SQL_EDITOR_PREFIX.trim_end().to_string())
    }
}
