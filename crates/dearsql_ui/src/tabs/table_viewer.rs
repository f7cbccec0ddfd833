use tracing::{debug, info};

use crate::{
    DEFAULT_ROWS_PER_PAGE, edit_buffer::EditBuffer, registry::DataSourceRegistry,
};

/// Where a table viewer is in its edit cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EditState {
    #[default]
    Viewing,
    Editing {
        row: usize,
        col: usize,
        buffer: EditBuffer,
    },
}

/// One page of a table, with client-side cell edits.
///
/// Edits only ever touch the cached page. Saving keeps them on screen and
/// cancelling restores the page as it was loaded; nothing is written back to
/// the data source.
#[derive(Debug, Clone)]
pub struct TableViewerTab {
    identity: String,
    table: String,
    current_page: usize,
    rows_per_page: usize,
    total_rows: usize,
    rows: Vec<Vec<String>>,
    column_names: Vec<String>,
    original_rows: Vec<Vec<String>>,
    edit_state: EditState,
    selection: Option<(usize, usize)>,
    has_changes: bool,
}

impl TableViewerTab {
    #[must_use]
    pub fn new(identity: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            table: table.into(),
            current_page: 0,
            rows_per_page: DEFAULT_ROWS_PER_PAGE,
            total_rows: 0,
            rows: Vec::new(),
            column_names: Vec::new(),
            original_rows: Vec::new(),
            edit_state: EditState::Viewing,
            selection: None,
            has_changes: false,
        }
    }

    #[must_use]
    pub fn with_rows_per_page(mut self, rows_per_page: usize) -> Self {
        self.rows_per_page = rows_per_page.max(1);
        self
    }

    /// Reload the row count, column names and current page.
    ///
    /// Returns `false` and leaves the cache untouched when no connected
    /// source matches this tab's identity. A reload discards any pending
    /// edit and unsaved change.
    pub async fn load_data(&mut self, registry: &mut DataSourceRegistry) -> bool {
        self.load_page(registry, self.current_page).await
    }

    /// Load `page` and make it current; the page number only moves when a
    /// source was found.
    async fn load_page(
        &mut self,
        registry: &mut DataSourceRegistry,
        page: usize,
    ) -> bool {
        let Some(source) = registry.find_connected_mut(&self.identity) else {
            debug!(identity = %self.identity, "no connected database for table tab");
            return false;
        };

        self.total_rows = source.row_count(&self.table).await;
        self.column_names = source.column_names(&self.table).await;
        let offset = page * self.rows_per_page;
        self.rows = source
            .table_data(&self.table, self.rows_per_page, offset)
            .await;
        self.current_page = page;

        self.original_rows.clone_from(&self.rows);
        self.has_changes = false;
        self.edit_state = EditState::Viewing;
        if let Some((row, col)) = self.selection
            && !self.in_bounds(row, col)
        {
            self.selection = None;
        }

        debug!(
            table = %self.table,
            page = self.current_page,
            rows = self.rows.len(),
            total = self.total_rows,
            "loaded table page"
        );
        true
    }

    /// Number of pages, zero for an empty table
    #[must_use]
    pub const fn total_pages(&self) -> usize {
        self.total_rows.div_ceil(self.rows_per_page)
    }

    /// Move forward a page; a no-op on the last page
    pub async fn next_page(&mut self, registry: &mut DataSourceRegistry) -> bool {
        if self.current_page + 1 >= self.total_pages() {
            return false;
        }
        self.load_page(registry, self.current_page + 1).await
    }

    /// Move back a page; a no-op on the first page
    pub async fn previous_page(
        &mut self,
        registry: &mut DataSourceRegistry,
    ) -> bool {
        if self.current_page == 0 {
            return false;
        }
        self.load_page(registry, self.current_page - 1).await
    }

    pub async fn first_page(&mut self, registry: &mut DataSourceRegistry) -> bool {
        self.load_page(registry, 0).await
    }

    pub async fn last_page(&mut self, registry: &mut DataSourceRegistry) -> bool {
        let last = self.total_pages().saturating_sub(1);
        self.load_page(registry, last).await
    }

    /// Drop selection and edits, then reload the current page
    pub async fn refresh_data(
        &mut self,
        registry: &mut DataSourceRegistry,
    ) -> bool {
        self.edit_state = EditState::Viewing;
        self.selection = None;
        self.has_changes = false;
        self.load_data(registry).await
    }

    pub fn select_cell(&mut self, row: usize, col: usize) -> bool {
        if !self.in_bounds(row, col) {
            return false;
        }
        self.selection = Some((row, col));
        true
    }

    /// Start editing a cell, seeding the buffer with its current text
    pub fn enter_edit_mode(&mut self, row: usize, col: usize) -> bool {
        let Some(value) = self.cell(row, col) else {
            return false;
        };
        self.edit_state = EditState::Editing {
            row,
            col,
            buffer: EditBuffer::with_text(value),
        };
        true
    }

    pub fn edit_buffer_mut(&mut self) -> Option<&mut EditBuffer> {
        match &mut self.edit_state {
            EditState::Editing { buffer, .. } => Some(buffer),
            EditState::Viewing => None,
        }
    }

    /// Leave edit mode, writing the buffer into the cached cell if `commit`
    /// is set and the text changed.
    pub fn exit_edit_mode(&mut self, commit: bool) {
        let EditState::Editing { row, col, buffer } =
            std::mem::take(&mut self.edit_state)
        else {
            return;
        };

        if commit
            && let Some(cell) =
                self.rows.get_mut(row).and_then(|cells| cells.get_mut(col))
            && cell.as_str() != buffer.text()
        {
            *cell = buffer.into_text();
            self.has_changes = true;
        }
    }

    /// Accept the edited page as the new baseline
    pub fn save_changes(&mut self) {
        if self.has_changes {
            info!(table = %self.table, "keeping edited cells in the viewer");
        }
        self.has_changes = false;
        self.original_rows.clone_from(&self.rows);
    }

    /// Restore the page as it was loaded
    pub fn cancel_changes(&mut self) {
        self.rows.clone_from(&self.original_rows);
        self.has_changes = false;
        self.edit_state = EditState::Viewing;
        self.selection = None;
    }

    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub const fn current_page(&self) -> usize {
        self.current_page
    }

    #[must_use]
    pub const fn rows_per_page(&self) -> usize {
        self.rows_per_page
    }

    #[must_use]
    pub const fn total_rows(&self) -> usize {
        self.total_rows
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    #[must_use]
    pub const fn edit_state(&self) -> &EditState {
        &self.edit_state
    }

    #[must_use]
    pub const fn is_editing(&self) -> bool {
        matches!(self.edit_state, EditState::Editing { .. })
    }

    #[must_use]
    pub const fn selection(&self) -> Option<(usize, usize)> {
        self.selection
    }

    #[must_use]
    pub const fn has_unsaved_changes(&self) -> bool {
        self.has_changes
    }

    fn cell(&self, row: usize, col: usize) -> Option<&str> {
        if col >= self.column_names.len() {
            return None;
        }
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    fn in_bounds(&self, row: usize, col: usize) -> bool {
        self.cell(row, col).is_some()
    }
}
