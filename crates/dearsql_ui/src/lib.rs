pub mod edit_buffer;
pub mod registry;
pub mod sidebar;
pub mod tabs;

#[cfg(test)]
mod test_support;

pub use edit_buffer::EditBuffer;
pub use registry::DataSourceRegistry;
pub use sidebar::Sidebar;
pub use tabs::{
    EditState, SqlEditorTab, Tab, TabKind, TabManager, TableViewerTab,
};

/// Rows fetched per table-viewer page
pub const DEFAULT_ROWS_PER_PAGE: usize = 100;
