use tracing::{debug, info};

use crate::{registry::DataSourceRegistry, tabs::TabManager};

/// Actions the database tree issues on behalf of the user
pub struct Sidebar;

impl Sidebar {
    /// Expand a database node, loading its tables the first time.
    ///
    /// Returns `false` when the index is out of range.
    pub async fn expand(registry: &mut DataSourceRegistry, index: usize) -> bool {
        let Some(source) = registry.get_mut(index) else {
            return false;
        };
        source.set_expanded(true);

        if !source.tables_loaded() {
            debug!(name = source.name(), "tables not loaded yet, attempting to load");
            if !source.is_connected() {
                source.connect().await;
            }
            if source.is_connected() {
                source.refresh_tables().await;
            }
        }
        true
    }

    pub fn collapse(registry: &mut DataSourceRegistry, index: usize) -> bool {
        let Some(source) = registry.get_mut(index) else {
            return false;
        };
        source.set_expanded(false);
        true
    }

    /// Toggle the column list of one table under an expanded database
    pub fn toggle_table(
        registry: &mut DataSourceRegistry,
        index: usize,
        table: usize,
    ) -> Option<bool> {
        let table = registry.get_mut(index)?.tables_mut().get_mut(table)?;
        table.expanded = !table.expanded;
        Some(table.expanded)
    }

    /// Reload the tables even if they were loaded before
    pub async fn refresh(registry: &mut DataSourceRegistry, index: usize) -> bool {
        let Some(source) = registry.get_mut(index) else {
            return false;
        };
        source.set_tables_loaded(false);
        source.refresh_tables().await;
        true
    }

    pub fn disconnect(registry: &mut DataSourceRegistry, index: usize) -> bool {
        let Some(source) = registry.get_mut(index) else {
            return false;
        };
        info!(name = source.name(), "disconnecting");
        source.disconnect();
        true
    }

    /// Select a table and open (or focus) its viewer tab
    pub async fn open_table(
        registry: &mut DataSourceRegistry,
        index: usize,
        table: usize,
        tabs: &mut TabManager,
    ) -> Option<usize> {
        let source = registry.get(index)?;
        let identity = source.connection_identity().to_string();
        let table_name = source.tables().get(table)?.name.clone();

        registry.select_table(index, table);
        Some(
            tabs.create_table_viewer(registry, &identity, &table_name)
                .await,
        )
    }

    pub fn new_sql_editor(tabs: &mut TabManager) -> usize {
        tabs.create_sql_editor(None)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::test_support::MockSource;

    fn registry_with(source: MockSource) -> DataSourceRegistry {
        let mut registry = DataSourceRegistry::new();
        registry.add(Box::new(source));
        registry
    }

    #[tokio::test]
    async fn test_expand_loads_tables_once() {
        let source = MockSource::new("app", 3);
        let refreshes = source.refresh_counter();
        let mut registry = registry_with(source);

        assert!(Sidebar::expand(&mut registry, 0).await);
        let source = registry.get(0).unwrap();
        assert!(source.is_expanded());
        assert!(source.is_connected());
        assert_eq!(source.tables().len(), 1);

        registry.get_mut(0).unwrap().tables_mut().clear();
        Sidebar::collapse(&mut registry, 0);
        Sidebar::expand(&mut registry, 0).await;
        assert!(registry.get(0).unwrap().tables().is_empty());
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);

        assert!(!Sidebar::expand(&mut registry, 4).await);
    }

    #[tokio::test]
    async fn test_expand_unreachable_does_not_refresh() {
        let mut registry = registry_with(MockSource::unreachable("down"));

        Sidebar::expand(&mut registry, 0).await;
        let source = registry.get(0).unwrap();
        assert!(!source.is_connected());
        assert!(!source.tables_loaded());
    }

    #[tokio::test]
    async fn test_manual_refresh_overrides_loaded_flag() {
        let source = MockSource::new("app", 3);
        let refreshes = source.refresh_counter();
        let mut registry = registry_with(source);
        Sidebar::expand(&mut registry, 0).await;
        registry.get_mut(0).unwrap().tables_mut().clear();

        assert!(Sidebar::refresh(&mut registry, 0).await);
        let source = registry.get(0).unwrap();
        assert!(source.tables_loaded());
        assert_eq!(source.tables().len(), 1);
        assert_eq!(refreshes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_disconnect_keeps_tables() {
        let mut registry = registry_with(MockSource::new("app", 3));
        Sidebar::expand(&mut registry, 0).await;

        assert!(Sidebar::disconnect(&mut registry, 0));
        let source = registry.get(0).unwrap();
        assert!(!source.is_connected());
        assert_eq!(source.tables().len(), 1);
    }

    #[tokio::test]
    async fn test_toggle_table() {
        let mut registry = registry_with(MockSource::new("app", 3));
        Sidebar::expand(&mut registry, 0).await;

        assert_eq!(Sidebar::toggle_table(&mut registry, 0, 0), Some(true));
        assert_eq!(Sidebar::toggle_table(&mut registry, 0, 0), Some(false));
        assert_eq!(Sidebar::toggle_table(&mut registry, 0, 9), None);
    }

    #[tokio::test]
    async fn test_open_table_selects_and_creates_tab() {
        let mut registry = registry_with(MockSource::new("app", 3));
        let mut tabs = TabManager::new();
        Sidebar::expand(&mut registry, 0).await;

        let index = Sidebar::open_table(&mut registry, 0, 0, &mut tabs)
            .await
            .unwrap();
        assert_eq!(registry.selected_index(), Some(0));
        assert_eq!(registry.selected_table(), Some(0));

        let viewer = tabs.get(index).unwrap().as_table_viewer().unwrap();
        assert_eq!(viewer.identity(), "mock://app");
        assert_eq!(viewer.rows().len(), 3);

        assert!(Sidebar::open_table(&mut registry, 0, 5, &mut tabs).await.is_none());
        assert_eq!(Sidebar::new_sql_editor(&mut tabs), 1);
    }
}
