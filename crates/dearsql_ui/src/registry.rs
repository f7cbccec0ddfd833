use dearsql_db::{ConnectionDescriptor, DataSource, DbError, create};
use tracing::{info, warn};

/// Every data source opened during the session, plus the sidebar selection.
///
/// Tabs never hold on to a source; they look it up again by connection
/// identity each time they need it.
#[derive(Default)]
pub struct DataSourceRegistry {
    sources: Vec<Box<dyn DataSource>>,
    selected: Option<usize>,
    selected_table: Option<usize>,
}

impl DataSourceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source and return its index
    pub fn add(&mut self, source: Box<dyn DataSource>) -> usize {
        info!(
            name = source.name(),
            tables = source.tables().len(),
            "adding database to list"
        );
        self.sources.push(source);
        self.sources.len() - 1
    }

    /// Create, connect and introspect a source, then add it.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Configuration`] when the descriptor is invalid and
    /// [`DbError::Connection`] when the source cannot be opened. Nothing is
    /// added in either case.
    pub async fn open(
        &mut self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<usize, DbError> {
        descriptor.validate()?;
        let mut source = create(descriptor).ok_or_else(|| {
            DbError::Configuration(format!(
                "unsupported connection: {}",
                descriptor.name()
            ))
        })?;

        if !source.connect().await {
            warn!(identity = source.connection_identity(), "failed to open database");
            return Err(DbError::Connection(format!(
                "failed to open database: {}",
                source.connection_identity()
            )));
        }
        source.refresh_tables().await;

        Ok(self.add(source))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Box<dyn DataSource>> {
        self.sources.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Box<dyn DataSource>> {
        self.sources.iter_mut()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&dyn DataSource> {
        self.sources.get(index).map(AsRef::as_ref)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Box<dyn DataSource>> {
        self.sources.get_mut(index)
    }

    #[must_use]
    pub fn find_by_identity(&self, identity: &str) -> Option<&dyn DataSource> {
        self.sources
            .iter()
            .find(|source| source.connection_identity() == identity)
            .map(AsRef::as_ref)
    }

    /// The first connected source whose identity matches
    pub fn find_connected_mut(
        &mut self,
        identity: &str,
    ) -> Option<&mut Box<dyn DataSource>> {
        self.sources.iter_mut().find(|source| {
            source.connection_identity() == identity && source.is_connected()
        })
    }

    /// Select a source; the table selection is cleared.
    ///
    /// Returns `false` for an index out of range.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.sources.len() {
            return false;
        }
        self.selected = Some(index);
        self.selected_table = None;
        true
    }

    pub fn select_table(&mut self, index: usize, table: usize) -> bool {
        if !self.select(index) {
            return false;
        }
        self.selected_table = Some(table);
        true
    }

    #[must_use]
    pub const fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    #[must_use]
    pub const fn selected_table(&self) -> Option<usize> {
        self.selected_table
    }

    #[must_use]
    pub fn selected(&self) -> Option<&dyn DataSource> {
        self.selected.and_then(|index| self.get(index))
    }

    pub fn selected_mut(&mut self) -> Option<&mut Box<dyn DataSource>> {
        let index = self.selected?;
        self.sources.get_mut(index)
    }

    /// Refresh the tables of every connected source
    pub async fn refresh_all(&mut self) {
        for source in &mut self.sources {
            if source.is_connected() {
                source.refresh_tables().await;
            }
        }
    }

    pub fn disconnect_all(&mut self) {
        for source in &mut self.sources {
            source.disconnect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockSource;

    fn registry_with(names: &[&str]) -> DataSourceRegistry {
        let mut registry = DataSourceRegistry::new();
        for name in names {
            registry.add(Box::new(MockSource::new(name, 10)));
        }
        registry
    }

    #[test]
    fn test_selection() {
        let mut registry = registry_with(&["a", "b"]);
        assert!(registry.selected().is_none());

        assert!(registry.select_table(1, 3));
        assert_eq!(registry.selected().map(DataSource::name), Some("b"));
        assert_eq!(registry.selected_table(), Some(3));

        assert!(registry.select(0));
        assert_eq!(registry.selected_table(), None);
        assert!(!registry.select(7));
        assert_eq!(registry.selected_index(), Some(0));
    }

    #[tokio::test]
    async fn test_find_connected_requires_connection() {
        let mut registry = registry_with(&["a"]);
        assert!(registry.find_by_identity("mock://a").is_some());
        assert!(registry.find_connected_mut("mock://a").is_none());

        registry.get_mut(0).unwrap().connect().await;
        assert!(registry.find_connected_mut("mock://a").is_some());
        assert!(registry.find_connected_mut("mock://b").is_none());
    }

    #[tokio::test]
    async fn test_refresh_all_skips_disconnected() {
        let mut registry = registry_with(&["a", "b"]);
        registry.get_mut(1).unwrap().connect().await;

        registry.refresh_all().await;

        assert!(!registry.get(0).unwrap().tables_loaded());
        assert!(registry.get(1).unwrap().tables_loaded());

        registry.disconnect_all();
        assert!(registry.iter().all(|source| !source.is_connected()));
    }

    #[tokio::test]
    async fn test_open_sqlite_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop.db");
        let mut registry = DataSourceRegistry::new();

        let descriptor =
            ConnectionDescriptor::sqlite("shop", path.to_string_lossy());
        let index = registry.open(&descriptor).await.unwrap();

        let source = registry.get(index).unwrap();
        assert!(source.is_connected());
        assert!(source.tables_loaded());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_open_failure_adds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing/dir/shop.db");
        let mut registry = DataSourceRegistry::new();

        let result = registry
            .open(&ConnectionDescriptor::sqlite("shop", path.to_string_lossy()))
            .await;
        assert!(matches!(result, Err(DbError::Connection(_))));

        let result =
            registry.open(&ConnectionDescriptor::sqlite("", "x.db")).await;
        assert!(matches!(result, Err(DbError::Configuration(_))));
        assert!(registry.is_empty());
    }
}
