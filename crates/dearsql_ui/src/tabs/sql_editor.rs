use tracing::debug;

use crate::registry::DataSourceRegistry;

/// Free-form query text and the text of its last result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlEditorTab {
    query: String,
    result: String,
}

impl SqlEditorTab {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn result(&self) -> &str {
        &self.result
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Clear the query text; the last result stays visible
    pub fn clear(&mut self) {
        self.query.clear();
    }

    /// Run the query against the selected data source.
    ///
    /// Returns `false` and leaves the previous result in place when nothing
    /// is selected or the source cannot connect.
    pub async fn execute(&mut self, registry: &mut DataSourceRegistry) -> bool {
        let Some(source) = registry.selected_mut() else {
            debug!("no database selected");
            return false;
        };
        if !source.connect().await {
            return false;
        }

        self.result = source.execute_query(&self.query).await;
        true
    }
}
