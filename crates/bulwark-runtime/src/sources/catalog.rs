//! In-memory catalog source.
//!
//! A map of id to item, optionally loaded from a YAML or JSON document:
//!
//! ```yaml
//! ad-1:
//!   title: "Spring sale"
//! ad-2:
//!   title: "Free shipping"
//! ```
//!
//! Used as a primary, a missing id is a failure. Used as a secondary, a
//! missing id is `None`.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::{PrimarySource, SecondarySource, SourceError};

/// Catalog of items held in memory.
pub struct CatalogSource<T> {
    name: String,
    items: RwLock<HashMap<String, T>>,
}

impl<T> CatalogSource<T>
where
    T: Clone + Send + Sync,
{
    /// Create an empty catalog.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: RwLock::new(HashMap::new()),
        }
    }

    /// Create a catalog holding `items`.
    pub fn from_items<I, K>(name: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
    {
        Self {
            name: name.into(),
            items: RwLock::new(items.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }

    /// Add or replace an item.
    pub fn insert(&self, id: impl Into<String>, item: T) {
        self.items.write().insert(id.into(), item);
    }

    /// Remove an item, returning it if present.
    pub fn remove(&self, id: &str) -> Option<T> {
        self.items.write().remove(id)
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    fn lookup(&self, id: &str) -> Option<T> {
        self.items.read().get(id).cloned()
    }
}

impl<T> CatalogSource<T>
where
    T: Clone + Send + Sync + DeserializeOwned,
{
    /// Parse a catalog from a YAML string.
    pub fn from_yaml(name: impl Into<String>, yaml: &str) -> Result<Self, SourceError> {
        let items: HashMap<String, T> =
            serde_yaml::from_str(yaml).map_err(|e| SourceError::Load(e.to_string()))?;
        Ok(Self::from_items(name, items))
    }

    /// Parse a catalog from a JSON string.
    pub fn from_json(name: impl Into<String>, json: &str) -> Result<Self, SourceError> {
        let items: HashMap<String, T> =
            serde_json::from_str(json).map_err(|e| SourceError::Load(e.to_string()))?;
        Ok(Self::from_items(name, items))
    }

    /// Load a catalog file, picking the format from its extension.
    pub fn from_file(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| SourceError::Load(format!("{}: {}", path.display(), e)))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(name, &contents),
            _ => Self::from_yaml(name, &contents),
        }
    }
}

#[async_trait]
impl<T> PrimarySource<T> for CatalogSource<T>
where
    T: Clone + Send + Sync,
{
    async fn fetch(&self, id: &str) -> Result<T, SourceError> {
        self.lookup(id)
            .ok_or_else(|| SourceError::Unavailable(format!("'{}' not served by {}", id, self.name)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl<T> SecondarySource<T> for CatalogSource<T>
where
    T: Clone + Send + Sync,
{
    async fn fetch(&self, id: &str) -> Result<Option<T>, SourceError> {
        Ok(self.lookup(id))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<T> std::fmt::Debug for CatalogSource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogSource")
            .field("name", &self.name)
            .field("items", &self.items.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value as JsonValue;

    #[tokio::test]
    async fn test_primary_missing_id_fails() {
        let catalog = CatalogSource::from_items("nosql", [("ad-1", 1u32)]);

        assert_eq!(PrimarySource::fetch(&catalog, "ad-1").await, Ok(1));
        assert!(matches!(
            PrimarySource::fetch(&catalog, "ad-2").await,
            Err(SourceError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_secondary_missing_id_is_none() {
        let catalog = CatalogSource::from_items("sql", [("ad-1", 1u32)]);

        assert_eq!(SecondarySource::fetch(&catalog, "ad-1").await, Ok(Some(1)));
        assert_eq!(SecondarySource::fetch(&catalog, "ad-2").await, Ok(None));
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
ad-1:
  title: "Spring sale"
ad-2:
  title: "Free shipping"
"#;
        let catalog: CatalogSource<JsonValue> = CatalogSource::from_yaml("sql", yaml).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.lookup("ad-1").unwrap()["title"], "Spring sale");
    }

    #[test]
    fn test_from_json_rejects_non_map() {
        let result: Result<CatalogSource<JsonValue>, _> = CatalogSource::from_json("sql", "[1, 2]");
        assert!(matches!(result, Err(SourceError::Load(_))));
    }

    #[test]
    fn test_insert_and_remove() {
        let catalog = CatalogSource::new("sql");
        assert!(catalog.is_empty());

        catalog.insert("ad-1", "E".to_string());
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.remove("ad-1").as_deref(), Some("E"));
        assert!(catalog.is_empty());
    }
}
