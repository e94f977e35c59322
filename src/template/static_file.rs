//! Static-file template source: a JSON document mapping keyword to raw
//! template document, loaded once at startup and held in memory.

use super::{NotFound, RawTemplateDoc, TemplateStore};
use anyhow::Context as _;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

pub struct StaticFileStore {
    entries: HashMap<String, RawTemplateDoc>,
}

impl StaticFileStore {
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read template file {}", path.display()))?;
        let entries: HashMap<String, RawTemplateDoc> = serde_json::from_str(&raw)
            .with_context(|| format!("template file {} is not a JSON object", path.display()))?;
        tracing::info!("loaded {} templates from {}", entries.len(), path.display());
        Ok(Self { entries })
    }

    pub fn from_entries(entries: HashMap<String, RawTemplateDoc>) -> Self {
        Self { entries }
    }
}

#[async_trait]
impl TemplateStore for StaticFileStore {
    async fn resolve(&self, key: &str) -> Result<RawTemplateDoc, NotFound> {
        self.entries.get(key).cloned().ok_or(NotFound)
    }

    async fn keywords(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write as _;

    #[tokio::test]
    async fn resolves_exact_case_sensitive_keyword() {
        let store = StaticFileStore::from_entries(HashMap::from([
            ("greeting".to_string(), json!("やっほー")),
            ("Greeting".to_string(), json!("formal hello")),
        ]));

        assert_eq!(store.resolve("greeting").await.unwrap(), json!("やっほー"));
        assert_eq!(
            store.resolve("Greeting").await.unwrap(),
            json!("formal hello")
        );
        assert_eq!(store.resolve("GREETING").await, Err(NotFound));
        assert_eq!(store.resolve("xyz123").await, Err(NotFound));
    }

    #[tokio::test]
    async fn loads_keyword_map_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"menu": {{"type": "box", "children": [{{"type": "text", "text": "menu"}}]}}}}"#
        )
        .unwrap();

        let store = StaticFileStore::load(file.path()).await.unwrap();
        assert_eq!(store.keywords().await, vec!["menu".to_string()]);
        assert!(store.resolve("menu").await.is_ok());
    }

    #[tokio::test]
    async fn rejects_non_object_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, 2, 3]").unwrap();
        assert!(StaticFileStore::load(file.path()).await.is_err());
    }
}
