//! Loading and saving schema documents.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::ast::SchemaDocument;
use crate::error::{SchemaError, SchemaResult};

/// Version written into freshly bootstrapped documents.
pub const DEFAULT_SCHEMA_VERSION: &str = "1.0.0";

/// Reads and writes a schema document at a fixed path.
#[derive(Debug, Clone)]
pub struct SchemaLoader {
    path: PathBuf,
}

impl SchemaLoader {
    /// Create a loader for the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The document path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the document exists on disk.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the document, writing an empty default first if the file is missing.
    pub fn load_or_init(&self) -> SchemaResult<SchemaDocument> {
        if !self.exists() {
            info!(path = %self.path.display(), "schema file not found, creating default");
            let document = SchemaDocument::default();
            self.save(&document)?;
            warn!("declared schema has no collections; run `schema-manager generate` to capture the live schema");
            return Ok(document);
        }
        self.load()
    }

    /// Load an existing document.
    pub fn load(&self) -> SchemaResult<SchemaDocument> {
        let shown = self.path.display().to_string();
        let src = fs::read_to_string(&self.path).map_err(|e| SchemaError::io(&shown, e))?;

        let mut document: SchemaDocument =
            serde_json::from_str(&src).map_err(|e| SchemaError::malformed(&shown, &src, &e))?;
        document.fill_names_from_keys();

        if document.is_empty() {
            warn!(path = %shown, "declared schema has no collections; run `schema-manager generate` to capture the live schema");
        } else {
            debug!(
                path = %shown,
                collections = document.collections.len(),
                fields = document.field_count(),
                "loaded declared schema"
            );
        }

        Ok(document)
    }

    /// Write a document as pretty-printed JSON, creating parent directories.
    pub fn save(&self, document: &SchemaDocument) -> SchemaResult<()> {
        let shown = self.path.display().to_string();
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| SchemaError::io(&shown, e))?;
            }
        }

        let mut json = serde_json::to_string_pretty(document).map_err(|e| {
            SchemaError::io(&shown, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        json.push('\n');

        fs::write(&self.path, json).map_err(|e| SchemaError::io(&shown, e))?;
        debug!(path = %shown, "wrote schema document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CollectionDef, FieldDef};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_load_or_init_creates_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pocketbase").join("schema.json");
        let loader = SchemaLoader::new(&path);

        let document = loader.load_or_init().unwrap();

        assert!(path.exists());
        assert_eq!(document.version, DEFAULT_SCHEMA_VERSION);
        assert!(document.is_empty());

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["version"], "1.0.0");
        assert_eq!(written["collections"], serde_json::json!({}));
    }

    #[test]
    fn test_load_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schema.json");
        fs::write(
            &path,
            r#"{
  "version": "1.2.0",
  "collections": {
    "cats": {
      "type": "base",
      "schema": [{ "name": "name", "type": "text", "required": true }]
    }
  }
}"#,
        )
        .unwrap();

        let document = SchemaLoader::new(&path).load_or_init().unwrap();

        assert_eq!(document.version, "1.2.0");
        let cats = document.get("cats").unwrap();
        assert_eq!(cats.name, "cats");
        assert!(cats.schema[0].required);
    }

    #[test]
    fn test_load_empty_collections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schema.json");
        fs::write(&path, r#"{ "version": "1.0.0", "collections": {} }"#).unwrap();

        let document = SchemaLoader::new(&path).load().unwrap();
        assert!(document.is_empty());
    }

    #[test]
    fn test_malformed_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schema.json");
        fs::write(&path, "{\n  \"version\": \"1.0.0\",\n  \"collections\": {\n}").unwrap();

        let err = SchemaLoader::new(&path).load_or_init().unwrap_err();
        assert!(matches!(err, SchemaError::Malformed { .. }));
        assert!(err.to_string().contains("schema.json"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let loader = SchemaLoader::new(dir.path().join("generated-schema.json"));
        let document = SchemaDocument::from_collections(
            "1.0.0",
            vec![CollectionDef::base("cats").with_field(FieldDef::text("name"))],
        );

        loader.save(&document).unwrap();
        assert_eq!(loader.load().unwrap(), document);
    }
}
