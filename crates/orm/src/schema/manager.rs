//! Schema Manager - loads, edits and persists the schema document

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{OrmError, OrmResult};
use super::types::{DatabaseSchema, TableSchema};

/// Owns the in-memory schema and the path of its JSON document
#[derive(Debug, Clone)]
pub struct SchemaManager {
    schema: DatabaseSchema,
    schema_path: PathBuf,
}

impl SchemaManager {
    /// Create a manager with an empty schema bound to `schema_path`
    pub fn new(schema_path: impl Into<PathBuf>) -> Self {
        Self {
            schema: DatabaseSchema::default(),
            schema_path: schema_path.into(),
        }
    }

    /// Create a manager and load the document immediately
    pub fn open(schema_path: impl Into<PathBuf>) -> OrmResult<Self> {
        let mut manager = Self::new(schema_path);
        manager.load_schema()?;
        Ok(manager)
    }

    pub fn schema_path(&self) -> &Path {
        &self.schema_path
    }

    pub fn schema(&self) -> &DatabaseSchema {
        &self.schema
    }

    /// Load the schema document.
    ///
    /// A missing document yields an empty schema. Unreadable, malformed or
    /// invalid documents are errors.
    pub fn load_schema(&mut self) -> OrmResult<()> {
        let content = match fs::read_to_string(&self.schema_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(
                    "Schema file {} not found, using empty schema",
                    self.schema_path.display()
                );
                self.schema = DatabaseSchema::default();
                return Ok(());
            }
            Err(e) => return Err(self.load_error(e.to_string())),
        };

        let schema: DatabaseSchema =
            serde_json::from_str(&content).map_err(|e| self.load_error(e.to_string()))?;
        schema
            .validate()
            .map_err(|e| self.load_error(e.to_string()))?;

        tracing::debug!(
            "Loaded schema with {} table(s) from {}",
            schema.tables.len(),
            self.schema_path.display()
        );
        self.schema = schema;
        Ok(())
    }

    fn load_error(&self, message: String) -> OrmError {
        OrmError::SchemaLoad {
            path: self.schema_path.clone(),
            message,
        }
    }

    /// Write the schema document as pretty-printed JSON
    pub fn save_schema(&self) -> OrmResult<()> {
        self.schema.validate()?;
        if let Some(parent) = self.schema_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(&self.schema)?;
        fs::write(&self.schema_path, content)?;
        Ok(())
    }

    pub fn add_table(&mut self, table: TableSchema) -> OrmResult<()> {
        if self.get_table(&table.name).is_some() {
            return Err(OrmError::TableExists(table.name));
        }
        self.schema.tables.push(table);
        Ok(())
    }

    /// Remove a table by name; removing an unknown table is a no-op
    pub fn remove_table(&mut self, table_name: &str) {
        self.schema.tables.retain(|table| table.name != table_name);
    }

    pub fn get_table(&self, table_name: &str) -> Option<&TableSchema> {
        self.schema.tables.iter().find(|table| table.name == table_name)
    }

    pub fn get_all_tables(&self) -> &[TableSchema] {
        &self.schema.tables
    }

    pub fn update_table(&mut self, table_name: &str, updated: TableSchema) -> OrmResult<()> {
        let slot = self
            .schema
            .tables
            .iter_mut()
            .find(|table| table.name == table_name)
            .ok_or_else(|| OrmError::TableNotFound(table_name.to_string()))?;
        *slot = updated;
        Ok(())
    }

    pub fn validate_schema(&self) -> OrmResult<()> {
        self.schema.validate()
    }
}
