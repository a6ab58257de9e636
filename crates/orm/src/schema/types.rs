//! Schema Types - declarative table definitions
//!
//! These types mirror the schema document (`schema.json`). Column types are a
//! closed set, so an unknown `type` in the document is a parse error rather
//! than a silently degraded column.

use std::collections::HashSet;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;

use crate::error::{OrmError, OrmResult};

/// Logical column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Number,
    Boolean,
    Date,
    Json,
    Uuid,
}

impl ColumnType {
    /// PostgreSQL type this column compiles to
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::String => "VARCHAR(255)",
            ColumnType::Number => "INTEGER",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Date => "TIMESTAMP",
            ColumnType::Json => "JSONB",
            ColumnType::Uuid => "UUID",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::String => "string",
            ColumnType::Number => "number",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::Json => "json",
            ColumnType::Uuid => "uuid",
        };
        f.write_str(name)
    }
}

/// Referential action applied when the referenced row is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnDelete {
    #[serde(rename = "CASCADE")]
    Cascade,
    #[serde(rename = "SET NULL")]
    SetNull,
    #[serde(rename = "RESTRICT")]
    Restrict,
}

impl OnDelete {
    pub fn as_sql(&self) -> &'static str {
        match self {
            OnDelete::Cascade => "CASCADE",
            OnDelete::SetNull => "SET NULL",
            OnDelete::Restrict => "RESTRICT",
        }
    }
}

/// Foreign key target of a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnReference {
    pub table: String,
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<OnDelete>,
}

/// Column default, tagged by the JSON shape it was written with
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    /// Arrays and objects
    Json(JsonValue),
}

impl From<JsonValue> for DefaultValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => DefaultValue::Null,
            JsonValue::Bool(b) => DefaultValue::Bool(b),
            JsonValue::Number(n) => DefaultValue::Number(n),
            JsonValue::String(s) => DefaultValue::String(s),
            other => DefaultValue::Json(other),
        }
    }
}

impl From<&DefaultValue> for JsonValue {
    fn from(value: &DefaultValue) -> Self {
        match value {
            DefaultValue::Null => JsonValue::Null,
            DefaultValue::Bool(b) => JsonValue::Bool(*b),
            DefaultValue::Number(n) => JsonValue::Number(n.clone()),
            DefaultValue::String(s) => JsonValue::String(s.clone()),
            DefaultValue::Json(v) => v.clone(),
        }
    }
}

impl Serialize for DefaultValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        JsonValue::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DefaultValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        JsonValue::deserialize(deserializer).map(DefaultValue::from)
    }
}

/// Definition of a single column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub primary: bool,
    // `default: null` must survive as DefaultValue::Null, not collapse to None
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_default"
    )]
    pub default: Option<DefaultValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<ColumnReference>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn present_default<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DefaultValue>, D::Error> {
    DefaultValue::deserialize(deserializer).map(Some)
}

impl ColumnDefinition {
    pub fn new(column_type: ColumnType) -> Self {
        Self {
            column_type,
            nullable: false,
            unique: false,
            primary: false,
            default: None,
            references: None,
        }
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<JsonValue>) -> Self {
        self.default = Some(DefaultValue::from(value.into()));
        self
    }

    pub fn references(mut self, table: &str, column: &str, on_delete: Option<OnDelete>) -> Self {
        self.references = Some(ColumnReference {
            table: table.to_string(),
            column: column.to_string(),
            on_delete,
        });
        self
    }
}

/// Definition of a table; column order is the declaration order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    #[serde(with = "ordered_columns")]
    pub columns: Vec<(String, ColumnDefinition)>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub timestamps: bool,
}

impl TableSchema {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            timestamps: false,
        }
    }

    /// Append a column
    pub fn column(mut self, name: &str, definition: ColumnDefinition) -> Self {
        self.columns.push((name.to_string(), definition));
        self
    }

    /// Enable implicit created_at/updated_at columns
    pub fn with_timestamps(mut self) -> Self {
        self.timestamps = true;
        self
    }

    pub fn get_column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, definition)| definition)
    }

    /// Names of tables this table references, in column order, without duplicates
    pub fn referenced_tables(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.columns
            .iter()
            .filter_map(|(_, column)| column.references.as_ref())
            .map(|reference| reference.table.as_str())
            .filter(|table| seen.insert(*table))
            .collect()
    }

    fn validate(&self) -> OrmResult<()> {
        if self.name.trim().is_empty() {
            return Err(OrmError::Validation("Table name cannot be empty".to_string()));
        }

        for (name, column) in &self.columns {
            if name.trim().is_empty() {
                return Err(OrmError::Validation(format!(
                    "Table {} has a column with an empty name",
                    self.name
                )));
            }
            validate_default(&self.name, name, column)?;
        }

        Ok(())
    }
}

fn validate_default(table: &str, name: &str, column: &ColumnDefinition) -> OrmResult<()> {
    let Some(default) = &column.default else {
        return Ok(());
    };

    let accepted = match column.column_type {
        ColumnType::Boolean => matches!(default, DefaultValue::Null | DefaultValue::Bool(_)),
        ColumnType::Number => matches!(
            default,
            DefaultValue::Null | DefaultValue::Number(_) | DefaultValue::String(_)
        ),
        ColumnType::Json => true,
        ColumnType::String | ColumnType::Date | ColumnType::Uuid => !matches!(
            default,
            DefaultValue::Json(_)
        ),
    };

    if accepted {
        Ok(())
    } else {
        Err(OrmError::Validation(format!(
            "Column {}.{} of type {} has an incompatible default {}",
            table,
            name,
            column.column_type,
            JsonValue::from(default)
        )))
    }
}

/// The whole declarative schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub tables: Vec<TableSchema>,
}

impl DatabaseSchema {
    pub fn new(tables: Vec<TableSchema>) -> Self {
        Self { tables }
    }

    /// Check structural rules serde cannot express
    pub fn validate(&self) -> OrmResult<()> {
        let mut names = HashSet::new();
        for table in &self.tables {
            table.validate()?;
            if !names.insert(table.name.as_str()) {
                return Err(OrmError::Validation(format!(
                    "Duplicate table name: {}",
                    table.name
                )));
            }
        }
        Ok(())
    }
}

/// JSON object <-> ordered column list
mod ordered_columns {
    use super::*;

    pub fn serialize<S: Serializer>(
        columns: &[(String, ColumnDefinition)],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(columns.len()))?;
        for (name, definition) in columns {
            map.serialize_entry(name, definition)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<(String, ColumnDefinition)>, D::Error> {
        deserializer.deserialize_map(ColumnsVisitor)
    }

    struct ColumnsVisitor;

    impl<'de> Visitor<'de> for ColumnsVisitor {
        type Value = Vec<(String, ColumnDefinition)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of column name to column definition")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut columns: Vec<(String, ColumnDefinition)> =
                Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((name, definition)) = access.next_entry::<String, ColumnDefinition>()? {
                if columns.iter().any(|(existing, _)| existing == &name) {
                    return Err(serde::de::Error::custom(format!(
                        "duplicate column `{}`",
                        name
                    )));
                }
                columns.push((name, definition));
            }
            Ok(columns)
        }
    }
}
