//! DDL Compiler - turns table definitions into forward and reverse SQL
//!
//! Each table compiles to a `CREATE TABLE`, then one unique index per unique
//! column, then one foreign key constraint per referencing column. The reverse
//! is a single drop, which also removes the table's indexes and constraints.

use crate::error::OrmResult;
use crate::schema::{
    ColumnDefinition, ColumnType, DatabaseSchema, DefaultValue, OnDelete, TableSchema,
};

use super::resolver;

/// Forward and reverse statements of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTable {
    pub up: Vec<String>,
    pub down: Vec<String>,
}

/// Compile one table definition
pub fn compile(table: &TableSchema) -> CompiledTable {
    let mut builder = TableBuilder::new(&table.name);

    for (name, column) in &table.columns {
        builder.column(name, column);
    }
    if table.timestamps {
        builder.timestamps();
    }
    for (name, column) in &table.columns {
        if column.unique && !column.primary {
            builder.unique_index(name);
        }
    }
    for (name, column) in &table.columns {
        if let Some(reference) = &column.references {
            builder.foreign_key(name, &reference.table, &reference.column, reference.on_delete);
        }
    }

    CompiledTable {
        up: builder.to_sql(),
        down: vec![drop_table(&table.name)],
    }
}

/// One script per table, in dependency order, for previewing a schema
pub fn compile_schema(schema: &DatabaseSchema) -> OrmResult<Vec<String>> {
    Ok(resolver::order(&schema.tables)?
        .iter()
        .map(|table| compile(table).up.join("\n"))
        .collect())
}

/// Drop of a schema-defined table
pub fn drop_table(table_name: &str) -> String {
    format!("DROP TABLE IF EXISTS {};", table_name)
}

/// Drop that also removes dependent objects of other tables
pub fn drop_table_cascade(table_name: &str) -> String {
    format!("DROP TABLE IF EXISTS {} CASCADE;", table_name)
}

/// SQL to create the migrations tracking table
pub fn tracking_table_sql(table_name: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    \
            id VARCHAR(255) PRIMARY KEY,\n    \
            name VARCHAR(255) NOT NULL,\n    \
            timestamp BIGINT NOT NULL,\n    \
            executed_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP\n\
        );",
        table_name
    )
}

/// Accumulates the pieces of a table's `up` sequence
struct TableBuilder {
    table_name: String,
    columns: Vec<String>,
    indexes: Vec<String>,
    constraints: Vec<String>,
}

impl TableBuilder {
    fn new(table_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            columns: Vec::new(),
            indexes: Vec::new(),
            constraints: Vec::new(),
        }
    }

    fn column(&mut self, name: &str, column: &ColumnDefinition) -> &mut Self {
        self.columns.push(column_sql(name, column));
        self
    }

    fn timestamps(&mut self) -> &mut Self {
        self.columns
            .push("created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP".to_string());
        self.columns
            .push("updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP".to_string());
        self
    }

    fn unique_index(&mut self, column: &str) -> &mut Self {
        self.indexes.push(format!(
            "CREATE UNIQUE INDEX {table}_{column}_unique ON {table}({column});",
            table = self.table_name,
            column = column
        ));
        self
    }

    fn foreign_key(
        &mut self,
        column: &str,
        references_table: &str,
        references_column: &str,
        on_delete: Option<OnDelete>,
    ) -> &mut Self {
        let mut sql = format!(
            "ALTER TABLE {table} ADD CONSTRAINT fk_{table}_{column} FOREIGN KEY ({column}) REFERENCES {}({})",
            references_table,
            references_column,
            table = self.table_name,
            column = column
        );
        if let Some(policy) = on_delete {
            sql.push_str(" ON DELETE ");
            sql.push_str(policy.as_sql());
        }
        sql.push(';');
        self.constraints.push(sql);
        self
    }

    fn to_sql(&self) -> Vec<String> {
        let create = format!(
            "CREATE TABLE {} (\n    {}\n);",
            self.table_name,
            self.columns.join(",\n    ")
        );

        let mut statements = Vec::with_capacity(1 + self.indexes.len() + self.constraints.len());
        statements.push(create);
        statements.extend(self.indexes.iter().cloned());
        statements.extend(self.constraints.iter().cloned());
        statements
    }
}

fn column_sql(name: &str, column: &ColumnDefinition) -> String {
    if column.primary {
        return match column.column_type {
            ColumnType::Number => {
                format!("{} INTEGER GENERATED ALWAYS AS IDENTITY PRIMARY KEY", name)
            }
            ColumnType::Uuid => format!("{} UUID PRIMARY KEY DEFAULT gen_random_uuid()", name),
            other => format!("{} {} PRIMARY KEY", name, other.sql_type()),
        };
    }

    let mut sql = format!("{} {}", name, column.column_type.sql_type());
    if !column.nullable {
        sql.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(&default_sql(default, column.column_type));
    }
    sql
}

fn default_sql(value: &DefaultValue, column_type: ColumnType) -> String {
    match (value, column_type) {
        (DefaultValue::Null, _) => "NULL".to_string(),
        (value, ColumnType::Json) => {
            let json = serde_json::Value::from(value).to_string();
            format!("{}::jsonb", quote(&json))
        }
        (DefaultValue::String(s), ColumnType::String) => quote(s),
        (value, ColumnType::String) => quote(&serde_json::Value::from(value).to_string()),
        (DefaultValue::Bool(true), _) => "TRUE".to_string(),
        (DefaultValue::Bool(false), _) => "FALSE".to_string(),
        (DefaultValue::String(s), _) => s.clone(),
        (DefaultValue::Number(n), _) => n.to_string(),
        (DefaultValue::Json(v), _) => quote(&v.to_string()),
    }
}

fn quote(literal: &str) -> String {
    format!("'{}'", literal.replace('\'', "''"))
}
