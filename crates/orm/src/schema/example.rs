//! Starter blog schema written by `keel schema example`

use super::types::{ColumnDefinition, ColumnType, DatabaseSchema, OnDelete, TableSchema};

/// users, posts, comments, categories and tags
pub fn example_schema() -> DatabaseSchema {
    let uuid_pk = || ColumnDefinition::new(ColumnType::Uuid).primary();
    let required = |column_type| ColumnDefinition::new(column_type);
    let owner = |table: &str| {
        ColumnDefinition::new(ColumnType::Uuid).references(table, "id", Some(OnDelete::Cascade))
    };

    DatabaseSchema::new(vec![
        TableSchema::new("users")
            .column("id", uuid_pk())
            .column("email", required(ColumnType::String).unique())
            .column("name", required(ColumnType::String))
            .column(
                "settings",
                ColumnDefinition::new(ColumnType::Json).default_value(serde_json::json!({})),
            )
            .with_timestamps(),
        TableSchema::new("posts")
            .column("id", uuid_pk())
            .column("title", required(ColumnType::String))
            .column("content", required(ColumnType::String))
            .column(
                "published",
                ColumnDefinition::new(ColumnType::Boolean).default_value(false),
            )
            .column("user_id", owner("users"))
            .with_timestamps(),
        TableSchema::new("comments")
            .column("id", uuid_pk())
            .column("content", required(ColumnType::String))
            .column("user_id", owner("users"))
            .column("post_id", owner("posts"))
            .with_timestamps(),
        TableSchema::new("categories")
            .column("id", uuid_pk())
            .column("name", required(ColumnType::String).unique())
            .with_timestamps(),
        TableSchema::new("tags")
            .column("id", uuid_pk())
            .column("label", required(ColumnType::String).unique())
            .with_timestamps(),
    ])
}
