//! Dependency Resolver - orders tables so referenced tables are created first

use std::collections::{HashMap, HashSet};

use crate::error::{OrmError, OrmResult};
use crate::schema::TableSchema;

/// Order `tables` so every table comes after the tables its columns reference.
///
/// Depth-first post-order over the reference graph, starting from each table in
/// declaration order. A table referencing only itself stays in discovery
/// order, and references to tables outside `tables` are ignored. A cycle fails
/// with [`OrmError::CircularDependency`] and nothing is returned.
pub fn order(tables: &[TableSchema]) -> OrmResult<Vec<TableSchema>> {
    let by_name: HashMap<&str, &TableSchema> = tables
        .iter()
        .map(|table| (table.name.as_str(), table))
        .collect();

    let mut resolver = Resolver {
        by_name: &by_name,
        visited: HashSet::new(),
        on_stack: HashSet::new(),
        sorted: Vec::with_capacity(tables.len()),
    };

    for table in tables {
        resolver.visit(&table.name)?;
    }

    Ok(resolver.sorted.into_iter().cloned().collect())
}

struct Resolver<'a> {
    by_name: &'a HashMap<&'a str, &'a TableSchema>,
    visited: HashSet<&'a str>,
    on_stack: HashSet<&'a str>,
    sorted: Vec<&'a TableSchema>,
}

impl<'a> Resolver<'a> {
    fn visit(&mut self, name: &str) -> OrmResult<()> {
        let Some(&table) = self.by_name.get(name) else {
            // dangling reference: not a node of this graph
            return Ok(());
        };
        let name = table.name.as_str();

        if self.visited.contains(name) {
            return Ok(());
        }
        if !self.on_stack.insert(name) {
            return Err(OrmError::CircularDependency {
                table: name.to_string(),
            });
        }

        for dependency in table.referenced_tables() {
            if dependency != name {
                self.visit(dependency)?;
            }
        }

        self.on_stack.remove(name);
        self.visited.insert(name);
        self.sorted.push(table);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDefinition, ColumnType};

    fn table(name: &str, references: &[&str]) -> TableSchema {
        let mut table =
            TableSchema::new(name).column("id", ColumnDefinition::new(ColumnType::Uuid).primary());
        for target in references {
            table = table.column(
                &format!("{}_id", target),
                ColumnDefinition::new(ColumnType::Uuid).references(target, "id", None),
            );
        }
        table
    }

    fn names(tables: &[TableSchema]) -> Vec<&str> {
        tables.iter().map(|t| t.name.as_str()).collect()
    }

    fn position(tables: &[TableSchema], name: &str) -> usize {
        tables.iter().position(|t| t.name == name).unwrap()
    }

    #[test]
    fn test_chain_declared_backwards() {
        let input = vec![table("c", &["b"]), table("b", &["a"]), table("a", &[])];
        let sorted = order(&input).unwrap();
        assert_eq!(names(&sorted), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_independent_tables_keep_declaration_order() {
        let input = vec![table("tags", &[]), table("users", &[]), table("categories", &[])];
        let sorted = order(&input).unwrap();
        assert_eq!(names(&sorted), vec!["tags", "users", "categories"]);
    }

    #[test]
    fn test_every_reference_precedes_its_owner() {
        let input = vec![
            table("comments", &["users", "posts"]),
            table("posts", &["users", "categories"]),
            table("likes", &["comments", "users"]),
            table("users", &[]),
            table("categories", &[]),
        ];
        let sorted = order(&input).unwrap();
        assert_eq!(sorted.len(), input.len());

        for owner in &sorted {
            for target in owner.referenced_tables() {
                assert!(
                    position(&sorted, target) < position(&sorted, &owner.name),
                    "{} must come before {}",
                    target,
                    owner.name
                );
            }
        }
    }

    #[test]
    fn test_self_reference_is_not_a_cycle() {
        let input = vec![table("users", &[]), table("employees", &["employees", "users"])];
        let sorted = order(&input).unwrap();
        assert_eq!(names(&sorted), vec!["users", "employees"]);
    }

    #[test]
    fn test_missing_reference_is_skipped() {
        let input = vec![table("posts", &["accounts"]), table("users", &[])];
        let sorted = order(&input).unwrap();
        assert_eq!(names(&sorted), vec!["posts", "users"]);
    }

    #[test]
    fn test_two_table_cycle_fails() {
        let input = vec![table("a", &["b"]), table("b", &["a"])];
        match order(&input) {
            Err(OrmError::CircularDependency { table }) => assert_eq!(table, "a"),
            other => panic!("expected circular dependency, got {:?}", other),
        }
    }

    #[test]
    fn test_cycle_behind_acyclic_prefix_fails() {
        let input = vec![
            table("root", &[]),
            table("x", &["root", "y"]),
            table("y", &["z"]),
            table("z", &["x"]),
        ];
        assert!(matches!(
            order(&input),
            Err(OrmError::CircularDependency { .. })
        ));
    }

    #[test]
    fn test_empty_input() {
        assert!(order(&[]).unwrap().is_empty());
    }
}
