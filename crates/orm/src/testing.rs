//! In-memory database double for runner tests
//!
//! [`MockPool`] understands just enough SQL to stand in for PostgreSQL in the
//! migration runner: the tracking table DDL, record insert/delete/select, and
//! `CREATE TABLE`/`DROP TABLE` of user tables. Transactions buffer their
//! effects until commit, and any statement containing a registered substring
//! fails.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime};

use crate::backends::{DatabasePool, DatabaseRow, DatabaseTransaction, DatabaseValue};
use crate::error::{OrmError, OrmResult};

/// Mock database row implementation for testing
pub struct MockDatabaseRow {
    columns: HashMap<String, DatabaseValue>,
}

impl MockDatabaseRow {
    pub fn new() -> Self {
        Self {
            columns: HashMap::new(),
        }
    }

    pub fn with_column<T: Into<DatabaseValue>>(mut self, name: &str, value: T) -> Self {
        self.columns.insert(name.to_string(), value.into());
        self
    }
}

impl DatabaseRow for MockDatabaseRow {
    fn get_by_name(&self, name: &str) -> OrmResult<DatabaseValue> {
        self.columns
            .get(name)
            .cloned()
            .ok_or_else(|| OrmError::Database(format!("Column '{}' not found", name)))
    }
}

#[derive(Debug, Clone)]
struct Record {
    id: String,
    name: String,
    timestamp: i64,
    executed_at: NaiveDateTime,
}

#[derive(Default)]
struct State {
    tracking_table: bool,
    records: Vec<Record>,
    tables: Vec<String>,
    executed: Vec<String>,
    failing: Vec<String>,
    commits: usize,
    rollbacks: usize,
    clock: i64,
}

impl State {
    fn check(&self, sql: &str) -> OrmResult<()> {
        match self.failing.iter().find(|pattern| sql.contains(pattern.as_str())) {
            Some(_) => Err(OrmError::Database(format!("simulated failure: {}", sql))),
            None => Ok(()),
        }
    }

    fn tick(&mut self) -> NaiveDateTime {
        self.clock += 1;
        let epoch = DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default();
        epoch.naive_utc() + Duration::seconds(self.clock)
    }

    fn apply(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<()> {
        if sql.starts_with("CREATE TABLE IF NOT EXISTS") {
            self.tracking_table = true;
        } else if sql.starts_with("INSERT INTO") {
            let text = |i: usize| match params.get(i) {
                Some(DatabaseValue::String(s)) => Ok(s.clone()),
                other => Err(OrmError::Database(format!("bad parameter {}: {:?}", i, other))),
            };
            let timestamp = match params.get(2) {
                Some(DatabaseValue::Int64(t)) => *t,
                other => return Err(OrmError::Database(format!("bad timestamp: {:?}", other))),
            };
            let record = Record {
                id: text(0)?,
                name: text(1)?,
                timestamp,
                executed_at: self.tick(),
            };
            if self.records.iter().any(|r| r.id == record.id) {
                return Err(OrmError::Database(format!("duplicate key {}", record.id)));
            }
            self.records.push(record);
        } else if sql.starts_with("DELETE FROM") {
            if let Some(DatabaseValue::String(id)) = params.first() {
                self.records.retain(|r| &r.id != id);
            }
        } else if let Some(rest) = sql.strip_prefix("CREATE TABLE ") {
            let name = table_name(rest);
            if self.tables.contains(&name) {
                return Err(OrmError::Database(format!("relation \"{}\" already exists", name)));
            }
            self.tables.push(name);
        } else if let Some(rest) = sql.strip_prefix("DROP TABLE IF EXISTS ") {
            let name = table_name(rest);
            self.tables.retain(|t| t != &name);
        }
        Ok(())
    }
}

fn table_name(rest: &str) -> String {
    rest.split(|c: char| c.is_whitespace() || c == ';' || c == '(')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn record_row(record: &Record) -> Box<dyn DatabaseRow> {
    Box::new(
        MockDatabaseRow::new()
            .with_column("id", record.id.as_str())
            .with_column("name", record.name.as_str())
            .with_column("timestamp", record.timestamp)
            .with_column("executed_at", record.executed_at),
    )
}

/// Shared handle to an in-memory database
#[derive(Clone, Default)]
pub struct MockPool {
    state: Arc<Mutex<State>>,
}

impl MockPool {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every statement containing `pattern` fail
    pub fn fail_on(&self, pattern: &str) {
        self.state().failing.push(pattern.to_string());
    }

    /// Insert a tracking record directly
    pub fn seed_record(&self, id: &str, name: &str, timestamp: i64) {
        let mut state = self.state();
        state.tracking_table = true;
        let executed_at = state.tick();
        state.records.push(Record {
            id: id.to_string(),
            name: name.to_string(),
            timestamp,
            executed_at,
        });
    }

    pub fn tracking_table_created(&self) -> bool {
        self.state().tracking_table
    }

    /// User tables currently present, in creation order
    pub fn tables(&self) -> Vec<String> {
        self.state().tables.clone()
    }

    /// Statements committed through transactions, excluding tracking bookkeeping
    pub fn executed(&self) -> Vec<String> {
        self.state().executed.clone()
    }

    pub fn commits(&self) -> usize {
        self.state().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.state().rollbacks
    }
}

#[async_trait]
impl DatabasePool for MockPool {
    async fn begin_transaction(&self) -> OrmResult<Box<dyn DatabaseTransaction>> {
        Ok(Box::new(MockTransaction {
            state: Arc::clone(&self.state),
            pending: Vec::new(),
        }))
    }

    async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<u64> {
        let mut state = self.state();
        state.check(sql)?;
        state.apply(sql, params)?;
        Ok(0)
    }

    async fn fetch_all(
        &self,
        sql: &str,
        _params: &[DatabaseValue],
    ) -> OrmResult<Vec<Box<dyn DatabaseRow>>> {
        let state = self.state();
        state.check(sql)?;
        if !state.tracking_table {
            return Err(OrmError::Database(
                "relation \"_migrations\" does not exist".to_string(),
            ));
        }

        let mut records = state.records.clone();
        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        if sql.contains("ORDER BY timestamp DESC, id DESC LIMIT 1") {
            records.reverse();
            records.truncate(1);
        }
        Ok(records.iter().map(record_row).collect())
    }

    async fn close(&self) -> OrmResult<()> {
        Ok(())
    }
}

struct MockTransaction {
    state: Arc<Mutex<State>>,
    pending: Vec<(String, Vec<DatabaseValue>)>,
}

impl MockTransaction {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DatabaseTransaction for MockTransaction {
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<u64> {
        self.state().check(sql)?;
        self.pending.push((sql.to_string(), params.to_vec()));
        Ok(0)
    }

    async fn commit(self: Box<Self>) -> OrmResult<()> {
        let mut state = self.state();
        // effects land together or not at all
        let snapshot = (state.records.clone(), state.tables.clone());
        for (sql, params) in &self.pending {
            if let Err(e) = state.apply(sql, params) {
                state.records = snapshot.0;
                state.tables = snapshot.1;
                return Err(e);
            }
        }
        for (sql, _) in &self.pending {
            if !sql.starts_with("INSERT INTO") && !sql.starts_with("DELETE FROM") {
                state.executed.push(sql.clone());
            }
        }
        state.commits += 1;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> OrmResult<()> {
        self.state().rollbacks += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transaction_effects_are_buffered() {
        let pool = MockPool::new();
        pool.execute("CREATE TABLE IF NOT EXISTS _migrations (...);", &[])
            .await
            .unwrap();

        let mut tx = pool.begin_transaction().await.unwrap();
        tx.execute("CREATE TABLE users (\n    id UUID\n);", &[]).await.unwrap();
        assert!(pool.tables().is_empty());
        tx.commit().await.unwrap();
        assert_eq!(pool.tables(), vec!["users"]);

        let mut tx = pool.begin_transaction().await.unwrap();
        tx.execute("DROP TABLE IF EXISTS users;", &[]).await.unwrap();
        tx.rollback().await.unwrap();
        assert_eq!(pool.tables(), vec!["users"]);
        assert_eq!(pool.rollbacks(), 1);
    }

    #[tokio::test]
    async fn test_failing_statement() {
        let pool = MockPool::new();
        pool.fail_on("boom");
        let mut tx = pool.begin_transaction().await.unwrap();
        assert!(tx.execute("SELECT boom", &[]).await.is_err());
    }
}
