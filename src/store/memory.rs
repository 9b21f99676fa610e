//! In-process store double for tests and offline demos.
//!
//! Holds tables as plain JSON rows. Individual tables can be armed to fail
//! so error paths (lost transport, rejected writes) are exercisable without
//! a network, and an artificial latency can be set to widen race windows in
//! refresh tests.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

use super::{DataStore, Filter, Order};
use crate::error::StoreError;

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    failing: Mutex<HashSet<String>>,
    rpc_responses: Mutex<HashMap<String, Value>>,
    latency: Mutex<Option<Duration>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a table with rows.
    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        self.tables.lock().insert(table.to_string(), rows);
    }

    /// Arm a table so every operation against it fails.
    pub fn fail_table(&self, table: &str) {
        self.failing.lock().insert(table.to_string());
    }

    /// Register a canned response for an rpc name. Unregistered names fail.
    pub fn set_rpc_response(&self, name: &str, response: Value) {
        self.rpc_responses
            .lock()
            .insert(name.to_string(), response);
    }

    /// Delay every operation, widening race windows for refresh tests.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    /// Snapshot of a table's rows.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    async fn simulate(&self, table: &str) -> Result<(), StoreError> {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.lock().contains(table) {
            return Err(StoreError::Transport(format!(
                "simulated failure for table {}",
                table
            )));
        }
        Ok(())
    }

    fn column_text(row: &Value, column: &str) -> Option<String> {
        match row.get(column) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }
    }
}

#[async_trait::async_trait]
impl DataStore for MemoryStore {
    async fn select(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<&Order>,
    ) -> Result<Vec<Value>, StoreError> {
        self.simulate(table).await?;
        let mut rows: Vec<Value> = self
            .rows(table)
            .into_iter()
            .filter(|row| {
                filters.iter().all(|f| {
                    Self::column_text(row, &f.column).as_deref() == Some(f.value.as_str())
                })
            })
            .collect();
        if let Some(order) = order {
            rows.sort_by(|a, b| {
                let left = Self::column_text(a, &order.column).unwrap_or_default();
                let right = Self::column_text(b, &order.column).unwrap_or_default();
                if order.descending {
                    right.cmp(&left)
                } else {
                    left.cmp(&right)
                }
            });
        }
        Ok(rows)
    }

    async fn update(&self, table: &str, id: &str, fields: Value) -> Result<(), StoreError> {
        self.simulate(table).await?;
        let fields = fields
            .as_object()
            .cloned()
            .ok_or_else(|| StoreError::Query("update fields must be an object".into()))?;
        let mut tables = self.tables.lock();
        if let Some(rows) = tables.get_mut(table) {
            for row in rows.iter_mut() {
                if Self::column_text(row, "id").as_deref() == Some(id) {
                    if let Some(object) = row.as_object_mut() {
                        for (key, value) in &fields {
                            object.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn insert(&self, table: &str, record: Value) -> Result<(), StoreError> {
        self.simulate(table).await?;
        self.tables
            .lock()
            .entry(table.to_string())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn rpc(&self, name: &str, _params: Value) -> Result<Value, StoreError> {
        self.simulate(&format!("rpc:{}", name)).await?;
        self.rpc_responses
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::Query(format!("no rpc registered: {}", name)))
    }
}
