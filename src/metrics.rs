//! Entity counters.
//!
//! Components never reach for a global: the sink is created once at startup
//! and handed to every request through [`crate::crud::Session`]. Counting is
//! best effort. [`record`] logs a failing sink and carries on.

use std::collections::HashMap;
use std::sync::Mutex;

use libsql::Connection;

use crate::{Error, Result, db};

/// Entity kinds that are counted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CountKey {
    Users,
    Namespaces,
    Lists,
    Tasks,
    Teams,
}

impl CountKey {
    pub const ALL: [CountKey; 5] = [
        CountKey::Users,
        CountKey::Namespaces,
        CountKey::Lists,
        CountKey::Tasks,
        CountKey::Teams,
    ];

    fn table(self) -> &'static str {
        match self {
            CountKey::Users => "users",
            CountKey::Namespaces => "namespaces",
            CountKey::Lists => "lists",
            CountKey::Tasks => "tasks",
            CountKey::Teams => "teams",
        }
    }
}

/// Destination for counter updates.
pub trait Metrics: Send + Sync {
    fn update_count(&self, key: CountKey, delta: i64) -> Result<()>;
}

/// Apply `delta` to `key`, logging instead of failing when the sink errors.
pub fn record(sink: &dyn Metrics, key: CountKey, delta: i64) {
    if let Err(e) = sink.update_count(key, delta) {
        tracing::warn!("Could not update {key:?} count by {delta}: {e}");
    }
}

/// Sink that drops every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct Noop;

impl Metrics for Noop {
    fn update_count(&self, _key: CountKey, _delta: i64) -> Result<()> {
        Ok(())
    }
}

/// In-process counters.
#[derive(Debug, Default)]
pub struct Counters {
    counts: Mutex<HashMap<CountKey, i64>>,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of `key`.
    pub fn get(&self, key: CountKey) -> i64 {
        self.counts
            .lock()
            .map(|counts| counts.get(&key).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Seed every counter with the number of rows already stored.
    pub async fn load_totals(&self, conn: &Connection) -> Result<()> {
        for key in CountKey::ALL {
            let sql = format!("SELECT COUNT(*) FROM {}", key.table());
            let total = db::count(conn, &sql, ()).await?;
            let mut counts = self
                .counts
                .lock()
                .map_err(|_| Error::Internal("metrics lock poisoned".into()))?;
            counts.insert(key, total);
        }
        Ok(())
    }
}

impl Metrics for Counters {
    fn update_count(&self, key: CountKey, delta: i64) -> Result<()> {
        let mut counts = self
            .counts
            .lock()
            .map_err(|_| Error::Internal("metrics lock poisoned".into()))?;
        *counts.entry(key).or_insert(0) += delta;
        Ok(())
    }
}
