//! # Append-Log Transport
//!
//! The seam between the sync engine and the shared remote store.
//!
//! ## Protocol Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Append Log (per stream)                          │
//! │                                                                         │
//! │  cambios/ventas                                                         │
//! │    -Nabc001: { action, origin_branch, timestamp_ms, entity_type, ... } │
//! │    -Nabc002: { ... }         keys assigned by the service, strictly    │
//! │    -Nabc003: { ... }         increasing in creation order              │
//! │                                                                         │
//! │  append(stream, record) ──► new key ("push id")                        │
//! │  read_from(stream, cursor) ──► all records with key > cursor           │
//! │  health_check() ──► cheap reachability probe, no data transfer         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Discipline
//! Transport trouble is an expected steady state (branches run on
//! consumer DSL). Every method returns `Option`: `None` means "the
//! remote was not available just now" and the caller falls back to the
//! offline queue or skips the cycle. No transport error ever propagates
//! as `Err`.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use sucursal_core::{ChangeRecord, EntityStream};

/// Timeout for data requests (append / read).
const DATA_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for the reachability probe. Short on purpose: a slow remote
/// is treated as unreachable rather than stalling the cycle.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Trait
// =============================================================================

/// Result of a reachability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogHealth {
    /// Remote answered; a full cycle is worth attempting.
    Reachable,
    /// Remote answered but rejected the credentials.
    BadCredentials,
    /// Remote answered but the store path does not exist.
    NotFound,
    /// No usable answer (timeout, DNS, connection refused).
    Unreachable,
}

impl LogHealth {
    /// True only for [`LogHealth::Reachable`].
    pub fn is_reachable(&self) -> bool {
        matches!(self, LogHealth::Reachable)
    }
}

/// A shared, ordered, append-only record store.
///
/// Implementations must assign keys that sort lexicographically in
/// creation order; cursors and idempotency both lean on that.
pub trait AppendLog {
    /// Appends a record to a stream's log.
    ///
    /// Returns the assigned key, or `None` if the remote was not
    /// available (caller queues the change for later).
    fn append(
        &self,
        stream: EntityStream,
        record: &ChangeRecord,
    ) -> impl std::future::Future<Output = Option<String>> + Send;

    /// Reads all records with key strictly greater than `after`
    /// (`None` reads from the beginning), keyed by their log key in
    /// ascending order.
    ///
    /// Record values are raw JSON: one malformed record must not poison
    /// its neighbors, so parsing happens per record at the caller.
    fn read_from(
        &self,
        stream: EntityStream,
        after: Option<&str>,
    ) -> impl std::future::Future<Output = Option<BTreeMap<String, Value>>> + Send;

    /// Cheap reachability probe, run before attempting a cycle.
    fn health_check(&self) -> impl std::future::Future<Output = LogHealth> + Send;
}

// =============================================================================
// Firebase REST Implementation
// =============================================================================

/// Append log backed by a Firebase Realtime Database REST endpoint.
///
/// - `POST {base}/{collection}.json?auth={token}` appends and returns
///   `{"name": "<push id>"}`
/// - `GET  {base}/{collection}.json?orderBy="$key"&startAt="{cursor}"`
///   reads from the cursor (inclusive on the Firebase side; the
///   boundary key is stripped here so callers get strictly-after)
/// - `GET  {base}/.json?shallow=true` probes reachability
#[derive(Debug, Clone)]
pub struct FirebaseLog {
    client: reqwest::Client,
    base_url: String,
    auth_token: String,
}

impl FirebaseLog {
    /// Creates a new Firebase-backed log.
    pub fn new(base_url: &str, auth_token: &str) -> Self {
        FirebaseLog {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: auth_token.to_string(),
        }
    }

    fn collection_url(&self, stream: EntityStream) -> String {
        format!("{}/{}.json", self.base_url, stream.collection())
    }
}

impl AppendLog for FirebaseLog {
    async fn append(&self, stream: EntityStream, record: &ChangeRecord) -> Option<String> {
        let url = self.collection_url(stream);

        let response = self
            .client
            .post(&url)
            .timeout(DATA_TIMEOUT)
            .query(&[("auth", self.auth_token.as_str())])
            .json(record)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!(stream = %stream, error = %e, "Append request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(stream = %stream, status = %response.status(), "Append rejected");
            return None;
        }

        // Firebase answers {"name": "<push id>"}
        #[derive(serde::Deserialize)]
        struct PushResponse {
            name: String,
        }

        match response.json::<PushResponse>().await {
            Ok(push) => {
                debug!(stream = %stream, sync_id = %push.name, "Appended change record");
                Some(push.name)
            }
            Err(e) => {
                warn!(stream = %stream, error = %e, "Append response unparseable");
                None
            }
        }
    }

    async fn read_from(
        &self,
        stream: EntityStream,
        after: Option<&str>,
    ) -> Option<BTreeMap<String, Value>> {
        let url = self.collection_url(stream);

        let mut request = self
            .client
            .get(&url)
            .timeout(DATA_TIMEOUT)
            .query(&[("auth", self.auth_token.as_str()), ("orderBy", "\"$key\"")]);

        if let Some(cursor) = after {
            request = request.query(&[("startAt", format!("\"{cursor}\""))]);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(stream = %stream, error = %e, "Read request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(stream = %stream, status = %response.status(), "Read rejected");
            return None;
        }

        // An empty collection comes back as JSON null, not {}.
        let body: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!(stream = %stream, error = %e, "Read response unparseable");
                return None;
            }
        };

        let mut records: BTreeMap<String, Value> = match body {
            Value::Null => BTreeMap::new(),
            Value::Object(map) => map.into_iter().collect(),
            other => {
                warn!(stream = %stream, body = %other, "Unexpected read response shape");
                return None;
            }
        };

        // startAt is inclusive; the cursor record was already applied.
        if let Some(cursor) = after {
            records.remove(cursor);
        }

        debug!(stream = %stream, count = records.len(), "Read change records");
        Some(records)
    }

    async fn health_check(&self) -> LogHealth {
        let url = format!("{}/.json", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(PROBE_TIMEOUT)
            .query(&[("auth", self.auth_token.as_str()), ("shallow", "true")])
            .send()
            .await;

        match response {
            Ok(r) => match r.status() {
                s if s.is_success() => LogHealth::Reachable,
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LogHealth::BadCredentials,
                StatusCode::NOT_FOUND => LogHealth::NotFound,
                s => {
                    warn!(status = %s, "Unexpected probe status");
                    LogHealth::Unreachable
                }
            },
            Err(e) => {
                debug!(error = %e, "Remote unreachable");
                LogHealth::Unreachable
            }
        }
    }
}

// =============================================================================
// In-Process Implementation
// =============================================================================

/// In-process append log for tests and demos.
///
/// Clones share storage, so two orchestrators holding clones of the
/// same `MemoryLog` see each other's appends, like two branches sharing
/// one remote. The offline switch makes every operation fail the way a
/// dead network would.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    inner: Arc<Mutex<MemoryLogInner>>,
}

#[derive(Debug, Default)]
struct MemoryLogInner {
    collections: HashMap<EntityStream, BTreeMap<String, Value>>,
    counter: u64,
    offline: bool,
}

impl MemoryLog {
    /// Creates an empty, online log.
    pub fn new() -> Self {
        MemoryLog::default()
    }

    /// Simulates losing (true) or regaining (false) connectivity.
    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().unwrap().offline = offline;
    }

    /// Number of records in a stream.
    pub fn len(&self, stream: EntityStream) -> usize {
        self.inner
            .lock()
            .unwrap()
            .collections
            .get(&stream)
            .map(|c| c.len())
            .unwrap_or(0)
    }

    /// True if the stream holds no records.
    pub fn is_empty(&self, stream: EntityStream) -> bool {
        self.len(stream) == 0
    }

    /// Injects a raw JSON value, bypassing record validation. Lets
    /// tests plant malformed records the way a buggy producer would.
    pub fn inject_raw(&self, stream: EntityStream, value: Value) -> String {
        let mut inner = self.inner.lock().unwrap();
        inner.counter += 1;
        let key = format!("-M{:010}", inner.counter);
        inner
            .collections
            .entry(stream)
            .or_default()
            .insert(key.clone(), value);
        key
    }
}

impl AppendLog for MemoryLog {
    async fn append(&self, stream: EntityStream, record: &ChangeRecord) -> Option<String> {
        let value = serde_json::to_value(record).ok()?;

        let mut inner = self.inner.lock().unwrap();
        if inner.offline {
            return None;
        }
        inner.counter += 1;
        // Zero-padded counter keys sort lexicographically in creation
        // order, matching the push-id contract.
        let key = format!("-M{:010}", inner.counter);
        inner
            .collections
            .entry(stream)
            .or_default()
            .insert(key.clone(), value);
        Some(key)
    }

    async fn read_from(
        &self,
        stream: EntityStream,
        after: Option<&str>,
    ) -> Option<BTreeMap<String, Value>> {
        let inner = self.inner.lock().unwrap();
        if inner.offline {
            return None;
        }

        let records = inner
            .collections
            .get(&stream)
            .map(|c| {
                c.iter()
                    .filter(|(key, _)| after.map_or(true, |cursor| key.as_str() > cursor))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();

        Some(records)
    }

    async fn health_check(&self) -> LogHealth {
        if self.inner.lock().unwrap().offline {
            LogHealth::Unreachable
        } else {
            LogHealth::Reachable
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use sucursal_core::{ChangeAction, ChangePayload, Product};

    fn product_record(barcode: &str) -> ChangeRecord {
        ChangeRecord::new(
            ChangeAction::Upsert,
            "Norte",
            ChangePayload::Product(Product {
                codigo_barra: barcode.to_string(),
                nombre: "Yerba 1kg".to_string(),
                precio_cents: 1250,
                categoria: None,
                last_modified_ms: 1,
            }),
        )
    }

    #[tokio::test]
    async fn test_memory_log_keys_are_ordered() {
        let log = MemoryLog::new();

        let k1 = log.append(EntityStream::Products, &product_record("a")).await.unwrap();
        let k2 = log.append(EntityStream::Products, &product_record("b")).await.unwrap();
        let k3 = log.append(EntityStream::Products, &product_record("c")).await.unwrap();
        assert!(k1 < k2 && k2 < k3);

        let all = log.read_from(EntityStream::Products, None).await.unwrap();
        assert_eq!(all.keys().cloned().collect::<Vec<_>>(), vec![k1.clone(), k2.clone(), k3.clone()]);

        // Cursor reads are strictly-after.
        let rest = log.read_from(EntityStream::Products, Some(&k1)).await.unwrap();
        assert_eq!(rest.keys().cloned().collect::<Vec<_>>(), vec![k2, k3]);
    }

    #[tokio::test]
    async fn test_memory_log_offline() {
        let log = MemoryLog::new();
        log.set_offline(true);

        assert!(log.append(EntityStream::Sales, &product_record("a")).await.is_none());
        assert!(log.read_from(EntityStream::Sales, None).await.is_none());
        assert_eq!(log.health_check().await, LogHealth::Unreachable);

        log.set_offline(false);
        assert_eq!(log.health_check().await, LogHealth::Reachable);
    }

    #[tokio::test]
    async fn test_memory_log_clones_share_storage() {
        let log = MemoryLog::new();
        let other = log.clone();

        log.append(EntityStream::Suppliers, &product_record("a")).await;
        assert_eq!(other.len(EntityStream::Suppliers), 1);
    }

    #[tokio::test]
    async fn test_streams_are_isolated() {
        let log = MemoryLog::new();
        log.append(EntityStream::Products, &product_record("a")).await;

        assert!(log.is_empty(EntityStream::Sales));
        assert!(log.is_empty(EntityStream::Suppliers));
        assert_eq!(log.len(EntityStream::Products), 1);
    }
}
