//! Audit Chain
//!
//! Tamper-evident, append-only log of every planning decision and telemetry
//! event, one chain per route id. Each entry hashes its predecessor and is
//! signed with HMAC-SHA256, so editing, dropping or reordering any entry is
//! detected by [`verify`].
//!
//! - `entry` - entry format, canonical payloads, hashing and signing
//! - `secret` - `SecretProvider` trait with static and environment keys
//! - `clock` - `Clock` trait for entry timestamps

pub mod clock;
mod entry;
pub mod secret;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{
    canonical_json, canonical_timestamp, entry_hash, sha256_hex, sign, signature_valid, AuditAction,
    AuditEntry, GENESIS_HASH,
};
pub use secret::{EnvSecret, SecretError, SecretProvider, StaticSecret};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

use crate::storage::{AuditStore, StoreError};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("failed to serialize audit payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to persist audit entry: {0}")]
    Store(#[from] StoreError),

    #[error("audit key unavailable: {0}")]
    Secret(#[from] SecretError),

    #[error("invalid audit key: {0}")]
    Key(String),
}

/// Why verification stopped at an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakReason {
    /// `id` does not match the entry's position
    Sequence,
    /// `prev_hash` does not match the previous entry's hash
    Linkage,
    PayloadHash,
    Hash,
    Signature,
}

impl fmt::Display for BreakReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakReason::Sequence => write!(f, "sequence number mismatch"),
            BreakReason::Linkage => write!(f, "previous-hash linkage mismatch"),
            BreakReason::PayloadHash => write!(f, "payload hash mismatch"),
            BreakReason::Hash => write!(f, "entry hash mismatch"),
            BreakReason::Signature => write!(f, "signature mismatch"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("audit chain broken at index {index}: {reason}")]
pub struct IntegrityError {
    pub index: usize,
    pub reason: BreakReason,
}

// ============================================================================
// Verification
// ============================================================================

/// Result of walking a chain from genesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainVerification {
    pub valid: bool,
    /// First index whose linkage, payload hash, hash or signature disagrees
    pub broken_at_index: Option<usize>,
    /// Entries examined, including the broken one
    pub entries_checked: usize,
    pub reason: Option<BreakReason>,
}

impl ChainVerification {
    pub fn into_result(self) -> Result<(), IntegrityError> {
        match (self.broken_at_index, self.reason) {
            (Some(index), Some(reason)) => Err(IntegrityError { index, reason }),
            (Some(index), None) => Err(IntegrityError {
                index,
                reason: BreakReason::Hash,
            }),
            _ => Ok(()),
        }
    }
}

/// Verify a chain snapshot against `key`.
///
/// An empty chain is valid. Checks run in order at each index: sequence,
/// linkage, payload hash, entry hash, signature.
pub fn verify(entries: &[AuditEntry], key: &[u8]) -> ChainVerification {
    let mut prev_hash = GENESIS_HASH;
    for (index, entry) in entries.iter().enumerate() {
        if let Some(reason) = check_entry(index, entry, prev_hash, key) {
            return ChainVerification {
                valid: false,
                broken_at_index: Some(index),
                entries_checked: index + 1,
                reason: Some(reason),
            };
        }
        prev_hash = &entry.hash;
    }
    ChainVerification {
        valid: true,
        broken_at_index: None,
        entries_checked: entries.len(),
        reason: None,
    }
}

fn check_entry(index: usize, entry: &AuditEntry, prev_hash: &str, key: &[u8]) -> Option<BreakReason> {
    if entry.id != index as u64 {
        return Some(BreakReason::Sequence);
    }
    if entry.prev_hash != prev_hash {
        return Some(BreakReason::Linkage);
    }
    if entry.payload_hash != sha256_hex(entry.payload.as_bytes()) {
        return Some(BreakReason::PayloadHash);
    }
    if entry.hash != entry_hash(entry.action, &entry.payload, entry.timestamp, &entry.prev_hash) {
        return Some(BreakReason::Hash);
    }
    if !signature_valid(key, &entry.hash, &entry.signature) {
        return Some(BreakReason::Signature);
    }
    None
}

// ============================================================================
// Chain
// ============================================================================

/// Append-only chain for one route id.
///
/// [`AuditChain::append`] is the only mutation. The entry is persisted
/// through the [`AuditStore`] before it becomes the tail, so a store
/// failure leaves the chain exactly as it was.
pub struct AuditChain {
    route_id: String,
    entries: Vec<AuditEntry>,
    store: Arc<dyn AuditStore>,
}

impl AuditChain {
    pub fn new(route_id: impl Into<String>, store: Arc<dyn AuditStore>) -> Self {
        Self {
            route_id: route_id.into(),
            entries: Vec::new(),
            store,
        }
    }

    /// Resume a chain previously written to `store`.
    pub fn restore(route_id: impl Into<String>, store: Arc<dyn AuditStore>) -> Result<Self, AuditError> {
        let route_id = route_id.into();
        let entries = store.load_chain(&route_id)?;
        debug!(route_id = %route_id, entries = entries.len(), "Restored audit chain");
        Ok(Self {
            route_id,
            entries,
            store,
        })
    }

    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tail(&self) -> Option<&AuditEntry> {
        self.entries.last()
    }

    /// Seal, persist and append a new entry.
    pub fn append<T: Serialize + ?Sized>(
        &mut self,
        action: AuditAction,
        payload: &T,
        timestamp: DateTime<Utc>,
        key: &[u8],
    ) -> Result<AuditEntry, AuditError> {
        let payload = canonical_json(payload)?;
        let prev_hash = self.tail().map_or(GENESIS_HASH, |e| e.hash.as_str());
        let entry = AuditEntry::seal(self.entries.len() as u64, action, payload, timestamp, prev_hash, key)?;

        if let Err(e) = self.store.persist(&self.route_id, &entry) {
            error!(route_id = %self.route_id, action = %action, error = %e, "Failed to persist audit entry");
            return Err(e.into());
        }

        debug!(route_id = %self.route_id, id = entry.id, action = %action, "Audit entry appended");
        self.entries.push(entry.clone());
        Ok(entry)
    }

    pub fn verify(&self, key: &[u8]) -> ChainVerification {
        verify(&self.entries, key)
    }
}

impl fmt::Debug for AuditChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditChain")
            .field("route_id", &self.route_id)
            .field("entries", &self.entries.len())
            .field("store", &self.store.backend_name())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryAuditStore;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    const KEY: &[u8] = b"unit-test-audit-key";

    fn t(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn chain_of(n: usize) -> AuditChain {
        let mut chain = AuditChain::new("r1", Arc::new(InMemoryAuditStore::new()));
        for i in 0..n {
            chain
                .append(AuditAction::TelemetryRecorded, &json!({"seq": i, "wave": 2.5}), t(i as i64), KEY)
                .unwrap();
        }
        chain
    }

    /// Store that refuses every write.
    struct FailingStore;

    impl AuditStore for FailingStore {
        fn persist(&self, _route_id: &str, _entry: &AuditEntry) -> Result<(), StoreError> {
            Err(StoreError::Storage("disk full".into()))
        }

        fn load_chain(&self, _route_id: &str) -> Result<Vec<AuditEntry>, StoreError> {
            Ok(Vec::new())
        }

        fn route_ids(&self) -> Result<Vec<String>, StoreError> {
            Ok(Vec::new())
        }

        fn backend_name(&self) -> &'static str {
            "Failing"
        }
    }

    #[test]
    fn empty_chain_is_valid() {
        let v = verify(&[], KEY);
        assert!(v.valid);
        assert_eq!(v.entries_checked, 0);
        assert!(v.into_result().is_ok());
    }

    #[test]
    fn appended_chain_verifies() {
        let chain = chain_of(5);
        assert_eq!(chain.entries()[0].prev_hash, GENESIS_HASH);
        for pair in chain.entries().windows(2) {
            assert_eq!(pair[1].prev_hash, pair[0].hash);
        }
        let v = chain.verify(KEY);
        assert!(v.valid);
        assert_eq!(v.entries_checked, 5);
    }

    #[test]
    fn wrong_key_fails_at_first_entry() {
        let v = chain_of(3).verify(b"some-other-key");
        assert_eq!(v.broken_at_index, Some(0));
        assert_eq!(v.reason, Some(BreakReason::Signature));
    }

    #[test]
    fn tampering_is_located() {
        type Tamper = fn(&mut AuditEntry);
        let cases: [(Tamper, BreakReason); 4] = [
            (|e| e.payload = r#"{"seq":99}"#.to_string(), BreakReason::PayloadHash),
            (|e| e.hash = "f".repeat(64), BreakReason::Hash),
            (|e| e.prev_hash = "a".repeat(64), BreakReason::Linkage),
            (|e| e.signature = "0".repeat(64), BreakReason::Signature),
        ];
        for k in 0..4 {
            for (tamper, reason) in &cases {
                let mut entries = chain_of(4).entries().to_vec();
                tamper(&mut entries[k]);
                let v = verify(&entries, KEY);
                assert!(!v.valid);
                assert_eq!(v.broken_at_index, Some(k), "tamper {reason:?} at {k}");
                assert_eq!(v.reason, Some(*reason));
                assert_eq!(
                    v.into_result(),
                    Err(IntegrityError { index: k, reason: *reason })
                );
            }
        }
    }

    #[test]
    fn sub_microsecond_timestamp_edit_is_detected() {
        let mut chain = AuditChain::new("r1", Arc::new(InMemoryAuditStore::new()));
        let ts = t(0) + Duration::nanoseconds(1_000_501);
        chain
            .append(AuditAction::TelemetryRecorded, &json!({"seq": 0}), ts, KEY)
            .unwrap();

        // Survives the stored JSON form
        let stored: AuditEntry = serde_json::from_str(&serde_json::to_string(&chain.entries()[0]).unwrap()).unwrap();
        assert!(verify(std::slice::from_ref(&stored), KEY).valid);

        let mut edited = stored;
        edited.timestamp = edited.timestamp + Duration::nanoseconds(1);
        let v = verify(&[edited], KEY);
        assert_eq!(v.broken_at_index, Some(0));
        assert_eq!(v.reason, Some(BreakReason::Hash));
    }

    #[test]
    fn resealed_entry_breaks_the_next_link() {
        // Rewriting an entry consistently (payload, hashes, signature) still
        // breaks the successor's linkage
        let mut entries = chain_of(4).entries().to_vec();
        let forged = AuditEntry::seal(
            1,
            entries[1].action,
            r#"{"seq":1,"wave":9.9}"#.to_string(),
            entries[1].timestamp,
            &entries[1].prev_hash,
            KEY,
        )
        .unwrap();
        entries[1] = forged;
        let v = verify(&entries, KEY);
        assert_eq!(v.broken_at_index, Some(2));
        assert_eq!(v.reason, Some(BreakReason::Linkage));
    }

    #[test]
    fn dropped_entry_is_detected() {
        let mut entries = chain_of(4).entries().to_vec();
        entries.remove(1);
        let v = verify(&entries, KEY);
        assert_eq!(v.broken_at_index, Some(1));
        assert_eq!(v.reason, Some(BreakReason::Sequence));
    }

    #[test]
    fn store_failure_leaves_chain_unchanged() {
        let mut chain = AuditChain::new("r1", Arc::new(FailingStore));
        let err = chain
            .append(AuditAction::RouteComputed, &json!({"a": 1}), t(0), KEY)
            .unwrap_err();
        assert!(matches!(err, AuditError::Store(_)));
        assert!(chain.is_empty());
    }

    #[test]
    fn restore_resumes_from_store() {
        let store: Arc<dyn AuditStore> = Arc::new(InMemoryAuditStore::new());
        let mut chain = AuditChain::new("r1", store.clone());
        chain.append(AuditAction::RouteComputed, &json!({"rev": 1}), t(0), KEY).unwrap();

        let mut resumed = AuditChain::restore("r1", store).unwrap();
        assert_eq!(resumed.len(), 1);
        resumed.append(AuditAction::TelemetryRecorded, &json!({"rev": 1}), t(1), KEY).unwrap();
        assert!(resumed.verify(KEY).valid);
    }
}
