//! Audit entry format and hashing

use chrono::{DateTime, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use super::AuditError;

type HmacSha256 = Hmac<Sha256>;

/// `prev_hash` of the first entry in every chain: 64 '0' characters.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Planning decisions and telemetry events recorded in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditAction {
    RouteComputed,
    TelemetryRecorded,
    ReplanTriggered,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::RouteComputed => "RouteComputed",
            AuditAction::TelemetryRecorded => "TelemetryRecorded",
            AuditAction::ReplanTriggered => "ReplanTriggered",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One link of a route's audit chain.
///
/// - `payload_hash = SHA-256(payload)`
/// - `hash = SHA-256(action || payload || timestamp || prev_hash)`
/// - `signature = HMAC-SHA256(key, hash)`
///
/// All digests are lowercase hex. The timestamp is hashed in RFC 3339 form
/// with nanosecond precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the chain, starting at 0
    pub id: u64,
    pub action: AuditAction,
    /// Canonical JSON (object keys sorted)
    pub payload: String,
    pub payload_hash: String,
    pub timestamp: DateTime<Utc>,
    pub prev_hash: String,
    pub hash: String,
    pub signature: String,
}

impl AuditEntry {
    /// Build and sign the entry that follows `prev_hash`.
    pub fn seal(
        id: u64,
        action: AuditAction,
        payload: String,
        timestamp: DateTime<Utc>,
        prev_hash: &str,
        key: &[u8],
    ) -> Result<Self, AuditError> {
        let payload_hash = sha256_hex(payload.as_bytes());
        let hash = entry_hash(action, &payload, timestamp, prev_hash);
        let signature = sign(key, &hash)?;
        Ok(Self {
            id,
            action,
            payload,
            payload_hash,
            timestamp,
            prev_hash: prev_hash.to_string(),
            hash,
            signature,
        })
    }

    /// Parse the payload back into JSON.
    pub fn payload_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.payload)
    }
}

/// Canonical JSON for a payload: serde_json's default map keeps keys sorted.
pub fn canonical_json<T: Serialize + ?Sized>(payload: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(payload)?;
    serde_json::to_string(&value)
}

pub fn canonical_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

pub fn entry_hash(action: AuditAction, payload: &str, timestamp: DateTime<Utc>, prev_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(action.as_str().as_bytes());
    hasher.update(payload.as_bytes());
    hasher.update(canonical_timestamp(timestamp).as_bytes());
    hasher.update(prev_hash.as_bytes());
    hex::encode(hasher.finalize())
}

fn mac(key: &[u8]) -> Result<HmacSha256, AuditError> {
    HmacSha256::new_from_slice(key).map_err(|e| AuditError::Key(e.to_string()))
}

pub fn sign(key: &[u8], hash: &str) -> Result<String, AuditError> {
    let mut mac = mac(key)?;
    mac.update(hash.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time signature check.
pub fn signature_valid(key: &[u8], hash: &str, signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = mac(key) else {
        return false;
    };
    mac.update(hash.as_bytes());
    mac.verify_slice(&expected).is_ok()
}
