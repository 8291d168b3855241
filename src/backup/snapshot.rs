//! Snapshot documents and the builder that captures them
//!
//! A snapshot holds the raw value of every registered domain key at one
//! instant. Collection domains (lists and maps) are stored parsed; text
//! domains and anything that fails to parse are kept as the raw string so a
//! restore writes back exactly what was captured.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{VaultError, VaultResult};
use crate::storage::KeyValueStore;

use super::codec;

/// Current snapshot schema version
pub const SCHEMA_VERSION: &str = "2.0";

/// Domain key to captured value
pub type Domains = BTreeMap<String, Value>;

/// Shape of the value stored under a domain key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainShape {
    /// A JSON array of records
    List,
    /// A JSON object
    Map,
    /// Free text, never parsed
    Text,
}

/// One logical data category included in every snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainKey {
    pub key: &'static str,
    pub shape: DomainShape,
}

impl DomainKey {
    pub const fn new(key: &'static str, shape: DomainShape) -> Self {
        Self { key, shape }
    }

    /// Value captured when the key is absent from the store
    ///
    /// Text domains have no empty form and are left out of the snapshot.
    fn empty_value(&self) -> Option<Value> {
        match self.shape {
            DomainShape::List => Some(Value::Array(Vec::new())),
            DomainShape::Map => Some(Value::Object(Map::new())),
            DomainShape::Text => None,
        }
    }

    fn capture(&self, raw: String) -> Value {
        if self.shape == DomainShape::Text {
            return Value::String(raw);
        }

        match serde_json::from_str::<Value>(&raw) {
            Ok(value @ (Value::Array(_) | Value::Object(_))) => value,
            _ => {
                tracing::warn!(key = self.key, "Domain value is not a JSON collection, keeping raw text");
                Value::String(raw)
            }
        }
    }
}

/// Registry of domain keys captured by default
pub const DEFAULT_DOMAINS: &[DomainKey] = &[
    DomainKey::new("products", DomainShape::List),
    DomainKey::new("inventory", DomainShape::List),
    DomainKey::new("sales", DomainShape::List),
    DomainKey::new("customers", DomainShape::List),
    DomainKey::new("suppliers", DomainShape::List),
    DomainKey::new("purchaseOrders", DomainShape::List),
    DomainKey::new("invoices", DomainShape::List),
    DomainKey::new("notifications", DomainShape::List),
    DomainKey::new("settings", DomainShape::Map),
    DomainKey::new("language", DomainShape::Text),
];

/// Diagnostic metadata about the capturing client
///
/// Written for humans inspecting a backup; never read back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub session_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default)]
    pub platform: String,
}

impl Environment {
    /// Describe the current process
    pub fn current() -> Self {
        Self {
            client: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            session_id: Uuid::new_v4(),
            locale: std::env::var("LANG").ok().filter(|l| !l.is_empty()),
            platform: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
        }
    }
}

/// A versioned capture of every domain key
///
/// Exactly one of `domains` and `encoded_payload` is present, selected by
/// `encoded`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDocument {
    pub schema_version: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub created_at_millis: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domains: Option<Domains>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoded_payload: Option<String>,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub encoded: bool,
    #[serde(default)]
    pub environment: Environment,
}

impl SnapshotDocument {
    /// Create a plain (unencoded) document
    pub fn new(created_at: DateTime<Utc>, domains: Domains, environment: Environment) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            created_at,
            created_at_millis: created_at.timestamp_millis(),
            domains: Some(domains),
            encoded_payload: None,
            size_bytes: 0,
            encoded: false,
            environment,
        }
    }

    /// Serialized length of the document with `size_bytes` zeroed
    pub fn measure(&self) -> VaultResult<u64> {
        let mut probe = self.clone();
        probe.size_bytes = 0;
        Ok(serde_json::to_string(&probe)?.len() as u64)
    }

    /// Replace `domains` with the encoded payload
    pub fn encode_in_place(&mut self) -> VaultResult<()> {
        if self.encoded {
            return Ok(());
        }
        let domains = self.domains.take().unwrap_or_default();
        self.encoded_payload = Some(codec::encode_domains(&domains)?);
        self.encoded = true;
        Ok(())
    }

    /// The captured domains, decoding the payload if needed
    pub fn decoded_domains(&self) -> VaultResult<Domains> {
        if self.encoded {
            let payload = self
                .encoded_payload
                .as_deref()
                .ok_or_else(|| VaultError::CorruptPayload("Encoded payload is missing".into()))?;
            codec::decode_domains(payload)
        } else {
            self.domains
                .clone()
                .ok_or_else(|| VaultError::CorruptPayload("Domains are missing".into()))
        }
    }

    /// Check that the payload fields agree with the `encoded` flag
    ///
    /// Either form must carry at least one domain; an encoded payload is
    /// decoded to check.
    pub fn check_shape(&self) -> VaultResult<()> {
        match (self.encoded, &self.domains, &self.encoded_payload) {
            (true, None, Some(payload)) if !payload.is_empty() => {
                let domains = codec::decode_domains(payload).map_err(|e| {
                    VaultError::InvalidFormat(format!("Encoded payload cannot be decoded: {}", e))
                })?;
                if domains.is_empty() {
                    return Err(VaultError::InvalidFormat(
                        "Encoded payload holds no domains".into(),
                    ));
                }
                Ok(())
            }
            (false, Some(domains), None) if !domains.is_empty() => Ok(()),
            (true, _, _) => Err(VaultError::InvalidFormat(
                "Encoded snapshot must carry a non-empty encodedPayload and no domains".into(),
            )),
            (false, _, _) => Err(VaultError::InvalidFormat(
                "Snapshot must carry non-empty domains and no encodedPayload".into(),
            )),
        }
    }
}

/// Collects the registered domain keys into a snapshot document
pub struct SnapshotBuilder {
    domains: Vec<DomainKey>,
    environment: Environment,
}

impl SnapshotBuilder {
    /// Create a builder over the given domain registry
    pub fn new(domains: &[DomainKey], environment: Environment) -> Self {
        Self {
            domains: domains.to_vec(),
            environment,
        }
    }

    /// Builder over `DEFAULT_DOMAINS` describing the current process
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_DOMAINS, Environment::current())
    }

    /// The registered domain keys
    pub fn domain_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.domains.iter().map(|d| d.key)
    }

    /// Read every registered key; missing collections become empty ones
    pub fn capture_domains<S: KeyValueStore + ?Sized>(&self, store: &S) -> VaultResult<Domains> {
        let mut captured = Domains::new();

        for domain in &self.domains {
            let value = match store.get(domain.key)? {
                Some(raw) => Some(domain.capture(raw)),
                None => domain.empty_value(),
            };
            if let Some(value) = value {
                captured.insert(domain.key.to_string(), value);
            }
        }

        Ok(captured)
    }

    /// Capture the store into a sized, optionally encoded, document
    pub fn build<S: KeyValueStore + ?Sized>(
        &self,
        store: &S,
        created_at: DateTime<Utc>,
        encode: bool,
    ) -> VaultResult<SnapshotDocument> {
        let domains = self.capture_domains(store)?;
        let mut document = SnapshotDocument::new(created_at, domains, self.environment.clone());

        if encode {
            document.encode_in_place()?;
        }
        document.size_bytes = document.measure()?;

        tracing::debug!(
            size_bytes = document.size_bytes,
            encoded = document.encoded,
            "Built snapshot"
        );
        Ok(document)
    }
}
