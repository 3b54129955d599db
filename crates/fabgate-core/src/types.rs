//! Strong type definitions for the fabgate core.
//!
//! Identifiers are newtypes so a transaction id can never be confused with
//! a chaincode id or a peer address.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of the random nonce mixed into every generated transaction id.
pub const NONCE_LEN: usize = 24;

/// Identifier correlating a proposal, its commit events and the orderer
/// submission.
///
/// One `TransactionId` is minted per logical invocation and never reused.
/// Generated ids are `hex(blake3(nonce || creator))`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TransactionId {
    value: String,
    nonce: Vec<u8>,
    admin: bool,
}

impl TransactionId {
    /// Mint a fresh id for the given creator identity bytes.
    pub fn generate(creator: &[u8], admin: bool) -> Self {
        use rand::RngCore;
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        Self::from_parts(&nonce, creator, admin)
    }

    /// Derive an id from an explicit nonce. Deterministic.
    pub fn from_parts(nonce: &[u8], creator: &[u8], admin: bool) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(nonce);
        hasher.update(creator);
        Self {
            value: hex::encode(hasher.finalize().as_bytes()),
            nonce: nonce.to_vec(),
            admin,
        }
    }

    /// Wrap an id minted elsewhere (e.g. by the network client).
    pub fn from_value(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            nonce: Vec::new(),
            admin: false,
        }
    }

    /// The canonical string form.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    /// Whether this id was minted with the admin identity.
    pub fn is_admin(&self) -> bool {
        self.admin
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self.value.get(..16).unwrap_or(&self.value);
        write!(f, "TransactionId({short})")
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Chaincode implementation language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChaincodeType {
    Golang,
    Car,
    Java,
    Node,
}

impl ChaincodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChaincodeType::Golang => "golang",
            ChaincodeType::Car => "car",
            ChaincodeType::Java => "java",
            ChaincodeType::Node => "node",
        }
    }
}

impl fmt::Display for ChaincodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of the chaincode bytes handed to install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadType {
    /// Gzip tarball of source; packaged locally before install.
    Archive,
    /// Already a deployable package; installed as-is.
    Cds,
}

/// Lifecycle operations that reuse the endorsement path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleKind {
    Install,
    Instantiate,
    Upgrade,
}

impl fmt::Display for LifecycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleKind::Install => "install",
            LifecycleKind::Instantiate => "instantiate",
            LifecycleKind::Upgrade => "upgrade",
        };
        f.write_str(s)
    }
}

/// Chaincode metadata required by lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeSpec {
    pub language: ChaincodeType,
    pub version: String,
    #[serde(default)]
    pub upload_type: Option<UploadType>,
}

impl ChaincodeSpec {
    pub fn new(language: ChaincodeType, version: impl Into<String>) -> Self {
        Self {
            language,
            version: version.into(),
            upload_type: None,
        }
    }

    pub fn with_upload_type(mut self, upload_type: UploadType) -> Self {
        self.upload_type = Some(upload_type);
        self
    }
}

/// Validate a transaction (chaincode function) name: only non-empty names
/// are accepted.
pub fn validate_transaction_name(name: &str) -> crate::error::Result<()> {
    if name.is_empty() {
        tracing::error!("transaction name must be a non-empty string");
        return Err(crate::error::ValidationError::InvalidTransactionName(
            name.to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_id_deterministic_from_parts() {
        let a = TransactionId::from_parts(&[7u8; NONCE_LEN], b"creator", false);
        let b = TransactionId::from_parts(&[7u8; NONCE_LEN], b"creator", false);
        assert_eq!(a, b);
        assert_eq!(a.value().len(), 64);
    }

    #[test]
    fn test_generated_ids_differ() {
        let a = TransactionId::generate(b"creator", false);
        let b = TransactionId::generate(b"creator", false);
        assert_ne!(a.value(), b.value());
        assert_eq!(a.nonce().len(), NONCE_LEN);
    }

    #[test]
    fn test_transaction_id_debug_is_short() {
        let id = TransactionId::from_parts(&[1u8; NONCE_LEN], b"x", true);
        let debug = format!("{:?}", id);
        assert!(debug.starts_with("TransactionId("));
        assert!(debug.len() < 40);
        assert!(id.is_admin());
    }

    #[test]
    fn test_transaction_name_validation() {
        assert!(validate_transaction_name("createCar").is_ok());
        assert!(validate_transaction_name("").is_err());
    }

    #[test]
    fn test_chaincode_spec_deserialize() {
        let spec: ChaincodeSpec =
            serde_json::from_str(r#"{"language":"golang","version":"1.0","upload_type":"cds"}"#)
                .unwrap();
        assert_eq!(spec.language, ChaincodeType::Golang);
        assert_eq!(spec.upload_type, Some(UploadType::Cds));
    }
}
