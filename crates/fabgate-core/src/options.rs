//! Per-invocation transaction options.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::ConfirmError;
use crate::event::ChaincodeEvent;
use crate::types::{ChaincodeSpec, LifecycleKind};

/// Private key/value data sent with a proposal but never written on-chain.
pub type TransientMap = BTreeMap<String, Bytes>;

/// Callback invoked once for a custom chaincode event subscription.
pub type EventCallback = Arc<dyn Fn(Result<ChaincodeEvent, ConfirmError>) + Send + Sync>;

/// A caller-supplied subscription to a named chaincode event.
#[derive(Clone)]
pub struct TxnCustomEvent {
    pub event_name: String,
    pub callback: EventCallback,
}

impl TxnCustomEvent {
    pub fn new<F>(event_name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(Result<ChaincodeEvent, ConfirmError>) + Send + Sync + 'static,
    {
        Self {
            event_name: event_name.into(),
            callback: Arc::new(callback),
        }
    }
}

impl fmt::Debug for TxnCustomEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxnCustomEvent")
            .field("event_name", &self.event_name)
            .finish_non_exhaustive()
    }
}

/// Which entry point a submission goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationKind {
    #[default]
    Submit,
    Instantiate,
    Upgrade,
}

impl OperationKind {
    /// The lifecycle kind for instantiate/upgrade, `None` for plain submits.
    pub fn lifecycle(&self) -> Option<LifecycleKind> {
        match self {
            OperationKind::Submit => None,
            OperationKind::Instantiate => Some(LifecycleKind::Instantiate),
            OperationKind::Upgrade => Some(LifecycleKind::Upgrade),
        }
    }
}

/// Options for a single transaction. Built fresh per transaction and
/// frozen once submission starts.
#[derive(Debug, Clone, Default)]
pub struct TxnOptions {
    pub custom_events: Vec<TxnCustomEvent>,
    pub transient_map: Option<TransientMap>,
    pub kind: OperationKind,
    /// Required for instantiate and upgrade.
    pub chaincode_spec: Option<ChaincodeSpec>,
}

impl TxnOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for an instantiate or upgrade submission.
    pub fn lifecycle(kind: OperationKind, spec: ChaincodeSpec) -> Self {
        Self {
            kind,
            chaincode_spec: Some(spec),
            ..Self::default()
        }
    }

    pub fn with_event<F>(mut self, event_name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(Result<ChaincodeEvent, ConfirmError>) + Send + Sync + 'static,
    {
        self.custom_events
            .push(TxnCustomEvent::new(event_name, callback));
        self
    }

    pub fn with_transient(mut self, transient: TransientMap) -> Self {
        self.transient_map = Some(transient);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChaincodeType;

    #[test]
    fn test_default_is_plain_submit() {
        let opts = TxnOptions::new();
        assert_eq!(opts.kind, OperationKind::Submit);
        assert!(opts.kind.lifecycle().is_none());
        assert!(opts.custom_events.is_empty());
    }

    #[test]
    fn test_lifecycle_options() {
        let opts = TxnOptions::lifecycle(
            OperationKind::Upgrade,
            ChaincodeSpec::new(ChaincodeType::Node, "2.0"),
        );
        assert_eq!(opts.kind.lifecycle(), Some(LifecycleKind::Upgrade));
        assert_eq!(opts.chaincode_spec.unwrap().version, "2.0");
    }

    #[test]
    fn test_with_event_records_name() {
        let opts = TxnOptions::new().with_event("carCreated", |_| {});
        assert_eq!(opts.custom_events.len(), 1);
        assert!(format!("{:?}", opts.custom_events[0]).contains("carCreated"));
    }
}
