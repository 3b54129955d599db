//! Event registrations handed out by an [`EventStream`](crate::EventStream).
//!
//! A registration resolves at most once: the stream holds the sending half
//! of a oneshot channel and the client awaits the receiving half.

use tokio::sync::oneshot;

use crate::error::{ChannelError, Result};

/// Identifier of one registration on one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(pub u64);

/// What the stream should do once the registration has delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationOptions {
    /// Drop the registration after its first delivery.
    pub unregister: bool,
    /// Disconnect the stream after the first delivery.
    pub disconnect: bool,
}

impl Default for RegistrationOptions {
    fn default() -> Self {
        Self {
            unregister: true,
            disconnect: true,
        }
    }
}

impl RegistrationOptions {
    /// Unregister on delivery but keep the stream connected for other
    /// registrations.
    pub fn keep_connected() -> Self {
        Self {
            unregister: true,
            disconnect: false,
        }
    }
}

/// Stream-side half of a registration.
pub type Delivery<T> = oneshot::Sender<Result<T>>;

/// Client-side half of a registration.
#[derive(Debug)]
pub struct Registration<T> {
    id: RegistrationId,
    receiver: oneshot::Receiver<Result<T>>,
}

impl<T> Registration<T> {
    /// Create a linked delivery/registration pair.
    pub fn pair(id: RegistrationId) -> (Delivery<T>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { id, receiver: rx })
    }

    pub fn id(&self) -> RegistrationId {
        self.id
    }

    /// Wait for the stream to deliver.
    ///
    /// A stream that drops the delivery half without sending yields
    /// [`ChannelError::StreamClosed`].
    pub async fn delivered(self) -> Result<T> {
        match self.receiver.await {
            Ok(result) => result,
            Err(_) => Err(ChannelError::StreamClosed(format!(
                "registration {} dropped without delivery",
                self.id.0
            ))),
        }
    }
}
