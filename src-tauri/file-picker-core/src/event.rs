//! OS callbacks translated into events for the selection state machine.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::permission::PermissionState;
use crate::resolver::ResourceHandle;

/// Correlates an OS callback with the request that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestCode(pub i32);

impl fmt::Display for RequestCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Android activity result codes.
pub const RESULT_OK: i32 = -1;
pub const RESULT_CANCELED: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityStatus {
    Ok,
    Canceled,
    Other(i32),
}

impl ActivityStatus {
    pub fn from_code(code: i32) -> Self {
        match code {
            RESULT_OK => Self::Ok,
            RESULT_CANCELED => Self::Canceled,
            other => Self::Other(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    PermissionResult {
        request_code: RequestCode,
        grants: Vec<PermissionState>,
    },
    ActivityResult {
        request_code: RequestCode,
        status: ActivityStatus,
        data: Option<ResourceHandle>,
    },
    /// The host could not finish the prompt or picker it started.
    Failure {
        request_code: RequestCode,
        reason: String,
    },
}

impl PlatformEvent {
    pub fn request_code(&self) -> RequestCode {
        match self {
            Self::PermissionResult { request_code, .. }
            | Self::ActivityResult { request_code, .. }
            | Self::Failure { request_code, .. } => *request_code,
        }
    }
}

/// Sending half handed to hosts. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PlatformEvents(mpsc::UnboundedSender<PlatformEvent>);

/// Receiving half consumed by [`crate::EventDriver`].
#[derive(Debug)]
pub struct EventInbox(pub(crate) mpsc::UnboundedReceiver<PlatformEvent>);

pub fn platform_channel() -> (PlatformEvents, EventInbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (PlatformEvents(tx), EventInbox(rx))
}

impl PlatformEvents {
    /// Returns `false` once the driver has shut down.
    pub fn send(&self, event: PlatformEvent) -> bool {
        let code = event.request_code();
        match self.0.send(event) {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(%code, "event driver gone, dropping platform event");
                false
            }
        }
    }

    pub fn permission_result(&self, request_code: RequestCode, grants: Vec<PermissionState>) -> bool {
        self.send(PlatformEvent::PermissionResult { request_code, grants })
    }

    pub fn activity_result(
        &self,
        request_code: RequestCode,
        status: ActivityStatus,
        data: Option<ResourceHandle>,
    ) -> bool {
        self.send(PlatformEvent::ActivityResult {
            request_code,
            status,
            data,
        })
    }

    pub fn failure(&self, request_code: RequestCode, reason: impl Into<String>) -> bool {
        self.send(PlatformEvent::Failure {
            request_code,
            reason: reason.into(),
        })
    }
}
