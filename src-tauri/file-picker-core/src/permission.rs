//! Permission gate: query, and on refusal ask the OS and wait for the answer event.

use serde::{Deserialize, Serialize};

use crate::event::RequestCode;
use crate::host::Host;
use crate::Result;

/// Owned by the OS; only ever queried, never cached here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionState {
    Granted,
    Denied,
}

impl PermissionState {
    pub fn from_granted(granted: bool) -> Self {
        if granted {
            Self::Granted
        } else {
            Self::Denied
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Granted,
    /// A prompt tagged with the request code is showing; continue on its result event.
    RequestIssued,
}

pub fn ensure<H: Host + ?Sized>(host: &H, permission: &str, code: RequestCode) -> Result<GateDecision> {
    tracing::debug!(permission, %code, "checking permission");
    if host.check_permission(permission) == PermissionState::Granted {
        return Ok(GateDecision::Granted);
    }
    tracing::info!(permission, %code, "requesting permission");
    host.request_permission(permission, code)?;
    Ok(GateDecision::RequestIssued)
}

/// Only the first grant entry counts; one permission is ever requested.
#[inline]
pub fn is_granted(grants: &[PermissionState]) -> bool {
    grants.first() == Some(&PermissionState::Granted)
}
