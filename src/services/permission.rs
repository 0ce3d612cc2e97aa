//! Camera permission gate.
//!
//! Two-phase check: query the current authorization, request it if absent
//! (awaiting the user's answer where the platform prompts asynchronously),
//! then query again. A second refusal is a hard failure. Platforms without a
//! camera concept short-circuit to [`GateOutcome::Unavailable`].

use crate::session::SessionError;

/// Host platform family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// No camera concept at all
    Console,
    Desktop,
    Android,
    Ios,
}

impl Platform {
    pub fn is_mobile(self) -> bool {
        matches!(self, Platform::Android | Platform::Ios)
    }

    pub fn has_camera_concept(self) -> bool {
        !matches!(self, Platform::Console)
    }

    /// Platform of the running binary
    pub fn current() -> Self {
        if cfg!(target_os = "android") {
            Platform::Android
        } else if cfg!(target_os = "ios") {
            Platform::Ios
        } else {
            Platform::Desktop
        }
    }
}

/// Process-wide camera authorization, owned by the host
#[allow(async_fn_in_trait)]
pub trait CameraAuthority {
    fn platform(&self) -> Platform;

    fn is_authorized(&self) -> bool;

    /// Prompt the user. Resolves once the user has answered; hosts with a
    /// synchronous prompt resolve immediately.
    async fn request(&mut self);
}

/// Result of passing the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Granted,
    /// The platform has no camera; callers fall back to another text source
    Unavailable,
}

/// Run the two-phase permission check
pub async fn ensure_camera_access<A: CameraAuthority>(
    authority: &mut A,
) -> Result<GateOutcome, SessionError> {
    if !authority.platform().has_camera_concept() {
        tracing::debug!("Platform has no camera, permission gate unavailable");
        return Ok(GateOutcome::Unavailable);
    }

    if authority.is_authorized() {
        return Ok(GateOutcome::Granted);
    }

    tracing::info!("Camera not authorized, requesting permission");
    authority.request().await;

    if authority.is_authorized() {
        tracing::info!("Camera permission granted");
        Ok(GateOutcome::Granted)
    } else {
        tracing::warn!("Camera permission denied after request");
        Err(SessionError::PermissionDenied)
    }
}

/// Fixed authority for headless hosts, desktop binaries and tests
#[derive(Debug, Clone)]
pub struct StaticAuthority {
    platform: Platform,
    authorized: bool,
    grant_on_request: bool,
    requests: usize,
}

impl StaticAuthority {
    /// Already authorized
    pub fn granted(platform: Platform) -> Self {
        Self::new(platform, true, true)
    }

    pub fn new(platform: Platform, authorized: bool, grant_on_request: bool) -> Self {
        Self {
            platform,
            authorized,
            grant_on_request,
            requests: 0,
        }
    }

    /// Number of prompts shown so far
    pub fn requests(&self) -> usize {
        self.requests
    }
}

impl CameraAuthority for StaticAuthority {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn is_authorized(&self) -> bool {
        self.authorized
    }

    async fn request(&mut self) {
        self.requests += 1;
        tokio::task::yield_now().await;
        if self.grant_on_request {
            self.authorized = true;
        }
    }
}
