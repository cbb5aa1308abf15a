//! Explicit session gate for report evaluation.

use tracing::debug;

use crate::config::AccessConfig;
use crate::error::{DispatchError, Result};

/// Whether the caller of a report has been let in.
///
/// A session is a plain value created per caller (one CLI invocation or one
/// HTTP request) and passed into [`crate::report::DashboardReport::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Session {
    authenticated: bool,
}

impl Session {
    /// Session for a deployment without a password.
    pub fn open() -> Self {
        Self { authenticated: true }
    }

    pub fn denied() -> Self {
        Self::default()
    }

    /// Checks the supplied password against the access configuration.
    ///
    /// Access is open when no password is configured.
    pub fn authenticate(access: &AccessConfig, supplied: Option<&str>) -> Self {
        let authenticated = match access.password.as_deref() {
            None => true,
            Some(expected) => supplied == Some(expected),
        };
        debug!(authenticated, "session created");
        Self { authenticated }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// # Errors
    ///
    /// Returns `AccessDenied` for an unauthenticated session.
    pub fn require(&self) -> Result<()> {
        if self.authenticated {
            Ok(())
        } else {
            Err(DispatchError::AccessDenied)
        }
    }
}
