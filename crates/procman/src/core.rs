//! Core identifier types used throughout the crate.
//!
//! Every tracked process carries two identities: the OS process id ([`Pid`]),
//! which is what clients see on the wire, and an internal monotonic run id
//! ([`RunId`]) allocated at registration time. OS pids can be reused by the
//! kernel after a process exits, so all internal bookkeeping keys off the
//! `RunId`; a raw `Pid` is only safe as a short-lived external name.

use std::fmt;

/// OS process id as reported by the spawning service.
///
/// A `Pid` is unique among *currently registered* processes but may be
/// recycled by the OS once a process exits. Do not hold one across an exit
/// boundary; use [`RunId`] for long-term identity.
///
/// # Examples
///
/// ```rust
/// use procman::core::Pid;
///
/// let pid = Pid::new(4242);
/// assert_eq!(pid.as_u32(), 4242);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Pid(u32);

impl Pid {
    /// Create a pid from a raw OS process id.
    #[inline]
    pub fn new(pid: u32) -> Self {
        Self(pid)
    }

    /// Get the raw OS process id.
    #[inline]
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Pid {
    fn from(pid: u32) -> Self {
        Self(pid)
    }
}

/// Internal monotonic logical id for a registered process.
///
/// Allocated by the registry when a spawn succeeds and never reused for the
/// lifetime of the registry, unlike OS pids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct RunId(u64);

impl RunId {
    /// Create a run id from a raw value.
    #[inline]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw value.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Newtype wrapper for workspace session ids.
///
/// Each session owns an independent process registry; the id appears in log
/// output so concurrent sessions can be told apart.
///
/// # Examples
///
/// ```rust
/// use procman::core::SessionId;
///
/// let id = SessionId::new("workspace-1");
/// assert_eq!(id.as_str(), "workspace-1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Create a new session id.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new random session id.
    ///
    /// Uses UUID v4 format for globally unique identifiers.
    #[inline]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the session id as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert into the inner string.
    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
