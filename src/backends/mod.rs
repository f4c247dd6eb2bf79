//! Input backends for `padlink`.
//!
//! Implementations of [`Device`](crate::device::Device) for concrete input
//! sources.
//!
//! # Feature flags
//! - **`gamepad`**: the UDP companion-server gamepad (default).
//!
//! padlink reads a pad that some other process owns; it never creates one.

use crate::metadata::DeviceInstance;
use crate::session::SessionHandle;

#[cfg(feature = "gamepad")]
#[cfg_attr(docsrs, doc(cfg(feature = "gamepad")))]
pub mod gamepad;

/// Unified discovery across enabled backends.
///
/// The companion server exposes at most one pad, so this yields zero or one
/// instance.
pub fn probe_devices(session: &SessionHandle, version: u32) -> Vec<DeviceInstance> {
    let mut out = Vec::new();

    #[cfg(feature = "gamepad")]
    {
        if let Ok(instance) = gamepad::discover(session, version) {
            out.push(instance);
        }
    }
    #[cfg(not(feature = "gamepad"))]
    let _ = (session, version);

    out
}
