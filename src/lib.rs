//! padlink: a polled/buffered gamepad backed by a UDP companion server.
//!
//! A separate process owns the physical pad and streams its state as
//! fixed-size datagrams. This crate binds to that pad, calibrates its axes,
//! turns raw samples into per-object input events and exposes the result
//! through the [`Device`] contract.
//!
//! ```no_run
//! use padlink::{BridgeConfig, DeviceManager};
//!
//! let mut manager = DeviceManager::new(BridgeConfig::default());
//! if manager.open_gamepad().is_ok() {
//!     manager.acquire_all();
//!     manager.poll();
//!     for event in manager.drain_events() {
//!         println!("{:?} = {}", event.object, event.value);
//!     }
//! }
//! ```

pub mod backends;
pub mod calibration;
pub mod config;
pub mod device;
pub mod differ;
pub mod error;
pub mod event;
pub mod manager;
pub mod metadata;
pub mod objects;
pub mod protocol;
pub mod session;
pub mod signal;
pub mod transport;

pub use calibration::{mul_div, scale_axis, ObjectProperties};
pub use config::BridgeConfig;
pub use device::*;
pub use differ::{JoyState, RawState, StateDiffer};
pub use error::*;
pub use event::*;
pub use manager::*;
pub use metadata::{DeviceCaps, DeviceInstance, DeviceType};
pub use objects::{Layout, ObjectDescriptor, ObjectFilter, ObjectId, ObjectKind, ObjectTypes};
pub use protocol::LayoutFlags;
pub use session::{Binding, GamepadId, SessionHandle};
pub use signal::WaitHandle;
pub use transport::{Transport, UdpTransport};

#[cfg(feature = "gamepad")]
pub use backends::gamepad::GamepadDevice;
