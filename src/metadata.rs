//! Device instance metadata.
//!
//! [`DeviceInstance`] is what discovery hands back: a lightweight, cloneable
//! description suitable for UI display, logging and persistence. It is also
//! the source of the string/identity properties a device answers.
//!
//! # Conventions
//! - `product_name` and `instance_name` are both the name the companion server
//!   reports for the pad.
//! - `vid`/`pid` identify the pad as a common Xinput-compatible controller,
//!   since consumers key behavior off that pair.
//! - `path` is opaque and stable; treat it as diagnostic first, identity second.

use crate::objects::{USAGE_GAMEPAD, USAGE_PAGE_GENERIC};
use serde::{Deserialize, Serialize};

pub const VENDOR_ID: u16 = 0x045e;
pub const PRODUCT_ID: u16 = 0x028e;
pub const DEVICE_PATH: &str = "virtual#vid_045e&pid_028e&ig_00";

/// First legacy API version that knows about the gamepad device type.
pub const VERSION_GAMEPAD_TYPES: u32 = 0x0800;

/// Coarse device classification reported to consumers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceType {
    /// Hosts speaking version 0x0800 or later.
    Gamepad,
    /// Older hosts: a joystick with a gamepad sub-type.
    JoystickGamepad,
}

impl DeviceType {
    pub fn for_version(version: u32) -> Self {
        if version >= VERSION_GAMEPAD_TYPES {
            DeviceType::Gamepad
        } else {
            DeviceType::JoystickGamepad
        }
    }
}

/// Snapshot of everything discovery knows about a pad.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInstance {
    pub product_name: String,
    pub instance_name: String,
    pub vid: u16,
    pub pid: u16,
    pub device_type: DeviceType,
    pub usage_page: u16,
    pub usage: u16,
    pub path: String,
}

impl DeviceInstance {
    pub fn gamepad(name: &str, version: u32) -> Self {
        Self {
            product_name: name.to_string(),
            instance_name: name.to_string(),
            vid: VENDOR_ID,
            pid: PRODUCT_ID,
            device_type: DeviceType::for_version(version),
            usage_page: USAGE_PAGE_GENERIC,
            usage: USAGE_GAMEPAD,
            path: DEVICE_PATH.to_string(),
        }
    }

    /// Vendor in the low word, product in the high word.
    pub fn vid_pid(&self) -> u32 {
        (self.pid as u32) << 16 | self.vid as u32
    }
}

/// Static capabilities of a device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCaps {
    pub axes: usize,
    pub buttons: usize,
    pub povs: usize,
    pub firmware_revision: u32,
    pub hardware_revision: u32,
    pub cooperative: CooperativeLevel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CooperativeLevel {
    NonExclusiveBackground,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gamepad_instance() {
        let inst = DeviceInstance::gamepad("Pad7", 0x0800);
        assert_eq!(inst.product_name, "Pad7");
        assert_eq!(inst.instance_name, "Pad7");
        assert_eq!(inst.device_type, DeviceType::Gamepad);
        assert_eq!(inst.vid_pid(), 0x028e_045e);
        assert_eq!(inst.usage_page, 0x01);
        assert_eq!(inst.usage, 0x05);
    }

    #[test]
    fn old_hosts_see_a_joystick() {
        assert_eq!(DeviceType::for_version(0x0700), DeviceType::JoystickGamepad);
        assert_eq!(DeviceType::for_version(0x0800), DeviceType::Gamepad);
    }
}
