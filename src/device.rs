//! The polled-device contract.
//!
//! Every backend exposes the same capability set: lifecycle
//! (`acquire`/`unacquire`), input (`read`), object enumeration and property
//! queries. Hosts drive devices from their own loop; nothing here spawns
//! threads.

use crate::calibration::ObjectProperties;
use crate::error::DeviceError;
use crate::event::EventSink;
use crate::metadata::{DeviceCaps, DeviceInstance};
use crate::objects::{ObjectDescriptor, ObjectFilter, ObjectTypes};
use std::ops::ControlFlow;

/// Where a device is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Closed,
    Bound,
    Acquired,
}

/// Queryable device properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    ProductName,
    InstanceName,
    VidPid,
    JoystickId,
    GuidAndPath,
    /// Buffered queue size; answered by the manager, not by devices.
    BufferSize,
}

/// Device class reported alongside the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Hid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Text(String),
    Dword(u32),
    Path { class: DeviceClass, path: String },
}

pub trait Device {
    fn name(&self) -> &str;

    /// Stable identifier, e.g. `"gamepad:7"`.
    fn id(&self) -> &str;

    fn instance(&self) -> &DeviceInstance;

    fn caps(&self) -> DeviceCaps;

    fn state(&self) -> LifecycleState;

    fn acquire(&mut self) -> Result<(), DeviceError>;

    fn unacquire(&mut self) -> Result<(), DeviceError>;

    /// Poll once and push resulting events into `sink`. Returns how many were pushed.
    ///
    /// "Nothing new" (including timeouts and foreign traffic) is `Ok(0)`.
    fn read(&mut self, sink: &mut dyn EventSink) -> Result<usize, DeviceError>;

    /// Object table of the active layout, in index order.
    fn objects(&self) -> &'static [ObjectDescriptor];

    /// Filtered walk over [`objects`](Device::objects); see
    /// [`enumerate_objects`](crate::objects::enumerate_objects).
    fn enumerate_objects(
        &self,
        filter: ObjectFilter,
        types: ObjectTypes,
        f: &mut dyn FnMut(usize, &ObjectDescriptor) -> ControlFlow<()>,
    ) -> ControlFlow<()>;

    /// Calibration record of the object at `index`, if it has one.
    fn object_properties(&self, index: usize) -> Option<&ObjectProperties>;

    fn get_property(&self, property: Property) -> Result<PropertyValue, DeviceError>;
}
