//! Gamepad exposed by the UDP companion server.
//!
//! [`GamepadDevice`] is a [`Device`] whose input arrives as periodic state
//! reports from an out-of-process server (see [`protocol`](crate::protocol)).
//!
//! # Lifecycle
//! ```text
//! create ──► Bound ──acquire──► Acquired ──unacquire──► Bound ──close──► Closed
//! ```
//! - `create` resolves the pad once without asking for reports, so a device
//!   only exists while a pad does.
//! - `acquire` asks again with notification on; the server then streams
//!   state reports to our socket.
//! - `read` consumes at most one datagram per call and never fails for lack
//!   of data.
//! - `unacquire` releases the pad and tears the socket down; a later
//!   `acquire` reopens it.
//!
//! Nothing is retried automatically; hosts call `acquire` again when it
//! reports [`DeviceError::NotFound`].
//!
//! # Channel conventions
//! Objects and values follow the active [`Layout`]:
//! - axes are calibrated with [`scale_axis`](crate::calibration::scale_axis)
//!   using per-object [`ObjectProperties`];
//! - buttons report `0x80`/`0x00`;
//! - the hat reports `-1` or hundredths of a degree.

use crate::calibration::ObjectProperties;
use crate::device::{Device, DeviceClass, LifecycleState, Property, PropertyValue};
use crate::differ::{JoyState, RawState, StateDiffer};
use crate::error::{DeviceError, TransportError};
use crate::event::EventSink;
use crate::metadata::{CooperativeLevel, DeviceCaps, DeviceInstance};
use crate::objects::{self, Layout, ObjectDescriptor, ObjectFilter, ObjectKind, ObjectTypes};
use crate::protocol::{Datagram, StateReport, DATAGRAM_LEN};
use crate::session::{Binding, SessionHandle};
use crate::signal::WaitHandle;
use std::ops::ControlFlow;
use tracing::{debug, info, trace, warn};

const FIRMWARE_REVISION: u32 = 100;
const HARDWARE_REVISION: u32 = 100;

/// Probe the server for a pad without binding it for input.
///
/// (Re)opens the session's transport and asks for the pad with notification
/// off. Any failure means there is nothing to enumerate.
pub fn discover(session: &SessionHandle, version: u32) -> Result<DeviceInstance, DeviceError> {
    let mut ctx = session.lock();
    if let Err(err) = ctx.open() {
        warn!(%err, "cannot open transport for discovery");
        return Err(DeviceError::NotFound);
    }
    match ctx.acquire(false, true) {
        Ok(binding) => {
            let name = binding.name.unwrap_or_default();
            debug!(id = %binding.id, name = %name, "gamepad discovered");
            Ok(DeviceInstance::gamepad(&name, version))
        }
        Err(err) => {
            debug!(%err, "no gamepad to discover");
            Err(DeviceError::NotFound)
        }
    }
}

pub struct GamepadDevice {
    session: SessionHandle,
    /// Cached `gamepad:{id}` used as the device id.
    id: String,
    instance: DeviceInstance,
    /// Layout of the current binding; set on every successful acquire.
    layout: Layout,
    /// Calibration per object index; `None` for buttons and the hat.
    properties: Vec<Option<ObjectProperties>>,
    differ: StateDiffer,
    lifecycle: LifecycleState,
    /// Set once acquisition finished; `unacquire` waits on it.
    read_event: Option<WaitHandle>,
    /// Host handle signaled once per sample that produced events.
    notify: Option<WaitHandle>,
}

impl GamepadDevice {
    /// Resolve the pad and build a bound (not yet acquired) device.
    pub fn create(session: SessionHandle, version: u32) -> Result<Self, DeviceError> {
        let instance = discover(&session, version)?;
        let binding = session.lock().binding().cloned().ok_or(DeviceError::NotFound)?;

        let layout = binding.layout();
        let properties = default_properties(layout);
        info!(
            id = %binding.id,
            name = %instance.product_name,
            ?layout,
            objects = properties.len(),
            "gamepad device created"
        );

        Ok(Self {
            session,
            id: format!("gamepad:{}", binding.id),
            instance,
            layout,
            properties,
            differ: StateDiffer::new(),
            lifecycle: LifecycleState::Bound,
            read_event: Some(WaitHandle::new()),
            notify: None,
        })
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Current binding as the session sees it.
    pub fn binding(&self) -> Option<Binding> {
        self.session.lock().binding().cloned()
    }

    /// Immediate state built from every sample seen so far.
    pub fn joy_state(&self) -> &JoyState {
        self.differ.joy_state()
    }

    pub fn last_raw(&self) -> &RawState {
        self.differ.last_raw()
    }

    /// Gate that `unacquire` waits on. Signaled when acquisition completes.
    pub fn read_event(&self) -> Option<WaitHandle> {
        self.read_event.clone()
    }

    /// Register (or clear) a handle to signal when new input arrives.
    pub fn set_event_notification(&mut self, handle: Option<WaitHandle>) {
        self.notify = handle;
    }

    /// Replace the calibration of the axis selected by `filter`.
    pub fn set_object_properties(
        &mut self,
        filter: ObjectFilter,
        properties: ObjectProperties,
    ) -> Result<(), DeviceError> {
        let (index, object) = objects::find_object(self.layout, filter)
            .filter(|(_, o)| o.id.kind == ObjectKind::Axis)
            .ok_or(DeviceError::ObjectNotFound)?;
        debug!(id = %self.id, object = object.name, ?properties, "calibration updated");
        self.properties[index] = Some(properties);
        Ok(())
    }

    /// Unacquire if needed and drop OS-level wait handles.
    pub fn close(&mut self) {
        if self.lifecycle == LifecycleState::Closed {
            return;
        }
        let _ = self.unacquire();
        self.read_event = None;
        self.notify = None;
        self.lifecycle = LifecycleState::Closed;
        debug!(id = %self.id, "gamepad device closed");
    }

    fn handle_report(&mut self, report: &StateReport, sink: &mut dyn EventSink) -> usize {
        let mut ctx = self.session.lock();
        match ctx.bound_id() {
            Some(id) if id.get() == report.id => {}
            bound => {
                trace!(got = report.id, bound = ?bound.map(|b| b.get()), "state report for another pad");
                return 0;
            }
        }

        let emitted = self.differ.apply(
            RawState::from(report),
            self.layout,
            &self.properties,
            || ctx.next_sequence(),
            sink,
        );
        drop(ctx);

        if emitted > 0 {
            if let Some(notify) = &self.notify {
                notify.set();
            }
        }
        emitted
    }
}

fn default_properties(layout: Layout) -> Vec<Option<ObjectProperties>> {
    let mut properties = vec![None; layout.objects().len()];
    let _ = objects::enumerate_objects(layout, ObjectFilter::Device, ObjectTypes::AXIS, |index, _| {
        properties[index] = Some(ObjectProperties::axis_default());
        ControlFlow::Continue(())
    });
    properties
}

impl Device for GamepadDevice {
    fn name(&self) -> &str {
        &self.instance.product_name
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn instance(&self) -> &DeviceInstance {
        &self.instance
    }

    fn caps(&self) -> DeviceCaps {
        let count = |kind: ObjectKind| {
            self.layout
                .objects()
                .iter()
                .filter(|o| o.id.kind == kind)
                .count()
        };
        DeviceCaps {
            axes: count(ObjectKind::Axis),
            buttons: count(ObjectKind::Button),
            povs: count(ObjectKind::Hat),
            firmware_revision: FIRMWARE_REVISION,
            hardware_revision: HARDWARE_REVISION,
            cooperative: CooperativeLevel::NonExclusiveBackground,
        }
    }

    fn state(&self) -> LifecycleState {
        self.lifecycle
    }

    fn acquire(&mut self) -> Result<(), DeviceError> {
        match self.lifecycle {
            LifecycleState::Closed => return Err(DeviceError::Closed),
            LifecycleState::Acquired => return Ok(()),
            LifecycleState::Bound => {}
        }

        let result = {
            let mut ctx = self.session.lock();
            let opened = if ctx.is_open() { Ok(()) } else { ctx.open() };
            opened
                .map_err(Into::into)
                .and_then(|()| ctx.acquire(true, false))
        };

        // Signal even on failure so nobody waiting on the gate hangs.
        if let Some(event) = &self.read_event {
            event.set();
        }

        match result {
            Ok(binding) => {
                let layout = binding.layout();
                if layout != self.layout {
                    debug!(id = %self.id, from = ?self.layout, to = ?layout, "layout changed; rebuilding objects");
                    self.layout = layout;
                    self.properties = default_properties(layout);
                    self.differ = StateDiffer::new();
                }
                self.lifecycle = LifecycleState::Acquired;
                info!(id = %self.id, "gamepad acquired");
                Ok(())
            }
            Err(err) => {
                warn!(id = %self.id, %err, "gamepad acquire failed");
                Err(DeviceError::NotFound)
            }
        }
    }

    fn unacquire(&mut self) -> Result<(), DeviceError> {
        if self.lifecycle != LifecycleState::Acquired {
            return Ok(());
        }
        if let Some(event) = &self.read_event {
            event.wait();
        }

        let mut ctx = self.session.lock();
        ctx.release();
        ctx.close();
        drop(ctx);

        self.lifecycle = LifecycleState::Bound;
        info!(id = %self.id, "gamepad unacquired");
        Ok(())
    }

    fn read(&mut self, sink: &mut dyn EventSink) -> Result<usize, DeviceError> {
        if self.lifecycle != LifecycleState::Acquired {
            return Err(DeviceError::NotAcquired);
        }

        let mut buf: Datagram = [0u8; DATAGRAM_LEN];
        let received = {
            let mut ctx = self.session.lock();
            if !ctx.is_open() {
                return Ok(0);
            }
            ctx.recv(&mut buf)
        };

        let len = match received {
            Ok(len) => len,
            Err(TransportError::Timeout) => return Ok(0),
            Err(err) => {
                debug!(id = %self.id, %err, "read failed; treating as no data");
                return Ok(0);
            }
        };

        match StateReport::decode(&buf[..len]) {
            Ok(report) => Ok(self.handle_report(&report, sink)),
            Err(err) => {
                trace!(id = %self.id, %err, "ignoring datagram");
                Ok(0)
            }
        }
    }

    fn objects(&self) -> &'static [ObjectDescriptor] {
        self.layout.objects()
    }

    fn enumerate_objects(
        &self,
        filter: ObjectFilter,
        types: ObjectTypes,
        f: &mut dyn FnMut(usize, &ObjectDescriptor) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        objects::enumerate_objects(self.layout, filter, types, f)
    }

    fn object_properties(&self, index: usize) -> Option<&ObjectProperties> {
        self.properties.get(index).and_then(Option::as_ref)
    }

    fn get_property(&self, property: Property) -> Result<PropertyValue, DeviceError> {
        match property {
            Property::ProductName => Ok(PropertyValue::Text(self.instance.product_name.clone())),
            Property::InstanceName => Ok(PropertyValue::Text(self.instance.instance_name.clone())),
            Property::VidPid => Ok(PropertyValue::Dword(self.instance.vid_pid())),
            Property::JoystickId => {
                let id = self.session.lock().bound_id().map_or(0, |id| id.get());
                Ok(PropertyValue::Dword(id))
            }
            Property::GuidAndPath => Ok(PropertyValue::Path {
                class: DeviceClass::Hid,
                path: self.instance.path.clone(),
            }),
            _ => Err(DeviceError::Unsupported),
        }
    }
}

impl Drop for GamepadDevice {
    fn drop(&mut self) {
        self.close();
    }
}
