use crate::backends::probe_devices;
#[cfg(feature = "gamepad")]
use crate::backends::gamepad::GamepadDevice;
use crate::config::BridgeConfig;
use crate::device::{Device, Property, PropertyValue};
use crate::differ::JoyState;
use crate::error::DeviceError;
use crate::event::{EventQueue, InputEvent};
use crate::metadata::DeviceInstance;
use crate::session::SessionHandle;
use crate::transport::{Transport, UdpTransport};
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub struct DeviceManager {
    config: BridgeConfig,
    session: SessionHandle,
    #[cfg(feature = "gamepad")]
    gamepads: Vec<GamepadDevice>,
    queue: EventQueue,
}

impl DeviceManager {
    /// Manager talking to the companion server over UDP as configured.
    pub fn new(config: BridgeConfig) -> Self {
        let transport = UdpTransport::from_config(&config);
        Self::with_session(config, SessionHandle::new(transport))
    }

    /// Manager over an arbitrary transport.
    pub fn with_transport(config: BridgeConfig, transport: impl Transport + 'static) -> Self {
        Self::with_session(config, SessionHandle::new(transport))
    }

    pub fn with_session(config: BridgeConfig, session: SessionHandle) -> Self {
        let queue = EventQueue::new(config.queue_capacity);
        Self {
            config,
            session,
            #[cfg(feature = "gamepad")]
            gamepads: Vec::new(),
            queue,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Instances available right now (zero or one).
    pub fn discover(&self) -> Vec<DeviceInstance> {
        let found = probe_devices(&self.session, self.config.version);
        info!("Discovered {} gamepad(s)", found.len());
        found
    }

    /// Create, register and return the index of a new gamepad device.
    #[cfg(feature = "gamepad")]
    pub fn open_gamepad(&mut self) -> Result<usize, DeviceError> {
        let device = GamepadDevice::create(self.session.clone(), self.config.version)?;
        debug!(id = device.id(), "registered device");
        self.gamepads.push(device);
        Ok(self.gamepads.len() - 1)
    }

    #[cfg(feature = "gamepad")]
    pub fn device(&self, index: usize) -> Option<&GamepadDevice> {
        self.gamepads.get(index)
    }

    #[cfg(feature = "gamepad")]
    pub fn device_mut(&mut self, index: usize) -> Option<&mut GamepadDevice> {
        self.gamepads.get_mut(index)
    }

    pub fn devices(&self) -> impl Iterator<Item = &dyn Device> {
        #[cfg(feature = "gamepad")]
        let iter = self.gamepads.iter().map(|d| d as &dyn Device);
        #[cfg(not(feature = "gamepad"))]
        let iter = std::iter::empty();
        iter
    }

    /// Acquire every registered device; returns how many are acquired afterwards.
    pub fn acquire_all(&mut self) -> usize {
        let mut acquired = 0;
        #[cfg(feature = "gamepad")]
        for device in self.gamepads.iter_mut() {
            match device.acquire() {
                Ok(()) => acquired += 1,
                Err(err) => warn!(id = device.id(), %err, "acquire failed"),
            }
        }
        acquired
    }

    /// Read every acquired device once into the buffered queue.
    ///
    /// Returns how many events were queued by this call.
    pub fn poll(&mut self) -> usize {
        let mut queued = 0;
        #[cfg(feature = "gamepad")]
        for device in self.gamepads.iter_mut() {
            match device.read(&mut self.queue) {
                Ok(n) => queued += n,
                Err(DeviceError::NotAcquired) => {}
                Err(err) => warn!(id = device.id(), %err, "read failed"),
            }
        }
        if self.queue.overflowed() {
            warn!(capacity = self.queue.capacity(), "event queue overflowed; oldest events dropped");
        }
        queued
    }

    /// Take every buffered event, oldest first.
    pub fn drain_events(&mut self) -> Vec<InputEvent> {
        self.queue.drain()
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// Immediate state of every registered device, keyed by device id.
    pub fn snapshot(&self) -> HashMap<String, JoyState> {
        let mut map = HashMap::new();
        #[cfg(feature = "gamepad")]
        for device in &self.gamepads {
            map.insert(device.id().to_string(), device.joy_state().clone());
        }
        map
    }

    /// Property query routed to a device, with buffer size answered here.
    pub fn get_property(&self, device: &dyn Device, property: Property) -> Result<PropertyValue, DeviceError> {
        match property {
            Property::BufferSize => Ok(PropertyValue::Dword(self.queue.capacity() as u32)),
            other => device.get_property(other),
        }
    }

    /// Unacquire and close every device.
    pub fn shutdown(&mut self) {
        #[cfg(feature = "gamepad")]
        for mut device in self.gamepads.drain(..) {
            device.close();
        }
        self.queue.clear();
    }
}

impl Drop for DeviceManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
