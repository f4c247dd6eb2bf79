//! Binding state shared by every device talking to the companion server.
//!
//! The server hands out at most one pad at a time, so the socket, the current
//! binding and the event sequence counter live together in one
//! [`SessionContext`]. Devices reach it through a cloneable [`SessionHandle`];
//! lifecycle calls across devices are still expected to be serialized by the
//! caller.

use crate::error::{SessionError, TransportError};
use crate::objects::Layout;
use crate::protocol::{self, Datagram, GamepadResponse, LayoutFlags, DATAGRAM_LEN};
use crate::transport::Transport;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Server-assigned handle of a bound pad. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GamepadId(NonZeroU32);

impl GamepadId {
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for GamepadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Association with one server-reported pad.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub id: GamepadId,
    pub flags: LayoutFlags,
    /// Display name, present when it was requested.
    pub name: Option<String>,
}

impl Binding {
    pub fn layout(&self) -> Layout {
        self.flags.layout()
    }
}

pub struct SessionContext {
    transport: Box<dyn Transport>,
    binding: Option<Binding>,
    sequence: u64,
}

impl SessionContext {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            binding: None,
            sequence: 0,
        }
    }

    pub fn open(&mut self) -> Result<(), TransportError> {
        self.transport.open()
    }

    pub fn close(&mut self) {
        self.transport.close();
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    pub fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }

    pub fn bound_id(&self) -> Option<GamepadId> {
        self.binding.as_ref().map(|b| b.id)
    }

    /// Ask the server for its pad.
    ///
    /// With `notify` the server starts pushing state reports to us. A
    /// successful answer replaces the current binding; any failure clears it.
    pub fn acquire(&mut self, notify: bool, want_name: bool) -> Result<Binding, SessionError> {
        let result = self.request_gamepad(notify, want_name);
        match &result {
            Ok(binding) => {
                info!(
                    id = %binding.id,
                    flags = binding.flags.bits(),
                    layout = ?binding.layout(),
                    name = binding.name.as_deref().unwrap_or(""),
                    notify,
                    "gamepad bound"
                );
                self.binding = Some(binding.clone());
            }
            Err(err) => {
                debug!(%err, notify, "gamepad request failed");
                self.binding = None;
            }
        }
        result
    }

    fn request_gamepad(&mut self, notify: bool, want_name: bool) -> Result<Binding, SessionError> {
        self.transport.send(&protocol::encode_get_gamepad(notify))?;

        let mut buf: Datagram = [0u8; DATAGRAM_LEN];
        let len = self.transport.recv(&mut buf)?;
        let rsp = GamepadResponse::decode(&buf[..len])?;

        let id = GamepadId::new(rsp.id).ok_or(SessionError::NoDevice)?;
        if !rsp.flags.is_compatible() {
            return Err(SessionError::IncompatibleTransport {
                id: id.get(),
                flags: rsp.flags.bits(),
            });
        }

        // Names are read from the full datagram: short sends are zero-padded.
        let name = if want_name {
            Some(GamepadResponse::decode_name(&buf)?)
        } else {
            None
        };

        Ok(Binding {
            id,
            flags: rsp.flags,
            name,
        })
    }

    /// Tell the server we are done with the pad. Best-effort; never waits.
    pub fn release(&mut self) {
        if let Err(err) = self.transport.send(&protocol::encode_release()) {
            debug!(%err, "release request not sent");
        }
        if let Some(binding) = self.binding.take() {
            info!(id = %binding.id, "gamepad released");
        }
    }

    /// Receive one datagram from the server.
    pub fn recv(&mut self, buf: &mut Datagram) -> Result<usize, TransportError> {
        self.transport.recv(buf)
    }

    /// Next event sequence number. 64-bit, so it outlives any session.
    pub fn next_sequence(&mut self) -> u64 {
        let seq = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        seq
    }
}

/// Shared access to a [`SessionContext`].
#[derive(Clone)]
pub struct SessionHandle(Arc<Mutex<SessionContext>>);

impl SessionHandle {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::from_context(SessionContext::new(Box::new(transport)))
    }

    pub fn from_context(ctx: SessionContext) -> Self {
        Self(Arc::new(Mutex::new(ctx)))
    }

    pub fn lock(&self) -> MutexGuard<'_, SessionContext> {
        self.0.lock().unwrap_or_else(|poisoned| {
            warn!("session lock poisoned; continuing with inner state");
            poisoned.into_inner()
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport used by unit tests across the crate.

    use super::*;
    use std::collections::VecDeque;

    #[derive(Default)]
    pub struct Script {
        pub open: bool,
        pub opens: usize,
        pub fail_open: bool,
        pub sent: Vec<Datagram>,
        pub inbox: VecDeque<Result<Datagram, TransportError>>,
    }

    /// Transport whose traffic is fully controlled by the test.
    #[derive(Clone, Default)]
    pub struct ScriptedTransport(pub Arc<Mutex<Script>>);

    impl ScriptedTransport {
        pub fn script(&self) -> MutexGuard<'_, Script> {
            self.0.lock().unwrap()
        }

        pub fn queue(&self, datagram: Datagram) {
            self.script().inbox.push_back(Ok(datagram));
        }

        pub fn queue_timeout(&self) {
            self.script().inbox.push_back(Err(TransportError::Timeout));
        }
    }

    impl Transport for ScriptedTransport {
        fn open(&mut self) -> Result<(), TransportError> {
            let mut s = self.script();
            if s.fail_open {
                return Err(TransportError::Setup {
                    stage: "bind",
                    source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
                });
            }
            s.open = true;
            s.opens += 1;
            Ok(())
        }

        fn close(&mut self) {
            self.script().open = false;
        }

        fn is_open(&self) -> bool {
            self.0.lock().unwrap().open
        }

        fn send(&mut self, datagram: &Datagram) -> Result<(), TransportError> {
            let mut s = self.script();
            if !s.open {
                return Err(TransportError::NotOpen);
            }
            s.sent.push(*datagram);
            Ok(())
        }

        fn recv(&mut self, buf: &mut Datagram) -> Result<usize, TransportError> {
            let mut s = self.script();
            if !s.open {
                return Err(TransportError::NotOpen);
            }
            match s.inbox.pop_front() {
                Some(Ok(d)) => {
                    *buf = d;
                    Ok(DATAGRAM_LEN)
                }
                Some(Err(e)) => Err(e),
                None => Err(TransportError::Timeout),
            }
        }
    }

    pub fn response(id: u32, flags: LayoutFlags, name: Option<&str>) -> Datagram {
        GamepadResponse { id, flags }.encode(name)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    fn session() -> (ScriptedTransport, SessionContext) {
        let t = ScriptedTransport::default();
        let mut ctx = SessionContext::new(Box::new(t.clone()));
        ctx.open().unwrap();
        (t, ctx)
    }

    #[test]
    fn round_trip_binds_extended_pad() {
        let (t, mut ctx) = session();
        t.queue(response(
            7,
            LayoutFlags::MAPPER_EXTENDED | LayoutFlags::TRANSPORT_STANDARD,
            Some("Pad7"),
        ));

        let binding = ctx.acquire(true, true).unwrap();
        assert_eq!(binding.id.get(), 7);
        assert_eq!(binding.layout(), Layout::Extended);
        assert_eq!(binding.name.as_deref(), Some("Pad7"));
        assert_eq!(ctx.bound_id().map(GamepadId::get), Some(7));
        assert_eq!(&t.script().sent[0][..3], &[8, 0, 1]);
    }

    #[test]
    fn name_is_skipped_unless_asked() {
        let (t, mut ctx) = session();
        t.queue(response(3, LayoutFlags::MAPPER_STANDARD | LayoutFlags::TRANSPORT_STANDARD, Some("x")));
        let binding = ctx.acquire(false, false).unwrap();
        assert_eq!(binding.name, None);
        assert_eq!(binding.layout(), Layout::Standard);
        assert_eq!(t.script().sent[0][2], 0);
    }

    #[test]
    fn zero_id_is_no_device() {
        let (t, mut ctx) = session();
        t.queue(response(0, LayoutFlags::TRANSPORT_STANDARD, None));
        assert!(matches!(ctx.acquire(true, false), Err(SessionError::NoDevice)));
        assert!(ctx.binding().is_none());
    }

    #[test]
    fn incompatible_transport_is_reported_as_missing() {
        let (t, mut ctx) = session();
        t.queue(response(5, LayoutFlags::MAPPER_EXTENDED | LayoutFlags::TRANSPORT_EXTENDED, None));
        let err = ctx.acquire(true, true).unwrap_err();
        assert!(matches!(err, SessionError::IncompatibleTransport { id: 5, .. }));
        assert!(err.is_device_missing());
        assert!(ctx.binding().is_none());
    }

    #[test]
    fn failure_clears_previous_binding() {
        let (t, mut ctx) = session();
        t.queue(response(4, LayoutFlags::TRANSPORT_STANDARD, None));
        ctx.acquire(false, false).unwrap();
        assert!(ctx.binding().is_some());

        let mut other = [0u8; DATAGRAM_LEN];
        other[0] = 9;
        t.queue(other);
        assert!(matches!(
            ctx.acquire(false, false),
            Err(SessionError::ProtocolMismatch { expected: 8, found: 9 })
        ));
        assert!(ctx.binding().is_none());

        t.queue_timeout();
        assert!(matches!(
            ctx.acquire(false, false),
            Err(SessionError::Transport(TransportError::Timeout))
        ));
    }

    #[test]
    fn malformed_name_length() {
        let (t, mut ctx) = session();
        let mut buf = response(2, LayoutFlags::TRANSPORT_STANDARD, None);
        buf[6..10].copy_from_slice(&1000i32.to_le_bytes());
        t.queue(buf);
        assert!(matches!(ctx.acquire(false, true), Err(SessionError::Malformed(_))));
    }

    #[test]
    fn release_is_fire_and_forget() {
        let (t, mut ctx) = session();
        t.queue(response(4, LayoutFlags::TRANSPORT_STANDARD, None));
        ctx.acquire(true, false).unwrap();
        ctx.release();
        assert!(ctx.binding().is_none());
        assert_eq!(t.script().sent.last().map(|d| d[0]), Some(10));

        // Closed transport: still no error surfaces.
        ctx.close();
        ctx.release();
    }

    #[test]
    fn sequence_is_strictly_increasing() {
        let (_, mut ctx) = session();
        let a = ctx.next_sequence();
        let b = ctx.next_sequence();
        let c = ctx.next_sequence();
        assert!(a < b && b < c);
    }

    #[test]
    fn sequence_keeps_climbing_past_32_bits() {
        let (_, mut ctx) = session();
        ctx.sequence = u32::MAX as u64;
        let a = ctx.next_sequence();
        let b = ctx.next_sequence();
        assert_eq!(a, u32::MAX as u64);
        assert_eq!(b, 1u64 << 32);
    }
}
