//! Wire format spoken with the companion server.
//!
//! Every datagram is exactly [`DATAGRAM_LEN`] bytes; multi-byte fields are
//! little-endian. Three request codes exist:
//!
//! | code | direction | layout |
//! |---|---|---|
//! | 8  | both | request: `[8, 0, notify]`; response: `[8, id:i32, flags:u8, name_len:i32, name...]` |
//! | 9  | server → client | `[9, 1, id:i32, buttons:i16, hat:i8, lx, ly, rx, ry:i16, lz, rz:u8]` |
//! | 10 | client → server | `[10]`, no response |
//!
//! Decoders never index past the buffer: every field is read through a cursor
//! and a short read becomes [`DecodeError::Truncated`].

use crate::error::DecodeError;
use crate::objects::Layout;
use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Write};

/// Port our socket binds to.
pub const LOCAL_PORT: u16 = 7948;
/// Port the companion server listens on.
pub const PEER_PORT: u16 = 7947;

pub const DATAGRAM_LEN: usize = 64;

pub const REQUEST_GET_GAMEPAD: u8 = 8;
pub const REQUEST_GAMEPAD_STATE: u8 = 9;
pub const REQUEST_RELEASE_GAMEPAD: u8 = 10;

/// Sub-type byte carried by periodic state reports.
pub const STATE_REPORT_SUBTYPE: u8 = 1;

/// Offset of the name bytes in a get-gamepad response.
const NAME_OFFSET: usize = 10;
/// Longest name a response can carry.
pub const MAX_NAME_LEN: usize = DATAGRAM_LEN - NAME_OFFSET;

pub type Datagram = [u8; DATAGRAM_LEN];

bitflags! {
    /// Capability byte returned with a binding.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LayoutFlags: u8 {
        /// Objects follow the standard (12 button, X/Y/Z/Rz) layout.
        const MAPPER_STANDARD    = 0x01;
        /// Objects follow the extended (Xinput-style) layout.
        const MAPPER_EXTENDED    = 0x02;
        /// The pad is being driven through the extended transport.
        const TRANSPORT_EXTENDED = 0x04;
        /// The pad reports over our transport; required for a usable binding.
        const TRANSPORT_STANDARD = 0x08;
    }
}

impl LayoutFlags {
    /// The one layout that is authoritative for this binding.
    ///
    /// Extended wins when both mapper bits are set. With neither, the extended
    /// layout is used.
    pub fn layout(self) -> Layout {
        if self.contains(LayoutFlags::MAPPER_EXTENDED) {
            Layout::Extended
        } else if self.contains(LayoutFlags::MAPPER_STANDARD) {
            Layout::Standard
        } else {
            Layout::Extended
        }
    }

    pub fn is_compatible(self) -> bool {
        self.contains(LayoutFlags::TRANSPORT_STANDARD)
    }
}

/// `[8, 0, notify]`
pub fn encode_get_gamepad(notify: bool) -> Datagram {
    let mut buf = [0u8; DATAGRAM_LEN];
    buf[0] = REQUEST_GET_GAMEPAD;
    buf[1] = 0;
    buf[2] = notify as u8;
    buf
}

/// `[10]`
pub fn encode_release() -> Datagram {
    let mut buf = [0u8; DATAGRAM_LEN];
    buf[0] = REQUEST_RELEASE_GAMEPAD;
    buf
}

/// Fixed header of a get-gamepad response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GamepadResponse {
    /// Raw id; `0` means no pad is available.
    pub id: u32,
    pub flags: LayoutFlags,
}

impl GamepadResponse {
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut rd = Cursor::new(buf);
        let code = rd.read_u8().map_err(|_| DecodeError::Truncated)?;
        if code != REQUEST_GET_GAMEPAD {
            return Err(DecodeError::UnexpectedCode {
                expected: REQUEST_GET_GAMEPAD,
                found: code,
            });
        }
        let id = rd
            .read_i32::<LittleEndian>()
            .map_err(|_| DecodeError::Truncated)? as u32;
        let flags = rd.read_u8().map_err(|_| DecodeError::Truncated)?;
        Ok(Self {
            id,
            flags: LayoutFlags::from_bits_retain(flags),
        })
    }

    /// Name carried after the header. Only meaningful when it was asked for.
    pub fn decode_name(buf: &[u8]) -> Result<String, DecodeError> {
        let mut rd = Cursor::new(buf);
        rd.set_position(6);
        let len = rd
            .read_i32::<LittleEndian>()
            .map_err(|_| DecodeError::Truncated)?;
        if len < 0 || len as usize > MAX_NAME_LEN {
            return Err(DecodeError::NameLength {
                len,
                max: MAX_NAME_LEN,
            });
        }
        let bytes = buf
            .get(NAME_OFFSET..NAME_OFFSET + len as usize)
            .ok_or(DecodeError::Truncated)?;
        let name = String::from_utf8_lossy(bytes);
        Ok(name.trim_end_matches('\0').to_string())
    }

    /// Server side of the exchange. Used by test doubles and tooling.
    pub fn encode(&self, name: Option<&str>) -> Datagram {
        let mut buf = [0u8; DATAGRAM_LEN];
        {
            let mut wr = Cursor::new(&mut buf[..]);
            let _ = wr.write_u8(REQUEST_GET_GAMEPAD);
            let _ = wr.write_i32::<LittleEndian>(self.id as i32);
            let _ = wr.write_u8(self.flags.bits());
            if let Some(name) = name {
                let bytes = &name.as_bytes()[..name.len().min(MAX_NAME_LEN)];
                let _ = wr.write_i32::<LittleEndian>(bytes.len() as i32);
                let _ = wr.write_all(bytes);
            }
        }
        buf
    }
}

/// One periodic sample pushed by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateReport {
    pub id: u32,
    pub buttons: u16,
    /// `-1` centered, `0..=7` in 45° steps clockwise from up.
    pub hat: i8,
    pub lx: i16,
    pub ly: i16,
    pub rx: i16,
    pub ry: i16,
    pub lz: u8,
    pub rz: u8,
}

impl StateReport {
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut rd = Cursor::new(buf);
        let truncated = |_: std::io::Error| DecodeError::Truncated;

        let code = rd.read_u8().map_err(truncated)?;
        if code != REQUEST_GAMEPAD_STATE {
            return Err(DecodeError::UnexpectedCode {
                expected: REQUEST_GAMEPAD_STATE,
                found: code,
            });
        }
        let subtype = rd.read_u8().map_err(truncated)?;
        if subtype != STATE_REPORT_SUBTYPE {
            return Err(DecodeError::UnexpectedSubtype(subtype));
        }

        Ok(Self {
            id: rd.read_i32::<LittleEndian>().map_err(truncated)? as u32,
            buttons: rd.read_u16::<LittleEndian>().map_err(truncated)?,
            hat: rd.read_i8().map_err(truncated)?,
            lx: rd.read_i16::<LittleEndian>().map_err(truncated)?,
            ly: rd.read_i16::<LittleEndian>().map_err(truncated)?,
            rx: rd.read_i16::<LittleEndian>().map_err(truncated)?,
            ry: rd.read_i16::<LittleEndian>().map_err(truncated)?,
            lz: rd.read_u8().map_err(truncated)?,
            rz: rd.read_u8().map_err(truncated)?,
        })
    }

    pub fn encode(&self) -> Datagram {
        let mut buf = [0u8; DATAGRAM_LEN];
        let mut wr = Cursor::new(&mut buf[..]);
        // 19 bytes into a 64-byte buffer; writes cannot run out of room.
        let _ = wr.write_u8(REQUEST_GAMEPAD_STATE);
        let _ = wr.write_u8(STATE_REPORT_SUBTYPE);
        let _ = wr.write_i32::<LittleEndian>(self.id as i32);
        let _ = wr.write_u16::<LittleEndian>(self.buttons);
        let _ = wr.write_i8(self.hat);
        let _ = wr.write_i16::<LittleEndian>(self.lx);
        let _ = wr.write_i16::<LittleEndian>(self.ly);
        let _ = wr.write_i16::<LittleEndian>(self.rx);
        let _ = wr.write_i16::<LittleEndian>(self.ry);
        let _ = wr.write_u8(self.lz);
        let _ = wr.write_u8(self.rz);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_gamepad_request_bytes() {
        let buf = encode_get_gamepad(true);
        assert_eq!(&buf[..3], &[8, 0, 1]);
        assert!(buf[3..].iter().all(|&b| b == 0));
        assert_eq!(encode_get_gamepad(false)[2], 0);
        assert_eq!(encode_release()[0], 10);
    }

    #[test]
    fn response_header_fields() {
        let mut buf = [0u8; DATAGRAM_LEN];
        buf[0] = 8;
        buf[1..5].copy_from_slice(&7i32.to_le_bytes());
        buf[5] = 0x0a;
        let rsp = GamepadResponse::decode(&buf).unwrap();
        assert_eq!(rsp.id, 7);
        assert_eq!(
            rsp.flags,
            LayoutFlags::MAPPER_EXTENDED | LayoutFlags::TRANSPORT_STANDARD
        );
    }

    #[test]
    fn response_with_wrong_code() {
        let mut buf = [0u8; DATAGRAM_LEN];
        buf[0] = 9;
        assert_eq!(
            GamepadResponse::decode(&buf),
            Err(DecodeError::UnexpectedCode {
                expected: 8,
                found: 9
            })
        );
    }

    #[test]
    fn name_is_bounds_checked() {
        let mut buf = [0u8; DATAGRAM_LEN];
        buf[0] = 8;
        buf[6..10].copy_from_slice(&200i32.to_le_bytes());
        assert!(matches!(
            GamepadResponse::decode_name(&buf),
            Err(DecodeError::NameLength { len: 200, .. })
        ));

        buf[6..10].copy_from_slice(&(-1i32).to_le_bytes());
        assert!(GamepadResponse::decode_name(&buf).is_err());

        buf[6..10].copy_from_slice(&4i32.to_le_bytes());
        buf[10..14].copy_from_slice(b"Pad7");
        assert_eq!(GamepadResponse::decode_name(&buf).unwrap(), "Pad7");
    }

    #[test]
    fn name_at_full_length_fits() {
        let name = "n".repeat(MAX_NAME_LEN);
        let buf = GamepadResponse {
            id: 1,
            flags: LayoutFlags::TRANSPORT_STANDARD,
        }
        .encode(Some(&name));
        assert_eq!(GamepadResponse::decode_name(&buf).unwrap(), name);
    }

    #[test]
    fn state_report_offsets() {
        let mut buf = [0u8; DATAGRAM_LEN];
        buf[0] = 9;
        buf[1] = 1;
        buf[2..6].copy_from_slice(&42i32.to_le_bytes());
        buf[6..8].copy_from_slice(&0x0203u16.to_le_bytes());
        buf[8] = 0xff;
        buf[9..11].copy_from_slice(&(-100i16).to_le_bytes());
        buf[11..13].copy_from_slice(&200i16.to_le_bytes());
        buf[13..15].copy_from_slice(&(-300i16).to_le_bytes());
        buf[15..17].copy_from_slice(&400i16.to_le_bytes());
        buf[17] = 10;
        buf[18] = 250;

        let rpt = StateReport::decode(&buf).unwrap();
        assert_eq!(
            rpt,
            StateReport {
                id: 42,
                buttons: 0x0203,
                hat: -1,
                lx: -100,
                ly: 200,
                rx: -300,
                ry: 400,
                lz: 10,
                rz: 250,
            }
        );
        assert_eq!(rpt.encode(), buf);
    }

    #[test]
    fn state_report_rejects_other_traffic() {
        let mut buf = StateReport::default().encode();
        buf[1] = 0;
        assert_eq!(
            StateReport::decode(&buf),
            Err(DecodeError::UnexpectedSubtype(0))
        );
        assert_eq!(StateReport::decode(&buf[..10]), Err(DecodeError::UnexpectedSubtype(0)));

        let short = StateReport::default().encode();
        assert_eq!(StateReport::decode(&short[..12]), Err(DecodeError::Truncated));
        assert!(StateReport::decode(&encode_release()).is_err());
    }

    #[test]
    fn layout_priority() {
        assert_eq!(LayoutFlags::MAPPER_STANDARD.layout(), Layout::Standard);
        assert_eq!(LayoutFlags::MAPPER_EXTENDED.layout(), Layout::Extended);
        assert_eq!(
            (LayoutFlags::MAPPER_STANDARD | LayoutFlags::MAPPER_EXTENDED).layout(),
            Layout::Extended
        );
        assert_eq!(LayoutFlags::TRANSPORT_STANDARD.layout(), Layout::Extended);
        assert!(!LayoutFlags::TRANSPORT_EXTENDED.is_compatible());
        assert!((LayoutFlags::MAPPER_STANDARD | LayoutFlags::TRANSPORT_STANDARD).is_compatible());
    }
}
