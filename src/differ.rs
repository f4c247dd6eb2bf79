//! Raw sample → calibrated, deduplicated events.
//!
//! [`StateDiffer`] keeps the last raw sample and compares every new one
//! field by field. Only objects whose raw value changed produce an event,
//! with two deliberate exceptions kept for compatibility with what consumers
//! of this protocol already observe:
//!
//! - any change of the button mask re-announces *every* button of the layout;
//! - under the extended layout, when both triggers move in the same sample
//!   only the left trigger drives the combined Z axis.

use crate::calibration::{mul_div, scale_axis, ObjectProperties};
use crate::event::{EventSink, InputEvent, BUTTON_PRESSED, BUTTON_RELEASED, HAT_CENTERED};
use crate::objects::{Layout, ObjectId};
use crate::protocol::StateReport;
use std::time::Instant;

/// Hundredths of a degree per hat step.
pub const HAT_STEP: i32 = 4500;

/// Last observed raw sample. Starts zeroed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawState {
    pub buttons: u16,
    pub hat: i8,
    pub lx: i16,
    pub ly: i16,
    pub rx: i16,
    pub ry: i16,
    pub lz: u8,
    pub rz: u8,
}

impl From<&StateReport> for RawState {
    fn from(r: &StateReport) -> Self {
        Self {
            buttons: r.buttons,
            hat: r.hat,
            lx: r.lx,
            ly: r.ly,
            rx: r.rx,
            ry: r.ry,
            lz: r.lz,
            rz: r.rz,
        }
    }
}

/// Immediate (polled) device state, laid out like the legacy joystick record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoyState {
    /// X, Y, Z, Rx, Ry, Rz; see [`AxisType::slot`](crate::objects::AxisType::slot).
    pub axes: [i32; 6],
    pub pov: [i32; 4],
    pub buttons: [u8; 32],
}

impl Default for JoyState {
    fn default() -> Self {
        Self {
            axes: [0; 6],
            pov: [HAT_CENTERED; 4],
            buttons: [0; 32],
        }
    }
}

impl JoyState {
    pub fn is_pressed(&self, button: usize) -> bool {
        self.buttons.get(button).is_some_and(|&b| b & 0x80 != 0)
    }
}

/// Hat code → reported POV value.
pub fn hat_value(hat: i8) -> i32 {
    match hat {
        0..=7 => hat as i32 * HAT_STEP,
        _ => HAT_CENTERED,
    }
}

/// Left/right trigger pair → one bipolar raw value for the combined Z axis.
///
/// The left trigger pulls toward the negative end, the right toward the
/// positive end. When both changed, the left one wins.
pub fn combined_trigger(prev: &RawState, lz: u8, rz: u8) -> i32 {
    if lz != prev.lz {
        mul_div(lz as i32, -32768, 255).unwrap_or(0)
    } else {
        mul_div(rz as i32, 32767, 255).unwrap_or(0)
    }
}

struct Emitter<'a, F> {
    layout: Layout,
    at: Instant,
    next_sequence: F,
    sink: &'a mut dyn EventSink,
    emitted: usize,
}

impl<F: FnMut() -> u64> Emitter<'_, F> {
    fn emit(&mut self, object: ObjectId, index: usize, value: i32) {
        let sequence = (self.next_sequence)();
        self.sink.push(InputEvent {
            object,
            index,
            value,
            at: self.at,
            sequence,
        });
        self.emitted += 1;
    }
}

#[derive(Debug, Default)]
pub struct StateDiffer {
    last: RawState,
    joy: JoyState,
}

impl StateDiffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_raw(&self) -> &RawState {
        &self.last
    }

    pub fn joy_state(&self) -> &JoyState {
        &self.joy
    }

    /// Compare `sample` with the last one and emit an event per changed object.
    ///
    /// `props` is indexed by object index; missing entries fall back to
    /// [`ObjectProperties::axis_default`]. Every emitted event shares one
    /// capture time and takes its own number from `next_sequence`.
    /// Returns how many events were emitted.
    pub fn apply<F>(
        &mut self,
        sample: RawState,
        layout: Layout,
        props: &[Option<ObjectProperties>],
        next_sequence: F,
        sink: &mut dyn EventSink,
    ) -> usize
    where
        F: FnMut() -> u64,
    {
        let mut out = Emitter {
            layout,
            at: Instant::now(),
            next_sequence,
            sink,
            emitted: 0,
        };

        let (rx_axis, ry_axis) = match layout {
            Layout::Standard => (2, 3),
            Layout::Extended => (3, 4),
        };

        if sample.lx != self.last.lx {
            self.last.lx = sample.lx;
            self.axis(&mut out, props, 0, sample.lx as i32);
        }
        if sample.ly != self.last.ly {
            self.last.ly = sample.ly;
            self.axis(&mut out, props, 1, sample.ly as i32);
        }
        if sample.rx != self.last.rx {
            self.last.rx = sample.rx;
            self.axis(&mut out, props, rx_axis, sample.rx as i32);
        }
        if sample.ry != self.last.ry {
            self.last.ry = sample.ry;
            self.axis(&mut out, props, ry_axis, sample.ry as i32);
        }

        if layout == Layout::Extended && (sample.lz != self.last.lz || sample.rz != self.last.rz) {
            let value = combined_trigger(&self.last, sample.lz, sample.rz);
            self.last.lz = sample.lz;
            self.last.rz = sample.rz;
            self.axis(&mut out, props, 2, value);
        }

        if sample.buttons != self.last.buttons {
            self.last.buttons = sample.buttons;
            for bit in 0..layout.button_count() {
                let Some(slot) = layout.button_slot(bit) else {
                    continue;
                };
                let value = if sample.buttons & (1 << bit) != 0 {
                    BUTTON_PRESSED
                } else {
                    BUTTON_RELEASED
                };
                self.joy.buttons[slot as usize] = value as u8;
                let id = ObjectId::button(slot);
                if let Some(index) = layout.index_of(id) {
                    out.emit(id, index, value);
                }
            }
        }

        if sample.hat != self.last.hat {
            self.last.hat = sample.hat;
            let value = hat_value(sample.hat);
            self.joy.pov[0] = value;
            let id = ObjectId::hat(0);
            if let Some(index) = layout.index_of(id) {
                out.emit(id, index, value);
            }
        }

        out.emitted
    }

    fn axis<F: FnMut() -> u64>(
        &mut self,
        out: &mut Emitter<'_, F>,
        props: &[Option<ObjectProperties>],
        instance: u8,
        raw: i32,
    ) {
        let id = ObjectId::axis(instance);
        let Some(index) = out.layout.index_of(id) else {
            return;
        };
        let object = &out.layout.objects()[index];
        let p = props
            .get(index)
            .copied()
            .flatten()
            .unwrap_or_else(ObjectProperties::axis_default);
        let value = scale_axis(raw, &p);
        if let Some(axis) = object.axis {
            self.joy.axes[axis.slot()] = value;
        }
        out.emit(id, index, value);
    }
}
