//! Device objects (axes, buttons, hat) for both layouts.
//!
//! The tables below are the authoritative object lists. Their order is the
//! object index used by events, and the offsets follow the legacy joystick
//! state record so consumers can address objects either way.
//!
//! ## Standard layout (17 objects)
//! - axes: X, Y, Z, Rz (instances 0..=3)
//! - buttons 0..=11, with raw bits routed through [`STANDARD_BUTTON_SLOTS`]
//! - one POV hat
//!
//! ## Extended layout (16 objects)
//! - axes: X, Y, Z (combined triggers), Rx, Ry (instances 0..=4)
//! - buttons 0..=9, bit N is button N
//! - one POV hat

use bitflags::bitflags;
use std::ops::ControlFlow;

/// HID Generic Desktop usage page.
pub const USAGE_PAGE_GENERIC: u16 = 0x01;
/// HID Button usage page.
pub const USAGE_PAGE_BUTTON: u16 = 0x09;

pub const USAGE_GAMEPAD: u16 = 0x05;
pub const USAGE_X: u16 = 0x30;
pub const USAGE_Y: u16 = 0x31;
pub const USAGE_Z: u16 = 0x32;
pub const USAGE_RX: u16 = 0x33;
pub const USAGE_RY: u16 = 0x34;
pub const USAGE_RZ: u16 = 0x35;
pub const USAGE_HAT_SWITCH: u16 = 0x39;

/// Raw button bit → standard-layout button slot.
///
/// Raw bits arrive as A, B, X, Y, L1, R1, Select, Start, L3, R3, L2, R2;
/// slots are numbered X, A, B, Y, L1, R1, L2, R2, Select, Start, L3, R3.
pub const STANDARD_BUTTON_SLOTS: [u8; 12] = [1, 2, 0, 3, 4, 5, 8, 9, 10, 11, 6, 7];

/// Number of buttons the extended layout exposes; bit N maps to button N.
pub const EXTENDED_BUTTON_COUNT: u8 = 10;

/// Offset of button 0 in the legacy state record.
const BUTTON_BASE_OFFSET: u32 = 48;
/// Offset of POV 0 in the legacy state record.
const POV_OFFSET: u32 = 32;

/// Object mapping convention for a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    Standard,
    Extended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Axis,
    Button,
    Hat,
}

/// Stable identity of an object within a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId {
    pub kind: ObjectKind,
    pub instance: u8,
}

impl ObjectId {
    pub const fn axis(instance: u8) -> Self {
        Self {
            kind: ObjectKind::Axis,
            instance,
        }
    }

    pub const fn button(instance: u8) -> Self {
        Self {
            kind: ObjectKind::Button,
            instance,
        }
    }

    pub const fn hat(instance: u8) -> Self {
        Self {
            kind: ObjectKind::Hat,
            instance,
        }
    }
}

/// Which slot of the legacy state record an axis occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisType {
    X,
    Y,
    Z,
    Rx,
    Ry,
    Rz,
}

impl AxisType {
    pub const fn offset(self) -> u32 {
        match self {
            AxisType::X => 0,
            AxisType::Y => 4,
            AxisType::Z => 8,
            AxisType::Rx => 12,
            AxisType::Ry => 16,
            AxisType::Rz => 20,
        }
    }

    /// Index into [`JoyState::axes`](crate::differ::JoyState::axes).
    pub const fn slot(self) -> usize {
        (self.offset() / 4) as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Usage {
    pub page: u16,
    pub usage: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDescriptor {
    pub id: ObjectId,
    pub name: &'static str,
    pub usage: Usage,
    /// Byte offset in the legacy state record.
    pub offset: u32,
    /// Set for axes only.
    pub axis: Option<AxisType>,
}

const fn axis(instance: u8, axis: AxisType, name: &'static str, usage: u16) -> ObjectDescriptor {
    ObjectDescriptor {
        id: ObjectId::axis(instance),
        name,
        usage: Usage {
            page: USAGE_PAGE_GENERIC,
            usage,
        },
        offset: axis.offset(),
        axis: Some(axis),
    }
}

const fn button(instance: u8, name: &'static str) -> ObjectDescriptor {
    ObjectDescriptor {
        id: ObjectId::button(instance),
        name,
        usage: Usage {
            page: USAGE_PAGE_BUTTON,
            usage: instance as u16 + 1,
        },
        offset: BUTTON_BASE_OFFSET + instance as u32,
        axis: None,
    }
}

const POV: ObjectDescriptor = ObjectDescriptor {
    id: ObjectId::hat(0),
    name: "POV",
    usage: Usage {
        page: USAGE_PAGE_GENERIC,
        usage: USAGE_HAT_SWITCH,
    },
    offset: POV_OFFSET,
    axis: None,
};

static STANDARD_OBJECTS: [ObjectDescriptor; 17] = [
    axis(0, AxisType::X, "X Axis", USAGE_X),
    axis(1, AxisType::Y, "Y Axis", USAGE_Y),
    axis(2, AxisType::Z, "Z Axis", USAGE_Z),
    axis(3, AxisType::Rz, "Rz Axis", USAGE_RZ),
    button(0, "Button 0"),
    button(1, "Button 1"),
    button(2, "Button 2"),
    button(3, "Button 3"),
    button(4, "Button 4"),
    button(5, "Button 5"),
    button(6, "Button 6"),
    button(7, "Button 7"),
    button(8, "Button 8"),
    button(9, "Button 9"),
    button(10, "Button 10"),
    button(11, "Button 11"),
    POV,
];

static EXTENDED_OBJECTS: [ObjectDescriptor; 16] = [
    axis(0, AxisType::X, "X Axis", USAGE_X),
    axis(1, AxisType::Y, "Y Axis", USAGE_Y),
    axis(2, AxisType::Z, "Z Axis", USAGE_Z),
    axis(3, AxisType::Rx, "Rx Axis", USAGE_RX),
    axis(4, AxisType::Ry, "Ry Axis", USAGE_RY),
    button(0, "Button 0"),
    button(1, "Button 1"),
    button(2, "Button 2"),
    button(3, "Button 3"),
    button(4, "Button 4"),
    button(5, "Button 5"),
    button(6, "Button 6"),
    button(7, "Button 7"),
    button(8, "Button 8"),
    button(9, "Button 9"),
    POV,
];

impl Layout {
    pub fn objects(self) -> &'static [ObjectDescriptor] {
        match self {
            Layout::Standard => &STANDARD_OBJECTS,
            Layout::Extended => &EXTENDED_OBJECTS,
        }
    }

    /// Object index for `id`, if the layout has it.
    pub fn index_of(self, id: ObjectId) -> Option<usize> {
        self.objects().iter().position(|o| o.id == id)
    }

    pub fn button_count(self) -> u8 {
        match self {
            Layout::Standard => STANDARD_BUTTON_SLOTS.len() as u8,
            Layout::Extended => EXTENDED_BUTTON_COUNT,
        }
    }

    /// Button slot fed by raw bit `bit`.
    pub fn button_slot(self, bit: u8) -> Option<u8> {
        match self {
            Layout::Standard => STANDARD_BUTTON_SLOTS.get(bit as usize).copied(),
            Layout::Extended => (bit < EXTENDED_BUTTON_COUNT).then_some(bit),
        }
    }
}

bitflags! {
    /// Object kinds an enumeration should visit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ObjectTypes: u8 {
        const AXIS   = 0x01;
        const BUTTON = 0x02;
        const HAT    = 0x04;
        const ALL    = Self::AXIS.bits() | Self::BUTTON.bits() | Self::HAT.bits();
    }
}

impl ObjectTypes {
    pub fn admits(self, kind: ObjectKind) -> bool {
        let bit = match kind {
            ObjectKind::Axis => ObjectTypes::AXIS,
            ObjectKind::Button => ObjectTypes::BUTTON,
            ObjectKind::Hat => ObjectTypes::HAT,
        };
        self.contains(bit)
    }
}

/// How an enumeration selects objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectFilter {
    /// Every object.
    Device,
    ByOffset(u32),
    ById(ObjectId),
}

impl ObjectFilter {
    pub fn matches(&self, object: &ObjectDescriptor) -> bool {
        match *self {
            ObjectFilter::Device => true,
            ObjectFilter::ByOffset(offset) => object.offset == offset,
            ObjectFilter::ById(id) => object.id == id,
        }
    }
}

/// Visit `layout`'s objects in table order.
///
/// Objects outside `types` or rejected by `filter` are skipped. The callback
/// receives the object index; returning `Break` stops the walk and the break
/// is handed back to the caller.
pub fn enumerate_objects<F>(
    layout: Layout,
    filter: ObjectFilter,
    types: ObjectTypes,
    mut f: F,
) -> ControlFlow<()>
where
    F: FnMut(usize, &ObjectDescriptor) -> ControlFlow<()>,
{
    for (index, object) in layout.objects().iter().enumerate() {
        if !types.admits(object.id.kind) || !filter.matches(object) {
            continue;
        }
        f(index, object)?;
    }
    ControlFlow::Continue(())
}

/// First object matching `filter`, with its index.
pub fn find_object(layout: Layout, filter: ObjectFilter) -> Option<(usize, &'static ObjectDescriptor)> {
    layout
        .objects()
        .iter()
        .enumerate()
        .find(|(_, o)| filter.matches(o))
}
