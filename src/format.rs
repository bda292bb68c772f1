//! Opcode Format
//!
//! Instruction types produced by the compiler and consumed by the runtime.
//! Inside the crate every opcode is a tagged variant; the packed `u32` words
//! only exist at the serialization boundary (`encode` / `decode`).

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE FLAGS
// ═══════════════════════════════════════════════════════════════════════════════

const MASK10: u32 = (1 << 10) - 1;
const MASK12: u32 = (1 << 12) - 1;

/// Maximum value of a 10-bit field (state slot count, dynamic children count,
/// state op offset).
pub const MAX_10BIT: u32 = MASK10;
/// Maximum value of a 12-bit prop op field (input index, data index, slot).
pub const MAX_12BIT: u32 = MASK12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TemplateFlags {
    pub svg: bool,
    /// Number of state slots, including slot 0 for the root node.
    pub state_slots: u32,
    pub dynamic_children: u32,
}

impl TemplateFlags {
    pub const CHILDREN_SIZE_SHIFT: u32 = 10;
    pub const SVG: u32 = 1 << 20;

    pub fn encode(&self) -> u32 {
        let svg = if self.svg { Self::SVG } else { 0 };
        svg | (self.state_slots & MASK10) | ((self.dynamic_children & MASK10) << Self::CHILDREN_SIZE_SHIFT)
    }

    pub fn decode(v: u32) -> Self {
        TemplateFlags {
            svg: v & Self::SVG != 0,
            state_slots: v & MASK10,
            dynamic_children: (v >> Self::CHILDREN_SIZE_SHIFT) & MASK10,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATE OPCODES
// ═══════════════════════════════════════════════════════════════════════════════

/// Traversal instruction used by the runtime to walk a freshly created tree
/// and store node references into slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateOp {
    /// Optionally save the current node, then move to its next sibling.
    Next { save: bool },
    /// Optionally save the current node, then run the next `offset` ops on
    /// its first child.
    Enter { offset: u32, save: bool },
    /// Remove the current anchor node; its next sibling takes the slot.
    Remove,
    /// Save the current node and stop.
    Save,
}

impl StateOp {
    pub const SAVE: u32 = 0b001;
    pub const ENTER_OR_REMOVE: u32 = 0b010;
    pub const NEXT: u32 = 0b100;
    pub const OFFSET_SHIFT: u32 = 3;

    /// Whether the runtime assigns a slot while executing this op.
    pub fn assigns_slot(&self) -> bool {
        match *self {
            StateOp::Next { save } | StateOp::Enter { save, .. } => save,
            StateOp::Remove | StateOp::Save => true,
        }
    }

    /// Whether the op moves the cursor (next sibling or into children).
    pub fn moves(&self) -> bool {
        matches!(self, StateOp::Next { .. } | StateOp::Enter { .. })
    }

    pub fn with_save(self) -> Self {
        match self {
            StateOp::Next { .. } => StateOp::Next { save: true },
            StateOp::Enter { offset, .. } => StateOp::Enter { offset, save: true },
            op => op,
        }
    }

    pub fn encode(&self) -> u32 {
        match *self {
            StateOp::Next { save } => Self::NEXT | save_bit(save),
            StateOp::Enter { offset, save } => {
                Self::ENTER_OR_REMOVE | ((offset & MASK10) << Self::OFFSET_SHIFT) | save_bit(save)
            }
            StateOp::Remove => Self::ENTER_OR_REMOVE,
            StateOp::Save => Self::SAVE,
        }
    }

    pub fn decode(v: u32) -> Option<Self> {
        let save = v & Self::SAVE != 0;
        let offset = (v >> Self::OFFSET_SHIFT) & MASK10;
        if v & Self::ENTER_OR_REMOVE != 0 {
            if offset == 0 {
                Some(StateOp::Remove)
            } else {
                Some(StateOp::Enter { offset, save })
            }
        } else if v & Self::NEXT != 0 {
            Some(StateOp::Next { save })
        } else if save {
            Some(StateOp::Save)
        } else {
            None
        }
    }
}

fn save_bit(save: bool) -> u32 {
    if save {
        StateOp::SAVE
    } else {
        0
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROP OPCODES
// ═══════════════════════════════════════════════════════════════════════════════

/// Properties the runtime assigns through a dedicated fast path.
///
/// The compiler only emits `ClassName`. `TextContent` and `InnerHtml` are
/// runtime codes that still decode, so hand-written or foreign op streams
/// round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommonProp {
    ClassName = 0,
    TextContent = 1,
    InnerHtml = 2,
}

impl CommonProp {
    fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(CommonProp::ClassName),
            1 => Some(CommonProp::TextContent),
            2 => Some(CommonProp::InnerHtml),
            _ => None,
        }
    }
}

/// Dynamic property binding. `input` indexes the dynamic expression table,
/// `data` indexes the static data table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropOp {
    SetNode { slot: u32 },
    Common { prop: CommonProp, input: u32 },
    Attribute { input: u32, data: u32 },
    Property { input: u32, data: u32 },
    DiffDomProperty { input: u32, data: u32 },
    Style { input: u32, data: u32 },
    Event { input: u32, data: u32 },
    Directive { input: u32 },
}

impl PropOp {
    pub const TYPE_MASK: u32 = 0b111;
    pub const INPUT_SHIFT: u32 = 3;
    pub const DATA_SHIFT: u32 = 15;

    const SET_NODE: u32 = 0;
    const COMMON: u32 = 1;
    const ATTRIBUTE: u32 = 2;
    const PROPERTY: u32 = 3;
    const DIFF_DOM_PROPERTY: u32 = 4;
    const STYLE: u32 = 5;
    const EVENT: u32 = 6;
    const DIRECTIVE: u32 = 7;

    /// Static data table index referenced by the op, if any.
    pub fn data_index(&self) -> Option<u32> {
        match *self {
            PropOp::Attribute { data, .. }
            | PropOp::Property { data, .. }
            | PropOp::DiffDomProperty { data, .. }
            | PropOp::Style { data, .. }
            | PropOp::Event { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Dynamic expression table index referenced by the op, if any.
    pub fn input_index(&self) -> Option<u32> {
        match *self {
            PropOp::SetNode { .. } => None,
            PropOp::Common { input, .. }
            | PropOp::Attribute { input, .. }
            | PropOp::Property { input, .. }
            | PropOp::DiffDomProperty { input, .. }
            | PropOp::Style { input, .. }
            | PropOp::Event { input, .. }
            | PropOp::Directive { input } => Some(input),
        }
    }

    pub fn encode(&self) -> u32 {
        let pack = |kind: u32, input: u32, data: u32| {
            kind | ((input & MASK12) << Self::INPUT_SHIFT) | ((data & MASK12) << Self::DATA_SHIFT)
        };
        match *self {
            PropOp::SetNode { slot } => pack(Self::SET_NODE, 0, slot),
            PropOp::Common { prop, input } => pack(Self::COMMON, input, prop as u32),
            PropOp::Attribute { input, data } => pack(Self::ATTRIBUTE, input, data),
            PropOp::Property { input, data } => pack(Self::PROPERTY, input, data),
            PropOp::DiffDomProperty { input, data } => pack(Self::DIFF_DOM_PROPERTY, input, data),
            PropOp::Style { input, data } => pack(Self::STYLE, input, data),
            PropOp::Event { input, data } => pack(Self::EVENT, input, data),
            PropOp::Directive { input } => pack(Self::DIRECTIVE, input, 0),
        }
    }

    pub fn decode(v: u32) -> Option<Self> {
        let input = (v >> Self::INPUT_SHIFT) & MASK12;
        let data = (v >> Self::DATA_SHIFT) & MASK12;
        let op = match v & Self::TYPE_MASK {
            Self::SET_NODE => PropOp::SetNode { slot: data },
            Self::COMMON => PropOp::Common {
                prop: CommonProp::from_u32(data)?,
                input,
            },
            Self::ATTRIBUTE => PropOp::Attribute { input, data },
            Self::PROPERTY => PropOp::Property { input, data },
            Self::DIFF_DOM_PROPERTY => PropOp::DiffDomProperty { input, data },
            Self::STYLE => PropOp::Style { input, data },
            Self::EVENT => PropOp::Event { input, data },
            _ => PropOp::Directive { input },
        };
        Some(op)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHILD OPCODES
// ═══════════════════════════════════════════════════════════════════════════════

/// Dynamic child placement. The runtime executes child ops of a parent in
/// order, inserting each `Child` before the node selected by `SetNext`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOp {
    Child { input: u32 },
    SetNext { slot: u32 },
    SetParent { slot: u32 },
}

impl ChildOp {
    pub const TYPE_MASK: u32 = 0b11;
    pub const VALUE_SHIFT: u32 = 2;

    const CHILD: u32 = 0;
    const SET_NEXT: u32 = 1;
    const SET_PARENT: u32 = 3;

    pub fn encode(&self) -> u32 {
        match *self {
            ChildOp::Child { input } => Self::CHILD | (input << Self::VALUE_SHIFT),
            ChildOp::SetNext { slot } => Self::SET_NEXT | (slot << Self::VALUE_SHIFT),
            ChildOp::SetParent { slot } => Self::SET_PARENT | (slot << Self::VALUE_SHIFT),
        }
    }

    pub fn decode(v: u32) -> Option<Self> {
        let value = v >> Self::VALUE_SHIFT;
        match v & Self::TYPE_MASK {
            Self::CHILD => Some(ChildOp::Child { input: value }),
            Self::SET_NEXT => Some(ChildOp::SetNext { slot: value }),
            Self::SET_PARENT => Some(ChildOp::SetParent { slot: value }),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SKELETON
// ═══════════════════════════════════════════════════════════════════════════════

/// Static markup of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Skeleton {
    /// Element without static attributes or children: only the tag name.
    Tag(String),
    /// Markup strings interleaved with hoisted source expression indices.
    Parts(Vec<SkeletonPart>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SkeletonPart {
    Text(String),
    Expr(usize),
}

/// Accumulates skeleton parts, merging adjacent markup strings.
#[derive(Debug, Default)]
pub(crate) struct SkeletonBuilder {
    parts: Vec<SkeletonPart>,
}

impl SkeletonBuilder {
    pub fn text(&mut self, s: &str) {
        match self.parts.last_mut() {
            Some(SkeletonPart::Text(last)) => last.push_str(s),
            _ => self.parts.push(SkeletonPart::Text(s.to_string())),
        }
    }

    pub fn expr(&mut self, index: usize) {
        self.parts.push(SkeletonPart::Expr(index));
    }

    pub fn take(&mut self) -> Vec<SkeletonPart> {
        std::mem::take(&mut self.parts)
    }

    pub fn clear(&mut self) {
        self.parts.clear();
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERDE (packed words)
// ═══════════════════════════════════════════════════════════════════════════════

macro_rules! packed_serde {
    ($ty:ty, $what:literal) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_u32(self.encode())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let v = u32::deserialize(deserializer)?;
                <$ty>::decode(v).ok_or_else(|| {
                    serde::de::Error::custom(format!("invalid {} word: {}", $what, v))
                })
            }
        }
    };
}

packed_serde!(StateOp, "state opcode");
packed_serde!(PropOp, "prop opcode");
packed_serde!(ChildOp, "child opcode");

impl Serialize for TemplateFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.encode())
    }
}

impl<'de> Deserialize<'de> for TemplateFlags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u32::deserialize(deserializer).map(TemplateFlags::decode)
    }
}
