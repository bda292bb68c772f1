//! OpCode emitter.
//!
//! Lowers the parsed element arena into flat prop/child op streams. Slots are
//! numbered first, so forward references from child ops into the state op
//! stream can be resolved by index.

use crate::error::{CompilerError, ERR_INTERNAL};
use crate::format::{ChildOp, PropOp, StateOp};
use crate::parse::{NodeId, ParsedElement, PendingChildOp};

/// Slot numbers for state ops, indexed like the state op stream.
pub(crate) struct SlotTable {
    slots: Vec<Option<u32>>,
    /// Slot count including slot 0 (the root node).
    pub size: u32,
}

impl SlotTable {
    /// Numbers every slot-assigning state op in creation order, starting at 1.
    pub fn assign(state_ops: &[StateOp]) -> Self {
        let mut size = 1;
        let slots = state_ops
            .iter()
            .map(|op| {
                if op.assigns_slot() {
                    let slot = size;
                    size += 1;
                    Some(slot)
                } else {
                    None
                }
            })
            .collect();
        SlotTable { slots, size }
    }

    pub fn get(&self, state_index: usize) -> Option<u32> {
        self.slots.get(state_index).copied().flatten()
    }
}

pub(crate) struct Emitter<'t> {
    nodes: &'t [ParsedElement],
    slots: &'t SlotTable,
    pub prop_ops: Vec<PropOp>,
    pub child_ops: Vec<ChildOp>,
}

impl<'t> Emitter<'t> {
    pub fn new(nodes: &'t [ParsedElement], slots: &'t SlotTable) -> Self {
        Emitter {
            nodes,
            slots,
            prop_ops: Vec::new(),
            child_ops: Vec::new(),
        }
    }

    pub fn emit(&mut self, id: NodeId) -> Result<(), CompilerError> {
        let nodes = self.nodes;
        let element = &nodes[id];
        let element_slot = element.state_index.and_then(|si| self.slots.get(si));

        if !element.prop_ops.is_empty() {
            if let Some(slot) = element_slot {
                self.prop_ops.push(PropOp::SetNode { slot });
            }
            self.prop_ops.extend_from_slice(&element.prop_ops);
        }

        if !element.child_ops.is_empty() {
            if let Some(slot) = element_slot {
                self.child_ops.push(ChildOp::SetParent { slot });
            }
            // Children are inserted from the last one, each before the
            // node selected by the preceding `SetNext`.
            for op in element.child_ops.iter().rev() {
                let op = match *op {
                    PendingChildOp::Child { input } => ChildOp::Child { input },
                    PendingChildOp::SetNext { state_index } => {
                        let slot = self.slots.get(state_index).ok_or_else(|| {
                            CompilerError::new(ERR_INTERNAL, "unresolved child anchor", 0, 0)
                        })?;
                        ChildOp::SetNext { slot }
                    }
                };
                self.child_ops.push(op);
            }
        }

        for &child in &element.children {
            self.emit(child)?;
        }
        Ok(())
    }
}
