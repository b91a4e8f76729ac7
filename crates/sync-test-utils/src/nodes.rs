//! [`NodeTable`]: generational node handles for notification tests.

use parking_lot::Mutex;
use sync_fs::{NodeHandle, NodeLiveness};

/// Slot table handing out [`NodeHandle`]s. Removing a node bumps its slot's
/// generation so older handles stop resolving.
#[derive(Debug, Default)]
pub struct NodeTable {
    slots: Mutex<Vec<(u32, bool)>>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self) -> NodeHandle {
        let mut slots = self.slots.lock();
        if let Some(index) = slots.iter().position(|(_, live)| !live) {
            let slot = &mut slots[index];
            slot.1 = true;
            return NodeHandle::new(index as u32, slot.0);
        }
        slots.push((0, true));
        NodeHandle::new((slots.len() - 1) as u32, 0)
    }

    pub fn remove(&self, node: NodeHandle) {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get_mut(node.index() as usize) {
            if slot.0 == node.generation() && slot.1 {
                slot.0 += 1;
                slot.1 = false;
            }
        }
    }
}

impl NodeLiveness for NodeTable {
    fn is_live(&self, node: NodeHandle) -> bool {
        self.slots
            .lock()
            .get(node.index() as usize)
            .is_some_and(|(generation, live)| *live && *generation == node.generation())
    }
}
