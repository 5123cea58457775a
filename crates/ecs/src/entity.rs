use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Generational entity handle.
///
/// When an entity is destroyed its slot index is recycled with a bumped
/// generation, so a handle kept past destruction never resolves to the
/// entity that reuses the slot.
///
/// Ordering is by slot index, then generation. Systems iterate in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityHandle {
    index: u32,
    generation: u32,
}

impl EntityHandle {
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    generation: u32,
    alive: bool,
}

/// Hands out and recycles [`EntityHandle`]s.
///
/// Freed slots are reused oldest-first.
#[derive(Debug, Clone, Default)]
pub struct EntityAllocator {
    slots: Vec<Slot>,
    free: VecDeque<u32>,
    live: usize,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> EntityHandle {
        self.live += 1;
        if let Some(index) = self.free.pop_front() {
            let slot = &mut self.slots[index as usize];
            slot.alive = true;
            return EntityHandle {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            alive: true,
        });
        EntityHandle {
            index,
            generation: 0,
        }
    }

    /// Release a handle. Returns false for stale or already-freed handles.
    pub fn free(&mut self, handle: EntityHandle) -> bool {
        if !self.is_alive(handle) {
            return false;
        }
        let slot = &mut self.slots[handle.index as usize];
        slot.alive = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push_back(handle.index);
        self.live -= 1;
        true
    }

    pub fn is_alive(&self, handle: EntityHandle) -> bool {
        self.slots
            .get(handle.index as usize)
            .is_some_and(|s| s.alive && s.generation == handle.generation)
    }

    pub fn live_count(&self) -> usize {
        self.live
    }
}
