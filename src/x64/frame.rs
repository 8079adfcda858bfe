//! Stack frame of spilled colors.

use super::registers::WORD_SIZE;
use bumpalo::{collections::Vec as BumpVec, Bump};

/// Spill slots of one function, each one word wide, addressed upward from `rsp`.
pub struct StackFrame<'a> {
    /// `rsp`-relative offset of each slot, by slot index.
    spill_slots: BumpVec<'a, u32>,
}

impl<'a> StackFrame<'a> {
    /// Create an empty frame using the provided arena.
    pub fn new(arena: &'a Bump) -> Self {
        Self {
            spill_slots: BumpVec::new_in(arena),
        }
    }

    /// Allocate the next slot and return its offset.
    pub fn allocate_spill_slot(&mut self) -> u32 {
        let offset = self.spill_slots.len() as u32 * WORD_SIZE;
        self.spill_slots.push(offset);
        offset
    }

    pub fn slot_offset(&self, index: usize) -> Option<u32> {
        self.spill_slots.get(index).copied()
    }

    pub fn slot_count(&self) -> usize {
        self.spill_slots.len()
    }

    /// Bytes taken by the spill slots: slot count times the word size.
    pub fn frame_size(&self) -> u32 {
        self.spill_slots.len() as u32 * WORD_SIZE
    }

    /// Frame size rounded up to the 16-byte stack alignment of the System V ABI.
    pub fn aligned_frame_size(&self) -> u32 {
        self.frame_size().div_ceil(16) * 16
    }
}

impl std::fmt::Debug for StackFrame<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackFrame")
            .field("spill_slots", &&self.spill_slots[..])
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_are_consecutive_words() {
        let arena = Bump::new();
        let mut frame = StackFrame::new(&arena);

        assert_eq!(frame.allocate_spill_slot(), 0);
        assert_eq!(frame.allocate_spill_slot(), 8);
        assert_eq!(frame.allocate_spill_slot(), 16);
        assert_eq!(frame.slot_offset(1), Some(8));
        assert_eq!(frame.slot_offset(3), None);
    }

    #[test]
    fn test_frame_size() {
        let arena = Bump::new();
        let mut frame = StackFrame::new(&arena);
        assert_eq!(frame.frame_size(), 0);
        assert_eq!(frame.aligned_frame_size(), 0);

        for _ in 0..3 {
            frame.allocate_spill_slot();
        }
        assert_eq!(frame.slot_count(), 3);
        assert_eq!(frame.frame_size(), 24);
        assert_eq!(frame.aligned_frame_size(), 32);
    }
}
