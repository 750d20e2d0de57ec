use cinder_hir::Kind;

use crate::cpu::{arm64, x64, Register};
use crate::op::StubId;
use crate::operand::{Address, Operand, StackSlot};
use crate::target::{Arch, CallingConvention, Target};

// monitors take two words: displaced header and object
const MONITOR_WORDS: u32 = 2;

/// Frame layout requests of one method: incoming arguments, the outgoing
/// argument area and reserved stack areas. Reserved areas are addressed
/// relative to the frame pointer with negative offsets, outgoing arguments
/// relative to the stack pointer.
#[derive(Debug)]
pub struct FrameMap {
    word_size: u32,
    fp: Register,
    incoming: Option<CallingConvention>,
    outgoing_size: u32,
    reserved_size: u32,
    stack_blocks: Vec<StackBlock>,
    monitors: Vec<i32>,
    used_stubs: Vec<StubId>,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct StackBlock {
    pub offset: i32,
    pub size: u32,
}

impl FrameMap {
    pub fn new(target: &Target) -> FrameMap {
        let fp = match target.arch {
            Arch::X64 => x64::REG_FP.into(),
            Arch::Arm64 => arm64::REG_FP.into(),
        };

        FrameMap {
            word_size: target.word_size,
            fp,
            incoming: None,
            outgoing_size: 0,
            reserved_size: 0,
            stack_blocks: Vec::new(),
            monitors: Vec::new(),
            used_stubs: Vec::new(),
        }
    }

    pub fn set_incoming(&mut self, cc: CallingConvention) {
        assert!(self.incoming.is_none(), "incoming arguments set twice");
        self.incoming = Some(cc);
    }

    pub fn incoming(&self) -> Option<&CallingConvention> {
        self.incoming.as_ref()
    }

    /// Grows the outgoing argument area to at least `size` bytes.
    pub fn adjust_outgoing_stack_size(&mut self, size: u32) {
        self.outgoing_size = self.outgoing_size.max(size);
    }

    pub fn outgoing_size(&self) -> u32 {
        self.outgoing_size
    }

    pub fn reserved_size(&self) -> u32 {
        self.reserved_size
    }

    fn reserve(&mut self, size: u32) -> i32 {
        let size = align(size, self.word_size);
        self.reserved_size += size;
        -(self.reserved_size as i32)
    }

    pub fn reserve_stack_block(&mut self, size: u32) -> StackBlock {
        let offset = self.reserve(size);
        let block = StackBlock { offset, size };
        self.stack_blocks.push(block);
        block
    }

    pub fn stack_blocks(&self) -> &[StackBlock] {
        &self.stack_blocks
    }

    /// Slot of kind `kind` at byte `disp` inside `block`.
    pub fn stack_block_slot(&self, block: StackBlock, disp: i32, kind: Kind) -> Operand {
        assert!(disp >= 0 && (disp as u32) < block.size);
        Operand::StackSlot(StackSlot {
            offset: block.offset + disp,
            kind,
            in_caller_frame: false,
        })
    }

    /// Address of the start of `block`, for passing it to the runtime.
    pub fn stack_block_address(&self, block: StackBlock) -> Address {
        Address::new(Operand::Register(self.fp, Kind::Word), block.offset, Kind::Word)
    }

    pub fn monitor_count(&self) -> usize {
        self.monitors.len()
    }

    pub fn monitor_address(&mut self, lock_index: u32) -> Address {
        while self.monitors.len() <= lock_index as usize {
            let offset = self.reserve(MONITOR_WORDS * self.word_size);
            self.monitors.push(offset);
        }

        let offset = self.monitors[lock_index as usize];
        Address::new(Operand::Register(self.fp, Kind::Word), offset, Kind::Word)
    }

    pub fn uses_stub(&mut self, stub: StubId) {
        if !self.used_stubs.contains(&stub) {
            self.used_stubs.push(stub);
        }
    }

    pub fn used_stubs(&self) -> &[StubId] {
        &self.used_stubs
    }
}

pub fn align(value: u32, align: u32) -> u32 {
    if align == 0 {
        return value;
    }

    (value + align - 1) / align * align
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align() {
        assert_eq!(align(0, 8), 0);
        assert_eq!(align(1, 8), 8);
        assert_eq!(align(16, 8), 16);
        assert_eq!(align(12, 0), 12);
    }

    #[test]
    fn test_reserved_areas_do_not_overlap() {
        let mut frame = FrameMap::new(&Target::x64());
        let dims = frame.reserve_stack_block(12);
        let monitor = frame.monitor_address(0);
        let monitor_again = frame.monitor_address(0);

        assert_eq!(dims.offset, -16);
        assert_eq!(monitor.disp, -32);
        assert_eq!(monitor, monitor_again);
        assert_eq!(frame.reserved_size(), 32);
        assert_eq!(frame.monitor_count(), 1);

        let third = frame.monitor_address(2);
        assert_eq!(third.disp, -64);
        assert_eq!(frame.monitor_count(), 3);
    }

    #[test]
    fn test_outgoing_area_grows() {
        let mut frame = FrameMap::new(&Target::arm64());
        frame.adjust_outgoing_stack_size(16);
        frame.adjust_outgoing_stack_size(8);
        assert_eq!(frame.outgoing_size(), 16);
    }

    #[test]
    fn test_used_stubs_unique() {
        let mut frame = FrameMap::new(&Target::x64());
        frame.uses_stub(StubId(3));
        frame.uses_stub(StubId(1));
        frame.uses_stub(StubId(3));
        assert_eq!(frame.used_stubs(), &[StubId(3), StubId(1)]);
    }

    #[test]
    #[should_panic]
    fn test_incoming_set_twice() {
        let target = Target::x64();
        let mut frame = FrameMap::new(&target);
        frame.set_incoming(target.calling_convention(crate::CallingConventionType::JavaCallee, &[]));
        frame.set_incoming(target.calling_convention(crate::CallingConventionType::JavaCallee, &[]));
    }
}
