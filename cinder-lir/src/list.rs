use cinder_hir::{BlockId, Condition, Kind};

use crate::debug::{CodePosition, DebugInfo};
use crate::op::{Barriers, BranchTarget, LirOp, MoveKind};
use crate::operand::Operand;

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct LabelId(pub u32);

/// Labels of one method; each label is bound exactly once.
pub struct LabelTable {
    labels: Vec<Option<CodePosition>>,
}

impl LabelTable {
    pub fn new() -> LabelTable {
        LabelTable { labels: Vec::new() }
    }

    pub fn create_label(&mut self) -> LabelId {
        self.labels.push(None);
        LabelId((self.labels.len() - 1) as u32)
    }

    pub fn bind(&mut self, label: LabelId, pos: CodePosition) {
        let idx = label.0 as usize;
        assert!(self.labels[idx].is_none(), "bind label twice");
        self.labels[idx] = Some(pos);
    }

    pub fn position(&self, label: LabelId) -> Option<CodePosition> {
        self.labels[label.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn all_bound(&self) -> bool {
        self.labels.iter().all(|pos| pos.is_some())
    }
}

/// Ops of one block in emission order.
#[derive(Debug)]
pub struct LirList {
    block: BlockId,
    ops: Vec<LirOp>,
}

impl LirList {
    pub fn new(block: BlockId) -> LirList {
        LirList {
            block,
            ops: Vec::new(),
        }
    }

    pub fn block(&self) -> BlockId {
        self.block
    }

    pub fn ops(&self) -> &[LirOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn last(&self) -> Option<&LirOp> {
        self.ops.last()
    }

    /// Position the next appended op will get.
    pub fn next_position(&self) -> CodePosition {
        CodePosition {
            block: self.block,
            op: self.ops.len() as u32,
        }
    }

    pub fn append(&mut self, op: LirOp) -> CodePosition {
        let pos = self.next_position();
        self.ops.push(op);
        pos
    }

    pub fn move_(&mut self, src: Operand, dst: Operand) {
        self.append(LirOp::Move {
            src,
            dst,
            kind: MoveKind::Normal,
            info: None,
        });
    }

    pub fn move_with(&mut self, src: Operand, dst: Operand, kind: MoveKind, info: Option<DebugInfo>) {
        self.append(LirOp::Move {
            src,
            dst,
            kind,
            info,
        });
    }

    pub fn cmp(&mut self, cond: Condition, x: Operand, y: Operand) {
        self.append(LirOp::Cmp { cond, x, y });
    }

    pub fn branch(&mut self, cond: Condition, kind: Kind, target: BranchTarget) {
        self.append(LirOp::Branch {
            cond,
            kind,
            target,
            unordered: None,
            info: None,
        });
    }

    pub fn branch_float(&mut self, cond: Condition, kind: Kind, target: BlockId, unordered: BlockId) {
        self.append(LirOp::Branch {
            cond,
            kind,
            target: BranchTarget::Block(target),
            unordered: Some(unordered),
            info: None,
        });
    }

    pub fn jump(&mut self, target: BranchTarget) {
        self.append(LirOp::Jump { target, info: None });
    }

    pub fn membar(&mut self, barriers: Barriers) {
        self.append(LirOp::MemoryBarrier(barriers));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic]
    fn test_bind_label_twice() {
        let mut labels = LabelTable::new();
        let lbl = labels.create_label();
        let pos = CodePosition {
            block: BlockId(0),
            op: 0,
        };

        labels.bind(lbl, pos);
        labels.bind(lbl, pos);
    }

    #[test]
    fn test_labels() {
        let mut labels = LabelTable::new();
        let first = labels.create_label();
        let second = labels.create_label();
        let pos = CodePosition {
            block: BlockId(1),
            op: 4,
        };

        labels.bind(second, pos);
        assert_eq!(labels.position(second), Some(pos));
        assert_eq!(labels.position(first), None);
        assert!(!labels.all_bound());
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn test_positions() {
        let mut list = LirList::new(BlockId(3));
        assert_eq!(list.append(LirOp::BlockLabel(BlockId(3))).op, 0);
        list.move_(Operand::int(1), Operand::variable(0, Kind::Int));
        list.jump(BranchTarget::Block(BlockId(4)));

        assert_eq!(list.len(), 3);
        assert_eq!(list.next_position().op, 3);
        assert!(list.last().map_or(false, |op| op.is_block_end()));
    }
}
