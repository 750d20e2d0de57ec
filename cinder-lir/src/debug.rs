use cinder_hir::{BlockId, ExceptionHandler, MethodId, RuntimeCall, StateId};

use crate::list::LirList;
use crate::op::{CallKind, LirOp};

/// Source state of one code position, for deoptimization, exception
/// dispatch and root scanning.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct DebugInfo {
    pub bci: u32,
    pub state: StateId,
    pub handlers: Vec<ExceptionHandler>,
    pub exception_edge: Option<BlockId>,
}

impl DebugInfo {
    pub fn new(bci: u32, state: StateId, handlers: Vec<ExceptionHandler>) -> DebugInfo {
        DebugInfo {
            bci,
            state,
            handlers,
            exception_edge: None,
        }
    }

    pub fn with_exception_edge(mut self, edge: Option<BlockId>) -> DebugInfo {
        self.exception_edge = edge;
        self
    }

    pub fn has_handlers(&self) -> bool {
        !self.handlers.is_empty()
    }
}

/// Position of an op: block and index in the block's op list.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
pub struct CodePosition {
    pub block: BlockId,
    pub op: u32,
}

pub struct DebugInfoTable {
    entries: Vec<(CodePosition, DebugInfo)>,
}

impl DebugInfoTable {
    pub fn new() -> DebugInfoTable {
        DebugInfoTable {
            entries: Vec::new(),
        }
    }

    /// All infos of the op at `pos`.
    pub fn get(&self, pos: CodePosition) -> Vec<&DebugInfo> {
        let result = self.entries.binary_search_by_key(&pos, |&(pos, _)| pos);

        match result {
            Ok(mut idx) => {
                while idx > 0 && self.entries[idx - 1].0 == pos {
                    idx -= 1;
                }

                let mut infos = Vec::new();
                while idx < self.entries.len() && self.entries[idx].0 == pos {
                    infos.push(&self.entries[idx].1);
                    idx += 1;
                }
                infos
            }
            Err(_) => Vec::new(),
        }
    }

    pub fn insert(&mut self, pos: CodePosition, info: DebugInfo) {
        if let Some(last) = self.entries.last() {
            debug_assert!(pos >= last.0);
        }

        self.entries.push((pos, info));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(CodePosition, DebugInfo)> {
        self.entries.iter()
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum CallSite {
    Direct(MethodId),
    Indirect(MethodId),
    Runtime(RuntimeCall),
    /// Call emitted by a code template.
    Template(&'static str),
}

pub struct CallSiteTable {
    entries: Vec<(CodePosition, CallSite)>,
}

impl CallSiteTable {
    pub fn new() -> CallSiteTable {
        CallSiteTable {
            entries: Vec::new(),
        }
    }

    pub fn get(&self, pos: CodePosition) -> Option<&CallSite> {
        let result = self.entries.binary_search_by_key(&pos, |&(pos, _)| pos);

        match result {
            Ok(idx) => Some(&self.entries[idx].1),
            Err(_) => None,
        }
    }

    pub fn insert(&mut self, pos: CodePosition, site: CallSite) {
        if let Some(last) = self.entries.last() {
            debug_assert!(pos > last.0);
        }

        self.entries.push((pos, site));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(CodePosition, CallSite)> {
        self.entries.iter()
    }
}

/// Builds the debug info and call site tables from finished blocks, which
/// must be ordered by block id.
pub fn collect_tables(blocks: &[LirList]) -> (DebugInfoTable, CallSiteTable) {
    let mut infos = DebugInfoTable::new();
    let mut calls = CallSiteTable::new();

    for list in blocks {
        for (idx, op) in list.ops().iter().enumerate() {
            let pos = CodePosition {
                block: list.block(),
                op: idx as u32,
            };

            for info in op.infos() {
                infos.insert(pos, info.clone());
            }

            let site = match op {
                LirOp::Call(call) => Some(match call.kind {
                    CallKind::Direct(method) => CallSite::Direct(method),
                    CallKind::Indirect(method) => CallSite::Indirect(method),
                    CallKind::Runtime(call) => CallSite::Runtime(call),
                }),
                LirOp::Xir(xir) if xir.template.has_call() => {
                    Some(CallSite::Template(xir.template.name))
                }
                _ => None,
            };

            if let Some(site) = site {
                calls.insert(pos, site);
            }
        }
    }

    (infos, calls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::{BranchTarget, CallOp};
    use crate::operand::Operand;
    use cinder_hir::{GraphBuilder, Kind, MethodData, Program};

    fn state() -> StateId {
        let mut prog = Program::new();
        let holder = prog.add_class("Foo", None);
        let method = prog.add_method(MethodData {
            name: "bar".into(),
            holder,
            params: Vec::new(),
            return_kind: Kind::Void,
            is_static: true,
            vtable_index: None,
            is_resolved: true,
        });
        let builder = GraphBuilder::new(&prog, method);
        builder.current_state().unwrap()
    }

    #[test]
    fn test_collect_tables() {
        let state = state();
        let info = DebugInfo::new(7, state, Vec::new());

        let mut first = LirList::new(BlockId(0));
        first.append(LirOp::BlockLabel(BlockId(0)));
        first.append(LirOp::Call(CallOp {
            kind: CallKind::Runtime(RuntimeCall::ThrowNullPointer),
            result: Operand::Illegal,
            arguments: Vec::new(),
            info: Some(info.clone()),
            pointer_slots: Vec::new(),
        }));
        first.jump(BranchTarget::Block(BlockId(1)));

        let mut second = LirList::new(BlockId(1));
        second.append(LirOp::BlockLabel(BlockId(1)));
        second.append(LirOp::Safepoint { info: info.clone() });

        let (infos, calls) = collect_tables(&[first, second]);
        assert_eq!(infos.len(), 2);
        assert_eq!(calls.len(), 1);

        let call_pos = CodePosition {
            block: BlockId(0),
            op: 1,
        };
        assert_eq!(infos.get(call_pos), vec![&info]);
        assert_eq!(
            calls.get(call_pos),
            Some(&CallSite::Runtime(RuntimeCall::ThrowNullPointer))
        );
        assert!(calls
            .get(CodePosition {
                block: BlockId(1),
                op: 1
            })
            .is_none());
    }
}
