use fixedbitset::FixedBitSet;

use cinder_hir::{InstId, Kind};
use cinder_lir::{Operand, Variable};

use crate::error::{Bailout, LowerResult};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum VariableFlag {
    MustStartInMemory,
    MustStayInMemory,
    CalleeSaved,
    MustBeByteRegister,
}

const FLAG_COUNT: usize = 4;

impl VariableFlag {
    fn index(self) -> usize {
        match self {
            VariableFlag::MustStartInMemory => 0,
            VariableFlag::MustStayInMemory => 1,
            VariableFlag::CalleeSaved => 2,
            VariableFlag::MustBeByteRegister => 3,
        }
    }
}

/// Variables of one compilation, numbered densely from zero.
pub struct OperandPool {
    kinds: Vec<Kind>,
    flags: [FixedBitSet; FLAG_COUNT],
    limit: u32,
}

impl OperandPool {
    pub fn new(limit: u32) -> OperandPool {
        OperandPool {
            kinds: Vec::new(),
            flags: [
                FixedBitSet::new(),
                FixedBitSet::new(),
                FixedBitSet::new(),
                FixedBitSet::new(),
            ],
            limit,
        }
    }

    pub fn new_variable(&mut self, kind: Kind) -> LowerResult<Operand> {
        let kind = kind.stack_kind();
        assert!(kind.is_legal(), "variable of kind {:?}", kind);

        if self.kinds.len() as u32 >= self.limit {
            return Err(Bailout::TooManyVariables(self.limit));
        }

        let index = self.kinds.len() as u32;
        self.kinds.push(kind);

        for flags in self.flags.iter_mut() {
            flags.grow(self.kinds.len());
        }

        Ok(Operand::variable(index, kind))
    }

    pub fn variable_count(&self) -> u32 {
        self.kinds.len() as u32
    }

    pub fn kind(&self, var: Variable) -> Kind {
        self.kinds[var.index as usize]
    }

    pub fn set_flag(&mut self, var: Variable, flag: VariableFlag) {
        self.flags[flag.index()].insert(var.index as usize);
    }

    pub fn has_flag(&self, var: Variable, flag: VariableFlag) -> bool {
        self.flags[flag.index()].contains(var.index as usize)
    }
}

/// Operand of each instruction, indexed by instruction. An instruction's
/// operand is assigned at most once.
pub struct OperandMap {
    operands: Vec<Operand>,
    definitions: Vec<Option<InstId>>,
}

impl OperandMap {
    pub fn new(inst_count: usize) -> OperandMap {
        OperandMap {
            operands: vec![Operand::Illegal; inst_count],
            definitions: Vec::new(),
        }
    }

    /// Operand of `inst`, `Operand::Illegal` while unassigned.
    pub fn get(&self, inst: InstId) -> Operand {
        self.operands[inst.index()].clone()
    }

    pub fn is_set(&self, inst: InstId) -> bool {
        self.operands[inst.index()].is_legal()
    }

    pub fn set(&mut self, inst: InstId, operand: Operand) {
        assert!(
            operand.is_legal(),
            "illegal operand for instruction {}",
            inst.index()
        );
        assert!(
            !operand.is_register(),
            "register {} as result of instruction {}",
            operand,
            inst.index()
        );

        let slot = &mut self.operands[inst.index()];
        assert!(
            slot.is_illegal(),
            "instruction {} already has operand {}",
            inst.index(),
            slot
        );
        *slot = operand.clone();

        if let Some(var) = operand.as_variable() {
            let idx = var.index as usize;
            if self.definitions.len() <= idx {
                self.definitions.resize(idx + 1, None);
            }
            self.definitions[idx] = Some(inst);
        }
    }

    /// Instruction whose result lives in `var`.
    pub fn definition(&self, var: Variable) -> Option<InstId> {
        self.definitions.get(var.index as usize).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_hir::{GraphBuilder, MethodData, Program};
    use cinder_lir::cpu::x64::RAX;

    fn two_insts() -> (InstId, InstId, usize) {
        let mut prog = Program::new();
        let holder = prog.add_class("Foo", None);
        let method = prog.add_method(MethodData {
            name: "bar".into(),
            holder,
            params: vec![Kind::Int],
            return_kind: Kind::Void,
            is_static: true,
            vtable_index: None,
            is_resolved: true,
        });
        let mut b = GraphBuilder::new(&prog, method);
        let one = b.int(1);
        let graph = b.finish();
        (graph.locals[0], one, graph.inst_count())
    }

    #[test]
    fn test_variables_are_dense() {
        let mut pool = OperandPool::new(10);
        let first = pool.new_variable(Kind::Byte).unwrap();
        let second = pool.new_variable(Kind::Double).unwrap();

        assert_eq!(first, Operand::variable(0, Kind::Int));
        assert_eq!(second, Operand::variable(1, Kind::Double));
        assert_eq!(pool.variable_count(), 2);
    }

    #[test]
    fn test_variable_limit() {
        let mut pool = OperandPool::new(1);
        assert!(pool.new_variable(Kind::Int).is_ok());
        assert_eq!(
            pool.new_variable(Kind::Int),
            Err(Bailout::TooManyVariables(1))
        );
    }

    #[test]
    fn test_flags() {
        let mut pool = OperandPool::new(10);
        let var = pool.new_variable(Kind::Long).unwrap().as_variable().unwrap();
        let other = pool.new_variable(Kind::Int).unwrap().as_variable().unwrap();

        pool.set_flag(var, VariableFlag::MustStartInMemory);
        assert!(pool.has_flag(var, VariableFlag::MustStartInMemory));
        assert!(!pool.has_flag(var, VariableFlag::MustStayInMemory));
        assert!(!pool.has_flag(other, VariableFlag::MustStartInMemory));
    }

    #[test]
    fn test_operand_map() {
        let (local, constant, count) = two_insts();
        let mut map = OperandMap::new(count);

        assert!(map.get(local).is_illegal());
        map.set(local, Operand::variable(4, Kind::Int));
        map.set(constant, Operand::int(1));

        assert_eq!(map.get(local), Operand::variable(4, Kind::Int));
        assert_eq!(
            map.definition(Variable {
                index: 4,
                kind: Kind::Int
            }),
            Some(local)
        );
        assert_eq!(
            map.definition(Variable {
                index: 0,
                kind: Kind::Int
            }),
            None
        );
    }

    #[test]
    #[should_panic(expected = "already has operand")]
    fn test_operand_assigned_twice() {
        let (local, _, count) = two_insts();
        let mut map = OperandMap::new(count);
        map.set(local, Operand::variable(0, Kind::Int));
        map.set(local, Operand::variable(1, Kind::Int));
    }

    #[test]
    #[should_panic]
    fn test_register_result_rejected() {
        let (local, _, count) = two_insts();
        let mut map = OperandMap::new(count);
        map.set(local, Operand::register(RAX, Kind::Int));
    }
}
