use cinder_hir::{InstId, Kind};
use cinder_lir::Operand;

use crate::error::LowerResult;
use crate::operands::VariableFlag;
use crate::selector::InstructionSelector;

/// Operand of an instruction used as input of the instruction being
/// selected. The producer is selected on creation; the `load_*` methods
/// bring the value into the form the consumer needs and may append moves
/// to the current block. The producer's own operand is never changed.
pub struct LirItem {
    value: InstId,
    result: Operand,
    destroys_register: bool,
}

impl LirItem {
    pub fn new(sel: &mut InstructionSelector, value: InstId) -> LowerResult<LirItem> {
        let result = sel.operand(value)?;

        Ok(LirItem {
            value,
            result,
            destroys_register: false,
        })
    }

    pub fn value(&self) -> InstId {
        self.value
    }

    pub fn result(&self) -> Operand {
        self.result.clone()
    }

    pub fn kind(&self) -> Kind {
        self.result.kind()
    }

    pub fn is_constant(&self) -> bool {
        self.result.is_constant()
    }

    /// The consumer overwrites the operand, so loading always copies.
    pub fn set_destroys_register(&mut self) {
        self.destroys_register = true;
    }

    pub fn load_item(&mut self, sel: &mut InstructionSelector) -> LowerResult<()> {
        if self.destroys_register {
            let copy = sel.new_variable(self.result.kind())?;
            sel.lir().move_(self.result.clone(), copy.clone());
            self.result = copy;
        } else if let Some(value) = self.result.as_constant() {
            self.result = sel.load_constant(value)?;
        } else if !self.result.is_variable_or_register() {
            let var = sel.new_variable(self.result.kind())?;
            sel.lir().move_(self.result.clone(), var.clone());
            self.result = var;
        }

        Ok(())
    }

    /// Moves the value into exactly `target`.
    pub fn load_item_force(&mut self, sel: &mut InstructionSelector, target: Operand) -> LowerResult<()> {
        if self.result == target {
            return Ok(());
        }

        let mut value = self.result.clone();

        if !value.is_constant() && value.kind().stack_kind() != target.kind().stack_kind() {
            value = sel.force_to_spill(value, target.kind(), false)?;
        }

        sel.lir().move_(value, target.clone());
        self.result = target;
        Ok(())
    }

    pub fn load_byte_item(&mut self, sel: &mut InstructionSelector) -> LowerResult<()> {
        self.load_item(sel)?;

        if !sel.target.needs_byte_registers {
            return Ok(());
        }

        if let Some(var) = self.result.as_variable() {
            if sel.pool.has_flag(var, VariableFlag::MustBeByteRegister) {
                return Ok(());
            }
        }

        let byte = sel.new_variable(Kind::Int)?;
        if let Some(var) = byte.as_variable() {
            sel.pool.set_flag(var, VariableFlag::MustBeByteRegister);
        }
        sel.lir().move_(self.result.clone(), byte.clone());
        self.result = byte;
        Ok(())
    }

    /// Keeps constants the target can encode in the instruction.
    pub fn load_nonconstant(&mut self, sel: &mut InstructionSelector) -> LowerResult<()> {
        if let Some(value) = self.result.as_constant() {
            if sel.target.can_inline_constant(value) {
                return Ok(());
            }
        }

        self.load_item(sel)
    }

    /// Loads the value for a store to memory of kind `kind`.
    pub fn load_for_store(&mut self, sel: &mut InstructionSelector, kind: Kind) -> LowerResult<()> {
        if let Some(value) = self.result.as_constant() {
            if sel.target.can_store_as_constant(value, kind) {
                return Ok(());
            }
        }

        if kind.is_byte_sized() {
            self.load_byte_item(sel)
        } else {
            self.load_item(sel)
        }
    }
}
