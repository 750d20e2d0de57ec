use cinder_hir::{InstId, Kind, TypeId};
use cinder_lir::{LirOp, Operand};

use crate::error::{Bailout, LowerResult};
use crate::item::LirItem;
use crate::selector::InstructionSelector;
use crate::templates::{TemplateSnippet, XirArgument};

impl<'a> InstructionSelector<'a> {
    /// Allocation and type checks may call into the runtime and always
    /// carry the state before.
    fn emit_object_xir(
        &mut self,
        id: InstId,
        snippet: Option<TemplateSnippet>,
        name: &'static str,
    ) -> LowerResult<Operand> {
        let snippet = snippet.ok_or(Bailout::MissingTemplate(name))?;
        let info = self.info_before(id)?;
        self.emit_xir(&snippet, info, None, None, Some(id))
    }

    pub(super) fn do_new_instance(&mut self, id: InstId, ty: TypeId) -> LowerResult<()> {
        let snippet = self.templates.new_instance(self.program, ty);
        self.emit_object_xir(id, snippet, "new_instance")?;
        Ok(())
    }

    pub(super) fn do_new_type_array(&mut self, id: InstId, length: InstId, elem_kind: Kind) -> LowerResult<()> {
        let snippet = self
            .templates
            .new_type_array(elem_kind, XirArgument::Value(length));
        self.emit_object_xir(id, snippet, "new_type_array")?;
        Ok(())
    }

    pub(super) fn do_new_object_array(&mut self, id: InstId, length: InstId, elem_ty: TypeId) -> LowerResult<()> {
        let snippet = self
            .templates
            .new_object_array(self.program, elem_ty, XirArgument::Value(length));
        self.emit_object_xir(id, snippet, "new_object_array")?;
        Ok(())
    }

    /// The dimensions are stored as ints to a stack block whose address
    /// is passed to the template.
    pub(super) fn do_new_multi_array(&mut self, id: InstId, ty: TypeId, dims: &[InstId]) -> LowerResult<()> {
        let info = self.info_before(id)?;
        let block = self.frame_map.reserve_stack_block(dims.len() as u32 * 4);

        for (idx, &dim) in dims.iter().enumerate() {
            let mut item = LirItem::new(self, dim)?;
            item.load_for_store(self, Kind::Int)?;
            let slot = self.frame_map.stack_block_slot(block, idx as i32 * 4, Kind::Int);
            self.lir().move_(item.result(), slot);
        }

        let address = self.new_variable(Kind::Word)?;
        let lea = LirOp::Lea {
            address: self.frame_map.stack_block_address(block),
            result: address.clone(),
        };
        self.append(lea);

        let snippet = self
            .templates
            .new_multi_array(self.program, ty, XirArgument::Operand(address), dims.len())
            .ok_or(Bailout::MissingTemplate("new_multi_array"))?;
        self.emit_xir(&snippet, info, None, None, Some(id))?;
        Ok(())
    }

    pub(super) fn do_check_cast(&mut self, id: InstId, object: InstId, ty: TypeId) -> LowerResult<()> {
        let snippet = self
            .templates
            .check_cast(self.program, XirArgument::Value(object), ty);
        self.emit_object_xir(id, snippet, "check_cast")?;
        Ok(())
    }

    pub(super) fn do_instance_of(&mut self, id: InstId, object: InstId, ty: TypeId) -> LowerResult<()> {
        let snippet = self
            .templates
            .instance_of(self.program, XirArgument::Value(object), ty);
        self.emit_object_xir(id, snippet, "instance_of")?;
        Ok(())
    }

    pub(super) fn do_monitor(&mut self, id: InstId, object: InstId, lock_index: u32, is_enter: bool) -> LowerResult<()> {
        let info = self.info_before(id)?;

        let mut item = LirItem::new(self, object)?;
        item.load_item(self)?;

        let lock = self.new_variable(Kind::Word)?;
        let lea = LirOp::Lea {
            address: self.frame_map.monitor_address(lock_index),
            result: lock.clone(),
        };
        self.append(lea);

        let object = XirArgument::Operand(item.result());
        let lock = XirArgument::Operand(lock);

        let (snippet, name) = if is_enter {
            (self.templates.monitor_enter(object, lock), "monitor_enter")
        } else {
            (self.templates.monitor_exit(object, lock), "monitor_exit")
        };

        let snippet = snippet.ok_or(Bailout::MissingTemplate(name))?;
        self.emit_xir(&snippet, info, None, None, None)?;
        Ok(())
    }
}
