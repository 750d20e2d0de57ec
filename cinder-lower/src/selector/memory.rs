use cinder_hir::{ArithOp, ConstValue, FieldData, FieldId, InstId, InstKind, Kind, ShiftOp};
use cinder_lir::{Address, Barriers, DebugInfo, LirOp, MoveKind, Operand, Scale};

use crate::error::{Bailout, LowerResult};
use crate::item::LirItem;
use crate::selector::InstructionSelector;
use crate::templates::{type_hub, TemplateSnippet, XirArgument};

impl<'a> InstructionSelector<'a> {
    /// Barriers are only emitted for multiprocessors.
    pub(crate) fn membar(&mut self, barriers: Barriers) {
        if self.target.is_mp {
            self.lir().membar(barriers);
        }
    }

    pub(crate) fn write_barrier(&mut self, object: XirArgument) -> LowerResult<()> {
        if let Some(snippet) = self.templates.write_barrier(object) {
            self.emit_xir(&snippet, None, None, None, None)?;
        }

        Ok(())
    }

    /// Appends a store template with the ordering of a volatile write
    /// around it when `is_volatile` is set.
    fn emit_store_xir(
        &mut self,
        snippet: &TemplateSnippet,
        info: Option<DebugInfo>,
        is_volatile: bool,
    ) -> LowerResult<()> {
        let (op, _) = self.prepare_xir(snippet, info, None, None)?;

        if is_volatile {
            self.membar(Barriers::RELEASE);
        }

        if let Some(op) = op {
            self.append_xir(op);
        }

        if is_volatile {
            self.membar(Barriers::FULL);
        }

        Ok(())
    }

    fn field_address(&mut self, object: InstId, data: &FieldData, what: &'static str) -> LowerResult<Address> {
        if !data.is_resolved {
            return Err(Bailout::MissingTemplate(what));
        }

        let base = if data.is_static {
            self.load_constant(type_hub(data.holder))?
        } else {
            let mut item = LirItem::new(self, object)?;
            item.load_item(self)?;
            item.result()
        };

        Ok(Address::new(base, data.offset, data.kind))
    }

    /// Long accesses on x64 go through an xmm register to be atomic.
    fn needs_atomic_long(&self, data: &FieldData) -> bool {
        data.is_volatile && data.kind.is_long() && self.target.is_x64()
    }

    pub(super) fn do_load_field(&mut self, id: InstId, object: InstId, field: FieldId) -> LowerResult<()> {
        let program = self.program;
        let data = program.field(field);
        let info = self.info_before(id)?;

        let snippet = if data.is_static {
            self.templates.get_static(program, field)
        } else {
            self.templates.get_field(program, field, XirArgument::Value(object))
        };

        if let Some(snippet) = snippet {
            self.emit_xir(&snippet, info, None, None, Some(id))?;

            if data.is_volatile {
                self.membar(Barriers::ACQUIRE);
            }

            return Ok(());
        }

        let address = Operand::Address(self.field_address(object, data, "get_field")?);

        if self.needs_atomic_long(data) {
            let tmp = self.new_variable(Kind::Double)?;
            self.lir().move_with(address, tmp.clone(), MoveKind::Volatile, info);
            self.membar(Barriers::ACQUIRE);
            let result = self.force_to_spill(tmp, Kind::Long, false)?;
            self.set_result(id, result);
            return Ok(());
        }

        let result = self.result_variable(id)?;
        let kind = if data.is_volatile {
            MoveKind::Volatile
        } else {
            MoveKind::Normal
        };
        self.lir().move_with(address, result, kind, info);

        if data.is_volatile {
            self.membar(Barriers::ACQUIRE);
        }

        Ok(())
    }

    pub(super) fn do_store_field(
        &mut self,
        id: InstId,
        object: InstId,
        field: FieldId,
        value: InstId,
    ) -> LowerResult<()> {
        let program = self.program;
        let data = program.field(field);
        let info = self.info_before(id)?;

        let snippet = if data.is_static {
            self.templates.put_static(program, field, XirArgument::Value(value))
        } else {
            self.templates
                .put_field(program, field, XirArgument::Value(object), XirArgument::Value(value))
        };

        match snippet {
            Some(snippet) => self.emit_store_xir(&snippet, info, data.is_volatile)?,
            None => self.store_field_direct(object, data, value, info)?,
        }

        if data.kind.is_object() {
            let holder = if data.is_static {
                XirArgument::Operand(Operand::Constant(type_hub(data.holder)))
            } else {
                XirArgument::Value(object)
            };
            self.write_barrier(holder)?;
        }

        Ok(())
    }

    fn store_field_direct(
        &mut self,
        object: InstId,
        data: &FieldData,
        value: InstId,
        info: Option<DebugInfo>,
    ) -> LowerResult<()> {
        let address = Operand::Address(self.field_address(object, data, "put_field")?);
        let mut item = LirItem::new(self, value)?;

        let (src, kind) = if self.needs_atomic_long(data) {
            item.load_item(self)?;
            let spill = self.force_to_spill(item.result(), Kind::Long, false)?;
            let tmp = self.new_variable(Kind::Double)?;
            self.lir().move_(spill, tmp.clone());
            (tmp, MoveKind::Volatile)
        } else if data.is_volatile {
            item.load_for_store(self, data.kind)?;
            (item.result(), MoveKind::Volatile)
        } else {
            item.load_for_store(self, data.kind)?;
            (item.result(), MoveKind::Normal)
        };

        if data.is_volatile {
            self.membar(Barriers::RELEASE);
        }

        self.lir().move_with(src, address, kind, info);

        if data.is_volatile {
            self.membar(Barriers::FULL);
        }

        Ok(())
    }

    pub(super) fn do_array_length(&mut self, id: InstId, array: InstId) -> LowerResult<()> {
        let info = self.info_before(id)?;
        let snippet = self
            .templates
            .array_length(XirArgument::Value(array))
            .ok_or(Bailout::MissingTemplate("array_length"))?;
        self.emit_xir(&snippet, info, None, None, Some(id))?;
        Ok(())
    }

    pub(super) fn do_load_indexed(
        &mut self,
        id: InstId,
        array: InstId,
        index: InstId,
        elem_kind: Kind,
    ) -> LowerResult<()> {
        let info = self.info_before(id)?;
        let snippet = self
            .templates
            .array_load(elem_kind, XirArgument::Value(array), XirArgument::Value(index))
            .ok_or(Bailout::MissingTemplate("array_load"))?;
        self.emit_xir(&snippet, info, None, None, Some(id))?;
        Ok(())
    }

    pub(super) fn do_store_indexed(
        &mut self,
        id: InstId,
        array: InstId,
        index: InstId,
        value: InstId,
        elem_kind: Kind,
    ) -> LowerResult<()> {
        let info = self.info_before(id)?;
        let snippet = self
            .templates
            .array_store(
                elem_kind,
                XirArgument::Value(array),
                XirArgument::Value(index),
                XirArgument::Value(value),
            )
            .ok_or(Bailout::MissingTemplate("array_store"))?;
        self.emit_xir(&snippet, info, None, None, None)?;

        if elem_kind.is_object() {
            self.write_barrier(XirArgument::Value(array))?;
        }

        Ok(())
    }

    /// Constant displacement of `inst` if it fits into an address.
    fn displacement(&self, inst: InstId) -> Option<i32> {
        match self.graph.inst(inst).op {
            InstKind::Constant(ConstValue::Int(value)) => Some(value),
            InstKind::Constant(ConstValue::Long(value)) => i32::try_from(value).ok(),
            _ => None,
        }
    }

    fn raw_address(
        &mut self,
        base: InstId,
        index: Option<InstId>,
        log2_scale: u8,
        disp: i32,
        kind: Kind,
    ) -> LowerResult<Address> {
        let scale = Scale::try_from(log2_scale)
            .map_err(|_| Bailout::UnresolvedPattern(format!("raw access with scale 2^{}", log2_scale)))?;

        let mut base = LirItem::new(self, base)?;
        base.load_item(self)?;

        let index = match index {
            Some(index) => index,
            None => return Ok(Address::new(base.result(), disp, kind)),
        };

        let folded = self
            .displacement(index)
            .and_then(|value| value.checked_mul(scale.value()))
            .and_then(|offset| offset.checked_add(disp));

        if let Some(disp) = folded {
            return Ok(Address::new(base.result(), disp, kind));
        }

        let mut index = LirItem::new(self, index)?;
        index.load_item(self)?;

        if self.target.scaled_index || scale == Scale::Times1 {
            return Ok(Address::indexed(base.result(), index.result(), scale, disp, kind));
        }

        let scaled = self.new_variable(index.kind())?;
        self.append(LirOp::Shift {
            op: ShiftOp::Shl,
            x: index.result(),
            count: Operand::int(scale.log2() as i32),
            result: scaled.clone(),
        });

        Ok(Address::indexed(base.result(), scaled, Scale::Times1, disp, kind))
    }

    pub(super) fn do_load_raw(
        &mut self,
        id: InstId,
        base: InstId,
        index: Option<InstId>,
        log2_scale: u8,
        disp: i32,
    ) -> LowerResult<()> {
        let kind = self.graph.inst(id).kind;
        let address = self.raw_address(base, index, log2_scale, disp, kind)?;
        let result = self.result_variable(id)?;
        self.lir().move_(Operand::Address(address), result);
        Ok(())
    }

    pub(super) fn do_store_raw(
        &mut self,
        base: InstId,
        index: Option<InstId>,
        log2_scale: u8,
        disp: i32,
        value: InstId,
        kind: Kind,
    ) -> LowerResult<()> {
        let address = self.raw_address(base, index, log2_scale, disp, kind)?;
        let mut item = LirItem::new(self, value)?;
        item.load_for_store(self, kind)?;
        self.lir().move_(item.result(), Operand::Address(address));
        Ok(())
    }

    fn unsafe_address(&mut self, object: InstId, offset: InstId, kind: Kind) -> LowerResult<Address> {
        let mut item = LirItem::new(self, object)?;
        item.load_item(self)?;

        if let Some(disp) = self.displacement(offset) {
            return Ok(Address::new(item.result(), disp, kind));
        }

        let mut offset = LirItem::new(self, offset)?;
        offset.load_item(self)?;
        Ok(Address::indexed(item.result(), offset.result(), Scale::Times1, 0, kind))
    }

    /// A volatile get is fenced with an acquire barrier before the load and
    /// a full barrier after it. The trailing full barrier includes the
    /// acquire ordering a volatile read needs right after the load.
    pub(super) fn do_unsafe_get(
        &mut self,
        id: InstId,
        object: InstId,
        offset: InstId,
        is_volatile: bool,
    ) -> LowerResult<()> {
        let kind = self.graph.inst(id).kind;
        let address = self.unsafe_address(object, offset, kind)?;
        let result = self.result_variable(id)?;

        if is_volatile {
            self.membar(Barriers::ACQUIRE);
            self.lir()
                .move_with(Operand::Address(address), result, MoveKind::Volatile, None);
            self.membar(Barriers::FULL);
        } else {
            self.lir().move_(Operand::Address(address), result);
        }

        Ok(())
    }

    pub(super) fn do_unsafe_put(
        &mut self,
        object: InstId,
        offset: InstId,
        value: InstId,
        kind: Kind,
        is_volatile: bool,
    ) -> LowerResult<()> {
        let address = self.unsafe_address(object, offset, kind)?;
        let mut item = LirItem::new(self, value)?;
        item.load_for_store(self, kind)?;

        if is_volatile {
            self.membar(Barriers::RELEASE);
            self.lir()
                .move_with(item.result(), Operand::Address(address), MoveKind::Volatile, None);
            self.membar(Barriers::FULL);
        } else {
            self.lir().move_(item.result(), Operand::Address(address));
        }

        if kind.is_object() {
            self.write_barrier(XirArgument::Value(object))?;
        }

        Ok(())
    }

    /// Adds `increment` to the int counter at `offset` in `mdo`. Only x64
    /// adds to memory directly.
    pub(super) fn do_profile_counter(&mut self, mdo: InstId, offset: i32, increment: i32) -> LowerResult<()> {
        let mut item = LirItem::new(self, mdo)?;
        item.load_item(self)?;

        let counter = Operand::Address(Address::new(item.result(), offset, Kind::Int));
        let step = Operand::int(increment);

        if self.target.is_x64() {
            self.append(LirOp::Arith {
                op: ArithOp::Add,
                x: counter.clone(),
                y: step,
                result: counter,
                tmp: Operand::Illegal,
                info: None,
            });
            return Ok(());
        }

        let value = self.new_variable(Kind::Int)?;
        self.lir().move_(counter.clone(), value.clone());
        self.append(LirOp::Arith {
            op: ArithOp::Add,
            x: value.clone(),
            y: step,
            result: value.clone(),
            tmp: Operand::Illegal,
            info: None,
        });
        self.lir().move_(value, counter);
        Ok(())
    }

    pub(super) fn do_prefetch(&mut self, object: InstId, offset: InstId, is_store: bool) -> LowerResult<()> {
        let address = self.unsafe_address(object, offset, Kind::Byte)?;
        self.append(LirOp::Prefetch { address, is_store });
        Ok(())
    }
}
