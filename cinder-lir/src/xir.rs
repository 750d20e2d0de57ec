use std::sync::Arc;

use cinder_hir::{ConstValue, Kind, RuntimeCall};

use crate::cpu::Register;

/// Slot of a code template. Every parameter, temporary, constant and the
/// result occupy one slot; slot indices are dense.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct XirSlot(pub usize);

#[derive(Clone, Debug)]
pub struct TemplateParam {
    pub slot: usize,
    pub param_index: usize,
    pub kind: Kind,
    /// The template overwrites the parameter.
    pub destroyed: bool,
    pub can_be_constant: bool,
}

#[derive(Clone, Debug)]
pub struct TemplateTemp {
    pub slot: usize,
    pub kind: Kind,
    pub fixed: Option<Register>,
    /// A fixed register the allocator has to keep free for the template.
    pub reserve: bool,
}

impl TemplateTemp {
    pub fn is_fixed_unreserved(&self) -> bool {
        self.fixed.is_some() && !self.reserve
    }
}

#[derive(Clone, Debug)]
pub struct TemplateConstant {
    pub slot: usize,
    pub value: ConstValue,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct TemplateResult {
    pub slot: usize,
    pub kind: Kind,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct XirLabel {
    pub index: usize,
    /// Out-of-line labels start the slow path.
    pub inline: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum XirOpcode {
    Mov,
    PointerLoad,
    PointerStore,
    Add,
    Sub,
    Shl,
    Shr,
    Jeq,
    Jneq,
    Jugteq,
    Jmp,
    Bind,
    CallRuntime(RuntimeCall),
    /// Call of `callee_templates[index]`.
    CallStub(usize),
    Mark(&'static str),
}

#[derive(Clone, Debug)]
pub struct XirInstruction {
    pub opcode: XirOpcode,
    pub kind: Kind,
    pub result: Option<XirSlot>,
    pub args: Vec<XirSlot>,
    pub disp: i32,
    pub label: Option<XirLabel>,
}

#[derive(Debug)]
pub struct CodeTemplate {
    pub name: &'static str,
    pub params: Vec<TemplateParam>,
    pub temps: Vec<TemplateTemp>,
    pub constants: Vec<TemplateConstant>,
    pub result: Option<TemplateResult>,
    pub allocate_result: bool,
    pub slot_count: usize,
    pub outgoing_stack_size: u32,
    pub fast_path: Vec<XirInstruction>,
    pub slow_path: Vec<XirInstruction>,
    pub callee_templates: Vec<Arc<CodeTemplate>>,
    pub labels: Vec<XirLabel>,
}

impl CodeTemplate {
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub fn has_slow_path(&self) -> bool {
        !self.slow_path.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.fast_path.is_empty() && self.slow_path.is_empty()
    }

    pub fn has_call(&self) -> bool {
        self.fast_path
            .iter()
            .chain(self.slow_path.iter())
            .any(|inst| match inst.opcode {
                XirOpcode::CallRuntime(_) | XirOpcode::CallStub(_) => true,
                _ => false,
            })
    }

    /// Temporaries the register allocator sees as temp operands.
    pub fn temp_operands(&self) -> impl Iterator<Item = &TemplateTemp> {
        self.temps.iter().filter(|temp| !temp.is_fixed_unreserved())
    }

    pub fn param_for_slot(&self, slot: usize) -> Option<&TemplateParam> {
        self.params.iter().find(|param| param.slot == slot)
    }
}

/// Assembles a `CodeTemplate`. Instructions go to the fast path until an
/// out-of-line label is bound.
pub struct TemplateBuilder {
    params: Vec<TemplateParam>,
    temps: Vec<TemplateTemp>,
    constants: Vec<TemplateConstant>,
    result: Option<TemplateResult>,
    allocate_result: bool,
    slot_count: usize,
    fast_path: Vec<XirInstruction>,
    slow_path: Vec<XirInstruction>,
    in_slow_path: bool,
    labels: Vec<XirLabel>,
    callee_templates: Vec<Arc<CodeTemplate>>,
    outgoing_stack_size: u32,
}

impl TemplateBuilder {
    pub fn new() -> TemplateBuilder {
        TemplateBuilder {
            params: Vec::new(),
            temps: Vec::new(),
            constants: Vec::new(),
            result: None,
            allocate_result: false,
            slot_count: 0,
            fast_path: Vec::new(),
            slow_path: Vec::new(),
            in_slow_path: false,
            labels: Vec::new(),
            callee_templates: Vec::new(),
            outgoing_stack_size: 0,
        }
    }

    /// Template producing a freshly allocated result of `kind`.
    pub fn with_result(kind: Kind) -> TemplateBuilder {
        let mut builder = TemplateBuilder::new();
        let slot = builder.next_slot();
        builder.result = Some(TemplateResult { slot, kind });
        builder.allocate_result = true;
        builder
    }

    fn next_slot(&mut self) -> usize {
        let slot = self.slot_count;
        self.slot_count += 1;
        slot
    }

    pub fn result(&self) -> Option<XirSlot> {
        self.result.map(|result| XirSlot(result.slot))
    }

    fn add_param(&mut self, kind: Kind, destroyed: bool, can_be_constant: bool) -> XirSlot {
        let slot = self.next_slot();
        let param_index = self.params.len();
        self.params.push(TemplateParam {
            slot,
            param_index,
            kind,
            destroyed,
            can_be_constant,
        });
        XirSlot(slot)
    }

    pub fn param(&mut self, kind: Kind) -> XirSlot {
        self.add_param(kind, false, false)
    }

    pub fn destroyed_param(&mut self, kind: Kind) -> XirSlot {
        self.add_param(kind, true, false)
    }

    pub fn constant_param(&mut self, kind: Kind) -> XirSlot {
        self.add_param(kind, false, true)
    }

    fn add_temp(&mut self, kind: Kind, fixed: Option<Register>, reserve: bool) -> XirSlot {
        let slot = self.next_slot();
        self.temps.push(TemplateTemp {
            slot,
            kind,
            fixed,
            reserve,
        });
        XirSlot(slot)
    }

    pub fn temp(&mut self, kind: Kind) -> XirSlot {
        self.add_temp(kind, None, false)
    }

    pub fn fixed_temp(&mut self, kind: Kind, reg: Register) -> XirSlot {
        self.add_temp(kind, Some(reg), false)
    }

    pub fn reserved_temp(&mut self, kind: Kind, reg: Register) -> XirSlot {
        self.add_temp(kind, Some(reg), true)
    }

    pub fn constant(&mut self, value: ConstValue) -> XirSlot {
        let slot = self.next_slot();
        self.constants.push(TemplateConstant { slot, value });
        XirSlot(slot)
    }

    pub fn create_inline_label(&mut self) -> XirLabel {
        self.create_label(true)
    }

    pub fn create_out_of_line_label(&mut self) -> XirLabel {
        self.create_label(false)
    }

    fn create_label(&mut self, inline: bool) -> XirLabel {
        let label = XirLabel {
            index: self.labels.len(),
            inline,
        };
        self.labels.push(label);
        label
    }

    pub fn bind(&mut self, label: XirLabel) {
        if !label.inline {
            self.in_slow_path = true;
        }
        self.emit(XirOpcode::Bind, Kind::Void, None, Vec::new(), 0, Some(label));
    }

    fn emit(
        &mut self,
        opcode: XirOpcode,
        kind: Kind,
        result: Option<XirSlot>,
        args: Vec<XirSlot>,
        disp: i32,
        label: Option<XirLabel>,
    ) {
        let inst = XirInstruction {
            opcode,
            kind,
            result,
            args,
            disp,
            label,
        };

        if self.in_slow_path {
            self.slow_path.push(inst);
        } else {
            self.fast_path.push(inst);
        }
    }

    pub fn mov(&mut self, kind: Kind, dst: XirSlot, src: XirSlot) {
        self.emit(XirOpcode::Mov, kind, Some(dst), vec![src], 0, None);
    }

    pub fn pload(&mut self, kind: Kind, dst: XirSlot, base: XirSlot, disp: i32) {
        self.emit(XirOpcode::PointerLoad, kind, Some(dst), vec![base], disp, None);
    }

    pub fn pload_indexed(&mut self, kind: Kind, dst: XirSlot, base: XirSlot, index: XirSlot, disp: i32) {
        self.emit(
            XirOpcode::PointerLoad,
            kind,
            Some(dst),
            vec![base, index],
            disp,
            None,
        );
    }

    pub fn pstore(&mut self, kind: Kind, base: XirSlot, value: XirSlot, disp: i32) {
        self.emit(XirOpcode::PointerStore, kind, None, vec![base, value], disp, None);
    }

    pub fn pstore_indexed(
        &mut self,
        kind: Kind,
        base: XirSlot,
        index: XirSlot,
        value: XirSlot,
        disp: i32,
    ) {
        self.emit(
            XirOpcode::PointerStore,
            kind,
            None,
            vec![base, index, value],
            disp,
            None,
        );
    }

    pub fn add(&mut self, kind: Kind, dst: XirSlot, x: XirSlot, y: XirSlot) {
        self.emit(XirOpcode::Add, kind, Some(dst), vec![x, y], 0, None);
    }

    pub fn sub(&mut self, kind: Kind, dst: XirSlot, x: XirSlot, y: XirSlot) {
        self.emit(XirOpcode::Sub, kind, Some(dst), vec![x, y], 0, None);
    }

    pub fn shl(&mut self, kind: Kind, dst: XirSlot, x: XirSlot, y: XirSlot) {
        self.emit(XirOpcode::Shl, kind, Some(dst), vec![x, y], 0, None);
    }

    pub fn shr(&mut self, kind: Kind, dst: XirSlot, x: XirSlot, y: XirSlot) {
        self.emit(XirOpcode::Shr, kind, Some(dst), vec![x, y], 0, None);
    }

    pub fn jeq(&mut self, label: XirLabel, x: XirSlot, y: XirSlot) {
        self.emit(XirOpcode::Jeq, Kind::Void, None, vec![x, y], 0, Some(label));
    }

    pub fn jneq(&mut self, label: XirLabel, x: XirSlot, y: XirSlot) {
        self.emit(XirOpcode::Jneq, Kind::Void, None, vec![x, y], 0, Some(label));
    }

    pub fn jugteq(&mut self, label: XirLabel, x: XirSlot, y: XirSlot) {
        self.emit(XirOpcode::Jugteq, Kind::Void, None, vec![x, y], 0, Some(label));
    }

    pub fn jmp(&mut self, label: XirLabel) {
        self.emit(XirOpcode::Jmp, Kind::Void, None, Vec::new(), 0, Some(label));
    }

    pub fn call_runtime(&mut self, call: RuntimeCall, result: Option<XirSlot>, args: &[XirSlot]) {
        self.emit(
            XirOpcode::CallRuntime(call),
            call.result_kind(),
            result,
            args.to_vec(),
            0,
            None,
        );
    }

    pub fn call_stub(&mut self, stub: Arc<CodeTemplate>, result: Option<XirSlot>, args: &[XirSlot]) {
        let kind = stub.result.map_or(Kind::Void, |result| result.kind);
        let index = self.callee_templates.len();
        self.callee_templates.push(stub);
        self.emit(XirOpcode::CallStub(index), kind, result, args.to_vec(), 0, None);
    }

    pub fn mark(&mut self, name: &'static str) {
        self.emit(XirOpcode::Mark(name), Kind::Void, None, Vec::new(), 0, None);
    }

    pub fn reserve_outgoing(&mut self, size: u32) {
        self.outgoing_stack_size = self.outgoing_stack_size.max(size);
    }

    pub fn finish(self, name: &'static str) -> CodeTemplate {
        CodeTemplate {
            name,
            params: self.params,
            temps: self.temps,
            constants: self.constants,
            result: self.result,
            allocate_result: self.allocate_result,
            slot_count: self.slot_count,
            outgoing_stack_size: self.outgoing_stack_size,
            fast_path: self.fast_path,
            slow_path: self.slow_path,
            callee_templates: self.callee_templates,
            labels: self.labels,
        }
    }

    /// Finishes a template whose result is the operand of parameter `result`.
    pub fn finish_with_result(mut self, result: XirSlot, name: &'static str) -> CodeTemplate {
        assert!(self.result.is_none(), "template already has a result");
        let kind = match self.params.iter().find(|param| param.slot == result.0) {
            Some(param) => param.kind,
            None => panic!("result of template {} is not a parameter", name),
        };

        self.result = Some(TemplateResult {
            slot: result.0,
            kind,
        });
        self.allocate_result = false;
        self.finish(name)
    }
}
