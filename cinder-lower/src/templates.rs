use std::sync::Arc;

use cinder_hir::{ConstValue, FieldId, InstId, Kind, MethodId, ObjectHandle, Program, RuntimeCall, TypeId};
use cinder_lir::{CodeTemplate, Operand, Target, TemplateBuilder, XirLabel, XirSlot};

// object layout assumed by the default templates
pub const HUB_OFFSET: i32 = 0;
pub const ARRAY_LENGTH_OFFSET: i32 = 8;
pub const ARRAY_DATA_OFFSET: i32 = 16;
pub const VTABLE_OFFSET: i32 = 64;
pub const POLL_PAGE_OFFSET: i32 = 24;
pub const CARD_TABLE_SHIFT: i32 = 9;

/// Actual argument of a template parameter.
#[derive(Clone, Debug)]
pub enum XirArgument {
    Constant(ConstValue),
    /// Result of an instruction, loaded on demand.
    Value(InstId),
    /// An operand computed by the caller.
    Operand(Operand),
}

/// A template together with the arguments of one instantiation.
#[derive(Clone, Debug)]
pub struct TemplateSnippet {
    pub template: Arc<CodeTemplate>,
    pub arguments: Vec<XirArgument>,
}

impl TemplateSnippet {
    pub fn new(template: CodeTemplate, arguments: Vec<XirArgument>) -> TemplateSnippet {
        TemplateSnippet {
            template: Arc::new(template),
            arguments,
        }
    }
}

/// Runtime specific lowering of object model operations. `None` means the
/// runtime has no template for the operation.
pub trait TemplateProvider: Send + Sync {
    fn get_field(&self, _program: &Program, _field: FieldId, _object: XirArgument) -> Option<TemplateSnippet> {
        None
    }

    fn put_field(
        &self,
        _program: &Program,
        _field: FieldId,
        _object: XirArgument,
        _value: XirArgument,
    ) -> Option<TemplateSnippet> {
        None
    }

    fn get_static(&self, _program: &Program, _field: FieldId) -> Option<TemplateSnippet> {
        None
    }

    fn put_static(&self, _program: &Program, _field: FieldId, _value: XirArgument) -> Option<TemplateSnippet> {
        None
    }

    fn array_length(&self, _array: XirArgument) -> Option<TemplateSnippet> {
        None
    }

    fn array_load(&self, _elem_kind: Kind, _array: XirArgument, _index: XirArgument) -> Option<TemplateSnippet> {
        None
    }

    fn array_store(
        &self,
        _elem_kind: Kind,
        _array: XirArgument,
        _index: XirArgument,
        _value: XirArgument,
    ) -> Option<TemplateSnippet> {
        None
    }

    /// Invoke templates produce the call destination: a constant for
    /// direct calls, a word for indirect ones.
    fn invoke_static(&self, _program: &Program, _method: MethodId) -> Option<TemplateSnippet> {
        None
    }

    fn invoke_special(&self, _program: &Program, _method: MethodId) -> Option<TemplateSnippet> {
        None
    }

    fn invoke_virtual(&self, _program: &Program, _method: MethodId, _receiver: XirArgument) -> Option<TemplateSnippet> {
        None
    }

    fn invoke_interface(&self, _program: &Program, _method: MethodId, _receiver: XirArgument) -> Option<TemplateSnippet> {
        None
    }

    fn new_instance(&self, _program: &Program, _ty: TypeId) -> Option<TemplateSnippet> {
        None
    }

    fn new_type_array(&self, _elem_kind: Kind, _length: XirArgument) -> Option<TemplateSnippet> {
        None
    }

    fn new_object_array(&self, _program: &Program, _elem_ty: TypeId, _length: XirArgument) -> Option<TemplateSnippet> {
        None
    }

    /// `dims` is the address of `rank` ints holding the dimensions.
    fn new_multi_array(
        &self,
        _program: &Program,
        _ty: TypeId,
        _dims: XirArgument,
        _rank: usize,
    ) -> Option<TemplateSnippet> {
        None
    }

    fn check_cast(&self, _program: &Program, _object: XirArgument, _ty: TypeId) -> Option<TemplateSnippet> {
        None
    }

    fn instance_of(&self, _program: &Program, _object: XirArgument, _ty: TypeId) -> Option<TemplateSnippet> {
        None
    }

    fn monitor_enter(&self, _object: XirArgument, _lock: XirArgument) -> Option<TemplateSnippet> {
        None
    }

    fn monitor_exit(&self, _object: XirArgument, _lock: XirArgument) -> Option<TemplateSnippet> {
        None
    }

    fn safepoint_poll(&self) -> Option<TemplateSnippet> {
        None
    }

    fn epilogue(&self) -> Option<TemplateSnippet> {
        None
    }

    fn write_barrier(&self, _object: XirArgument) -> Option<TemplateSnippet> {
        None
    }
}

/// Hub constant of a type, as the runtime exposes it to compiled code.
pub fn type_hub(ty: TypeId) -> ConstValue {
    ConstValue::Object(ObjectHandle(ty.0))
}

fn result_slot(asm: &TemplateBuilder) -> XirSlot {
    match asm.result() {
        Some(slot) => slot,
        None => unreachable!("template built without result"),
    }
}

/// Templates for the default object layout: a hub word in front of every
/// object, arrays with a length word and their elements behind it, virtual
/// calls through a vtable in the hub.
pub struct DefaultTemplates {
    word_size: u32,
    thread: Operand,
    card_table: u64,
}

impl DefaultTemplates {
    pub fn new(target: &Target) -> DefaultTemplates {
        DefaultTemplates {
            word_size: target.word_size,
            thread: target.thread_register(),
            card_table: 0,
        }
    }

    pub fn with_card_table(mut self, base: u64) -> DefaultTemplates {
        self.card_table = base;
        self
    }

    fn field_load(&self, kind: Kind, offset: i32, is_resolved: bool, field: FieldId) -> CodeTemplate {
        let mut asm = TemplateBuilder::with_result(kind.stack_kind());
        let object = asm.param(Kind::Object);
        let result = result_slot(&asm);

        if is_resolved {
            asm.pload(kind, result, object, offset);
        } else {
            let offset = asm.temp(Kind::Word);
            let index = asm.constant(ConstValue::Int(field.0 as i32));
            asm.call_runtime(RuntimeCall::ResolveField, Some(offset), &[index]);
            asm.pload_indexed(kind, result, object, offset, 0);
        }

        asm.finish("get_field")
    }

    fn field_store(&self, kind: Kind, offset: i32, is_resolved: bool, field: FieldId) -> CodeTemplate {
        let mut asm = TemplateBuilder::new();
        let object = asm.param(Kind::Object);
        let value = if kind.is_byte_sized() {
            asm.param(kind)
        } else {
            asm.constant_param(kind.stack_kind())
        };

        if is_resolved {
            asm.pstore(kind, object, value, offset);
        } else {
            let offset = asm.temp(Kind::Word);
            let index = asm.constant(ConstValue::Int(field.0 as i32));
            asm.call_runtime(RuntimeCall::ResolveField, Some(offset), &[index]);
            asm.pstore_indexed(kind, object, offset, value, 0);
        }

        asm.finish("put_field")
    }

    fn bounds_checked(&self, asm: &mut TemplateBuilder, array: XirSlot, index: XirSlot) -> XirLabel {
        let length = asm.temp(Kind::Int);
        let fail = asm.create_out_of_line_label();
        asm.pload(Kind::Int, length, array, ARRAY_LENGTH_OFFSET);
        asm.jugteq(fail, index, length);
        fail
    }

    fn allocation_stub(&self) -> Arc<CodeTemplate> {
        let mut asm = TemplateBuilder::with_result(Kind::Object);
        let hub = asm.param(Kind::Object);
        let result = result_slot(&asm);
        asm.call_runtime(RuntimeCall::NewInstance, Some(result), &[hub]);
        Arc::new(asm.finish("new_instance_stub"))
    }
}

impl TemplateProvider for DefaultTemplates {
    fn get_field(&self, program: &Program, field: FieldId, object: XirArgument) -> Option<TemplateSnippet> {
        let data = program.field(field);
        let template = self.field_load(data.kind, data.offset, data.is_resolved, field);
        Some(TemplateSnippet::new(template, vec![object]))
    }

    fn put_field(
        &self,
        program: &Program,
        field: FieldId,
        object: XirArgument,
        value: XirArgument,
    ) -> Option<TemplateSnippet> {
        let data = program.field(field);
        let template = self.field_store(data.kind, data.offset, data.is_resolved, field);
        Some(TemplateSnippet::new(template, vec![object, value]))
    }

    fn get_static(&self, program: &Program, field: FieldId) -> Option<TemplateSnippet> {
        let data = program.field(field);
        let template = self.field_load(data.kind, data.offset, data.is_resolved, field);
        let mirror = XirArgument::Constant(type_hub(data.holder));
        Some(TemplateSnippet::new(template, vec![mirror]))
    }

    fn put_static(&self, program: &Program, field: FieldId, value: XirArgument) -> Option<TemplateSnippet> {
        let data = program.field(field);
        let template = self.field_store(data.kind, data.offset, data.is_resolved, field);
        let mirror = XirArgument::Constant(type_hub(data.holder));
        Some(TemplateSnippet::new(template, vec![mirror, value]))
    }

    fn array_length(&self, array: XirArgument) -> Option<TemplateSnippet> {
        let mut asm = TemplateBuilder::with_result(Kind::Int);
        let object = asm.param(Kind::Object);
        let result = result_slot(&asm);
        asm.pload(Kind::Int, result, object, ARRAY_LENGTH_OFFSET);
        Some(TemplateSnippet::new(asm.finish("array_length"), vec![array]))
    }

    fn array_load(&self, elem_kind: Kind, array: XirArgument, index: XirArgument) -> Option<TemplateSnippet> {
        let mut asm = TemplateBuilder::with_result(elem_kind.stack_kind());
        let object = asm.param(Kind::Object);
        let idx = asm.param(Kind::Int);
        let result = result_slot(&asm);

        let fail = self.bounds_checked(&mut asm, object, idx);
        asm.pload_indexed(elem_kind, result, object, idx, ARRAY_DATA_OFFSET);
        asm.bind(fail);
        asm.call_runtime(RuntimeCall::ThrowArrayIndexOutOfBounds, None, &[idx]);

        Some(TemplateSnippet::new(asm.finish("array_load"), vec![array, index]))
    }

    fn array_store(
        &self,
        elem_kind: Kind,
        array: XirArgument,
        index: XirArgument,
        value: XirArgument,
    ) -> Option<TemplateSnippet> {
        let mut asm = TemplateBuilder::new();
        let object = asm.param(Kind::Object);
        let idx = asm.param(Kind::Int);
        let val = if elem_kind.is_byte_sized() {
            asm.param(elem_kind)
        } else {
            asm.constant_param(elem_kind.stack_kind())
        };

        let fail = self.bounds_checked(&mut asm, object, idx);
        asm.pstore_indexed(elem_kind, object, idx, val, ARRAY_DATA_OFFSET);
        asm.bind(fail);
        asm.call_runtime(RuntimeCall::ThrowArrayIndexOutOfBounds, None, &[idx]);

        Some(TemplateSnippet::new(
            asm.finish("array_store"),
            vec![array, index, value],
        ))
    }

    fn invoke_static(&self, program: &Program, method: MethodId) -> Option<TemplateSnippet> {
        if !program.method(method).is_resolved {
            let mut asm = TemplateBuilder::with_result(Kind::Word);
            let result = result_slot(&asm);
            let index = asm.constant(ConstValue::Int(method.0 as i32));
            asm.call_runtime(RuntimeCall::ResolveMethod, Some(result), &[index]);
            return Some(TemplateSnippet::new(asm.finish("invoke_unresolved"), Vec::new()));
        }

        let mut asm = TemplateBuilder::new();
        let destination = asm.constant_param(Kind::Word);
        asm.mark("invoke_static");
        let template = asm.finish_with_result(destination, "invoke_static");
        Some(TemplateSnippet::new(
            template,
            vec![XirArgument::Constant(ConstValue::Word(0))],
        ))
    }

    fn invoke_special(&self, program: &Program, method: MethodId) -> Option<TemplateSnippet> {
        self.invoke_static(program, method)
    }

    fn invoke_virtual(&self, program: &Program, method: MethodId, receiver: XirArgument) -> Option<TemplateSnippet> {
        let vtable_index = match program.method(method).vtable_index {
            Some(index) => index,
            None => return self.invoke_static(program, method),
        };

        let mut asm = TemplateBuilder::with_result(Kind::Word);
        let object = asm.param(Kind::Object);
        let hub = asm.temp(Kind::Word);
        let result = result_slot(&asm);
        let entry = VTABLE_OFFSET + vtable_index as i32 * self.word_size as i32;

        asm.pload(Kind::Word, hub, object, HUB_OFFSET);
        asm.pload(Kind::Word, result, hub, entry);
        Some(TemplateSnippet::new(asm.finish("invoke_virtual"), vec![receiver]))
    }

    fn invoke_interface(&self, _program: &Program, method: MethodId, receiver: XirArgument) -> Option<TemplateSnippet> {
        let mut asm = TemplateBuilder::with_result(Kind::Word);
        let object = asm.param(Kind::Object);
        let hub = asm.temp(Kind::Word);
        let result = result_slot(&asm);
        let index = asm.constant(ConstValue::Int(method.0 as i32));

        asm.pload(Kind::Word, hub, object, HUB_OFFSET);
        asm.call_runtime(RuntimeCall::ResolveMethod, Some(result), &[index]);
        Some(TemplateSnippet::new(asm.finish("invoke_interface"), vec![receiver]))
    }

    fn new_instance(&self, _program: &Program, ty: TypeId) -> Option<TemplateSnippet> {
        let mut asm = TemplateBuilder::with_result(Kind::Object);
        let hub = asm.param(Kind::Object);
        let result = result_slot(&asm);
        asm.call_stub(self.allocation_stub(), Some(result), &[hub]);
        Some(TemplateSnippet::new(
            asm.finish("new_instance"),
            vec![XirArgument::Constant(type_hub(ty))],
        ))
    }

    fn new_type_array(&self, elem_kind: Kind, length: XirArgument) -> Option<TemplateSnippet> {
        let mut asm = TemplateBuilder::with_result(Kind::Object);
        let tag = asm.param(Kind::Word);
        let len = asm.param(Kind::Int);
        let result = result_slot(&asm);
        asm.call_runtime(RuntimeCall::NewArray, Some(result), &[tag, len]);

        let tag = ConstValue::Word(u8::from(elem_kind) as u64);
        Some(TemplateSnippet::new(
            asm.finish("new_type_array"),
            vec![XirArgument::Constant(tag), length],
        ))
    }

    fn new_object_array(&self, _program: &Program, elem_ty: TypeId, length: XirArgument) -> Option<TemplateSnippet> {
        let mut asm = TemplateBuilder::with_result(Kind::Object);
        let hub = asm.param(Kind::Object);
        let len = asm.param(Kind::Int);
        let result = result_slot(&asm);
        asm.call_runtime(RuntimeCall::NewArray, Some(result), &[hub, len]);
        Some(TemplateSnippet::new(
            asm.finish("new_object_array"),
            vec![XirArgument::Constant(type_hub(elem_ty)), length],
        ))
    }

    fn new_multi_array(
        &self,
        _program: &Program,
        ty: TypeId,
        dims: XirArgument,
        rank: usize,
    ) -> Option<TemplateSnippet> {
        let mut asm = TemplateBuilder::with_result(Kind::Object);
        let hub = asm.param(Kind::Object);
        let count = asm.param(Kind::Int);
        let address = asm.param(Kind::Word);
        let result = result_slot(&asm);
        asm.call_runtime(RuntimeCall::NewMultiArray, Some(result), &[hub, count, address]);
        Some(TemplateSnippet::new(
            asm.finish("new_multi_array"),
            vec![
                XirArgument::Constant(type_hub(ty)),
                XirArgument::Constant(ConstValue::Int(rank as i32)),
                dims,
            ],
        ))
    }

    fn check_cast(&self, _program: &Program, object: XirArgument, ty: TypeId) -> Option<TemplateSnippet> {
        let mut asm = TemplateBuilder::new();
        let obj = asm.param(Kind::Object);
        let hub = asm.constant_param(Kind::Object);
        let actual = asm.temp(Kind::Word);
        let null = asm.constant(ConstValue::Null);
        let done = asm.create_inline_label();
        let slow = asm.create_out_of_line_label();

        asm.jeq(done, obj, null);
        asm.pload(Kind::Word, actual, obj, HUB_OFFSET);
        asm.jneq(slow, actual, hub);
        asm.bind(done);
        asm.bind(slow);
        asm.call_runtime(RuntimeCall::ThrowClassCast, None, &[obj]);

        let template = asm.finish_with_result(obj, "check_cast");
        Some(TemplateSnippet::new(
            template,
            vec![object, XirArgument::Constant(type_hub(ty))],
        ))
    }

    fn instance_of(&self, _program: &Program, object: XirArgument, ty: TypeId) -> Option<TemplateSnippet> {
        let mut asm = TemplateBuilder::with_result(Kind::Int);
        let obj = asm.param(Kind::Object);
        let hub = asm.constant_param(Kind::Object);
        let actual = asm.temp(Kind::Word);
        let null = asm.constant(ConstValue::Null);
        let zero = asm.constant(ConstValue::Int(0));
        let one = asm.constant(ConstValue::Int(1));
        let result = result_slot(&asm);
        let done = asm.create_inline_label();

        asm.mov(Kind::Int, result, zero);
        asm.jeq(done, obj, null);
        asm.pload(Kind::Word, actual, obj, HUB_OFFSET);
        asm.jneq(done, actual, hub);
        asm.mov(Kind::Int, result, one);
        asm.bind(done);

        Some(TemplateSnippet::new(
            asm.finish("instance_of"),
            vec![object, XirArgument::Constant(type_hub(ty))],
        ))
    }

    fn monitor_enter(&self, object: XirArgument, lock: XirArgument) -> Option<TemplateSnippet> {
        let mut asm = TemplateBuilder::new();
        let obj = asm.param(Kind::Object);
        let slot = asm.param(Kind::Word);
        asm.call_runtime(RuntimeCall::MonitorEnter, None, &[obj, slot]);
        Some(TemplateSnippet::new(asm.finish("monitor_enter"), vec![object, lock]))
    }

    fn monitor_exit(&self, object: XirArgument, lock: XirArgument) -> Option<TemplateSnippet> {
        let mut asm = TemplateBuilder::new();
        let obj = asm.param(Kind::Object);
        let slot = asm.param(Kind::Word);
        asm.call_runtime(RuntimeCall::MonitorExit, None, &[obj, slot]);
        Some(TemplateSnippet::new(asm.finish("monitor_exit"), vec![object, lock]))
    }

    fn safepoint_poll(&self) -> Option<TemplateSnippet> {
        let thread = match self.thread.as_register() {
            Some(reg) => reg,
            None => return None,
        };

        let mut asm = TemplateBuilder::new();
        let tld = asm.fixed_temp(Kind::Word, thread);
        let page = asm.temp(Kind::Word);
        asm.mark("poll");
        asm.pload(Kind::Word, page, tld, POLL_PAGE_OFFSET);
        Some(TemplateSnippet::new(asm.finish("safepoint_poll"), Vec::new()))
    }

    fn write_barrier(&self, object: XirArgument) -> Option<TemplateSnippet> {
        if self.card_table == 0 {
            return None;
        }

        let mut asm = TemplateBuilder::new();
        let obj = asm.destroyed_param(Kind::Object);
        let base = asm.constant(ConstValue::Word(self.card_table));
        let shift = asm.constant(ConstValue::Int(CARD_TABLE_SHIFT));
        let dirty = asm.constant(ConstValue::Int(0));
        asm.shr(Kind::Word, obj, obj, shift);
        asm.pstore_indexed(Kind::Byte, base, obj, dirty, 0);
        Some(TemplateSnippet::new(asm.finish("write_barrier"), vec![object]))
    }
}
