use cinder_hir::{InstId, InvokeKind, MethodId, RuntimeCall};
use cinder_lir::{CallKind, CallOp, CallingConvention, CallingConventionType, DebugInfo, LirOp, MoveKind, Operand};

use crate::error::{Bailout, LowerResult};
use crate::item::LirItem;
use crate::selector::InstructionSelector;
use crate::stubs::StubKey;
use crate::templates::XirArgument;

impl<'a> InstructionSelector<'a> {
    pub(super) fn do_invoke(
        &mut self,
        id: InstId,
        opcode: InvokeKind,
        target: MethodId,
        args: &[InstId],
    ) -> LowerResult<()> {
        let program = self.program;
        let kinds = program.signature_kinds(target);

        if kinds.len() != args.len() {
            return Err(Bailout::UnresolvedPattern(format!(
                "invoke of {} with {} arguments",
                program.display_method(target),
                args.len()
            )));
        }

        let snippet = match opcode {
            InvokeKind::Static => self.templates.invoke_static(program, target),
            InvokeKind::Special => self.templates.invoke_special(program, target),
            InvokeKind::Virtual => {
                let receiver = XirArgument::Value(self.receiver(target, args)?);
                self.templates.invoke_virtual(program, target, receiver)
            }
            InvokeKind::Interface => {
                let receiver = XirArgument::Value(self.receiver(target, args)?);
                self.templates.invoke_interface(program, target, receiver)
            }
        };
        let snippet = snippet.ok_or(Bailout::MissingTemplate("invoke"))?;

        let template_info = self
            .info_before(id)?
            .map(|info| info.with_exception_edge(None));
        let destination = self.emit_xir(&snippet, template_info, None, Some(target), None)?;

        if destination.is_illegal() {
            return Err(Bailout::UnresolvedPattern(format!(
                "invoke template {} without destination",
                snippet.template.name
            )));
        }

        // selecting the state values may emit code, so it must not land
        // between the argument moves and the call
        let graph = self.graph;
        let data = graph.inst(id);
        let state = data.state_after.or(data.state_before);
        let info = self.debug_info(id, state)?;

        let cc = self
            .target
            .calling_convention(CallingConventionType::JavaCall, &kinds);
        self.frame_map.adjust_outgoing_stack_size(cc.stack_size);
        let (mut arguments, pointer_slots) = self.marshal_arguments(args, &cc)?;

        let kind = if destination.is_constant() {
            CallKind::Direct(target)
        } else {
            arguments.push(destination);
            CallKind::Indirect(target)
        };

        let result = if data.has_value() {
            self.target.return_register(data.kind)
        } else {
            Operand::Illegal
        };

        self.append(LirOp::Call(CallOp {
            kind,
            result: result.clone(),
            arguments,
            info,
            pointer_slots,
        }));

        if result.is_legal() {
            let var = self.result_variable(id)?;
            self.lir().move_(result, var);
        }

        Ok(())
    }

    fn receiver(&self, target: MethodId, args: &[InstId]) -> LowerResult<InstId> {
        match args.first() {
            Some(&receiver) => Ok(receiver),
            None => Err(Bailout::UnresolvedPattern(format!(
                "call of {} without receiver",
                self.program.display_method(target)
            ))),
        }
    }

    /// Moves `args` to the locations of `cc`. Returns the argument locations
    /// and the stack locations holding references.
    pub(crate) fn marshal_arguments(
        &mut self,
        args: &[InstId],
        cc: &CallingConvention,
    ) -> LowerResult<(Vec<Operand>, Vec<Operand>)> {
        assert_eq!(args.len(), cc.locations.len());

        let mut locations = Vec::with_capacity(args.len());
        let mut pointer_slots = Vec::new();

        for (&arg, location) in args.iter().zip(&cc.locations) {
            let mut item = LirItem::new(self, arg)?;

            if location.is_register() {
                item.load_item_force(self, location.clone())?;
            } else {
                item.load_item(self)?;
                let kind = location.kind();
                let move_kind = if kind.is_double_word() {
                    MoveKind::Wide
                } else {
                    MoveKind::Normal
                };
                self.lir()
                    .move_with(item.result(), location.clone(), move_kind, None);

                if kind.is_object() {
                    pointer_slots.push(location.clone());
                }
            }

            locations.push(location.clone());
        }

        Ok((locations, pointer_slots))
    }

    pub(super) fn do_runtime_call(&mut self, id: InstId, call: RuntimeCall, args: &[InstId]) -> LowerResult<()> {
        let info = self.info_before(id)?;
        let mut operands = Vec::with_capacity(args.len());

        for &arg in args {
            operands.push(self.operand(arg)?);
        }

        let result = self.emit_runtime_call(call, operands, info)?;

        if result.is_legal() && self.graph.inst(id).has_value() {
            self.set_result(id, result);
        }

        Ok(())
    }

    /// Calls into the runtime. Returns a variable holding the result, or
    /// `Operand::Illegal` for calls without one.
    pub(crate) fn emit_runtime_call(
        &mut self,
        call: RuntimeCall,
        args: Vec<Operand>,
        info: Option<DebugInfo>,
    ) -> LowerResult<Operand> {
        let kinds = call.arguments();

        if kinds.len() != args.len() {
            return Err(Bailout::UnresolvedPattern(format!(
                "runtime call {} with {} arguments",
                call.name(),
                args.len()
            )));
        }

        let cc = self
            .target
            .calling_convention(CallingConventionType::RuntimeCall, kinds);
        self.frame_map.adjust_outgoing_stack_size(cc.stack_size);

        for (arg, location) in args.into_iter().zip(&cc.locations) {
            let move_kind = if location.is_stack() && location.kind().is_double_word() {
                MoveKind::Wide
            } else {
                MoveKind::Normal
            };
            self.lir().move_with(arg, location.clone(), move_kind, None);
        }

        let stub = self.stubs.stub_for(StubKey::Runtime(call));
        self.frame_map.uses_stub(stub);

        let result_kind = call.result_kind();
        let result = if result_kind.is_legal() {
            self.target.return_register(result_kind)
        } else {
            Operand::Illegal
        };

        self.append(LirOp::Call(CallOp {
            kind: CallKind::Runtime(call),
            result: result.clone(),
            arguments: cc.locations,
            info,
            pointer_slots: Vec::new(),
        }));

        if result.is_illegal() {
            return Ok(Operand::Illegal);
        }

        let var = self.new_variable(result_kind)?;
        self.lir().move_(result, var.clone());
        Ok(var)
    }
}
