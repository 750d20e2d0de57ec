use std::sync::Arc;

use tracing::trace;

use cinder_hir::{InstId, MethodId};
use cinder_lir::{DebugInfo, LirOp, Operand, XirOp};

use crate::error::LowerResult;
use crate::item::LirItem;
use crate::selector::InstructionSelector;
use crate::stubs::StubKey;
use crate::templates::{TemplateSnippet, XirArgument};

fn fill(slots: &mut [Option<Operand>], slot: usize, operand: Operand, template: &str) {
    assert!(
        slots[slot].is_none(),
        "slot {} of template {} filled twice",
        slot,
        template
    );
    slots[slot] = Some(operand);
}

impl<'a> InstructionSelector<'a> {
    /// Instantiates `snippet` and appends the op. Returns the template's
    /// result, `Operand::Illegal` for templates without one; the result
    /// becomes the operand of `inst` if given.
    pub(crate) fn emit_xir(
        &mut self,
        snippet: &TemplateSnippet,
        info: Option<DebugInfo>,
        info_after: Option<DebugInfo>,
        method: Option<MethodId>,
        inst: Option<InstId>,
    ) -> LowerResult<Operand> {
        let (op, result) = self.prepare_xir(snippet, info, info_after, method)?;

        if let Some(op) = op {
            self.append_xir(op);
        }

        if let Some(inst) = inst {
            if result.is_legal() && self.graph.inst(inst).has_value() {
                self.set_result(inst, result.clone());
            }
        }

        Ok(result)
    }

    /// Binds operands to all slots of the template. Moves needed for the
    /// inputs are appended right away, the op itself is returned so callers
    /// can place barriers around it. No op is needed when the result is a
    /// constant and the template has no code.
    pub(crate) fn prepare_xir(
        &mut self,
        snippet: &TemplateSnippet,
        info: Option<DebugInfo>,
        info_after: Option<DebugInfo>,
        method: Option<MethodId>,
    ) -> LowerResult<(Option<XirOp>, Operand)> {
        let template = &snippet.template;
        let name = template.name;
        assert_eq!(
            snippet.arguments.len(),
            template.param_count(),
            "arguments of template {}",
            name
        );
        trace!(template = name, slots = template.slot_count, "emit template");

        self.frame_map
            .adjust_outgoing_stack_size(template.outgoing_stack_size);

        let mut slots: Vec<Option<Operand>> = vec![None; template.slot_count];
        let mut inputs = Vec::new();
        let mut input_temps = Vec::new();
        let mut temps = Vec::new();

        let mut result = Operand::Illegal;

        if let Some(res) = template.result {
            if template.allocate_result {
                result = self.new_variable(res.kind)?;
                fill(&mut slots, res.slot, result.clone(), name);
            }
        }

        for temp in &template.temps {
            if let (Some(reg), false) = (temp.fixed, temp.reserve) {
                fill(&mut slots, temp.slot, Operand::Register(reg, temp.kind), name);
            }
        }

        for callee in &template.callee_templates {
            let stub = self.stubs.stub_for(StubKey::Template(callee.name));
            self.frame_map.uses_stub(stub);
        }

        for constant in &template.constants {
            fill(&mut slots, constant.slot, Operand::Constant(constant.value), name);
        }

        for (param, argument) in template.params.iter().zip(&snippet.arguments) {
            let operand = match argument {
                XirArgument::Constant(value) => {
                    fill(&mut slots, param.slot, Operand::Constant(*value), name);
                    continue;
                }

                XirArgument::Value(value) => {
                    let mut item = LirItem::new(self, *value)?;

                    if !(param.can_be_constant && item.is_constant()) {
                        if param.kind.is_byte_sized() {
                            item.load_byte_item(self)?;
                        } else {
                            item.load_item(self)?;
                        }
                    }

                    item.result()
                }

                XirArgument::Operand(operand) => {
                    let keep = operand.is_variable_or_register()
                        || (param.can_be_constant && operand.is_constant());

                    if keep {
                        operand.clone()
                    } else {
                        let var = self.new_variable(operand.kind())?;
                        self.lir().move_(operand.clone(), var.clone());
                        var
                    }
                }
            };

            if operand.is_constant() {
                fill(&mut slots, param.slot, operand, name);
            } else if param.destroyed {
                let copy = self.new_variable(operand.kind())?;
                self.lir().move_(operand, copy.clone());
                fill(&mut slots, param.slot, copy, name);
                input_temps.push(param.slot);
            } else {
                fill(&mut slots, param.slot, operand, name);
                inputs.push(param.slot);
            }
        }

        for temp in template.temp_operands() {
            let operand = match temp.fixed {
                Some(reg) => Operand::Register(reg, temp.kind),
                None => self.new_variable(temp.kind)?,
            };
            fill(&mut slots, temp.slot, operand, name);
            temps.push(temp.slot);
        }

        let mut result_index = None;

        if let Some(res) = template.result {
            if !template.allocate_result {
                result = match slots[res.slot] {
                    Some(ref operand) => operand.clone(),
                    None => panic!("result slot {} of template {} not filled", res.slot, name),
                };
            }
            result_index = Some(res.slot);
        }

        let slots: Vec<Operand> = slots
            .into_iter()
            .enumerate()
            .map(|(slot, operand)| match operand {
                Some(operand) => operand,
                None => panic!("slot {} of template {} not filled", slot, name),
            })
            .collect();

        if result.is_constant() && template.is_empty() {
            return Ok((None, result));
        }

        let input_count = inputs.len();
        let input_temp_count = input_temps.len();
        let temp_count = temps.len();
        let mut operand_indices = inputs;
        operand_indices.extend(input_temps);
        operand_indices.extend(temps);

        let op = XirOp {
            template: Arc::clone(template),
            slots,
            result: result.clone(),
            operand_indices,
            input_count,
            input_temp_count,
            temp_count,
            result_index,
            info,
            info_after,
            method,
        };

        Ok((Some(op), result))
    }

    pub(crate) fn append_xir(&mut self, op: XirOp) {
        self.append(LirOp::Xir(Box::new(op)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::tests::with_selector;
    use cinder_hir::{ConstValue, Kind, RuntimeCall};
    use cinder_lir::cpu::x64;
    use cinder_lir::{Target, TemplateBuilder};

    fn xir_ops(sel: &mut InstructionSelector) -> Vec<XirOp> {
        sel.lir()
            .ops()
            .iter()
            .filter_map(|op| match op {
                LirOp::Xir(xir) => Some((**xir).clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_destroyed_param_is_copied() {
        with_selector(
            Target::x64(),
            |b| vec![b.param(0)],
            |sel, insts| {
                let mut asm = TemplateBuilder::with_result(Kind::Int);
                let x = asm.destroyed_param(Kind::Int);
                let y = asm.param(Kind::Int);
                let tmp = asm.temp(Kind::Int);
                let result = asm.result().unwrap();
                asm.add(Kind::Int, x, x, y);
                asm.mov(Kind::Int, tmp, x);
                asm.mov(Kind::Int, result, tmp);
                let snippet = TemplateSnippet::new(
                    asm.finish("add_twice"),
                    vec![XirArgument::Value(insts[0]), XirArgument::Value(insts[0])],
                );

                let original = sel.operand(insts[0]).unwrap();
                let result = sel.emit_xir(&snippet, None, None, None, None).unwrap();
                let op = xir_ops(sel).pop().unwrap();

                assert!(result.is_variable());
                assert_eq!(op.inputs(), &[2]);
                assert_eq!(op.input_temps(), &[1]);
                assert_eq!(op.temps(), &[3]);
                assert_eq!(op.slots[2], original);
                assert_ne!(op.slots[1], original);
                assert_eq!(op.result_index, Some(0));
                assert!(op.slots.iter().all(|slot| slot.is_legal()));
            },
        );
    }

    #[test]
    fn test_constants_and_fixed_temps() {
        with_selector(
            Target::x64(),
            |b| vec![b.int(3)],
            |sel, insts| {
                let mut asm = TemplateBuilder::new();
                let value = asm.constant_param(Kind::Int);
                let fixed = asm.fixed_temp(Kind::Word, x64::R11.into());
                let reserved = asm.reserved_temp(Kind::Word, x64::R10.into());
                let zero = asm.constant(ConstValue::Int(0));
                asm.pstore(Kind::Int, fixed, value, 0);
                asm.mov(Kind::Word, reserved, zero);
                let snippet = TemplateSnippet::new(asm.finish("store"), vec![XirArgument::Value(insts[0])]);

                let result = sel.emit_xir(&snippet, None, None, None, None).unwrap();
                let op = xir_ops(sel).pop().unwrap();

                assert!(result.is_illegal());
                assert_eq!(op.slots[0], Operand::int(3));
                assert_eq!(op.slots[1], Operand::register(x64::R11, Kind::Word));
                assert_eq!(op.slots[2], Operand::register(x64::R10, Kind::Word));
                assert_eq!(op.slots[3], Operand::int(0));
                assert!(op.inputs().is_empty());
                assert_eq!(op.temps(), &[2]);
            },
        );
    }

    #[test]
    fn test_result_aliases_param() {
        with_selector(
            Target::arm64(),
            |b| vec![b.param(0)],
            |sel, insts| {
                let mut asm = TemplateBuilder::new();
                let x = asm.param(Kind::Int);
                asm.mark("check");
                let snippet = TemplateSnippet::new(
                    asm.finish_with_result(x, "identity"),
                    vec![XirArgument::Value(insts[0])],
                );

                let result = sel.emit_xir(&snippet, None, None, None, None).unwrap();
                assert_eq!(result, sel.operand(insts[0]).unwrap());
            },
        );
    }

    #[test]
    fn test_empty_template_with_constant_result() {
        with_selector(
            Target::arm64(),
            |_| Vec::new(),
            |sel, _| {
                let mut asm = TemplateBuilder::new();
                let destination = asm.constant_param(Kind::Word);
                let snippet = TemplateSnippet::new(
                    asm.finish_with_result(destination, "direct"),
                    vec![XirArgument::Constant(ConstValue::Word(0))],
                );

                let len = sel.lir().len();
                let result = sel.emit_xir(&snippet, None, None, None, None).unwrap();
                assert_eq!(result, Operand::Constant(ConstValue::Word(0)));
                assert_eq!(sel.lir().len(), len);
            },
        );
    }

    #[test]
    fn test_callee_templates_register_stubs() {
        with_selector(
            Target::x64(),
            |_| Vec::new(),
            |sel, _| {
                let mut slow = TemplateBuilder::new();
                slow.call_runtime(RuntimeCall::Deoptimize, None, &[]);
                let slow = Arc::new(slow.finish("slow_path"));

                let mut asm = TemplateBuilder::new();
                asm.call_stub(slow, None, &[]);
                let snippet = TemplateSnippet::new(asm.finish("with_stub"), Vec::new());

                sel.emit_xir(&snippet, None, None, None, None).unwrap();
                let stub = sel.stubs.find(StubKey::Template("slow_path")).unwrap();
                assert!(sel.frame_map.used_stubs().contains(&stub));
            },
        );
    }

    #[test]
    #[should_panic(expected = "arguments of template")]
    fn test_argument_count_mismatch() {
        with_selector(
            Target::x64(),
            |_| Vec::new(),
            |sel, _| {
                let mut asm = TemplateBuilder::new();
                asm.param(Kind::Int);
                let snippet = TemplateSnippet::new(asm.finish("one_param"), Vec::new());
                let _ = sel.emit_xir(&snippet, None, None, None, None);
            },
        );
    }
}
