use std::fmt::Write;

use crate::list::LirList;
use crate::op::{CallKind, LirOp, MoveKind};
use crate::operand::{Address, Operand};
use crate::target::Target;

pub fn print_lir(target: &Target, name: &str, blocks: &[LirList]) -> String {
    let mut out = String::new();
    writeln!(out, "lir for {} ({}):", name, target.arch).unwrap();

    for list in blocks {
        for (idx, op) in list.ops().iter().enumerate() {
            match op {
                LirOp::BlockLabel(block) => writeln!(out, "B{}:", block.0).unwrap(),
                LirOp::Label(label) => writeln!(out, "  L{}:", label.0).unwrap(),
                _ => writeln!(out, "  {:>3} {}", idx, format_op(target, op)).unwrap(),
            }
        }
    }

    out
}

fn opnd(target: &Target, operand: &Operand) -> String {
    match operand {
        Operand::Register(reg, kind) => format!("{}{}", target.register_name(*reg), kind),
        Operand::Address(address) => addr(target, address),
        _ => operand.to_string(),
    }
}

fn addr(target: &Target, address: &Address) -> String {
    let mut out = format!("[{}", opnd(target, &address.base));
    if address.index.is_legal() {
        write!(out, " + {}*{}", opnd(target, &address.index), address.scale.value()).unwrap();
    }
    if address.disp != 0 {
        write!(out, " {:+}", address.disp).unwrap();
    }
    write!(out, "]{}", address.kind).unwrap();
    out
}

pub fn format_op(target: &Target, op: &LirOp) -> String {
    let name = op.name();

    match op {
        LirOp::Label(_) | LirOp::BlockLabel(_) | LirOp::StdEntry => name.into(),
        LirOp::OsrEntry(buffer) => format!("{} {}", name, opnd(target, buffer)),
        LirOp::Move { src, dst, kind, .. } => {
            let suffix = match kind {
                MoveKind::Normal => "",
                MoveKind::Wide => "_wide",
                MoveKind::Volatile => "_volatile",
            };
            format!("{}{} {} -> {}", name, suffix, opnd(target, src), opnd(target, dst))
        }
        LirOp::Lea { address, result } => {
            format!("{} {} -> {}", name, addr(target, address), opnd(target, result))
        }
        LirOp::Arith { x, y, result, .. } | LirOp::Logic { x, y, result, .. } => format!(
            "{} {}, {} -> {}",
            name,
            opnd(target, x),
            opnd(target, y),
            opnd(target, result)
        ),
        LirOp::Shift {
            x, count, result, ..
        } => format!(
            "{} {}, {} -> {}",
            name,
            opnd(target, x),
            opnd(target, count),
            opnd(target, result)
        ),
        LirOp::Negate { x, result }
        | LirOp::MathOp { x, result, .. }
        | LirOp::BitOp { x, result, .. } => {
            format!("{} {} -> {}", name, opnd(target, x), opnd(target, result))
        }
        LirOp::Cmp { cond, x, y } => format!(
            "{} {} {}, {}",
            name,
            cond.name(),
            opnd(target, x),
            opnd(target, y)
        ),
        LirOp::CompareToInt { x, y, result, .. } => format!(
            "{} {}, {} -> {}",
            name,
            opnd(target, x),
            opnd(target, y),
            opnd(target, result)
        ),
        LirOp::Convert { op, src, result } => format!(
            "{} {} {} -> {}",
            name,
            op,
            opnd(target, src),
            opnd(target, result)
        ),
        LirOp::CondMove {
            cond,
            tval,
            fval,
            result,
        } => format!(
            "{} {} {}, {} -> {}",
            name,
            cond.name(),
            opnd(target, tval),
            opnd(target, fval),
            opnd(target, result)
        ),
        LirOp::Branch {
            cond,
            target: dest,
            unordered,
            ..
        } => match unordered {
            Some(unordered) => format!("{} {} {} (unordered B{})", name, cond.name(), dest, unordered.0),
            None => format!("{} {} {}", name, cond.name(), dest),
        },
        LirOp::Jump { target: dest, .. } => format!("{} {}", name, dest),
        LirOp::TableSwitch {
            index,
            low_key,
            targets,
            default,
            ..
        } => {
            let targets: Vec<String> = targets.iter().map(|b| format!("B{}", b.0)).collect();
            format!(
                "{} {} from {} [{}] default B{}",
                name,
                opnd(target, index),
                low_key,
                targets.join(", "),
                default.0
            )
        }
        LirOp::NullCheck { object, .. } => format!("{} {}", name, opnd(target, object)),
        LirOp::MemoryBarrier(barriers) => format!("{} {}", name, barriers.name()),
        LirOp::Call(call) => {
            let args: Vec<String> = call.arguments.iter().map(|a| opnd(target, a)).collect();
            let callee = match call.kind {
                CallKind::Direct(method) | CallKind::Indirect(method) => format!("m{}", method.0),
                CallKind::Runtime(call) => call.name().into(),
            };
            format!(
                "{} {}({}) -> {}",
                name,
                callee,
                args.join(", "),
                opnd(target, &call.result)
            )
        }
        LirOp::Xir(xir) => {
            let slots: Vec<String> = xir.slots.iter().map(|s| opnd(target, s)).collect();
            format!(
                "{} {} [{}] -> {}",
                name,
                xir.template.name,
                slots.join(", "),
                opnd(target, &xir.result)
            )
        }
        LirOp::Safepoint { .. } => name.into(),
        LirOp::ThrowException {
            exception_pc,
            exception,
            ..
        } => format!(
            "{} {} at {}",
            name,
            opnd(target, exception),
            opnd(target, exception_pc)
        ),
        LirOp::UnwindException { exception, .. } => format!("{} {}", name, opnd(target, exception)),
        LirOp::Return(value) => format!("{} {}", name, opnd(target, value)),
        LirOp::Prefetch { address, .. } => format!("{} {}", name, addr(target, address)),
        LirOp::CompareAndSwap {
            address,
            expected,
            new_value,
            ..
        } => format!(
            "{} {}, {}, {}",
            name,
            addr(target, address),
            opnd(target, expected),
            opnd(target, new_value)
        ),
    }
}
