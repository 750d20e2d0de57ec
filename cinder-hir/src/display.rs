use std::fmt::Write;

use crate::{Graph, InstId, InstKind, Program};

pub fn dump_graph(program: &Program, graph: &Graph) -> String {
    let mut out = String::new();
    writeln!(out, "graph {}", program.display_method(graph.method)).unwrap();

    for block in &graph.blocks {
        let preds: Vec<String> = block.predecessors.iter().map(|b| format!("B{}", b.0)).collect();
        write!(out, "B{}", block.id.0).unwrap();
        if !preds.is_empty() {
            write!(out, " <- {}", preds.join(", ")).unwrap();
        }
        if block.is_exception_entry {
            write!(out, " (handler)").unwrap();
        }
        writeln!(out, ":").unwrap();

        for &phi in &block.phis {
            writeln!(out, "  {}", fmt_inst(graph, phi)).unwrap();
        }

        for &inst in &block.instructions {
            writeln!(out, "  {}", fmt_inst(graph, inst)).unwrap();
        }
    }

    out
}

fn fmt_inst(graph: &Graph, id: InstId) -> String {
    let inst = graph.inst(id);
    let mut line = String::new();

    if inst.has_value() {
        write!(line, "{}{} = ", inst.kind, id.index()).unwrap();
    }

    line.push_str(inst.op.name());

    match inst.op {
        InstKind::Constant(value) => write!(line, " {}", value).unwrap(),
        InstKind::Phi { ref inputs, .. } => {
            for (block, value) in inputs {
                write!(line, " [B{}: {}]", block.0, value.index()).unwrap();
            }
        }
        _ => {
            let inputs = inst.op.inputs();
            for input in inputs {
                write!(line, " {}{}", graph.inst(input).kind, input.index()).unwrap();
            }
            for sux in inst.op.successors() {
                write!(line, " B{}", sux.0).unwrap();
            }
        }
    }

    if !inst.is_live {
        line.push_str(" (dead)");
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArithOp, GraphBuilder, Kind, MethodData};

    #[test]
    fn test_dump() {
        let mut prog = Program::new();
        let holder = prog.add_class("Foo", None);
        let method = prog.add_method(MethodData {
            name: "add".into(),
            holder,
            params: vec![Kind::Int],
            return_kind: Kind::Int,
            is_static: true,
            vtable_index: None,
            is_resolved: true,
        });

        let mut b = GraphBuilder::new(&prog, method);
        let one = b.int(1);
        let x = b.param(0);
        let sum = b.arith(ArithOp::Add, x, one);
        b.ret(Some(sum));
        let graph = b.finish();

        let dump = dump_graph(&prog, &graph);
        assert!(dump.starts_with("graph Foo.add\nB0:\n"));
        assert!(dump.contains("Arithmetic i0 i1"));
        assert!(dump.contains("Return i2"));
    }
}
