use std::collections::HashMap;

use tracing::trace;

use cinder_lir::Operand;

use crate::error::LowerResult;
use crate::operands::OperandPool;

struct ResolveNode {
    operand: Operand,
    destinations: Vec<usize>,
    visited: bool,
    start_node: bool,
    assigned: bool,
}

impl ResolveNode {
    fn new(operand: Operand) -> ResolveNode {
        ResolveNode {
            operand,
            destinations: Vec::new(),
            visited: false,
            start_node: false,
            assigned: false,
        }
    }
}

/// Orders the moves of a parallel assignment into variables, e.g. the
/// values flowing into the phis of a successor block, such that executing
/// them in order has the effect of executing all at once. A cycle of moves
/// is broken with one temporary.
pub struct PhiResolver {
    nodes: Vec<ResolveNode>,
    // sources that are variables, in registration order
    virtual_operands: Vec<usize>,
    // sources that are not variables (constants, registers, stack slots)
    other_operands: Vec<usize>,
    vreg_table: HashMap<u32, usize>,
    cycle: Option<usize>,
    temp: Operand,
    moves: Vec<(Operand, Operand)>,
}

impl PhiResolver {
    pub fn new() -> PhiResolver {
        PhiResolver {
            nodes: Vec::new(),
            virtual_operands: Vec::new(),
            other_operands: Vec::new(),
            vreg_table: HashMap::new(),
            cycle: None,
            temp: Operand::Illegal,
            moves: Vec::new(),
        }
    }

    /// Registers `dest = src`. Every destination is registered at most once.
    pub fn move_(&mut self, src: Operand, dest: Operand) {
        assert!(dest.is_variable(), "phi destination {} is not a variable", dest);
        assert!(src.is_legal(), "illegal phi source for {}", dest);

        let source = self.create_node(src, true);
        let dest = self.create_node(dest, false);
        self.nodes[source].destinations.push(dest);
    }

    fn create_node(&mut self, operand: Operand, source: bool) -> usize {
        if let Some(var) = operand.as_variable() {
            let node = match self.vreg_table.get(&var.index) {
                Some(&node) => {
                    assert_eq!(self.nodes[node].operand, operand);
                    node
                }
                None => {
                    let node = self.add_node(operand);
                    self.vreg_table.insert(var.index, node);
                    node
                }
            };

            if source && !self.virtual_operands.contains(&node) {
                self.virtual_operands.push(node);
            }

            node
        } else {
            assert!(source, "non-variable {} as phi destination", operand);
            let node = self.add_node(operand);
            self.other_operands.push(node);
            node
        }
    }

    fn add_node(&mut self, operand: Operand) -> usize {
        self.nodes.push(ResolveNode::new(operand));
        self.nodes.len() - 1
    }

    /// Computes the move sequence. Temporaries for breaking cycles come
    /// from `pool`.
    pub fn resolve(mut self, pool: &mut OperandPool) -> LowerResult<Vec<(Operand, Operand)>> {
        for idx in (0..self.virtual_operands.len()).rev() {
            let node = self.virtual_operands[idx];

            if !self.nodes[node].visited {
                self.cycle = None;
                self.visit(None, node, pool)?;
                self.nodes[node].start_node = true;
                assert!(self.temp.is_illegal(), "phi cycle left unresolved");
            }
        }

        for idx in (0..self.other_operands.len()).rev() {
            let node = self.other_operands[idx];

            for dest in self.nodes[node].destinations.clone().into_iter().rev() {
                let src = self.nodes[node].operand.clone();
                let dest = self.nodes[dest].operand.clone();
                self.emit_move(src, dest);
            }
        }

        Ok(self.moves)
    }

    fn visit(&mut self, src: Option<usize>, dest: usize, pool: &mut OperandPool) -> LowerResult<()> {
        if !self.nodes[dest].visited {
            self.nodes[dest].visited = true;

            for &next in self.nodes[dest].destinations.clone().iter().rev() {
                self.visit(Some(dest), next, pool)?;
            }
        } else if !self.nodes[dest].start_node {
            assert!(self.cycle.is_none(), "second phi cycle while resolving one");
            self.cycle = Some(dest);

            let operand = match src {
                Some(src) => self.nodes[src].operand.clone(),
                None => unreachable!("cycle entered at its start node"),
            };
            self.move_to_temp(operand, pool)?;
            return Ok(());
        }

        if !self.nodes[dest].assigned {
            if self.cycle == Some(dest) {
                let operand = self.nodes[dest].operand.clone();
                self.move_temp_to(operand);
                self.nodes[dest].assigned = true;
            } else if let Some(src) = src {
                let src = self.nodes[src].operand.clone();
                let operand = self.nodes[dest].operand.clone();
                self.emit_move(src, operand);
                self.nodes[dest].assigned = true;
            }
        }

        Ok(())
    }

    fn move_to_temp(&mut self, src: Operand, pool: &mut OperandPool) -> LowerResult<()> {
        assert!(self.temp.is_illegal());
        self.temp = pool.new_variable(src.kind())?;
        trace!("phi cycle broken through {}", self.temp);
        let temp = self.temp.clone();
        self.emit_move(src, temp);
        Ok(())
    }

    fn move_temp_to(&mut self, dest: Operand) {
        assert!(self.temp.is_legal());
        let temp = std::mem::replace(&mut self.temp, Operand::Illegal);
        self.emit_move(temp, dest);
    }

    fn emit_move(&mut self, src: Operand, dest: Operand) {
        self.moves.push((src, dest));
    }
}
