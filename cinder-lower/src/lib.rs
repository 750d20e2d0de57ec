use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use cinder_hir::{BlockId, Graph, MethodId, Program};
use cinder_lir::{print_lir, CallSiteTable, DebugInfoTable, FrameMap, LabelTable, LirList, Target};

pub use self::error::{Bailout, LowerResult};
pub use self::flags::{method_pattern_match, LowerFlags};
pub use self::item::LirItem;
pub use self::operands::{OperandMap, OperandPool, VariableFlag};
pub use self::phi::PhiResolver;
pub use self::reduce::{NoStrengthReduction, Reduction, ShiftAddReduction, StrengthReduction};
pub use self::selector::{block_order, DeoptStub, InstructionSelector};
pub use self::stubs::{StubKey, StubRegistry};
pub use self::switch::{compact_ranges, dispatch, lookup_ranges, table_ranges, SwitchRange};
pub use self::templates::{type_hub, DefaultTemplates, TemplateProvider, TemplateSnippet, XirArgument};

mod constants;
mod error;
mod flags;
mod item;
mod operands;
mod phi;
mod reduce;
mod selector;
mod stubs;
mod switch;
mod templates;
mod xir;

/// LIR of one method together with the tables the code emitter needs.
pub struct LoweredMethod {
    pub method: MethodId,
    /// Order in which the blocks were lowered.
    pub order: Vec<BlockId>,
    /// Op lists of all reachable blocks, by block id.
    pub blocks: Vec<LirList>,
    pub variable_count: u32,
    pub operands: OperandMap,
    pub labels: LabelTable,
    pub frame_map: FrameMap,
    pub debug_infos: DebugInfoTable,
    pub call_sites: CallSiteTable,
    pub deopt_stubs: Vec<DeoptStub>,
}

impl LoweredMethod {
    pub fn block(&self, id: BlockId) -> Option<&LirList> {
        self.blocks.iter().find(|list| list.block() == id)
    }

    pub fn op_count(&self) -> usize {
        self.blocks.iter().map(|list| list.len()).sum()
    }
}

/// Lowers graphs for one target. A compiler may be shared between threads;
/// each `compile` call works on its own selector.
pub struct Compiler {
    target: Target,
    flags: LowerFlags,
    templates: Arc<dyn TemplateProvider>,
    stubs: StubRegistry,
    reduction: Box<dyn StrengthReduction>,
}

impl Compiler {
    pub fn new(target: Target, flags: LowerFlags) -> Compiler {
        let templates = Arc::new(DefaultTemplates::new(&target));

        Compiler {
            target,
            flags,
            templates,
            stubs: StubRegistry::new(),
            reduction: Box::new(ShiftAddReduction),
        }
    }

    pub fn with_templates(mut self, templates: Arc<dyn TemplateProvider>) -> Compiler {
        self.templates = templates;
        self
    }

    pub fn with_strength_reduction(mut self, reduction: Box<dyn StrengthReduction>) -> Compiler {
        self.reduction = reduction;
        self
    }

    /// Shares the stubs of another compiler, e.g. one for a second tier.
    pub fn with_stubs(mut self, stubs: StubRegistry) -> Compiler {
        self.stubs = stubs;
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn flags(&self) -> &LowerFlags {
        &self.flags
    }

    pub fn stubs(&self) -> &StubRegistry {
        &self.stubs
    }

    pub fn compile(&self, program: &Program, graph: &Graph) -> LowerResult<LoweredMethod> {
        let start = Instant::now();
        let name = program.display_method(graph.method);

        let mut selector = InstructionSelector::new(
            program,
            graph,
            &self.target,
            &self.flags,
            self.templates.as_ref(),
            &self.stubs,
            self.reduction.as_ref(),
        );

        let order = block_order(graph);

        for &block in &order {
            if let Err(bailout) = selector.lower_block(block) {
                warn!(method = %name, block = block.0, %bailout, "bailout");
                return Err(bailout);
            }
        }

        let lowered = selector.finish(order);

        debug!(
            method = %name,
            blocks = lowered.blocks.len(),
            variables = lowered.variable_count,
            ops = lowered.op_count(),
            duration_us = start.elapsed().as_micros() as u64,
            "lowered"
        );

        if self.flags.should_print_lir(&name) {
            info!("{}", print_lir(&self.target, &name, &lowered.blocks));
        }

        Ok(lowered)
    }
}
