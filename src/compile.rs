//! Template compiler entry point.
//!
//! [`TemplateCompiler`] is the parse context. It owns reusable working tables,
//! so keep one instance per thread and call [`TemplateCompiler::compile`] for
//! each template.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::emit::{Emitter, SlotTable};
use crate::error::{
    CompilerError, ERR_EMPTY_TEMPLATE, ERR_OPTION_FLAG, ERR_TEMPLATE_SIZE,
};
use crate::format::{ChildOp, PropOp, Skeleton, StateOp, TemplateFlags, MAX_10BIT, MAX_12BIT};
use crate::parse::{ParseState, Parser};
use crate::scanner::Scanner;

// ═══════════════════════════════════════════════════════════════════════════════
// INVARIANT ORACLE
// ═══════════════════════════════════════════════════════════════════════════════

/// Decides whether an expression can be hoisted into the static skeleton.
///
/// Queried at most once per expression index.
pub trait InvariantOracle {
    fn is_invariant(&mut self, expr: usize) -> bool;
}

impl<F: FnMut(usize) -> bool> InvariantOracle for F {
    fn is_invariant(&mut self, expr: usize) -> bool {
        self(expr)
    }
}

/// Precomputed oracle answers, indexed by expression. Missing entries are
/// treated as dynamic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticOracle(pub Vec<bool>);

impl InvariantOracle for StaticOracle {
    fn is_invariant(&mut self, expr: usize) -> bool {
        self.0.get(expr).copied().unwrap_or(false)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS / ARTIFACT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOptions {
    /// Compile templates into the SVG namespace.
    #[serde(default)]
    pub svg: bool,
    /// Directory of the incremental artifact cache, disabled when unset.
    #[serde(default)]
    pub cache_dir: Option<String>,
}

/// Result of compiling one template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateCompilationArtifact {
    /// Template cloning disabled with the `-c` option.
    pub disable_cloning: bool,
    pub flags: TemplateFlags,
    pub template: Skeleton,
    pub prop_op_codes: Vec<PropOp>,
    pub child_op_codes: Vec<ChildOp>,
    pub state_op_codes: Vec<StateOp>,
    pub data: Vec<String>,
    pub dynamic_exprs: Vec<usize>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct TemplateCompiler {
    state: ParseState,
}

impl TemplateCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles template fragments into an artifact.
    ///
    /// Working tables are reset before returning, on success and on error.
    pub fn compile<S, O>(
        &mut self,
        statics: &[S],
        svg: bool,
        oracle: &mut O,
    ) -> Result<TemplateCompilationArtifact, CompilerError>
    where
        S: AsRef<str>,
        O: InvariantOracle + ?Sized,
    {
        let statics: Vec<&str> = statics.iter().map(|s| s.as_ref()).collect();
        self.state.reset();
        let result = self.compile_inner(&statics, svg, oracle);
        self.state.reset();
        result
    }

    fn compile_inner<O: InvariantOracle + ?Sized>(
        &mut self,
        statics: &[&str],
        svg: bool,
        oracle: &mut O,
    ) -> Result<TemplateCompilationArtifact, CompilerError> {
        if statics.is_empty() {
            return Err(CompilerError::new(ERR_EMPTY_TEMPLATE, "empty template", 0, 0));
        }

        let mut parser = Parser::new(Scanner::new(statics), &mut self.state, oracle);
        let disable_cloning = parse_options(&mut parser.scanner)?;
        let root = parser.element(None)?;
        let scanner = parser.scanner;

        let state = &mut self.state;
        let slots = SlotTable::assign(&state.state_ops);
        let mut emitter = Emitter::new(&state.nodes, &slots);
        if let Some(root) = root {
            emitter.emit(root)?;
        }
        let prop_op_codes = std::mem::take(&mut emitter.prop_ops);
        let child_op_codes = std::mem::take(&mut emitter.child_ops);

        let flags = TemplateFlags {
            svg,
            state_slots: slots.size,
            dynamic_children: state.children_size,
        };
        if flags.state_slots > MAX_10BIT
            || flags.dynamic_children > MAX_10BIT
            || state.data.len() > MAX_12BIT as usize + 1
            || state.dynamic_exprs.len() > MAX_12BIT as usize + 1
        {
            // Reported where parsing stopped.
            return Err(scanner.error(ERR_TEMPLATE_SIZE, "template is too large"));
        }

        debug!(
            "compiled <{}> template: {} slots, {} dynamic children, {} exprs",
            state.root_tag,
            flags.state_slots,
            flags.dynamic_children,
            state.dynamic_exprs.len()
        );

        let template = if state.has_statics {
            Skeleton::Parts(state.template.take())
        } else {
            Skeleton::Tag(std::mem::take(&mut state.root_tag))
        };

        Ok(TemplateCompilationArtifact {
            disable_cloning,
            flags,
            template,
            prop_op_codes,
            child_op_codes,
            state_op_codes: std::mem::take(&mut state.state_ops),
            data: std::mem::take(&mut state.data),
            dynamic_exprs: std::mem::take(&mut state.dynamic_exprs),
        })
    }
}

/// Parses template options at the start of the first fragment:
///   `-c` disables template cloning.
fn parse_options(scanner: &mut Scanner<'_>) -> Result<bool, CompilerError> {
    let text = scanner.text().as_bytes();
    if text.len() <= 1 {
        return Ok(false);
    }
    if text[0] != b'-' {
        scanner.whitespace();
        return Ok(false);
    }
    if text[1] != b'c' {
        return Err(scanner.error(ERR_OPTION_FLAG, "expected an option flag"));
    }
    scanner.skip(2);
    if !scanner.whitespace() {
        return Err(scanner.error(ERR_OPTION_FLAG, "expected a whitespace"));
    }
    Ok(true)
}

/// Compiles a single template with a fresh compiler.
pub fn compile_template<S, O>(
    statics: &[S],
    svg: bool,
    oracle: &mut O,
) -> Result<TemplateCompilationArtifact, CompilerError>
where
    S: AsRef<str>,
    O: InvariantOracle + ?Sized,
{
    TemplateCompiler::new().compile(statics, svg, oracle)
}
