//! Parse Module
//!
//! Recursive-descent element parser over indentation-significant markup.
//! Each call to [`Parser::element`] consumes one element and everything that
//! is indented deeper than it, appending to the shared working tables in
//! [`ParseState`].

use lazy_static::lazy_static;
use regex::Regex;

use crate::compile::InvariantOracle;
use crate::error::{
    CompilerError, ERR_BINDING_NAME, ERR_CLASS_NAME, ERR_EXPECTED_EQ, ERR_EXPECTED_EXPR,
    ERR_TAG_NAME, ERR_TEMPLATE_SIZE,
};
use crate::format::{CommonProp, PropOp, SkeletonBuilder, StateOp, MAX_10BIT};
use crate::scanner::Scanner;

lazy_static! {
    static ref VOID_ELEMENTS: Regex = Regex::new(
        r"^(audio|video|embed|input|param|source|textarea|track|area|base|link|meta|br|col|hr|img|wbr)$"
    )
    .unwrap();
}

/// Indentation level assigned to content that continues on the tag's line.
const INLINE_INDENT_LEVEL: usize = 1 << 16;

pub(crate) type NodeId = usize;

/// Child op as recorded during parsing. `SetNext` still points into the state
/// op stream; the emitter resolves it to a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PendingChildOp {
    Child { input: u32 },
    SetNext { state_index: usize },
}

#[derive(Debug)]
pub(crate) struct ParsedElement {
    /// Index of the state op that reaches this element, `None` for the root.
    pub state_index: Option<usize>,
    pub prop_ops: Vec<PropOp>,
    pub child_ops: Vec<PendingChildOp>,
    pub children: Vec<NodeId>,
}

/// Working tables shared by every level of one parse.
#[derive(Debug, Default)]
pub(crate) struct ParseState {
    pub root_tag: String,
    /// Something was folded into the skeleton besides the bare root tag.
    pub has_statics: bool,
    pub children_size: u32,
    pub template: SkeletonBuilder,
    pub data: Vec<String>,
    pub state_ops: Vec<StateOp>,
    pub dynamic_exprs: Vec<usize>,
    pub nodes: Vec<ParsedElement>,
}

impl ParseState {
    pub fn reset(&mut self) {
        self.root_tag.clear();
        self.has_statics = false;
        self.children_size = 0;
        self.template.clear();
        self.data.clear();
        self.state_ops.clear();
        self.dynamic_exprs.clear();
        self.nodes.clear();
    }

    /// Registers a dynamic expression and returns its input index.
    fn dynamic_expr(&mut self, expr: usize) -> u32 {
        self.dynamic_exprs.push(expr);
        (self.dynamic_exprs.len() - 1) as u32
    }

    /// Registers a binding key and returns its data index.
    fn data(&mut self, key: &str) -> u32 {
        self.data.push(key.to_string());
        (self.data.len() - 1) as u32
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
struct PrevContent(u8);

impl PrevContent {
    const NONE: PrevContent = PrevContent(0);
    const TEXT: PrevContent = PrevContent(1);
    const EXPR: PrevContent = PrevContent(1 << 1);

    fn has(self, other: PrevContent) -> bool {
        self.0 & other.0 != 0
    }
}

pub(crate) struct Parser<'a, 's, O: InvariantOracle + ?Sized> {
    pub scanner: Scanner<'a>,
    state: &'s mut ParseState,
    oracle: &'s mut O,
}

impl<'a, 's, O: InvariantOracle + ?Sized> Parser<'a, 's, O> {
    pub fn new(scanner: Scanner<'a>, state: &'s mut ParseState, oracle: &'s mut O) -> Self {
        Parser {
            scanner,
            state,
            oracle,
        }
    }

    fn error(&self, code: &str, message: &str) -> CompilerError {
        self.scanner.error(code, message)
    }

    /// Parses an element at the current indentation level.
    ///
    /// Returns `None` when the element carries no dynamic data and has no
    /// dynamic descendants.
    pub fn element(&mut self, state_index: Option<usize>) -> Result<Option<NodeId>, CompilerError> {
        let mut prop_ops: Vec<PropOp> = Vec::new();
        let mut child_ops: Vec<PendingChildOp> = Vec::new();
        let mut children: Vec<NodeId> = Vec::new();
        let mut prev = PrevContent::NONE;
        let indent = self.scanner.indent;

        let tag_name = self
            .scanner
            .identifier()
            .ok_or_else(|| self.error(ERR_TAG_NAME, "expected a valid tag name"))?;
        if state_index.is_none() {
            self.state.root_tag = tag_name.to_string();
        }
        if indent < INLINE_INDENT_LEVEL {
            self.scanner.indent = INLINE_INDENT_LEVEL;
        }
        self.state.template.text("<");
        self.state.template.text(tag_name);

        // Dynamic class name, e.g. `div${cls}`
        if let Some(expr) = self.scanner.take_expr() {
            if self.oracle.is_invariant(expr) {
                self.state.has_statics = true;
                self.state.template.text(" class=\"");
                self.state.template.expr(expr);
                self.state.template.text("\"");
            } else {
                let input = self.state.dynamic_expr(expr);
                prop_ops.push(PropOp::Common {
                    prop: CommonProp::ClassName,
                    input,
                });
            }
        } else {
            // Static class names, e.g. `div.classA.classB`
            let mut class_name: Option<String> = None;
            while self.scanner.peek() == Some(b'.') {
                self.scanner.skip(1);
                let name = self
                    .scanner
                    .identifier()
                    .ok_or_else(|| self.error(ERR_CLASS_NAME, "expected a valid class name"))?;
                match class_name.as_mut() {
                    Some(c) => {
                        c.push(' ');
                        c.push_str(name);
                    }
                    None => class_name = Some(name.to_string()),
                }
            }
            if let Some(class_name) = class_name {
                self.state.has_statics = true;
                self.state.template.text(" class=\"");
                self.state.template.text(&class_name);
                self.state.template.text("\"");
            }
        }

        self.scanner.whitespace();
        while self.scanner.indent > indent {
            let Some(c) = self.scanner.peek() else {
                break;
            };
            match c {
                b':' => {
                    self.scanner.skip(1);
                    let key = self
                        .scanner
                        .identifier()
                        .ok_or_else(|| self.error(ERR_BINDING_NAME, "expected a valid attribute name"))?;
                    self.attribute(&mut prop_ops, key)?;
                }
                b'.' => {
                    self.scanner.skip(1);
                    let key = self
                        .scanner
                        .property_name()
                        .ok_or_else(|| self.error(ERR_BINDING_NAME, "expected a valid property name"))?;
                    let (input, data) = self.dynamic_prop(key)?;
                    prop_ops.push(PropOp::Property { input, data });
                }
                b'*' => {
                    self.scanner.skip(1);
                    let key = self
                        .scanner
                        .property_name()
                        .ok_or_else(|| self.error(ERR_BINDING_NAME, "expected a valid property name"))?;
                    let (input, data) = self.dynamic_prop(key)?;
                    prop_ops.push(PropOp::DiffDomProperty { input, data });
                }
                b'~' => {
                    self.scanner.skip(1);
                    let key = self
                        .scanner
                        .identifier()
                        .ok_or_else(|| self.error(ERR_BINDING_NAME, "expected a valid property name"))?;
                    let (input, data) = self.dynamic_prop(key)?;
                    prop_ops.push(PropOp::Style { input, data });
                }
                b'@' => {
                    self.scanner.skip(1);
                    let key = self
                        .scanner
                        .identifier()
                        .ok_or_else(|| self.error(ERR_BINDING_NAME, "expected a valid event name"))?;
                    let (input, data) = self.dynamic_prop(key)?;
                    prop_ops.push(PropOp::Event { input, data });
                }
                b'$' => {
                    self.scanner.skip(1);
                    let expr = self.scanner.take_expr().ok_or_else(|| {
                        self.error(ERR_EXPECTED_EXPR, "expected an attribute directive expression")
                    })?;
                    let input = self.state.dynamic_expr(expr);
                    prop_ops.push(PropOp::Directive { input });
                }
                _ => break,
            }

            self.scanner.whitespace();
        }
        self.state.template.text(">");

        if !VOID_ELEMENTS.is_match(tag_name) {
            while self.scanner.indent > indent {
                if !self.scanner.at_fragment_end() {
                    self.state.has_statics = true;

                    if prev.has(PrevContent::EXPR) {
                        child_ops.push(PendingChildOp::SetNext {
                            state_index: self.state.state_ops.len(),
                        });
                        self.state.state_ops.push(StateOp::Next { save: true });
                    } else {
                        self.state.state_ops.push(StateOp::Next { save: false });
                    }

                    let text = self.scanner.string(false)?;
                    if !text.is_empty() {
                        // Text, expr, text: an anchor keeps the two text nodes apart.
                        if prev.has(PrevContent::EXPR) && prev.has(PrevContent::TEXT) {
                            self.state.template.text("<!>");
                            self.state.state_ops.pop();
                            self.state.state_ops.push(StateOp::Remove);
                            self.state.state_ops.push(StateOp::Next { save: false });
                        }
                        prev = PrevContent::TEXT;
                        self.state.template.text(&text);
                    } else {
                        prev = PrevContent::NONE;
                        let start = self.state.state_ops.len();
                        if let Some(child) = self.element(Some(start - 1))? {
                            children.push(child);
                        }
                        let end = self.state.state_ops.len();
                        if end != start {
                            let offset = (end - start) as u32;
                            if offset > MAX_10BIT {
                                return Err(self.error(ERR_TEMPLATE_SIZE, "template is too large"));
                            }
                            let save = self.state.state_ops[start - 1].assigns_slot();
                            self.state.state_ops[start - 1] = StateOp::Enter { offset, save };
                            self.state.state_ops.push(StateOp::Next { save: false });
                        }
                    }
                } else if self.scanner.has_expr() {
                    prev = PrevContent(prev.0 | PrevContent::EXPR.0);
                    let Some(expr) = self.scanner.take_expr() else {
                        break;
                    };
                    let input = self.state.dynamic_expr(expr);
                    child_ops.push(PendingChildOp::Child { input });
                    self.state.children_size += 1;
                } else {
                    break;
                }

                self.scanner.whitespace();
            }

            self.state.template.text("</");
            self.state.template.text(tag_name);
            self.state.template.text(">");

            self.trim_state_ops(state_index);
        }

        let has_ops = !prop_ops.is_empty() || !child_ops.is_empty();
        match state_index {
            Some(si) if has_ops => {
                let op = self.state.state_ops[si];
                self.state.state_ops[si] = op.with_save();
            }
            _ if !has_ops && children.is_empty() => return Ok(None),
            _ => {}
        }

        self.state.nodes.push(ParsedElement {
            state_index,
            prop_ops,
            child_ops,
            children,
        });
        Ok(Some(self.state.nodes.len() - 1))
    }

    /// Removes trailing state ops that neither save a node nor lead to one.
    fn trim_state_ops(&mut self, state_index: Option<usize>) {
        let lower = state_index.map_or(0, |si| si + 1);
        let ops = &mut self.state.state_ops;
        while ops.len() > lower {
            let last = ops.len() - 1;
            let op = ops[last];
            if op.assigns_slot() {
                // `Remove` has to stay, any other trailing slot is a bare save.
                if op.moves() {
                    ops[last] = StateOp::Save;
                }
                break;
            }
            ops.pop();
        }
    }

    /// `:name`, `:name='value'` or `:name=${expr}`
    fn attribute(&mut self, prop_ops: &mut Vec<PropOp>, key: &str) -> Result<(), CompilerError> {
        if !self.scanner.eq() {
            self.state.has_statics = true;
            self.state.template.text(" ");
            self.state.template.text(key);
            return Ok(());
        }

        let value = self.scanner.string(true)?;
        if !value.is_empty() {
            self.state.has_statics = true;
            self.state.template.text(&format!(" {}=\"{}\"", key, value));
            return Ok(());
        }

        let expr = self
            .scanner
            .take_expr()
            .ok_or_else(|| self.error(ERR_EXPECTED_EXPR, "expected a string or an expression"))?;
        if self.oracle.is_invariant(expr) {
            self.state.has_statics = true;
            self.state.template.text(&format!(" {}=\"", key));
            self.state.template.expr(expr);
            self.state.template.text("\"");
        } else {
            let input = self.state.dynamic_expr(expr);
            let data = self.state.data(key);
            prop_ops.push(PropOp::Attribute { input, data });
        }
        Ok(())
    }

    /// `=${expr}` part of a property, style or event binding. Returns the
    /// `(input, data)` indices.
    fn dynamic_prop(&mut self, key: &str) -> Result<(u32, u32), CompilerError> {
        if !self.scanner.eq() {
            return Err(self.error(ERR_EXPECTED_EQ, "expected a '=' character"));
        }
        let expr = self
            .scanner
            .take_expr()
            .ok_or_else(|| self.error(ERR_EXPECTED_EXPR, "expected an expression"))?;
        let input = self.state.dynamic_expr(expr);
        let data = self.state.data(key);
        Ok((input, data))
    }
}
