//! # Template Compiler (native)
//!
//! Compiles indentation-based markup templates, given as the static fragments
//! of a tagged template call, into a static skeleton plus three opcode streams
//! for the runtime:
//!
//! 1. **Prop opCodes**: dynamic attributes, properties, styles, events and
//!    directives, grouped by `SetNode` markers.
//! 2. **Child opCodes**: dynamic child positions, grouped by `SetParent`.
//! 3. **State opCodes**: tree traversal that saves node references into slots.
//!    Slot 0 is always the root node.
//!
//! ## Template syntax
//!
//! ```text
//! div.card :id='main' @click=${onClick}
//!   h1 'Title'
//!   ${content}
//!   img :src=${src}
//! ```
//!
//! Nesting is driven by indentation. Content on the same line as a tag is
//! nested inside it. The `-c` prefix disables template cloning.
//!
//! ## Invariant expressions
//!
//! Expressions the caller reports as invariant (see [`InvariantOracle`]) are
//! folded into the skeleton instead of producing dynamic opCodes.

#[cfg(feature = "napi")]
use napi_derive::napi;

mod batch;
mod cache;
mod codegen;
mod compile;
mod emit;
mod error;
mod format;
mod parse;
mod scanner;

#[cfg(test)]
mod compile_tests;

pub use batch::{compile_batch, compile_batch_cached, TemplateInput};
pub use cache::IncrementalCache;
pub use codegen::{render_descriptor, render_imports, DescriptorInput, TemplateDescriptor};
pub use compile::{
    compile_template, CompileOptions, InvariantOracle, StaticOracle, TemplateCompilationArtifact,
    TemplateCompiler,
};
pub use error::*;
pub use format::{ChildOp, CommonProp, PropOp, Skeleton, SkeletonPart, StateOp, TemplateFlags};

// ═══════════════════════════════════════════════════════════════════════════════
// NAPI EXPORTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "napi")]
fn to_napi_error(e: CompilerError) -> napi::Error {
    let json = serde_json::to_string(&e).unwrap_or_else(|_| e.message.clone());
    napi::Error::from_reason(json)
}

/// Compiles one template. `invariant_exprs[i]` tells whether expression `i`
/// can be hoisted into the static skeleton.
#[cfg(feature = "napi")]
#[napi]
pub fn compile_template_native(
    statics: Vec<String>,
    svg: bool,
    invariant_exprs: Vec<bool>,
) -> napi::Result<serde_json::Value> {
    let mut oracle = StaticOracle(invariant_exprs);
    let artifact = compile_template(&statics, svg, &mut oracle).map_err(to_napi_error)?;
    serde_json::to_value(artifact).map_err(|e| napi::Error::from_reason(e.to_string()))
}

/// Compiles a list of `TemplateInput` objects in parallel. Each entry of the
/// result is either `{ artifact }` or `{ error }`.
#[cfg(feature = "napi")]
#[napi]
pub fn compile_templates_native(
    inputs: serde_json::Value,
    options: Option<serde_json::Value>,
) -> napi::Result<serde_json::Value> {
    let inputs: Vec<TemplateInput> = serde_json::from_value(inputs)
        .map_err(|e| napi::Error::from_reason(format!("Invalid template inputs: {}", e)))?;
    let options: CompileOptions = match options {
        Some(v) => serde_json::from_value(v)
            .map_err(|e| napi::Error::from_reason(format!("Invalid options: {}", e)))?,
        None => CompileOptions::default(),
    };
    let inputs: Vec<TemplateInput> = inputs
        .into_iter()
        .map(|mut i| {
            i.svg |= options.svg;
            i
        })
        .collect();

    let results = match &options.cache_dir {
        Some(dir) => compile_batch_cached(&inputs, &IncrementalCache::new(dir)),
        None => compile_batch(&inputs),
    };
    let results: Vec<serde_json::Value> = results
        .into_iter()
        .map(|r| match r {
            Ok(artifact) => serde_json::json!({ "artifact": artifact }),
            Err(error) => serde_json::json!({ "error": error }),
        })
        .collect();
    Ok(serde_json::Value::Array(results))
}

/// Renders the runtime descriptor for a compiled artifact.
#[cfg(feature = "napi")]
#[napi]
pub fn render_template_descriptor_native(
    artifact: serde_json::Value,
    input: serde_json::Value,
) -> napi::Result<TemplateDescriptor> {
    let artifact: TemplateCompilationArtifact = serde_json::from_value(artifact)
        .map_err(|e| napi::Error::from_reason(format!("Invalid artifact: {}", e)))?;
    let input: DescriptorInput = serde_json::from_value(input)
        .map_err(|e| napi::Error::from_reason(format!("Invalid descriptor input: {}", e)))?;
    Ok(render_descriptor(&artifact, &input))
}

/// Formats a compiler error as a message with a caret under the position.
#[cfg(feature = "napi")]
#[napi]
pub fn format_compiler_error_native(error: CompilerError, statics: Vec<String>) -> String {
    error.code_frame(&statics)
}
