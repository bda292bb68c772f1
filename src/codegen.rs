//! Codegen module
//!
//! Renders a compiled artifact into the JavaScript that a build plugin hoists
//! next to the template call site: a pure `_T(...)` descriptor declaration and
//! the `_t(...)` instantiation expression that replaces the tagged template.

#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};

use crate::compile::TemplateCompilationArtifact;
use crate::format::{Skeleton, SkeletonPart};

// ═══════════════════════════════════════════════════════════════════════════════
// INPUT/OUTPUT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptorInput {
    /// Identifier of the hoisted descriptor constant.
    pub id: String,
    /// Source text of every template expression, by expression index.
    pub exprs: Vec<String>,
    /// Module the runtime helpers are imported from.
    #[serde(default = "default_runtime_module")]
    pub runtime_module: String,
}

fn default_runtime_module() -> String {
    "ivi".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct TemplateDescriptor {
    /// Hoisted `const` declaration.
    pub declaration: String,
    /// Expression that instantiates the template.
    pub instantiation: String,
    /// Runtime helpers referenced by the generated code.
    pub imports: Vec<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// RENDERING
// ═══════════════════════════════════════════════════════════════════════════════

fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// Name of the element factory helper for a skeleton.
fn factory_name(artifact: &TemplateCompilationArtifact) -> &'static str {
    let svg = artifact.flags.svg;
    let clone = !artifact.disable_cloning;
    match (&artifact.template, svg, clone) {
        (Skeleton::Tag(_), false, _) => "_hE",
        (Skeleton::Tag(_), true, _) => "_sE",
        (Skeleton::Parts(_), false, true) => "_h",
        (Skeleton::Parts(_), false, false) => "_hN",
        (Skeleton::Parts(_), true, true) => "_s",
        (Skeleton::Parts(_), true, false) => "_sN",
    }
}

/// Joins skeleton parts into a string concatenation expression, hoisted
/// expressions wrapped in parentheses.
fn skeleton_expr(parts: &[SkeletonPart], exprs: &[String]) -> String {
    if parts.is_empty() {
        return "\"\"".to_string();
    }
    let mut out: Vec<String> = Vec::with_capacity(parts.len() + 1);
    if let Some(SkeletonPart::Expr(_)) = parts.first() {
        out.push("\"\"".to_string());
    }
    for part in parts {
        match part {
            SkeletonPart::Text(s) => out.push(js_string(s)),
            SkeletonPart::Expr(i) => out.push(format!(
                "({})",
                exprs.get(*i).map(|s| s.as_str()).unwrap_or("undefined")
            )),
        }
    }
    out.join(" + ")
}

fn number_array<T, F: Fn(&T) -> u32>(items: &[T], encode: F) -> String {
    let items: Vec<String> = items.iter().map(|i| encode(i).to_string()).collect();
    format!("[{}]", items.join(", "))
}

/// Renders the descriptor declaration and instantiation for an artifact.
pub fn render_descriptor(
    artifact: &TemplateCompilationArtifact,
    input: &DescriptorInput,
) -> TemplateDescriptor {
    let factory = factory_name(artifact);
    let factory_arg = match &artifact.template {
        Skeleton::Tag(tag) => js_string(tag),
        Skeleton::Parts(parts) => skeleton_expr(parts, &input.exprs),
    };
    let data: Vec<String> = artifact.data.iter().map(|s| js_string(s)).collect();

    let declaration = format!(
        "const {} = /*@__PURE__ @__IVI_TPL__*/ _T({}({}), {}, {}, {}, {}, [{}]);",
        input.id,
        factory,
        factory_arg,
        artifact.flags.encode(),
        number_array(&artifact.prop_op_codes, |op| op.encode()),
        number_array(&artifact.child_op_codes, |op| op.encode()),
        number_array(&artifact.state_op_codes, |op| op.encode()),
        data.join(", ")
    );

    let instantiation = if artifact.dynamic_exprs.is_empty() {
        format!("_t({})", input.id)
    } else {
        let exprs: Vec<&str> = artifact
            .dynamic_exprs
            .iter()
            .map(|&i| input.exprs.get(i).map(|s| s.as_str()).unwrap_or("undefined"))
            .collect();
        format!("_t({}, [{}])", input.id, exprs.join(", "))
    };

    TemplateDescriptor {
        declaration,
        instantiation,
        imports: vec!["_T".to_string(), factory.to_string(), "_t".to_string()],
    }
}

/// Renders the import statement for the helpers of a set of descriptors.
pub fn render_imports(descriptors: &[TemplateDescriptor], runtime_module: &str) -> String {
    let mut names: Vec<&str> = descriptors
        .iter()
        .flat_map(|d| d.imports.iter().map(|s| s.as_str()))
        .collect();
    names.sort_unstable();
    names.dedup();
    if names.is_empty() {
        return String::new();
    }
    format!("import {{ {} }} from {};", names.join(", "), js_string(runtime_module))
}
