//! Batch compilation of many templates in parallel.
//!
//! Every rayon worker gets its own [`TemplateCompiler`], so no working state
//! is shared between threads.

use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cache::IncrementalCache;
use crate::compile::{StaticOracle, TemplateCompilationArtifact, TemplateCompiler};
use crate::error::CompilerError;

/// One template occurrence, with precomputed oracle answers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInput {
    pub statics: Vec<String>,
    #[serde(default)]
    pub svg: bool,
    /// `invariant_exprs[i]` is true when expression `i` can be hoisted.
    #[serde(default)]
    pub invariant_exprs: Vec<bool>,
}

impl TemplateInput {
    pub fn compile_with(
        &self,
        compiler: &mut TemplateCompiler,
    ) -> Result<TemplateCompilationArtifact, CompilerError> {
        let mut oracle = StaticOracle(self.invariant_exprs.clone());
        compiler.compile(&self.statics, self.svg, &mut oracle)
    }
}

/// Compiles all inputs in parallel. Results keep the input order.
pub fn compile_batch(
    inputs: &[TemplateInput],
) -> Vec<Result<TemplateCompilationArtifact, CompilerError>> {
    inputs
        .par_iter()
        .map_init(TemplateCompiler::new, |compiler, input| input.compile_with(compiler))
        .collect()
}

/// Same as [`compile_batch`], reading and filling an artifact cache.
pub fn compile_batch_cached(
    inputs: &[TemplateInput],
    cache: &IncrementalCache,
) -> Vec<Result<TemplateCompilationArtifact, CompilerError>> {
    let results: Vec<(bool, Result<TemplateCompilationArtifact, CompilerError>)> = inputs
        .par_iter()
        .map_init(TemplateCompiler::new, |compiler, input| {
            if let Some(artifact) = cache.get(input) {
                return (true, Ok(artifact));
            }
            let result = input.compile_with(compiler);
            if let Ok(artifact) = &result {
                cache.set(input, artifact);
            }
            (false, result)
        })
        .collect();

    let hits = results.iter().filter(|(hit, _)| *hit).count();
    debug!("compiled {} templates ({} cache hits)", results.len(), hits);
    results.into_iter().map(|(_, r)| r).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(statics: &[&str], invariant: &[bool]) -> TemplateInput {
        TemplateInput {
            statics: statics.iter().map(|s| s.to_string()).collect(),
            svg: false,
            invariant_exprs: invariant.to_vec(),
        }
    }

    #[test]
    fn test_batch_matches_sequential() {
        let inputs: Vec<TemplateInput> = (0..32)
            .map(|i| {
                if i % 3 == 0 {
                    input(&["div.a :id=", " ", ""], &[i % 2 == 0])
                } else if i % 3 == 1 {
                    input(&["ul\n  li 'x'\n  li @click=", ""], &[])
                } else {
                    input(&["div :a='broken"], &[])
                }
            })
            .collect();

        let parallel = compile_batch(&inputs);
        let mut compiler = TemplateCompiler::new();
        let sequential: Vec<_> = inputs.iter().map(|i| i.compile_with(&mut compiler)).collect();
        assert_eq!(parallel, sequential);
        assert!(parallel[2].is_err());
    }

    #[test]
    fn test_input_deserializes_camel_case() {
        let input: TemplateInput = serde_json::from_value(serde_json::json!({
            "statics": ["div :id=", ""],
            "invariantExprs": [true]
        }))
        .unwrap();
        assert!(!input.svg);
        assert_eq!(input.invariant_exprs, vec![true]);
    }
}
