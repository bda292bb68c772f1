#[cfg(test)]
mod tests {
    use crate::compile::{compile_template, StaticOracle, TemplateCompiler};
    use crate::error::*;
    use crate::format::{ChildOp, PropOp, Skeleton, StateOp};

    fn compile_err(statics: &[&str]) -> CompilerError {
        compile_template(statics, false, &mut |_: usize| false).unwrap_err()
    }

    fn assert_error(statics: &[&str], code: &str, message: &str, fragment: u32, offset: u32) {
        let err = compile_err(statics);
        assert_eq!(err.code, code, "{:?}", statics);
        assert_eq!(err.message, message, "{:?}", statics);
        assert_eq!(err.statics_offset, fragment, "{:?}", statics);
        assert_eq!(err.text_offset, offset, "{:?}", statics);
    }

    #[test]
    fn test_single_element() {
        let a = compile_template(&["div"], false, &mut |_: usize| false).unwrap();
        assert_eq!(a.template, Skeleton::Tag("div".to_string()));
        assert_eq!(a.flags.state_slots, 1);
        assert_eq!(a.flags.dynamic_children, 0);
        assert!(!a.flags.svg);
        assert!(a.prop_op_codes.is_empty());
        assert!(a.child_op_codes.is_empty());
        assert!(a.state_op_codes.is_empty());
        assert!(a.data.is_empty());
        assert!(a.dynamic_exprs.is_empty());
    }

    #[test]
    fn test_invariant_attribute_is_folded() {
        let dynamic = compile_template(&["div :title=", ""], false, &mut |_: usize| false).unwrap();
        assert_eq!(dynamic.template, Skeleton::Tag("div".to_string()));
        assert_eq!(dynamic.prop_op_codes, vec![PropOp::Attribute { input: 0, data: 0 }]);
        assert_eq!(dynamic.data, vec!["title"]);
        assert_eq!(dynamic.dynamic_exprs, vec![0]);

        let folded = compile_template(&["div :title=", ""], false, &mut |_: usize| true).unwrap();
        assert!(matches!(folded.template, Skeleton::Parts(_)));
        assert!(folded.prop_op_codes.is_empty());
        assert!(folded.data.is_empty());
        assert!(folded.dynamic_exprs.is_empty());
    }

    #[test]
    fn test_list_slots_and_indices() {
        let a = compile_template(
            &["ul\n  li @click=", "\n  li @click=", "\n  li ", ""],
            false,
            &mut |_: usize| false,
        )
        .unwrap();
        assert_eq!(
            a.template,
            Skeleton::Parts(vec![crate::format::SkeletonPart::Text(
                "<ul><li></li><li></li><li></li></ul>".to_string()
            )])
        );
        assert_eq!(
            a.state_op_codes,
            vec![
                StateOp::Next { save: true },
                StateOp::Next { save: true },
                StateOp::Save
            ]
        );
        assert_eq!(
            a.prop_op_codes,
            vec![
                PropOp::SetNode { slot: 1 },
                PropOp::Event { input: 0, data: 0 },
                PropOp::SetNode { slot: 2 },
                PropOp::Event { input: 1, data: 1 },
            ]
        );
        assert_eq!(
            a.child_op_codes,
            vec![ChildOp::SetParent { slot: 3 }, ChildOp::Child { input: 2 }]
        );
        assert_eq!(a.flags.state_slots, 4);
        assert_eq!(a.flags.dynamic_children, 1);
        assert_eq!(a.data, vec!["click", "click"]);
        assert_eq!(a.dynamic_exprs, vec![0, 1, 2]);

        // Every referenced index resolves into its table.
        for op in &a.prop_op_codes {
            if let Some(d) = op.data_index() {
                assert!((d as usize) < a.data.len());
            }
            if let Some(i) = op.input_index() {
                assert!((i as usize) < a.dynamic_exprs.len());
            }
        }
        let encoded: Vec<u32> = a.state_op_codes.iter().map(|op| op.encode()).collect();
        assert_eq!(encoded, vec![5, 5, 1]);
    }

    #[test]
    fn test_svg_flag() {
        let a = compile_template(&["circle"], true, &mut |_: usize| false).unwrap();
        assert!(a.flags.svg);
        assert_eq!(a.flags.encode(), 1 | 1 << 20);
    }

    #[test]
    fn test_artifact_json_shape() {
        let a = compile_template(&["div 'a' ", " 'b'"], false, &mut |_: usize| false).unwrap();
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "disableCloning": false,
                "flags": 1026,
                "template": ["<div>a<!>b</div>"],
                "propOpCodes": [],
                "childOpCodes": [5, 0],
                "stateOpCodes": [4, 2],
                "data": [],
                "dynamicExprs": [0]
            })
        );
    }

    #[test]
    fn test_oracle_is_queried_once_per_expression() {
        let mut calls: Vec<usize> = Vec::new();
        let mut oracle = |expr: usize| {
            calls.push(expr);
            expr % 2 == 0
        };
        compile_template(&["div", " :a=", " :b=", " @c=", "\n  ", ""], false, &mut oracle)
            .unwrap();
        assert_eq!(calls, vec![0, 1, 2]);
    }

    #[test]
    fn test_static_oracle_missing_entries_are_dynamic() {
        let mut oracle = StaticOracle(vec![true]);
        let a = compile_template(&["div :a=", " :b=", ""], false, &mut oracle).unwrap();
        assert_eq!(a.prop_op_codes, vec![PropOp::Attribute { input: 0, data: 0 }]);
        assert_eq!(a.dynamic_exprs, vec![1]);
        assert_eq!(a.data, vec!["b"]);
    }

    #[test]
    fn test_empty_template() {
        let statics: [&str; 0] = [];
        let err = compile_template(&statics, false, &mut |_: usize| false).unwrap_err();
        assert_eq!(err.code, ERR_EMPTY_TEMPLATE);
    }

    #[test]
    fn test_error_positions() {
        assert_error(&["1div"], ERR_TAG_NAME, "expected a valid tag name", 0, 0);
        assert_error(&["div."], ERR_CLASS_NAME, "expected a valid class name", 0, 4);
        assert_error(&["div :"], ERR_BINDING_NAME, "expected a valid attribute name", 0, 5);
        assert_error(
            &["div :a='abc"],
            ERR_EXPECTED_EXPR,
            "expected a string or an expression",
            0,
            7,
        );
        assert_error(&["div :a=##'abc'"], ERR_INVALID_STRING, "invalid string", 0, 7);
        assert_error(&["div @click"], ERR_EXPECTED_EQ, "expected a '=' character", 0, 10);
        assert_error(&["div @click=x"], ERR_EXPECTED_EXPR, "expected an expression", 0, 11);
        assert_error(
            &["div $"],
            ERR_EXPECTED_EXPR,
            "expected an attribute directive expression",
            0,
            5,
        );
        assert_error(&["-x div"], ERR_OPTION_FLAG, "expected an option flag", 0, 0);
        assert_error(&["-cdiv"], ERR_OPTION_FLAG, "expected a whitespace", 0, 2);
        assert_error(&["div :id=", " @click"], ERR_EXPECTED_EQ, "expected a '=' character", 1, 7);
        assert_error(&["div ."], ERR_BINDING_NAME, "expected a valid property name", 0, 5);
        assert_error(&["div *"], ERR_BINDING_NAME, "expected a valid property name", 0, 5);
        assert_error(&["div ~"], ERR_BINDING_NAME, "expected a valid property name", 0, 5);
        assert_error(&["div @"], ERR_BINDING_NAME, "expected a valid event name", 0, 5);
    }

    #[test]
    fn test_error_offsets_count_utf16_units() {
        assert_error(&["p 'é' 1x"], ERR_TAG_NAME, "expected a valid tag name", 0, 6);
        assert_error(
            &["div :title='😀' :"],
            ERR_BINDING_NAME,
            "expected a valid attribute name",
            0,
            17,
        );
    }

    #[test]
    fn test_short_hash_run_is_literal_content() {
        let a = compile_template(&["p #'a'b'#"], false, &mut |_: usize| false).unwrap();
        assert_eq!(
            a.template,
            Skeleton::Parts(vec![crate::format::SkeletonPart::Text("<p>a'b</p>".to_string())])
        );
    }

    #[test]
    fn test_size_error_reports_parse_end() {
        let mut statics = vec!["div "];
        statics.extend(std::iter::repeat("").take(1024));
        let err = compile_err(&statics);
        assert_eq!(err.code, ERR_TEMPLATE_SIZE);
        assert_eq!((err.statics_offset, err.text_offset), (1024, 0));

        statics.pop();
        let a = compile_template(&statics[..], false, &mut |_: usize| false).unwrap();
        assert_eq!(a.flags.dynamic_children, 1023);
    }

    #[test]
    fn test_compiler_is_reusable_after_error() {
        let statics = ["div\n  span :id=", "\n  ", ""];
        let fresh = compile_template(&statics, false, &mut |_: usize| false).unwrap();

        let mut compiler = TemplateCompiler::new();
        assert!(compiler
            .compile(&["div :a='abc"], false, &mut |_: usize| false)
            .is_err());
        let reused = compiler.compile(&statics, false, &mut |_: usize| false).unwrap();
        assert_eq!(fresh, reused);

        let again = compiler.compile(&statics, false, &mut |_: usize| false).unwrap();
        assert_eq!(reused, again);
    }

    #[test]
    fn test_code_frame_points_at_error() {
        let statics = ["div\n  span @click"];
        let err = compile_err(&statics);
        let loc = err.location(&statics);
        assert_eq!((loc.line, loc.column), (2, 14));
        assert!(err.code_frame(&statics).starts_with("expected a '=' character"));
    }
}
