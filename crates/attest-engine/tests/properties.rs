//! Universal invariants, exercised over generated formulas.

use attest_engine::fields::{extract_fields, referenced_columns};
use attest_engine::{parse_formula, Ast, BinaryOp, Evaluator, Expr, UnaryOp};
use attest_model::{Column, Dataset, Value};
use proptest::prelude::*;

const COLUMN_NAMES: &[&str] = &["Alpha", "Beta Gamma", "delta_1"];

fn test_dataset(rows: usize) -> Dataset {
    let mut alpha = Vec::with_capacity(rows);
    let mut beta = Vec::with_capacity(rows);
    let mut delta = Vec::with_capacity(rows);
    for i in 0..rows {
        alpha.push(match i % 3 {
            0 => Value::Number(i as f64),
            1 => Value::Blank,
            _ => Value::from("text"),
        });
        beta.push(match i % 2 {
            0 => Value::from("2024-01-01"),
            _ => Value::Bool(i % 4 == 1),
        });
        delta.push(Value::Number((i * 7 % 13) as f64));
    }
    Dataset::new(vec![
        Column::new("Alpha", alpha),
        Column::new("Beta Gamma", beta),
        Column::new("delta_1", delta),
    ])
    .unwrap()
}

fn arb_leaf() -> impl Strategy<Value = Expr> {
    prop_oneof![
        (0u32..1000).prop_map(|n| Expr::Number(f64::from(n))),
        (0u32..100, 1u32..100).prop_map(|(i, f)| Expr::Number(f64::from(i) + f64::from(f) / 128.0)),
        "[a-z ]{0,6}".prop_map(Expr::Text),
        Just(Expr::Text("say \"hi\"".to_string())),
        any::<bool>().prop_map(Expr::Bool),
        proptest::sample::select(COLUMN_NAMES).prop_map(|name| Expr::ColumnRef(name.to_string())),
    ]
}

fn arb_expr() -> impl Strategy<Value = Expr> {
    arb_leaf().prop_recursive(6, 48, 4, |inner| {
        let unary_op = prop_oneof![Just(UnaryOp::Minus), Just(UnaryOp::Not)];
        let binary_op = prop_oneof![
            Just(BinaryOp::Or),
            Just(BinaryOp::And),
            Just(BinaryOp::Eq),
            Just(BinaryOp::Ne),
            Just(BinaryOp::Lt),
            Just(BinaryOp::Le),
            Just(BinaryOp::Gt),
            Just(BinaryOp::Ge),
            Just(BinaryOp::Concat),
            Just(BinaryOp::Add),
            Just(BinaryOp::Sub),
            Just(BinaryOp::Mul),
            Just(BinaryOp::Div),
        ];
        let unary = (unary_op, inner.clone()).prop_map(|(op, expr)| Expr::Unary {
            op,
            expr: Box::new(expr),
        });
        let binary = (binary_op, inner.clone(), inner.clone()).prop_map(|(op, left, right)| {
            Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            }
        });
        let conditional =
            (inner.clone(), inner.clone(), inner.clone()).prop_map(|(cond, then, otherwise)| {
                Expr::If {
                    cond: Box::new(cond),
                    then: Box::new(then),
                    otherwise: Box::new(otherwise),
                }
            });
        let membership = (inner.clone(), proptest::collection::vec(inner.clone(), 1..4))
            .prop_map(|(value, list)| Expr::In {
                value: Box::new(value),
                list,
            });
        let call = (
            proptest::sample::select(&["ISBLANK", "ISNUMBER", "ISERROR", "LEN", "UPPER", "TRIM"][..]),
            inner,
        )
            .prop_map(|(name, arg)| Expr::FunctionCall {
                name: name.to_string(),
                args: vec![arg],
            });
        prop_oneof![unary, binary, conditional, membership, call]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(192))]

    /// Printer → parser round-trip is structurally identity.
    #[test]
    fn printed_formulas_reparse_to_the_same_tree(expr in arb_expr()) {
        let printed = Ast::new(expr.clone()).to_string();
        let reparsed = parse_formula(&printed)
            .unwrap_or_else(|e| panic!("reparse failed for {printed:?}: {e}"));
        prop_assert_eq!(reparsed.expr, expr, "round-trip mismatch for {}", printed);
    }

    /// The AST walk and the pre-parse text extractor agree on every
    /// parseable formula.
    #[test]
    fn field_extractors_agree(expr in arb_expr()) {
        let printed = Ast::new(expr).to_string();
        let ast = parse_formula(&printed).unwrap();
        prop_assert_eq!(
            referenced_columns(&ast),
            extract_fields(&printed),
            "extractor mismatch for {}",
            printed
        );
    }

    /// Output column length always equals the dataset row count.
    #[test]
    fn output_length_matches_dataset(expr in arb_expr(), rows in 0usize..24) {
        let ds = test_dataset(rows);
        let ast = Ast::new(expr);
        let out = Evaluator::new(&ds).evaluate(&ast).unwrap();
        prop_assert_eq!(out.values.len(), rows);
    }

    /// Double negation is identity except at missing positions, where both
    /// sides are missing.
    #[test]
    fn double_negation_is_identity_on_truth(expr in arb_expr(), rows in 0usize..16) {
        let ds = test_dataset(rows);
        let plain = Ast::new(expr.clone());
        let doubled = Ast::new(Expr::Unary {
            op: UnaryOp::Not,
            expr: Box::new(Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(expr),
            }),
        });
        let plain_truth = Evaluator::new(&ds).evaluate_predicate(&plain).unwrap().truth;
        let doubled_truth = Evaluator::new(&ds).evaluate_predicate(&doubled).unwrap().truth;
        prop_assert_eq!(plain_truth, doubled_truth);
    }
}
