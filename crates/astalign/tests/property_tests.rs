use astalign::category::OPTIONAL_CHAIN_TYPES;
use astalign::prelude::*;
use astalign::{DifferenceKind, classify, compare, normalize, render};
use minijs::Shape;
use proptest::prelude::*;

fn arb_node() -> impl Strategy<Value = SyntaxNode> {
    let leaf = ("[A-C][a-z]{0,3}", "[a-c]{1,2}", any::<bool>()).prop_map(|(node_type, name, flag)| {
        SyntaxNode::new(node_type)
            .with_field("name", name.as_str())
            .with_field("flag", flag)
    });
    leaf.prop_recursive(4, 32, 3, |inner| {
        ("[A-C][a-z]{0,3}", prop::collection::vec(inner.clone(), 0..3), inner).prop_map(
            |(node_type, children, child)| {
                SyntaxNode::new(node_type)
                    .with_field("children", children)
                    .with_field("child", child)
            },
        )
    })
}

/// Member/call chains like `root?.a[0]()` with random optional links.
fn arb_chain() -> impl Strategy<Value = String> {
    prop::collection::vec((any::<bool>(), 0usize..3, any::<bool>()), 1..6).prop_map(|links| {
        let mut source = String::from("root");
        for (optional, form, parenthesize) in links {
            let link = match (optional, form) {
                (true, 0) => "?.a",
                (true, 1) => "?.[0]",
                (true, _) => "?.()",
                (false, 0) => ".a",
                (false, 1) => "[0]",
                (false, _) => "()",
            };
            source.push_str(link);
            if parenthesize {
                source = format!("({source})");
            }
        }
        source.push(';');
        source
    })
}

fn normalized(source: &str, shape: Shape, dialect: &Dialect) -> SyntaxNode {
    let raw = minijs::parse_to_json(source, shape).unwrap();
    normalize(&raw, dialect).unwrap()
}

fn is_strict_prefix(prefix: &astalign::NodePath, path: &astalign::NodePath) -> bool {
    let (p, q) = (prefix.segments(), path.segments());
    p.len() < q.len() && q.starts_with(p)
}

proptest! {
    #[test]
    fn comparison_is_reflexive(tree in arb_node()) {
        let registry = CategoryRegistry::builtin();
        let diffs = compare(&tree, &tree.clone());
        prop_assert!(diffs.is_empty());
        prop_assert_eq!(classify(&diffs, &ToleranceSpec::Exact, &registry), Ok(AlignmentVerdict::Pass));
    }

    #[test]
    fn type_mismatch_short_circuits(a in arb_node(), b in arb_node()) {
        let diffs = compare(&a, &b);
        for mismatch in diffs.iter().filter(|d| d.kind == DifferenceKind::TypeMismatch) {
            for other in &diffs {
                prop_assert!(
                    !is_strict_prefix(&mismatch.path, &other.path),
                    "{} recorded beneath type mismatch at {}", other, mismatch.path
                );
            }
            let at_same_path = diffs.iter().filter(|d| d.path == mismatch.path).count();
            prop_assert_eq!(at_same_path, 1);
        }
    }

    #[test]
    fn comparison_and_rendering_are_deterministic(source in arb_chain()) {
        let dialect = Dialect::espree();
        let first = compare(
            &normalized(&source, Shape::Hermes, &dialect),
            &normalized(&source, Shape::Estree, &dialect),
        );
        let second = compare(
            &normalized(&source, Shape::Hermes, &dialect),
            &normalized(&source, Shape::Estree, &dialect),
        );
        prop_assert_eq!(first, second);

        let snapshot = Dialect::hermes_snapshot();
        prop_assert_eq!(
            render(&normalized(&source, Shape::Hermes, &snapshot)),
            render(&normalized(&source, Shape::Hermes, &snapshot))
        );
    }

    #[test]
    fn hermes_and_babel_agree_after_normalization(source in arb_chain()) {
        let dialect = Dialect::babel();
        let hermes = normalized(&source, Shape::Hermes, &dialect);
        let babel = normalized(&source, Shape::Babel, &dialect);
        prop_assert!(compare(&hermes, &hermes).is_empty());
        prop_assert!(compare(&hermes, &babel).is_empty(), "{:?}", compare(&hermes, &babel));
    }

    #[test]
    fn tolerance_is_monotonic(a in arb_node(), b in arb_node()) {
        let registry = CategoryRegistry::builtin();
        let diffs = compare(&a, &b);
        if classify(&diffs, &ToleranceSpec::Exact, &registry) == Ok(AlignmentVerdict::Pass) {
            for tolerance in [
                ToleranceSpec::AnyMismatch,
                ToleranceSpec::category("ast-diff"),
                ToleranceSpec::category("chain-wrapper"),
            ] {
                prop_assert_eq!(classify(&diffs, &tolerance, &registry), Ok(AlignmentVerdict::Pass));
            }
        }
    }

    #[test]
    fn ast_diff_covers_chain_wrappers(source in arb_chain()) {
        let dialect = Dialect::espree();
        let registry = CategoryRegistry::builtin();
        let diffs = compare(
            &normalized(&source, Shape::Hermes, &dialect),
            &normalized(&source, Shape::Estree, &dialect),
        );
        for diff in &diffs {
            prop_assert_eq!(diff.kind, DifferenceKind::TypeMismatch);
            let primary = diff.primary.as_ref().and_then(astalign::Observed::node_type).unwrap_or_default();
            prop_assert!(OPTIONAL_CHAIN_TYPES.contains(&primary), "{}", diff);
        }
        let expected = if diffs.is_empty() { AlignmentVerdict::Pass } else { AlignmentVerdict::ExpectedFail };
        prop_assert_eq!(classify(&diffs, &ToleranceSpec::category("ast-diff"), &registry), Ok(expected));
        prop_assert_eq!(diffs.is_empty(), !source.contains("?."));
    }
}
