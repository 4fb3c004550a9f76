#![allow(missing_docs)]

use std::collections::BTreeSet;

use penumbra::query::model::{
    AllNodes, Between, ChildNode, ChildNodeJoinCondition, Column, Constraint, DescendantNode,
    DescendantNodeJoinCondition, DynamicOperand, EquiJoinCondition, FullTextSearch, Join,
    JoinType, Length, Limit, LowerCase, ModelError, NodeDepth, NodeLocalName, NodeName, NodePath,
    Operator, Order, Ordering, PropertyExistence, PropertyValue, Query, QueryCommand,
    ReferenceValue, Relike, SameNode, SameNodeJoinCondition, Selector, SelectorName,
    SetCriteria, SetOperation, SetQuery, StaticOperand, Subquery, UpperCase,
};
use penumbra::query::visit::{
    readable, selector_aliases_by_name, selector_names_by_alias, selectors_referenced_by,
    subqueries, visit_all, AstNode, NavigationVisitor,
};
use penumbra::query::Visitable;
use penumbra::value::{Path, Value};

fn sel(name: &str) -> SelectorName {
    SelectorName::new(name).unwrap()
}

fn pv(selector: &str, property: &str) -> PropertyValue {
    PropertyValue::new(sel(selector), property).unwrap()
}

fn names(items: &[&str]) -> BTreeSet<SelectorName> {
    items.iter().map(|name| sel(name)).collect()
}

fn file_query() -> Query {
    Query::new(Selector::aliased(sel("nt:file"), sel("f")))
        .with_columns(vec![
            Column::property(sel("f"), "jcr:title").unwrap(),
            Column::aliased(sel("f"), "size", "bytes").unwrap(),
        ])
        .with_constraint(Constraint::and(
            Constraint::comparison(
                pv("f", "size"),
                Operator::GreaterThan,
                StaticOperand::literal(100i64),
            ),
            FullTextSearch::new(sel("f"), None, "fox").unwrap(),
        ))
        .with_orderings(vec![Ordering::new(pv("f", "size"), Order::Descending)])
        .with_limit(Limit::new(10, 5))
}

#[test]
fn query_renders_canonical_text() {
    assert_eq!(
        readable(&file_query()),
        "SELECT f.jcr:title, f.size AS bytes FROM nt:file AS f \
         WHERE (f.size > CAST('100' AS LONG) AND CONTAINS(f.*,'fox')) \
         ORDER BY f.size DESC LIMIT 10 OFFSET 5"
    );
}

#[test]
fn rendering_is_deterministic_and_matches_display() {
    let query = file_query();
    assert_eq!(readable(&query), readable(&query));
    let command = QueryCommand::from(query.clone());
    assert_eq!(command.to_string(), readable(&query));
}

#[test]
fn constraint_grammar() {
    let cases: Vec<(Constraint, &str)> = vec![
        (
            ChildNode::new(sel("s"), "/a/b").unwrap().into(),
            "ISCHILDNODE(s,'/a/b')",
        ),
        (
            DescendantNode::new(sel("s"), "/a").unwrap().into(),
            "ISDESCENDANTNODE(s,'/a')",
        ),
        (SameNode::new(sel("s"), "/a").unwrap().into(), "ISSAMENODE(s,'/a')"),
        (
            FullTextSearch::new(sel("s"), Some("body".into()), "quick fox")
                .unwrap()
                .into(),
            "CONTAINS(s.body,'quick fox')",
        ),
        (
            PropertyExistence::new(sel("s"), "p").unwrap().into(),
            "s.p IS NOT NULL",
        ),
        (
            Constraint::not(Constraint::or(
                PropertyExistence::new(sel("s"), "a").unwrap(),
                PropertyExistence::new(sel("s"), "b").unwrap(),
            )),
            "NOT ((s.a IS NOT NULL OR s.b IS NOT NULL))",
        ),
        (
            Between::new(
                pv("s", "n"),
                StaticOperand::literal(1i64),
                StaticOperand::literal(5i64),
                false,
                true,
            )
            .into(),
            "s.n BETWEEN CAST('1' AS LONG) EXCLUSIVE AND CAST('5' AS LONG)",
        ),
        (
            SetCriteria::new(
                pv("s", "c"),
                [StaticOperand::literal("x"), StaticOperand::variable("y").unwrap()],
            )
            .unwrap()
            .into(),
            "s.c IN ('x',$y)",
        ),
        (
            Relike::new(StaticOperand::literal("abc"), pv("s", "pattern")).into(),
            "RELIKE('abc', s.pattern)",
        ),
        (
            Constraint::comparison(
                Length::new(pv("s", "p")),
                Operator::LessThanOrEqualTo,
                StaticOperand::literal(2i64),
            ),
            "LENGTH(s.p) <= CAST('2' AS LONG)",
        ),
        (
            Constraint::comparison(
                LowerCase::new(UpperCase::new(pv("s", "p").into()).into()),
                Operator::Like,
                StaticOperand::literal("a%"),
            ),
            "LOWER(UPPER(s.p)) LIKE 'a%'",
        ),
        (
            Constraint::comparison(
                NodeDepth::new(sel("s")),
                Operator::NotEqualTo,
                StaticOperand::literal(Path::parse("/a/b").unwrap()),
            ),
            "DEPTH(s) != CAST(/a/b AS PATH)",
        ),
    ];
    for (constraint, expected) in cases {
        assert_eq!(readable(&constraint), expected);
    }
}

#[test]
fn operand_grammar() {
    let cases: Vec<(DynamicOperand, &str)> = vec![
        (NodePath::new(sel("s")).into(), "PATH(s)"),
        (NodeName::new(sel("s")).into(), "NAME(s)"),
        (NodeLocalName::new(sel("s")).into(), "LOCALNAME(s)"),
        (ReferenceValue::any(sel("s")).into(), "s"),
        (
            ReferenceValue::property_of(sel("s"), "ref").unwrap().into(),
            "s.ref",
        ),
    ];
    for (operand, expected) in cases {
        assert_eq!(operand.to_string(), expected);
    }
    assert_eq!(
        StaticOperand::literal(Value::Boolean(false)).to_string(),
        "CAST('false' AS BOOLEAN)"
    );
}

#[test]
fn joins_and_set_queries() {
    let join = Join::new(
        Join::new(
            Selector::aliased(sel("nt:folder"), sel("p")).into(),
            JoinType::Inner,
            Selector::aliased(sel("nt:file"), sel("c")).into(),
            ChildNodeJoinCondition::new(sel("c"), sel("p")).into(),
        )
        .into(),
        JoinType::LeftOuter,
        Selector::new(sel("mix:title")).into(),
        EquiJoinCondition::new(sel("c"), "jcr:uuid", sel("mix:title"), "ref")
            .unwrap()
            .into(),
    );
    let left = Query::new(join);
    let right = Query::new(AllNodes::aliased(sel("n")))
        .with_constraint(DescendantNode::new(sel("n"), "/tmp").unwrap())
        .distinct();
    let union = SetQuery::new(left.into(), SetOperation::Union, right.into(), true);
    assert_eq!(
        readable(&union),
        "SELECT * FROM nt:folder AS p INNER JOIN nt:file AS c ON ISCHILDNODE(c,p) \
         LEFT OUTER JOIN mix:title ON c.jcr:uuid = mix:title.ref \
         UNION ALL SELECT DISTINCT * FROM __ALLNODES__ AS n WHERE ISDESCENDANTNODE(n,'/tmp')"
    );

    let same = SameNodeJoinCondition::new(sel("a"), sel("b"), Some("x/y".into())).unwrap();
    assert_eq!(readable(&same), "ISSAMENODE(a,b,'x/y')");
    let descendant = DescendantNodeJoinCondition::new(sel("d"), sel("a"));
    assert_eq!(readable(&descendant), "ISDESCENDANTNODE(d,a)");
}

#[test]
fn subquery_operands_render_in_parentheses() {
    let inner = Query::new(Selector::new(sel("t")))
        .with_columns(vec![Column::property(sel("t"), "id").unwrap()]);
    let outer = Query::new(Selector::new(sel("s"))).with_constraint(
        SetCriteria::new(
            pv("s", "ref"),
            [StaticOperand::from(Subquery::new(inner))],
        )
        .unwrap(),
    );
    assert_eq!(
        readable(&outer),
        "SELECT * FROM s WHERE s.ref IN ((SELECT t.id FROM t))"
    );
}

#[test]
fn selector_membership() {
    let query = file_query();
    assert_eq!(selectors_referenced_by(&query), names(&["f"]));

    let join = ChildNodeJoinCondition::new(sel("child"), sel("parent"));
    assert_eq!(selectors_referenced_by(&join), names(&["child", "parent"]));

    let descendant = DescendantNodeJoinCondition::new(sel("d"), sel("a"));
    assert_eq!(selectors_referenced_by(&descendant), names(&["a", "d"]));

    let equi = EquiJoinCondition::new(sel("x"), "p", sel("y"), "q").unwrap();
    assert_eq!(selectors_referenced_by(&equi), names(&["x", "y"]));

    let length: DynamicOperand = Length::new(pv("s", "p")).into();
    assert_eq!(selectors_referenced_by(&length), names(&["s"]));

    let literal = StaticOperand::literal("x");
    assert!(selectors_referenced_by(&literal).is_empty());
    assert!(selectors_referenced_by(&Limit::new(1, 0)).is_empty());

    let unaliased = Selector::new(sel("nt:base"));
    assert_eq!(selectors_referenced_by(&unaliased), names(&["nt:base"]));
}

#[test]
fn subqueries_respect_nesting_flag() {
    let innermost = Query::new(Selector::new(sel("c")));
    let middle = Query::new(Selector::new(sel("b"))).with_constraint(
        SetCriteria::new(
            pv("b", "p"),
            [StaticOperand::from(Subquery::new(innermost))],
        )
        .unwrap(),
    );
    let outer = Query::new(Selector::new(sel("a"))).with_constraint(
        SetCriteria::new(pv("a", "p"), [StaticOperand::from(Subquery::new(middle))]).unwrap(),
    );
    assert_eq!(subqueries(&outer, false).len(), 1);
    let all = subqueries(&outer, true);
    assert_eq!(all.len(), 2);
    assert_eq!(readable(all[1]), "(SELECT * FROM c)");
}

#[test]
fn alias_maps() {
    let join = Join::new(
        Selector::aliased(sel("nt:folder"), sel("p")).into(),
        JoinType::Inner,
        Selector::new(sel("nt:file")).into(),
        ChildNodeJoinCondition::new(sel("nt:file"), sel("p")).into(),
    );
    let query = Query::new(join);
    let by_alias = selector_names_by_alias(&query);
    assert_eq!(by_alias.len(), 1);
    assert_eq!(by_alias.get(&sel("p")), Some(&sel("nt:folder")));
    let by_name = selector_aliases_by_name(&query);
    assert_eq!(by_name.get(&sel("nt:folder")), Some(&sel("p")));
}

#[test]
fn navigation_is_breadth_first_with_one_call_per_node() {
    let constraint = Constraint::and(
        Constraint::not(PropertyExistence::new(sel("s"), "a").unwrap()),
        Constraint::comparison(pv("s", "b"), Operator::EqualTo, StaticOperand::literal("x")),
    );
    let mut seen = Vec::new();
    visit_all(&constraint, |node: AstNode<'_>| seen.push(node.kind()));
    assert_eq!(
        seen,
        [
            "And",
            "Not",
            "Comparison",
            "PropertyExistence",
            "PropertyValue",
            "Literal"
        ]
    );

    let mut count = 0usize;
    let mut navigation = NavigationVisitor::new(|_: AstNode<'_>| count += 1);
    navigation.walk(constraint.as_node());
    drop(navigation);
    assert_eq!(count, 6);
}

#[test]
fn blank_arguments_fail_construction() {
    assert_eq!(
        PropertyValue::new(sel("s"), "  ").unwrap_err(),
        ModelError::Blank("property name")
    );
    assert!(matches!(
        SetCriteria::new(pv("s", "p"), Vec::new()),
        Err(ModelError::Empty(_))
    ));
    assert!(StaticOperand::variable("").is_err());
}
