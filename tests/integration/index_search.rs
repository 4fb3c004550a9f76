#![allow(missing_docs)]

use penumbra::index::{drain, PATH_COLUMN, DEPTH_COLUMN};
use penumbra::query::model::{
    Between, ChildNode, Constraint, DescendantNode, FullTextSearch, FullTextSearchScore, Length,
    NodeDepth, Operator, PropertyExistence, PropertyValue, Query, ReferenceValue, Relike,
    SameNode, Selector, SelectorName, SetCriteria, StaticOperand, Subquery, UpperCase,
};
use penumbra::value::{Path, PropertyType, Reference, Value, ValueFormatError};
use penumbra::{
    Index, IndexConstraints, IndexDefinition, IndexError, NodeKey, Parameters, PropertyIndex,
    Result,
};
use proptest::prelude::*;

fn sel() -> SelectorName {
    SelectorName::new("s").unwrap()
}

fn pv(property: &str) -> PropertyValue {
    PropertyValue::new(sel(), property).unwrap()
}

fn lit(value: impl Into<Value>) -> StaticOperand {
    StaticOperand::literal(value)
}

fn cmp(property: &str, operator: Operator, value: impl Into<Value>) -> Constraint {
    Constraint::comparison(pv(property), operator, lit(value))
}

fn keys(index: &PropertyIndex, constraints: IndexConstraints) -> Result<Vec<String>> {
    Ok(index
        .filter_all(&constraints)?
        .into_iter()
        .map(|(key, _)| key.as_str().to_owned())
        .collect())
}

fn count(index: &PropertyIndex, constraint: Constraint) -> Result<usize> {
    index.estimate_cardinality(&[constraint], &Parameters::new())
}

fn catalog() -> Result<PropertyIndex> {
    let index = PropertyIndex::in_memory(IndexDefinition::multi_column(
        "catalog",
        [
            ("title", PropertyType::String),
            ("size", PropertyType::Long),
            ("flag", PropertyType::Boolean),
            ("created", PropertyType::Date),
            ("blob", PropertyType::Binary),
            ("ref", PropertyType::Reference),
            ("weak", PropertyType::WeakReference),
            ("pattern", PropertyType::String),
            (PATH_COLUMN, PropertyType::Path),
            (DEPTH_COLUMN, PropertyType::Long),
        ],
    )?);
    let rows: [(&str, &str, i64, &str, &str); 4] = [
        ("n1", "spring", 10, "/a", "2024-03-01T00:00:00Z"),
        ("n2", "summer", 25, "/a/b", "2024-06-01T00:00:00Z"),
        ("n3", "autumn", 40, "/a/b/c", "2024-09-01T00:00:00Z"),
        ("n4", "Spruce", 55, "/x", "2024-12-01T00:00:00Z"),
    ];
    for (key, title, size, path, created) in rows {
        let key = NodeKey::from(key);
        index.add(&key, "title", Value::from(title))?;
        index.add(&key, "size", Value::from(size))?;
        index.add(&key, "created", Value::from(created))?;
        index.add(&key, PATH_COLUMN, Value::from(path))?;
        let depth = Path::parse(path).map_or(0, |p| p.depth() as i64);
        index.add(&key, DEPTH_COLUMN, Value::from(depth))?;
    }
    index.add(&"n1".into(), "flag", Value::from(true))?;
    index.add(&"n2".into(), "ref", Value::from(Reference::new("target-1")))?;
    index.add(&"n3".into(), "weak", Value::from(Reference::weak("target-1")))?;
    index.add(&"n4".into(), "ref", Value::from(Reference::new("target-2")))?;
    index.add(&"n1".into(), "blob", Value::from(&b"bytes"[..]))?;
    index.add_values(
        &"n2".into(),
        "pattern",
        vec![Value::from("img_%.png"), Value::from("doc%")],
    )?;
    index.commit()?;
    Ok(index)
}

#[test]
fn multi_valued_properties_match_existentially() -> Result<()> {
    let index = PropertyIndex::in_memory(IndexDefinition::single_column(
        "tags",
        "tag",
        PropertyType::String,
    )?);
    index.add_values(
        &"n1".into(),
        "tag",
        vec![Value::from("a"), Value::from("ab"), Value::from("abc")],
    )?;
    index.commit()?;

    assert_eq!(count(&index, cmp("tag", Operator::EqualTo, "ab"))?, 1);
    assert_eq!(count(&index, cmp("tag", Operator::EqualTo, "d"))?, 0);
    let length = |n: i64| {
        Constraint::comparison(Length::new(pv("tag")), Operator::EqualTo, lit(n))
    };
    assert_eq!(count(&index, length(2))?, 1);
    assert_eq!(count(&index, length(4))?, 0);

    // some value differs
    assert_eq!(count(&index, cmp("tag", Operator::NotEqualTo, "a"))?, 1);
    // complement of the existential match
    assert_eq!(
        count(&index, Constraint::not(cmp("tag", Operator::EqualTo, "ab")))?,
        0
    );
    Ok(())
}

#[test]
fn like_matches_string_forms() -> Result<()> {
    let index = catalog()?;
    let like = |pattern: &str| cmp("title", Operator::Like, pattern);
    assert_eq!(keys(&index, IndexConstraints::new([like("s%")]))?, ["n1", "n2"]);
    assert_eq!(keys(&index, IndexConstraints::new([like("_u%")]))?, ["n2", "n3"]);
    assert_eq!(keys(&index, IndexConstraints::new([like("autumn")]))?, ["n3"]);

    let upper = Constraint::comparison(
        UpperCase::new(pv("title").into()),
        Operator::Like,
        lit("SPR%"),
    );
    assert_eq!(keys(&index, IndexConstraints::new([upper]))?, ["n1", "n4"]);
    Ok(())
}

#[test]
fn like_is_rejected_for_non_textual_types() -> Result<()> {
    let index = catalog()?;
    for (property, ty) in [
        ("size", PropertyType::Long),
        ("flag", PropertyType::Boolean),
        ("created", PropertyType::Date),
        ("blob", PropertyType::Binary),
    ] {
        let err = count(&index, cmp(property, Operator::Like, "1%")).unwrap_err();
        assert!(
            matches!(
                err,
                IndexError::ValueFormat(ValueFormatError::OperatorNotSupported {
                    operator: "LIKE",
                    property_type,
                }) if property_type == ty
            ),
            "{property}: {err}"
        );
    }
    Ok(())
}

#[test]
fn between_follows_interval_bounds() -> Result<()> {
    let index = PropertyIndex::in_memory(IndexDefinition::single_column(
        "numbers",
        "n",
        PropertyType::Long,
    )?);
    index.add_values(&"k".into(), "n", vec![Value::from(1), Value::from(3)])?;
    index.commit()?;

    let between = |lower: i64, upper: i64, lower_included: bool, upper_included: bool| {
        Constraint::from(Between::new(
            pv("n"),
            lit(lower),
            lit(upper),
            lower_included,
            upper_included,
        ))
    };
    assert_eq!(count(&index, between(0, 2, false, false))?, 1);
    assert_eq!(count(&index, between(1, 2, true, false))?, 1);
    assert_eq!(count(&index, between(1, 2, false, false))?, 0);
    assert_eq!(count(&index, between(2, 4, false, false))?, 1);
    assert_eq!(count(&index, between(3, 5, false, false))?, 0);
    assert_eq!(count(&index, between(3, 5, true, false))?, 1);
    Ok(())
}

#[test]
fn comparisons_coerce_the_static_operand() -> Result<()> {
    let index = catalog()?;
    assert_eq!(
        keys(&index, IndexConstraints::new([cmp("size", Operator::GreaterThan, "30")]))?,
        ["n3", "n4"]
    );
    assert_eq!(
        keys(
            &index,
            IndexConstraints::new([cmp("created", Operator::LessThan, "2024-07-01T00:00:00Z")])
        )?,
        ["n1", "n2"]
    );
    assert_eq!(count(&index, cmp("size", Operator::LessThanOrEqualTo, 25.0))?, 2);

    let err = count(&index, cmp("size", Operator::EqualTo, "large")).unwrap_err();
    assert!(matches!(err, IndexError::ValueFormat(_)));
    Ok(())
}

#[test]
fn set_criteria_and_bind_variables() -> Result<()> {
    let index = catalog()?;
    let set = SetCriteria::new(
        pv("size"),
        [lit(10i64), StaticOperand::variable("other")?, lit(99i64)],
    )?;
    let constraints = IndexConstraints::new([Constraint::from(set.clone())]).bind("other", 40i64);
    assert_eq!(keys(&index, constraints)?, ["n1", "n3"]);

    let missing = index
        .estimate_cardinality(&[set.into()], &Parameters::new())
        .unwrap_err();
    assert!(matches!(missing, IndexError::MissingVariable(name) if name == "other"));
    Ok(())
}

#[test]
fn existence_and_negation() -> Result<()> {
    let index = catalog()?;
    let has_flag = Constraint::from(PropertyExistence::new(sel(), "flag")?);
    assert_eq!(keys(&index, IndexConstraints::new([has_flag.clone()]))?, ["n1"]);
    assert_eq!(
        keys(&index, IndexConstraints::new([Constraint::not(has_flag)]))?,
        ["n2", "n3", "n4"]
    );
    Ok(())
}

#[test]
fn references_search_every_reference_column_when_unnamed() -> Result<()> {
    let index = catalog()?;
    let any = Constraint::comparison(
        ReferenceValue::any(sel()),
        Operator::EqualTo,
        lit("target-1"),
    );
    assert_eq!(keys(&index, IndexConstraints::new([any]))?, ["n2", "n3"]);

    let named = Constraint::comparison(
        ReferenceValue::property_of(sel(), "ref")?,
        Operator::EqualTo,
        lit("target-1"),
    );
    assert_eq!(keys(&index, IndexConstraints::new([named]))?, ["n2"]);
    Ok(())
}

#[test]
fn path_constraints_use_the_path_column() -> Result<()> {
    let index = catalog()?;
    let child = Constraint::from(ChildNode::new(sel(), "/a")?);
    let descendant = Constraint::from(DescendantNode::new(sel(), "/a")?);
    let same = Constraint::from(SameNode::new(sel(), "/x")?);
    assert_eq!(keys(&index, IndexConstraints::new([child]))?, ["n2"]);
    assert_eq!(keys(&index, IndexConstraints::new([descendant]))?, ["n2", "n3"]);
    assert_eq!(keys(&index, IndexConstraints::new([same]))?, ["n4"]);

    let deep = Constraint::comparison(NodeDepth::new(sel()), Operator::GreaterThan, lit(1i64));
    assert_eq!(keys(&index, IndexConstraints::new([deep]))?, ["n2", "n3"]);
    Ok(())
}

#[test]
fn relike_treats_stored_values_as_patterns() -> Result<()> {
    let index = catalog()?;
    let relike = |candidate: &str| {
        Constraint::from(Relike::new(lit(candidate), pv("pattern")))
    };
    assert_eq!(count(&index, relike("img_01.png"))?, 1);
    assert_eq!(count(&index, relike("document"))?, 1);
    assert_eq!(count(&index, relike("readme"))?, 0);
    Ok(())
}

#[test]
fn conjunctions_and_disjunctions() -> Result<()> {
    let index = catalog()?;
    let either = Constraint::or(
        cmp("title", Operator::EqualTo, "autumn"),
        cmp("size", Operator::LessThan, 20i64),
    );
    assert_eq!(keys(&index, IndexConstraints::new([either.clone()]))?, ["n1", "n3"]);
    let both = IndexConstraints::new([either, cmp("size", Operator::GreaterThan, 20i64)]);
    assert_eq!(keys(&index, both)?, ["n3"]);
    Ok(())
}

#[test]
fn unsupported_constraints_fail_at_filter_time() -> Result<()> {
    let index = catalog()?;
    let unknown = cmp("missing", Operator::EqualTo, "x");
    assert!(matches!(
        index.filter(&IndexConstraints::new([unknown]), 0),
        Err(IndexError::UnknownProperty { property, .. }) if property == "missing"
    ));

    let search = Constraint::from(FullTextSearch::new(sel(), None, "fox")?);
    assert!(matches!(
        count(&index, search),
        Err(IndexError::Unsupported(_))
    ));

    let score = Constraint::comparison(
        FullTextSearchScore::new(sel()),
        Operator::GreaterThan,
        lit(0.5),
    );
    assert!(matches!(count(&index, score), Err(IndexError::Unsupported(_))));

    let subquery = Subquery::new(Query::new(Selector::new(sel())));
    let nested = Constraint::comparison(pv("title"), Operator::EqualTo, subquery.into());
    assert!(matches!(count(&index, nested), Err(IndexError::Unsupported(_))));

    let range = cmp("blob", Operator::GreaterThan, "abc");
    assert!(matches!(
        count(&index, range),
        Err(IndexError::ValueFormat(ValueFormatError::OperatorNotSupported { .. }))
    ));
    Ok(())
}

#[test]
fn cursors_batch_in_key_order_with_unit_scores() -> Result<()> {
    let index = catalog()?;
    let mut results = index.filter(&IndexConstraints::default(), 4)?;
    let first = results.next_batch(3);
    assert_eq!(first.len(), 3);
    assert!(first.scores().iter().all(|score| *score == 1.0));
    let second = results.next_batch(3);
    assert_eq!(second.keys(), [NodeKey::from("n4")]);
    assert!(results.next_batch(3).is_empty());
    assert!(results.next_batch(3).is_empty());
    Ok(())
}

#[test]
fn deeply_nested_constraints_are_answered() -> Result<()> {
    let index = catalog()?;
    let mut constraint = cmp("size", Operator::GreaterThanOrEqualTo, 25);
    for level in 0..50_000 {
        constraint = match level % 3 {
            0 => Constraint::not(Constraint::not(constraint)),
            1 => Constraint::and(constraint, cmp("size", Operator::LessThan, 100)),
            _ => Constraint::or(constraint, cmp("size", Operator::GreaterThan, 1000)),
        };
    }
    assert_eq!(
        index.estimate_cardinality(std::slice::from_ref(&constraint), &Parameters::new())?,
        3
    );
    let hits = index.filter_all(&IndexConstraints::new([constraint]))?;
    assert_eq!(
        hits.iter().map(|(key, _)| key.as_str()).collect::<Vec<_>>(),
        ["n2", "n3", "n4"]
    );
    assert!(hits.iter().all(|(_, score)| *score == 1.0));
    Ok(())
}

#[derive(Clone, Debug)]
enum Shape {
    Cmp(Operator, i64),
    Between(i64, i64, bool, bool),
    In(Vec<i64>),
    Exists,
    Not(Box<Shape>),
    Or(Box<Shape>, Box<Shape>),
    And(Box<Shape>, Box<Shape>),
}

impl Shape {
    fn constraint(&self) -> Constraint {
        match self {
            Shape::Cmp(operator, value) => cmp("n", *operator, *value),
            Shape::Between(lower, upper, li, ui) => {
                Between::new(pv("n"), lit(*lower), lit(*upper), *li, *ui).into()
            }
            Shape::In(values) => {
                SetCriteria::new(pv("n"), values.iter().map(|v| lit(*v)))
                    .unwrap()
                    .into()
            }
            Shape::Exists => PropertyExistence::new(sel(), "n").unwrap().into(),
            Shape::Not(inner) => Constraint::not(inner.constraint()),
            Shape::Or(a, b) => Constraint::or(a.constraint(), b.constraint()),
            Shape::And(a, b) => Constraint::and(a.constraint(), b.constraint()),
        }
    }
}

fn operator() -> impl Strategy<Value = Operator> {
    prop_oneof![
        Just(Operator::EqualTo),
        Just(Operator::NotEqualTo),
        Just(Operator::LessThan),
        Just(Operator::LessThanOrEqualTo),
        Just(Operator::GreaterThan),
        Just(Operator::GreaterThanOrEqualTo),
    ]
}

fn shape() -> impl Strategy<Value = Shape> {
    let leaf = prop_oneof![
        (operator(), 0i64..10).prop_map(|(op, v)| Shape::Cmp(op, v)),
        (0i64..10, 0i64..10, any::<bool>(), any::<bool>())
            .prop_map(|(a, b, li, ui)| Shape::Between(a, b, li, ui)),
        prop::collection::vec(0i64..10, 1..4).prop_map(Shape::In),
        Just(Shape::Exists),
    ];
    leaf.prop_recursive(3, 12, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|s| Shape::Not(Box::new(s))),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Shape::Or(Box::new(a), Box::new(b))),
            (inner.clone(), inner).prop_map(|(a, b)| Shape::And(Box::new(a), Box::new(b))),
        ]
    })
}

proptest! {
    #[test]
    fn cardinality_equals_drained_filter(
        rows in prop::collection::vec(prop::collection::vec(0i64..10, 0..4), 0..12),
        shapes in prop::collection::vec(shape(), 0..3),
        batch in 1usize..5,
    ) {
        let index = PropertyIndex::in_memory(
            IndexDefinition::single_column("numbers", "n", PropertyType::Long).unwrap(),
        );
        for (i, values) in rows.iter().enumerate() {
            let key = NodeKey::new(format!("node-{i:02}"));
            index
                .add_values(&key, "n", values.iter().map(|v| Value::from(*v)).collect())
                .unwrap();
        }
        index.commit().unwrap();

        let constraints = IndexConstraints::new(shapes.iter().map(Shape::constraint));
        let expected = index
            .estimate_cardinality(&constraints.constraints, &constraints.parameters)
            .unwrap();
        let mut results = index.filter(&constraints, expected).unwrap();
        let drained = drain(results.as_mut(), batch);
        prop_assert_eq!(drained.len(), expected);
        prop_assert!(drained.windows(2).all(|pair| pair[0].0 < pair[1].0));
    }
}
