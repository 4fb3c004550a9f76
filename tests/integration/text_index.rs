#![allow(missing_docs)]

use std::sync::Once;

use penumbra::query::model::{
    Constraint, FullTextSearch, Operator, PropertyExistence, PropertyValue, SelectorName,
    StaticOperand,
};
use penumbra::{
    Index, IndexConstraints, IndexDefinition, IndexError, IndexKind, IndexOptions, NodeKey,
    Parameters, PropertyIndex, Result, Value,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("penumbra=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_ansi(false)
            .try_init();
    });
}

fn sel() -> SelectorName {
    SelectorName::new("doc").unwrap()
}

fn contains(property: Option<&str>, expression: &str) -> Constraint {
    FullTextSearch::new(sel(), property.map(str::to_owned), expression)
        .unwrap()
        .into()
}

fn search(index: &PropertyIndex, constraint: Constraint) -> Result<Vec<(String, f32)>> {
    Ok(index
        .filter_all(&IndexConstraints::new([constraint]))?
        .into_iter()
        .map(|(key, score)| (key.as_str().to_owned(), score))
        .collect())
}

fn keys(index: &PropertyIndex, expression: &str) -> Result<Vec<String>> {
    Ok(search(index, contains(None, expression))?
        .into_iter()
        .map(|(key, _)| key)
        .collect())
}

fn corpus(documents: &[(&str, &str)]) -> Result<PropertyIndex> {
    let index = PropertyIndex::in_memory(IndexDefinition::text("docs", ["body"])?);
    for (key, body) in documents {
        index.add(&NodeKey::from(*key), "body", Value::from(*body))?;
    }
    index.commit()?;
    Ok(index)
}

fn foxes() -> Result<PropertyIndex> {
    corpus(&[("d1", "the quick"), ("d2", "brown fox"), ("d3", "green fox")])
}

#[test]
fn matching_terms_are_scored_below_one() -> Result<()> {
    init_tracing();
    let index = foxes()?;
    assert_eq!(index.kind(), IndexKind::Text);

    let hits = search(&index, contains(None, "fox"))?;
    assert_eq!(
        hits.iter().map(|(key, _)| key.as_str()).collect::<Vec<_>>(),
        ["d2", "d3"]
    );
    for (key, score) in &hits {
        assert!(*score > 0.0 && *score < 1.0, "{key}: {score}");
    }
    assert_eq!(
        index.estimate_cardinality(&[contains(None, "fox")], &Parameters::new())?,
        2
    );
    Ok(())
}

#[test]
fn excluded_terms_match_the_rest_with_a_neutral_score() -> Result<()> {
    let index = foxes()?;
    assert_eq!(
        search(&index, contains(None, "-fox"))?,
        [("d1".to_owned(), 0.5)]
    );
    assert_eq!(keys(&index, "quick -fox")?, ["d1"]);
    assert!(keys(&index, "fox -brown -green")?.is_empty());
    Ok(())
}

#[test]
fn phrases_require_adjacent_words() -> Result<()> {
    let index = corpus(&[
        ("d1", "the quick brown fox"),
        ("d2", "brown dogs chase a fox"),
        ("d3", "Brown, fox!"),
    ])?;
    assert_eq!(keys(&index, "\"brown fox\"")?, ["d1", "d3"]);
    assert_eq!(keys(&index, "brown fox")?, ["d1", "d2", "d3"]);
    assert_eq!(keys(&index, "\"fox brown\"")?, Vec::<String>::new());
    Ok(())
}

#[test]
fn disjunctions_and_wildcards() -> Result<()> {
    let index = corpus(&[
        ("d1", "quick thinking"),
        ("d2", "quartz clock"),
        ("d3", "green field"),
    ])?;
    assert_eq!(keys(&index, "quick OR green")?, ["d1", "d3"]);
    assert_eq!(keys(&index, "qu*")?, ["d1", "d2"]);
    assert_eq!(keys(&index, "qu?ck")?, ["d1"]);
    assert_eq!(keys(&index, "cl?ck OR fi*")?, ["d2", "d3"]);
    Ok(())
}

#[test]
fn repeated_terms_score_higher() -> Result<()> {
    let index = corpus(&[
        ("d1", "fox fox"),
        ("d2", "red fox"),
        ("d3", "lazy dog"),
        ("d4", "sleepy cat"),
    ])?;
    let hits = search(&index, contains(None, "fox"))?;
    assert_eq!(hits.len(), 2);
    assert!(hits[0].1 > hits[1].1, "{hits:?}");
    Ok(())
}

#[test]
fn searches_can_target_one_property() -> Result<()> {
    let index = PropertyIndex::in_memory(IndexDefinition::text("notes", ["title", "body"])?);
    index.add(&"n1".into(), "title", Value::from("fox sightings"))?;
    index.add(&"n2".into(), "body", Value::from("a fox was seen"))?;
    index.commit()?;

    assert_eq!(keys(&index, "fox")?, ["n1", "n2"]);
    let titled = search(&index, contains(Some("title"), "fox"))?;
    assert_eq!(titled.len(), 1);
    assert_eq!(titled[0].0, "n1");

    assert!(matches!(
        search(&index, contains(Some("summary"), "fox")),
        Err(IndexError::UnknownProperty { .. })
    ));
    Ok(())
}

#[test]
fn statistics_follow_updates_and_removals() -> Result<()> {
    let index = foxes()?;
    index.add(&"d2".into(), "body", Value::from("brown bear"))?;
    index.remove(&"d3".into())?;
    index.commit()?;
    assert!(keys(&index, "fox")?.is_empty());
    assert_eq!(keys(&index, "bear")?, ["d2"]);
    Ok(())
}

#[test]
fn boolean_composition_over_searches() -> Result<()> {
    let index = foxes()?;
    let either = Constraint::or(contains(None, "quick"), contains(None, "green"));
    assert_eq!(
        search(&index, either)?
            .into_iter()
            .map(|(key, _)| key)
            .collect::<Vec<_>>(),
        ["d1", "d3"]
    );
    let neither = Constraint::not(contains(None, "fox"));
    assert_eq!(search(&index, neither)?, [("d1".to_owned(), 1.0)]);
    Ok(())
}

#[test]
fn text_indexes_only_answer_full_text_constraints() -> Result<()> {
    let index = foxes()?;
    let comparison = Constraint::comparison(
        PropertyValue::new(sel(), "body").unwrap(),
        Operator::EqualTo,
        StaticOperand::literal("brown fox"),
    );
    assert!(matches!(
        index.estimate_cardinality(&[comparison], &Parameters::new()),
        Err(IndexError::Unsupported(_))
    ));
    let existence = Constraint::from(PropertyExistence::new(sel(), "body").unwrap());
    assert!(matches!(
        index.filter(&IndexConstraints::new([existence]), 0),
        Err(IndexError::Unsupported(_))
    ));
    Ok(())
}

#[test]
fn malformed_expressions_surface_parse_errors() -> Result<()> {
    let index = foxes()?;
    assert!(matches!(
        index.estimate_cardinality(&[contains(None, "fox OR")], &Parameters::new()),
        Err(IndexError::Parse(_))
    ));
    Ok(())
}

#[test]
fn terms_without_words_are_invalid() -> Result<()> {
    let index = foxes()?;
    for expression in ["!!!", "-!!!", "fox OR \"...\""] {
        assert!(
            matches!(
                index.estimate_cardinality(&[contains(None, expression)], &Parameters::new()),
                Err(IndexError::InvalidArgument(_))
            ),
            "{expression}"
        );
    }
    assert!(matches!(
        index.filter(&IndexConstraints::new([contains(None, "!!!")]), 0),
        Err(IndexError::InvalidArgument(_))
    ));
    Ok(())
}

#[test]
fn scoring_parameters_come_from_options() -> Result<()> {
    let documents = [("d1", "fox"), ("d2", "fox and a very long tail of words")];
    let flat = PropertyIndex::open(
        IndexDefinition::text("docs", ["body"])?,
        IndexOptions::default().with_bm25(1.2, 0.0),
    )?;
    for (key, body) in documents {
        flat.add(&key.into(), "body", Value::from(body))?;
    }
    flat.commit()?;
    let hits = search(&flat, contains(None, "fox"))?;
    // without length normalization both documents score alike
    assert!((hits[0].1 - hits[1].1).abs() < f32::EPSILON, "{hits:?}");

    let normalized = corpus(&documents)?;
    let hits = search(&normalized, contains(None, "fox"))?;
    assert!(hits[0].1 > hits[1].1, "{hits:?}");
    Ok(())
}
