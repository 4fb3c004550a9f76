#![allow(missing_docs)]

use penumbra::query::fulltext::{parse, CompoundTerm, SimpleTerm, Term};
use penumbra::query::model::{FullTextSearch, SelectorName};
use proptest::prelude::*;

fn word(value: &str) -> Term {
    Term::Simple(SimpleTerm::new(value, false, false).unwrap())
}

fn excluded(value: &str) -> Term {
    Term::Simple(SimpleTerm::new(value, true, false).unwrap())
}

fn phrase(value: &str) -> Term {
    Term::Simple(SimpleTerm::new(value, false, true).unwrap())
}

fn and(terms: Vec<Term>) -> Term {
    Term::Conjunction(CompoundTerm::new(terms).unwrap())
}

fn or(terms: Vec<Term>) -> Term {
    Term::Disjunction(CompoundTerm::new(terms).unwrap())
}

#[test]
fn implicit_conjunction_and_exclusion() {
    assert_eq!(
        parse("quick -slow +fox").unwrap(),
        and(vec![word("quick"), excluded("slow"), word("fox")])
    );
}

#[test]
fn quoted_phrases_keep_spaces_and_escapes() {
    assert_eq!(
        parse(r#""brown fox" 'it\'s'"#).unwrap(),
        and(vec![phrase("brown fox"), phrase("it's")])
    );
    let Term::Simple(simple) = parse("\"the  lazy dog\"").unwrap() else {
        panic!("expected a simple term");
    };
    assert!(simple.is_quoted());
    assert_eq!(simple.words().collect::<Vec<_>>(), ["the", "lazy", "dog"]);
}

#[test]
fn disjunctions_group_adjacent_terms() {
    assert_eq!(
        parse("a b OR c OR -d e").unwrap(),
        or(vec![
            and(vec![word("a"), word("b")]),
            word("c"),
            and(vec![excluded("d"), word("e")]),
        ])
    );
}

#[test]
fn wildcards_stay_in_the_value() {
    let Term::Simple(simple) = parse("fo*").unwrap() else {
        panic!("expected a simple term");
    };
    assert!(simple.contains_wildcards());
    assert_eq!(simple.value(), "fo*");
}

#[test]
fn simple_terms_are_listed_in_order() {
    let term = parse("a OR b -c").unwrap();
    let values: Vec<_> = term.simple_terms().iter().map(|t| t.value()).collect();
    assert_eq!(values, ["a", "b", "c"]);
    assert!(!term.is_excluded());
    assert!(parse("-a").unwrap().is_excluded());
}

#[test]
fn malformed_expressions_report_position() {
    let cases = [
        ("", 0, "blank"),
        ("fox \"unterminated", 4, "unterminated"),
        ("fox \"  \"", 4, "empty"),
        ("fox -", 4, "followed"),
        ("- fox", 0, "followed"),
        ("fox OR", 4, "OR must be followed"),
        ("OR fox", 0, "OR must be preceded"),
        ("a OR OR b", 5, "OR must be preceded"),
    ];
    for (expression, position, fragment) in cases {
        let err = parse(expression).unwrap_err();
        assert_eq!(err.position, position, "{expression:?}: {err}");
        assert!(
            err.message.contains(fragment),
            "{expression:?}: {} lacks {fragment:?}",
            err.message
        );
    }
}

#[test]
fn full_text_search_memoizes_successful_parses_only() {
    let s = SelectorName::new("s").unwrap();
    let good = FullTextSearch::new(s.clone(), None, "brown fox").unwrap();
    let first = good.term().unwrap() as *const Term;
    let second = good.term().unwrap() as *const Term;
    assert_eq!(first, second);

    let bad = FullTextSearch::new(s, Some("body".into()), "fox OR").unwrap();
    assert!(bad.term().is_err());
    assert!(bad.term().is_err());
}

proptest! {
    #[test]
    fn rendering_reparses_to_the_same_term(
        words in prop::collection::vec("[a-z]{1,6}", 1..6),
        flags in prop::collection::vec((any::<bool>(), any::<bool>()), 6),
    ) {
        let expression = words
            .iter()
            .zip(&flags)
            .map(|(word, (exclude, or))| {
                let prefix = if *exclude { "-" } else { "" };
                let joiner = if *or { " OR " } else { " " };
                format!("{joiner}{prefix}{word}")
            })
            .collect::<String>();
        let expression = expression
            .trim_start_matches(" OR ")
            .trim_start()
            .to_owned();
        let term = parse(&expression).unwrap();
        prop_assert_eq!(parse(&term.to_string()).unwrap(), term);
    }
}
