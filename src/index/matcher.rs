use std::borrow::Cow;
use std::cmp::Ordering;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::query::fulltext::Term;
use crate::query::model::Operator;
use crate::value::{LikePattern, Path, Value, ValueFactory};

use super::store::Row;
use super::text::{tokenize, Bm25, Phrase, PhraseError, TextStats};

/// Score of a row that matched a constraint without full-text relevance.
pub(crate) const UNSCORED: f32 = 1.0;

/// Score of a row that matched only by excluding full-text terms.
pub(crate) const NEUTRAL_SCORE: f32 = 0.5;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Case {
    Lower,
    Upper,
}

impl Case {
    fn apply(self, text: &str) -> String {
        match self {
            Case::Lower => text.to_lowercase(),
            Case::Upper => text.to_uppercase(),
        }
    }
}

/// How a dynamic operand reads one stored column.
#[derive(Clone)]
pub(crate) struct Probe {
    pub(crate) property: String,
    /// Factory of the column's declared type.
    pub(crate) column: Arc<dyn ValueFactory>,
    /// `LENGTH(...)` of the stored value instead of the value itself.
    pub(crate) length: bool,
    /// Case functions, innermost first.
    pub(crate) cases: SmallVec<[Case; 2]>,
    /// Factory whose comparator judges the extracted value.
    pub(crate) compare_as: Arc<dyn ValueFactory>,
}

impl Probe {
    fn extract<'v>(&self, value: &'v Value) -> Cow<'v, Value> {
        let measured = if self.length {
            Cow::Owned(Value::Long(self.column.length(value) as i64))
        } else {
            Cow::Borrowed(value)
        };
        if self.cases.is_empty() {
            return measured;
        }
        let mut text = if self.length {
            measured.to_canonical_string()
        } else {
            self.column.as_string(value)
        };
        for case in &self.cases {
            text = case.apply(&text);
        }
        Cow::Owned(Value::String(text))
    }

    fn compare(&self, value: &Value, operand: &Value) -> Ordering {
        self.compare_as.compare(&self.extract(value), operand)
    }

    fn text(&self, value: &Value) -> String {
        self.compare_as.as_string(&self.extract(value))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum PathRelation {
    Same,
    Child,
    Descendant,
}

/// Full-text term compiled against the index tokenizer.
#[derive(Clone, Debug)]
pub(crate) enum TextQuery {
    Phrase { phrase: Phrase, excluded: bool },
    All(Vec<TextQuery>),
    Any(Vec<TextQuery>),
}

impl TextQuery {
    pub(crate) fn compile(term: &Term) -> Result<Self, PhraseError> {
        Ok(match term {
            Term::Simple(simple) => TextQuery::Phrase {
                phrase: Phrase::from_term(simple)?,
                excluded: simple.is_excluded(),
            },
            Term::Conjunction(compound) => TextQuery::All(
                compound
                    .terms()
                    .iter()
                    .map(TextQuery::compile)
                    .collect::<Result<_, _>>()?,
            ),
            Term::Disjunction(compound) => TextQuery::Any(
                compound
                    .terms()
                    .iter()
                    .map(TextQuery::compile)
                    .collect::<Result<_, _>>()?,
            ),
        })
    }

    fn eval(&self, row: Row<'_>, properties: &[String], scorer: &Scorer<'_>) -> Option<f32> {
        match self {
            TextQuery::Phrase { phrase, excluded } => {
                let best = best_phrase_score(phrase, row, properties, scorer);
                match (best, excluded) {
                    (Some(score), false) => Some(score),
                    (None, true) => Some(NEUTRAL_SCORE),
                    _ => None,
                }
            }
            TextQuery::All(parts) => {
                let mut total = 0.0;
                for part in parts {
                    total += part.eval(row, properties, scorer)?;
                }
                Some(total / parts.len().max(1) as f32)
            }
            TextQuery::Any(parts) => parts
                .iter()
                .filter_map(|part| part.eval(row, properties, scorer))
                .reduce(f32::max),
        }
    }
}

fn best_phrase_score(
    phrase: &Phrase,
    row: Row<'_>,
    properties: &[String],
    scorer: &Scorer<'_>,
) -> Option<f32> {
    let stats = scorer.text?;
    let mut best: Option<f32> = None;
    for property in properties {
        let Some(column) = stats.column(property) else {
            continue;
        };
        for value in row.values(property) {
            let tokens = tokenize(&value.to_canonical_string());
            if let Some((tf, df)) = phrase.occurrences(&tokens, column) {
                let score = scorer.bm25.score(column, tf, df, tokens.len());
                best = Some(best.map_or(score, |b| b.max(score)));
            }
        }
    }
    best
}

/// Evaluation context shared by every row of one cursor.
pub(crate) struct Scorer<'a> {
    pub(crate) text: Option<&'a TextStats>,
    pub(crate) bm25: Bm25,
}

/// Compiled constraint. Every variant except `Not` matches a row when at
/// least one stored value satisfies it.
pub(crate) enum Matcher {
    All(Vec<Matcher>),
    Any(Vec<Matcher>),
    Not(Box<Matcher>),
    Exists(String),
    Compare {
        probe: Probe,
        operator: Operator,
        operand: Value,
    },
    Range {
        probe: Probe,
        lower: Value,
        lower_included: bool,
        upper: Value,
        upper_included: bool,
    },
    Like {
        probe: Probe,
        pattern: LikePattern,
    },
    In {
        probe: Probe,
        operands: Vec<Value>,
    },
    Relike {
        property: String,
        column: Arc<dyn ValueFactory>,
        candidate: String,
    },
    Path {
        property: String,
        relation: PathRelation,
        path: Path,
    },
    FullText {
        properties: Vec<String>,
        query: TextQuery,
    },
}

impl Matcher {
    /// Single matcher for a conjunction, unwrapping one-element lists.
    pub(crate) fn all(mut parts: Vec<Matcher>) -> Matcher {
        if parts.len() == 1 {
            if let Some(only) = parts.pop() {
                return only;
            }
        }
        Matcher::All(parts)
    }

    /// Single matcher for a disjunction, unwrapping one-element lists.
    pub(crate) fn any(mut parts: Vec<Matcher>) -> Matcher {
        if parts.len() == 1 {
            if let Some(only) = parts.pop() {
                return only;
            }
        }
        Matcher::Any(parts)
    }

    fn is_composite(&self) -> bool {
        matches!(self, Matcher::All(_) | Matcher::Any(_) | Matcher::Not(_))
    }

    /// Score of `row`, or `None` when it does not match.
    pub(crate) fn eval(&self, row: Row<'_>, scorer: &Scorer<'_>) -> Option<f32> {
        if !self.is_composite() {
            return self.eval_leaf(row, scorer);
        }
        let mut steps: SmallVec<[Step<'_>; 16]> = SmallVec::new();
        let mut scores: SmallVec<[Option<f32>; 16]> = SmallVec::new();
        steps.push(Step::Visit(self));
        while let Some(step) = steps.pop() {
            match step {
                Step::Visit(Matcher::All(parts)) => {
                    steps.push(Step::All(parts.len()));
                    steps.extend(parts.iter().rev().map(Step::Visit));
                }
                Step::Visit(Matcher::Any(parts)) => {
                    steps.push(Step::Any(parts.len()));
                    steps.extend(parts.iter().rev().map(Step::Visit));
                }
                Step::Visit(Matcher::Not(inner)) => {
                    steps.push(Step::Not);
                    steps.push(Step::Visit(&**inner));
                }
                Step::Visit(leaf) => scores.push(leaf.eval_leaf(row, scorer)),
                Step::All(count) => {
                    let start = scores.len().saturating_sub(count);
                    let score = scores
                        .drain(start..)
                        .try_fold(0.0, |total, score| score.map(|score| total + score))
                        .map(|total| {
                            if count == 0 {
                                UNSCORED
                            } else {
                                total / count as f32
                            }
                        });
                    scores.push(score);
                }
                Step::Any(count) => {
                    let start = scores.len().saturating_sub(count);
                    let score = scores.drain(start..).flatten().reduce(f32::max);
                    scores.push(score);
                }
                Step::Not => {
                    let inner = scores.pop().flatten();
                    scores.push(match inner {
                        Some(_) => None,
                        None => Some(UNSCORED),
                    });
                }
            }
        }
        scores.pop().flatten()
    }

    fn eval_leaf(&self, row: Row<'_>, scorer: &Scorer<'_>) -> Option<f32> {
        match self {
            Matcher::All(_) | Matcher::Any(_) | Matcher::Not(_) => self.eval(row, scorer),
            Matcher::Exists(property) => matched(!row.values(property).is_empty()),
            Matcher::Compare {
                probe,
                operator,
                operand,
            } => matched(
                row.values(&probe.property)
                    .iter()
                    .any(|value| holds(*operator, probe.compare(value, operand))),
            ),
            Matcher::Range {
                probe,
                lower,
                lower_included,
                upper,
                upper_included,
            } => matched(row.values(&probe.property).iter().any(|value| {
                let above = match probe.compare(value, lower) {
                    Ordering::Greater => true,
                    Ordering::Equal => *lower_included,
                    Ordering::Less => false,
                };
                above
                    && match probe.compare(value, upper) {
                        Ordering::Less => true,
                        Ordering::Equal => *upper_included,
                        Ordering::Greater => false,
                    }
            })),
            Matcher::Like { probe, pattern } => matched(
                row.values(&probe.property)
                    .iter()
                    .any(|value| pattern.matches(&probe.text(value))),
            ),
            Matcher::In { probe, operands } => {
                matched(row.values(&probe.property).iter().any(|value| {
                    operands
                        .iter()
                        .any(|operand| probe.compare(value, operand) == Ordering::Equal)
                }))
            }
            Matcher::Relike {
                property,
                column,
                candidate,
            } => matched(row.values(property).iter().any(|value| {
                LikePattern::compile(&column.as_string(value))
                    .map(|pattern| pattern.matches(candidate))
                    .unwrap_or(false)
            })),
            Matcher::Path {
                property,
                relation,
                path,
            } => matched(row.values(property).iter().any(|value| match value {
                Value::Path(stored) => match relation {
                    PathRelation::Same => stored == path,
                    PathRelation::Child => stored.parent().as_ref() == Some(path),
                    PathRelation::Descendant => path.is_ancestor_of(stored),
                },
                _ => false,
            })),
            Matcher::FullText { properties, query } => query.eval(row, properties, scorer),
        }
    }
}

/// Pending work of [`Matcher::eval`].
enum Step<'m> {
    Visit(&'m Matcher),
    All(usize),
    Any(usize),
    Not,
}

impl Drop for Matcher {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        detach_children(self, &mut pending);
        while let Some(mut matcher) = pending.pop() {
            detach_children(&mut matcher, &mut pending);
        }
    }
}

/// Moves nested composites out of `matcher` so they drop one at a time.
fn detach_children(matcher: &mut Matcher, pending: &mut Vec<Matcher>) {
    match matcher {
        Matcher::All(parts) | Matcher::Any(parts) => pending.append(parts),
        Matcher::Not(inner) if inner.is_composite() => {
            pending.push(std::mem::replace(&mut **inner, Matcher::All(Vec::new())));
        }
        _ => {}
    }
}

fn matched(hit: bool) -> Option<f32> {
    hit.then_some(UNSCORED)
}

fn holds(operator: Operator, ordering: Ordering) -> bool {
    match operator {
        Operator::EqualTo => ordering == Ordering::Equal,
        Operator::NotEqualTo => ordering != Ordering::Equal,
        Operator::LessThan => ordering == Ordering::Less,
        Operator::LessThanOrEqualTo => ordering != Ordering::Greater,
        Operator::GreaterThan => ordering == Ordering::Greater,
        Operator::GreaterThanOrEqualTo => ordering != Ordering::Less,
        // compiled into `Matcher::Like`
        Operator::Like => false,
    }
}
