//! Turns query constraints into [`Matcher`]s bound to one index definition.
//!
//! Every type check happens here, before a cursor is handed out: static
//! operands are resolved and coerced to the type the dynamic side is judged
//! as, operators the type cannot support are rejected, and columns the index
//! does not declare are reported.

use smallvec::SmallVec;

use crate::error::{IndexError, Result};
use crate::query::model::{
    Between, Comparison, Constraint, DynamicOperand, FullTextSearch, Operator, Relike,
    SetCriteria, StaticOperand,
};
use crate::value::{LikePattern, Path, PropertyType, TypeSystem, Value, ValueFormatError};

use super::definition::{
    ColumnDefinition, IndexDefinition, IndexKind, DEPTH_COLUMN, LOCAL_NAME_COLUMN, NAME_COLUMN,
    PATH_COLUMN,
};
use super::matcher::{Case, Matcher, PathRelation, Probe, TextQuery};
use super::Parameters;

/// Pending work of [`Compiler::compile`].
enum Step<'c> {
    Visit(&'c Constraint),
    All(usize),
    Any(usize),
    Not,
}

pub(crate) struct Compiler<'a> {
    definition: &'a IndexDefinition,
    types: &'a TypeSystem,
    parameters: &'a Parameters,
}

impl<'a> Compiler<'a> {
    pub(crate) fn new(
        definition: &'a IndexDefinition,
        types: &'a TypeSystem,
        parameters: &'a Parameters,
    ) -> Self {
        Self {
            definition,
            types,
            parameters,
        }
    }

    /// Conjunction of `constraints`; an empty list matches every node.
    pub(crate) fn compile_all(&self, constraints: &[Constraint]) -> Result<Matcher> {
        let parts = constraints
            .iter()
            .map(|constraint| self.compile(constraint))
            .collect::<Result<Vec<_>>>()?;
        Ok(Matcher::all(parts))
    }

    /// Compiles with an explicit work list so that arbitrarily deep
    /// constraint trees never exhaust the stack.
    fn compile(&self, root: &Constraint) -> Result<Matcher> {
        let mut steps = vec![Step::Visit(root)];
        let mut built: Vec<Matcher> = Vec::new();
        while let Some(step) = steps.pop() {
            match step {
                Step::Visit(constraint @ (Constraint::And(_) | Constraint::Or(_))) => {
                    let conjunction = matches!(constraint, Constraint::And(_));
                    let parts = flatten(constraint, conjunction);
                    steps.push(if conjunction {
                        Step::All(parts.len())
                    } else {
                        Step::Any(parts.len())
                    });
                    steps.extend(parts.into_iter().rev().map(Step::Visit));
                }
                Step::Visit(Constraint::Not(not)) => {
                    steps.push(Step::Not);
                    steps.push(Step::Visit(not.constraint()));
                }
                Step::Visit(leaf) => built.push(self.leaf(leaf)?),
                Step::All(count) => {
                    let parts = built.split_off(built.len().saturating_sub(count));
                    built.push(Matcher::all(parts));
                }
                Step::Any(count) => {
                    let parts = built.split_off(built.len().saturating_sub(count));
                    built.push(Matcher::any(parts));
                }
                Step::Not => {
                    if let Some(inner) = built.pop() {
                        built.push(Matcher::Not(Box::new(inner)));
                    }
                }
            }
        }
        built
            .pop()
            .ok_or_else(|| IndexError::InvalidArgument("empty constraint".into()))
    }

    fn leaf(&self, constraint: &Constraint) -> Result<Matcher> {
        match constraint {
            Constraint::And(_) | Constraint::Or(_) | Constraint::Not(_) => self.compile(constraint),
            Constraint::FullTextSearch(search) => self.full_text(search),
            leaf if self.definition.kind() == IndexKind::Text => Err(IndexError::Unsupported(
                format!(
                    "text index '{}' only answers full-text constraints, not {}",
                    self.definition.name(),
                    kind_of(leaf)
                ),
            )),
            Constraint::Comparison(comparison) => self.comparison(comparison),
            Constraint::Between(between) => self.between(between),
            Constraint::SetCriteria(set) => self.set_criteria(set),
            Constraint::PropertyExistence(existence) => Ok(Matcher::Exists(
                self.column(existence.property())?.property().to_owned(),
            )),
            Constraint::SameNode(same) => self.path(same.path(), PathRelation::Same),
            Constraint::ChildNode(child) => self.path(child.parent_path(), PathRelation::Child),
            Constraint::DescendantNode(descendant) => {
                self.path(descendant.ancestor_path(), PathRelation::Descendant)
            }
            Constraint::Relike(relike) => self.relike(relike),
        }
    }

    fn column(&self, property: &str) -> Result<&'a ColumnDefinition> {
        self.definition.require_column(property)
    }

    fn comparison(&self, comparison: &Comparison) -> Result<Matcher> {
        let operand = self.static_value(comparison.operand2())?;
        let parts = self
            .probes(comparison.operand1())?
            .into_iter()
            .map(|probe| self.compare(probe, comparison.operator(), &operand))
            .collect::<Result<Vec<_>>>()?;
        Ok(Matcher::any(parts))
    }

    fn compare(&self, probe: Probe, operator: Operator, operand: &Value) -> Result<Matcher> {
        if operator == Operator::Like {
            if !probe.compare_as.supports_like() {
                return Err(ValueFormatError::OperatorNotSupported {
                    operator: Operator::Like.symbol(),
                    property_type: probe.compare_as.property_type(),
                }
                .into());
            }
            let source = operand.to_canonical_string();
            if LikePattern::is_literal(&source) {
                let operand = probe.compare_as.create_from_str(&source)?;
                return Ok(Matcher::Compare {
                    probe,
                    operator: Operator::EqualTo,
                    operand,
                });
            }
            let pattern = LikePattern::compile(&source).map_err(|err| {
                IndexError::InvalidArgument(format!("LIKE pattern '{source}': {err}"))
            })?;
            return Ok(Matcher::Like { probe, pattern });
        }
        if operator.is_range() {
            ensure_ordered(&probe, operator.symbol())?;
        }
        let operand = probe.compare_as.create(operand)?;
        Ok(Matcher::Compare {
            probe,
            operator,
            operand,
        })
    }

    fn between(&self, between: &Between) -> Result<Matcher> {
        let lower = self.static_value(between.lower())?;
        let upper = self.static_value(between.upper())?;
        let parts = self
            .probes(between.operand())?
            .into_iter()
            .map(|probe| -> Result<Matcher> {
                ensure_ordered(&probe, "BETWEEN")?;
                Ok(Matcher::Range {
                    lower: probe.compare_as.create(&lower)?,
                    upper: probe.compare_as.create(&upper)?,
                    lower_included: between.is_lower_included(),
                    upper_included: between.is_upper_included(),
                    probe,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Matcher::any(parts))
    }

    fn set_criteria(&self, set: &SetCriteria) -> Result<Matcher> {
        let values = set
            .right()
            .iter()
            .map(|operand| self.static_value(operand))
            .collect::<Result<Vec<_>>>()?;
        let parts = self
            .probes(set.left())?
            .into_iter()
            .map(|probe| -> Result<Matcher> {
                let operands = values
                    .iter()
                    .map(|value| probe.compare_as.create(value))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(Matcher::In { probe, operands })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Matcher::any(parts))
    }

    fn full_text(&self, search: &FullTextSearch) -> Result<Matcher> {
        if self.definition.kind() != IndexKind::Text {
            return Err(IndexError::Unsupported(format!(
                "index '{}' is not a text index and cannot answer CONTAINS",
                self.definition.name()
            )));
        }
        let properties = match search.property() {
            Some(property) => vec![self.column(property)?.property().to_owned()],
            None => self
                .definition
                .columns()
                .iter()
                .map(|column| column.property().to_owned())
                .collect(),
        };
        let query = TextQuery::compile(search.term()?).map_err(|err| {
            IndexError::InvalidArgument(format!(
                "full-text expression '{}': {err}",
                search.expression()
            ))
        })?;
        Ok(Matcher::FullText { properties, query })
    }

    fn path(&self, text: &str, relation: PathRelation) -> Result<Matcher> {
        let column = self.column(PATH_COLUMN)?;
        let path = Path::parse(text).ok_or_else(|| ValueFormatError::Parse {
            value: text.to_owned(),
            target: PropertyType::Path,
        })?;
        Ok(Matcher::Path {
            property: column.property().to_owned(),
            relation,
            path,
        })
    }

    fn relike(&self, relike: &Relike) -> Result<Matcher> {
        let column = self.column(relike.operand2().property())?;
        let candidate = self.static_value(relike.operand1())?.to_canonical_string();
        Ok(Matcher::Relike {
            property: column.property().to_owned(),
            column: self.types.factory(column.property_type()),
            candidate,
        })
    }

    fn static_value(&self, operand: &StaticOperand) -> Result<Value> {
        match operand {
            StaticOperand::Literal(literal) => Ok(literal.value().clone()),
            StaticOperand::BindVariable(variable) => self
                .parameters
                .get(variable.name())
                .cloned()
                .ok_or_else(|| IndexError::MissingVariable(variable.name().to_owned())),
            StaticOperand::Subquery(_) => Err(IndexError::Unsupported(
                "subquery operands must be resolved before reaching an index".into(),
            )),
        }
    }

    /// One probe per column the operand reads; only an unnamed reference
    /// operand reads more than one.
    fn probes(&self, operand: &DynamicOperand) -> Result<Vec<Probe>> {
        let mut cases = SmallVec::<[Case; 2]>::new();
        let mut current = operand;
        let (columns, length) = loop {
            match current {
                DynamicOperand::LowerCase(inner) => {
                    cases.push(Case::Lower);
                    current = inner.operand();
                }
                DynamicOperand::UpperCase(inner) => {
                    cases.push(Case::Upper);
                    current = inner.operand();
                }
                DynamicOperand::PropertyValue(value) => {
                    break (vec![self.column(value.property())?], false)
                }
                DynamicOperand::ReferenceValue(reference) => match reference.property() {
                    Some(property) => break (vec![self.column(property)?], false),
                    None => {
                        let columns: Vec<_> = self
                            .definition
                            .columns()
                            .iter()
                            .filter(|column| column.property_type().is_reference())
                            .collect();
                        if columns.is_empty() {
                            return Err(IndexError::Unsupported(format!(
                                "index '{}' declares no reference columns",
                                self.definition.name()
                            )));
                        }
                        break (columns, false);
                    }
                },
                DynamicOperand::Length(length) => {
                    break (vec![self.column(length.property_value().property())?], true)
                }
                DynamicOperand::NodeDepth(_) => break (vec![self.column(DEPTH_COLUMN)?], false),
                DynamicOperand::NodePath(_) => break (vec![self.column(PATH_COLUMN)?], false),
                DynamicOperand::NodeName(_) => break (vec![self.column(NAME_COLUMN)?], false),
                DynamicOperand::NodeLocalName(_) => {
                    break (vec![self.column(LOCAL_NAME_COLUMN)?], false)
                }
                DynamicOperand::FullTextSearchScore(_) => {
                    return Err(IndexError::Unsupported(
                        "SCORE() is produced by a search, not evaluated by an index".into(),
                    ))
                }
            }
        };
        // outermost case function was pushed first
        cases.reverse();

        Ok(columns
            .into_iter()
            .map(|column| {
                let factory = self.types.factory(column.property_type());
                let compare_as = if !cases.is_empty() {
                    self.types.factory(PropertyType::String)
                } else if length {
                    self.types.factory(PropertyType::Long)
                } else {
                    factory.clone()
                };
                Probe {
                    property: column.property().to_owned(),
                    column: factory,
                    length,
                    cases: cases.clone(),
                    compare_as,
                }
            })
            .collect())
    }
}

fn ensure_ordered(probe: &Probe, operator: &'static str) -> Result<()> {
    if probe.compare_as.supports_ordering() {
        Ok(())
    } else {
        Err(ValueFormatError::OperatorNotSupported {
            operator,
            property_type: probe.compare_as.property_type(),
        }
        .into())
    }
}

/// Operands of a chain of `AND`s (or `OR`s), left to right, without
/// recursion.
fn flatten(root: &Constraint, conjunction: bool) -> Vec<&Constraint> {
    let mut parts = Vec::new();
    let mut stack = vec![root];
    while let Some(constraint) = stack.pop() {
        match (constraint, conjunction) {
            (Constraint::And(and), true) => {
                stack.push(and.right());
                stack.push(and.left());
            }
            (Constraint::Or(or), false) => {
                stack.push(or.right());
                stack.push(or.left());
            }
            _ => parts.push(constraint),
        }
    }
    parts
}

fn kind_of(constraint: &Constraint) -> &'static str {
    match constraint {
        Constraint::And(_) => "AND",
        Constraint::Or(_) => "OR",
        Constraint::Not(_) => "NOT",
        Constraint::Comparison(_) => "a comparison",
        Constraint::Between(_) => "BETWEEN",
        Constraint::SetCriteria(_) => "IN",
        Constraint::PropertyExistence(_) => "IS NOT NULL",
        Constraint::FullTextSearch(_) => "CONTAINS",
        Constraint::SameNode(_) => "ISSAMENODE",
        Constraint::ChildNode(_) => "ISCHILDNODE",
        Constraint::DescendantNode(_) => "ISDESCENDANTNODE",
        Constraint::Relike(_) => "RELIKE",
    }
}
