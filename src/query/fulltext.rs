//! Full-text search expressions.
//!
//! The language is deliberately small:
//!
//! ```text
//! expr := conj ("OR" conj)*
//! conj := term+
//! term := ["-" | "+"] (word | quoted)
//! ```
//!
//! Adjacent terms form a conjunction and `OR` binds looser, so `a OR b c`
//! parses as `a OR (b AND c)`. Quoted runs (`"..."` or `'...'`) become a single
//! phrase term. `*` and `?` are kept in the term value and interpreted by the
//! index as wildcards.

use std::fmt;

use thiserror::Error;

/// Malformed full-text expression.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message} at position {position}")]
pub struct ParseError {
    /// What went wrong.
    pub message: String,
    /// Character offset into the expression.
    pub position: usize,
}

impl ParseError {
    fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

/// A single word or quoted phrase.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SimpleTerm {
    value: String,
    excluded: bool,
    quoted: bool,
}

impl SimpleTerm {
    /// Creates a term; the value must not be blank.
    pub fn new(value: impl Into<String>, excluded: bool, quoted: bool) -> Result<Self, ParseError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ParseError::new("term value is blank", 0));
        }
        Ok(Self {
            value,
            excluded,
            quoted,
        })
    }

    /// Term text without quotes or prefix.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// True for `-term`.
    pub fn is_excluded(&self) -> bool {
        self.excluded
    }

    /// True for quoted phrases.
    pub fn is_quoted(&self) -> bool {
        self.quoted
    }

    /// True when the value contains `*` or `?`.
    pub fn contains_wildcards(&self) -> bool {
        self.value.contains(['*', '?'])
    }

    /// Whitespace separated words of the value.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.value.split_whitespace()
    }
}

impl fmt::Display for SimpleTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.excluded {
            f.write_str("-")?;
        }
        if self.quoted {
            f.write_str("\"")?;
            for c in self.value.chars() {
                if c == '"' || c == '\\' {
                    f.write_str("\\")?;
                }
                write!(f, "{c}")?;
            }
            f.write_str("\"")
        } else {
            f.write_str(&self.value)
        }
    }
}

/// Non-empty list of child terms.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CompoundTerm {
    terms: Vec<Term>,
}

impl CompoundTerm {
    /// Creates a compound; at least one child is required.
    pub fn new(terms: Vec<Term>) -> Result<Self, ParseError> {
        if terms.is_empty() {
            return Err(ParseError::new("compound term is empty", 0));
        }
        Ok(Self { terms })
    }

    /// Children in source order.
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }
}

/// Parsed full-text expression.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Term {
    /// Word or phrase.
    Simple(SimpleTerm),
    /// Every child must match.
    Conjunction(CompoundTerm),
    /// Any child may match.
    Disjunction(CompoundTerm),
}

impl Term {
    /// Every simple term in the tree, left to right.
    pub fn simple_terms(&self) -> Vec<&SimpleTerm> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(term) = stack.pop() {
            match term {
                Term::Simple(simple) => out.push(simple),
                Term::Conjunction(c) | Term::Disjunction(c) => {
                    stack.extend(c.terms().iter().rev());
                }
            }
        }
        out
    }

    /// True when the term is a single excluded word or phrase.
    pub fn is_excluded(&self) -> bool {
        matches!(self, Term::Simple(simple) if simple.is_excluded())
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (terms, separator) = match self {
            Term::Simple(simple) => return simple.fmt(f),
            Term::Conjunction(c) => (c.terms(), " "),
            Term::Disjunction(c) => (c.terms(), " OR "),
        };
        for (i, term) in terms.iter().enumerate() {
            if i > 0 {
                f.write_str(separator)?;
            }
            term.fmt(f)?;
        }
        Ok(())
    }
}

/// Parses a full-text expression.
pub fn parse(expression: &str) -> Result<Term, ParseError> {
    if expression.trim().is_empty() {
        return Err(ParseError::new("full-text expression is blank", 0));
    }
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: expression.chars().count(),
    };
    parser.disjunction()
}

#[derive(Debug)]
enum Token {
    Word { text: String, quoted: bool },
    Exclude,
    Include,
    Or,
}

#[derive(Debug)]
struct Spanned {
    token: Token,
    position: usize,
}

fn tokenize(expression: &str) -> Result<Vec<Spanned>, ParseError> {
    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        match c {
            '"' | '\'' => {
                i += 1;
                let mut text = String::new();
                let mut closed = false;
                while i < chars.len() {
                    match chars[i] {
                        '\\' if i + 1 < chars.len() => {
                            text.push(chars[i + 1]);
                            i += 2;
                        }
                        q if q == c => {
                            closed = true;
                            i += 1;
                            break;
                        }
                        other => {
                            text.push(other);
                            i += 1;
                        }
                    }
                }
                if !closed {
                    return Err(ParseError::new("unterminated quote", start));
                }
                let text = text.trim();
                if text.is_empty() {
                    return Err(ParseError::new("quoted term is empty", start));
                }
                tokens.push(Spanned {
                    token: Token::Word {
                        text: text.to_owned(),
                        quoted: true,
                    },
                    position: start,
                });
            }
            '-' | '+' => {
                if chars.get(i + 1).map_or(true, |next| next.is_whitespace()) {
                    return Err(ParseError::new(format!("'{c}' must be followed by a term"), start));
                }
                let token = if c == '-' { Token::Exclude } else { Token::Include };
                tokens.push(Spanned {
                    token,
                    position: start,
                });
                i += 1;
            }
            _ => {
                while i < chars.len() && !chars[i].is_whitespace() {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let token = if text == "OR" {
                    Token::Or
                } else {
                    Token::Word {
                        text,
                        quoted: false,
                    }
                };
                tokens.push(Spanned {
                    token,
                    position: start,
                });
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn position(&self) -> usize {
        self.peek().map_or(self.end, |t| t.position)
    }

    fn disjunction(&mut self) -> Result<Term, ParseError> {
        let mut terms = vec![self.conjunction()?];
        while let Some(Spanned {
            token: Token::Or,
            position,
        }) = self.peek()
        {
            let at = *position;
            self.pos += 1;
            if self.peek().is_none() {
                return Err(ParseError::new("OR must be followed by a term", at));
            }
            terms.push(self.conjunction()?);
        }
        Ok(collapse(terms, Term::Disjunction))
    }

    fn conjunction(&mut self) -> Result<Term, ParseError> {
        let mut terms = Vec::new();
        while let Some(spanned) = self.peek() {
            if matches!(spanned.token, Token::Or) {
                break;
            }
            terms.push(self.term()?);
        }
        if terms.is_empty() {
            return Err(ParseError::new("OR must be preceded by a term", self.position()));
        }
        Ok(collapse(terms, Term::Conjunction))
    }

    fn term(&mut self) -> Result<Term, ParseError> {
        let position = self.position();
        let prefix = self.peek().and_then(|spanned| match spanned.token {
            Token::Exclude => Some(true),
            Token::Include => Some(false),
            _ => None,
        });
        let excluded = prefix.unwrap_or(false);
        if prefix.is_some() {
            self.pos += 1;
        }
        let Some(Spanned {
            token: Token::Word { text, quoted },
            ..
        }) = self.tokens.get(self.pos)
        else {
            return Err(ParseError::new("prefix must be followed by a term", position));
        };
        let term = SimpleTerm {
            value: text.clone(),
            excluded,
            quoted: *quoted,
        };
        self.pos += 1;
        Ok(Term::Simple(term))
    }
}

fn collapse(mut terms: Vec<Term>, wrap: fn(CompoundTerm) -> Term) -> Term {
    if terms.len() == 1 {
        if let Some(term) = terms.pop() {
            return term;
        }
    }
    wrap(CompoundTerm { terms })
}
