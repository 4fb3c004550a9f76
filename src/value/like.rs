use regex::Regex;

/// Compiled SQL `LIKE` pattern.
///
/// `%` matches any run of characters, `_` matches exactly one, and a
/// backslash makes the following character literal. Matching is anchored at
/// both ends and case sensitive.
#[derive(Clone, Debug)]
pub struct LikePattern {
    source: String,
    regex: Regex,
}

impl LikePattern {
    /// Compiles `pattern`.
    pub fn compile(pattern: &str) -> Result<Self, regex::Error> {
        let mut expr = String::with_capacity(pattern.len() + 8);
        expr.push_str("(?s)^");
        let mut chars = pattern.chars();
        let mut buf = [0u8; 4];
        while let Some(c) = chars.next() {
            match c {
                '%' => expr.push_str(".*"),
                '_' => expr.push('.'),
                '\\' => match chars.next() {
                    Some(escaped) => expr.push_str(&regex::escape(escaped.encode_utf8(&mut buf))),
                    None => expr.push_str(&regex::escape("\\")),
                },
                other => expr.push_str(&regex::escape(other.encode_utf8(&mut buf))),
            }
        }
        expr.push('$');
        Ok(Self {
            source: pattern.to_owned(),
            regex: Regex::new(&expr)?,
        })
    }

    /// Returns true when `pattern` contains no wildcard or escape and so can
    /// only ever match itself.
    pub fn is_literal(pattern: &str) -> bool {
        !pattern.contains(['%', '_', '\\'])
    }

    /// Original pattern text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Tests `candidate` against the pattern.
    pub fn matches(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }
}
