use std::fmt;

/// Name with an optional namespace prefix, e.g. `jcr:primaryType`.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Name {
    prefix: String,
    local: String,
}

impl Name {
    /// Creates a name from its parts. The local part must be non-empty.
    pub fn new(prefix: impl Into<String>, local: impl Into<String>) -> Option<Self> {
        let prefix = prefix.into();
        let local = local.into();
        if local.is_empty() || !valid_part(&local) || !valid_part(&prefix) || prefix.contains(':')
        {
            return None;
        }
        Some(Self { prefix, local })
    }

    /// Parses `prefix:local` or a bare `local`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        match text.split_once(':') {
            Some((prefix, local)) => Self::new(prefix, local),
            None => Self::new("", text),
        }
    }

    /// Namespace prefix, empty when unqualified.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Local part.
    pub fn local_name(&self) -> &str {
        &self.local
    }
}

fn valid_part(part: &str) -> bool {
    !part.contains(['/', '[', ']', '|', '*']) && !part.chars().any(char::is_whitespace)
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix.is_empty() {
            f.write_str(&self.local)
        } else {
            write!(f, "{}:{}", self.prefix, self.local)
        }
    }
}
