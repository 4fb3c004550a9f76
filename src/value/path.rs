use std::cmp::Ordering;
use std::fmt;

/// One segment of a [`Path`]: a name plus a same-name-sibling index (1-based).
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PathSegment {
    name: String,
    index: u32,
}

impl PathSegment {
    /// Creates a segment with the default index of 1.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: 1,
        }
    }

    /// Creates a segment with an explicit same-name-sibling index.
    pub fn with_index(name: impl Into<String>, index: u32) -> Self {
        Self {
            name: name.into(),
            index: index.max(1),
        }
    }

    /// Segment name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Same-name-sibling index.
    pub fn index(&self) -> u32 {
        self.index
    }

    fn parse(text: &str) -> Option<Self> {
        if text.is_empty() {
            return None;
        }
        let Some(open) = text.find('[') else {
            return valid_name(text).then(|| Self::new(text));
        };
        let name = &text[..open];
        let index = text[open + 1..].strip_suffix(']')?.parse::<u32>().ok()?;
        if index == 0 || !valid_name(name) {
            return None;
        }
        Some(Self::with_index(name, index))
    }
}

fn valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '[', ']', '|', '*'])
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.index > 1 {
            write!(f, "{}[{}]", self.name, self.index)
        } else {
            f.write_str(&self.name)
        }
    }
}

/// Absolute or relative repository path.
///
/// Paths order segment by segment, so a parent sorts before its children.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Path {
    absolute: bool,
    segments: Vec<PathSegment>,
}

impl Path {
    /// The root path `/`.
    pub fn root() -> Self {
        Self {
            absolute: true,
            segments: Vec::new(),
        }
    }

    /// Builds a path from segments.
    pub fn new(absolute: bool, segments: Vec<PathSegment>) -> Self {
        Self { absolute, segments }
    }

    /// Parses `/a/b[2]/c` (absolute) or `a/b` (relative).
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let (absolute, body) = match text.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let body = body.strip_suffix('/').unwrap_or(body);
        if body.is_empty() {
            return absolute.then(Self::root);
        }
        let segments = body
            .split('/')
            .map(PathSegment::parse)
            .collect::<Option<Vec<_>>>()?;
        Some(Self { absolute, segments })
    }

    /// Returns true when the path starts at the root.
    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// Returns true for `/`.
    pub fn is_root(&self) -> bool {
        self.absolute && self.segments.is_empty()
    }

    /// Segments from the root down.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Number of segments; the root has depth 0.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Final segment, absent for the root.
    pub fn last_segment(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// Parent path, absent for the root and for empty relative paths.
    pub fn parent(&self) -> Option<Path> {
        let (_, rest) = self.segments.split_last()?;
        Some(Self {
            absolute: self.absolute,
            segments: rest.to_vec(),
        })
    }

    /// Returns true when `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        self.absolute == other.absolute
            && self.segments.len() < other.segments.len()
            && other.segments.starts_with(&self.segments)
    }

    /// Returns true when `self` is a strict descendant of `other`.
    pub fn is_descendant_of(&self, other: &Path) -> bool {
        other.is_ancestor_of(self)
    }
}

impl Ord for Path {
    fn cmp(&self, other: &Self) -> Ordering {
        self.segments
            .cmp(&other.segments)
            .then_with(|| other.absolute.cmp(&self.absolute))
    }
}

impl PartialOrd for Path {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("/");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 || self.absolute {
                f.write_str("/")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}
