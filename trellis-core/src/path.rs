use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::convert::Infallible;
use core::fmt;
use core::ops::Deref;
use core::str::FromStr;

/// An ordered list of name segments identifying a descendant relative to some
/// starting node.
///
/// Segments are field names for records, decimal indices for sequences and
/// keys for keyed collections. A path means nothing on its own: it is always
/// resolved against a particular node, one segment per level.
///
/// The textual form joins segments with `/`:
///
/// ```
/// # use trellis_core::Path;
/// let path = Path::parse("line/start/x");
/// assert_eq!(path.len(), 3);
/// assert_eq!(path.to_string(), "line/start/x");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path(Vec<String>);

impl Path {
    /// Separator used by the textual form.
    pub const SEPARATOR: char = '/';

    /// Returns the empty path, which always resolves to the starting node.
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Parses a `/`-delimited string.
    ///
    /// The empty string has no segments and a single trailing separator does
    /// not produce an empty last segment. Empty segments in the middle are
    /// kept, so `"a//b"` has three segments.
    pub fn parse(s: &str) -> Self {
        if s.is_empty() {
            return Self::new();
        }
        let s = s.strip_suffix(Self::SEPARATOR).unwrap_or(s);
        Self(s.split(Self::SEPARATOR).map(String::from).collect())
    }

    /// Returns the segments of this path.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Appends a segment at the end.
    pub fn push(&mut self, segment: impl Into<String>) {
        self.0.push(segment.into());
    }

    /// Inserts a segment at the front. Used while a change travels upward.
    pub fn prepend(&mut self, segment: impl Into<String>) {
        self.0.insert(0, segment.into());
    }

    /// Returns a new path with `segment` appended.
    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut path = self.clone();
        path.push(segment);
        path
    }

    /// Returns the path without its last segment, or `None` for the empty
    /// path.
    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.0.split_last()?;
        Some(Self(init.to_vec()))
    }

    /// Consumes the path and returns its segments.
    pub fn into_segments(self) -> Vec<String> {
        self.0
    }
}

impl Deref for Path {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", Self::SEPARATOR)?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<Vec<String>> for Path {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl<const N: usize> From<[&str; N]> for Path {
    fn from(segments: [&str; N]) -> Self {
        segments.into_iter().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for Path {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a String;
    type IntoIter = core::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl PartialEq<[&str]> for Path {
    fn eq(&self, other: &[&str]) -> bool {
        self.0.len() == other.len() && self.0.iter().zip(other).all(|(a, b)| a == b)
    }
}

impl<const N: usize> PartialEq<[&str; N]> for Path {
    fn eq(&self, other: &[&str; N]) -> bool {
        *self == other[..]
    }
}

pub(crate) fn index_segment(index: usize) -> String {
    index.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_testhelpers::test;

    #[test]
    fn parse_and_display() {
        let path = Path::parse("a/b/c");
        assert_eq!(path, ["a", "b", "c"]);
        assert_eq!(path.to_string(), "a/b/c");
    }

    #[test]
    fn parse_single_segment() {
        let path = Path::parse("hello");
        assert_eq!(path.len(), 1);
        assert_eq!(path[0], "hello");
    }

    #[test]
    fn parse_edge_cases() {
        assert!(Path::parse("").is_empty());
        assert_eq!(Path::parse("a/"), ["a"]);
        assert_eq!(Path::parse("/"), [""]);
        assert_eq!(Path::parse("a//b"), ["a", "", "b"]);
        assert_eq!(Path::parse("/a"), ["", "a"]);
    }

    #[test]
    fn round_trip() {
        let samples: &[&[&str]] = &[
            &[],
            &["x"],
            &["line", "start", "x"],
            &["points", "0", "y"],
            &["paths", "fabian", "finish"],
        ];
        for segments in samples {
            let path: Path = segments.iter().copied().collect();
            let reparsed: Path = path.to_string().parse()?;
            assert_eq!(reparsed, path);
        }
    }

    #[test]
    fn join_prepend_parent() {
        let mut path = Path::from(["b", "c"]);
        path.prepend("a");
        assert_eq!(path, ["a", "b", "c"]);
        assert_eq!(path.join("d"), ["a", "b", "c", "d"]);
        assert_eq!(path.parent(), Some(Path::from(["a", "b"])));
        assert_eq!(Path::new().parent(), None);
    }
}
