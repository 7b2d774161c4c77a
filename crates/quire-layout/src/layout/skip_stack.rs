//! Resume positions for fragmented layout.
//!
//! [§ 4 Rules for Breaking](https://www.w3.org/TR/css-break-3/#breaking-rules)
//!
//! When a box does not fit in the current fragmentainer, layout records
//! where it stopped as a path of child indices from the box down to the
//! deepest fragmented descendant. The next page starts from that path.
//! For text boxes the last index is a byte offset into the text.

use std::fmt;
use std::rc::Rc;

#[derive(Debug, PartialEq, Eq, Hash)]
struct Node {
    index: usize,
    nested: Option<SkipStack>,
}

/// An immutable path of child indices ("skip stack").
///
/// `SkipStack::new(2, Some(SkipStack::leaf(0)))` reads as "resume in child
/// 2, and inside it, resume at child 0". Cloning is cheap: the path is a
/// shared cons-list.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SkipStack(Rc<Node>);

impl SkipStack {
    /// A path step into child `index`, continuing with `nested`.
    #[must_use]
    pub fn new(index: usize, nested: Option<Self>) -> Self {
        Self(Rc::new(Node { index, nested }))
    }

    /// A path that resumes at child `index` from its start.
    #[must_use]
    pub fn leaf(index: usize) -> Self {
        Self::new(index, None)
    }

    /// Build a path from a slice of indices, outermost first.
    ///
    /// Returns `None` for an empty slice.
    #[must_use]
    pub fn from_path(path: &[usize]) -> Option<Self> {
        path.iter()
            .rev()
            .fold(None, |nested, &index| Some(Self::new(index, nested)))
    }

    /// The child index at this level.
    #[must_use]
    pub fn index(&self) -> usize {
        self.0.index
    }

    /// The resume position inside the child, if any.
    #[must_use]
    pub fn nested(&self) -> Option<&Self> {
        self.0.nested.as_ref()
    }

    /// The full path of indices, outermost first.
    #[must_use]
    pub fn path(&self) -> Vec<usize> {
        let mut out = vec![self.index()];
        let mut current = self.nested();
        while let Some(stack) = current {
            out.push(stack.index());
            current = stack.nested();
        }
        out
    }

    /// Depth of the path (number of indices).
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self.nested().map_or(0, Self::depth)
    }

    /// Whether `prefix` is a prefix of this path.
    ///
    /// Used when searching backwards for an earlier break point: a candidate
    /// break that starts with the current one lies inside the same child.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        if self.index() != prefix.index() {
            return false;
        }
        match (self.nested(), prefix.nested()) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(ours), Some(theirs)) => ours.starts_with(theirs),
        }
    }

    /// Split an optional stack into the index to start from and the nested
    /// stack for that first child.
    #[must_use]
    pub fn split(stack: Option<&Self>) -> (usize, Option<Self>) {
        stack.map_or((0, None), |s| (s.index(), s.nested().cloned()))
    }
}

impl fmt::Display for SkipStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())?;
        if let Some(nested) = self.nested() {
            write!(f, "/{nested}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for SkipStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SkipStack({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_path() {
        let stack = SkipStack::new(2, Some(SkipStack::new(0, Some(SkipStack::leaf(15)))));
        assert_eq!(stack.to_string(), "2/0/15");
        assert_eq!(stack.path(), vec![2, 0, 15]);
        assert_eq!(stack.depth(), 3);
    }

    #[test]
    fn test_split_none_starts_at_zero() {
        assert_eq!(SkipStack::split(None), (0, None));
    }
}
