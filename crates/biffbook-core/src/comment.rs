//! Cell comments (notes)
//!
//! Comments are kept per sheet and looked up by position. Authors are pooled
//! in first-seen order, the way NOTE records refer to them.

use std::collections::BTreeMap;

/// A cell comment/note
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellComment {
    /// Author of the comment
    pub author: String,
    /// Comment text content
    pub text: String,
    /// Whether the comment box is visible by default
    pub visible: bool,
}

impl CellComment {
    /// Create a new comment with the given author and text
    ///
    /// ```rust
    /// use biffbook_core::CellComment;
    ///
    /// let comment = CellComment::new("John Doe", "Review this value");
    /// assert_eq!(comment.author, "John Doe");
    /// assert!(!comment.visible);
    /// ```
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
            visible: false,
        }
    }

    /// Set whether the comment is visible by default
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Check if this comment has an author
    pub fn has_author(&self) -> bool {
        !self.author.is_empty()
    }
}

impl std::fmt::Display for CellComment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.has_author() {
            write!(f, "[{}]: {}", self.author, self.text)
        } else {
            write!(f, "{}", self.text)
        }
    }
}

/// Comments of one sheet, keyed by (row, column)
#[derive(Debug, Clone, Default)]
pub struct CommentRegistry {
    comments: BTreeMap<(u32, u16), CellComment>,
    authors: Vec<String>,
}

impl CommentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a comment to a cell, replacing any existing one
    pub fn set(&mut self, row: u32, col: u16, comment: CellComment) -> Option<CellComment> {
        if comment.has_author() && !self.authors.iter().any(|a| *a == comment.author) {
            self.authors.push(comment.author.clone());
        }
        self.comments.insert((row, col), comment)
    }

    pub fn get(&self, row: u32, col: u16) -> Option<&CellComment> {
        self.comments.get(&(row, col))
    }

    pub fn get_mut(&mut self, row: u32, col: u16) -> Option<&mut CellComment> {
        self.comments.get_mut(&(row, col))
    }

    pub fn remove(&mut self, row: u32, col: u16) -> Option<CellComment> {
        self.comments.remove(&(row, col))
    }

    /// Distinct authors, in the order they were first seen
    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    /// Position of an author in the author list
    pub fn author_index(&self, author: &str) -> Option<usize> {
        self.authors.iter().position(|a| a == author)
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    /// Comments in row-major order
    pub fn iter(&self) -> impl Iterator<Item = ((u32, u16), &CellComment)> {
        self.comments.iter().map(|(k, c)| (*k, c))
    }

    /// Detach every comment anchored in rows `first..=last`
    pub(crate) fn take_rows(&mut self, first: u32, last: u32) -> Vec<((u32, u16), CellComment)> {
        let keys: Vec<_> = self
            .comments
            .range((first, 0)..=(last, u16::MAX))
            .map(|(k, _)| *k)
            .collect();
        keys.into_iter()
            .filter_map(|k| self.comments.remove(&k).map(|c| (k, c)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let with_author = CellComment::new("John", "Hello");
        assert_eq!(format!("{}", with_author), "[John]: Hello");

        let without_author = CellComment::new("", "Hello");
        assert_eq!(format!("{}", without_author), "Hello");
    }

    #[test]
    fn test_author_pool() {
        let mut comments = CommentRegistry::new();
        comments.set(0, 0, CellComment::new("Ann", "a"));
        comments.set(1, 0, CellComment::new("Bob", "b"));
        comments.set(2, 0, CellComment::new("Ann", "c").with_visible(true));

        assert_eq!(comments.authors(), &["Ann".to_string(), "Bob".to_string()]);
        assert_eq!(comments.author_index("Bob"), Some(1));
        assert!(comments.get(2, 0).unwrap().visible);
    }

    #[test]
    fn test_take_rows() {
        let mut comments = CommentRegistry::new();
        for row in 0..5 {
            comments.set(row, 3, CellComment::new("", format!("r{row}")));
        }
        let taken = comments.take_rows(1, 2);
        assert_eq!(taken.len(), 2);
        assert_eq!(taken[0].0, (1, 3));
        assert_eq!(comments.len(), 3);
        assert!(comments.get(1, 3).is_none());
    }
}
