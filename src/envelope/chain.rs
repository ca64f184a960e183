//! Append-only request chain identifiers.
//!
//! A chain identifier is a root segment followed by zero or more task
//! segments. Every component that issues a correlated sub-request derives a
//! child identifier by appending one fresh task segment, so the full chain
//! traces a reply back to the external request that caused it. On the wire the
//! segments are joined with `:` (`user-ab12:task-f3a9c01d22e4`).

use super::EnvelopeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Separator between chain segments in the wire representation.
const SEPARATOR: char = ':';

/// Number of hex characters taken from a v4 UUID for generated segments.
const TOKEN_LENGTH: usize = 12;

/// One opaque segment of a [`ChainId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainSegment(String);

impl ChainSegment {
    /// Creates a validated segment.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::InvalidChainSegment`] when the value is empty
    /// or contains the `:` separator.
    pub fn new(value: impl Into<String>) -> Result<Self, EnvelopeError> {
        let text = value.into();
        if text.is_empty() || text.contains(SEPARATOR) {
            return Err(EnvelopeError::InvalidChainSegment(text));
        }
        Ok(Self(text))
    }

    /// Generates a random segment of the form `<prefix>-<12 hex chars>`.
    fn generate(prefix: &str) -> Self {
        let token = Uuid::new_v4().simple().to_string();
        let short = token.get(..TOKEN_LENGTH).unwrap_or(token.as_str());
        Self(format!("{prefix}-{short}"))
    }

    /// Returns the segment text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hierarchical, append-only request identifier.
///
/// # Examples
///
/// ```
/// use courier::envelope::ChainId;
///
/// let root = ChainId::parse("user-1").expect("valid id");
/// let child = root.child();
/// assert!(child.to_string().starts_with("user-1:task-"));
/// assert!(child.is_descendant_of(&root));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChainId {
    root: ChainSegment,
    tasks: Vec<ChainSegment>,
}

impl ChainId {
    /// Creates a chain containing only a root segment.
    #[must_use]
    pub const fn from_root(root: ChainSegment) -> Self {
        Self {
            root,
            tasks: Vec::new(),
        }
    }

    /// Generates a fresh root chain of the form `<prefix>-<12 hex chars>`.
    ///
    /// An empty prefix or one containing `:` falls back to `req`.
    #[must_use]
    pub fn generate(prefix: &str) -> Self {
        let root_prefix = if prefix.is_empty() || prefix.contains(SEPARATOR) {
            "req"
        } else {
            prefix
        };
        Self::from_root(ChainSegment::generate(root_prefix))
    }

    /// Parses the `:`-delimited wire form.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::InvalidChainSegment`] when the input is empty
    /// or any segment between separators is empty.
    pub fn parse(raw: &str) -> Result<Self, EnvelopeError> {
        let mut parts = raw.split(SEPARATOR);
        let root = ChainSegment::new(parts.next().unwrap_or_default())?;
        let tasks = parts
            .map(ChainSegment::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { root, tasks })
    }

    /// Returns a new chain with one freshly generated task segment appended.
    #[must_use]
    pub fn child(&self) -> Self {
        self.with_segment(ChainSegment::generate("task"))
    }

    /// Returns a new chain with `segment` appended.
    #[must_use]
    pub fn with_segment(&self, segment: ChainSegment) -> Self {
        let mut tasks = self.tasks.clone();
        tasks.push(segment);
        Self {
            root: self.root.clone(),
            tasks,
        }
    }

    /// Returns the root segment that identifies the originating request.
    #[must_use]
    pub const fn root(&self) -> &ChainSegment {
        &self.root
    }

    /// Returns the chain containing only the root segment.
    #[must_use]
    pub fn root_chain(&self) -> Self {
        Self::from_root(self.root.clone())
    }

    /// Returns the appended task segments in order.
    #[must_use]
    pub fn tasks(&self) -> &[ChainSegment] {
        &self.tasks
    }

    /// Returns the number of task segments appended to the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.tasks.len()
    }

    /// Returns the chain this one was derived from, if any.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let (_, parent_tasks) = self.tasks.split_last()?;
        Some(Self {
            root: self.root.clone(),
            tasks: parent_tasks.to_vec(),
        })
    }

    /// Returns whether `self` was derived from `ancestor` by appending one or
    /// more segments.
    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &Self) -> bool {
        self.root == ancestor.root
            && self.tasks.len() > ancestor.tasks.len()
            && self.tasks.starts_with(&ancestor.tasks)
    }
}

impl TryFrom<String> for ChainId {
    type Error = EnvelopeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ChainId> for String {
    fn from(id: ChainId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.root.as_str())?;
        for task in &self.tasks {
            write!(f, "{SEPARATOR}{task}")?;
        }
        Ok(())
    }
}
