//! core::types
//!
//! Strong types for core catalog concepts.
//!
//! # Types
//!
//! - [`TableRef`] - Hierarchical path locating a doc part inside a document
//! - [`FieldType`] - Scalar type tag carried by fields and scalars
//! - [`FieldIndexOrdering`] - Sort direction of an index column
//! - [`Fingerprint`] - Content hash of a snapshot
//!
//! # Validation
//!
//! These types enforce validity at construction time. A `TableRef` parsed
//! from text can never contain an empty key or a key that would be confused
//! with an array step.
//!
//! # Examples
//!
//! ```
//! use docpart_catalog::core::types::TableRef;
//!
//! let root = TableRef::root();
//! let nested = root.child_object("address").child_array(1);
//!
//! assert_eq!(nested.to_string(), "address.$1");
//! assert_eq!(nested.parent(), Some(root.child_object("address")));
//! assert!(TableRef::parse("address..$1").is_err());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid table ref: {0}")]
    InvalidTableRef(String),

    #[error("unknown field type: {0}")]
    UnknownFieldType(String),
}

/// One step of a [`TableRef`] path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableRefStep {
    /// Descend into the sub-document stored under a key.
    Object(String),
    /// Descend into an array nested at the given dimension (1-based).
    Array(u32),
}

impl fmt::Display for TableRefStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableRefStep::Object(key) => write!(f, "{key}"),
            TableRefStep::Array(dimension) => write!(f, "${dimension}"),
        }
    }
}

/// Path of a doc part within the document structure.
///
/// The root doc part holds the top-level scalar fields of each document.
/// Sub-documents and arrays each get their own doc part whose table ref
/// extends the parent's path by one step.
///
/// Table refs are totally ordered: a parent always sorts before its
/// children, so iterating doc parts in table ref order visits parents first.
///
/// The textual form is `$root` for the root and the dot-joined steps
/// otherwise, with array steps written as `$<dimension>`:
///
/// ```
/// use docpart_catalog::core::types::TableRef;
///
/// let tr = TableRef::parse("items.$1.tags").unwrap();
/// assert_eq!(tr.depth(), 3);
/// assert_eq!(TableRef::parse("$root").unwrap(), TableRef::root());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableRef(Vec<TableRefStep>);

impl TableRef {
    /// Textual form of the root table ref.
    pub const ROOT: &'static str = "$root";

    /// The root table ref.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse the textual form of a table ref.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidTableRef` for empty steps, keys starting
    /// with `$` that are not array steps, or array dimension zero.
    pub fn parse(text: &str) -> Result<Self, TypeError> {
        if text == Self::ROOT {
            return Ok(Self::root());
        }
        if text.is_empty() {
            return Err(TypeError::InvalidTableRef(
                "table ref cannot be empty".into(),
            ));
        }

        let mut steps = Vec::new();
        for part in text.split('.') {
            if part.is_empty() {
                return Err(TypeError::InvalidTableRef(format!(
                    "empty step in '{text}'"
                )));
            }
            match part.strip_prefix('$') {
                Some(dimension) => {
                    let dimension: u32 = dimension.parse().map_err(|_| {
                        TypeError::InvalidTableRef(format!("bad array step '{part}' in '{text}'"))
                    })?;
                    if dimension == 0 {
                        return Err(TypeError::InvalidTableRef(format!(
                            "array dimension must start at 1 in '{text}'"
                        )));
                    }
                    steps.push(TableRefStep::Array(dimension));
                }
                None => steps.push(TableRefStep::Object(part.to_string())),
            }
        }
        Ok(Self(steps))
    }

    /// Extend this path with an object key.
    pub fn child_object(&self, key: impl Into<String>) -> Self {
        let mut steps = self.0.clone();
        steps.push(TableRefStep::Object(key.into()));
        Self(steps)
    }

    /// Extend this path with an array dimension.
    pub fn child_array(&self, dimension: u32) -> Self {
        let mut steps = self.0.clone();
        steps.push(TableRefStep::Array(dimension));
        Self(steps)
    }

    /// The enclosing table ref, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Whether this is the root table ref.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of steps from the root.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// The steps of this path, outermost first.
    pub fn steps(&self) -> &[TableRefStep] {
        &self.0
    }
}

impl TryFrom<String> for TableRef {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<TableRef> for String {
    fn from(tr: TableRef) -> Self {
        tr.to_string()
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str(Self::ROOT);
        }
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

/// Scalar type tag of a field or array scalar.
///
/// The catalog treats the tag as opaque: it only participates in sibling
/// uniqueness, since one field name may be stored in several typed columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    Binary,
    Boolean,
    Child,
    Date,
    Decimal128,
    Double,
    Instant,
    Integer,
    Javascript,
    JavascriptWithScope,
    Long,
    MaxKey,
    MinKey,
    MongoObjectId,
    MongoTimestamp,
    Null,
    String,
    Time,
}

impl FieldType {
    /// Smallest tag in declaration order.
    pub const MIN: FieldType = FieldType::Binary;

    /// Largest tag in declaration order.
    pub const MAX: FieldType = FieldType::Time;

    /// Every tag, in declaration order.
    pub const ALL: [FieldType; 18] = [
        FieldType::Binary,
        FieldType::Boolean,
        FieldType::Child,
        FieldType::Date,
        FieldType::Decimal128,
        FieldType::Double,
        FieldType::Instant,
        FieldType::Integer,
        FieldType::Javascript,
        FieldType::JavascriptWithScope,
        FieldType::Long,
        FieldType::MaxKey,
        FieldType::MinKey,
        FieldType::MongoObjectId,
        FieldType::MongoTimestamp,
        FieldType::Null,
        FieldType::String,
        FieldType::Time,
    ];

    /// Upper-case tag name, as used in dumps.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Binary => "BINARY",
            FieldType::Boolean => "BOOLEAN",
            FieldType::Child => "CHILD",
            FieldType::Date => "DATE",
            FieldType::Decimal128 => "DECIMAL128",
            FieldType::Double => "DOUBLE",
            FieldType::Instant => "INSTANT",
            FieldType::Integer => "INTEGER",
            FieldType::Javascript => "JAVASCRIPT",
            FieldType::JavascriptWithScope => "JAVASCRIPT_WITH_SCOPE",
            FieldType::Long => "LONG",
            FieldType::MaxKey => "MAX_KEY",
            FieldType::MinKey => "MIN_KEY",
            FieldType::MongoObjectId => "MONGO_OBJECT_ID",
            FieldType::MongoTimestamp => "MONGO_TIMESTAMP",
            FieldType::Null => "NULL",
            FieldType::String => "STRING",
            FieldType::Time => "TIME",
        }
    }
}

impl std::str::FromStr for FieldType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TypeError::UnknownFieldType(s.to_string()))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction of an index column or logical index field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldIndexOrdering {
    Asc,
    Desc,
}

impl FieldIndexOrdering {
    /// The opposite direction.
    pub fn reverse(self) -> Self {
        match self {
            FieldIndexOrdering::Asc => FieldIndexOrdering::Desc,
            FieldIndexOrdering::Desc => FieldIndexOrdering::Asc,
        }
    }
}

impl fmt::Display for FieldIndexOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldIndexOrdering::Asc => f.write_str("ASC"),
            FieldIndexOrdering::Desc => f.write_str("DESC"),
        }
    }
}

/// Content hash of a snapshot.
///
/// Two snapshots with equal content always produce equal fingerprints, which
/// makes the fingerprint a cheap way to compare versions across processes
/// (e.g. a loader checking that it rebuilt the catalog it expected).
///
/// # Example
///
/// ```
/// use docpart_catalog::core::types::Fingerprint;
///
/// let a = Fingerprint::compute(b"{\"databases\":[]}");
/// let b = Fingerprint::compute(b"{\"databases\":[]}");
/// assert_eq!(a, b);
/// assert_eq!(a.as_str().len(), 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hash a canonical byte encoding.
    pub fn compute(canonical: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(canonical);
        Self(hex::encode(hasher.finalize()))
    }

    /// Get the fingerprint as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
