//! Element keys
//!
//! A key tells siblings of the same element type apart. Two elements map onto the
//! same node only if their concrete types match and their keys are equal, where an
//! absent key only matches another absent key.
//!
//! ```ignore
//! // In a list - each item keeps its node when the list is reordered
//! let rows = items.iter().map(|item| Row::new(item).with_key(item.id)).collect();
//!
//! // Explicit name for a singleton child
//! let header = Header::new().with_key("header");
//! ```

use std::fmt;
use std::rc::Rc;

/// Identity discriminator among sibling elements of the same type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ElementKey {
    /// Numeric key, typically an index or a stable record id
    Index(i64),
    /// Named key
    Name(Rc<str>),
}

impl ElementKey {
    /// Create a named key
    pub fn name(name: impl AsRef<str>) -> Self {
        ElementKey::Name(Rc::from(name.as_ref()))
    }

    /// Create a numeric key
    pub fn index(index: i64) -> Self {
        ElementKey::Index(index)
    }
}

/// Compare two optional keys
#[inline]
pub fn keys_equal(a: Option<&ElementKey>, b: Option<&ElementKey>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKey::Index(index) => write!(f, "{index}"),
            ElementKey::Name(name) => f.write_str(name),
        }
    }
}

impl From<&str> for ElementKey {
    fn from(value: &str) -> Self {
        ElementKey::name(value)
    }
}

impl From<String> for ElementKey {
    fn from(value: String) -> Self {
        ElementKey::Name(Rc::from(value))
    }
}

impl From<i64> for ElementKey {
    fn from(value: i64) -> Self {
        ElementKey::Index(value)
    }
}

impl From<i32> for ElementKey {
    fn from(value: i32) -> Self {
        ElementKey::Index(i64::from(value))
    }
}

impl From<u32> for ElementKey {
    fn from(value: u32) -> Self {
        ElementKey::Index(i64::from(value))
    }
}

/// Values above `i64::MAX` become a named key holding the decimal digits.
impl From<usize> for ElementKey {
    fn from(value: usize) -> Self {
        i64::try_from(value)
            .map(ElementKey::Index)
            .unwrap_or_else(|_| ElementKey::name(value.to_string()))
    }
}
