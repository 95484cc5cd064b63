//! Symbolic command identifiers.

use std::{borrow::Borrow, fmt};

use serde::Deserialize;

/// Stable identifier naming a command or an alias, e.g. `ping`.
///
/// Slugs are compared by value. `Borrow<str>` lets maps keyed by [`Slug`]
/// be queried with a plain `&str`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    pub fn new(slug: impl Into<String>) -> Self {
        Slug(slug.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Slug {
    fn from(slug: &str) -> Self {
        Slug::new(slug)
    }
}

impl Borrow<str> for Slug {
    fn borrow(&self) -> &str {
        &self.0
    }
}
