use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::{Error, Result};

/// A validated, filter-assigned cgroup identifier.
///
/// Cloning is cheap; the underlying string is shared.
///
/// # Examples
///
/// ```
/// # use cgroup_reader::cgroup::CgroupID;
/// let raw_id = "abc123abc123abc123abc123abc123abc123abc123abc123abc123abc123abcd";
/// let cgroup_id = CgroupID::new(raw_id).unwrap();
/// assert_eq!(cgroup_id.as_ref(), raw_id);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CgroupID(Arc<str>);

impl CgroupID {
    /// Creates a new `CgroupID` from the given raw id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCgroupID`] if the input is empty. Identifiers are opaque
    /// otherwise; path-based identifiers of deeply nested cgroups may be long.
    pub fn new(src: impl AsRef<str>) -> Result<Self> {
        let src = src.as_ref();
        if src.is_empty() {
            return Err(Error::InvalidCgroupID(src.to_owned()));
        }

        Ok(Self(src.into()))
    }
}

impl AsRef<str> for CgroupID {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CgroupID {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CgroupID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
