//! Mount-relative paths and the containers they resolve to

use crate::error::{FsError, FsResult};
use std::fmt;
use std::str::FromStr;

/// Which container an object lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    /// The root channel; its objects show up at the top of the mount.
    Home,
    Container(String),
}

/// A path inside the mount. Only two levels exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorePath {
    Root,
    /// `/name`: a container or an object of the home container
    TopLevel(String),
    /// `/container/name`
    Nested { container: String, name: String },
}

impl StorePath {
    pub fn parse(path: &str) -> FsResult<Self> {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        match (segments.next(), segments.next(), segments.next()) {
            (None, _, _) => Ok(StorePath::Root),
            (Some(name), None, _) => Ok(StorePath::TopLevel(name.to_string())),
            (Some(container), Some(name), None) => Ok(StorePath::Nested {
                container: container.to_string(),
                name: name.to_string(),
            }),
            _ => Err(FsError::NotFound),
        }
    }

    /// The path of `name` inside this directory.
    pub fn child(&self, name: &str) -> FsResult<Self> {
        match self {
            StorePath::Root => Ok(StorePath::TopLevel(name.to_string())),
            StorePath::TopLevel(container) => Ok(StorePath::Nested {
                container: container.clone(),
                name: name.to_string(),
            }),
            StorePath::Nested { .. } => Err(FsError::NotFound),
        }
    }

    pub fn parent(&self) -> StorePath {
        match self {
            StorePath::Nested { container, .. } => StorePath::TopLevel(container.clone()),
            _ => StorePath::Root,
        }
    }

    /// Interpret the path as an object: its scope and its name.
    pub fn as_object(&self) -> Option<(Scope, &str)> {
        match self {
            StorePath::Root => None,
            StorePath::TopLevel(name) => Some((Scope::Home, name)),
            StorePath::Nested { container, name } => {
                Some((Scope::Container(container.clone()), name))
            }
        }
    }

    /// True if `self` is `ancestor` or lies below it.
    pub fn starts_with(&self, ancestor: &StorePath) -> bool {
        match (ancestor, self) {
            (StorePath::Root, _) => true,
            (StorePath::TopLevel(a), StorePath::TopLevel(b)) => a == b,
            (StorePath::TopLevel(a), StorePath::Nested { container, .. }) => a == container,
            (a, b) => a == b,
        }
    }
}

impl FromStr for StorePath {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StorePath::parse(s)
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorePath::Root => write!(f, "/"),
            StorePath::TopLevel(name) => write!(f, "/{}", name),
            StorePath::Nested { container, name } => write!(f, "/{}/{}", container, name),
        }
    }
}
