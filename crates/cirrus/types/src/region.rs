//! Scope addressing
//!
//! Callers name deployment scopes as regions of the form
//! `"<organization> > <space>"`. A [`Region`] is the parsed, still-unresolved
//! name; a [`Scope`] is a region the remote directory has resolved to an id.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::ScopeId;

/// Separator between organization and space in a region string.
pub const REGION_SEPARATOR: &str = " > ";

fn default_separator() -> String {
    REGION_SEPARATOR.to_string()
}

/// An unresolved `org > space` region name.
///
/// The separator a region was parsed with is kept so it renders back the
/// way the caller wrote it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Region {
    pub organization: String,
    pub space: String,
    #[serde(skip, default = "default_separator")]
    separator: String,
}

impl Region {
    pub fn new(organization: impl Into<String>, space: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            space: space.into(),
            separator: default_separator(),
        }
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Parse a region using the default separator.
    pub fn parse(region: &str) -> Option<Self> {
        Self::parse_with(region, REGION_SEPARATOR)
    }

    /// Parse a region using a custom separator.
    ///
    /// Both halves must be non-blank after trimming.
    pub fn parse_with(region: &str, separator: &str) -> Option<Self> {
        let separator = if separator.is_empty() {
            REGION_SEPARATOR
        } else {
            separator
        };
        let (organization, space) = region.split_once(separator)?;
        let organization = organization.trim();
        let space = space.trim();
        if organization.is_empty() || space.is_empty() {
            return None;
        }
        Some(Self {
            organization: organization.to_string(),
            space: space.to_string(),
            separator: separator.to_string(),
        })
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.organization, self.separator, self.space)
    }
}

/// A region resolved to a concrete remote scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub id: ScopeId,
    pub region: Region,
}

impl Scope {
    pub fn new(id: impl Into<ScopeId>, region: Region) -> Self {
        Self {
            id: id.into(),
            region,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.region, self.id)
    }
}
