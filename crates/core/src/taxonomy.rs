//! Release taxonomy: which releases of an artist a caller asked for.
//!
//! The catalog reports two independent fields per release: the intrinsic
//! release kind (`album_type`) and how the release relates to the artist
//! (`album_group`). They disagree for compilations and guest appearances, so
//! `compilation` only looks at the type and `appears_on` only looks at the
//! group.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::{ReleaseGroup, ReleaseType};

/// A category of releases a caller can request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RequestedCategory {
    Album,
    Single,
    Compilation,
    AppearsOn,
}

impl RequestedCategory {
    /// All categories, in rule order.
    pub const ALL: [RequestedCategory; 4] = [
        RequestedCategory::Album,
        RequestedCategory::Single,
        RequestedCategory::Compilation,
        RequestedCategory::AppearsOn,
    ];

    /// Token used in comma-separated category lists.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestedCategory::Album => "album",
            RequestedCategory::Single => "single",
            RequestedCategory::Compilation => "compilation",
            RequestedCategory::AppearsOn => "appears_on",
        }
    }

    /// Whether a release with the given type/group pair belongs to this category.
    pub fn admits(&self, declared_type: ReleaseType, declared_group: ReleaseGroup) -> bool {
        match self {
            RequestedCategory::Album => {
                declared_type == ReleaseType::Album && declared_group == ReleaseGroup::Album
            }
            RequestedCategory::Single => {
                declared_type == ReleaseType::Single && declared_group == ReleaseGroup::Single
            }
            RequestedCategory::Compilation => declared_type == ReleaseType::Compilation,
            RequestedCategory::AppearsOn => declared_group == ReleaseGroup::AppearsOn,
        }
    }
}

impl fmt::Display for RequestedCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a token that names no known category.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown release category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for RequestedCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "album" => Ok(RequestedCategory::Album),
            "single" => Ok(RequestedCategory::Single),
            "compilation" => Ok(RequestedCategory::Compilation),
            "appears_on" => Ok(RequestedCategory::AppearsOn),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

/// Ordered, duplicate-free set of requested categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestedCategorySet(Vec<RequestedCategory>);

impl RequestedCategorySet {
    /// Empty set; admits nothing.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Every category.
    pub fn all() -> Self {
        Self(RequestedCategory::ALL.to_vec())
    }

    /// Categories used for artist downloads when the caller names none.
    pub fn default_download() -> Self {
        Self(vec![
            RequestedCategory::Album,
            RequestedCategory::Single,
            RequestedCategory::Compilation,
        ])
    }

    /// Parse a comma-separated list such as `"Album, single,,appears_on"`.
    ///
    /// Tokens are trimmed and lowercased. Empty and unknown tokens are
    /// dropped; repeated tokens keep their first position.
    pub fn parse(input: &str) -> Self {
        let mut set = Self::empty();
        for token in input.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            match token.parse::<RequestedCategory>() {
                Ok(category) => set.insert(category),
                Err(e) => warn!("Ignoring {}", e),
            }
        }
        set
    }

    /// Add a category unless already present.
    pub fn insert(&mut self, category: RequestedCategory) {
        if !self.0.contains(&category) {
            self.0.push(category);
        }
    }

    pub fn contains(&self, category: RequestedCategory) -> bool {
        self.0.contains(&category)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = RequestedCategory> + '_ {
        self.0.iter().copied()
    }
}

impl fmt::Display for RequestedCategorySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens: Vec<&str> = self.0.iter().map(|c| c.as_str()).collect();
        f.write_str(&tokens.join(","))
    }
}

/// The first requested category (in rule order) that admits the release.
pub fn matched_category(
    declared_type: ReleaseType,
    declared_group: ReleaseGroup,
    requested: &RequestedCategorySet,
) -> Option<RequestedCategory> {
    RequestedCategory::ALL
        .into_iter()
        .filter(|c| requested.contains(*c))
        .find(|c| c.admits(declared_type, declared_group))
}

/// Whether any requested category admits the release.
pub fn classify(
    declared_type: ReleaseType,
    declared_group: ReleaseGroup,
    requested: &RequestedCategorySet,
) -> bool {
    matched_category(declared_type, declared_group, requested).is_some()
}
