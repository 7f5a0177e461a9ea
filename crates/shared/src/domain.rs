use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_PRIMARY_PROGRAMS: usize = 2;
pub const MAX_SECONDARY_PROGRAMS: usize = 2;
pub const MAX_TERM_SLOT_COURSES: usize = 10;
pub const MAX_COURSE_NAME_CHARS: usize = 20;

macro_rules! text_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

text_newtype!(Course);
text_newtype!(ProgramId);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CourseTextError {
    #[error("course name is empty")]
    Empty,
    #[error("course name contains unsupported character {0:?}")]
    InvalidCharacter(char),
    #[error("course name is {actual} characters long, the limit is {max}")]
    TooLong { actual: usize, max: usize },
}

impl Course {
    /// Canonical form of user-typed text: trimmed, upper-cased, inner
    /// whitespace collapsed to one space. Only ASCII letters, digits and
    /// spaces are accepted.
    pub fn canonicalize(raw: &str) -> Result<Self, CourseTextError> {
        if let Some(bad) = raw
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && !c.is_whitespace())
        {
            return Err(CourseTextError::InvalidCharacter(bad));
        }

        let canonical = raw
            .split_whitespace()
            .map(str::to_ascii_uppercase)
            .collect::<Vec<_>>()
            .join(" ");

        if canonical.is_empty() {
            return Err(CourseTextError::Empty);
        }
        let len = canonical.chars().count();
        if len > MAX_COURSE_NAME_CHARS {
            return Err(CourseTextError::TooLong {
                actual: len,
                max: MAX_COURSE_NAME_CHARS,
            });
        }
        Ok(Self(canonical))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogPartition {
    LowerDivision,
    UpperDivision,
    Breadth,
    SecondaryCourses,
}

impl CatalogPartition {
    pub const ALL: [CatalogPartition; 4] = [
        CatalogPartition::LowerDivision,
        CatalogPartition::UpperDivision,
        CatalogPartition::Breadth,
        CatalogPartition::SecondaryCourses,
    ];

    pub fn index(self) -> usize {
        match self {
            CatalogPartition::LowerDivision => 0,
            CatalogPartition::UpperDivision => 1,
            CatalogPartition::Breadth => 2,
            CatalogPartition::SecondaryCourses => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CatalogPartition::LowerDivision => "lower_division",
            CatalogPartition::UpperDivision => "upper_division",
            CatalogPartition::Breadth => "breadth",
            CatalogPartition::SecondaryCourses => "secondary_courses",
        }
    }
}

/// Fall and spring terms of four academic years, in calendar order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TermSlot {
    #[serde(rename = "fa1")]
    Fall1,
    #[serde(rename = "sp1")]
    Spring1,
    #[serde(rename = "fa2")]
    Fall2,
    #[serde(rename = "sp2")]
    Spring2,
    #[serde(rename = "fa3")]
    Fall3,
    #[serde(rename = "sp3")]
    Spring3,
    #[serde(rename = "fa4")]
    Fall4,
    #[serde(rename = "sp4")]
    Spring4,
}

impl TermSlot {
    pub const ALL: [TermSlot; 8] = [
        TermSlot::Fall1,
        TermSlot::Spring1,
        TermSlot::Fall2,
        TermSlot::Spring2,
        TermSlot::Fall3,
        TermSlot::Spring3,
        TermSlot::Fall4,
        TermSlot::Spring4,
    ];

    pub fn index(self) -> usize {
        match self {
            TermSlot::Fall1 => 0,
            TermSlot::Spring1 => 1,
            TermSlot::Fall2 => 2,
            TermSlot::Spring2 => 3,
            TermSlot::Fall3 => 4,
            TermSlot::Spring3 => 5,
            TermSlot::Fall4 => 6,
            TermSlot::Spring4 => 7,
        }
    }

    /// Wire name used by the link and document formats.
    pub fn key(self) -> &'static str {
        match self {
            TermSlot::Fall1 => "fa1",
            TermSlot::Spring1 => "sp1",
            TermSlot::Fall2 => "fa2",
            TermSlot::Spring2 => "sp2",
            TermSlot::Fall3 => "fa3",
            TermSlot::Spring3 => "sp3",
            TermSlot::Fall4 => "fa4",
            TermSlot::Spring4 => "sp4",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        TermSlot::ALL.into_iter().find(|slot| slot.key() == key)
    }
}

/// One of the twelve containers a course can sit in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ContainerId {
    Catalog(CatalogPartition),
    Term(TermSlot),
}

impl ContainerId {
    pub const ALL: [ContainerId; 12] = [
        ContainerId::Catalog(CatalogPartition::LowerDivision),
        ContainerId::Catalog(CatalogPartition::UpperDivision),
        ContainerId::Catalog(CatalogPartition::Breadth),
        ContainerId::Catalog(CatalogPartition::SecondaryCourses),
        ContainerId::Term(TermSlot::Fall1),
        ContainerId::Term(TermSlot::Spring1),
        ContainerId::Term(TermSlot::Fall2),
        ContainerId::Term(TermSlot::Spring2),
        ContainerId::Term(TermSlot::Fall3),
        ContainerId::Term(TermSlot::Spring3),
        ContainerId::Term(TermSlot::Fall4),
        ContainerId::Term(TermSlot::Spring4),
    ];

    pub fn is_catalog_partition(self) -> bool {
        matches!(self, ContainerId::Catalog(_))
    }

    pub fn as_partition(self) -> Option<CatalogPartition> {
        match self {
            ContainerId::Catalog(partition) => Some(partition),
            ContainerId::Term(_) => None,
        }
    }

    pub fn as_term(self) -> Option<TermSlot> {
        match self {
            ContainerId::Term(slot) => Some(slot),
            ContainerId::Catalog(_) => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ContainerId::Catalog(partition) => partition.label(),
            ContainerId::Term(slot) => slot.key(),
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        ContainerId::ALL
            .into_iter()
            .find(|container| container.label() == label)
    }
}

impl fmt::Display for CatalogPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for TermSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl From<CatalogPartition> for ContainerId {
    fn from(value: CatalogPartition) -> Self {
        ContainerId::Catalog(value)
    }
}

impl From<TermSlot> for ContainerId {
    fn from(value: TermSlot) -> Self {
        ContainerId::Term(value)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
