//! The closed program catalog: which majors and minors exist, which courses
//! each contributes, and the fixed breadth list.

use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, Serialize};
use shared::{
    domain::{Course, ProgramId, MAX_COURSE_NAME_CHARS},
    error::{Classified, ErrorCode},
};
use thiserror::Error;
use tracing::info;

pub mod resolver;
pub mod selection;

pub use resolver::{resolve, OriginIndex, ResolvedCatalog};
pub use selection::{ProgramSelection, SelectionError};

const BUILTIN_CATALOG: &str = include_str!("../data/programs.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("catalog data is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("catalog defines no majors")]
    NoMajors,
    #[error("catalog program {program} lists invalid course {course:?}")]
    InvalidCourse { program: String, course: String },
}

impl Classified for CatalogError {
    fn code(&self) -> ErrorCode {
        ErrorCode::Validation
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub title: String,
    pub link: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Major {
    pub name: String,
    #[serde(default)]
    pub lower_divs: Vec<Course>,
    #[serde(default)]
    pub upper_divs: Vec<Course>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Minor {
    pub name: String,
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgramResources {
    pub program: ProgramId,
    pub name: String,
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgramCatalog {
    majors: BTreeMap<ProgramId, Major>,
    #[serde(default)]
    minors: BTreeMap<ProgramId, Minor>,
    #[serde(default)]
    breadths: Vec<Course>,
}

impl ProgramCatalog {
    /// The catalog compiled into the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_json(&raw)?;
        info!(path = %path.display(), majors = catalog.majors.len(), "loaded program catalog");
        Ok(catalog)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let catalog: ProgramCatalog = serde_json::from_str(raw)?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.majors.is_empty() {
            return Err(CatalogError::NoMajors);
        }

        let major_courses = self.majors.iter().flat_map(|(id, major)| {
            major
                .lower_divs
                .iter()
                .chain(major.upper_divs.iter())
                .map(move |course| (id.as_str(), course))
        });
        let minor_courses = self
            .minors
            .iter()
            .flat_map(|(id, minor)| minor.courses.iter().map(move |course| (id.as_str(), course)));
        let breadth_courses = self.breadths.iter().map(|course| ("breadth", course));

        for (program, course) in major_courses.chain(minor_courses).chain(breadth_courses) {
            let text = course.as_str();
            if text.trim().is_empty() || text.chars().count() > MAX_COURSE_NAME_CHARS {
                return Err(CatalogError::InvalidCourse {
                    program: program.to_string(),
                    course: text.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn sorted_majors(&self) -> Vec<ProgramId> {
        self.majors.keys().cloned().collect()
    }

    pub fn sorted_minors(&self) -> Vec<ProgramId> {
        self.minors.keys().cloned().collect()
    }

    pub fn major(&self, id: &ProgramId) -> Option<&Major> {
        self.majors.get(id)
    }

    pub fn minor(&self, id: &ProgramId) -> Option<&Minor> {
        self.minors.get(id)
    }

    pub fn is_major(&self, id: &ProgramId) -> bool {
        self.majors.contains_key(id)
    }

    pub fn is_minor(&self, id: &ProgramId) -> bool {
        self.minors.contains_key(id)
    }

    pub fn breadths(&self) -> &[Course] {
        &self.breadths
    }

    /// First major in sorted order; `validate` guarantees there is one.
    pub fn default_primary(&self) -> ProgramId {
        self.majors
            .keys()
            .next()
            .cloned()
            .unwrap_or_else(|| ProgramId::new(""))
    }

    /// Resources for each selected program, majors first, in selection order.
    pub fn resources(&self, selection: &ProgramSelection) -> Vec<ProgramResources> {
        let majors = selection.primaries().iter().filter_map(|id| {
            self.major(id).map(|major| ProgramResources {
                program: id.clone(),
                name: major.name.clone(),
                resources: major.resources.clone(),
            })
        });
        let minors = selection.secondaries().iter().filter_map(|id| {
            self.minor(id).map(|minor| ProgramResources {
                program: id.clone(),
                name: minor.name.clone(),
                resources: minor.resources.clone(),
            })
        });
        majors.chain(minors).collect()
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
