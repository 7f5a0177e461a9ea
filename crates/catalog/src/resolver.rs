use std::collections::{BTreeSet, HashMap};

use shared::domain::{CatalogPartition, Course};

use crate::{ProgramCatalog, ProgramSelection};

/// Course -> the one partition it belongs to under the current selection.
/// A course with no entry is custom.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginIndex(HashMap<Course, CatalogPartition>);

impl OriginIndex {
    pub fn origin(&self, course: &Course) -> Option<CatalogPartition> {
        self.0.get(course).copied()
    }

    pub fn contains(&self, course: &Course) -> bool {
        self.0.contains_key(course)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Course, CatalogPartition)> + '_ {
        self.0.iter().map(|(course, partition)| (course, *partition))
    }

    fn claim(&mut self, courses: &BTreeSet<Course>, partition: CatalogPartition) {
        for course in courses {
            self.0.entry(course.clone()).or_insert(partition);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedCatalog {
    pub lower_div: Vec<Course>,
    pub upper_div: Vec<Course>,
    pub breadth: Vec<Course>,
    pub secondary_courses: Vec<Course>,
    pub origin: OriginIndex,
}

impl ResolvedCatalog {
    pub fn partition(&self, partition: CatalogPartition) -> &[Course] {
        match partition {
            CatalogPartition::LowerDivision => &self.lower_div,
            CatalogPartition::UpperDivision => &self.upper_div,
            CatalogPartition::Breadth => &self.breadth,
            CatalogPartition::SecondaryCourses => &self.secondary_courses,
        }
    }
}

/// Splits the selected programs' courses into four disjoint sorted
/// partitions. A course claimed by an earlier step is excluded from every
/// later one: lower division, upper division, secondary courses, breadth.
pub fn resolve(catalog: &ProgramCatalog, selection: &ProgramSelection) -> ResolvedCatalog {
    let majors: Vec<_> = selection
        .primaries()
        .iter()
        .filter_map(|id| catalog.major(id))
        .collect();

    let lower: BTreeSet<Course> = majors
        .iter()
        .flat_map(|major| major.lower_divs.iter().cloned())
        .collect();

    let upper: BTreeSet<Course> = majors
        .iter()
        .flat_map(|major| major.upper_divs.iter().cloned())
        .filter(|course| !lower.contains(course))
        .collect();

    let secondary: BTreeSet<Course> = selection
        .secondaries()
        .iter()
        .filter_map(|id| catalog.minor(id))
        .flat_map(|minor| minor.courses.iter().cloned())
        .filter(|course| !lower.contains(course) && !upper.contains(course))
        .collect();

    let breadth: BTreeSet<Course> = catalog
        .breadths()
        .iter()
        .filter(|course| {
            !lower.contains(*course) && !upper.contains(*course) && !secondary.contains(*course)
        })
        .cloned()
        .collect();

    let mut origin = OriginIndex::default();
    origin.claim(&lower, CatalogPartition::LowerDivision);
    origin.claim(&upper, CatalogPartition::UpperDivision);
    origin.claim(&secondary, CatalogPartition::SecondaryCourses);
    origin.claim(&breadth, CatalogPartition::Breadth);

    ResolvedCatalog {
        lower_div: lower.into_iter().collect(),
        upper_div: upper.into_iter().collect(),
        breadth: breadth.into_iter().collect(),
        secondary_courses: secondary.into_iter().collect(),
        origin,
    }
}
