//! The mutable plan: four derived catalog partitions and eight term slots.
//!
//! Every course sits in at most one of the twelve containers. All
//! operations either apply completely or return an error and leave the
//! store untouched.

use std::collections::HashSet;

use catalog::{resolve, OriginIndex, ProgramCatalog, ProgramSelection};
use shared::{
    domain::{
        CatalogPartition, ContainerId, Course, CourseTextError, TermSlot, MAX_TERM_SLOT_COURSES,
    },
    error::{Classified, ErrorCode},
    protocol::TermSlotLists,
};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("source and destination are the same container")]
    NoOp,
    #[error("{slot} already holds {max} courses", max = MAX_TERM_SLOT_COURSES)]
    CapacityExceeded { slot: TermSlot },
    #[error("{course} cannot be placed in {dest}")]
    WrongOrigin {
        course: Course,
        dest: CatalogPartition,
        origin: Option<CatalogPartition>,
    },
    #[error("{course} is not in {container}")]
    NotInSource {
        course: Course,
        container: ContainerId,
    },
}

impl Classified for MoveError {
    fn code(&self) -> ErrorCode {
        match self {
            MoveError::CapacityExceeded { .. } => ErrorCode::Capacity,
            MoveError::NoOp | MoveError::WrongOrigin { .. } | MoveError::NotInSource { .. } => {
                ErrorCode::Movement
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustomCourseError {
    #[error("invalid course name: {0}")]
    InvalidText(#[from] CourseTextError),
    #[error("{0} is already part of the plan or the catalog")]
    Duplicate(Course),
    #[error("{slot} already holds {max} courses", max = MAX_TERM_SLOT_COURSES)]
    CapacityExceeded { slot: TermSlot },
}

impl Classified for CustomCourseError {
    fn code(&self) -> ErrorCode {
        match self {
            CustomCourseError::CapacityExceeded { .. } => ErrorCode::Capacity,
            CustomCourseError::InvalidText(_) | CustomCourseError::Duplicate(_) => {
                ErrorCode::Validation
            }
        }
    }
}

/// Where a course went after a successful placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Moved(ContainerId),
    ReturnedTo(CatalogPartition),
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementStore {
    selection: ProgramSelection,
    partitions: [Vec<Course>; 4],
    slots: [Vec<Course>; 8],
    origin: OriginIndex,
}

impl PlacementStore {
    /// Freshly derived partitions and empty term slots.
    pub fn fresh(catalog: &ProgramCatalog, selection: ProgramSelection) -> Self {
        let resolved = resolve(catalog, &selection);
        Self {
            selection,
            partitions: [
                resolved.lower_div,
                resolved.upper_div,
                resolved.breadth,
                resolved.secondary_courses,
            ],
            slots: Default::default(),
            origin: resolved.origin,
        }
    }

    /// Rebuilds a plan from persisted term slots.
    ///
    /// Each slot is capped at capacity and a course listed more than once
    /// keeps only its first position in slot order, then the result is
    /// reconciled against the rederived partitions.
    pub fn from_term_slots(
        catalog: &ProgramCatalog,
        selection: ProgramSelection,
        lists: TermSlotLists,
    ) -> Self {
        let mut store = Self::fresh(catalog, selection);
        let mut seen = HashSet::new();
        for slot in TermSlot::ALL {
            let target = &mut store.slots[slot.index()];
            for course in lists.get(slot) {
                if target.len() >= MAX_TERM_SLOT_COURSES {
                    warn!(slot = slot.key(), %course, "dropping course beyond slot capacity");
                    continue;
                }
                if !seen.insert(course.clone()) {
                    warn!(slot = slot.key(), %course, "dropping duplicate placement");
                    continue;
                }
                target.push(course.clone());
            }
        }
        store.reconcile_duplicates();
        store
    }

    /// The same term slots under a new selection, if the change is one that
    /// keeps them meaningful.
    pub fn carried_over(
        &self,
        catalog: &ProgramCatalog,
        next: ProgramSelection,
    ) -> Option<PlacementStore> {
        if !self.selection.carries_over_to(&next) {
            return None;
        }
        let mut store = Self::fresh(catalog, next);
        store.slots = self.slots.clone();
        store.reconcile_duplicates();
        Some(store)
    }

    pub fn selection(&self) -> &ProgramSelection {
        &self.selection
    }

    pub fn origin_index(&self) -> &OriginIndex {
        &self.origin
    }

    pub fn origin_of(&self, course: &Course) -> Option<CatalogPartition> {
        self.origin.origin(course)
    }

    pub fn container(&self, id: ContainerId) -> &[Course] {
        match id {
            ContainerId::Catalog(partition) => &self.partitions[partition.index()],
            ContainerId::Term(slot) => &self.slots[slot.index()],
        }
    }

    fn container_mut(&mut self, id: ContainerId) -> &mut Vec<Course> {
        match id {
            ContainerId::Catalog(partition) => &mut self.partitions[partition.index()],
            ContainerId::Term(slot) => &mut self.slots[slot.index()],
        }
    }

    /// The container currently holding `course`, if any.
    pub fn locate(&self, course: &Course) -> Option<ContainerId> {
        ContainerId::ALL
            .into_iter()
            .find(|id| self.container(*id).contains(course))
    }

    pub fn term_slots(&self) -> TermSlotLists {
        let mut lists = TermSlotLists::default();
        for slot in TermSlot::ALL {
            *lists.get_mut(slot) = self.slots[slot.index()].clone();
        }
        lists
    }

    /// Checks the destination rule without touching the store.
    pub fn can_move(
        &self,
        source: ContainerId,
        dest: ContainerId,
        course: &Course,
    ) -> Result<(), MoveError> {
        if source == dest {
            return Err(MoveError::NoOp);
        }
        match dest {
            ContainerId::Term(slot) => {
                if self.slots[slot.index()].len() >= MAX_TERM_SLOT_COURSES {
                    return Err(MoveError::CapacityExceeded { slot });
                }
            }
            ContainerId::Catalog(partition) => {
                let origin = self.origin.origin(course);
                if origin != Some(partition) {
                    return Err(MoveError::WrongOrigin {
                        course: course.clone(),
                        dest: partition,
                        origin,
                    });
                }
            }
        }
        if !self.container(source).contains(course) {
            return Err(MoveError::NotInSource {
                course: course.clone(),
                container: source,
            });
        }
        Ok(())
    }

    pub fn move_item(
        &mut self,
        source: ContainerId,
        dest: ContainerId,
        course: &Course,
    ) -> Result<(), MoveError> {
        self.can_move(source, dest, course)?;

        self.container_mut(source).retain(|c| c != course);
        let target = self.container_mut(dest);
        if dest.is_catalog_partition() {
            let at = target.binary_search(course).unwrap_or_else(|at| at);
            target.insert(at, course.clone());
        } else {
            target.push(course.clone());
        }
        debug!(%course, %source, %dest, "moved course");
        Ok(())
    }

    /// Accepts user-typed text as a new custom course at the end of `slot`.
    pub fn add_custom_course(
        &mut self,
        slot: TermSlot,
        raw: &str,
    ) -> Result<Course, CustomCourseError> {
        let course = Course::canonicalize(raw)?;
        if self.origin.contains(&course) || self.locate(&course).is_some() {
            return Err(CustomCourseError::Duplicate(course));
        }
        let target = &mut self.slots[slot.index()];
        if target.len() >= MAX_TERM_SLOT_COURSES {
            return Err(CustomCourseError::CapacityExceeded { slot });
        }
        target.push(course.clone());
        debug!(%course, slot = slot.key(), "added custom course");
        Ok(course)
    }

    /// Sends a cataloged course home; removes a custom course from the plan.
    pub fn remove_from_origin(
        &mut self,
        source: ContainerId,
        course: &Course,
    ) -> Result<Placement, MoveError> {
        if let Some(origin) = self.origin.origin(course) {
            self.move_item(source, ContainerId::Catalog(origin), course)?;
            return Ok(Placement::ReturnedTo(origin));
        }

        let container = self.container_mut(source);
        let Some(at) = container.iter().position(|c| c == course) else {
            return Err(MoveError::NotInSource {
                course: course.clone(),
                container: source,
            });
        };
        container.remove(at);
        debug!(%course, %source, "deleted custom course");
        Ok(Placement::Deleted)
    }

    /// Moves `course` to position `index` inside its own term slot.
    /// Reordering never changes the slot's length, so capacity is not checked.
    pub fn reorder(
        &mut self,
        slot: TermSlot,
        course: &Course,
        index: usize,
    ) -> Result<(), MoveError> {
        let list = &mut self.slots[slot.index()];
        let Some(from) = list.iter().position(|c| c == course) else {
            return Err(MoveError::NotInSource {
                course: course.clone(),
                container: ContainerId::Term(slot),
            });
        };
        let item = list.remove(from);
        let to = index.min(list.len());
        list.insert(to, item);
        Ok(())
    }

    /// Removes every term-slot course from its catalog origin partition.
    /// Returns how many catalog entries were dropped.
    pub fn reconcile_duplicates(&mut self) -> usize {
        let placed: HashSet<&Course> = self.slots.iter().flatten().collect();
        let mut removed = 0;
        for partition in CatalogPartition::ALL {
            let list = &mut self.partitions[partition.index()];
            let before = list.len();
            list.retain(|course| !placed.contains(course));
            removed += before - list.len();
        }
        if removed > 0 {
            debug!(removed, "reconciled catalog partitions against term slots");
        }
        removed
    }

    pub fn reconciled(mut self) -> Self {
        self.reconcile_duplicates();
        self
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
