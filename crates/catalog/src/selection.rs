use shared::{
    domain::{ProgramId, MAX_PRIMARY_PROGRAMS, MAX_SECONDARY_PROGRAMS},
    error::{Classified, ErrorCode},
};
use thiserror::Error;

use crate::ProgramCatalog;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("at least one primary program is required")]
    NoPrimary,
    #[error("{count} primary programs selected, at most {max} allowed")]
    TooManyPrimaries { count: usize, max: usize },
    #[error("{count} secondary programs selected, at most {max} allowed")]
    TooManySecondaries { count: usize, max: usize },
    #[error("unknown primary program {0}")]
    UnknownPrimary(ProgramId),
    #[error("unknown secondary program {0}")]
    UnknownSecondary(ProgramId),
    #[error("primary program {0} is selected twice")]
    DuplicatePrimary(ProgramId),
    #[error("secondary program {0} is selected twice")]
    DuplicateSecondary(ProgramId),
}

impl Classified for SelectionError {
    fn code(&self) -> ErrorCode {
        ErrorCode::Validation
    }
}

impl SelectionError {
    pub fn concerns_secondaries(&self) -> bool {
        matches!(
            self,
            SelectionError::TooManySecondaries { .. }
                | SelectionError::UnknownSecondary(_)
                | SelectionError::DuplicateSecondary(_)
        )
    }
}

/// A validated choice of one or two majors and up to two minors.
///
/// The first primary is mandatory. Order is preserved as chosen; only the
/// cache key sorts it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgramSelection {
    primaries: Vec<ProgramId>,
    secondaries: Vec<ProgramId>,
}

impl ProgramSelection {
    pub fn new(
        catalog: &ProgramCatalog,
        primaries: Vec<ProgramId>,
        secondaries: Vec<ProgramId>,
    ) -> Result<Self, SelectionError> {
        if primaries.is_empty() {
            return Err(SelectionError::NoPrimary);
        }
        if primaries.len() > MAX_PRIMARY_PROGRAMS {
            return Err(SelectionError::TooManyPrimaries {
                count: primaries.len(),
                max: MAX_PRIMARY_PROGRAMS,
            });
        }
        if secondaries.len() > MAX_SECONDARY_PROGRAMS {
            return Err(SelectionError::TooManySecondaries {
                count: secondaries.len(),
                max: MAX_SECONDARY_PROGRAMS,
            });
        }
        for (i, id) in primaries.iter().enumerate() {
            if !catalog.is_major(id) {
                return Err(SelectionError::UnknownPrimary(id.clone()));
            }
            if primaries[..i].contains(id) {
                return Err(SelectionError::DuplicatePrimary(id.clone()));
            }
        }
        for (i, id) in secondaries.iter().enumerate() {
            if !catalog.is_minor(id) {
                return Err(SelectionError::UnknownSecondary(id.clone()));
            }
            if secondaries[..i].contains(id) {
                return Err(SelectionError::DuplicateSecondary(id.clone()));
            }
        }
        Ok(Self {
            primaries,
            secondaries,
        })
    }

    /// Single default major, no minors.
    pub fn default_for(catalog: &ProgramCatalog) -> Self {
        Self {
            primaries: vec![catalog.default_primary()],
            secondaries: Vec::new(),
        }
    }

    pub fn primaries(&self) -> &[ProgramId] {
        &self.primaries
    }

    pub fn secondaries(&self) -> &[ProgramId] {
        &self.secondaries
    }

    /// Whether term slots planned under `self` stay meaningful under `next`.
    ///
    /// Each list must be unchanged, have only its last entry replaced, or
    /// have one entry appended with every earlier entry intact. The first
    /// primary is the basis of the plan and never counts as "last".
    pub fn carries_over_to(&self, next: &ProgramSelection) -> bool {
        list_carries_over(&self.primaries, &next.primaries, 1)
            && list_carries_over(&self.secondaries, &next.secondaries, 0)
    }
}

fn list_carries_over(prev: &[ProgramId], next: &[ProgramId], pinned: usize) -> bool {
    if prev == next {
        return true;
    }
    if prev.len() == next.len() {
        let keep = prev.len().saturating_sub(1);
        return keep >= pinned && prev[..keep] == next[..keep];
    }
    next.len() == prev.len() + 1 && next.starts_with(prev)
}
