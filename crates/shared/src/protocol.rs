use serde::{Deserialize, Serialize};

use crate::{
    domain::{Course, ProgramId, TermSlot},
    error::ErrorCode,
};

/// The eight term-slot lists, keyed by their wire names.
///
/// This is the exact value stored in the plan cache and the slot half of an
/// exported [`PlanDocument`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermSlotLists {
    #[serde(default)]
    pub fa1: Vec<Course>,
    #[serde(default)]
    pub sp1: Vec<Course>,
    #[serde(default)]
    pub fa2: Vec<Course>,
    #[serde(default)]
    pub sp2: Vec<Course>,
    #[serde(default)]
    pub fa3: Vec<Course>,
    #[serde(default)]
    pub sp3: Vec<Course>,
    #[serde(default)]
    pub fa4: Vec<Course>,
    #[serde(default)]
    pub sp4: Vec<Course>,
}

impl TermSlotLists {
    pub fn get(&self, slot: TermSlot) -> &Vec<Course> {
        match slot {
            TermSlot::Fall1 => &self.fa1,
            TermSlot::Spring1 => &self.sp1,
            TermSlot::Fall2 => &self.fa2,
            TermSlot::Spring2 => &self.sp2,
            TermSlot::Fall3 => &self.fa3,
            TermSlot::Spring3 => &self.sp3,
            TermSlot::Fall4 => &self.fa4,
            TermSlot::Spring4 => &self.sp4,
        }
    }

    pub fn get_mut(&mut self, slot: TermSlot) -> &mut Vec<Course> {
        match slot {
            TermSlot::Fall1 => &mut self.fa1,
            TermSlot::Spring1 => &mut self.sp1,
            TermSlot::Fall2 => &mut self.fa2,
            TermSlot::Spring2 => &mut self.sp2,
            TermSlot::Fall3 => &mut self.fa3,
            TermSlot::Spring3 => &mut self.sp3,
            TermSlot::Fall4 => &mut self.fa4,
            TermSlot::Spring4 => &mut self.sp4,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (TermSlot, &Vec<Course>)> + '_ {
        TermSlot::ALL.into_iter().map(move |slot| (slot, self.get(slot)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().all(|(_, courses)| courses.is_empty())
    }
}

/// Flat export/import document. Omitted slot fields mean empty lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDocument {
    pub primaries: Vec<ProgramId>,
    #[serde(default)]
    pub secondaries: Vec<ProgramId>,
    #[serde(flatten)]
    pub slots: TermSlotLists,
}

/// User-facing success and failure signals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Notice {
    InvalidMove {
        course: Course,
        reason: String,
    },
    CapacityExceeded {
        slot: TermSlot,
    },
    DuplicateCustomCourse {
        course: Course,
    },
    InvalidCourseText {
        message: String,
    },
    MalformedLink {
        details: Vec<String>,
    },
    ImportRejected {
        reason: String,
    },
    ImportSucceeded,
    LinkCopied {
        url: String,
    },
}

impl Notice {
    /// `None` for success notices.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Notice::InvalidMove { .. } => Some(ErrorCode::Movement),
            Notice::CapacityExceeded { .. } => Some(ErrorCode::Capacity),
            Notice::DuplicateCustomCourse { .. } | Notice::InvalidCourseText { .. } => {
                Some(ErrorCode::Validation)
            }
            Notice::MalformedLink { .. } => Some(ErrorCode::PersistenceRead),
            Notice::ImportRejected { .. } => Some(ErrorCode::Import),
            Notice::ImportSucceeded | Notice::LinkCopied { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum PlannerEvent {
    Notice(Notice),
    /// The engine replaced the program selection on its own (link or
    /// document load); the program selector must mirror it.
    ProgramSelectionChanged {
        primaries: Vec<ProgramId>,
        secondaries: Vec<ProgramId>,
    },
}
