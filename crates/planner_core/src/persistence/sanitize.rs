//! Repairs untrusted course lists instead of rejecting them.

use std::fmt;

use serde_json::{Map, Value};
use shared::{
    domain::{Course, ProgramId, TermSlot, MAX_COURSE_NAME_CHARS, MAX_TERM_SLOT_COURSES},
    protocol::TermSlotLists,
};

/// One repair applied to an incoming field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Repair {
    NotAList { field: String },
    NonTextItems { field: String, dropped: usize },
    Truncated { field: String, dropped: usize },
    ItemShortened { field: String, item: String },
}

impl fmt::Display for Repair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repair::NotAList { field } => write!(f, "{field}: not a list, ignored"),
            Repair::NonTextItems { field, dropped } => {
                write!(f, "{field}: dropped {dropped} non-text entries")
            }
            Repair::Truncated { field, dropped } => {
                write!(f, "{field}: dropped {dropped} entries beyond {MAX_TERM_SLOT_COURSES}")
            }
            Repair::ItemShortened { field, item } => {
                write!(f, "{field}: shortened {item:?} to {MAX_COURSE_NAME_CHARS} characters")
            }
        }
    }
}

/// Keeps at most [`MAX_TERM_SLOT_COURSES`] text entries of at most
/// [`MAX_COURSE_NAME_CHARS`] characters each. Blank entries count as
/// non-text.
pub fn sanitize_course_list(field: &str, value: &Value, repairs: &mut Vec<Repair>) -> Vec<Course> {
    let Some(items) = value.as_array() else {
        repairs.push(Repair::NotAList {
            field: field.to_string(),
        });
        return Vec::new();
    };

    let mut non_text = 0;
    let mut courses = Vec::new();
    for item in items {
        let Some(text) = item.as_str().map(str::trim).filter(|text| !text.is_empty()) else {
            non_text += 1;
            continue;
        };
        courses.push(cap_course_text(field, text, repairs));
    }
    if non_text > 0 {
        repairs.push(Repair::NonTextItems {
            field: field.to_string(),
            dropped: non_text,
        });
    }
    if courses.len() > MAX_TERM_SLOT_COURSES {
        repairs.push(Repair::Truncated {
            field: field.to_string(),
            dropped: courses.len() - MAX_TERM_SLOT_COURSES,
        });
        courses.truncate(MAX_TERM_SLOT_COURSES);
    }
    courses
}

fn cap_course_text(field: &str, text: &str, repairs: &mut Vec<Repair>) -> Course {
    if text.chars().count() <= MAX_COURSE_NAME_CHARS {
        return Course::new(text);
    }
    repairs.push(Repair::ItemShortened {
        field: field.to_string(),
        item: text.to_string(),
    });
    Course::new(text.chars().take(MAX_COURSE_NAME_CHARS).collect::<String>())
}

/// Reads the eight slot fields of a flat object; absent fields are empty.
pub fn sanitize_term_slots(
    object: &Map<String, Value>,
    repairs: &mut Vec<Repair>,
) -> TermSlotLists {
    let mut lists = TermSlotLists::default();
    for slot in TermSlot::ALL {
        if let Some(value) = object.get(slot.key()) {
            *lists.get_mut(slot) = sanitize_course_list(slot.key(), value, repairs);
        }
    }
    lists
}

/// Applies the same caps to lists headed outward.
pub fn cap_term_slots(lists: &TermSlotLists) -> TermSlotLists {
    let mut capped = TermSlotLists::default();
    let mut ignored = Vec::new();
    for (slot, courses) in lists.iter() {
        *capped.get_mut(slot) = courses
            .iter()
            .take(MAX_TERM_SLOT_COURSES)
            .map(|course| cap_course_text(slot.key(), course.as_str(), &mut ignored))
            .collect();
    }
    capped
}

/// Program lists must be arrays of strings; anything else is `None`.
pub fn program_list(value: &Value) -> Option<Vec<ProgramId>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(ProgramId::from))
        .collect()
}
