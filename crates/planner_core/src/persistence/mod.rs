//! Cache key and cache document, plus the link and file exchange formats.

pub mod document;
pub mod link;
pub mod sanitize;

use catalog::ProgramSelection;
use serde_json::Value;
use shared::{domain::ProgramId, protocol::TermSlotLists};
use tracing::warn;

pub use document::{export_document, export_json, parse_import, ImportError, ImportedPlan};
pub use link::{decode_link, encode_link, DecodedLink};
pub use sanitize::Repair;

pub const PRIMARIES_FIELD: &str = "primaries";
pub const SECONDARIES_FIELD: &str = "secondaries";

/// Order-independent signature of a selection: `["A","B"];["C"]`.
pub fn cache_key(selection: &ProgramSelection) -> String {
    format!(
        "{};{}",
        sorted_json_list(selection.primaries()),
        sorted_json_list(selection.secondaries())
    )
}

fn sorted_json_list(ids: &[ProgramId]) -> String {
    let mut sorted: Vec<&str> = ids.iter().map(ProgramId::as_str).collect();
    sorted.sort_unstable();
    Value::from(sorted).to_string()
}

pub fn encode_cached_plan(lists: &TermSlotLists) -> Result<String, serde_json::Error> {
    serde_json::to_string(lists)
}

/// `None` when the entry is not a JSON object; a parseable entry is
/// sanitized like any other untrusted input.
pub fn decode_cached_plan(cache_key: &str, raw: &str) -> Option<TermSlotLists> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(error) => {
            warn!(cache_key, %error, "ignoring unparseable cached plan");
            return None;
        }
    };
    let Some(object) = value.as_object() else {
        warn!(cache_key, "ignoring cached plan that is not an object");
        return None;
    };

    let mut repairs = Vec::new();
    let lists = sanitize::sanitize_term_slots(object, &mut repairs);
    for repair in &repairs {
        warn!(cache_key, %repair, "repaired cached plan");
    }
    Some(lists)
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
