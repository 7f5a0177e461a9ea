//! Shareable links: selection and non-empty term slots as query parameters,
//! each value `base64url(json list of strings)`.
//!
//! Decoding never fails. A damaged parameter is repaired or dropped and
//! reported, so a partially valid link still opens something useful.

use std::collections::HashMap;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use catalog::{ProgramCatalog, ProgramSelection};
use serde_json::Value;
use shared::{
    domain::{ProgramId, TermSlot},
    protocol::TermSlotLists,
};
use tracing::warn;
use url::Url;

use super::sanitize::{cap_term_slots, program_list, sanitize_course_list};
use super::{PRIMARIES_FIELD, SECONDARIES_FIELD};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLink {
    pub selection: ProgramSelection,
    pub slots: TermSlotLists,
    /// Human-readable description of every damaged fragment.
    pub malformed: Vec<String>,
    /// Primaries were unusable and the default selection was substituted.
    pub used_default: bool,
    pub secondaries_cleared: bool,
}

pub fn encode_link(base: &Url, selection: &ProgramSelection, slots: &TermSlotLists) -> Url {
    let capped = cap_term_slots(slots);
    let mut url = base.clone();
    {
        let mut query = url.query_pairs_mut();
        query.clear();
        query.append_pair(
            PRIMARIES_FIELD,
            &encode_list(selection.primaries().iter().map(ProgramId::as_str)),
        );
        query.append_pair(
            SECONDARIES_FIELD,
            &encode_list(selection.secondaries().iter().map(ProgramId::as_str)),
        );
        for (slot, courses) in capped.iter() {
            if !courses.is_empty() {
                query.append_pair(slot.key(), &encode_list(courses.iter().map(|c| c.as_str())));
            }
        }
    }
    url
}

fn encode_list<'a>(items: impl Iterator<Item = &'a str>) -> String {
    let list = Value::from(items.collect::<Vec<_>>());
    URL_SAFE_NO_PAD.encode(list.to_string())
}

fn decode_param(name: &str, raw: &str, malformed: &mut Vec<String>) -> Option<Value> {
    let bytes = match URL_SAFE_NO_PAD.decode(raw.trim_end_matches('=')) {
        Ok(bytes) => bytes,
        Err(error) => {
            malformed.push(format!("{name}: not valid base64 ({error})"));
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(error) => {
            malformed.push(format!("{name}: not valid JSON ({error})"));
            None
        }
    }
}

pub fn decode_link(catalog: &ProgramCatalog, url: &Url) -> DecodedLink {
    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
    let mut malformed = Vec::new();

    let primaries = match params.get(PRIMARIES_FIELD) {
        Some(raw) => decode_param(PRIMARIES_FIELD, raw, &mut malformed).and_then(|value| {
            let ids = program_list(&value);
            if ids.is_none() {
                malformed.push(format!("{PRIMARIES_FIELD}: not a list of program identifiers"));
            }
            ids
        }),
        None => {
            malformed.push(format!("{PRIMARIES_FIELD}: missing"));
            None
        }
    };

    let mut secondaries_cleared = false;
    let secondaries = match params.get(SECONDARIES_FIELD) {
        Some(raw) => match decode_param(SECONDARIES_FIELD, raw, &mut malformed) {
            Some(value) => program_list(&value).unwrap_or_else(|| {
                malformed.push(format!("{SECONDARIES_FIELD}: not a list of program identifiers"));
                secondaries_cleared = true;
                Vec::new()
            }),
            None => {
                secondaries_cleared = true;
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let Some(selection) = primaries.and_then(|primaries| {
        match ProgramSelection::new(catalog, primaries.clone(), secondaries) {
            Ok(selection) => Some(selection),
            Err(error) if error.concerns_secondaries() => {
                warn!(%error, "clearing secondary programs from shared link");
                malformed.push(format!("{SECONDARIES_FIELD}: {error}, cleared"));
                secondaries_cleared = true;
                ProgramSelection::new(catalog, primaries, Vec::new()).ok()
            }
            Err(_) => None,
        }
    }) else {
        malformed.push(format!("{PRIMARIES_FIELD}: unknown or invalid programs, using default"));
        warn!(?malformed, "shared link carries no usable selection");
        return DecodedLink {
            selection: ProgramSelection::default_for(catalog),
            slots: TermSlotLists::default(),
            malformed,
            used_default: true,
            secondaries_cleared,
        };
    };

    let mut repairs = Vec::new();
    let mut slots = TermSlotLists::default();
    for slot in TermSlot::ALL {
        let Some(raw) = params.get(slot.key()) else {
            continue;
        };
        if let Some(value) = decode_param(slot.key(), raw, &mut malformed) {
            *slots.get_mut(slot) = sanitize_course_list(slot.key(), &value, &mut repairs);
        }
    }
    malformed.extend(repairs.iter().map(ToString::to_string));
    if !malformed.is_empty() {
        warn!(?malformed, "repaired shared link");
    }

    DecodedLink {
        selection,
        slots,
        malformed,
        used_default: false,
        secondaries_cleared,
    }
}
