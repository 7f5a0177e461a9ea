//! Export/import document: program selection plus the eight term slots.

use std::path::PathBuf;

use catalog::{ProgramCatalog, ProgramSelection, SelectionError};
use serde_json::Value;
use shared::{
    error::{Classified, ErrorCode},
    protocol::{PlanDocument, TermSlotLists},
};
use thiserror::Error;

use super::sanitize::{cap_term_slots, program_list, sanitize_term_slots, Repair};
use super::{PRIMARIES_FIELD, SECONDARIES_FIELD};
use crate::store::PlacementStore;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("document is not valid JSON: {0}")]
    NotJson(#[from] serde_json::Error),
    #[error("document is not a JSON object")]
    NotAnObject,
    #[error("document has no `primaries` field")]
    MissingPrimaries,
    #[error("`{field}` must be a list of program identifiers")]
    InvalidProgramList { field: &'static str },
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

impl Classified for ImportError {
    fn code(&self) -> ErrorCode {
        ErrorCode::Import
    }
}

/// A validated document, ready to replace the current plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedPlan {
    pub selection: ProgramSelection,
    pub slots: TermSlotLists,
    pub repairs: Vec<Repair>,
}

pub fn export_document(store: &PlacementStore) -> PlanDocument {
    let selection = store.selection();
    PlanDocument {
        primaries: selection.primaries().to_vec(),
        secondaries: selection.secondaries().to_vec(),
        slots: cap_term_slots(&store.term_slots()),
    }
}

pub fn export_json(store: &PlacementStore) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&export_document(store))
}

/// Program fields are authoritative: any problem with them rejects the whole
/// document. Slot fields are only repaired.
pub fn parse_import(catalog: &ProgramCatalog, bytes: &[u8]) -> Result<ImportedPlan, ImportError> {
    let value: Value = serde_json::from_slice(bytes)?;
    let object = value.as_object().ok_or(ImportError::NotAnObject)?;

    let primaries = object
        .get(PRIMARIES_FIELD)
        .ok_or(ImportError::MissingPrimaries)
        .and_then(|value| {
            program_list(value).ok_or(ImportError::InvalidProgramList {
                field: PRIMARIES_FIELD,
            })
        })?;
    let secondaries = match object.get(SECONDARIES_FIELD) {
        Some(value) => program_list(value).ok_or(ImportError::InvalidProgramList {
            field: SECONDARIES_FIELD,
        })?,
        None => Vec::new(),
    };
    let selection = ProgramSelection::new(catalog, primaries, secondaries)?;

    let mut repairs = Vec::new();
    let slots = sanitize_term_slots(object, &mut repairs);
    Ok(ImportedPlan {
        selection,
        slots,
        repairs,
    })
}
