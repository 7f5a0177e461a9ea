use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use catalog::{ProgramCatalog, ProgramResources, ProgramSelection, SelectionError};
use shared::{
    domain::{ContainerId, Course, ProgramId, TermSlot},
    protocol::{Notice, PlanDocument, PlannerEvent, TermSlotLists},
};
use storage::PlanCache;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use url::Url;

pub mod persistence;
pub mod selection;
pub mod store;

pub use persistence::{cache_key, DecodedLink, ImportError, ImportedPlan};
pub use selection::{
    Completion, DropTarget, HeldItem, HoldError, HoldMode, ListenerRegistry, ListenerScope,
    LocalListenerRegistry, MenuController, ScopedListener, SelectionController,
};
pub use store::{CustomCourseError, MoveError, Placement, PlacementStore};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// One user's planning session.
///
/// Every interaction takes `&mut self` and runs to completion, including the
/// cache write that follows a mutation, so no caller ever observes a
/// half-applied change or a cache that lags the in-memory plan.
pub struct PlannerSession {
    catalog: Arc<ProgramCatalog>,
    cache: Arc<dyn PlanCache>,
    store: PlacementStore,
    selection: SelectionController,
    menu: MenuController,
    events: broadcast::Sender<PlannerEvent>,
    link_base: Url,
}

impl PlannerSession {
    /// Starts at `selection`, restoring its cached plan when one exists.
    pub async fn open(
        catalog: Arc<ProgramCatalog>,
        cache: Arc<dyn PlanCache>,
        listeners: Arc<dyn ListenerRegistry>,
        link_base: Url,
        selection: ProgramSelection,
    ) -> Self {
        let cached = load_cached(cache.as_ref(), &selection).await;
        let store = match cached {
            Some(lists) => PlacementStore::from_term_slots(&catalog, selection, lists),
            None => PlacementStore::fresh(&catalog, selection),
        };
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        info!(cache_key = %cache_key(store.selection()), "opened planner session");
        Self {
            catalog,
            cache,
            store,
            selection: SelectionController::new(Arc::clone(&listeners)),
            menu: MenuController::new(listeners),
            events,
            link_base,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PlannerEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &PlacementStore {
        &self.store
    }

    pub fn catalog(&self) -> &ProgramCatalog {
        &self.catalog
    }

    pub fn program_selection(&self) -> &ProgramSelection {
        self.store.selection()
    }

    pub fn resources(&self) -> Vec<ProgramResources> {
        self.catalog.resources(self.store.selection())
    }

    pub fn held(&self) -> Option<(&HeldItem, HoldMode)> {
        self.selection.held()
    }

    pub fn menu(&self) -> &MenuController {
        &self.menu
    }

    pub fn menu_mut(&mut self) -> &mut MenuController {
        &mut self.menu
    }

    /// Applies a selection from the program selector.
    ///
    /// A compatible change keeps the current term slots. Otherwise the
    /// cached plan for the new selection is restored, or a fresh one built.
    pub async fn update_program_selection(
        &mut self,
        primaries: Vec<ProgramId>,
        secondaries: Vec<ProgramId>,
    ) -> Result<(), SelectionError> {
        let next = ProgramSelection::new(&self.catalog, primaries, secondaries)?;
        self.selection.cancel();

        let store = match self.store.carried_over(&self.catalog, next.clone()) {
            Some(store) => {
                debug!(cache_key = %cache_key(&next), "carried term slots over");
                store
            }
            None => match load_cached(self.cache.as_ref(), &next).await {
                Some(lists) => PlacementStore::from_term_slots(&self.catalog, next, lists),
                None => PlacementStore::fresh(&self.catalog, next),
            },
        };
        self.store = store;
        self.persist().await;
        Ok(())
    }

    pub fn begin_hold(&mut self, course: &Course, mode: HoldMode) -> Result<HeldItem, HoldError> {
        self.selection.begin_hold(&self.store, course, mode)
    }

    /// Drop or click on `target` while an item is held.
    pub async fn complete_hold(&mut self, target: DropTarget) -> Option<Completion> {
        let completion = self.selection.complete(target, &mut self.store)?;
        match &completion.result {
            Ok(_) => self.persist().await,
            Err(err) => self.notify_move_error(&completion.item.course, err),
        }
        Some(completion)
    }

    pub fn cancel_hold(&mut self) -> Option<HeldItem> {
        self.selection.cancel()
    }

    pub fn drag_end(&mut self) -> Option<HeldItem> {
        self.selection.drag_end()
    }

    pub fn touch_end(&mut self) -> bool {
        self.selection.touch_end()
    }

    pub fn outside_click(&mut self) -> Option<HeldItem> {
        self.selection.outside_click()
    }

    pub fn can_move(
        &self,
        source: ContainerId,
        dest: ContainerId,
        course: &Course,
    ) -> Result<(), MoveError> {
        self.store.can_move(source, dest, course)
    }

    pub async fn move_item(
        &mut self,
        source: ContainerId,
        dest: ContainerId,
        course: &Course,
    ) -> Result<(), MoveError> {
        match self.store.move_item(source, dest, course) {
            Ok(()) => {
                self.persist().await;
                Ok(())
            }
            Err(err) => {
                self.notify_move_error(course, &err);
                Err(err)
            }
        }
    }

    pub async fn add_custom_course(
        &mut self,
        slot: TermSlot,
        raw: &str,
    ) -> Result<Course, CustomCourseError> {
        match self.store.add_custom_course(slot, raw) {
            Ok(course) => {
                self.persist().await;
                Ok(course)
            }
            Err(err) => {
                self.notify(match &err {
                    CustomCourseError::InvalidText(text) => Notice::InvalidCourseText {
                        message: text.to_string(),
                    },
                    CustomCourseError::Duplicate(course) => Notice::DuplicateCustomCourse {
                        course: course.clone(),
                    },
                    CustomCourseError::CapacityExceeded { slot } => {
                        Notice::CapacityExceeded { slot: *slot }
                    }
                });
                Err(err)
            }
        }
    }

    pub async fn remove_from_origin(
        &mut self,
        source: ContainerId,
        course: &Course,
    ) -> Result<Placement, MoveError> {
        match self.store.remove_from_origin(source, course) {
            Ok(placement) => {
                self.persist().await;
                Ok(placement)
            }
            Err(err) => {
                self.notify_move_error(course, &err);
                Err(err)
            }
        }
    }

    pub async fn reorder(
        &mut self,
        slot: TermSlot,
        course: &Course,
        index: usize,
    ) -> Result<(), MoveError> {
        self.store.reorder(slot, course, index)?;
        self.persist().await;
        Ok(())
    }

    /// Forgets the cached plan for the current selection and starts over.
    pub async fn reset(&mut self) {
        self.selection.cancel();
        let key = cache_key(self.store.selection());
        if let Err(err) = self.cache.remove_plan(&key).await {
            warn!(cache_key = %key, error = %format!("{err:#}"), "failed to clear cached plan");
        }
        self.store = PlacementStore::fresh(&self.catalog, self.store.selection().clone());
        info!(cache_key = %key, "reset plan");
    }

    pub fn share_link(&self) -> Url {
        let url = persistence::encode_link(
            &self.link_base,
            self.store.selection(),
            &self.store.term_slots(),
        );
        self.notify(Notice::LinkCopied {
            url: url.to_string(),
        });
        url
    }

    /// Replaces the plan with the one carried by `url`. Damaged parts of the
    /// link are repaired and reported; the returned list is empty when the
    /// link was clean.
    pub async fn open_link(&mut self, url: &Url) -> Vec<String> {
        let decoded = persistence::decode_link(&self.catalog, url);
        self.selection.cancel();
        if decoded.used_default {
            // The link carried no usable plan; the saved default plan wins.
            let cached = load_cached(self.cache.as_ref(), &decoded.selection).await;
            self.store = match cached {
                Some(lists) => {
                    PlacementStore::from_term_slots(&self.catalog, decoded.selection, lists)
                }
                None => PlacementStore::fresh(&self.catalog, decoded.selection),
            };
        } else {
            self.store =
                PlacementStore::from_term_slots(&self.catalog, decoded.selection, decoded.slots);
        }
        if !decoded.malformed.is_empty() {
            self.notify(Notice::MalformedLink {
                details: decoded.malformed.clone(),
            });
        }
        self.notify_selection_changed();
        if !decoded.used_default {
            self.persist().await;
        }
        decoded.malformed
    }

    pub fn export_document(&self) -> PlanDocument {
        persistence::export_document(&self.store)
    }

    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        persistence::export_json(&self.store)
    }

    /// Reads and imports a document. The plan is only replaced once the
    /// read has finished and the document validated.
    pub async fn import_file(&mut self, path: &Path) -> Result<(), ImportError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => self.import_bytes(&bytes).await,
            Err(source) => {
                let err = ImportError::Read {
                    path: path.to_path_buf(),
                    source,
                };
                self.reject_import(&err);
                Err(err)
            }
        }
    }

    pub async fn import_bytes(&mut self, bytes: &[u8]) -> Result<(), ImportError> {
        let imported = match persistence::parse_import(&self.catalog, bytes) {
            Ok(imported) => imported,
            Err(err) => {
                self.reject_import(&err);
                return Err(err);
            }
        };
        for repair in &imported.repairs {
            warn!(%repair, "repaired imported document");
        }

        self.selection.cancel();
        self.store =
            PlacementStore::from_term_slots(&self.catalog, imported.selection, imported.slots);
        self.persist().await;
        self.notify_selection_changed();
        self.notify(Notice::ImportSucceeded);
        info!(cache_key = %cache_key(self.store.selection()), "imported plan");
        Ok(())
    }

    fn reject_import(&self, err: &ImportError) {
        warn!(error = %err, "rejected imported document");
        self.notify(Notice::ImportRejected {
            reason: err.to_string(),
        });
    }

    /// Write failures never fail the interaction that caused them.
    async fn persist(&self) {
        let key = cache_key(self.store.selection());
        if let Err(err) = self.write_cache(&key).await {
            warn!(cache_key = %key, error = %format!("{err:#}"), "failed to write plan cache");
        }
    }

    async fn write_cache(&self, key: &str) -> Result<()> {
        let document = persistence::encode_cached_plan(&self.store.term_slots())
            .context("failed to encode term slots")?;
        self.cache.store_plan(key, &document).await
    }

    fn notify_move_error(&self, course: &Course, err: &MoveError) {
        let notice = match err {
            MoveError::NoOp => return,
            MoveError::CapacityExceeded { slot } => Notice::CapacityExceeded { slot: *slot },
            MoveError::WrongOrigin { .. } | MoveError::NotInSource { .. } => Notice::InvalidMove {
                course: course.clone(),
                reason: err.to_string(),
            },
        };
        self.notify(notice);
    }

    fn notify_selection_changed(&self) {
        let selection = self.store.selection();
        let _ = self.events.send(PlannerEvent::ProgramSelectionChanged {
            primaries: selection.primaries().to_vec(),
            secondaries: selection.secondaries().to_vec(),
        });
    }

    fn notify(&self, notice: Notice) {
        // No subscribers is not an error.
        let _ = self.events.send(PlannerEvent::Notice(notice));
    }
}

async fn load_cached(cache: &dyn PlanCache, selection: &ProgramSelection) -> Option<TermSlotLists> {
    let key = cache_key(selection);
    match cache.load_plan(&key).await {
        Ok(Some(raw)) => persistence::decode_cached_plan(&key, &raw),
        Ok(None) => None,
        Err(err) => {
            warn!(cache_key = %key, error = %format!("{err:#}"), "failed to read plan cache");
            None
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
