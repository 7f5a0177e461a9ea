//! Single held item shared by drag and click input.
//!
//! A hold begins with a drag-start or a click on an item and ends with a
//! drop/click on a target (the move is attempted), or with a cancel. While a
//! click-selection or the menu is open an outside-click listener is
//! registered; the [`ScopedListener`] guard deregisters it when the hold or
//! menu ends, whichever exit path is taken.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use shared::domain::{CatalogPartition, ContainerId, Course};
use thiserror::Error;
use tracing::debug;

use crate::store::{MoveError, Placement, PlacementStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerScope {
    HeldItem,
    Menu,
}

/// The host's global pointer-listener table.
pub trait ListenerRegistry: Send + Sync {
    fn register(&self, scope: ListenerScope) -> ListenerId;
    fn deregister(&self, id: ListenerId);
}

/// Registration that lives exactly as long as this value.
pub struct ScopedListener {
    registry: Arc<dyn ListenerRegistry>,
    id: ListenerId,
}

impl ScopedListener {
    pub fn register(registry: &Arc<dyn ListenerRegistry>, scope: ListenerScope) -> Self {
        let id = registry.register(scope);
        Self {
            registry: Arc::clone(registry),
            id,
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl Drop for ScopedListener {
    fn drop(&mut self) {
        self.registry.deregister(self.id);
    }
}

/// In-process registry that only tracks what is currently registered.
#[derive(Default)]
pub struct LocalListenerRegistry {
    next_id: AtomicU64,
    active: Mutex<HashMap<ListenerId, ListenerScope>>,
}

impl LocalListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().map(|active| active.len()).unwrap_or(0)
    }

    pub fn is_active(&self, scope: ListenerScope) -> bool {
        self.active
            .lock()
            .map(|active| active.values().any(|s| *s == scope))
            .unwrap_or(false)
    }
}

impl ListenerRegistry for LocalListenerRegistry {
    fn register(&self, scope: ListenerScope) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut active) = self.active.lock() {
            active.insert(id, scope);
        }
        id
    }

    fn deregister(&self, id: ListenerId) {
        if let Ok(mut active) = self.active.lock() {
            active.remove(&id);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldMode {
    Drag,
    Click,
}

/// The course being moved, where it sits now, and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeldItem {
    pub course: Course,
    pub current: ContainerId,
    pub origin: Option<CatalogPartition>,
}

impl HeldItem {
    pub fn is_custom(&self) -> bool {
        self.origin.is_none()
    }

    /// The discard target only appears for items already placed in a term.
    pub fn offers_discard(&self) -> bool {
        !self.current.is_catalog_partition()
    }

    pub fn discard_label(&self) -> &'static str {
        if self.is_custom() {
            "Delete Class"
        } else {
            "Remove From List"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    Container(ContainerId),
    /// Return to origin partition, or delete a custom course.
    Discard,
}

impl From<ContainerId> for DropTarget {
    fn from(value: ContainerId) -> Self {
        DropTarget::Container(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HoldError {
    #[error("{0} is already held")]
    AlreadyHeld(Course),
    #[error("{0} is not placed in any container")]
    NotPlaced(Course),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub item: HeldItem,
    pub target: DropTarget,
    pub result: Result<Placement, MoveError>,
}

struct Hold {
    item: HeldItem,
    mode: HoldMode,
    _outside_click: Option<ScopedListener>,
}

pub struct SelectionController {
    listeners: Arc<dyn ListenerRegistry>,
    hold: Option<Hold>,
}

impl SelectionController {
    pub fn new(listeners: Arc<dyn ListenerRegistry>) -> Self {
        Self {
            listeners,
            hold: None,
        }
    }

    pub fn held(&self) -> Option<(&HeldItem, HoldMode)> {
        self.hold.as_ref().map(|hold| (&hold.item, hold.mode))
    }

    pub fn is_idle(&self) -> bool {
        self.hold.is_none()
    }

    pub fn begin_hold(
        &mut self,
        store: &PlacementStore,
        course: &Course,
        mode: HoldMode,
    ) -> Result<HeldItem, HoldError> {
        if let Some(hold) = &self.hold {
            return Err(HoldError::AlreadyHeld(hold.item.course.clone()));
        }
        let current = store
            .locate(course)
            .ok_or_else(|| HoldError::NotPlaced(course.clone()))?;
        let item = HeldItem {
            course: course.clone(),
            current,
            origin: store.origin_of(course),
        };
        let outside_click = match mode {
            HoldMode::Click => Some(ScopedListener::register(
                &self.listeners,
                ListenerScope::HeldItem,
            )),
            HoldMode::Drag => None,
        };
        debug!(course = %item.course, container = %item.current, ?mode, "began hold");
        self.hold = Some(Hold {
            item: item.clone(),
            mode,
            _outside_click: outside_click,
        });
        Ok(item)
    }

    /// Attempts the held move and returns to idle whatever the outcome.
    pub fn complete(
        &mut self,
        target: DropTarget,
        store: &mut PlacementStore,
    ) -> Option<Completion> {
        let hold = self.hold.take()?;
        let item = hold.item;
        let result = match target {
            DropTarget::Container(dest) => store
                .move_item(item.current, dest, &item.course)
                .map(|()| Placement::Moved(dest)),
            DropTarget::Discard => store.remove_from_origin(item.current, &item.course),
        };
        Some(Completion {
            item,
            target,
            result,
        })
    }

    pub fn cancel(&mut self) -> Option<HeldItem> {
        self.hold.take().map(|hold| hold.item)
    }

    /// A drag ended without a drop. Click-selections are unaffected.
    pub fn drag_end(&mut self) -> Option<HeldItem> {
        match self.hold.as_ref().map(|hold| hold.mode) {
            Some(HoldMode::Drag) => self.cancel(),
            _ => None,
        }
    }

    /// On touch screens the drag that started a tap never drops; keep the
    /// item held as a click-selection instead.
    pub fn touch_end(&mut self) -> bool {
        let Some(hold) = self.hold.as_mut() else {
            return false;
        };
        if hold.mode != HoldMode::Drag {
            return false;
        }
        hold.mode = HoldMode::Click;
        hold._outside_click = Some(ScopedListener::register(
            &self.listeners,
            ListenerScope::HeldItem,
        ));
        true
    }

    /// A click landed somewhere that is not a drop target.
    pub fn outside_click(&mut self) -> Option<HeldItem> {
        self.cancel()
    }
}

/// Open/closed state of the plan menu.
pub struct MenuController {
    listeners: Arc<dyn ListenerRegistry>,
    open: Option<ScopedListener>,
}

impl MenuController {
    pub fn new(listeners: Arc<dyn ListenerRegistry>) -> Self {
        Self {
            listeners,
            open: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Returns whether the menu is open afterwards.
    pub fn toggle(&mut self) -> bool {
        if self.open.take().is_none() {
            self.open = Some(ScopedListener::register(&self.listeners, ListenerScope::Menu));
        }
        self.is_open()
    }

    pub fn close(&mut self) {
        self.open = None;
    }

    /// Clicks inside the menu keep it open.
    pub fn outside_click(&mut self, inside_menu: bool) {
        if !inside_menu {
            self.close();
        }
    }
}

#[cfg(test)]
#[path = "tests/selection_tests.rs"]
mod tests;
