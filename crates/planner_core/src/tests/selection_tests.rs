use catalog::{ProgramCatalog, ProgramSelection};
use shared::domain::TermSlot;

use super::*;

const LOWER: ContainerId = ContainerId::Catalog(CatalogPartition::LowerDivision);
const UPPER: ContainerId = ContainerId::Catalog(CatalogPartition::UpperDivision);
const FA1: ContainerId = ContainerId::Term(TermSlot::Fall1);

fn fixture() -> (Arc<LocalListenerRegistry>, SelectionController, PlacementStore) {
    let catalog = ProgramCatalog::builtin().expect("catalog");
    let store = PlacementStore::fresh(&catalog, ProgramSelection::default_for(&catalog));
    let registry = Arc::new(LocalListenerRegistry::new());
    let listeners: Arc<dyn ListenerRegistry> = registry.clone();
    (registry, SelectionController::new(listeners), store)
}

fn cs61a() -> Course {
    Course::from("CS61A")
}

#[test]
fn click_hold_registers_one_listener_until_completion() {
    let (registry, mut controller, mut store) = fixture();

    let item = controller
        .begin_hold(&store, &cs61a(), HoldMode::Click)
        .expect("hold");
    assert_eq!(item.current, LOWER);
    assert_eq!(item.origin, Some(CatalogPartition::LowerDivision));
    assert!(registry.is_active(ListenerScope::HeldItem));
    assert_eq!(registry.active_count(), 1);

    let completion = controller
        .complete(DropTarget::Container(FA1), &mut store)
        .expect("held item");
    assert_eq!(completion.result, Ok(Placement::Moved(FA1)));
    assert!(controller.is_idle());
    assert_eq!(registry.active_count(), 0);
}

#[test]
fn rejected_completion_still_returns_to_idle() {
    let (registry, mut controller, mut store) = fixture();
    controller
        .begin_hold(&store, &cs61a(), HoldMode::Click)
        .expect("hold");

    let before = store.clone();
    let completion = controller
        .complete(DropTarget::Container(UPPER), &mut store)
        .expect("held item");
    assert!(matches!(completion.result, Err(MoveError::WrongOrigin { .. })));
    assert_eq!(store, before);
    assert!(controller.is_idle());
    assert_eq!(registry.active_count(), 0);
}

#[test]
fn cancel_and_outside_click_release_the_listener() {
    let (registry, mut controller, store) = fixture();

    controller
        .begin_hold(&store, &cs61a(), HoldMode::Click)
        .expect("hold");
    assert_eq!(controller.cancel().map(|item| item.course), Some(cs61a()));
    assert_eq!(registry.active_count(), 0);

    controller
        .begin_hold(&store, &cs61a(), HoldMode::Click)
        .expect("hold again");
    assert!(controller.outside_click().is_some());
    assert!(controller.is_idle());
    assert_eq!(registry.active_count(), 0);
}

#[test]
fn dropping_the_controller_releases_the_listener() {
    let (registry, mut controller, store) = fixture();
    controller
        .begin_hold(&store, &cs61a(), HoldMode::Click)
        .expect("hold");
    drop(controller);
    assert_eq!(registry.active_count(), 0);
}

#[test]
fn only_one_item_is_held_at_a_time() {
    let (registry, mut controller, store) = fixture();
    controller
        .begin_hold(&store, &cs61a(), HoldMode::Drag)
        .expect("drag");

    let err = controller
        .begin_hold(&store, &Course::from("CS61B"), HoldMode::Click)
        .expect_err("drag pending");
    assert_eq!(err, HoldError::AlreadyHeld(cs61a()));
    assert_eq!(controller.held().map(|(item, _)| item.course.clone()), Some(cs61a()));
    assert_eq!(registry.active_count(), 0);
}

#[test]
fn unplaced_course_cannot_be_held() {
    let (_, mut controller, store) = fixture();
    let err = controller
        .begin_hold(&store, &Course::from("NOWHERE1"), HoldMode::Drag)
        .expect_err("not placed");
    assert!(matches!(err, HoldError::NotPlaced(_)));
    assert!(controller.is_idle());
}

#[test]
fn drag_end_cancels_drags_but_not_click_selections() {
    let (_, mut controller, store) = fixture();

    controller
        .begin_hold(&store, &cs61a(), HoldMode::Click)
        .expect("click");
    assert!(controller.drag_end().is_none());
    assert!(!controller.is_idle());
    controller.cancel();

    controller
        .begin_hold(&store, &cs61a(), HoldMode::Drag)
        .expect("drag");
    assert!(controller.drag_end().is_some());
    assert!(controller.is_idle());
}

#[test]
fn touch_end_turns_a_drag_into_a_click_selection() {
    let (registry, mut controller, store) = fixture();
    controller
        .begin_hold(&store, &cs61a(), HoldMode::Drag)
        .expect("drag");
    assert_eq!(registry.active_count(), 0);

    assert!(controller.touch_end());
    assert_eq!(controller.held().map(|(_, mode)| mode), Some(HoldMode::Click));
    assert_eq!(registry.active_count(), 1);

    assert!(!controller.touch_end());
    assert_eq!(registry.active_count(), 1);
    assert!(controller.drag_end().is_none());

    controller.outside_click();
    assert_eq!(registry.active_count(), 0);
}

#[test]
fn discard_target_depends_on_current_container() {
    let (_, mut controller, mut store) = fixture();
    let item = controller
        .begin_hold(&store, &cs61a(), HoldMode::Click)
        .expect("hold");
    assert!(!item.offers_discard());
    assert_eq!(item.discard_label(), "Remove From List");
    controller.complete(DropTarget::Container(FA1), &mut store);

    let item = controller
        .begin_hold(&store, &cs61a(), HoldMode::Click)
        .expect("hold placed");
    assert!(item.offers_discard());
    let completion = controller
        .complete(DropTarget::Discard, &mut store)
        .expect("held item");
    assert_eq!(
        completion.result,
        Ok(Placement::ReturnedTo(CatalogPartition::LowerDivision))
    );

    let custom = store
        .add_custom_course(TermSlot::Fall1, "capstone")
        .expect("custom");
    let item = controller
        .begin_hold(&store, &custom, HoldMode::Drag)
        .expect("hold custom");
    assert!(item.is_custom());
    assert_eq!(item.discard_label(), "Delete Class");
    let completion = controller
        .complete(DropTarget::Discard, &mut store)
        .expect("held item");
    assert_eq!(completion.result, Ok(Placement::Deleted));
    assert_eq!(store.locate(&custom), None);
}

#[test]
fn menu_listener_follows_open_state() {
    let registry = Arc::new(LocalListenerRegistry::new());
    let listeners: Arc<dyn ListenerRegistry> = registry.clone();
    let mut menu = MenuController::new(listeners);

    assert!(menu.toggle());
    assert!(registry.is_active(ListenerScope::Menu));

    menu.outside_click(true);
    assert!(menu.is_open());

    menu.outside_click(false);
    assert!(!menu.is_open());
    assert_eq!(registry.active_count(), 0);

    assert!(menu.toggle());
    assert!(!menu.toggle());
    assert_eq!(registry.active_count(), 0);
}
