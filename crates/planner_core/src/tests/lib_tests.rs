use shared::domain::CatalogPartition;
use storage::MemoryPlanCache;
use tokio::sync::broadcast::error::TryRecvError;

use super::*;

const LOWER: ContainerId = ContainerId::Catalog(CatalogPartition::LowerDivision);
const UPPER: ContainerId = ContainerId::Catalog(CatalogPartition::UpperDivision);
const FA1: ContainerId = ContainerId::Term(TermSlot::Fall1);

fn ids(raw: &[&str]) -> Vec<ProgramId> {
    raw.iter().map(|id| ProgramId::from(*id)).collect()
}

fn link_base() -> Url {
    Url::parse("https://planner.example/").expect("url")
}

async fn open_session(cache: Arc<MemoryPlanCache>) -> PlannerSession {
    let catalog = Arc::new(ProgramCatalog::builtin().expect("catalog"));
    let selection = ProgramSelection::default_for(&catalog);
    let listeners: Arc<dyn ListenerRegistry> = Arc::new(LocalListenerRegistry::new());
    PlannerSession::open(catalog, cache, listeners, link_base(), selection).await
}

fn drain(rx: &mut broadcast::Receiver<PlannerEvent>) -> Vec<PlannerEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return events,
            Err(TryRecvError::Lagged(_)) => continue,
        }
    }
}

async fn cached_slots(cache: &MemoryPlanCache, key: &str) -> Option<TermSlotLists> {
    let raw = cache.load_plan(key).await.expect("load")?;
    Some(serde_json::from_str(&raw).expect("cached document"))
}

#[tokio::test]
async fn every_move_is_written_to_the_cache() {
    let cache = Arc::new(MemoryPlanCache::new());
    let mut session = open_session(cache.clone()).await;
    let cs61a = Course::from("CS61A");

    session.move_item(LOWER, FA1, &cs61a).await.expect("move");
    let cached = cached_slots(&cache, r#"["COMPSCI"];[]"#)
        .await
        .expect("cache written");
    assert_eq!(cached.fa1, vec![cs61a.clone()]);

    session
        .add_custom_course(TermSlot::Fall1, "seminar")
        .await
        .expect("custom");
    let cached = cached_slots(&cache, r#"["COMPSCI"];[]"#).await.expect("cache");
    assert_eq!(cached, session.store().term_slots());
}

#[tokio::test]
async fn reopening_restores_the_cached_plan() {
    let cache = Arc::new(MemoryPlanCache::new());
    let mut session = open_session(cache.clone()).await;
    session
        .move_item(LOWER, FA1, &Course::from("CS61A"))
        .await
        .expect("move");
    drop(session);

    let session = open_session(cache).await;
    assert_eq!(session.store().locate(&Course::from("CS61A")), Some(FA1));
    assert!(!session.store().container(LOWER).contains(&Course::from("CS61A")));
}

#[tokio::test]
async fn malformed_cache_entry_opens_a_fresh_plan() {
    let cache = Arc::new(MemoryPlanCache::new());
    cache.insert_raw(r#"["COMPSCI"];[]"#, "{ truncated").await;

    let session = open_session(cache).await;
    assert!(session.store().term_slots().is_empty());
    assert!(session.store().container(LOWER).contains(&Course::from("CS61A")));
}

#[tokio::test]
async fn failed_cache_write_does_not_fail_the_move() {
    let cache = Arc::new(MemoryPlanCache::rejecting_writes());
    let mut session = open_session(cache.clone()).await;

    session
        .move_item(LOWER, FA1, &Course::from("CS61A"))
        .await
        .expect("move succeeds");
    assert_eq!(session.store().container(FA1), [Course::from("CS61A")]);
    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn rejected_moves_notify_except_no_ops() {
    let mut session = open_session(Arc::new(MemoryPlanCache::new())).await;
    let mut rx = session.subscribe_events();
    let cs61a = Course::from("CS61A");

    let err = session
        .move_item(LOWER, UPPER, &cs61a)
        .await
        .expect_err("wrong origin");
    assert!(matches!(err, MoveError::WrongOrigin { .. }));
    assert!(session
        .move_item(LOWER, LOWER, &cs61a)
        .await
        .is_err());

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        PlannerEvent::Notice(Notice::InvalidMove { course, .. }) if *course == cs61a
    ));
}

#[tokio::test]
async fn custom_course_errors_are_surfaced() {
    let mut session = open_session(Arc::new(MemoryPlanCache::new())).await;
    let mut rx = session.subscribe_events();

    assert!(session.add_custom_course(TermSlot::Fall1, "CS61A").await.is_err());
    assert!(session.add_custom_course(TermSlot::Fall1, "C++").await.is_err());

    let events = drain(&mut rx);
    assert!(matches!(
        &events[..],
        [
            PlannerEvent::Notice(Notice::DuplicateCustomCourse { .. }),
            PlannerEvent::Notice(Notice::InvalidCourseText { .. }),
        ]
    ));
}

#[tokio::test]
async fn held_click_selection_completes_and_persists() {
    let cache = Arc::new(MemoryPlanCache::new());
    let mut session = open_session(cache.clone()).await;
    let cs61a = Course::from("CS61A");

    session.begin_hold(&cs61a, HoldMode::Click).expect("hold");
    let completion = session
        .complete_hold(DropTarget::Container(FA1))
        .await
        .expect("held");
    assert_eq!(completion.result, Ok(Placement::Moved(FA1)));
    assert!(session.held().is_none());

    let cached = cached_slots(&cache, r#"["COMPSCI"];[]"#).await.expect("cache");
    assert_eq!(cached.fa1, vec![cs61a]);
    assert!(session.complete_hold(DropTarget::Discard).await.is_none());
}

#[tokio::test]
async fn compatible_selection_change_keeps_term_slots() {
    let cache = Arc::new(MemoryPlanCache::new());
    let mut session = open_session(cache.clone()).await;
    let cs61a = Course::from("CS61A");
    session.move_item(LOWER, FA1, &cs61a).await.expect("move");

    session
        .update_program_selection(ids(&["COMPSCI", "DATA"]), Vec::new())
        .await
        .expect("append major");
    assert_eq!(session.store().locate(&cs61a), Some(FA1));
    assert!(!session.store().container(LOWER).contains(&cs61a));
    let cached = cached_slots(&cache, r#"["COMPSCI","DATA"];[]"#)
        .await
        .expect("written under new key");
    assert_eq!(cached.fa1, vec![cs61a]);
}

#[tokio::test]
async fn incompatible_selection_change_uses_cached_plan_or_fresh_state() {
    let cache = Arc::new(MemoryPlanCache::new());
    cache
        .insert_raw(r#"["MATH"];[]"#, r#"{"sp1":["MATH53"]}"#)
        .await;
    let mut session = open_session(cache.clone()).await;
    session
        .move_item(LOWER, FA1, &Course::from("CS61A"))
        .await
        .expect("move");

    session
        .update_program_selection(ids(&["MATH"]), Vec::new())
        .await
        .expect("math");
    assert_eq!(session.store().locate(&Course::from("CS61A")), None);
    assert_eq!(
        session.store().locate(&Course::from("MATH53")),
        Some(ContainerId::Term(TermSlot::Spring1))
    );

    session
        .update_program_selection(ids(&["ECON"]), Vec::new())
        .await
        .expect("econ");
    assert!(session.store().term_slots().is_empty());
}

#[tokio::test]
async fn invalid_selection_change_leaves_plan_untouched() {
    let mut session = open_session(Arc::new(MemoryPlanCache::new())).await;
    let before = session.store().clone();

    let err = session
        .update_program_selection(ids(&["COMPSCI", "DATA", "MATH"]), Vec::new())
        .await
        .expect_err("too many majors");
    assert!(matches!(err, SelectionError::TooManyPrimaries { .. }));
    assert_eq!(session.store(), &before);
}

#[tokio::test]
async fn failed_import_leaves_state_untouched() {
    let mut session = open_session(Arc::new(MemoryPlanCache::new())).await;
    session
        .move_item(LOWER, FA1, &Course::from("CS61A"))
        .await
        .expect("move");
    let before = session.store().clone();
    let mut rx = session.subscribe_events();

    let err = session
        .import_bytes(br#"{"secondaries": [], "fa1": ["CS61B"]}"#)
        .await
        .expect_err("missing primaries");
    assert!(matches!(err, ImportError::MissingPrimaries));
    assert_eq!(session.store(), &before);
    assert!(matches!(
        &drain(&mut rx)[..],
        [PlannerEvent::Notice(Notice::ImportRejected { .. })]
    ));
}

#[tokio::test]
async fn successful_import_replaces_plan_and_announces_selection() {
    let cache = Arc::new(MemoryPlanCache::new());
    let mut session = open_session(cache.clone()).await;
    let mut rx = session.subscribe_events();

    session
        .import_bytes(br#"{"primaries": ["DATA"], "secondaries": ["MUSIC"], "fa1": ["DATA8"]}"#)
        .await
        .expect("import");
    assert_eq!(session.program_selection().primaries(), ids(&["DATA"]).as_slice());
    assert_eq!(session.store().locate(&Course::from("DATA8")), Some(FA1));

    let events = drain(&mut rx);
    assert_eq!(
        events,
        vec![
            PlannerEvent::ProgramSelectionChanged {
                primaries: ids(&["DATA"]),
                secondaries: ids(&["MUSIC"]),
            },
            PlannerEvent::Notice(Notice::ImportSucceeded),
        ]
    );
    assert!(cached_slots(&cache, r#"["DATA"];["MUSIC"]"#).await.is_some());
}

#[tokio::test]
async fn missing_import_file_is_rejected() {
    let mut session = open_session(Arc::new(MemoryPlanCache::new())).await;
    let path = std::env::temp_dir().join("planner-core-missing-import.json");
    let err = session.import_file(&path).await.expect_err("missing file");
    assert!(matches!(err, ImportError::Read { .. }));
}

#[tokio::test]
async fn import_file_reads_an_exported_document() {
    let mut session = open_session(Arc::new(MemoryPlanCache::new())).await;
    session
        .move_item(LOWER, FA1, &Course::from("CS61A"))
        .await
        .expect("move");
    let json = session.export_json().expect("export");

    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = std::env::temp_dir().join(format!("planner-core-export-{nanos}.json"));
    tokio::fs::write(&path, json).await.expect("write export");

    let mut other = open_session(Arc::new(MemoryPlanCache::new())).await;
    other.import_file(&path).await.expect("import");
    assert_eq!(other.store(), session.store());
    let _ = tokio::fs::remove_file(&path).await;
}

#[tokio::test]
async fn share_and_open_link_round_trip() {
    let mut session = open_session(Arc::new(MemoryPlanCache::new())).await;
    session
        .move_item(LOWER, FA1, &Course::from("CS61A"))
        .await
        .expect("move");
    let mut rx = session.subscribe_events();
    let url = session.share_link();
    assert!(matches!(
        &drain(&mut rx)[..],
        [PlannerEvent::Notice(Notice::LinkCopied { .. })]
    ));

    let mut other = open_session(Arc::new(MemoryPlanCache::new())).await;
    let mut rx = other.subscribe_events();
    let malformed = other.open_link(&url).await;
    assert!(malformed.is_empty());
    assert_eq!(other.store(), session.store());
    assert!(matches!(
        &drain(&mut rx)[..],
        [PlannerEvent::ProgramSelectionChanged { .. }]
    ));
}

#[tokio::test]
async fn damaged_link_is_reported() {
    let mut session = open_session(Arc::new(MemoryPlanCache::new())).await;
    let mut rx = session.subscribe_events();
    let url = Url::parse("https://planner.example/?primaries=not*base64").expect("url");

    let malformed = session.open_link(&url).await;
    assert!(!malformed.is_empty());
    assert_eq!(session.program_selection(), &ProgramSelection::default_for(session.catalog()));
    let events = drain(&mut rx);
    assert!(matches!(events[0], PlannerEvent::Notice(Notice::MalformedLink { .. })));
    assert!(matches!(events[1], PlannerEvent::ProgramSelectionChanged { .. }));
}

#[tokio::test]
async fn damaged_link_keeps_the_saved_default_plan() {
    let cache = Arc::new(MemoryPlanCache::new());
    let mut session = open_session(cache.clone()).await;
    session
        .move_item(LOWER, FA1, &Course::from("CS61A"))
        .await
        .expect("move");
    let key = r#"["COMPSCI"];[]"#;

    let url = Url::parse("https://planner.example/?primaries=!!!garbage").expect("url");
    let malformed = session.open_link(&url).await;
    assert!(!malformed.is_empty());

    let cached = cached_slots(&cache, key).await.expect("cache entry kept");
    assert_eq!(cached.fa1, vec![Course::from("CS61A")]);
    assert_eq!(session.store().container(FA1), [Course::from("CS61A")]);
}

#[tokio::test]
async fn reset_clears_cached_plan_and_term_slots() {
    let cache = Arc::new(MemoryPlanCache::new());
    let mut session = open_session(cache.clone()).await;
    session
        .move_item(LOWER, FA1, &Course::from("CS61A"))
        .await
        .expect("move");
    assert_eq!(cache.len().await, 1);

    session.reset().await;
    assert!(session.store().term_slots().is_empty());
    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn resources_follow_current_selection() {
    let mut session = open_session(Arc::new(MemoryPlanCache::new())).await;
    session
        .update_program_selection(ids(&["COMPSCI"]), ids(&["MUSIC"]))
        .await
        .expect("minor");
    let programs: Vec<_> = session
        .resources()
        .into_iter()
        .map(|r| r.program.to_string())
        .collect();
    assert_eq!(programs, ["COMPSCI", "MUSIC"]);
}
