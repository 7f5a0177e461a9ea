mod config;

use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use catalog::{CatalogError, ProgramCatalog, ProgramSelection, SelectionError};
use clap::{Parser, Subcommand};
use config::{load_settings, prepare_database_url, DEFAULT_CONFIG_FILE};
use planner_core::{
    CustomCourseError, ImportError, ListenerRegistry, LocalListenerRegistry, MoveError,
    PlannerSession,
};
use shared::{
    domain::{ContainerId, Course, ProgramId, TermSlot},
    error::{Classified, PlannerError},
    protocol::{Notice, PlannerEvent},
};
use storage::Storage;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser, Debug)]
#[command(about = "Plan courses across eight terms")]
struct Args {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Overrides the configured database url.
    #[arg(long)]
    database_url: Option<String>,
    /// Primary program; repeat for a second major.
    #[arg(long = "major")]
    majors: Vec<String>,
    /// Secondary program; repeat for a second minor.
    #[arg(long = "minor")]
    minors: Vec<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every container of the current plan.
    Show,
    /// List the programs the selector can offer.
    Programs,
    /// Move a course to a container (`lower_division`, `fa1`, ...).
    Move { course: String, to: String },
    /// Report whether a move would be accepted.
    Check { course: String, to: String },
    /// Add a custom course to a term slot.
    Add { slot: String, name: String },
    /// Return a course to its catalog list, or delete a custom course.
    Remove { course: String },
    /// Move a course to a position inside its term slot.
    Reorder {
        slot: String,
        course: String,
        index: usize,
    },
    /// Switch programs, carrying the plan over when compatible.
    Select {
        #[arg(long = "to-major", required = true)]
        majors: Vec<String>,
        #[arg(long = "to-minor")]
        minors: Vec<String>,
    },
    /// Print a shareable link for the current plan.
    Link,
    /// Load the plan carried by a shared link.
    OpenLink { url: String },
    /// Write the plan document to a file, or stdout.
    Export { path: Option<PathBuf> },
    /// Replace the plan with a previously exported document.
    Import { path: PathBuf },
    /// Clear the plan for the current programs.
    Reset,
    /// List resources for the selected programs.
    Resources,
    /// List every cached plan.
    Plans,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = load_settings(&args.config);
    let filter =
        EnvFilter::try_new(&settings.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let catalog = Arc::new(match &settings.catalog_path {
        Some(path) => ProgramCatalog::from_path(path)?,
        None => ProgramCatalog::builtin()?,
    });

    let raw_database_url = args.database_url.as_deref().unwrap_or(&settings.database_url);
    let database_url = prepare_database_url(raw_database_url)?;
    let storage = Storage::new(&database_url)
        .await
        .with_context(|| format!("failed to open plan cache at '{database_url}'"))?;
    info!(%database_url, "plan cache ready");

    let link_base = Url::parse(&settings.link_base_url)
        .with_context(|| format!("invalid link base url '{}'", settings.link_base_url))?;
    let selection = if args.majors.is_empty() {
        ProgramSelection::default_for(&catalog)
    } else {
        ProgramSelection::new(&catalog, program_ids(&args.majors), program_ids(&args.minors))?
    };

    let listeners: Arc<dyn ListenerRegistry> = Arc::new(LocalListenerRegistry::new());
    let mut session = PlannerSession::open(
        Arc::clone(&catalog),
        Arc::new(storage.clone()),
        listeners,
        link_base,
        selection,
    )
    .await;
    let mut events = session.subscribe_events();

    let outcome = run(&mut session, &storage, args.command).await;
    print_events(&mut events);
    outcome.map_err(|err| match classify(&err) {
        Some(classified) => anyhow::Error::new(PlannerError::from_classified(classified)),
        None => err,
    })
}

/// Planner failures carry an error code; anything else is reported as is.
fn classify(err: &anyhow::Error) -> Option<&dyn Classified> {
    if let Some(err) = err.downcast_ref::<MoveError>() {
        return Some(err);
    }
    if let Some(err) = err.downcast_ref::<CustomCourseError>() {
        return Some(err);
    }
    if let Some(err) = err.downcast_ref::<SelectionError>() {
        return Some(err);
    }
    if let Some(err) = err.downcast_ref::<ImportError>() {
        return Some(err);
    }
    err.downcast_ref::<CatalogError>()
        .map(|err| err as &dyn Classified)
}

async fn run(session: &mut PlannerSession, storage: &Storage, command: Command) -> Result<()> {
    match command {
        Command::Show => print_plan(session),
        Command::Programs => {
            let catalog = session.catalog();
            println!("majors: {}", join_ids(&catalog.sorted_majors()));
            println!("minors: {}", join_ids(&catalog.sorted_minors()));
        }
        Command::Move { course, to } => {
            let course = Course::new(course);
            let source = locate(session, &course)?;
            session.move_item(source, parse_container(&to)?, &course).await?;
            print_plan(session);
        }
        Command::Check { course, to } => {
            let course = Course::new(course);
            let source = locate(session, &course)?;
            match session.can_move(source, parse_container(&to)?, &course) {
                Ok(()) => println!("{course}: {source} -> {to} accepted"),
                Err(err) => println!("{course}: {source} -> {to} rejected ({err})"),
            }
        }
        Command::Add { slot, name } => {
            let course = session.add_custom_course(parse_slot(&slot)?, &name).await?;
            println!("added {course} to {slot}");
        }
        Command::Remove { course } => {
            let course = Course::new(course);
            let source = locate(session, &course)?;
            let placement = session.remove_from_origin(source, &course).await?;
            println!("{course}: {placement:?}");
        }
        Command::Reorder {
            slot,
            course,
            index,
        } => {
            session
                .reorder(parse_slot(&slot)?, &Course::new(course), index)
                .await?;
            print_plan(session);
        }
        Command::Select { majors, minors } => {
            session
                .update_program_selection(program_ids(&majors), program_ids(&minors))
                .await?;
            print_plan(session);
        }
        Command::Link => {
            session.share_link();
        }
        Command::OpenLink { url } => {
            let url = Url::parse(&url).with_context(|| format!("invalid link '{url}'"))?;
            session.open_link(&url).await;
            print_plan(session);
        }
        Command::Export { path } => {
            let json = session.export_json()?;
            match path {
                Some(path) => {
                    tokio::fs::write(&path, json)
                        .await
                        .with_context(|| format!("failed to write '{}'", path.display()))?;
                    println!("exported plan to {}", path.display());
                }
                None => println!("{json}"),
            }
        }
        Command::Import { path } => {
            session.import_file(&path).await?;
            print_plan(session);
        }
        Command::Reset => {
            session.reset().await;
            print_plan(session);
        }
        Command::Resources => {
            for program in session.resources() {
                println!("{} ({})", program.name, program.program);
                for resource in program.resources {
                    println!("  {}: {}", resource.title, resource.link);
                    println!("    {}", resource.description);
                }
            }
        }
        Command::Plans => {
            for plan in storage.list_cached_plans().await? {
                println!("{}  {}", plan.updated_at.to_rfc3339(), plan.cache_key);
            }
        }
    }
    Ok(())
}

fn program_ids(raw: &[String]) -> Vec<ProgramId> {
    raw.iter().map(|id| ProgramId::new(id.as_str())).collect()
}

fn join_ids(ids: &[ProgramId]) -> String {
    ids.iter().map(ProgramId::as_str).collect::<Vec<_>>().join(", ")
}

fn parse_container(label: &str) -> Result<ContainerId> {
    ContainerId::parse(label).ok_or_else(|| anyhow!("unknown container '{label}'"))
}

fn parse_slot(key: &str) -> Result<TermSlot> {
    TermSlot::from_key(key).ok_or_else(|| anyhow!("unknown term slot '{key}'"))
}

fn locate(session: &PlannerSession, course: &Course) -> Result<ContainerId> {
    session
        .store()
        .locate(course)
        .ok_or_else(|| anyhow!("{course} is not part of the plan"))
}

fn print_plan(session: &PlannerSession) {
    let selection = session.program_selection();
    println!(
        "programs: {} | {}",
        join_ids(selection.primaries()),
        join_ids(selection.secondaries())
    );
    for container in ContainerId::ALL {
        let courses = session.store().container(container);
        let names: Vec<&str> = courses.iter().map(Course::as_str).collect();
        println!("{:>17}: {}", container.label(), names.join(", "));
    }
}

fn print_events(events: &mut broadcast::Receiver<PlannerEvent>) {
    loop {
        match events.try_recv() {
            Ok(PlannerEvent::Notice(notice)) => print_notice(&notice),
            Ok(PlannerEvent::ProgramSelectionChanged {
                primaries,
                secondaries,
            }) => println!(
                "selection now {} | {}",
                join_ids(&primaries),
                join_ids(&secondaries)
            ),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
}

fn print_notice(notice: &Notice) {
    let message = match notice {
        Notice::InvalidMove { course, reason } => format!("cannot move {course}: {reason}"),
        Notice::CapacityExceeded { slot } => format!("{slot} is full"),
        Notice::DuplicateCustomCourse { course } => format!("{course} is already in the plan"),
        Notice::InvalidCourseText { message } => message.clone(),
        Notice::MalformedLink { details } => format!("link was damaged: {}", details.join("; ")),
        Notice::ImportRejected { reason } => format!("import rejected: {reason}"),
        Notice::ImportSucceeded => "import succeeded".to_string(),
        Notice::LinkCopied { url } => url.clone(),
    };
    match notice.error_code() {
        Some(code) => eprintln!("[{code:?}] {message}"),
        None => println!("{message}"),
    }
}
