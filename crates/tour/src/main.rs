use std::{error::Error, fs::File, path::PathBuf, process::ExitCode, sync::Arc};

use backend::BackendClient;
use clap::{Parser, ValueEnum};
use directions::client::{DirectionsClient, DirectionsCredentials};
use model::{itinerary::Itinerary, transport::TransportMode, WithId};
use navigation::{
    directions::DirectionsProvider,
    progress::{
        Credentials, GuestProgressStore, GuestSession, Identity, ProgressStore,
        ScopedProgressStore,
    },
    sites::SiteSource,
    NavigationConfig, NavigationSession, SessionEvent, SessionParts,
};
use tokio::sync::mpsc::UnboundedReceiver;
use utility::id::Id;

mod replay;
mod sources;

use replay::ReplaySource;
use sources::{FileSites, LogAnnouncer, NoDirections};

type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Choice {
    Resume,
    Restart,
}

/// Replays a recorded GPS trace through a navigation session.
#[derive(Parser)]
#[command(name = "tour", version)]
struct Cli {
    /// Itinerary to navigate.
    itinerary: String,

    /// CSV with `timestamp,latitude,longitude,heading,accuracy` columns,
    /// timestamps in milliseconds.
    #[arg(long)]
    trace: PathBuf,

    /// Read the itinerary from a JSON file instead of the backend.
    #[arg(long)]
    sites: Option<PathBuf>,

    #[arg(long, default_value = "walking")]
    mode: TransportMode,

    /// Answer to the resume prompt when saved progress exists.
    #[arg(long, value_enum, default_value_t = Choice::Resume)]
    choice: Choice,

    /// Confirm every arrival as a visit.
    #[arg(long)]
    auto_confirm: bool,

    /// Replay speed relative to the recording. 0 replays without pauses.
    #[arg(long, default_value_t = 10.0)]
    speed: f64,

    #[arg(long, env = "BACKEND_URL")]
    backend_url: Option<String>,

    #[arg(long, env = "TOUR_USER_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(why) => {
            log::error!("{}", why);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), BoxError> {
    let config = NavigationConfig::from_env()?;
    let rows = replay::read_trace(File::open(&cli.trace)?)?;
    log::info!("Loaded {} positions from {}.", rows.len(), cli.trace.display());
    let source = ReplaySource::new(rows, cli.speed);
    let finished = source.finished();

    let backend = cli.backend_url.as_deref().map(BackendClient::new).map(Arc::new);

    /* itinerary */
    let sites: Arc<dyn SiteSource> = match (&cli.sites, &backend) {
        (Some(path), _) => Arc::new(FileSites::new(path.clone())),
        (None, Some(backend)) => backend.clone(),
        (None, None) => return Err("either --sites or BACKEND_URL is required".into()),
    };
    let itinerary_id: Id<Itinerary> = Id::new(cli.itinerary.clone());
    let itinerary = sites.itinerary(&itinerary_id).await?;
    log::info!("Touring '{}' with {} sites.", itinerary.name, itinerary.sites.len());

    /* progress */
    let guest = GuestProgressStore::new();
    let identity = match cli.token.clone() {
        Some(token) => Identity::Authenticated(Credentials::new(token)),
        None => Identity::Guest(GuestSession::new()),
    };
    let store: Arc<dyn ProgressStore> = match (&identity, &backend) {
        (_, Some(backend)) => Arc::new(ScopedProgressStore::new(backend.clone(), guest.clone())),
        (Identity::Guest(_), None) => Arc::new(guest.clone()),
        (Identity::Authenticated(_), None) => {
            return Err("TOUR_USER_TOKEN needs BACKEND_URL".into())
        }
    };

    /* directions */
    let directions: Arc<dyn DirectionsProvider> = match DirectionsCredentials::from_env() {
        Ok(credentials) => Arc::new(DirectionsClient::new(&credentials)?),
        Err(why) => {
            log::warn!("{}, routes will be straight lines", why);
            Arc::new(NoDirections)
        }
    };

    let parts = SessionParts {
        itinerary: WithId::new(itinerary_id, itinerary),
        identity: identity.clone(),
        store,
        directions,
        announcer: Arc::new(LogAnnouncer),
        config,
        mode: cli.mode,
    };

    log::info!("Starting session for {}.", identity);
    let (session, mut events) = NavigationSession::start(parts, &source).await?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    if handle(&session, &cli, event).await {
                        break;
                    }
                }
                None => break,
            },
            _ = finished.cancelled() => {
                log::info!("Trace exhausted.");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted.");
                break;
            }
        }
    }

    let progress = session.end().await?;
    drain(&mut events);
    log::info!(
        "Session ended: {} visited, {} skipped of {}.",
        progress.visited.len(),
        progress.skipped.len(),
        progress.optimized_order.len()
    );

    if let Identity::Guest(session) = identity {
        guest.end_session(session).await;
    }
    Ok(())
}

/// Reacts to one session event the way a user would. `true` ends the replay.
async fn handle(session: &NavigationSession, cli: &Cli, event: SessionEvent) -> bool {
    match event {
        SessionEvent::ResumePrompt {
            visited,
            skipped,
            total,
        } => {
            log::info!(
                "Saved progress: {} visited, {} skipped of {}. Choosing {:?}.",
                visited,
                skipped,
                total,
                cli.choice
            );
            let answer = match cli.choice {
                Choice::Resume => session.resume().await,
                Choice::Restart => session.restart().await,
            };
            if let Err(why) = answer {
                log::warn!("{}", why);
            }
        }
        SessionEvent::ArrivedAtSite(site) => {
            log::info!("Arrived at {}.", site);
            if cli.auto_confirm {
                match session.next().await {
                    Ok(phase) => log::info!("Confirmed visit, now {:?}.", phase),
                    Err(why) => log::warn!("{}", why),
                }
            }
        }
        SessionEvent::Completed => {
            log::info!("Tour completed.");
            return true;
        }
        other => log_event(&other),
    }
    false
}

fn log_event(event: &SessionEvent) {
    match event {
        SessionEvent::Started { order } => log::info!("Planned {} stops.", order.len()),
        SessionEvent::ActiveSiteChanged { index, site } => {
            log::info!("Stop {}: {}.", index + 1, site)
        }
        SessionEvent::RouteUpdated(route) => log::info!(
            "Route to {} via {:?}: {:.0} m, {:.0} min, arriving {}.",
            route.target,
            route.source,
            route.distance_meters,
            route.eta_seconds / 60.0,
            route.arrival_clock_time.format("%H:%M")
        ),
        SessionEvent::StepChanged { index, instruction } => {
            log::info!("Step {}: {}", index + 1, instruction)
        }
        SessionEvent::PositionUnavailable(why) => log::warn!("Position unavailable: {:?}", why),
        other => log::debug!("{:?}", other),
    }
}

fn drain(events: &mut UnboundedReceiver<SessionEvent>) {
    while let Ok(event) = events.try_recv() {
        log_event(&event);
    }
}
