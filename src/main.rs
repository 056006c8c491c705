//! traffic-sync: real-time traffic client.
//!
//! Streams intersection traffic, monitors a journey for congestion and asks
//! on stdin whether to take a reroute when the path gets congested.
//!
//! ```text
//! traffic-sync --config sync.toml --from 1 --to 9
//! traffic-sync --journey-id 12 --route-id 12 --path 1,4,9
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use traffic_sync::api::ApiClient;
use traffic_sync::config::{self, SyncConfig};
use traffic_sync::journey::{plan_journey, ActiveJourney, JourneyId, MonitorEvent, RouteId};
use traffic_sync::lifecycle::{wait_for_signal, SyncRuntime};
use traffic_sync::negotiation::{NegotiationEvent, Outcome, RerouteNegotiator};
use traffic_sync::observability::{logging, metrics};
use traffic_sync::stream::ConnectionEvent;
use traffic_sync::traffic::IntersectionId;

#[derive(Parser, Debug)]
#[command(name = "traffic-sync")]
#[command(about = "Real-time traffic sync and reroute client", long_about = None)]
struct Args {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Plan a route from this intersection.
    #[arg(long, requires = "to", conflicts_with = "journey_id")]
    from: Option<String>,

    /// Plan a route to this intersection.
    #[arg(long, requires = "from")]
    to: Option<String>,

    /// Monitor an already started journey.
    #[arg(long, requires_all = ["route_id", "path"])]
    journey_id: Option<u64>,

    #[arg(long)]
    route_id: Option<u64>,

    /// Comma-separated intersection ids of the journey.
    #[arg(long, value_delimiter = ',')]
    path: Option<Vec<String>>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config: SyncConfig = config::load_or_default(args.config.as_deref())?;

    logging::init(&config.observability);
    tracing::info!("traffic-sync v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let runtime = SyncRuntime::start(config)?;

    tokio::spawn(report_connection(runtime.connection.subscribe_events()));
    tokio::spawn(report_monitor(runtime.monitor.subscribe()));
    tokio::spawn(report_negotiation(runtime.negotiator.subscribe()));
    tokio::spawn(read_answers(runtime.negotiator.clone()));
    if let Some(accepts) = runtime.negotiator.take_accept_receiver() {
        tokio::spawn(runtime.journey_control().run(accepts));
    }

    if let Some(journey) = initial_journey(&args, &runtime.api).await {
        runtime.monitor.start(journey);
    } else {
        tracing::info!("No journey given, streaming traffic only");
    }

    wait_for_signal().await;
    runtime.shutdown().await;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn initial_journey(args: &Args, api: &ApiClient) -> Option<ActiveJourney> {
    if let (Some(journey_id), Some(route_id), Some(path)) =
        (args.journey_id, args.route_id, args.path.as_ref())
    {
        let path = path.iter().map(|id| IntersectionId::from(id.trim())).collect();
        return match ActiveJourney::new(JourneyId(journey_id), RouteId(route_id), path) {
            Ok(journey) => Some(journey),
            Err(e) => {
                tracing::error!(error = %e, "Cannot monitor journey");
                None
            }
        };
    }

    let (from, to) = (args.from.as_deref()?, args.to.as_deref()?);
    match plan_journey(api, &IntersectionId::from(from), &IntersectionId::from(to)).await {
        Ok(journey) => Some(journey),
        Err(e) => {
            tracing::error!(from, to, error = %e, "Failed to plan journey");
            None
        }
    }
}

/// y/n answers from stdin.
async fn read_answers(negotiator: RerouteNegotiator) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stdin");
                return;
            }
        };
        let accept = match line.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => true,
            "n" | "no" => false,
            _ => continue,
        };
        if negotiator.respond(accept).is_none() {
            println!("No reroute is waiting for an answer.");
        }
    }
}

async fn report_connection(mut events: tokio::sync::broadcast::Receiver<ConnectionEvent>) {
    loop {
        match events.recv().await {
            Ok(ConnectionEvent::Connected { transport }) => {
                println!("● live traffic connected ({})", transport)
            }
            Ok(ConnectionEvent::Disconnected { reason, .. }) => {
                println!("○ live traffic disconnected: {}", reason)
            }
            Ok(ConnectionEvent::ReconnectScheduled { after }) => {
                tracing::debug!(after_ms = after.as_millis() as u64, "Reconnect scheduled")
            }
            Err(RecvError::Lagged(n)) => tracing::debug!(skipped = n, "Connection events lagged"),
            Err(RecvError::Closed) => return,
        }
    }
}

async fn report_monitor(mut events: tokio::sync::broadcast::Receiver<MonitorEvent>) {
    loop {
        match events.recv().await {
            Ok(MonitorEvent::Sampled { journey_id, samples }) => {
                let line = samples
                    .iter()
                    .map(|s| format!("{}:{:.0}%", s.intersection, s.congestion))
                    .collect::<Vec<_>>()
                    .join(" ");
                println!("journey {}  {}", journey_id, line);
            }
            Ok(MonitorEvent::RerouteTriggered {
                intersection,
                congestion,
                ..
            }) => {
                println!(
                    "⚠ heavy traffic at intersection {} ({:.1}%)",
                    intersection, congestion
                );
            }
            Ok(MonitorEvent::QueryFailed { .. }) => {}
            Err(RecvError::Lagged(n)) => tracing::debug!(skipped = n, "Monitor events lagged"),
            Err(RecvError::Closed) => return,
        }
    }
}

async fn report_negotiation(mut events: tokio::sync::broadcast::Receiver<NegotiationEvent>) {
    loop {
        match events.recv().await {
            Ok(NegotiationEvent::Opened { deadline, .. }) => {
                let secs = deadline
                    .saturating_duration_since(tokio::time::Instant::now())
                    .as_secs_f64();
                println!("Take a faster route? [y/n] ({:.0}s to answer)", secs.ceil());
            }
            Ok(NegotiationEvent::Closed { outcome, .. }) => match outcome {
                Outcome::Accepted => println!("Recalculating route..."),
                Outcome::Declined => println!("Keeping current route."),
                Outcome::TimedOut => println!("No answer, keeping current route."),
                Outcome::Pending => {}
            },
            Err(RecvError::Lagged(n)) => tracing::debug!(skipped = n, "Negotiation events lagged"),
            Err(RecvError::Closed) => return,
        }
    }
}
