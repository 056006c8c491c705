use clap::{Parser, Subcommand};
use serde::Serialize;

use traffic_sync::api::{ApiClient, ApiError};
use traffic_sync::config::ApiConfig;
use traffic_sync::journey::{JourneyId, RouteId};
use traffic_sync::traffic::IntersectionId;

#[derive(Parser)]
#[command(name = "traffic-cli")]
#[command(about = "Query CLI for the traffic server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    /// Request timeout in seconds.
    #[arg(short, long, default_value_t = 10)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health
    Health,
    /// List intersections with their latest traffic
    Intersections,
    /// Show latest traffic for every intersection
    Traffic,
    /// Compute a route between two intersections
    Route {
        source: String,
        destination: String,
        /// Shortest distance instead of fastest time
        #[arg(long)]
        shortest: bool,
        /// Ignore congestion when computing the fastest route
        #[arg(long)]
        ignore_congestion: bool,
    },
    /// Start a journey on a computed route
    Start {
        route_id: u64,
        /// Comma-separated intersection ids
        #[arg(value_delimiter = ',')]
        path: Vec<String>,
    },
    /// Answer a pending route-change suggestion
    Respond {
        journey_id: u64,
        #[arg(long, conflicts_with = "decline")]
        accept: bool,
        #[arg(long)]
        decline: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = ApiClient::new(&ApiConfig {
        base_url: cli.url,
        request_timeout_secs: cli.timeout,
    })?;

    match cli.command {
        Commands::Health => print_result(client.health().await)?,
        Commands::Intersections => print_result(client.intersections().await)?,
        Commands::Traffic => print_result(client.traffic_all().await)?,
        Commands::Route {
            source,
            destination,
            shortest,
            ignore_congestion,
        } => {
            let (source, destination) = (IntersectionId::from(source), IntersectionId::from(destination));
            let result = if shortest {
                client.shortest_route(&source, &destination).await
            } else {
                client
                    .fastest_route(&source, &destination, !ignore_congestion)
                    .await
            };
            print_result(result)?
        }
        Commands::Start { route_id, path } => {
            let path: Vec<IntersectionId> = path.into_iter().map(IntersectionId::from).collect();
            match client.start_journey(RouteId(route_id), &path).await {
                Ok(started) => {
                    println!("journey {} started", started.journey_id);
                    println!("{}", serde_json::to_string_pretty(&started.data)?);
                }
                Err(e) => report(e),
            }
        }
        Commands::Respond {
            journey_id,
            accept,
            decline,
        } => {
            if !accept && !decline {
                eprintln!("Error: pass --accept or --decline");
                std::process::exit(2);
            }
            match client.respond_route_change(JourneyId(journey_id), accept).await {
                Ok(resp) => println!("route change {}", resp.response),
                Err(e) => report(e),
            }
        }
    }

    Ok(())
}

fn print_result<T: Serialize>(result: Result<T, ApiError>) -> Result<(), Box<dyn std::error::Error>> {
    match result {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(e) => report(e),
    }
    Ok(())
}

fn report(e: ApiError) {
    eprintln!("Error: {}", e);
    std::process::exit(1);
}
