//! Command-line front end for the route server.

use anyhow::Result;
use clap::{Parser, Subcommand};
use route_cli::{format_days, parse_coordinate, RouteClient};
use route_core::Coordinate;
use serde_json::Value;

/// Query terrain-aware routes and road paths from a route server
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Route server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute a route and its travel times
    Route {
        /// Start position as LON,LAT
        #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
        from: Coordinate,
        /// End position as LON,LAT
        #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
        to: Coordinate,
        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },
    /// List the configured travel modes
    Modes,
    /// Classify the terrain at one position
    Terrain {
        /// Position as LON,LAT
        #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
        at: Coordinate,
    },
    /// Show road network status, optionally rebuilding it first
    Roads {
        /// Rebuild the graph from the map
        #[arg(long)]
        reload: bool,
        /// Drop the persisted graph
        #[arg(long, conflicts_with = "reload")]
        clear_cache: bool,
    },
    /// Find the shortest road path between two positions
    Path {
        #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
        from: Coordinate,
        #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
        to: Coordinate,
        /// Maximum distance from an endpoint to its road node, in km
        #[arg(long)]
        max_snap_km: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let client = RouteClient::new(&args.url);

    match args.command {
        Command::Route { from, to, json } => {
            let route = client.route(from, to).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&route)?);
            } else {
                print_route(&route);
            }
        }
        Command::Modes => {
            let modes = client.travel_modes().await?;
            for mode in modes.as_array().into_iter().flatten() {
                println!(
                    "{:<8} {:<12} land {:>5} km/day  water {:>5} km/day",
                    mode["id"].as_str().unwrap_or("?"),
                    mode["name"].as_str().unwrap_or("?"),
                    mode["land_speed_km_per_day"].as_f64().unwrap_or(0.0),
                    mode["water_speed_km_per_day"].as_f64().unwrap_or(0.0),
                );
            }
        }
        Command::Terrain { at } => {
            let probe = client.terrain(at).await?;
            println!("Terrain at {}: {}", at, probe["category"].as_str().unwrap_or("?"));
            println!(
                "  Region heuristic: {}",
                probe["fallback_category"].as_str().unwrap_or("?")
            );
        }
        Command::Roads {
            reload,
            clear_cache,
        } => {
            if clear_cache {
                client.clear_road_cache().await?;
                println!("Road graph cache cleared");
            }
            let status = if reload {
                client.reload_roads().await?
            } else {
                client.road_status().await?
            };
            let stats = &status["stats"];
            println!(
                "Road network: {} ({} nodes, {} edges, avg degree {:.2})",
                if status["loaded"].as_bool().unwrap_or(false) {
                    "loaded"
                } else {
                    "not loaded"
                },
                stats["nodes"].as_u64().unwrap_or(0),
                stats["edges"].as_u64().unwrap_or(0),
                stats["avg_degree"].as_f64().unwrap_or(0.0),
            );
        }
        Command::Path {
            from,
            to,
            max_snap_km,
        } => {
            let path = client.road_path(from, to, max_snap_km).await?;
            println!(
                "Road path: {} nodes, {:.1} km ({:.1} weighted)",
                path["nodes"].as_array().map_or(0, |n| n.len()),
                path["distance_km"].as_f64().unwrap_or(0.0),
                path["cost_km"].as_f64().unwrap_or(0.0),
            );
        }
    }

    Ok(())
}

fn print_route(route: &Value) {
    if route["success"] != Value::Bool(true) {
        println!(
            "Route failed: {}",
            route["message"].as_str().unwrap_or("unknown error")
        );
        return;
    }

    println!(
        "Route: {:.1} km ({:.1} km land, {:.1} km water)",
        route["total_distance_km"].as_f64().unwrap_or(0.0),
        route["land_distance_km"].as_f64().unwrap_or(0.0),
        route["water_distance_km"].as_f64().unwrap_or(0.0),
    );
    if let Some(message) = route["message"].as_str() {
        println!("  Note: {}", message);
    }
    for segment in route["segments"].as_array().into_iter().flatten() {
        println!(
            "  {:<14} {:>8.1} km",
            segment["category"].as_str().unwrap_or("?"),
            segment["distance_km"].as_f64().unwrap_or(0.0),
        );
    }

    println!();
    println!("Travel times:");
    for time in route["travel_times"].as_array().into_iter().flatten() {
        println!(
            "  {:<12} {:>6} days  {}",
            time["mode"].as_str().unwrap_or("?"),
            format_days(&time["total_days"]),
            time["description"].as_str().unwrap_or(""),
        );
    }
}
