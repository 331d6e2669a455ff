//! route-prep: offline route construction for a street graph.
//!
//! Usage:
//!   route-prep build --graph streets.json --base 51.5,-0.12 --spawn 51.51,-0.13 --output paths.json
//!   route-prep inspect --graph streets.json

use std::fs;
use std::path::PathBuf;
use std::process;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use towerline_core::{GeoPosition, SpawnPoint};
use towerline_routes::{NoTerrain, PathProcessor, RouteCache, RouteConfig, StreetGraph};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "build" => cmd_build(&args[2..]),
        "inspect" => cmd_inspect(&args[2..]),
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => Err(format!("Unknown command: {other}")),
    };

    if let Err(message) = result {
        eprintln!("Error: {message}");
        process::exit(1);
    }
}

fn print_usage() {
    eprintln!(
        "route-prep: street graph route preprocessing tool\n\
         \n\
         Commands:\n\
         \n\
         build     Build one route per spawn point and write them as JSON\n\
         \n\
           --graph <path>           Street graph JSON (nodes + streets)\n\
           --base <lat,lon>         Base position\n\
           --spawn <lat,lon>        Spawn point (repeat for several)\n\
           --output <path>          Output JSON path\n\
           --baseline-height <h>    Height for every waypoint (default: 0)\n\
           --tolerance <m>          Max snap distance to a graph node (default: 100)\n\
         \n\
         inspect   Load a street graph and print its size\n\
         \n\
           --graph <path>           Street graph JSON\n\
         \n\
         Examples:\n\
         \n\
           route-prep build --graph soho.json --base 51.513,-0.131 --spawn 51.516,-0.135 --output soho_paths.json\n\
           route-prep inspect --graph soho.json\n"
    );
}

fn flag_values<'a>(args: &'a [String], flag: &str) -> Vec<&'a str> {
    args.windows(2)
        .filter(|pair| pair[0] == flag)
        .map(|pair| pair[1].as_str())
        .collect()
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    flag_values(args, flag).into_iter().next()
}

fn parse_lat_lon(raw: &str) -> Option<(f64, f64)> {
    let (lat, lon) = raw.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;
    (lat.is_finite() && lon.is_finite()).then_some((lat, lon))
}

fn parse_number(args: &[String], flag: &str) -> Result<Option<f64>, String> {
    match flag_value(args, flag) {
        Some(raw) => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| format!("{flag} expects a number, got '{raw}'")),
        None => Ok(None),
    }
}

fn load_graph(args: &[String]) -> Result<StreetGraph, String> {
    let path = flag_value(args, "--graph")
        .map(PathBuf::from)
        .ok_or("--graph <path> is required")?;
    let json = fs::read_to_string(&path)
        .map_err(|e| format!("reading {}: {e}", path.display()))?;
    StreetGraph::from_json(&json).map_err(|e| format!("{}: {e}", path.display()))
}

// --- Build command ---

fn cmd_build(args: &[String]) -> Result<(), String> {
    let graph = load_graph(args)?;

    let (base_lat, base_lon) = flag_value(args, "--base")
        .and_then(parse_lat_lon)
        .ok_or("--base <lat,lon> is required")?;

    let spawns = flag_values(args, "--spawn")
        .into_iter()
        .enumerate()
        .map(|(i, raw)| {
            parse_lat_lon(raw)
                .map(|(lat, lon)| SpawnPoint::new(i as u32, GeoPosition::flat(lat, lon)))
                .ok_or_else(|| format!("--spawn expects lat,lon, got '{raw}'"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if spawns.is_empty() {
        return Err("at least one --spawn <lat,lon> is required".into());
    }

    let output = flag_value(args, "--output")
        .map(PathBuf::from)
        .ok_or("--output <path> is required")?;

    let baseline = parse_number(args, "--baseline-height")?.unwrap_or(0.0);
    let mut config = RouteConfig {
        baseline_height: Some(baseline),
        ..Default::default()
    };
    if let Some(tolerance) = parse_number(args, "--tolerance")? {
        config.node_match_tolerance = tolerance;
    }

    let base = GeoPosition::new(base_lat, base_lon, baseline);
    info!(
        nodes = graph.node_count(),
        streets = graph.streets().len(),
        spawns = spawns.len(),
        "building routes"
    );

    let build = PathProcessor::new(&graph, config).build_all(&spawns, &base, &NoTerrain);
    for (spawn, error) in &build.failures {
        warn!(%spawn, %error, "no route");
    }
    if build.routes.is_empty() {
        return Err("no spawn point could be routed to the base".into());
    }

    let mut cache = RouteCache::new();
    build.install(&mut cache);
    let json = serde_json::to_string_pretty(&cache.to_waypoint_map())
        .map_err(|e| format!("serializing routes: {e}"))?;
    fs::write(&output, json).map_err(|e| format!("writing {}: {e}", output.display()))?;

    for (spawn, path) in cache.iter() {
        info!(
            %spawn,
            waypoints = path.len(),
            length_m = format_args!("{:.1}", path.length()),
            "route written"
        );
    }
    info!(
        routes = cache.len(),
        failed = build.failures.len(),
        output = %output.display(),
        "done"
    );
    Ok(())
}

// --- Inspect command ---

fn cmd_inspect(args: &[String]) -> Result<(), String> {
    let graph = load_graph(args)?;
    let (min_lat, max_lat, min_lon, max_lon) = graph.nodes().iter().fold(
        (f64::MAX, f64::MIN, f64::MAX, f64::MIN),
        |(a, b, c, d), n| (a.min(n.lat), b.max(n.lat), c.min(n.lon), d.max(n.lon)),
    );
    println!("nodes:   {}", graph.node_count());
    println!("streets: {}", graph.streets().len());
    if !graph.is_empty() {
        println!("bounds:  {min_lat:.6},{min_lon:.6} .. {max_lat:.6},{max_lon:.6}");
    }
    Ok(())
}
