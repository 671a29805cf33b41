mod scene;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use habitat_common::RngSource;
use habitat_zone::Placement;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::scene::{Scene, SceneFile};

#[derive(Parser)]
#[command(name = "habitat-cli", about = "CLI tool for habitat zone placement")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate versions
    Info,
    /// Place every being of a scene into its zones
    Place {
        /// Scene description (YAML)
        #[arg(short, long)]
        scene: PathBuf,
        /// Only use this zone
        #[arg(short, long)]
        zone: Option<String>,
        /// Placements per being and zone
        #[arg(short, long, default_value = "1")]
        count: usize,
        /// Override the scene's RNG seed
        #[arg(long)]
        seed: Option<u64>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show landing and takeoff picks of a bird zone
    Land {
        /// Scene description (YAML)
        #[arg(short, long)]
        scene: PathBuf,
        /// Bird zone name
        #[arg(short, long)]
        zone: String,
        /// Number of picks
        #[arg(short, long, default_value = "3")]
        count: usize,
        /// Override the scene's RNG seed
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Serialize)]
struct PlacementReport<'a> {
    zone: &'a str,
    being: &'a str,
    #[serde(flatten)]
    placement: Placement,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("habitat-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("physics: {}", habitat_physics::crate_info());
            println!("interact: {}", habitat_interact::crate_info());
            println!("zone: {}", habitat_zone::crate_info());
        }
        Commands::Place {
            scene,
            zone,
            count,
            seed,
            json,
        } => {
            let file = SceneFile::load(&scene)
                .with_context(|| format!("loading scene {}", scene.display()))?;
            let mut scene = Scene::build(&file).context("building scene")?;
            let mut rng = RngSource(SmallRng::seed_from_u64(seed.unwrap_or(file.seed)));

            let zone_names: Vec<String> = match zone {
                Some(name) => {
                    scene.zone(&name)?;
                    vec![name]
                }
                None => scene.zones.iter().map(|(name, _)| name.clone()).collect(),
            };
            let beings: Vec<_> = scene.beings.iter().map(|b| b.profile).collect();

            let mut reports = Vec::new();
            for zone_name in &zone_names {
                for being in &beings {
                    for _ in 0..count {
                        let placement = {
                            let zone = scene.zone(zone_name)?;
                            zone.random_free_position(being, &zone.query(being.clearance_radius), &scene.colliders, &mut rng)
                        };
                        if let Some(position) = placement.position() {
                            scene.occupy(being, position);
                        }
                        reports.push((zone_name.clone(), being.id, placement));
                    }
                }
                scene.world.borrow_mut().step();
            }

            if json {
                let out: Vec<PlacementReport<'_>> = reports
                    .iter()
                    .map(|(zone, being, placement)| PlacementReport {
                        zone,
                        being: scene.being_name(*being).unwrap_or("?"),
                        placement: *placement,
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                for (zone, being, placement) in &reports {
                    let name = scene.being_name(*being).unwrap_or("?");
                    match placement.position() {
                        Some(p) => println!(
                            "{zone:>10} {name:>10}: ({:.2}, {:.2}, {:.2}) after {} attempt(s)",
                            p.x, p.y, p.z, placement.attempts
                        ),
                        None => println!(
                            "{zone:>10} {name:>10}: no free position after {} attempt(s)",
                            placement.attempts
                        ),
                    }
                }
                let placed = reports.iter().filter(|(_, _, p)| p.found).count();
                println!("placed {placed}/{} (tick {})", reports.len(), scene.world.borrow().tick());
            }
        }
        Commands::Land {
            scene,
            zone,
            count,
            seed,
        } => {
            let file = SceneFile::load(&scene)
                .with_context(|| format!("loading scene {}", scene.display()))?;
            let scene = Scene::build(&file).context("building scene")?;
            let bird = scene.zone(&zone)?;
            if bird.bird_points().is_none() {
                tracing::warn!(zone = %zone, "zone has no bird points; falling back to its position");
            }
            let mut rng = RngSource(SmallRng::seed_from_u64(seed.unwrap_or(file.seed)));
            for i in 0..count {
                let land = bird.free_land_position(&mut rng);
                let takeoff = bird.free_takeoff_position(&mut rng);
                println!(
                    "{i}: land ({:.2}, {:.2}, {:.2}) takeoff ({:.2}, {:.2}, {:.2})",
                    land.x, land.y, land.z, takeoff.x, takeoff.y, takeoff.z
                );
            }
        }
    }

    Ok(())
}
