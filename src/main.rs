mod render; // map + sample overlay written as a PNG
mod settings; // config file and OCCUMAP_* environment overrides

use anyhow::Context;
use occumap_grid::{GridPoint, OccupancyGrid};
use settings::{DEFAULT_CONFIG_PATH, Settings, load_settings};
use tracing::{debug, info};
use tracing_subscriber::{self, EnvFilter};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let settings = load_settings(&config_path)
        .with_context(|| format!("Failed to load settings from {config_path}"))?;

    run(&settings)
}

fn run(settings: &Settings) -> anyhow::Result<()> {
    let mut map = OccupancyGrid::open(&settings.map_path)
        .with_context(|| format!("Failed to open map {}", settings.map_path.display()))?;
    if let Some(seed) = settings.seed {
        map = map.seeded(seed);
    }
    debug!("\n{}", map);

    let state_samples: Vec<GridPoint> = (0..settings.state_samples)
        .map(|_| map.sample_state())
        .collect();
    let valid_samples = (0..settings.valid_samples)
        .map(|_| map.sample_valid_state())
        .collect::<Result<Vec<_>, _>>()
        .context("Free-space sampling failed")?;
    info!(
        state_samples = state_samples.len(),
        valid_samples = valid_samples.len(),
        "Sampling finished"
    );

    if let Some(path) = &settings.render_path {
        render::render_samples(&map, &state_samples, &valid_samples)
            .save(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Wrote sample overlay");
    }

    let occupied = map
        .is_occupied(settings.probe_x, settings.probe_y)
        .context("Probe cell query failed")?;
    info!(
        x = settings.probe_x,
        y = settings.probe_y,
        occupied,
        "Probe cell"
    );
    println!("{}", map.print_statistics());
    println!("{occupied}");

    Ok(())
}
