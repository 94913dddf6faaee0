use std::env;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use foundation::math::bearing_deg;
use layers::{OffsetMode, Viewport, compute_labels, is_in_view};
use tools::{config_from_env, parse_lat_lon, sweep};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Evaluate the city compass outside a browser")]
struct Args {
    /// Half-width of the viewing cone in degrees (env: COMPASS_THRESHOLD_DEG)
    #[arg(long, global = true)]
    threshold: Option<f64>,

    /// Degrees of deviation spanning one viewport width (env: COMPASS_SPREAD_DEG)
    #[arg(long, global = true)]
    spread: Option<f64>,

    /// Place labels with the wrapped [0, 360) offset instead of the signed one
    #[arg(long, global = true)]
    legacy_offsets: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initial great-circle bearing between two points
    Bearing {
        /// Start point: LAT,LON
        #[arg(long, allow_hyphen_values = true)]
        from: String,
        /// End point: LAT,LON
        #[arg(long, allow_hyphen_values = true)]
        to: String,
    },

    /// Check whether a bearing falls inside the cone around a heading
    InView {
        #[arg(long)]
        heading: f64,
        #[arg(long)]
        bearing: f64,
    },

    /// Compute the labels for one heading
    Frame {
        /// City list JSON ([{"name", "latitude", "longitude"}, ...])
        #[arg(long)]
        cities: PathBuf,
        /// User position: LAT,LON
        #[arg(long, allow_hyphen_values = true)]
        at: String,
        #[arg(long)]
        heading: f64,
        #[arg(long, default_value_t = 390.0)]
        width: f64,
        #[arg(long, default_value_t = 844.0)]
        height: f64,
        /// Print the frame as JSON
        #[arg(long)]
        json: bool,
    },

    /// List visible cities for headings around the full circle
    Sweep {
        #[arg(long)]
        cities: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        at: String,
        /// Heading increment in degrees (at least 0.01)
        #[arg(long, default_value_t = 15.0)]
        step: f64,
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main(Args::parse()) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main(args: Args) -> Result<(), String> {
    let mut config = config_from_env(|k| env::var(k).ok())?;
    if let Some(t) = args.threshold {
        config.threshold_deg = t;
    }
    if let Some(s) = args.spread {
        config.spread_deg = s;
    }
    if args.legacy_offsets {
        config.offset_mode = OffsetMode::Wrapped;
    }
    config.validate().map_err(|e| e.to_string())?;

    match args.command {
        Command::Bearing { from, to } => {
            let from = parse_lat_lon(&from)?;
            let to = parse_lat_lon(&to)?;
            println!("{:.3}", bearing_deg(from, to));
        }
        Command::InView { heading, bearing } => {
            let visible = is_in_view(heading, bearing, config.threshold_deg);
            println!("{visible}");
        }
        Command::Frame {
            cities,
            at,
            heading,
            width,
            height,
            json,
        } => {
            let user = parse_lat_lon(&at)?;
            let locations = load_locations(&cities)?;
            let frame = compute_labels(
                &config,
                heading,
                user,
                &locations,
                Viewport::new(width, height),
            );
            if json {
                let payload =
                    serde_json::to_string_pretty(&frame).map_err(|e| format!("json: {e}"))?;
                println!("{payload}");
            } else {
                for label in &frame.labels {
                    println!(
                        "{:<24} bearing {:>7.2}  offset {:>7.2}  x {:>8.1}px  {:>8.1} km",
                        label.text,
                        label.bearing_deg,
                        label.angle_offset_deg,
                        label.x_px,
                        label.distance_m / 1000.0
                    );
                }
            }
        }
        Command::Sweep {
            cities,
            at,
            step,
            json,
        } => {
            let user = parse_lat_lon(&at)?;
            let locations = load_locations(&cities)?;
            let steps = sweep(&config, user, &locations, step)?;
            if json {
                let payload =
                    serde_json::to_string_pretty(&steps).map_err(|e| format!("json: {e}"))?;
                println!("{payload}");
            } else {
                for s in &steps {
                    println!("{:>6.1}  {}", s.heading_deg, s.visible.join(", "));
                }
            }
        }
    }

    Ok(())
}

fn load_locations(path: &Path) -> Result<Vec<foundation::NamedLocation>, String> {
    let list = formats::CityList::load(path).map_err(|e| format!("{}: {e}", path.display()))?;
    info!(
        "loaded {} cities from {} ({} rejected)",
        list.len(),
        path.display(),
        list.rejected
    );
    Ok(list.into_locations())
}
