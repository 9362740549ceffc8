mod sources;

use std::{path::PathBuf, sync::Arc};

use anyhow::bail;
use clap::{Parser, Subcommand, ValueEnum};
use log::{LevelFilter, info};
use qibla_logic::{
    BearingFormula, CompassUiState, GeoCoordinate, QiblaTracker, TrackerSettings,
    compute_bearing_with, direction_label, great_circle_distance_km, prelude::*,
    relative_direction,
};
use tokio::io::BufReader;

use sources::{ChannelHeading, ChannelLocation, UpdateSender, create_channels};

type Tracker = QiblaTracker<ChannelLocation, ChannelHeading, UpdateSender>;

#[derive(Parser)]
#[command(version, about = "Find the direction of the Qibla")]
struct Cli {
    /// JSON file with tracker settings, anything left out uses the default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Formula to use for the great-circle bearing
    #[arg(long, global = true, value_enum)]
    formula: Option<FormulaValue>,

    /// Log what the tracker is doing to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum FormulaValue {
    Simplified,
    ForwardAzimuth,
}

impl From<FormulaValue> for BearingFormula {
    fn from(value: FormulaValue) -> Self {
        match value {
            FormulaValue::Simplified => BearingFormula::Simplified,
            FormulaValue::ForwardAzimuth => BearingFormula::ForwardAzimuth,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the bearing to the target from a single location
    Bearing {
        /// Latitude in degrees
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        /// Longitude in degrees
        #[arg(allow_negative_numbers = true)]
        long: f64,
        /// The direction the device is facing, prints how far to turn when given
        #[arg(long, allow_negative_numbers = true)]
        heading: Option<f64>,
    },
    /// Track the direction to the target from JSON sensor events on stdin, printing the state
    /// as a JSON line after every change
    Track {
        /// Minimum change in heading (degrees) before printing a new state
        #[arg(long, allow_negative_numbers = true)]
        heading_filter: Option<f64>,
    },
}

fn load_settings(cli: &Cli) -> Result<TrackerSettings> {
    let mut settings = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            TrackerSettings::from_json(&raw)?
        }
        None => TrackerSettings::default(),
    };

    if let Some(formula) = cli.formula {
        settings.formula = formula.into();
    }

    if let Commands::Track {
        heading_filter: Some(filter),
    } = cli.command
    {
        settings.heading_filter_degrees = filter;
    }

    settings.validate()?;

    Ok(settings)
}

fn print_bearing(
    settings: &TrackerSettings,
    lat: f64,
    long: f64,
    heading: Option<f64>,
) -> Result {
    let origin = GeoCoordinate::new(lat, long);
    if !origin.is_valid() {
        bail!("({lat}, {long}) is not a valid coordinate");
    }

    let bearing = compute_bearing_with(settings.formula, origin, settings.target);
    let distance = great_circle_distance_km(origin, settings.target);

    println!("Bearing: {bearing:.2}°");
    println!("Distance: {distance:.0} km");

    if let Some(heading) = heading {
        let relative = relative_direction(bearing, heading);
        println!("Relative: {relative:.2}°");
        println!("{}", direction_label(relative));
    }

    Ok(())
}

fn print_state(state: &CompassUiState) -> Result {
    let encoded = serde_json::to_string(state).context("Failed to encode state")?;
    println!("{encoded}");
    Ok(())
}

async fn track(settings: TrackerSettings) -> Result {
    let (location, heading, router) = create_channels();
    let (sender, mut updates) = UpdateSender::new();

    let tracker = Arc::new(Tracker::new(settings, location, heading, sender)?);

    tokio::spawn(router.run(BufReader::new(tokio::io::stdin())));

    let mut main_loop = tokio::spawn({
        let tracker = tracker.clone();
        async move { tracker.main_loop().await }
    });

    loop {
        tokio::select! {
            res = &mut main_loop => {
                let final_state = res.context("Tracker task failed")?;
                if let Some(state) = final_state {
                    print_state(&state)?;
                }
                break;
            }
            Some(()) = updates.recv() => {
                print_state(&tracker.get_ui_state().await)?;
            }
            Ok(_) = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping tracker");
                tracker.stop();
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    colog::default_builder().filter_level(level).init();

    let settings = load_settings(&cli).context("Failed to load settings")?;

    match cli.command {
        Commands::Bearing { lat, long, heading } => print_bearing(&settings, lat, long, heading),
        Commands::Track { .. } => track(settings).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_negative_coordinates() {
        let args = ["qibla", "bearing", "-6.2088", "106.8456", "--heading", "10"];
        let cli = Cli::try_parse_from(args).expect("Failed to parse");
        match cli.command {
            Commands::Bearing { lat, long, heading } => {
                assert_eq!(lat, -6.2088);
                assert_eq!(long, 106.8456);
                assert_eq!(heading, Some(10.0));
            }
            Commands::Track { .. } => panic!("Parsed the wrong subcommand"),
        }
    }

    #[test]
    fn test_overrides_apply() {
        let cli = Cli::try_parse_from([
            "qibla",
            "track",
            "--heading-filter",
            "0",
            "--formula",
            "forward-azimuth",
        ])
        .expect("Failed to parse");

        let settings = load_settings(&cli).expect("Failed to load settings");
        assert_eq!(settings.heading_filter_degrees, 0.0);
        assert_eq!(settings.formula, BearingFormula::ForwardAzimuth);
    }

    #[test]
    fn test_bad_override_rejected() {
        let cli = Cli::try_parse_from(["qibla", "track", "--heading-filter", "-3"])
            .expect("Failed to parse");
        assert!(load_settings(&cli).is_err());
    }

    #[test]
    fn test_invalid_origin() {
        let settings = TrackerSettings::default();
        assert!(print_bearing(&settings, 95.0, 0.0, None).is_err());
    }
}
