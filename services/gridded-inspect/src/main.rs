//! Command-line inspector for gridded datasets.
//!
//! Reads a single store file or a cell-partitioned dataset directory and
//! prints the selected records as JSON on stdout. Logs go to stderr.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use gridded_io::{
    AccessMode, AnyStore, DatasetConfig, DatasetKind, DatasetStore, Gpi, GridTopology,
    GriddedDataset, PointStore, Query, Record, RegularGrid, StaticStore, Table, TimeSeriesStore,
};

#[derive(Parser, Debug)]
#[command(name = "gridded-inspect")]
#[command(about = "Inspect gridded geophysical datasets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read from a single dataset file
    Store {
        /// Dataset kind: static, timeseries or image
        #[arg(short, long, value_parser = parse_kind)]
        kind: DatasetKind,

        /// Path of the dataset file
        #[arg(short, long)]
        path: PathBuf,

        /// Grid point to select (not valid for images)
        #[arg(short, long)]
        gpi: Option<Gpi>,
    },

    /// Read from a dataset partitioned into cell files on a regular grid
    Grid {
        /// Dataset kind: static or timeseries
        #[arg(short, long, value_parser = parse_kind, default_value = "static")]
        kind: DatasetKind,

        /// Directory holding the cell files
        #[arg(short, long)]
        root: PathBuf,

        #[command(flatten)]
        grid: GridArgs,

        /// Grid point to select
        #[arg(short, long, conflicts_with_all = ["lon", "lat"])]
        gpi: Option<Gpi>,

        /// Longitude of the location to look up
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        /// Latitude of the location to look up
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,
    },
}

#[derive(Args, Debug)]
struct GridArgs {
    /// Number of points in longitude direction
    #[arg(long)]
    nx: usize,

    /// Number of points in latitude direction
    #[arg(long)]
    ny: usize,

    /// Longitude step in degrees
    #[arg(long)]
    dx: f64,

    /// Latitude step in degrees
    #[arg(long, allow_hyphen_values = true)]
    dy: f64,

    /// Longitude of the first grid point
    #[arg(long, allow_hyphen_values = true)]
    first_lon: f64,

    /// Latitude of the first grid point
    #[arg(long, allow_hyphen_values = true)]
    first_lat: f64,

    /// Cell edge length in degrees
    #[arg(long, default_value = "5.0", allow_hyphen_values = true)]
    cell_size: f64,
}

impl GridArgs {
    fn topology(&self) -> Result<RegularGrid> {
        RegularGrid::new(
            self.nx,
            self.ny,
            self.dx,
            self.dy,
            self.first_lon,
            self.first_lat,
            self.cell_size,
        )
        .context("invalid grid definition")
    }
}

/// Grid point lookup requested on the command line.
#[derive(Debug, Clone, Copy)]
enum Selector {
    Point(Gpi),
    Nearest { lon: f64, lat: f64 },
}

#[derive(Serialize)]
struct PointOutput {
    gpi: Gpi,
    cell: Option<u64>,
    rows: usize,
    data: Table,
}

fn parse_kind(s: &str) -> Result<DatasetKind, String> {
    DatasetKind::parse(s).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = DatasetConfig::from_env();
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;

    match cli.command {
        Commands::Store { kind, path, gpi } => inspect_store(kind, path, gpi, &config),
        Commands::Grid {
            kind,
            root,
            grid,
            gpi,
            lon,
            lat,
        } => {
            let selector = match (gpi, lon, lat) {
                (Some(gpi), _, _) => Selector::Point(gpi),
                (None, Some(lon), Some(lat)) => Selector::Nearest { lon, lat },
                _ => bail!("either --gpi or --lon/--lat is required"),
            };
            let topology = grid.topology()?;
            match kind {
                DatasetKind::Static => {
                    inspect_grid::<StaticStore>(root, topology, selector, config)
                }
                DatasetKind::TimeSeries => {
                    inspect_grid::<TimeSeriesStore>(root, topology, selector, config)
                }
                DatasetKind::Image => bail!("image datasets are not partitioned into cells"),
            }
        }
    }
}

fn inspect_store(
    kind: DatasetKind,
    path: PathBuf,
    gpi: Option<Gpi>,
    config: &DatasetConfig,
) -> Result<()> {
    info!(kind = %kind, path = %path.display(), "Inspecting store");

    let query = match (kind, gpi) {
        (DatasetKind::Image, None) => Query::Image,
        (_, Some(gpi)) => Query::GridPoint(gpi),
        (_, None) => bail!("--gpi is required for {} datasets", kind),
    };

    let store = AnyStore::create(kind, &path, AccessMode::Read, config);
    let record = store
        .scoped(|s| s.read(query))
        .with_context(|| format!("failed to read {}", path.display()))?;

    match record {
        Record::Table(data) => print_json(&PointOutput {
            gpi: gpi.unwrap_or_default(),
            cell: None,
            rows: data.len(),
            data,
        }),
        Record::Image(image) => print_json(&image),
    }
}

fn inspect_grid<S: PointStore>(
    root: PathBuf,
    topology: RegularGrid,
    selector: Selector,
    config: DatasetConfig,
) -> Result<()> {
    info!(root = %root.display(), points = topology.len(), "Inspecting gridded dataset");

    let mut dataset = GriddedDataset::<S, _>::open(&root, topology, AccessMode::Read, config)
        .with_context(|| format!("failed to open {}", root.display()))?;

    let (gpi, data) = match selector {
        Selector::Point(gpi) => (gpi, dataset.read(gpi)?),
        Selector::Nearest { lon, lat } => dataset.read_nearest(lon, lat)?,
    };
    let cell = dataset.topology().cell_for(gpi);
    dataset.close()?;

    print_json(&PointOutput {
        gpi,
        cell,
        rows: data.len(),
        data,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_args(cell_size: &str) -> GridArgs {
        let cli = Cli::try_parse_from([
            "gridded-inspect", "grid", "--root", "data", "--gpi", "1", "--nx", "4", "--ny", "2",
            "--dx", "1", "--dy", "1", "--first-lon", "0.5", "--first-lat", "0.5", "--cell-size",
            cell_size,
        ])
        .unwrap();
        match cli.command {
            Commands::Grid { grid, .. } => grid,
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_grid_args_build_topology() {
        let topology = grid_args("2").topology().unwrap();
        assert_eq!(topology.len(), 8);
        assert_eq!(topology.cell_for(1), topology.cell_for(0));
    }

    #[test]
    fn test_unusable_cell_size_is_an_error() {
        assert!(grid_args("0").topology().is_err());
        assert!(grid_args("-5").topology().is_err());
    }
}
