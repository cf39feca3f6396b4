//! Command-line front end: load shapes, run one export, print or write the results.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use log::info;

use crate::config::StudioConfig;
use crate::crs::Proj4Projector;
use crate::drawing::DrawingState;
use crate::import::load_drawing;
use crate::pipeline::{run_export, Download, ExportSnapshot};
use crate::types::{CrsMode, ExportFormat};

/// Usage text printed for `--help` and argument errors.
pub const USAGE: &str = "Usage: aoi-studio [--input <file.geojson> | --drawing <file.json> | --example] \
[--crs <WGS84|AUTO_UTM|EPSG:n>] [--format <WKT|EWKT|KML>] [--config <file.json>] \
[--out-dir <dir>] [--save-drawing <file.json>]\n\n\
Without a shape source an empty drawing is exported. \
Environment: APP_TITLE, START_LAT, START_LON, START_ZOOM, AOI_EXPORT_CRS, AOI_EXPORT_FORMAT, RUST_LOG.";

/// Parsed command-line arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliArgs {
    /// GeoJSON document to load shapes from
    pub input: Option<PathBuf>,
    /// Drawing saved with `--save-drawing`
    pub drawing: Option<PathBuf>,
    /// Where to save the loaded drawing
    pub save_drawing: Option<PathBuf>,
    /// CRS override
    pub crs: Option<CrsMode>,
    /// Format override
    pub format: Option<ExportFormat>,
    /// JSON config file
    pub config: Option<PathBuf>,
    /// Directory to write downloads into
    pub out_dir: Option<PathBuf>,
    /// Use the built-in example rectangle
    pub example: bool,
    /// Print usage and exit
    pub help: bool,
}

impl CliArgs {
    /// Parses `args` as produced by `std::env::args()` (program name first).
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut parsed = CliArgs::default();
        let mut idx = 1;
        while idx < args.len() {
            match args[idx].as_str() {
                "--input" => {
                    idx += 1;
                    parsed.input = Some(PathBuf::from(value(args, idx, "--input")?));
                }
                "--drawing" => {
                    idx += 1;
                    parsed.drawing = Some(PathBuf::from(value(args, idx, "--drawing")?));
                }
                "--save-drawing" => {
                    idx += 1;
                    parsed.save_drawing = Some(PathBuf::from(value(args, idx, "--save-drawing")?));
                }
                "--crs" => {
                    idx += 1;
                    let raw = value(args, idx, "--crs")?;
                    parsed.crs = Some(raw.parse().with_context(|| format!("--crs {raw}"))?);
                }
                "--format" => {
                    idx += 1;
                    let raw = value(args, idx, "--format")?;
                    parsed.format = Some(raw.parse().with_context(|| format!("--format {raw}"))?);
                }
                "--config" => {
                    idx += 1;
                    parsed.config = Some(PathBuf::from(value(args, idx, "--config")?));
                }
                "--out-dir" => {
                    idx += 1;
                    parsed.out_dir = Some(PathBuf::from(value(args, idx, "--out-dir")?));
                }
                "--example" => parsed.example = true,
                "-h" | "--help" => parsed.help = true,
                other => bail!("unexpected argument {other:?}\n\n{USAGE}"),
            }
            idx += 1;
        }
        let sources = [parsed.input.is_some(), parsed.drawing.is_some(), parsed.example];
        if sources.iter().filter(|set| **set).count() > 1 {
            bail!("--input, --drawing and --example are mutually exclusive\n\n{USAGE}");
        }
        Ok(parsed)
    }
}

fn value<'a>(args: &'a [String], idx: usize, flag: &str) -> Result<&'a str> {
    args.get(idx)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("{flag} requires a value"))
}

/// Runs one export for the given arguments and prints the results to stdout.
pub fn run(args: &[String]) -> Result<()> {
    let cli = CliArgs::from_args(args)?;
    if cli.help {
        println!("{USAGE}");
        return Ok(());
    }

    let config = StudioConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let mut spec = config.export_spec()?;
    if let Some(crs) = cli.crs {
        spec.crs = crs;
    }
    if let Some(format) = cli.format {
        spec.format = format;
    }

    let drawing = load_shapes(&cli)?;
    info!("{}: {} shape(s), export {} / {}", config.title, drawing.len(), spec.crs, spec.format);

    let projector = Proj4Projector::new().context("initializing projections")?;
    let snapshot = run_export(&drawing, spec, &projector);
    print_snapshot(&snapshot);

    if let Some(path) = &cli.save_drawing {
        save_drawing(&drawing, path)?;
        println!("wrote {}", path.display());
    }
    if let Some(dir) = &cli.out_dir {
        for written in write_downloads(&snapshot, dir)? {
            println!("wrote {}", written.display());
        }
    }
    Ok(())
}

fn load_shapes(cli: &CliArgs) -> Result<DrawingState> {
    if let Some(path) = &cli.input {
        let text = read(path)?;
        return load_drawing(&text).with_context(|| format!("importing {}", path.display()));
    }
    if let Some(path) = &cli.drawing {
        let text = read(path)?;
        return DrawingState::from_json(&text)
            .with_context(|| format!("parsing saved drawing {}", path.display()));
    }
    Ok(if cli.example {
        DrawingState::example()
    } else {
        DrawingState::new()
    })
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// Saves the drawing so a later run can reload it with `--drawing`.
pub fn save_drawing(drawing: &DrawingState, path: &Path) -> Result<()> {
    let json = drawing.to_json().context("serializing drawing")?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

fn print_snapshot(snapshot: &ExportSnapshot) {
    println!("{}", snapshot.meta.summary());
    println!("{}", snapshot.status.message(&snapshot.meta));
    if !snapshot.is_available() {
        return;
    }
    println!("\n--- GeoJSON ({}) ---\n{}", snapshot.resolved.epsg, snapshot.geojson);
    println!("\n--- {} ---\n{}", snapshot.spec.format, snapshot.alternate_text());
}

/// Writes every available download into `dir` and returns the written paths.
pub fn write_downloads(snapshot: &ExportSnapshot, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let downloads: Vec<Download> = [snapshot.geojson_download(), snapshot.alternate_download()]
        .into_iter()
        .flatten()
        .collect();
    let mut written = Vec::with_capacity(downloads.len());
    for download in downloads {
        let path = dir.join(&download.file_name);
        std::fs::write(&path, &download.contents)
            .with_context(|| format!("writing {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}
