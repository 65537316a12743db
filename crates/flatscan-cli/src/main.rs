// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Flatscan: flatten photographed documents from the command line.
//
// Entry point. Initialises logging, parses arguments, and runs the
// requested subcommand.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use flatscan_core::error::{FlatscanError, Result};
use flatscan_core::human_errors::humanize_error;
use flatscan_core::{Interpolation, PaperSize, Pixel, Point, Quadrilateral, RectifyConfig};
use flatscan_document::{CornerDetector, RasterImage, Rectifier, output_size_for_paper};

#[derive(Parser)]
#[command(name = "flatscan")]
#[command(about = "Flatten perspective-distorted document photos into upright pages")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Warp the page outlined by four corners into a rectangle.
    Rectify(RectifyArgs),

    /// Detect page corners and print them as JSON.
    Detect {
        /// Path to the input image.
        #[arg(long)]
        image: PathBuf,

        /// Optional JSON config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the default configuration as JSON.
    Config,
}

#[derive(Debug, Clone, Args)]
struct RectifyArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Path to write the flattened page (format from extension).
    #[arg(long)]
    out: PathBuf,

    /// Corners as "x,y x,y x,y x,y" in TL, TR, BR, BL order. Detected
    /// automatically when neither this nor --corners-file is given.
    #[arg(long, value_parser = parse_corners, conflicts_with = "corners_file")]
    corners: Option<Quadrilateral>,

    /// JSON file holding an array of four {"x":..,"y":..} corners.
    #[arg(long)]
    corners_file: Option<PathBuf>,

    /// Clamp corners into the image bounds before warping.
    #[arg(long)]
    clamp: bool,

    /// Output width in pixels.
    #[arg(long, requires = "height")]
    width: Option<u32>,

    /// Output height in pixels.
    #[arg(long, requires = "width")]
    height: Option<u32>,

    /// Use the aspect ratio of a paper size instead of the measured quad.
    #[arg(long, value_enum, conflicts_with = "width")]
    paper: Option<PaperArg>,

    /// Blend neighbouring pixels instead of nearest-neighbour sampling.
    #[arg(long)]
    bilinear: bool,

    /// Fill colour for pixels outside the photo, as "R,G,B,A".
    #[arg(long, value_parser = parse_pixel)]
    background: Option<Pixel>,

    /// Cap on either side of an automatically sized output.
    #[arg(long)]
    max_dimension: Option<u32>,

    /// Warp rows on a single thread.
    #[arg(long)]
    sequential: bool,

    /// Optional JSON config file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PaperArg {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
}

impl From<PaperArg> for PaperSize {
    fn from(arg: PaperArg) -> Self {
        match arg {
            PaperArg::A3 => PaperSize::A3,
            PaperArg::A4 => PaperSize::A4,
            PaperArg::A5 => PaperSize::A5,
            PaperArg::Letter => PaperSize::Letter,
            PaperArg::Legal => PaperSize::Legal,
            PaperArg::Tabloid => PaperSize::Tabloid,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "flatscan failed");
            let human = humanize_error(&err);
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Rectify(args) => run_rectify(args),
        Commands::Detect { image, config } => {
            let config = load_config(config.as_deref())?;
            let source = RasterImage::load(&image)?;
            let quad = CornerDetector::new(config.detection).detect(&source)?;
            println!("{}", serde_json::to_string_pretty(&quad.points())?);
            Ok(())
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&RectifyConfig::default())?);
            Ok(())
        }
    }
}

fn run_rectify(args: RectifyArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if args.bilinear {
        config.interpolation = Interpolation::Bilinear;
    }
    if args.sequential {
        config.parallel = false;
    }
    if let Some(background) = args.background {
        config.background = background;
    }
    if let Some(max) = args.max_dimension {
        config.max_output_dimension = max;
    }
    config.validate()?;

    let source = RasterImage::load(&args.image)?;

    let quad = match (args.corners, &args.corners_file) {
        (Some(quad), _) => quad,
        (None, Some(path)) => read_corners_file(path)?,
        (None, None) => CornerDetector::new(config.detection.clone()).detect(&source)?,
    };
    let quad = if args.clamp {
        quad.clamp_to(source.width(), source.height())
    } else {
        quad
    };
    tracing::info!(
        top_left = %quad.top_left(),
        top_right = %quad.top_right(),
        bottom_right = %quad.bottom_right(),
        bottom_left = %quad.bottom_left(),
        "Using corners"
    );

    let rectifier = Rectifier::new(config.clone());
    let page = if let (Some(w), Some(h)) = (args.width, args.height) {
        rectifier.rectify(&source, &quad, w, h, config.background)?
    } else if let Some(paper) = args.paper {
        let (w, h) = output_size_for_paper(paper.into(), &quad, config.max_output_dimension)?;
        rectifier.rectify(&source, &quad, w, h, config.background)?
    } else {
        rectifier.rectify_auto(&source, &quad)?
    };

    page.save(&args.out)?;
    tracing::info!(path = %args.out.display(), "Flattened page written");
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<RectifyConfig> {
    match path {
        Some(path) => RectifyConfig::load(path),
        None => Ok(RectifyConfig::default()),
    }
}

fn read_corners_file(path: &Path) -> Result<Quadrilateral> {
    let data = std::fs::read_to_string(path)?;
    let points: Vec<Point> = serde_json::from_str(&data)?;
    Quadrilateral::from_slice(&points)
}

/// Parse `"x,y x,y x,y x,y"` (semicolons also accepted between points).
fn parse_corners(s: &str) -> std::result::Result<Quadrilateral, String> {
    let points = s
        .split(|c: char| c.is_whitespace() || c == ';')
        .filter(|token| !token.is_empty())
        .map(|token| {
            let (x, y) = token
                .split_once(',')
                .ok_or_else(|| format!("corner '{token}' is not in x,y form"))?;
            let x: f64 = x.trim().parse().map_err(|_| format!("bad x coordinate in '{token}'"))?;
            let y: f64 = y.trim().parse().map_err(|_| format!("bad y coordinate in '{token}'"))?;
            Ok(Point::new(x, y))
        })
        .collect::<std::result::Result<Vec<_>, String>>()?;
    Quadrilateral::from_slice(&points).map_err(|err: FlatscanError| err.to_string())
}

/// Parse `"R,G,B,A"` (or `"R,G,B"`, opaque) into a pixel.
fn parse_pixel(s: &str) -> std::result::Result<Pixel, String> {
    let channels = s
        .split(',')
        .map(|c| c.trim().parse::<u8>().map_err(|_| format!("bad channel '{c}' in '{s}'")))
        .collect::<std::result::Result<Vec<_>, String>>()?;
    match channels.as_slice() {
        [r, g, b] => Ok([*r, *g, *b, 255]),
        [r, g, b, a] => Ok([*r, *g, *b, *a]),
        _ => Err(format!("expected 3 or 4 channels, got {}", channels.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_space_separated_corners() {
        let quad = parse_corners("10,20 300,15.5 310,400 5,390").unwrap();
        assert_eq!(quad.top_left(), Point::new(10.0, 20.0));
        assert_eq!(quad.top_right(), Point::new(300.0, 15.5));
        assert_eq!(quad.bottom_left(), Point::new(5.0, 390.0));
    }

    #[test]
    fn parses_semicolon_separated_corners() {
        let quad = parse_corners("0,0; 1,0; 1,1; 0,1").unwrap();
        assert_eq!(quad, Quadrilateral::canonical_rect(1, 1));
    }

    #[test]
    fn rejects_three_corners() {
        let err = parse_corners("0,0 1,0 1,1").unwrap_err();
        assert!(err.contains("expected 4 corners"), "{err}");
    }

    #[test]
    fn rejects_malformed_corner() {
        assert!(parse_corners("0,0 1;0 1,1 0,1").is_err());
        assert!(parse_corners("0,0 a,0 1,1 0,1").is_err());
    }

    #[test]
    fn parses_background_colours() {
        assert_eq!(parse_pixel("255,255,255").unwrap(), [255, 255, 255, 255]);
        assert_eq!(parse_pixel("0, 0, 0, 128").unwrap(), [0, 0, 0, 128]);
        assert!(parse_pixel("256,0,0").is_err());
        assert!(parse_pixel("1,2").is_err());
    }

    #[test]
    fn width_requires_height() {
        let res = Cli::try_parse_from([
            "flatscan", "rectify", "--image", "in.png", "--out", "out.png", "--width", "100",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn corners_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corners.json");
        std::fs::write(
            &path,
            r#"[{"x":1,"y":2},{"x":30,"y":2},{"x":30,"y":40},{"x":1,"y":40}]"#,
        )
        .unwrap();
        let quad = read_corners_file(&path).unwrap();
        assert_eq!(quad.bottom_right(), Point::new(30.0, 40.0));
    }
}
