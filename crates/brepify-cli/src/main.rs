//! brepify CLI - convert triangle meshes to STEP solids.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use brepify::{ConversionConfig, ConversionPipeline, ConversionResult, ConversionStatus};
use brepify_mesh::shapes;
use brepify_mesh::Mesh;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "brepify", version)]
#[command(about = "Convert STL/OBJ meshes into B-rep solids with analytic faces", long_about = None)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a mesh file to STEP
    Convert {
        /// Input mesh (.stl or .obj)
        input: PathBuf,
        /// Output STEP file
        output: PathBuf,
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Keep every triangle as a planar face
        #[arg(long)]
        triangulated: bool,
        /// Write conversion statistics as JSON
        #[arg(long)]
        stats: Option<PathBuf>,
        /// Skip mesh repair on load
        #[arg(long)]
        no_repair: bool,
    },
    /// Report segmentation and fitted primitives without exporting
    Inspect {
        /// Input mesh (.stl or .obj)
        input: PathBuf,
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Convert a synthetic shape, for trying settings out
    Demo {
        /// Shape to generate
        #[arg(value_enum)]
        shape: DemoShape,
        /// Output STEP file
        output: PathBuf,
        /// Facets around curved shapes
        #[arg(long, default_value_t = 64)]
        segments: u32,
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DemoShape {
    Box,
    Cylinder,
    Sphere,
    Cone,
    Tube,
}

impl DemoShape {
    fn mesh(self, segments: u32) -> Mesh {
        match self {
            DemoShape::Box => shapes::make_box(20.0, 10.0, 5.0),
            DemoShape::Cylinder => shapes::make_cylinder(5.0, 10.0, segments, true),
            DemoShape::Sphere => shapes::make_sphere(5.0, segments, segments / 2),
            DemoShape::Cone => shapes::make_frustum(5.0, 2.0, 8.0, segments),
            DemoShape::Tube => shapes::make_tube(6.0, 4.0, 10.0, segments),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Convert {
            input,
            output,
            config,
            triangulated,
            stats,
            no_repair,
        } => {
            let mut config = load_config(config.as_deref())?;
            if triangulated {
                config.enable_analytic_replacement = false;
            }
            let mesh = brepify_mesh::load_mesh(&input, !no_repair)
                .with_context(|| format!("cannot load mesh {}", input.display()))?;
            let result = convert(mesh, config, &output)?;
            if let Some(path) = stats {
                write_stats(&result, &path)?;
            }
        }
        Commands::Inspect {
            input,
            config,
            json,
        } => {
            let config = load_config(config.as_deref())?;
            let mesh = brepify_mesh::load_mesh(&input, true)
                .with_context(|| format!("cannot load mesh {}", input.display()))?;
            inspect(&mesh, config, json)?;
        }
        Commands::Demo {
            shape,
            output,
            segments,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            convert(shape.mesh(segments.max(3)), config, &output)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ConversionConfig> {
    match path {
        Some(path) => ConversionConfig::from_toml_file(path)
            .with_context(|| format!("cannot load config {}", path.display())),
        None => Ok(ConversionConfig::default()),
    }
}

fn convert(mesh: Mesh, config: ConversionConfig, output: &Path) -> Result<ConversionResult> {
    let pipeline = ConversionPipeline::new(config)?;
    let result = pipeline.convert(&mesh);
    if result.status == ConversionStatus::Failed {
        anyhow::bail!("conversion failed: no faces could be built");
    }
    result
        .write_step(output)
        .with_context(|| format!("cannot write {}", output.display()))?;
    info!(path = %output.display(), "STEP written");

    let counts = result.surface_counts();
    println!(
        "{}: {} faces ({} plane, {} cylinder, {} sphere, {} cone) -> {}",
        result.status,
        counts.total(),
        counts.plane,
        counts.cylinder,
        counts.sphere,
        counts.cone,
        output.display()
    );
    if result.stats.free_edges > 0 {
        println!("  {} free edges left after sewing", result.stats.free_edges);
    }
    Ok(result)
}

fn write_stats(result: &ConversionResult, path: &Path) -> Result<()> {
    let json = serde_json::json!({
        "stats": result.stats,
        "regions": result.regions,
    });
    std::fs::write(path, serde_json::to_string_pretty(&json)?)
        .with_context(|| format!("cannot write {}", path.display()))?;
    Ok(())
}

fn inspect(mesh: &Mesh, config: ConversionConfig, json: bool) -> Result<()> {
    let pipeline = ConversionPipeline::new(config)?;
    let regions = pipeline.inspect(mesh);
    if json {
        println!("{}", serde_json::to_string_pretty(&regions)?);
        return Ok(());
    }
    println!(
        "{} triangles, {} regions",
        mesh.triangle_count(),
        regions.len()
    );
    for r in &regions {
        match (r.surface, r.fit_error) {
            (Some(surface), Some(error)) => println!(
                "  region {:4}: {:6} triangles  {:<8}  rms {:.2e}  inliers {:.0}%",
                r.id,
                r.triangles,
                surface,
                error,
                r.inlier_ratio.unwrap_or(0.0) * 100.0
            ),
            _ => println!("  region {:4}: {:6} triangles  -", r.id, r.triangles),
        }
    }
    Ok(())
}
