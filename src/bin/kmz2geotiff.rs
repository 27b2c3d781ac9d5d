//! Command line batch converter.
//!
//! Converts every KMZ in the input directory into a GeoTIFF inside the output
//! directory, skipping archives whose GeoTIFF already exists, and appends the
//! names converted in this run to the conversion log.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use kmz2geotiff::{BatchDriver, ConverterConfig};

#[derive(Parser, Debug)]
#[command(name = "kmz2geotiff")]
#[command(about = "Convert KMZ ground overlays into tiled, JPEG-compressed GeoTIFFs")]
struct Args {
    /// Directory containing the KMZ files (default: current directory)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output directory (default: "<input>/Converted GeoTIFFs")
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON settings file; command line flags take precedence
    #[arg(long, env = "KMZ2GEOTIFF_CONFIG")]
    config: Option<PathBuf>,

    /// Number of archives converted concurrently
    #[arg(short, long)]
    jobs: Option<usize>,

    /// JPEG quality factor (1-100)
    #[arg(long)]
    jpeg_quality: Option<u8>,

    /// Tile size in pixels
    #[arg(long)]
    block_size: Option<u32>,

    /// Keep extracted archive contents for inspection
    #[arg(long)]
    keep_work_dirs: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> Result<ConverterConfig> {
        let mut config = match &self.config {
            Some(path) => ConverterConfig::from_json_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ConverterConfig::new(self.input.as_deref().unwrap_or(Path::new("."))),
        };

        if let (Some(_), Some(input)) = (&self.config, &self.input) {
            config.output_dir = ConverterConfig::new(input).output_dir;
            config.input_dir = input.clone();
        }
        if let Some(output) = self.output {
            config.output_dir = output;
        }
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        if let Some(quality) = self.jpeg_quality {
            config.encode.jpeg_quality = quality;
        }
        if let Some(block_size) = self.block_size {
            config.encode.block_size = block_size;
        }
        config.keep_work_dirs |= self.keep_work_dirs;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    let config = args.into_config()?;
    let output_dir = config.output_dir.clone();

    let driver = BatchDriver::new(config).context("invalid configuration")?;
    let result = driver.run().context("batch conversion failed")?;

    if !result.is_empty() {
        println!("\n{}", result);
        println!("✅ CONVERSION COMPLETE ✅");
        println!("New Files Located: {}", output_dir.display());
    }

    Ok(())
}
