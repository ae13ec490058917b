use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;
use std::time::Instant;

use heic2jpg::processors::{Compressor, HeifCodec, ImageCodec, Transformer, Validator};
use heic2jpg::{format_file_size, Cli, Commands, ConversionOptions, Janitor, Settings, TempStore, UploadedImage};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger; RUST_LOG wins over --verbose
    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .init();

    let settings = Settings::load(cli.config.as_deref())?;
    let settings = cli.overrides.apply(settings).normalized()?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => heic2jpg::server::run(settings).await?,
        Commands::Convert {
            input,
            output,
            quality,
            width,
            height,
            stretch,
            rotate,
        } => {
            let options = ConversionOptions {
                quality: quality.unwrap_or(settings.jpeg_quality),
                resize: width.is_some() || height.is_some(),
                width,
                height,
                maintain_aspect_ratio: !stretch,
                rotate,
            };
            process_convert(&settings, input, output, options)?;
        }
        Commands::Sweep => {
            let store = TempStore::open(&settings.temp_dir)
                .with_context(|| format!("Failed to open {}", settings.temp_dir.display()))?;
            let deleted = Janitor::from_settings(store, &settings).sweep();
            println!("Cleaned up {} old files in {}", deleted, settings.temp_dir.display());
        }
    }

    Ok(())
}

fn process_convert(
    settings: &Settings,
    input: PathBuf,
    output: Option<PathBuf>,
    options: ConversionOptions,
) -> Result<()> {
    let started = Instant::now();
    options.validate()?;

    let bytes = std::fs::read(&input).with_context(|| format!("Failed to read {}", input.display()))?;
    let filename = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let upload = UploadedImage::new(bytes, filename);

    let codec = HeifCodec::new();
    Validator::new(settings.max_file_size, &settings.allowed_extensions).validate(&upload, &codec)?;

    let decoded = codec.decode(&upload.bytes)?;
    let image = Transformer::new().apply(decoded, &options)?;

    let output_path = output.unwrap_or_else(|| input.with_extension("jpg"));
    let converted_size = Compressor::new(options.quality).save_jpeg(&image, &output_path)?;

    println!("Converted image saved to: {}", output_path.display());
    println!("Dimensions: {} x {} pixels", image.width(), image.height());
    println!(
        "Size: {} -> {} ({:.1}% smaller)",
        format_file_size(upload.size()),
        format_file_size(converted_size),
        Compressor::calculate_savings(upload.size(), converted_size)
    );
    println!("Time: {:.3}s", started.elapsed().as_secs_f64());

    Ok(())
}
