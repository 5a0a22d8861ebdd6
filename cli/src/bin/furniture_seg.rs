use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use material_mask::{
    config::base_filename, ChannelOrder, CommandModel, DebugMaskNaming, ProcessorConfig,
    RecordedModel, ResultAggregator, ResultPayload, Segmenter, SharedModel, YoloDataset,
};
use seg_cli::{ImageEntry, SegmentJob};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Segment one image and write its polygon payload
    Segment {
        /// Path to the input image
        #[arg(short, long)]
        image: PathBuf,
        /// Recorded predictions (JSON) to use instead of a live model
        #[arg(short, long, conflicts_with = "command")]
        predictions: Option<PathBuf>,
        /// Inference program; receives the image path as its last argument
        #[arg(long)]
        command: Option<String>,
        /// Extra arguments passed to the inference program
        #[arg(long = "arg", allow_hyphen_values = true)]
        args: Vec<String>,
        /// Send the image to the inference program in BGR order
        #[arg(long)]
        bgr: bool,
        /// Prediction coordinates are fractions of the image size
        #[arg(long)]
        normalized: bool,
        /// Output directory
        #[arg(short, long)]
        output_dir: PathBuf,
        /// Also render the review overlay and per-class masks
        #[arg(long)]
        overlay: bool,
        /// Write every instance mask as a PNG into the output directory
        #[arg(long)]
        debug_masks: bool,
        /// Name debug masks per instance instead of overwriting per class
        #[arg(long, requires = "debug_masks")]
        per_instance: bool,
        /// Also write the payload as GeoJSON
        #[arg(long)]
        geojson: bool,
        /// TrueType font for box labels
        #[arg(long)]
        font: Option<PathBuf>,
    },
    /// Render ground-truth YOLO labels for one image of a dataset
    Annotate {
        /// Path to the input image
        #[arg(short, long)]
        image: PathBuf,
        /// Dataset root holding data.yaml
        #[arg(short, long)]
        dataset: PathBuf,
        /// Output directory
        #[arg(short, long)]
        output_dir: PathBuf,
        /// TrueType font for box labels
        #[arg(long)]
        font: Option<PathBuf>,
    },
    /// Segment every image of a job file concurrently over one shared model
    Batch {
        /// Path to the TOML or JSON job file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print the JSON schema of the job file
    Schema {
        /// Write the schema here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Segment {
            image,
            predictions,
            command,
            args,
            bgr,
            normalized,
            output_dir,
            overlay,
            debug_masks,
            per_instance,
            geojson,
            font,
        } => {
            let model = match (predictions, command) {
                (Some(path), _) => SharedModel::load(|| {
                    RecordedModel::from_file(&path).map(|m| m.normalized(normalized))
                }),
                (None, Some(program)) => {
                    let order = if bgr { ChannelOrder::Bgr } else { ChannelOrder::Rgb };
                    SharedModel::new(
                        CommandModel::new(program)
                            .args(args)
                            .channel_order(order)
                            .normalized(normalized),
                    )
                }
                (None, None) => return Err(eyre!("Provide either --predictions or --command")),
            };

            let config = ProcessorConfig {
                font_path: font,
                debug_masks: debug_masks.then_some(if per_instance {
                    DebugMaskNaming::PerInstance
                } else {
                    DebugMaskNaming::PerClass
                }),
                debug_dir: Some(output_dir.clone()),
                ..ProcessorConfig::default()
            };
            let segmenter = Segmenter::new(model, config)?;
            segment_one(&segmenter, &image, &output_dir, overlay, geojson)?;
        }
        Commands::Annotate { image, dataset, output_dir, font } => {
            annotate_dataset_image(&image, &dataset, &output_dir, font)?;
        }
        Commands::Batch { config } => {
            run_batch(&config).await?;
        }
        Commands::Schema { output } => {
            let schema = SegmentJob::schema_json()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, schema)?;
                    info!("Schema written to {}", path.display());
                }
                None => println!("{schema}"),
            }
        }
    }

    Ok(())
}

fn segment_one(
    segmenter: &Segmenter,
    image: &Path,
    output_dir: &Path,
    overlay: bool,
    geojson: bool,
) -> Result<ResultPayload> {
    std::fs::create_dir_all(output_dir)?;
    let base = base_filename(image);

    let payload = if overlay {
        let (payload, annotation) = segmenter.annotate_file(image)?;
        annotation.save(output_dir, &base, segmenter.aggregator().catalog())?;
        payload
    } else {
        segmenter.segment_file(image)?
    };

    write_payload(&payload, output_dir, &base, geojson)?;
    Ok(payload)
}

fn write_payload(payload: &ResultPayload, output_dir: &Path, base: &str, geojson: bool) -> Result<()> {
    let json_path = output_dir.join(format!("{base}.json"));
    payload.save_json(&json_path)?;
    info!(
        "{} -> {} polygons, {} materials",
        json_path.display(),
        payload.masks.len(),
        payload.material_categories.len()
    );

    if geojson {
        payload.save_geojson(output_dir.join(format!("{base}.geojson")))?;
    }
    Ok(())
}

fn annotate_dataset_image(image_path: &Path, dataset: &Path, output_dir: &Path, font: Option<PathBuf>) -> Result<()> {
    let dataset = YoloDataset::open(dataset)?;
    let aggregator = ResultAggregator::new(&ProcessorConfig {
        font_path: font,
        ..ProcessorConfig::default()
    })?;

    let image = image::open(image_path)?.to_rgb8();
    let (width, height) = image.dimensions();
    let predictions = dataset.predictions_for(image_path, width, height)?;
    info!("Loaded {} labelled instances for {}", predictions.len(), image_path.display());

    let base = base_filename(image_path);
    let payload = aggregator.process(&image, &predictions)?;
    let files = aggregator
        .annotate(&image, &predictions)
        .save(output_dir, &base, aggregator.catalog())?;

    write_payload(&payload, output_dir, &base, false)?;
    for (class, mask) in &files.masks {
        info!("{class}: {}", mask.filename.display());
    }
    Ok(())
}

async fn run_batch(config_path: &Path) -> Result<()> {
    let job = SegmentJob::from_file(config_path)?;
    info!("Batch job: {} images -> {}", job.images.len(), job.output_dir.display());

    let model = job.model.load();
    if !model.is_available() {
        // every image would fail the same way
        return Err(eyre!("Segmentation model unavailable: {:?}", model));
    }

    let mut processor = job.processor.clone();
    processor.debug_dir.get_or_insert_with(|| job.output_dir.clone());
    let segmenter = Arc::new(Segmenter::new(model, processor)?);
    let output_dir = Arc::new(job.output_dir.clone());
    let geojson = job.geojson;

    let handles: Vec<_> = job
        .images
        .into_iter()
        .map(|ImageEntry { path, overlay }| {
            let segmenter = Arc::clone(&segmenter);
            let output_dir = Arc::clone(&output_dir);
            tokio::task::spawn_blocking(move || {
                let result = segment_one(&segmenter, &path, &output_dir, overlay, geojson);
                (path, result)
            })
        })
        .collect();

    let mut failures = 0usize;
    for handle in handles {
        let (path, result) = handle.await?;
        if let Err(e) = result {
            failures += 1;
            error!("Failed to segment {}: {e}", path.display());
        }
    }

    if failures > 0 {
        return Err(eyre!("{failures} image(s) failed"));
    }
    info!("✅ Batch completed!");
    Ok(())
}
