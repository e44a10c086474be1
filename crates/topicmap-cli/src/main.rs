//! topicmap - unsupervised topic discovery over a JSON Lines corpus
//!
//! Usage:
//!     topicmap --input docs.jsonl --text-column body \
//!         --model model.onnx --tokenizer tokenizer.json \
//!         --output enriched.jsonl --figure topics.html

mod io;
mod logging;

use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use topicmap_core::{
    HdbscanClusterer, PcaReducer, PipelineConfig, RenderOptions, TopicPipeline,
};
use topicmap_inference::{EngineConfig, SentenceEmbedder};

#[derive(Parser, Debug)]
#[command(name = "topicmap")]
#[command(about = "Embed, reduce and cluster a text corpus into a 3D topic map")]
#[command(version)]
struct Args {
    /// JSON Lines file, one record per row
    #[arg(short, long)]
    input: PathBuf,

    /// Field holding the text to embed
    #[arg(short, long)]
    text_column: String,

    /// ONNX sentence-transformer model
    #[arg(long)]
    model: PathBuf,

    /// tokenizer.json matching the model
    #[arg(long)]
    tokenizer: PathBuf,

    /// Write the enriched records here (JSON Lines)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the figure here (.html page, JSON otherwise)
    #[arg(short, long)]
    figure: Option<PathBuf>,

    /// Pipeline configuration file (JSON); flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    n_components: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Defaults to 5% of the row count, at least 2
    #[arg(long)]
    min_cluster_size: Option<usize>,

    /// Plot unassigned points too
    #[arg(long)]
    unclustered: bool,

    /// Field shown when hovering a point
    #[arg(long, default_value = "title")]
    hover_field: String,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn pipeline_config(&self) -> topicmap_core::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(n) = self.n_components {
            config.n_components = n;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if self.min_cluster_size.is_some() {
            config.min_cluster_size = self.min_cluster_size;
        }
        config.validate()?;
        Ok(config)
    }

    fn render_options(&self) -> RenderOptions {
        RenderOptions {
            unclustered: self.unclustered,
            hover_field: self.hover_field.clone(),
            ..RenderOptions::default()
        }
    }

    fn engine_config(&self) -> EngineConfig {
        let model_name = self
            .model
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| EngineConfig::default().model_name);
        EngineConfig {
            model_path: self.model.to_string_lossy().into_owned(),
            tokenizer_path: self.tokenizer.to_string_lossy().into_owned(),
            model_name,
            ..EngineConfig::default()
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init_with_filter(&args.log_level);

    info!("topicmap v{}", env!("CARGO_PKG_VERSION"));

    let config = args.pipeline_config()?;
    let table = io::read_jsonl(&args.input)?;
    info!("Loaded {} rows from {}", table.n_rows(), args.input.display());

    let embedder = SentenceEmbedder::from_config(args.engine_config())?;
    let reducer = PcaReducer::new();
    let clusterer = HdbscanClusterer::new();

    let model = TopicPipeline::new(&embedder, &reducer, &clusterer)
        .with_config(config)
        .run(table, &args.text_column)?;
    embedder.unload();

    if let Some(advisory) = &model.clusters.advisory {
        eprintln!("{}", advisory);
    }
    for (label, size) in model.topic_sizes() {
        println!("{}\t{}", label, size);
    }

    if let Some(path) = &args.output {
        io::write_jsonl(path, &model.table)?;
        info!("Wrote enriched records to {}", path.display());
    }
    if let Some(path) = &args.figure {
        model.render(&args.render_options())?.export(path)?;
        info!("Wrote figure to {}", path.display());
    }

    Ok(())
}
