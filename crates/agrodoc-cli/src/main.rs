mod display;
mod server;
mod train;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use agrodoc_ai::{ModelHandle, TrainedPipeline};
use agrodoc_ai::trainer::DEFAULT_SEED;
use agrodoc_core::{FeatureExtractor, FeatureSchema, TermCatalog};
use agrodoc_ocr::mistral::{DEFAULT_MODEL, DEFAULT_TIMEOUT};
use agrodoc_ocr::{DocumentGate, MistralExtractor, OcrPipeline, TesseractExtractor, TextExtractor};
use agrodoc_store::{DATASET_CSV, DATASET_JSON, DataLayout};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::server::AppState;
use crate::train::{SAMPLES_IF_MISSING, TrainOptions};

/// Agricultural property document validator.
#[derive(Parser)]
#[command(name = "agrodoc", version, about)]
struct Cli {
    /// Directory holding data/, models/ and uploads/.
    #[arg(long, env = "AGRODOC_DATA_ROOT", default_value = ".", global = true)]
    data_root: PathBuf,

    /// JSON term catalog replacing the built-in one.
    #[arg(long, env = "AGRODOC_TERMS", global = true)]
    terms: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP validation service.
    Serve {
        #[arg(long, env = "AGRODOC_BIND", default_value = "0.0.0.0:8000")]
        bind: String,

        #[command(flatten)]
        ocr: OcrArgs,
    },
    /// Generate a synthetic labeled dataset.
    Generate {
        #[arg(long, default_value_t = 2000)]
        samples: usize,

        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        /// Output directory [default: <data-root>/data].
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Train and persist the classifier.
    Train {
        /// Dataset CSV [default: <data-root>/data/synthetic_data.csv].
        #[arg(long)]
        data: Option<PathBuf>,

        /// Feature layout: inference (keyword counts) or corpus (text statistics).
        #[arg(long, default_value = "inference")]
        schema: FeatureSchema,

        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
    },
    /// Run the rigorous gate on a text file, or OCR plus the gate on an image.
    Check {
        file: PathBuf,

        #[command(flatten)]
        ocr: OcrArgs,
    },
}

#[derive(Args)]
struct OcrArgs {
    /// Hosted OCR is disabled when unset or left as the placeholder.
    #[arg(long, env = "MISTRAL_API_KEY", hide_env_values = true)]
    mistral_api_key: Option<String>,

    #[arg(long, default_value = DEFAULT_MODEL)]
    mistral_model: String,

    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    ocr_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("agrodoc v{}", env!("CARGO_PKG_VERSION"));
    let layout = DataLayout::new(&cli.data_root);
    let extractor = load_extractor(cli.terms.as_deref())?;

    match cli.command {
        Command::Serve { bind, ocr } => {
            layout.ensure_dirs()?;
            let pipeline = build_ocr(&ocr, extractor.catalog())?;
            let model = ModelHandle::new(train::load_model(&layout)?);
            let state = AppState::new(
                extractor,
                pipeline,
                model,
                layout,
                DEFAULT_SEED,
                SAMPLES_IF_MISSING,
            );
            server::serve(state, &bind).await
        }
        Command::Generate { samples, seed, out } => {
            let dir = out.unwrap_or_else(|| layout.data_dir());
            let csv = dir.join(DATASET_CSV);
            let summary =
                train::generate_dataset(&extractor, samples, seed, &csv, &dir.join(DATASET_JSON))?;
            print!("{}", display::dataset_summary(&summary));
            eprintln!("  Wrote {}", csv.display());
            Ok(())
        }
        Command::Train { data, schema, seed } => {
            let opts = TrainOptions {
                dataset: data.unwrap_or_else(|| layout.dataset_csv()),
                schema,
                seed,
                generate_if_missing: None,
            };
            let outcome = tokio::task::spawn_blocking(move || {
                train::train_and_persist(&layout, &extractor, &opts).map(|o| (o, extractor))
            })
            .await??;
            let (outcome, extractor) = outcome;
            print!("{}", display::training_report(&outcome.report));
            println!();
            println!("Model: {}", outcome.metadata.model_type);
            println!("Saved: {}", outcome.model_path.display());
            eprintln!("  Trained in {:.1}s", outcome.elapsed_secs);
            println!();
            print!("{}", smoke_prediction(&outcome.pipeline, &extractor)?);
            Ok(())
        }
        Command::Check { file, ocr } => check(&file, &ocr, &extractor, &layout).await,
    }
}

fn load_extractor(terms: Option<&Path>) -> anyhow::Result<FeatureExtractor> {
    let catalog = match terms {
        Some(path) => TermCatalog::load(path)?,
        None => TermCatalog::builtin()?,
    };
    Ok(FeatureExtractor::new(catalog)?)
}

/// Hosted extractor first when a key is configured, then local Tesseract.
fn build_ocr(args: &OcrArgs, catalog: &TermCatalog) -> anyhow::Result<OcrPipeline> {
    let mut extractors: Vec<Box<dyn TextExtractor>> = Vec::new();
    if let Some(mistral) = MistralExtractor::from_key(args.mistral_api_key.clone()) {
        extractors.push(Box::new(
            mistral
                .with_model(args.mistral_model.clone())
                .with_timeout(Duration::from_secs(args.ocr_timeout_secs)),
        ));
    }
    extractors.push(Box::new(TesseractExtractor::default()));
    let gate = DocumentGate::from_catalog(catalog)?;
    Ok(OcrPipeline::new(extractors, gate))
}

async fn check(
    file: &Path,
    ocr: &OcrArgs,
    extractor: &FeatureExtractor,
    layout: &DataLayout,
) -> anyhow::Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;

    let pipeline = build_ocr(ocr, extractor.catalog())?;

    println!("=== {} ===", file.display());
    println!();
    let text = if agrodoc_ocr::DecodedImage::decode(&bytes).is_ok() {
        let outcome = pipeline.process(&bytes).await;
        print!("{}", display::ocr_outcome(&outcome));
        println!();
        outcome.text
    } else {
        String::from_utf8(bytes)
            .with_context(|| format!("{} is neither an image nor UTF-8 text", file.display()))?
    };

    print!("{}", display::structured_info(&pipeline.gate().structured_info(&text)));
    println!();
    let assessment = extractor.assess(&text);
    print!("{}", display::rigorous_report(&assessment.report));

    if let Some(pipeline) = train::load_model(layout)? {
        println!();
        match pipeline.predict_features(&assessment.features) {
            Ok(p) => print!("{}", display::prediction(&p)),
            Err(e) => eprintln!("  Classifier skipped: {e}"),
        }
    }
    Ok(())
}

/// A quick prediction on a canned input in the model's own schema.
fn smoke_prediction(pipeline: &TrainedPipeline, extractor: &FeatureExtractor) -> anyhow::Result<String> {
    let prediction = match pipeline.schema {
        FeatureSchema::Inference => pipeline.predict_features(&extractor.extract(SMOKE_TEXT).0)?,
        FeatureSchema::Corpus => {
            let features: HashMap<String, f64> = [
                ("legal_terms_count", 5.0),
                ("has_dates", 1.0),
                ("text_length", 500.0),
                ("number_count", 10.0),
                ("special_chars_count", 0.0),
                ("legal_density", 0.1),
                ("keywords_present", 3.0),
                ("has_coordinates", 1.0),
                ("uppercase_ratio", 0.15),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
            pipeline.predict_named(&features)?
        }
    };
    Ok(display::prediction(&prediction))
}

const SMOKE_TEXT: &str = "ESCRITURA PÚBLICA DE COMPRA E VENDA de imóvel rural denominado \
    Fazenda Santa Rita, matrícula nº 12.345 do Cartório de Registro de Imóveis da Comarca de \
    Sorriso/MT, com área de 450,5 hectares, cadastrada no INCRA e no CAR, lavrada em 15 de março \
    de 2019. Outorgante vendedor inscrito no CPF 123.456.789-00, pelo valor de R$ 2.500.000,00, \
    com cultivo de soja e milho na propriedade.";
