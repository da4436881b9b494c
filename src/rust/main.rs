use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use wordbag::{
    model_channel, Classifier, ClassifierError, EmptyInputPolicy, ExtractorConfig, ModelStore,
    RuntimeConfig, Segmenter,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding model artifacts (defaults to $WORDBAG_CACHE/models or the user cache dir)
    #[arg(long, global = true)]
    models_dir: Option<PathBuf>,

    /// Name of the model asset to classify with
    #[arg(short, long, global = true, default_value = "TextClassifier")]
    model: String,

    /// Word segmentation strategy
    #[arg(long, global = true, value_enum, default_value_t = SegmenterArg::Unicode)]
    segmenter: SegmenterArg,

    /// Count symbol and emoji segments instead of dropping them
    #[arg(long, global = true)]
    keep_other: bool,

    /// Send empty inputs to the model instead of rejecting them
    #[arg(long, global = true)]
    classify_empty: bool,

    /// ONNX Runtime graph optimization level (0-3)
    #[arg(long, global = true, default_value_t = 3)]
    optimization: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the bag of words extracted from TEXT
    Features { text: String },
    /// Classify TEXT once
    Classify { text: String },
    /// Read one input per line from stdin; `:reload` re-announces the model, `:withdraw` drops it
    Interactive,
    /// List models in the store
    List,
    /// Check a stored model against its recorded hash
    Verify { name: String },
    /// Delete a stored model
    Remove { name: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum SegmenterArg {
    Unicode,
    Bert,
}

impl From<SegmenterArg> for Segmenter {
    fn from(arg: SegmenterArg) -> Self {
        match arg {
            SegmenterArg::Unicode => Segmenter::Unicode,
            SegmenterArg::Bert => Segmenter::Bert,
        }
    }
}

impl Args {
    fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig {
            segmenter: self.segmenter.into(),
            keep_other: self.keep_other,
            max_token_chars: None,
        }
    }

    fn store(&self) -> Result<ModelStore> {
        let store = match &self.models_dir {
            Some(dir) => ModelStore::new(dir),
            None => ModelStore::new_default(),
        }
        .context("Failed to open model store")?;
        let runtime = RuntimeConfig::default().with_optimization(self.optimization)?;
        Ok(store.with_runtime_config(runtime))
    }

    fn classifier(&self) -> Result<Classifier> {
        let policy = if self.classify_empty {
            EmptyInputPolicy::Classify
        } else {
            EmptyInputPolicy::Reject
        };
        Ok(Classifier::builder()
            .with_extractor_config(self.extractor_config())
            .with_empty_input_policy(policy)
            .build()?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    match &args.command {
        Command::Features { text } => {
            let classifier = args.classifier()?;
            let features = classifier.extractor().extract(text);
            for (token, count) in features.sorted() {
                println!("{}\t{}", token, count);
            }
        }
        Command::Classify { text } => {
            let store = args.store()?;
            let classifier = args.classifier()?;
            if store.is_model_available(&args.model) {
                let model = store.load(&args.model)?;
                classifier.update_model(Arc::new(model));
            } else {
                warn!("Model '{}' is not in {:?}", args.model, store.models_dir());
            }
            process_input(&classifier, text);
        }
        Command::Interactive => run_interactive(&args).await?,
        Command::List => {
            let store = args.store()?;
            for name in store.list_models()? {
                let manifest = store.read_manifest(&name)?;
                println!(
                    "{}\t{}\t{} labels\t{} features",
                    name,
                    manifest.version.as_deref().unwrap_or("-"),
                    manifest.labels.len(),
                    manifest.vocabulary.len()
                );
            }
        }
        Command::Verify { name } => {
            let store = args.store()?;
            if store.verify_model(name)? {
                println!("{}: ok", name);
            } else {
                println!("{}: FAILED", name);
                std::process::exit(1);
            }
        }
        Command::Remove { name } => {
            args.store()?.remove_model(name)?;
            println!("Removed {}", name);
        }
    }

    Ok(())
}

async fn run_interactive(args: &Args) -> Result<()> {
    let store = Arc::new(args.store()?);
    let classifier = Arc::new(args.classifier()?);
    let (publisher, subscription) = model_channel(8);
    let listener = subscription.spawn(Arc::clone(&classifier), store.clone());

    // Load whatever is cached now; later loads happen on request.
    if store.is_model_available(&args.model) {
        publisher.available(args.model.clone()).await?;
    } else {
        warn!("Model '{}' not found yet; classifications will wait for `:reload`", args.model);
    }

    info!("=== Enter text to classify (Ctrl-D to quit) ===");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            ":reload" => publisher.available(args.model.clone()).await?,
            ":withdraw" => publisher.withdraw().await?,
            ":info" => println!("{:?}", classifier.info()),
            _ => process_input(&classifier, &line),
        }
    }

    drop(publisher);
    let stats = listener.await?;
    info!("Applied {} model updates ({} failed)", stats.applied, stats.failed);
    Ok(())
}

fn process_input(classifier: &Classifier, text: &str) {
    match classifier.predict(text) {
        Ok(prediction) => {
            println!("{}", prediction);
            println!("Probability: {:.1}%", prediction.probability() * 100.0);
        }
        Err(ClassifierError::ModelUnavailable) => {
            println!("Classification: model not ready yet");
        }
        Err(ClassifierError::EmptyInput) => {
            println!("Enter some text to get a sentiment, spam, or topic classification.");
        }
        Err(e) => {
            eprintln!("Error processing text: {}", e);
        }
    }
}
