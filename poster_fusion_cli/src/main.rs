use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use dotenv::dotenv;
use poster_fusion_cli::ai::GeminiCreative;
use poster_fusion_cli::config::GeminiConfig;
use poster_fusion_cli::{utils, Language, SessionController};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Product photo to turn into a poster
    #[arg(short, long)]
    image: PathBuf,

    /// Creative direction, e.g. "minimalist neon"
    #[arg(short, long)]
    prompt: String,

    /// Poster aspect ratio (9:16, 1:1, 16:9, 3:4, 4:3)
    #[arg(short, long, default_value = "9:16")]
    ratio: String,

    /// Translate the prompt before generating
    #[arg(short, long, value_enum)]
    translate: Option<Language>,

    /// Number of posters to generate
    #[arg(short, long, default_value_t = 1)]
    count: usize,

    /// Directory the posters are written to
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Save every generated poster, not only the last one
    #[arg(short, long)]
    keep_all: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,poster_fusion_cli=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = GeminiConfig::from_env()?;
    let session = SessionController::new(Arc::new(GeminiCreative::new(config)?));

    let (bytes, media_type) = utils::read_image(&args.image)?;
    println!("🔍 Removing background from {}", args.image.display());
    session.upload(bytes, &media_type).await?;

    session.select_ratio(&args.ratio).await?;
    session.set_prompt(args.prompt.as_str()).await?;

    if let Some(language) = args.translate {
        session.translate(language).await?;
        println!("🌐 Prompt: {}", session.snapshot().await.prompt);
    }

    for n in 1..=args.count.max(1) {
        println!("🎨 Generating poster {n}/{}", args.count.max(1));
        session.generate().await?;
    }

    let snapshot = session.snapshot().await;
    let mut written = Vec::new();
    if args.keep_all {
        for poster in &snapshot.posters {
            written.push(utils::save_poster(poster, &args.out_dir)?);
        }
    } else {
        let poster = session.download().await?;
        written.push(utils::save_poster(&poster, &args.out_dir)?);
    }

    let summary = json!({
        "currentStep": snapshot.current_step,
        "completedSteps": snapshot.completed_steps,
        "ratio": snapshot.selected_ratio.value,
        "prompt": snapshot.prompt,
        "posters": snapshot.posters.iter().map(|p| &p.id).collect::<Vec<_>>(),
        "activePosterId": snapshot.active_poster_id,
        "files": written,
    });
    utils::save_json(&summary, &args.out_dir.join("session.json"))?;

    Ok(())
}
