use anyhow::Result;
use clap::{Parser, Subcommand};
use marketing_copywriter::app::App;
use marketing_copywriter::models::{is_blank, Config, Creativity, GenerationRequest, Tone};
use marketing_copywriter::progress::SpinnerProgress;
use marketing_copywriter::render::{Report, EMPTY_CAPTION};
use marketing_copywriter::server;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "marketing-copywriter")]
#[command(about = "Generate marketing copy and product thumbnails from a description")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one generation and write the results to disk.
    Generate {
        /// Product or service description.
        #[arg(long)]
        description: String,

        #[arg(long, value_enum, default_value_t = Tone::Friendly)]
        tone: Tone,

        /// Sampling temperature between 0.2 and 1.0.
        #[arg(long, value_parser = parse_creativity, default_value = "0.8")]
        creativity: Creativity,

        #[arg(long, default_value = "output")]
        out_dir: PathBuf,
    },
    /// Serve the single-page web front end.
    Serve {
        #[arg(long, env = "BIND", default_value = "127.0.0.1:8501")]
        bind: String,
    },
}

fn parse_creativity(input: &str) -> std::result::Result<Creativity, String> {
    input.parse::<Creativity>().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marketing_copywriter=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    match args.command {
        Command::Generate {
            description,
            tone,
            creativity,
            out_dir,
        } => {
            if is_blank(&description) {
                println!("{}", EMPTY_CAPTION);
                return Ok(());
            }
            let app = init_app();
            match generate(&app, description, tone, creativity, out_dir).await {
                Ok(true) => Ok(()),
                Ok(false) => std::process::exit(1),
                Err(e) => {
                    error!("Generation failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Command::Serve { bind } => {
            let app = init_app();
            info!("Starting marketing-copywriter server");
            if let Err(e) = server::serve(app, &bind).await {
                error!("Server failed: {}", e);
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

fn init_app() -> App {
    match Config::from_env().and_then(|config| App::from_config(&config)) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when the copy was produced but the images were not.
async fn generate(
    app: &App,
    description: String,
    tone: Tone,
    creativity: Creativity,
    out_dir: PathBuf,
) -> marketing_copywriter::Result<bool> {
    let request = GenerationRequest::new(description, tone, creativity)?;
    let generation = app.handle_request(request, &SpinnerProgress::new()).await?;
    let report = Report::build(&generation).await;

    let dir = out_dir.join(format!(
        "{}_{}",
        chrono::Local::now().format("%Y-%m-%d_%H%M%S"),
        generation.id
    ));
    let written = report.write_to_dir(&dir).await?;
    info!("Wrote {} files to {}", written.len(), dir.display());

    println!("{}", report.copy_text);

    if let Err(message) = &report.images {
        error!("Image generation failed: {}", message);
        return Ok(false);
    }
    Ok(true)
}
