use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use codexview_core::{
    AppState, ConfigOverrides, GitHistoryBuilder, ViewerConfig, bind, load_log, serve,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "codexview",
    version,
    about = "Serve a Codex session log as browsable HTML"
)]
struct Cli {
    /// Path to the JSONL session log
    #[arg(short, long)]
    log: PathBuf,

    /// Port to listen on (default 8000, or CODEXVIEW_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind (default 0.0.0.0, or CODEXVIEW_HOST)
    #[arg(long)]
    host: Option<String>,

    /// git executable used to build the upload history (or CODEXVIEW_GIT)
    #[arg(long)]
    git: Option<PathBuf>,

    /// Tool-call name treated as a code upload (or CODEXVIEW_UPLOAD_FN)
    #[arg(long = "upload-fn")]
    upload_fn: Option<String>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let env = std::env::var("CODEXVIEW_LOG").unwrap_or_else(|_| {
        if verbose {
            "codexview_core=debug,codexview=debug".to_string()
        } else {
            "codexview_core=info,codexview=info".to_string()
        }
    });
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::new(env))
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> codexview_core::Result<()> {
    let overrides = ConfigOverrides {
        host: cli.host,
        port: cli.port,
        git_program: cli.git,
        upload_function: cli.upload_fn,
    };
    let config = ViewerConfig::from_env(&cli.log, overrides)?;
    debug!(?config, "resolved configuration");

    let log = load_log(&config.log_path)?;
    let state = Arc::new(AppState {
        log,
        upload_function: config.upload_function.clone(),
        history: Arc::new(GitHistoryBuilder::new(config.git_program.clone())),
    });

    let listener = bind(&config.bind_addr()).await?;
    println!("Serving log on http://127.0.0.1:{}", config.port);
    serve(state, listener).await
}
