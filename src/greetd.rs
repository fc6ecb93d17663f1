use clap::Parser;

use donext::logging;
use donext::server::{self, ServerState};

/// Greeting endpoint server. Serves POST /api/greeting, which turns a user
/// name and time of day into a one-sentence AI welcome message.
#[derive(Parser, Debug)]
#[command(name = "donext-greetd", version)]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "DONEXT_GREETD_ADDR", default_value = "127.0.0.1:8787")]
    bind: String,

    /// Upstream generative API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(err) = logging::init_console_logging() {
        eprintln!("warning: logging unavailable: {err}");
    }

    if args.gemini_api_key.is_none() {
        // Keep serving so the client sees a clear 500 instead of a dead port.
        log::error!("GEMINI_API_KEY is not set; every greeting request will fail");
    }

    let state = match ServerState::new(args.gemini_api_key) {
        Ok(state) => state,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(&args.bind).await {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("error: failed to bind {}: {err}", args.bind);
            std::process::exit(1);
        }
    };

    log::info!("greeting endpoint listening on {}", args.bind);
    if let Err(err) = axum::serve(listener, server::router(state)).await {
        eprintln!("error: server stopped: {err}");
        std::process::exit(1);
    }
}
