use std::io::Read as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use axum::http::{HeaderValue, Method, header::{AUTHORIZATION, CONTENT_TYPE}};
use axum::{Router, middleware, routing::get};
use clap::{Args, Parser, Subcommand};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use voxread::client::{GatewayClient, SpeechApi, StaticTokenProvider};
use voxread::core::playback::{
    EngineChoice, EspeakSynthesizer, PrefStore, ReaderSession, SessionState, SinkEngine,
    expand_voice_options,
};
use voxread::{ServerConfig, middleware::auth_middleware, routes, state::AppState};

/// voxread - text-to-speech reading app
#[derive(Parser, Debug)]
#[command(name = "voxread")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML), used by `serve`
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the synthesis gateway
    Serve,

    /// Read text aloud
    Read(ReadArgs),

    /// List the remote voices available to your account
    Voices,

    /// Show your synthesis usage
    Usage {
        /// Look back this many days
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
}

#[derive(Args, Debug)]
struct ReadArgs {
    /// File to read; stdin when neither this nor --text is given
    file: Option<PathBuf>,

    /// Text to read
    #[arg(long)]
    text: Option<String>,

    /// Voice selection as "<id>:<tier>", e.g. "Ruth:neural"
    #[arg(long)]
    voice: Option<String>,

    /// Playback speed (0.5 - 4.0)
    #[arg(long)]
    speed: Option<f32>,

    /// Playback volume (0.0 - 1.0)
    #[arg(long)]
    volume: Option<f32>,

    /// Force on-device synthesis even when a token is available
    #[arg(long)]
    local: bool,
}

fn api_url() -> String {
    std::env::var("VOXREAD_API_URL").unwrap_or_else(|_| "http://127.0.0.1:8080".to_string())
}

fn api_token() -> Option<String> {
    std::env::var("VOXREAD_TOKEN").ok().filter(|t| !t.is_empty())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => serve(cli.config).await,
        Commands::Read(args) => read(args).await,
        Commands::Voices => voices().await,
        Commands::Usage { days } => usage(days).await,
    }
}

// =============================================================================
// serve
// =============================================================================

async fn serve(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = if let Some(path) = config_path {
        info!("Loading configuration from {}", path.display());
        ServerConfig::from_file(&path).map_err(|e| anyhow!(e.to_string()))?
    } else {
        ServerConfig::from_env().map_err(|e| anyhow!(e.to_string()))?
    };

    let address = config.address();
    let cors_origins = config.cors_allowed_origins.clone();

    let app_state = AppState::new(config).await;

    // Protected API routes with authentication middleware
    let protected_routes = routes::api::create_api_router().layer(middleware::from_fn_with_state(
        app_state.clone(),
        auth_middleware,
    ));

    // Public health check route (no auth)
    let public_routes = Router::new().route("/", get(voxread::handlers::api::health_check));

    let cors_layer = build_cors_layer(cors_origins.as_deref());

    let app = public_routes
        .merge(protected_routes)
        .with_state(app_state)
        .layer(cors_layer);

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server listening on http://{address}");

    axum::serve(listener, app).await?;
    Ok(())
}

fn build_cors_layer(origins: Option<&str>) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];
    let headers = [AUTHORIZATION, CONTENT_TYPE];

    match origins {
        Some("*") => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(headers),
        Some(list) => {
            let origins: Vec<HeaderValue> = list
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(methods)
                .allow_headers(headers)
                .allow_credentials(true)
        }
        // No CORS configured - same-origin only
        None => CorsLayer::new().allow_methods(methods).allow_headers(headers),
    }
}

// =============================================================================
// read
// =============================================================================

fn format_time(seconds: f32) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

async fn read(args: ReadArgs) -> anyhow::Result<()> {
    let text = match (&args.text, &args.file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    if text.trim().is_empty() {
        return Err(anyhow!("Nothing to read"));
    }

    let token = api_token();
    let engine = SinkEngine::new().map_err(|e| anyhow!(e.to_string()))?;
    let prefs = PrefStore::open(PrefStore::default_path());

    let mut session = ReaderSession::new(
        Arc::new(engine),
        Arc::new(GatewayClient::new(api_url())),
        Arc::new(StaticTokenProvider::new(token.clone())),
        Arc::new(EspeakSynthesizer::new()),
        prefs,
    );

    session.set_authenticated(token.is_some()).await;
    if args.local {
        session.set_engine_choice(EngineChoice::Local);
    }
    if let Some(ref voice) = args.voice {
        session.select_voice(voice);
    }
    if let Some(speed) = args.speed {
        session.set_speed(speed);
    }
    if let Some(volume) = args.volume {
        session.set_volume(volume);
    }

    session.set_text(text);
    let mut events = session
        .take_events()
        .ok_or_else(|| anyhow!("Event channel already taken"))?;

    session.play_pause().await;
    if session.state() == SessionState::Idle {
        return Err(anyhow!(
            session
                .error()
                .unwrap_or("Playback did not start")
                .to_string()
        ));
    }
    if let Some(message) = session.error() {
        // Remote failed but local fallback is playing
        eprintln!("warning: {message}");
    }

    let mut ticker = tokio::time::interval(std::time::Duration::from_millis(200));
    let mut failed = false;
    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(event) => {
                        failed = event == voxread::core::playback::SessionEvent::PlaybackFailed;
                        session.handle_event(event);
                        if session.state() == SessionState::Idle {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = ticker.tick() => {
                print!(
                    "\r{} / {}  ",
                    format_time(session.elapsed_secs()),
                    format_time(session.total_secs())
                );
                use std::io::Write as _;
                let _ = std::io::stdout().flush();
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                return Ok(());
            }
        }
    }

    println!(
        "\r{} / {}  ",
        format_time(session.total_secs()),
        format_time(session.total_secs())
    );
    if failed {
        return Err(anyhow!(
            session.error().unwrap_or("Error playing audio").to_string()
        ));
    }
    Ok(())
}

// =============================================================================
// voices / usage
// =============================================================================

async fn voices() -> anyhow::Result<()> {
    let token = api_token().ok_or_else(|| anyhow!("Set VOXREAD_TOKEN to list remote voices"))?;
    let client = GatewayClient::new(api_url());
    let catalog = client
        .voices(&token)
        .await
        .map_err(|e| anyhow!(e.to_string()))?;

    for option in expand_voice_options(&catalog) {
        println!(
            "{:<24} {} ({}) - {}",
            option.key(),
            option.name,
            option.gender,
            option.language_name
        );
    }
    Ok(())
}

async fn usage(days: i64) -> anyhow::Result<()> {
    let token = api_token().ok_or_else(|| anyhow!("Set VOXREAD_TOKEN to view usage"))?;
    let client = GatewayClient::new(api_url());
    let summary = client
        .usage(&token, days)
        .await
        .map_err(|e| anyhow!(e.to_string()))?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
