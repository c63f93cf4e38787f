use anyhow::Result;
use clap::Parser;
use tokio::io::BufReader;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use typed_chat_backend::{
    cli::{self, Cli, Command},
    config::Config,
    routes,
    services::schema::{MessageKind, ResponseSchema},
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_cli(&cli);
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Repl { text_only } => repl(config, text_only).await,
    }
}

async fn serve(config: Config) -> Result<()> {
    let engine = cli::build_engine(&config, ResponseSchema::chat_response())?;
    info!(model = engine.model(), conversation = %engine.conversation_id(), "chat engine ready");

    let app = routes::create_router()
        .with_state(AppState::new(engine).shared())
        .layer(CorsLayer::very_permissive());

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!("chat backend running at http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn repl(config: Config, text_only: bool) -> Result<()> {
    let schema = if text_only {
        ResponseSchema::new("TextResponse", &[MessageKind::Text])?
    } else {
        ResponseSchema::chat_response()
    };
    let engine = cli::build_engine(&config, schema)?;
    cli::run_repl(&engine, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
    Ok(())
}
