use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskman::agent::{AgentClient, DisabledAgent, OpenAiAgent};
use taskman::api::router;
use taskman::config::Config;
use taskman::service::TaskService;
use taskman::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "taskman=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    let tasks = Arc::new(TaskService::bootstrap(pool, &config.schema_path).await?);

    let agent: Arc<dyn AgentClient> = match config.openai_api_key.clone() {
        Some(api_key) => Arc::new(OpenAiAgent::new(&config, api_key, tasks.clone())?),
        None => {
            info!("OPENAI_API_KEY not set, agent endpoint disabled");
            Arc::new(DisabledAgent)
        }
    };

    let state = AppState {
        tasks: tasks.clone(),
        agent,
    };

    let app = router(state);

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    tasks.close().await;

    Ok(())
}
