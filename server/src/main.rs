//! VK bot server - Main Entry Point

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use vkbot_server::api::{HttpClient, ReqwestClient, VkApi};
use vkbot_server::config::Config;
use vkbot_server::db::{self, PgUserRepo};
use vkbot_server::domain::{PostAuthCallback, UserRepo};
use vkbot_server::message::{self, AuthVk, Confirmation, NewMessage};
use vkbot_server::middleware::{Cache, Chain, PanicGuard, RedisCache};
use vkbot_server::server::SocketServer;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vkbot_server=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting VK bot server"
    );

    // Initialize database
    let db_pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&db_pool).await?;

    // Initialize Redis
    let redis = db::create_redis_client(&config.redis_url).await?;

    let http: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new());
    let users: Arc<dyn UserRepo> = Arc::new(PgUserRepo::new(db_pool));
    let api = Arc::new(VkApi::new(Arc::clone(&http), config.api.clone()));

    // Profile enrichment runs after each successful authentication.
    let enrich: PostAuthCallback = {
        let api = Arc::clone(&api);
        let users = Arc::clone(&users);
        Arc::new(move |mut user| {
            let api = Arc::clone(&api);
            let users = Arc::clone(&users);
            Box::pin(async move {
                api.fill_user(users.as_ref(), &mut user).await;
            })
        })
    };

    let handlers = message::registry(vec![
        Arc::new(Confirmation::new(config.confirmation.clone())),
        Arc::new(NewMessage::new(Arc::clone(&api))),
        Arc::new(AuthVk::new(
            config.vk_oauth.clone(),
            http,
            users,
            vec![enrich],
        )),
    ]);

    // Panic isolation stays outermost so a fault in the cache layer's own
    // bookkeeping still surfaces as a plain error.
    let chain = Chain::new(vec![
        Arc::new(PanicGuard),
        Arc::new(Cache::new(
            Arc::new(RedisCache::new(redis)),
            config.cache.clone(),
        )),
    ]);

    let server = Arc::new(SocketServer::new(config, handlers, chain));
    server.listen().await?;

    info!("Server shutdown complete");

    Ok(())
}
