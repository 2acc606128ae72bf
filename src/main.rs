//! tagblog - a small server-rendered blog

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tagblog::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{
            CommentRepositoryImpl, SqlxPostRepository, SqlxTagRepository, SqlxUserRepository,
        },
    },
    services::{CommentService, PostService, TagService},
    theme::ThemeEngine,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tagblog=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting tagblog...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Create repositories
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let post_repo = SqlxPostRepository::boxed(pool.clone());
    let tag_repo = SqlxTagRepository::boxed(pool.clone());
    let comment_repo = Arc::new(CommentRepositoryImpl::new(pool.clone()));

    // Initialize services
    let post_service = Arc::new(PostService::new(
        post_repo.clone(),
        tag_repo.clone(),
        user_repo.clone(),
    ));
    let tag_service = Arc::new(TagService::new(tag_repo));
    let comment_service = Arc::new(CommentService::new(
        comment_repo,
        post_repo,
        user_repo.clone(),
    ));

    // Demo mode: seed an editor and a first post into an empty database
    #[cfg(feature = "demo")]
    {
        use tagblog::models::{CreatePostInput, CreateUserInput};
        use tagblog::services::UserService;

        let user_service = UserService::new(user_repo);
        if user_service.count().await? == 0 {
            tracing::info!("Demo mode: seeding demo content");
            let editor = user_service.create(CreateUserInput::new("editor", true)).await?;
            post_service
                .create(
                    CreatePostInput::new(
                        "Hello, world",
                        "This blog is up and running.\nLeave a comment below.",
                        "hello-world",
                        editor.id,
                    )
                    .with_tags(["welcome", "news"]),
                )
                .await?;
            tracing::info!("Demo mode: demo content created");
        }
    }

    // Initialize theme engine
    let theme_engine = ThemeEngine::new(&config.theme.path)?;
    tracing::info!("Theme engine initialized: {:?}", config.theme.path);

    // Build application state
    let state = AppState {
        post_service,
        tag_service,
        comment_service,
        theme_engine: Arc::new(theme_engine),
        site: Arc::new(config.site.clone()),
        media: Arc::new(config.media.clone()),
    };

    // Build router
    let app = api::build_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    pool.close().await;
    Ok(())
}
