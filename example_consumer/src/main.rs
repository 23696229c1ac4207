//! Example consumer: a Postgres-backed `Article` exposed through entity-api-sdk.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Expects the table from `example_consumer/schema.sql` and `ENTITY_DIR=example_consumer/entities`.

use chrono::{DateTime, Utc};
use entity_api_sdk::{
    entity_app, AppState, Entity, EntityBinding, EntityRegistry, FieldType, JsonErrorHandler, MiddlewareRegistry,
    PgRepository, Property, RouteCache, RouteSynthesizer, SetterTable, Settings,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    id: i64,
    title: String,
    summary: Option<String>,
    published_at: DateTime<Utc>,
}

impl Entity for Article {
    const TYPE_NAME: &'static str = "blog::Article";

    fn properties() -> Vec<Property> {
        vec![
            Property::id("id", FieldType::Integer),
            Property::column("title", FieldType::String),
            Property::column("summary", FieldType::String).nullable().default_value(""),
            Property::column("publishedAt", FieldType::DateTime),
        ]
    }

    fn setters() -> SetterTable<Self> {
        SetterTable::new()
            .field("title", |a: &mut Article, v| {
                a.title = v.into_typed()?;
                Ok(())
            })
            .field("summary", |a: &mut Article, v| {
                a.summary = v.into_typed()?;
                Ok(())
            })
            .field("publishedAt", |a: &mut Article, v| {
                a.published_at = v.into_typed()?;
                Ok(())
            })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("entity_api_sdk=info,example_consumer=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&settings.database_url)
        .await?;

    let articles = Arc::new(PgRepository::<Article>::new(pool, "article"));
    let entities = EntityRegistry::new().register(EntityBinding::<Article>::new().repository(articles));
    let middleware = MiddlewareRegistry::with_builtins();

    let table = {
        let mut synthesizer = RouteSynthesizer::new(&settings.entity_dir, &entities, &middleware);
        RouteCache::new(&settings.cache_dir).load_or_build(&settings.entity_dir, &mut synthesizer)?
    };
    for route in &table.routes {
        tracing::info!(method = %route.method, path = %route.path, entity = %route.entity, "route");
    }

    let state = AppState::new(entities, middleware, Arc::new(JsonErrorHandler));
    let app = entity_app(&table, state, settings.max_body_bytes)?;
    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("Example consumer listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
