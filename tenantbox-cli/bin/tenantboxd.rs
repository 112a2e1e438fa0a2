use std::{sync::Arc, time::Duration};

use axum::http::{header::CONTENT_TYPE, Method};
use clap::Parser;
use tenantbox_cli::{TenantboxCliResult, TenantboxdArgs};
use tenantbox_core::{
    catalog::TemplateCatalog,
    runtime::{ContainerRuntime, DockerRuntime},
    TenantboxError,
};
use tenantbox_server::{route, state::AppState, Config};
use tenantbox_utils::{CHECKMARK, WARNING_SIGN};
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

//--------------------------------------------------------------------------------------------------
// Functions: Main
//--------------------------------------------------------------------------------------------------

#[tokio::main]
pub async fn main() -> TenantboxCliResult<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = TenantboxdArgs::parse();

    let config = Arc::new(
        Config::new(&args.host, args.port)?
            .with_routing(&args.label_namespace, &args.domain)?
            .with_network(&args.network)?
            .with_templates_file(args.templates)
            .with_request_timeout(Duration::from_secs(args.request_timeout))?
            .with_launch_rollback(!args.no_launch_rollback),
    );

    let catalog = match config.get_templates_file() {
        Some(path) => {
            tracing::info!("Loading templates from {}", path.display());
            TemplateCatalog::from_yaml_file(path).await?
        }
        None => TemplateCatalog::builtin(),
    };
    println!(
        "{} Loaded {} templates",
        &*CHECKMARK,
        console::style(catalog.list().len()).yellow()
    );

    let runtime = DockerRuntime::connect()
        .map_err(|e| TenantboxError::runtime("connect to the container runtime", e))?;
    if let Err(e) = runtime.ping().await {
        tracing::warn!("Container runtime is not reachable yet: {}", e);
        println!(
            "{} Container runtime is not reachable, requests will fail until it is",
            &*WARNING_SIGN
        );
    }

    if !*config.get_launch_rollback() {
        println!(
            "{} Launch rollback is {}",
            &*WARNING_SIGN,
            console::style("disabled").yellow()
        );
    }

    let state = AppState::new(config.clone(), Arc::new(runtime), Arc::new(catalog));

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .allow_origin(Any);

    let app = route::create_router(state).layer(cors);

    tracing::info!("Starting server on {}", config.get_addr());
    println!(
        "{} Server listening on {}",
        &*CHECKMARK,
        console::style(config.get_addr()).yellow()
    );
    println!(
        "{} Tenants are published under {}",
        &*CHECKMARK,
        console::style(format!(
            "http://<tenant>.{}",
            config.get_scheme().get_suffix_domain()
        ))
        .yellow()
    );

    let listener = tokio::net::TcpListener::bind(config.get_addr()).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for the shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
