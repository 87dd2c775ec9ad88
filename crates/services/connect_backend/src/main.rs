// File: services/connect_backend/src/main.rs
use axum::{routing::get, Router};
use connect_common::logging;
use connect_config::load_config;
use connect_stripe::{
    routes as connect_routes, ConnectState, CountryTable, MemoryIndex, StripeConnectClient,
};
use std::{net::SocketAddr, process, sync::Arc};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let _guard = logging::init();

    let config = match load_config() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Failed to load config: {}", e);
            process::exit(1);
        }
    };

    let mut app = Router::new().route("/", get(|| async { "Welcome to the Connect API!" }));

    match config.stripe.as_ref().filter(|_| config.use_stripe) {
        Some(stripe_config) => {
            let client = match StripeConnectClient::from_config(stripe_config) {
                Ok(client) => client,
                Err(e) => {
                    error!("Stripe client not available: {}", e);
                    process::exit(1);
                }
            };
            let countries = match CountryTable::embedded() {
                Ok(countries) => countries,
                Err(e) => {
                    error!("Country table is invalid: {}", e);
                    process::exit(1);
                }
            };
            info!("Loaded {} Connect countries", countries.len());
            let state = Arc::new(ConnectState {
                config: config.clone(),
                api: Arc::new(client),
                index: Arc::new(MemoryIndex::new()),
                countries: Arc::new(countries),
            });
            app = app.merge(connect_routes(state));
        }
        None => warn!("Stripe is disabled or not configured, Connect routes not mounted"),
    }

    // Swagger UI and the JSON document when the openapi feature is enabled
    #[cfg(feature = "openapi")]
    {
        use connect_stripe::doc::ConnectApiDoc;
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;

        #[derive(OpenApi)]
        #[openapi(
            info(
                title = "Connect API",
                version = "0.1.0",
                description = "Stripe Connect onboarding for dashboard accounts",
                license(name = "MIT", url = "https://opensource.org/licenses/MIT")
            ),
            tags((name = "Connect", description = "Core service endpoints"))
        )]
        struct ApiDoc;

        let mut openapi_doc = ApiDoc::openapi();
        openapi_doc.merge(ConnectApiDoc::openapi());
        info!("Adding Swagger UI at /api/docs");
        app = app.merge(SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", openapi_doc));
    }

    let app = app.layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Could not bind {}: {}", addr, e);
            process::exit(1);
        }
    };
    info!("Starting server at http://{}", addr);
    info!("Account pages at http://{}/account/connect", addr);

    // Connect info feeds the client IP recorded on submission.
    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        error!("Server error: {}", e);
    }
}
