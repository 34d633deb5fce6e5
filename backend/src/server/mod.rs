//! HTTP server assembly: API scope behind the session cookie, probes and
//! development docs.

mod config;
mod state_builders;

pub use config::ServerConfig;
pub(crate) use state_builders::build_engine;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpResponse, HttpServer, web};

use lodging_backend::Trace;
#[cfg(debug_assertions)]
use lodging_backend::doc::ApiDoc;
use lodging_backend::domain::Error;
use lodging_backend::inbound::http::health::{HealthState, live, ready};
use lodging_backend::inbound::http::state::HttpState;
use lodging_backend::inbound::http::{ApiResult, configure, json_config};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

use config::SessionCookie;

/// Raw webhook bodies are read as bytes; provider events are small.
const RAW_BODY_LIMIT: usize = 64 * 1024;

async fn unknown_route() -> ApiResult<HttpResponse> {
    Err(Error::not_found("no such endpoint"))
}

fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    session: &SessionCookie,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    > + use<>,
> {
    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(json_config())
        .app_data(web::PayloadConfig::new(RAW_BODY_LIMIT))
        .wrap(Trace)
        .service(
            web::scope("/api/v1")
                .wrap(session.middleware())
                .configure(configure),
        )
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app.default_service(web::to(unknown_route))
}

/// Bind the listener and mark the service ready.
///
/// # Errors
/// Fails when the socket cannot be bound, or when the metrics feature is on
/// but no Prometheus middleware was supplied.
pub fn create_server(
    health_state: web::Data<HealthState>,
    http_state: HttpState,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let http_state = web::Data::new(http_state);
    let ServerConfig {
        session,
        bind_addr,
        #[cfg(feature = "metrics")]
        prometheus,
    } = config;
    #[cfg(feature = "metrics")]
    let prometheus = prometheus.ok_or_else(|| {
        std::io::Error::other("metrics feature enabled but no Prometheus middleware configured")
    })?;

    let app_health = health_state.clone();
    let server = HttpServer::new(move || {
        let app = build_app(app_health.clone(), http_state.clone(), &session);
        #[cfg(feature = "metrics")]
        let app = app.wrap(prometheus.clone());
        app
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}
