//! Builders that pick adapters for each port and assemble the domain services.

use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::{Context as _, Result};
use mockable::{Clock, DefaultClock};
use tracing::{info, warn};

use lodging_backend::domain::ports::{
    BookingMetrics, ConfirmationNotifier, ReservationRepository, UnitCatalogue, WebhookLedger,
    WebhookSignatureVerifier,
};
use lodging_backend::domain::{
    BookingService, BookingServicePorts, ExpirySweeper, PaymentGateway,
    PaymentReconciliationPorts, PaymentReconciliationService,
};
use lodging_backend::inbound::http::health::ReadinessCheck;
use lodging_backend::inbound::http::state::{CronSecret, HttpState, HttpStatePorts};
use lodging_backend::outbound::memory::{
    InMemoryReservationStore, InMemoryUnitCatalogue, InMemoryWebhookLedger,
};
use lodging_backend::outbound::notification::{HttpRelayNotifier, LoggingConfirmationNotifier};
use lodging_backend::outbound::payment::HttpPaymentStatusSource;
use lodging_backend::outbound::persistence::{
    DbPool, DieselReservationRepository, DieselUnitCatalogue, DieselWebhookLedger, PoolConfig,
    run_pending_migrations,
};
use lodging_backend::outbound::webhook::{DisabledWebhookVerifier, HmacWebhookVerifier};
use lodging_backend::settings::{PaymentSettings, RuntimeConfig};

const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);
const RELAY_TIMEOUT: Duration = Duration::from_secs(5);

/// Storage adapters shared by every service.
struct Stores {
    reservations: Arc<dyn ReservationRepository>,
    ledger: Arc<dyn WebhookLedger>,
    catalogue: Arc<dyn UnitCatalogue>,
    readiness: Option<Arc<dyn ReadinessCheck>>,
}

/// Everything the HTTP server and the background sweeper need.
pub(crate) struct Engine {
    pub(crate) http_state: HttpState,
    pub(crate) sweeper: Arc<ExpirySweeper>,
    pub(crate) readiness: Option<Arc<dyn ReadinessCheck>>,
}

fn file_catalogue(config: &RuntimeConfig) -> Result<InMemoryUnitCatalogue> {
    match &config.catalogue_path {
        Some(path) => {
            let catalogue = InMemoryUnitCatalogue::load(path)?;
            info!(units = catalogue.len(), path = %path.display(), "unit catalogue loaded");
            Ok(catalogue)
        }
        None => Ok(InMemoryUnitCatalogue::default()),
    }
}

async fn build_stores(config: &RuntimeConfig) -> Result<Stores> {
    let seed = file_catalogue(config)?;
    let Some(database_url) = config.database_url.as_deref() else {
        if seed.is_empty() {
            warn!("no catalogue_path configured; every unit lookup will miss");
        }
        warn!("no database_url configured; reservations are kept in memory");
        return Ok(Stores {
            reservations: Arc::new(InMemoryReservationStore::new()),
            ledger: Arc::new(InMemoryWebhookLedger::new()),
            catalogue: Arc::new(seed),
            readiness: None,
        });
    };

    run_pending_migrations(database_url)
        .await
        .wrap_err("applying database migrations")?;
    let pool = DbPool::new(PoolConfig::new(database_url.as_str()))
        .await
        .wrap_err("building database pool")?;
    let catalogue = DieselUnitCatalogue::new(pool.clone());
    catalogue
        .upsert_units(&seed.units())
        .await
        .wrap_err("seeding unit catalogue")?;

    Ok(Stores {
        reservations: Arc::new(DieselReservationRepository::new(pool.clone())),
        ledger: Arc::new(DieselWebhookLedger::new(pool.clone())),
        catalogue: Arc::new(catalogue),
        readiness: Some(Arc::new(pool)),
    })
}

fn build_notifier(config: &RuntimeConfig) -> Result<Arc<dyn ConfirmationNotifier>> {
    match &config.notification_url {
        Some(endpoint) => Ok(Arc::new(
            HttpRelayNotifier::new(endpoint.clone(), RELAY_TIMEOUT)
                .wrap_err("building notification relay client")?,
        )),
        None => Ok(Arc::new(LoggingConfirmationNotifier)),
    }
}

fn build_gateway(config: &RuntimeConfig) -> Result<PaymentGateway> {
    match &config.payment {
        PaymentSettings::Mock => {
            warn!("payment_mode=mock; reservations can be confirmed without payment");
            Ok(PaymentGateway::Mock)
        }
        PaymentSettings::External {
            provider,
            api_base,
            api_secret,
        } => {
            let source =
                HttpPaymentStatusSource::new(api_base.clone(), api_secret.clone(), PROVIDER_TIMEOUT)?;
            Ok(PaymentGateway::external(provider.clone(), Arc::new(source)))
        }
    }
}

fn build_verifier(
    config: &RuntimeConfig,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn WebhookSignatureVerifier>> {
    match config.webhook_secret.as_deref() {
        Some(secret) => Ok(Arc::new(HmacWebhookVerifier::new(secret, clock)?)),
        None => {
            warn!("no webhook secret configured; provider webhooks will be refused");
            Ok(Arc::new(DisabledWebhookVerifier))
        }
    }
}

/// Wire adapters into services according to `config`.
///
/// # Errors
/// Fails when migrations, the pool, the catalogue file, or an HTTP client
/// cannot be set up.
pub(crate) async fn build_engine(
    config: &RuntimeConfig,
    metrics: Arc<dyn BookingMetrics>,
) -> Result<Engine> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let stores = build_stores(config).await?;
    let notifier = build_notifier(config)?;
    let gateway = build_gateway(config)?;
    let verifier = build_verifier(config, clock.clone())?;

    let booking = Arc::new(BookingService::new(
        BookingServicePorts {
            reservations: stores.reservations.clone(),
            catalogue: stores.catalogue,
            notifier: notifier.clone(),
            metrics: metrics.clone(),
        },
        clock.clone(),
        gateway.clone(),
        config.booking,
    ));
    let reconciliation = Arc::new(PaymentReconciliationService::new(
        PaymentReconciliationPorts {
            reservations: stores.reservations.clone(),
            ledger: stores.ledger,
            verifier,
            notifier,
            metrics: metrics.clone(),
        },
        clock.clone(),
        gateway,
    ));
    let sweeper = Arc::new(ExpirySweeper::new(stores.reservations, metrics, clock));

    let http_state = HttpState::new(HttpStatePorts {
        bookings: booking.clone(),
        reservations: booking,
        payments: reconciliation,
        expiry: sweeper.clone(),
    })
    .with_cron_secret(config.cron_secret.as_deref().and_then(|s| CronSecret::new(s)))
    .with_default_expiry_hours(config.expiry.older_than_hours);

    Ok(Engine {
        http_state,
        sweeper,
        readiness: stores.readiness,
    })
}
