//! Layered service configuration loaded via OrthoConfig.
//!
//! [`AppSettings`] mirrors the raw CLI/environment/file layers (prefix
//! `LODGING`). [`AppSettings::runtime`] validates them once at startup into
//! [`RuntimeConfig`], whose values are typed domain policies.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;
use zeroize::Zeroizing;

use crate::domain::reservation::PricingError;
use crate::domain::{
    BookingPolicy, CancellationPolicy, DEFAULT_PENDING_EXPIRY_HOURS, DisplayConversion,
    ExpiryPolicy, ExternalProviderConfig,
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_FREE_CANCELLATION_DAYS: u32 = 7;
const DEFAULT_SESSION_KEY_FILE: &str = "/var/run/secrets/session_key";

/// Raw configuration layers.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "LODGING")]
pub struct AppSettings {
    /// Socket address for the HTTP listener.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL; without it reservations live in memory.
    pub database_url: Option<String>,
    /// `mock` or `external`.
    pub payment_mode: Option<String>,
    pub provider_store_id: Option<String>,
    pub provider_channel_key: Option<String>,
    pub provider_api_base: Option<String>,
    pub provider_api_secret: Option<String>,
    pub provider_webhook_secret: Option<String>,
    /// Where the provider sends the guest after checkout.
    pub payment_redirect_base: Option<String>,
    /// Shared secret for `POST /api/v1/admin/expire-pending`.
    pub cron_secret: Option<String>,
    pub pending_expiry_hours: Option<u32>,
    pub sweep_interval_secs: Option<u64>,
    pub free_cancellation_days: Option<u32>,
    pub krw_per_usd: Option<u32>,
    /// JSON file of units loaded at startup.
    pub catalogue_path: Option<PathBuf>,
    /// Relay endpoint for confirmation e-mails.
    pub notification_url: Option<String>,
    pub session_key_file: Option<PathBuf>,
    pub cookie_secure: Option<bool>,
}

/// Errors raised while validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid {name}='{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("payment_mode=external requires {name}")]
    MissingProviderSetting { name: &'static str },
}

impl SettingsError {
    fn invalid(name: &'static str, value: &str, reason: impl ToString) -> Self {
        Self::Invalid {
            name,
            value: value.to_owned(),
            reason: reason.to_string(),
        }
    }
}

/// Payment provider wiring chosen at startup.
#[derive(Clone)]
pub enum PaymentSettings {
    Mock,
    External {
        provider: ExternalProviderConfig,
        api_base: Url,
        api_secret: Zeroizing<String>,
    },
}

/// Validated configuration consumed by the server wiring.
#[derive(Clone)]
pub struct RuntimeConfig {
    pub bind_addr: SocketAddr,
    pub database_url: Option<Zeroizing<String>>,
    pub payment: PaymentSettings,
    pub webhook_secret: Option<Zeroizing<String>>,
    pub cron_secret: Option<Zeroizing<String>>,
    pub booking: BookingPolicy,
    pub expiry: ExpiryPolicy,
    pub catalogue_path: Option<PathBuf>,
    pub notification_url: Option<Url>,
    pub session_key_file: PathBuf,
    pub cookie_secure: bool,
}

impl fmt::Debug for PaymentSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mock => f.write_str("Mock"),
            Self::External {
                provider, api_base, ..
            } => f
                .debug_struct("External")
                .field("provider", provider)
                .field("api_base", &api_base.as_str())
                .finish_non_exhaustive(),
        }
    }
}

// Secrets and the database URL are left out.
impl fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("bind_addr", &self.bind_addr)
            .field("persistent", &self.database_url.is_some())
            .field("payment", &self.payment)
            .field("booking", &self.booking)
            .field("expiry", &self.expiry)
            .field("catalogue_path", &self.catalogue_path)
            .field("session_key_file", &self.session_key_file)
            .finish_non_exhaustive()
    }
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|raw| raw.trim()).filter(|raw| !raw.is_empty())
}

fn secret(value: Option<&String>) -> Option<Zeroizing<String>> {
    non_blank(value).map(|raw| Zeroizing::new(raw.to_owned()))
}

fn required<'a>(value: Option<&'a String>, name: &'static str) -> Result<&'a str, SettingsError> {
    non_blank(value).ok_or(SettingsError::MissingProviderSetting { name })
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, SettingsError> {
    Url::parse(raw).map_err(|err| SettingsError::invalid(name, raw, err))
}

impl AppSettings {
    pub fn bind_addr(&self) -> &str {
        non_blank(self.bind_addr.as_ref()).unwrap_or(DEFAULT_BIND_ADDR)
    }

    pub fn pending_expiry_hours(&self) -> u32 {
        self.pending_expiry_hours
            .unwrap_or(DEFAULT_PENDING_EXPIRY_HOURS)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(
            self.sweep_interval_secs
                .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS),
        )
    }

    pub fn free_cancellation_days(&self) -> u32 {
        self.free_cancellation_days
            .unwrap_or(DEFAULT_FREE_CANCELLATION_DAYS)
    }

    pub fn session_key_file(&self) -> PathBuf {
        self.session_key_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_KEY_FILE))
    }

    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure.unwrap_or(true)
    }

    fn payment(&self) -> Result<PaymentSettings, SettingsError> {
        let mode = non_blank(self.payment_mode.as_ref()).unwrap_or("mock");
        if mode.eq_ignore_ascii_case("mock") {
            return Ok(PaymentSettings::Mock);
        }
        if !mode.eq_ignore_ascii_case("external") {
            return Err(SettingsError::invalid(
                "payment_mode",
                mode,
                "expected mock or external",
            ));
        }

        let store_id = required(self.provider_store_id.as_ref(), "provider_store_id")?;
        let channel_key = required(self.provider_channel_key.as_ref(), "provider_channel_key")?;
        required(
            self.provider_webhook_secret.as_ref(),
            "provider_webhook_secret",
        )?;
        let api_base = required(self.provider_api_base.as_ref(), "provider_api_base")?;
        let api_secret = required(self.provider_api_secret.as_ref(), "provider_api_secret")?;
        let redirect_base = non_blank(self.payment_redirect_base.as_ref())
            .map(|raw| parse_url("payment_redirect_base", raw))
            .transpose()?;

        Ok(PaymentSettings::External {
            provider: ExternalProviderConfig {
                store_id: store_id.to_owned(),
                channel_key: channel_key.to_owned(),
                redirect_base,
            },
            api_base: parse_url("provider_api_base", api_base)?,
            api_secret: Zeroizing::new(api_secret.to_owned()),
        })
    }

    fn booking(&self) -> Result<BookingPolicy, SettingsError> {
        let conversion = match self.krw_per_usd {
            Some(rate) => DisplayConversion::new(rate).map_err(|err: PricingError| {
                SettingsError::invalid("krw_per_usd", &rate.to_string(), err)
            })?,
            None => DisplayConversion::default(),
        };
        Ok(BookingPolicy {
            cancellation: CancellationPolicy::new(self.free_cancellation_days()),
            conversion,
        })
    }

    /// Validate the layers into typed runtime configuration.
    ///
    /// # Errors
    /// Fails on unparsable values and when external payments are selected
    /// without the merchant, API, or webhook credentials.
    pub fn runtime(&self) -> Result<RuntimeConfig, SettingsError> {
        let bind_addr = self
            .bind_addr()
            .parse()
            .map_err(|err| SettingsError::invalid("bind_addr", self.bind_addr(), err))?;
        if self.sweep_interval_secs == Some(0) {
            return Err(SettingsError::invalid(
                "sweep_interval_secs",
                "0",
                "interval must be positive",
            ));
        }
        let notification_url = non_blank(self.notification_url.as_ref())
            .map(|raw| parse_url("notification_url", raw))
            .transpose()?;

        Ok(RuntimeConfig {
            bind_addr,
            database_url: secret(self.database_url.as_ref()),
            payment: self.payment()?,
            webhook_secret: secret(self.provider_webhook_secret.as_ref()),
            cron_secret: secret(self.cron_secret.as_ref()),
            booking: self.booking()?,
            expiry: ExpiryPolicy {
                older_than_hours: self.pending_expiry_hours(),
                interval: self.sweep_interval(),
            },
            catalogue_path: self.catalogue_path.clone(),
            notification_url,
            session_key_file: self.session_key_file(),
            cookie_secure: self.cookie_secure(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 8] = [
        "LODGING_BIND_ADDR",
        "LODGING_DATABASE_URL",
        "LODGING_PAYMENT_MODE",
        "LODGING_PROVIDER_STORE_ID",
        "LODGING_PROVIDER_CHANNEL_KEY",
        "LODGING_PROVIDER_WEBHOOK_SECRET",
        "LODGING_PENDING_EXPIRY_HOURS",
        "LODGING_CRON_SECRET",
    ];

    fn load() -> AppSettings {
        AppSettings::load_from_iter([OsString::from("lodging-backend")])
            .expect("config should load")
    }

    fn external() -> AppSettings {
        AppSettings {
            payment_mode: Some("external".to_owned()),
            provider_store_id: Some("store-1".to_owned()),
            provider_channel_key: Some("channel-1".to_owned()),
            provider_api_base: Some("https://api.pay.example".to_owned()),
            provider_api_secret: Some("api-secret".to_owned()),
            provider_webhook_secret: Some("whsec_c2VjcmV0".to_owned()),
            ..AppSettings::default()
        }
    }

    #[rstest]
    fn defaults_apply_when_nothing_is_set() {
        let _guard = lock_env(VARS.map(|name| (name, None::<String>)));

        let runtime = load().runtime().expect("defaults are valid");

        assert_eq!(runtime.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert!(runtime.database_url.is_none());
        assert!(matches!(runtime.payment, PaymentSettings::Mock));
        assert_eq!(runtime.expiry, ExpiryPolicy::default());
        assert_eq!(runtime.booking, BookingPolicy::default());
        assert!(runtime.cron_secret.is_none());
        assert!(runtime.cookie_secure);
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("LODGING_BIND_ADDR", Some("127.0.0.1:9090".to_owned())),
            ("LODGING_PENDING_EXPIRY_HOURS", Some("6".to_owned())),
            ("LODGING_CRON_SECRET", Some("s3cret".to_owned())),
            ("LODGING_PAYMENT_MODE", Some("MOCK".to_owned())),
        ]);

        let runtime = load().runtime().expect("valid overrides");

        assert_eq!(runtime.bind_addr.port(), 9090);
        assert_eq!(runtime.expiry.older_than_hours, 6);
        assert_eq!(runtime.cron_secret.as_deref().map(String::as_str), Some("s3cret"));
    }

    #[rstest]
    fn external_mode_builds_provider_config() {
        let runtime = external().runtime().expect("complete provider config");

        match runtime.payment {
            PaymentSettings::External {
                provider, api_base, ..
            } => {
                assert_eq!(provider.store_id, "store-1");
                assert_eq!(api_base.as_str(), "https://api.pay.example/");
            }
            PaymentSettings::Mock => panic!("expected external payments"),
        }
        assert!(runtime.webhook_secret.is_some());
    }

    #[rstest]
    #[case::store(AppSettings { provider_store_id: None, ..external() }, "provider_store_id")]
    #[case::channel(AppSettings { provider_channel_key: Some(" ".to_owned()), ..external() }, "provider_channel_key")]
    #[case::webhook(AppSettings { provider_webhook_secret: None, ..external() }, "provider_webhook_secret")]
    fn external_mode_requires_credentials(#[case] settings: AppSettings, #[case] missing: &str) {
        let err = settings.runtime().expect_err("incomplete provider config");

        assert!(matches!(
            err,
            SettingsError::MissingProviderSetting { name } if name == missing
        ));
    }

    #[rstest]
    #[case::mode(AppSettings { payment_mode: Some("cash".to_owned()), ..AppSettings::default() })]
    #[case::bind(AppSettings { bind_addr: Some("nowhere".to_owned()), ..AppSettings::default() })]
    #[case::rate(AppSettings { krw_per_usd: Some(0), ..AppSettings::default() })]
    #[case::interval(AppSettings { sweep_interval_secs: Some(0), ..AppSettings::default() })]
    fn rejects_invalid_values(#[case] settings: AppSettings) {
        assert!(matches!(
            settings.runtime(),
            Err(SettingsError::Invalid { .. })
        ));
    }
}
