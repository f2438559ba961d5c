// src/config.rs

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::{env, path::PathBuf, sync::Arc, time::Duration};

use crate::{
    common::i18n::I18nStore,
    db::{
        CaseRegistry, CaseRepository, CompanyRegistry, CompanyRepository, CrewRegistry,
        CrewRepository, DecisionLog, DecisionRepository, Fixtures, MemoryStore, UserDirectory,
        UserRepository,
    },
    services::{
        auth::AuthService,
        company_service::CompanyService,
        issuer::TokenIssuer,
        scanner::{CaptureDevice, LineDevice, NoDevice, Scanner},
        validator::{TokenValidator, ValidationService},
    },
};

const DEFAULT_BIND: &str = "0.0.0.0:3000";
const DEFAULT_JWT_TTL_HOURS: i64 = 12;
const DEFAULT_DEMO_PASSWORD: &str = "grozademo!";
const DEFAULT_SCAN_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub demo_password: String,
    pub bcrypt_cost: u32,
    pub scanner_device: Option<PathBuf>,
    pub scan_timeout: Duration,
    // Load the bundled demo data into an empty Postgres database
    pub seed_demo: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;

        Ok(Self {
            bind_addr: env::var("GROZA_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string()),
            database_url: non_empty_var("DATABASE_URL"),
            jwt_secret,
            jwt_ttl_hours: parsed_var(
                "JWT_TTL_HOURS",
                non_empty_var("JWT_TTL_HOURS"),
                DEFAULT_JWT_TTL_HOURS,
            )?,
            demo_password: env::var("GROZA_DEMO_PASSWORD")
                .unwrap_or_else(|_| DEFAULT_DEMO_PASSWORD.to_string()),
            bcrypt_cost: parsed_var(
                "BCRYPT_COST",
                non_empty_var("BCRYPT_COST"),
                bcrypt::DEFAULT_COST,
            )?,
            scanner_device: non_empty_var("SCANNER_DEVICE").map(PathBuf::from),
            scan_timeout: Duration::from_secs(parsed_var(
                "SCAN_TIMEOUT_SECS",
                non_empty_var("SCAN_TIMEOUT_SECS"),
                DEFAULT_SCAN_TIMEOUT_SECS,
            )?),
            seed_demo: parsed_var("GROZA_SEED_DEMO", non_empty_var("GROZA_SEED_DEMO"), true)?,
        })
    }

    /// Settings for tests and local runs without a `.env`.
    pub fn local(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: DEFAULT_BIND.to_string(),
            database_url: None,
            jwt_secret: jwt_secret.into(),
            jwt_ttl_hours: DEFAULT_JWT_TTL_HOURS,
            demo_password: DEFAULT_DEMO_PASSWORD.to_string(),
            bcrypt_cost: 4,
            scanner_device: None,
            scan_timeout: Duration::from_secs(DEFAULT_SCAN_TIMEOUT_SECS),
            seed_demo: true,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

// `raw` is the variable's value as read; `key` only names it in errors
fn parsed_var<T>(key: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} is invalid ({}): {}", key, raw, e)),
        None => Ok(default),
    }
}

/// The storage seams, from whichever backend is configured.
#[derive(Clone)]
pub struct Storage {
    pub backend: &'static str,
    pub companies: Arc<dyn CompanyRegistry>,
    pub cases: Arc<dyn CaseRegistry>,
    pub crews: Arc<dyn CrewRegistry>,
    pub users: Arc<dyn UserDirectory>,
    pub decisions: Arc<dyn DecisionLog>,
}

impl Storage {
    pub fn memory(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        Self {
            backend: "memory",
            companies: store.clone(),
            cases: store.clone(),
            crews: store.clone(),
            users: store.clone(),
            decisions: store,
        }
    }

    pub async fn postgres(config: &AppConfig, database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
            .context("failed to connect to Postgres")?;
        tracing::info!("Database connection established");

        sqlx::migrate!()
            .run(&pool)
            .await
            .context("failed to run database migrations")?;
        tracing::info!("Database migrations applied");

        if config.seed_demo {
            let fixtures = Fixtures::load(&config.demo_password, config.bcrypt_cost)?;
            let seeded = fixtures
                .seed_postgres(&pool)
                .await
                .context("failed to seed demo data")?;
            if !seeded {
                tracing::debug!("Database already has companies, demo data not loaded");
            }
        }

        Ok(Self {
            backend: "postgres",
            companies: Arc::new(CompanyRepository::new(pool.clone())),
            cases: Arc::new(CaseRepository::new(pool.clone())),
            crews: Arc::new(CrewRepository::new(pool.clone())),
            users: Arc::new(UserRepository::new(pool.clone())),
            decisions: Arc::new(DecisionRepository::new(pool)),
        })
    }
}

// Shared state every handler receives
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub backend: &'static str,
    pub i18n_store: Arc<I18nStore>,
    pub auth_service: AuthService,
    pub company_service: CompanyService,
    pub issuer: TokenIssuer,
    pub validation_service: ValidationService,
    pub scanner: Scanner,
}

impl AppState {
    /// Postgres when `DATABASE_URL` is set, bundled fixtures otherwise.
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let storage = match &config.database_url {
            Some(url) => Storage::postgres(&config, url).await?,
            None => {
                tracing::warn!("DATABASE_URL not set, using the in-memory demo registry");
                Storage::memory(MemoryStore::seeded(&config.demo_password, config.bcrypt_cost)?)
            }
        };

        let device: Arc<dyn CaptureDevice> = match &config.scanner_device {
            Some(path) => {
                tracing::info!("Scanner device: {}", path.display());
                Arc::new(LineDevice::new(path))
            }
            None => Arc::new(NoDevice),
        };

        Self::assemble(config, storage, device)
    }

    /// Memory backend seeded from the bundled fixtures.
    pub fn in_memory(config: AppConfig, device: Arc<dyn CaptureDevice>) -> anyhow::Result<Self> {
        let store = MemoryStore::seeded(&config.demo_password, config.bcrypt_cost)?;
        Self::assemble(config, Storage::memory(store), device)
    }

    pub fn assemble(
        config: AppConfig,
        storage: Storage,
        device: Arc<dyn CaptureDevice>,
    ) -> anyhow::Result<Self> {
        let i18n_store = Arc::new(I18nStore::load()?);

        let auth_service = AuthService::new(
            storage.users.clone(),
            config.jwt_secret.clone(),
            chrono::Duration::hours(config.jwt_ttl_hours),
        );
        let company_service = CompanyService::new(
            storage.companies.clone(),
            config.demo_password.clone(),
            config.bcrypt_cost,
        );
        let issuer = TokenIssuer::new(storage.cases.clone());
        let validator = TokenValidator::new(storage.companies.clone(), storage.cases.clone());
        let validation_service =
            ValidationService::new(validator, storage.decisions.clone(), storage.crews.clone());

        Ok(Self {
            config: Arc::new(config),
            backend: storage.backend,
            i18n_store,
            auth_service,
            company_service,
            issuer,
            validation_service,
            scanner: Scanner::new(device),
        })
    }
}
