use std::env;
use std::time::Duration;

use crate::dispatcher::TenantFailurePolicy;
use crate::platform::PagingConfig;

/// Sign-in credentials of the worker account on the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCredentials {
    pub tenant_scope: String,
    pub principal: String,
    pub secret: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub platform_base_url: String,
    pub worker_tenant_scope: String,
    pub worker_principal: String,
    pub worker_secret: String,
    pub upload_page_size: u32,
    pub participant_page_size: u32,
    pub page_delay_ms: u64,
    pub platform_timeout_secs: u64,
    pub tenant_failure_policy: TenantFailurePolicy,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            port: env::var("APP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("APP_PORT must be a number"),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            platform_base_url: env::var("PLATFORM_BASE_URL")
                .unwrap_or_else(|_| "https://webservices.sagebridge.org".to_string()),
            worker_tenant_scope: env::var("WORKER_TENANT_SCOPE")
                .expect("WORKER_TENANT_SCOPE must be set"),
            worker_principal: env::var("WORKER_PRINCIPAL").expect("WORKER_PRINCIPAL must be set"),
            worker_secret: env::var("WORKER_SECRET").expect("WORKER_SECRET must be set"),
            // 10 matches the read capacity of the uploads table behind the endpoint
            upload_page_size: env::var("UPLOAD_PAGE_SIZE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("UPLOAD_PAGE_SIZE must be a number"),
            participant_page_size: env::var("PARTICIPANT_PAGE_SIZE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .expect("PARTICIPANT_PAGE_SIZE must be a number"),
            page_delay_ms: env::var("PAGE_DELAY_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .expect("PAGE_DELAY_MS must be a number"),
            platform_timeout_secs: env::var("PLATFORM_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .expect("PLATFORM_TIMEOUT_SECS must be a number"),
            tenant_failure_policy: env::var("TENANT_FAILURE_POLICY")
                .unwrap_or_else(|_| "fail_fast".to_string())
                .parse()
                .expect("TENANT_FAILURE_POLICY must be fail_fast or continue"),
            otel_service_name: env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| "study-reporter".to_string()),
            otel_exporter_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4317".to_string()),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn worker_credentials(&self) -> WorkerCredentials {
        WorkerCredentials {
            tenant_scope: self.worker_tenant_scope.clone(),
            principal: self.worker_principal.clone(),
            secret: self.worker_secret.clone(),
        }
    }

    pub fn paging(&self) -> PagingConfig {
        PagingConfig {
            upload_page_size: self.upload_page_size,
            participant_page_size: self.participant_page_size,
            page_delay: Duration::from_millis(self.page_delay_ms),
        }
    }

    pub fn platform_timeout(&self) -> Duration {
        Duration::from_secs(self.platform_timeout_secs)
    }
}
