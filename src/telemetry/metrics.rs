use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
};
use std::sync::LazyLock;

pub static METER: LazyLock<Meter> = LazyLock::new(|| global::meter("study-reporter"));

// --- Platform Metrics ---

pub static PLATFORM_CALLS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("platform.client.calls")
        .with_description("Remote platform requests, including repeats after signing in again")
        .with_unit("{call}")
        .build()
});

pub static PLATFORM_ERRORS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("platform.client.errors")
        .with_description("Remote platform requests that finally failed")
        .with_unit("{error}")
        .build()
});

pub static PLATFORM_REAUTHENTICATIONS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("platform.client.reauthentications")
        .with_description("Sign-ins triggered by an expired session")
        .with_unit("{sign_in}")
        .build()
});

pub static PLATFORM_PAGES_FETCHED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("platform.client.pages")
        .with_description("Result pages fetched from paginated listings")
        .with_unit("{page}")
        .build()
});

// --- Domain Metrics ---

pub static REPORT_REQUESTS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("report.requests")
        .with_description("Reporting requests handled, by terminal outcome")
        .with_unit("{request}")
        .build()
});

pub static REPORT_REQUEST_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("report.request.duration")
        .with_description("Duration of one reporting request across all tenants in seconds")
        .with_unit("s")
        .build()
});

pub static REPORTS_PUBLISHED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("report.published")
        .with_description("Per-tenant reports written back to the platform")
        .with_unit("{report}")
        .build()
});

pub static TENANT_FAILURES: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("report.tenant.failures")
        .with_description("Tenants whose report could not be generated or published")
        .with_unit("{tenant}")
        .build()
});

// --- HTTP Metrics ---

pub static HTTP_REQUESTS_TOTAL: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("http.requests.total")
        .with_description("Total number of HTTP requests")
        .with_unit("{request}")
        .build()
});

pub static HTTP_REQUEST_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("http.request.duration")
        .with_description("HTTP request duration in milliseconds")
        .with_unit("ms")
        .with_boundaries(vec![
            1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
        ])
        .build()
});
