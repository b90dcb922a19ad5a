use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref USERS_CREATED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "api_users_created_total",
        "Total users created"
    ))
    .unwrap();
    pub static ref DEVICES_CREATED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "api_devices_created_total",
        "Total devices registered"
    ))
    .unwrap();
    pub static ref TELEMETRY_RECORDED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "api_telemetry_recorded_total",
        "Total telemetry readings stored"
    ))
    .unwrap();
    pub static ref AUTH_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "api_auth_failures_total",
        "Total requests rejected by the bearer token check"
    ))
    .unwrap();
    pub static ref STORE_ERRORS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "api_store_errors_total",
        "Total backend failures surfaced as 5xx responses"
    ))
    .unwrap();
}

pub fn init_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(USERS_CREATED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DEVICES_CREATED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(TELEMETRY_RECORDED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(AUTH_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STORE_ERRORS_TOTAL.clone()))?;
    Ok(())
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return format!("# failed to encode metrics: {}\n", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_contains_registered_counters() {
        // registration is process-wide; a second call from another test is fine to fail
        let _ = init_metrics();
        USERS_CREATED_TOTAL.inc();

        let text = gather_metrics();
        assert!(text.contains("api_users_created_total"));
        assert!(text.contains("api_store_errors_total"));
    }
}
