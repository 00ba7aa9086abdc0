use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("verimail_requests_total", "Total number of verification requests")
            .unwrap();
    pub static ref QUOTA_REJECTED: Counter = register_counter!(
        "verimail_quota_rejections_total",
        "Requests rejected by the rate limit"
    )
    .unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "verimail_request_latency_seconds",
        "Request latency in seconds"
    )
    .unwrap();
    pub static ref DOMAINS_LOADED: Gauge = register_gauge!(
        "verimail_domains_loaded",
        "Number of disposable domains loaded at startup"
    )
    .unwrap();
}
