//! Client-side request metrics.
//!
//! Recorded through the `metrics` facade. Nothing is exported unless the
//! host application installs a recorder; without one every call is a no-op.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

// -- Metric name constants ----------------------------------------------------

/// Dispatched requests (counter). Labels: method, status.
pub const HTTP_REQUESTS_TOTAL: &str = "slos_http_requests_total";

/// Request round-trip time in seconds (histogram). Labels: method.
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "slos_http_request_duration_seconds";

/// Calls to the auth endpoint (counter). Labels: outcome.
pub const AUTHENTICATIONS_TOTAL: &str = "slos_authentications_total";

/// Register metric descriptions with whatever recorder is installed.
pub fn describe_metrics() {
    describe_counter!(HTTP_REQUESTS_TOTAL, "Total requests dispatched");
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "Request round-trip time in seconds"
    );
    describe_counter!(AUTHENTICATIONS_TOTAL, "Total authentication calls");
}

/// Record one finished dispatch. `status` is `None` when no response arrived.
pub(crate) fn record_request(method: &'static str, status: Option<u16>, elapsed: Duration) {
    counter!(HTTP_REQUESTS_TOTAL, "method" => method, "status" => status_class(status))
        .increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method).record(elapsed.as_secs_f64());
}

pub(crate) fn record_authentication(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!(AUTHENTICATIONS_TOTAL, "outcome" => outcome).increment(1);
}

/// Collapse a status code into a low-cardinality label.
fn status_class(status: Option<u16>) -> &'static str {
    match status {
        Some(100..=199) => "1xx",
        Some(200..=299) => "2xx",
        Some(300..=399) => "3xx",
        Some(400..=499) => "4xx",
        Some(500..=599) => "5xx",
        Some(_) => "other",
        None => "error",
    }
}
