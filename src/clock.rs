use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};

/// Header carrying a substitute epoch-millisecond timestamp. Only honoured
/// when the clock override is enabled in configuration.
pub const CLOCK_OVERRIDE_HEADER: &str = "x-mayfly-now-ms";

/// The single timestamp (epoch ms) used for every expiry judgment made while
/// handling one request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RequestClock(pub i64);

#[derive(Copy, Clone, Debug, Default)]
pub struct ClockPolicy {
    pub allow_override: bool,
}

/// Wall clock, epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl ClockPolicy {
    pub fn resolve(&self, headers: &HeaderMap) -> RequestClock {
        if self.allow_override {
            if let Some(value) = headers.get(CLOCK_OVERRIDE_HEADER) {
                match value.to_str().ok().and_then(|v| v.trim().parse::<i64>().ok()) {
                    Some(ms) => return RequestClock(ms),
                    None => tracing::debug!("ignoring malformed {CLOCK_OVERRIDE_HEADER} header"),
                }
            }
        }
        RequestClock(now_ms())
    }
}

pub async fn record_request_clock(
    State(policy): State<ClockPolicy>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let clock = policy.resolve(request.headers());
    request.extensions_mut().insert(clock);
    next.run(request).await
}
