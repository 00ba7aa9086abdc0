use crate::domains::DomainSet;
use crate::rate_limit::RateLimiter;

// app's shared state
pub struct AppState {
    pub domains: DomainSet,
    pub limiter: RateLimiter,
    pub trust_proxy: bool,
}
