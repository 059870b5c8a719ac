use crate::error::AppError;
use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    state::keyed::DashMapStateStore,
};
use std::{
    net::IpAddr,
    num::NonZeroU32,
    sync::Arc,
    time::Duration,
};

/// Rate limiter keyed by client IP address
pub type IpRateLimiter = Arc<RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock>>;

/// Allow `attempts` requests per `window_seconds`, refilled evenly.
pub fn ip_quota(attempts: u32, window_seconds: u64) -> Quota {
    let burst = NonZeroU32::new(attempts.max(1)).unwrap_or(NonZeroU32::MIN);
    let period = Duration::from_millis((window_seconds * 1000) / u64::from(burst.get()));

    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

/// Create a keyed rate limiter (by IP)
pub fn create_ip_rate_limiter(attempts: u32, window_seconds: u64) -> IpRateLimiter {
    Arc::new(RateLimiter::dashmap(ip_quota(attempts, window_seconds)))
}

/// Charge one request to `ip`, or fail with 429 and the time to wait.
pub fn check_ip_rate_limit(limiter: &IpRateLimiter, ip: IpAddr) -> Result<(), AppError> {
    limiter.check_key(&ip).map_err(|negative| {
        let wait_time = negative.wait_time_from(DefaultClock::default().now());
        tracing::warn!(client_ip = %ip, "Rate limit exceeded");
        AppError::TooManyRequests(
            "Too many requests from this IP. Please try again later.".to_string(),
            Some(wait_time.as_secs().max(1)),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_allows_burst_then_rejects() {
        let limiter = create_ip_rate_limiter(2, 60);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();

        assert!(limiter.check_key(&ip).is_ok());
        assert!(limiter.check_key(&ip).is_ok());
        assert!(limiter.check_key(&ip).is_err());

        let other: IpAddr = "10.0.0.2".parse().unwrap();
        assert!(limiter.check_key(&other).is_ok());
    }

    #[test]
    fn check_reports_retry_after() {
        let limiter = create_ip_rate_limiter(1, 60);
        let ip: IpAddr = "10.0.0.3".parse().unwrap();

        assert!(check_ip_rate_limit(&limiter, ip).is_ok());
        match check_ip_rate_limit(&limiter, ip) {
            Err(AppError::TooManyRequests(_, Some(retry))) => assert!(retry >= 1),
            other => panic!("expected 429, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn zero_attempts_is_clamped() {
        let quota = ip_quota(0, 0);
        assert_eq!(quota.burst_size().get(), 1);
    }
}
