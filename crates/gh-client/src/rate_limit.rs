//! Rate-limit detection

use crate::transport::HttpResponse;

/// Header carrying the remaining primary quota
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Why a response counts as rate-limited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitSignal {
    /// 429 Too Many Requests
    TooManyRequests,
    /// 403 with `x-ratelimit-remaining: 0`
    QuotaExhausted,
    /// 403 whose body reports a secondary (abuse) rate limit
    Secondary,
}

/// Classify a response
///
/// A 403 without an exhausted quota is a permission error, not a rate limit,
/// unless `detect_secondary` is set and the body mentions a secondary rate
/// limit.
pub fn classify(response: &HttpResponse, detect_secondary: bool) -> Option<RateLimitSignal> {
    match response.status {
        429 => Some(RateLimitSignal::TooManyRequests),
        403 => {
            let remaining = response
                .header(RATE_LIMIT_REMAINING_HEADER)
                .map(str::trim);
            if remaining == Some("0") {
                Some(RateLimitSignal::QuotaExhausted)
            } else if detect_secondary && mentions_secondary_limit(&response.body) {
                Some(RateLimitSignal::Secondary)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn mentions_secondary_limit(body: &str) -> bool {
    body.to_lowercase().contains("secondary rate limit")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECONDARY_BODY: &str =
        r#"{"message":"You have exceeded a secondary rate limit. Please wait a few minutes."}"#;

    #[test]
    fn test_429_is_always_rate_limited() {
        let response = HttpResponse::new(429, "");
        assert_eq!(
            classify(&response, false),
            Some(RateLimitSignal::TooManyRequests)
        );
    }

    #[test]
    fn test_403_requires_exhausted_quota() {
        let exhausted = HttpResponse::new(403, "").with_header("X-RateLimit-Remaining", "0");
        assert_eq!(
            classify(&exhausted, false),
            Some(RateLimitSignal::QuotaExhausted)
        );

        let forbidden = HttpResponse::new(403, r#"{"message":"Resource not accessible"}"#)
            .with_header("X-RateLimit-Remaining", "4999");
        assert_eq!(classify(&forbidden, false), None);

        let no_header = HttpResponse::new(403, "");
        assert_eq!(classify(&no_header, false), None);
    }

    #[test]
    fn test_secondary_limit_is_opt_in() {
        let response =
            HttpResponse::new(403, SECONDARY_BODY).with_header("x-ratelimit-remaining", "12");
        assert_eq!(classify(&response, false), None);
        assert_eq!(classify(&response, true), Some(RateLimitSignal::Secondary));
    }

    #[test]
    fn test_other_statuses_are_not_rate_limits() {
        for status in [200, 404, 422, 500] {
            assert_eq!(classify(&HttpResponse::new(status, SECONDARY_BODY), true), None);
        }
    }
}
