use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

/// Safety margin subtracted from a token's lifetime, so a token is refreshed shortly before the platform
/// would start rejecting it.
const REFRESH_MARGIN_SECS: i64 = 180;

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// A bearer token cache guarded by a [`tokio::sync::Mutex`].
///
/// Holding the guard across the refresh call is deliberate: when many outbound calls race on an expired
/// token, exactly one performs the refresh and the rest wait for it instead of stampeding the auth endpoint.
#[derive(Debug, Default)]
pub struct TokenCache {
    cached: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached token, or refreshes it through `fetch` when missing or within the refresh margin
    /// of expiry. `fetch` returns the new token and its lifetime in seconds.
    pub async fn bearer_token<F, Fut, E>(&self, fetch: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<(String, i64), E>>,
    {
        let mut guard = self.cached.lock().await;
        let now = Utc::now();
        if let Some(cached) = guard.as_ref() {
            if cached.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now {
                return Ok(cached.token.clone());
            }
        }
        let (token, expires_in) = fetch().await?;
        *guard = Some(CachedToken { token: token.clone(), expires_at: now + Duration::seconds(expires_in) });
        Ok(token)
    }

    /// Drops the cached token so the next call refreshes. Used after a 401 from the platform.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}
