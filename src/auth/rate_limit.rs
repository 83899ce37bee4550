use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const DEFAULT_MAX_ATTEMPTS: usize = 5;
const DEFAULT_WINDOW: Duration = Duration::from_secs(900);

/// Failed-login limiter keyed by client address.
#[derive(Clone)]
pub struct RateLimiter {
    max_attempts: usize,
    window: Duration,
    attempts: Arc<Mutex<HashMap<IpAddr, Vec<Instant>>>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW)
    }
}

impl RateLimiter {
    pub fn new(max_attempts: usize, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            attempts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// True once `max_attempts` failures fall inside the window. Expired
    /// timestamps for the address are dropped on the way.
    pub fn is_blocked(&self, ip: IpAddr) -> bool {
        let mut map = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        let Some(cutoff) = Instant::now().checked_sub(self.window) else {
            return map.get(&ip).is_some_and(|t| t.len() >= self.max_attempts);
        };
        match map.get_mut(&ip) {
            Some(timestamps) => {
                timestamps.retain(|t| *t > cutoff);
                timestamps.len() >= self.max_attempts
            }
            None => false,
        }
    }

    pub fn record_failure(&self, ip: IpAddr) {
        let mut map = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(ip).or_default().push(Instant::now());
    }

    pub fn clear(&self, ip: IpAddr) {
        let mut map = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(&ip);
    }
}
