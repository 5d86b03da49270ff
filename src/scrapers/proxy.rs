//! Timed proxy rotation over a static pool.
//!
//! The pool is loaded once at construction from configuration or a proxy
//! list file. Running without proxies is a normal, logged condition.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};

use tracing::{info, warn};

use crate::config::ProxyConfig;

#[derive(Debug)]
struct ProxyState {
    pool: Vec<String>,
    current: Option<String>,
    rotated_at: Option<Instant>,
}

/// Rotates the outbound proxy address on a timed interval.
///
/// Clones share state, so the fetch layer can hand a rotator to the request
/// machinery while keeping its own handle.
#[derive(Debug, Clone)]
pub struct ProxyRotator {
    interval: Duration,
    state: Arc<Mutex<ProxyState>>,
}

impl ProxyRotator {
    /// Rotator over an explicit pool.
    pub fn new(pool: Vec<String>, interval: Duration) -> Self {
        Self {
            interval,
            state: Arc::new(Mutex::new(ProxyState {
                pool,
                current: None,
                rotated_at: None,
            })),
        }
    }

    /// Build from configuration: inline list first, proxy file second,
    /// otherwise an empty pool with a logged warning.
    pub fn from_config(config: &ProxyConfig) -> Self {
        let pool = if !config.list.is_empty() {
            config.list.clone()
        } else if let Some(ref file) = config.file {
            load_proxy_file(Path::new(shellexpand::tilde(file).as_ref()))
        } else {
            Vec::new()
        };

        if pool.is_empty() {
            warn!("No proxy list found. Running without proxies.");
        } else {
            info!("Loaded {} proxies", pool.len());
        }

        Self::new(pool, Duration::from_secs(config.rotation_interval_secs))
    }

    /// Current proxy address, rotating first if the interval has elapsed.
    /// Returns `None` when the pool is empty.
    pub fn get_proxy(&self) -> Option<String> {
        self.get_proxy_at(Instant::now())
    }

    pub(crate) fn get_proxy_at(&self, now: Instant) -> Option<String> {
        let mut state = self.state.lock().unwrap();
        if state.pool.is_empty() {
            return None;
        }

        let due = match (state.current.as_ref(), state.rotated_at) {
            (Some(_), Some(rotated_at)) => now.duration_since(rotated_at) > self.interval,
            _ => true,
        };

        if due {
            let index = clock_index(state.pool.len());
            state.current = Some(state.pool[index].clone());
            state.rotated_at = Some(now);
        }

        state.current.clone()
    }

    pub fn pool_size(&self) -> usize {
        self.state.lock().unwrap().pool.len()
    }
}

/// One proxy address per non-empty line.
fn load_proxy_file(path: &Path) -> Vec<String> {
    match fs::read_to_string(path) {
        Ok(content) => content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect(),
        Err(err) => {
            warn!("Could not read proxy file {}: {}", path.display(), err);
            Vec::new()
        }
    }
}

/// Uniform index drawn from the system clock's nanosecond field.
fn clock_index(len: usize) -> usize {
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos() as usize)
        .unwrap_or(0);
    nanos % len
}
