use crate::robots::{fetch_robots, CachedRobots, ParsedRobots};
use crate::state::HostState;
use crate::storage::FrontierStore;
use crate::url::host_key;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};
use url::Url;

type HostSlot = Arc<AsyncMutex<HostState>>;

/// Hosts tracked in-process before idle entries are evicted
const MAX_TRACKED_HOSTS: usize = 1024;

/// Answers robots.txt questions for URLs, one host state machine per site
///
/// Each host moves `Unknown → Fetching → Cached`. Callers for a host whose
/// robots.txt is being fetched wait on that fetch instead of issuing their
/// own. The shared store's robots cache backs the in-process map, so other
/// workers' fetches are reused.
pub struct PolitenessChecker {
    client: Client,
    store: Arc<dyn FrontierStore>,
    user_agent: String,
    robots_ttl: Duration,
    max_size: u64,
    hosts: Mutex<HashMap<String, HostSlot>>,
}

impl PolitenessChecker {
    /// Creates a checker
    ///
    /// `max_size` bounds robots.txt bodies the same way page bodies are
    /// bounded.
    pub fn new(
        client: Client,
        store: Arc<dyn FrontierStore>,
        user_agent: impl Into<String>,
        robots_ttl: Duration,
        max_size: u64,
    ) -> Self {
        Self {
            client,
            store,
            user_agent: user_agent.into(),
            robots_ttl,
            max_size,
            hosts: Mutex::new(HashMap::new()),
        }
    }

    /// Checks whether robots.txt allows our user agent to fetch `url`
    ///
    /// # Returns
    ///
    /// * `Ok(bool)` - The robots.txt verdict (a host without robots.txt allows all)
    /// * `Err(CrawlError::RobotsFetch)` - robots.txt could not be retrieved
    /// * `Err(CrawlError::StoreUnavailable)` - The shared cache could not be read
    pub async fn is_allowed(&self, url: &Url) -> crate::Result<bool> {
        let robots = self.robots_for(url).await?;
        let allowed = robots.is_allowed(url.as_str(), &self.user_agent);
        debug!("robots.txt {} {}", if allowed { "allows" } else { "disallows" }, url);
        Ok(allowed)
    }

    /// Crawl-delay in seconds that robots.txt requests for `url`'s host
    ///
    /// `None` means the caller should use its own configured delay.
    pub async fn crawl_delay(&self, url: &Url) -> crate::Result<Option<f64>> {
        let robots = self.robots_for(url).await?;
        Ok(robots.crawl_delay(&self.user_agent))
    }

    /// Current politeness state of `url`'s host
    pub fn host_state(&self, url: &Url) -> HostState {
        let slot = self.slot(&host_key(url));
        let state = match slot.try_lock() {
            Ok(state) => state.effective(),
            Err(_) => HostState::Fetching,
        };
        state
    }

    /// Number of hosts currently tracked in-process
    pub fn tracked_hosts(&self) -> usize {
        self.hosts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn slot(&self, host: &str) -> HostSlot {
        let mut hosts = self.hosts.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !hosts.contains_key(host) && hosts.len() >= MAX_TRACKED_HOSTS {
            evict_idle(&mut hosts);
        }
        hosts.entry(host.to_string()).or_default().clone()
    }

    fn chrono_ttl(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.robots_ttl).unwrap_or_else(|_| chrono::Duration::days(1))
    }

    async fn robots_for(&self, url: &Url) -> crate::Result<CachedRobots> {
        let host = host_key(url);
        let slot = self.slot(&host);
        let mut state = slot.lock().await;

        if let Some(cached) = state.fresh_robots() {
            return Ok(cached.clone());
        }

        let cached = match self.store.get_robots_record(&host) {
            Ok(Some(record)) => {
                debug!("Loaded robots.txt for {} from shared cache", host);
                CachedRobots::restored(
                    ParsedRobots::from_content(&record.text),
                    record.fetched_at,
                    record.expires_at,
                )
            }
            Ok(None) => {
                *state = HostState::Fetching;
                match fetch_robots(&self.client, &host, self.max_size).await {
                    Ok(text) => {
                        if let Err(e) = self.store.cache_robots(&host, &text, self.robots_ttl) {
                            *state = HostState::Unknown;
                            return Err(e.into());
                        }
                        CachedRobots::new(ParsedRobots::from_content(&text), self.chrono_ttl())
                    }
                    Err(e) => {
                        warn!("robots.txt unavailable for {}: {}", host, e);
                        *state = HostState::Unknown;
                        return Err(e);
                    }
                }
            }
            Err(e) => {
                *state = HostState::Unknown;
                return Err(e.into());
            }
        };

        *state = HostState::Cached(cached.clone());
        Ok(cached)
    }
}

/// Drops host entries nobody is using, stale ones first
///
/// Fresh entries are only dropped when stale ones do not free enough room;
/// they reload from the shared store on next use.
fn evict_idle(hosts: &mut HashMap<String, HostSlot>) {
    let idle = |slot: &HostSlot| Arc::strong_count(slot) == 1;
    hosts.retain(|_, slot| {
        !idle(slot) || slot.try_lock().map_or(true, |state| state.fresh_robots().is_some())
    });
    if hosts.len() >= MAX_TRACKED_HOSTS {
        hosts.retain(|_, slot| !idle(slot));
    }
}
