use crate::robots::CachedRobots;

/// Politeness state of a single host
///
/// `Unknown → Fetching → Cached`, with a stale `Cached` entry reading as
/// `Unknown` again.
#[derive(Debug, Clone, Default)]
pub enum HostState {
    /// No usable robots.txt is known for this host
    #[default]
    Unknown,

    /// A robots.txt lookup for this host is in flight
    Fetching,

    /// robots.txt is known and within its retention window
    Cached(CachedRobots),
}

impl HostState {
    /// Returns the state as seen now, demoting stale cache entries
    pub fn effective(&self) -> HostState {
        match self {
            Self::Cached(cached) if cached.is_stale() => Self::Unknown,
            other => other.clone(),
        }
    }

    /// Cached robots data if still fresh
    pub fn fresh_robots(&self) -> Option<&CachedRobots> {
        match self {
            Self::Cached(cached) if !cached.is_stale() => Some(cached),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.effective(), Self::Unknown)
    }

    pub fn is_fetching(&self) -> bool {
        matches!(self, Self::Fetching)
    }

    pub fn is_cached(&self) -> bool {
        self.fresh_robots().is_some()
    }
}
