/// Traversal state definitions for a single crawl attempt
///
/// A crawl of one URL moves forward through the states below. Any step may
/// end the attempt early in `Failed`.
use std::fmt;

/// Why a crawl attempt ended without a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    // ===== Normal Terminations =====
    /// Another attempt (possibly another worker) already claimed the URL
    AlreadyVisited,

    /// The item was deeper than the session allows
    DepthExceeded,

    /// The session was cancelled before this step
    Cancelled,

    // ===== Errors =====
    /// Malformed URL, unsupported scheme, or static-asset extension
    InvalidUrl,

    /// robots.txt forbids this URL for our user agent
    RobotsDisallowed,

    /// robots.txt could not be retrieved, so the URL is not crawled
    RobotsFetchError,

    /// Transport error, timeout, oversized body, or non-2xx status
    FetchError,
}

impl FailureReason {
    /// Returns true for expected outcomes that are not faults
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            Self::AlreadyVisited | Self::DepthExceeded | Self::Cancelled
        )
    }

    pub fn is_error(&self) -> bool {
        !self.is_skip()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyVisited => "already_visited",
            Self::DepthExceeded => "depth_exceeded",
            Self::Cancelled => "cancelled",
            Self::InvalidUrl => "invalid_url",
            Self::RobotsDisallowed => "robots_disallowed",
            Self::RobotsFetchError => "robots_fetch_error",
            Self::FetchError => "fetch_error",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Step of the per-URL traversal state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraversalState {
    Pending,
    CheckingRobots,
    Fetching,
    Extracting,
    QueuingChildren,
    Done,
    Failed(FailureReason),
}

impl TraversalState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }

    /// Checks whether `next` may follow this state
    ///
    /// `Failed` may follow any non-terminal state; otherwise states only
    /// advance one step forward.
    pub fn can_transition_to(&self, next: TraversalState) -> bool {
        use TraversalState::*;

        if self.is_terminal() {
            return false;
        }
        if matches!(next, Failed(_)) {
            return true;
        }

        matches!(
            (self, next),
            (Pending, CheckingRobots)
                | (CheckingRobots, Fetching)
                | (Fetching, Extracting)
                | (Extracting, QueuingChildren)
                | (QueuingChildren, Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::CheckingRobots => "checking_robots",
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::QueuingChildren => "queuing_children",
            Self::Done => "done",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for TraversalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "failed({})", reason),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Ordered record of the states one attempt passed through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalTrace {
    states: Vec<TraversalState>,
}

impl Default for TraversalTrace {
    fn default() -> Self {
        Self::new()
    }
}

impl TraversalTrace {
    pub fn new() -> Self {
        Self {
            states: vec![TraversalState::Pending],
        }
    }

    pub fn current(&self) -> TraversalState {
        self.states
            .last()
            .copied()
            .unwrap_or(TraversalState::Pending)
    }

    /// Moves to `next`, ignoring transitions the state machine forbids
    ///
    /// Returns whether the transition was applied.
    pub fn advance(&mut self, next: TraversalState) -> bool {
        let current = self.current();
        if !current.can_transition_to(next) {
            tracing::warn!("Ignoring invalid traversal transition {} -> {}", current, next);
            return false;
        }
        self.states.push(next);
        true
    }

    pub fn states(&self) -> &[TraversalState] {
        &self.states
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let mut trace = TraversalTrace::new();
        for next in [
            TraversalState::CheckingRobots,
            TraversalState::Fetching,
            TraversalState::Extracting,
            TraversalState::QueuingChildren,
            TraversalState::Done,
        ] {
            assert!(trace.advance(next), "transition to {} rejected", next);
        }
        assert_eq!(trace.states().len(), 6);
        assert!(trace.current().is_terminal());
    }

    #[test]
    fn test_failed_reachable_from_any_active_state() {
        let failed = TraversalState::Failed(FailureReason::FetchError);
        for state in [
            TraversalState::Pending,
            TraversalState::CheckingRobots,
            TraversalState::Fetching,
            TraversalState::Extracting,
            TraversalState::QueuingChildren,
        ] {
            assert!(state.can_transition_to(failed));
        }
    }

    #[test]
    fn test_no_skipping_steps() {
        assert!(!TraversalState::Pending.can_transition_to(TraversalState::Fetching));
        assert!(!TraversalState::Fetching.can_transition_to(TraversalState::Done));
        assert!(!TraversalState::Extracting.can_transition_to(TraversalState::CheckingRobots));
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut trace = TraversalTrace::new();
        trace.advance(TraversalState::Failed(FailureReason::AlreadyVisited));
        assert!(!trace.advance(TraversalState::CheckingRobots));
        assert!(!trace.advance(TraversalState::Failed(FailureReason::FetchError)));
        assert_eq!(
            trace.current(),
            TraversalState::Failed(FailureReason::AlreadyVisited)
        );
    }

    #[test]
    fn test_skip_vs_error() {
        assert!(FailureReason::AlreadyVisited.is_skip());
        assert!(FailureReason::DepthExceeded.is_skip());
        assert!(FailureReason::Cancelled.is_skip());

        assert!(FailureReason::InvalidUrl.is_error());
        assert!(FailureReason::RobotsDisallowed.is_error());
        assert!(FailureReason::RobotsFetchError.is_error());
        assert!(FailureReason::FetchError.is_error());
    }

    #[test]
    fn test_display() {
        assert_eq!(TraversalState::CheckingRobots.to_string(), "checking_robots");
        assert_eq!(
            TraversalState::Failed(FailureReason::RobotsFetchError).to_string(),
            "failed(robots_fetch_error)"
        );
    }
}
