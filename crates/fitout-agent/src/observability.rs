//! Stable event names attached as the `event` field on tracing records.

/// Event discriminators for structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AgentEvent {
    SessionCreated,
    SessionEvicted,
    SessionCleared,
    TurnsAppended,
    RouteDecided,
    RouteFallback,
    LookupResolved,
    LookupMissed,
    HandleCompleted,
    HandleTimedOut,
}

impl AgentEvent {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::SessionCreated => "agent.session.created",
            Self::SessionEvicted => "agent.session.evicted",
            Self::SessionCleared => "agent.session.cleared",
            Self::TurnsAppended => "agent.session.turns_appended",
            Self::RouteDecided => "agent.route.decided",
            Self::RouteFallback => "agent.route.fallback",
            Self::LookupResolved => "agent.lookup.resolved",
            Self::LookupMissed => "agent.lookup.missed",
            Self::HandleCompleted => "agent.handle.completed",
            Self::HandleTimedOut => "agent.handle.timed_out",
        }
    }
}
