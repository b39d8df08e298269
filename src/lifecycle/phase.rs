//! Bootstrap progress of one application.

use std::fmt;

/// Where an application got to during bootstrap. Phases only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AppPhase {
    Unconfigured,
    ServerCreated,
    Listening,
    SocketsRegistered,
    WebsocketsRegistered,
    RoutesRegistered,
}

impl AppPhase {
    pub fn next(self) -> Option<AppPhase> {
        match self {
            AppPhase::Unconfigured => Some(AppPhase::ServerCreated),
            AppPhase::ServerCreated => Some(AppPhase::Listening),
            AppPhase::Listening => Some(AppPhase::SocketsRegistered),
            AppPhase::SocketsRegistered => Some(AppPhase::WebsocketsRegistered),
            AppPhase::WebsocketsRegistered => Some(AppPhase::RoutesRegistered),
            AppPhase::RoutesRegistered => None,
        }
    }

    /// Move to `next`, which must directly follow the current phase.
    pub(crate) fn advance(&mut self, app: &str, next: AppPhase) {
        debug_assert_eq!(self.next(), Some(next), "phase skipped for {app}");
        tracing::trace!(app, from = %self, to = %next, "Bootstrap phase");
        *self = next;
    }

    pub fn is_ready(self) -> bool {
        self == AppPhase::RoutesRegistered
    }
}

impl fmt::Display for AppPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppPhase::Unconfigured => "unconfigured",
            AppPhase::ServerCreated => "server-created",
            AppPhase::Listening => "listening",
            AppPhase::SocketsRegistered => "sockets-registered",
            AppPhase::WebsocketsRegistered => "websockets-registered",
            AppPhase::RoutesRegistered => "routes-registered",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_every_phase_in_order() {
        let mut phase = AppPhase::Unconfigured;
        let mut seen = vec![phase];
        while let Some(next) = phase.next() {
            phase.advance("T", next);
            seen.push(phase);
        }
        assert_eq!(seen.len(), 6);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert!(phase.is_ready());
    }
}
