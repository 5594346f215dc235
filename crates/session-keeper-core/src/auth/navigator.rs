use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Route the front end shows when there is no session.
pub const LOGIN_ROUTE: &str = "/auth";

/// Outbound navigation requests to the front end.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// Discards navigation requests (headless use).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, route: &str) {
        debug!(route, "Navigation ignored");
    }
}

/// Forwards navigation requests over a channel to whoever renders the UI.
#[derive(Debug, Clone)]
pub struct ChannelNavigator {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelNavigator {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Navigator for ChannelNavigator {
    fn navigate(&self, route: &str) {
        if let Err(e) = self.tx.send(route.to_string()) {
            warn!(error = %e, "Failed to send navigation - receiver closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_navigator_forwards_route() {
        let (navigator, mut rx) = ChannelNavigator::new();
        navigator.navigate(LOGIN_ROUTE);
        assert_eq!(rx.recv().await.as_deref(), Some("/auth"));
    }

    #[test]
    fn test_noop_navigator_accepts_routes() {
        let navigator: &dyn Navigator = &NoopNavigator;
        navigator.navigate(LOGIN_ROUTE);
    }

    #[test]
    fn test_channel_navigator_survives_closed_receiver() {
        let (navigator, rx) = ChannelNavigator::new();
        drop(rx);
        navigator.navigate(LOGIN_ROUTE);
    }
}
