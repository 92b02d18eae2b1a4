//! Terminal sinks for notifications and navigation.

use shopfront_storefront::navigation::{Navigator, Route};
use shopfront_storefront::notify::{Notification, NotificationLevel, Notifier};

/// Prints notifications to stderr, leaving stdout for command output.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    #[allow(clippy::print_stderr)]
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => eprintln!("error: {}", notification.message),
            NotificationLevel::Success | NotificationLevel::Info => {
                eprintln!("{}", notification.message);
            }
        }
    }
}

/// There are no screens to switch to; route changes are only logged.
pub struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, route: Route) {
        tracing::debug!(%route, "navigate");
    }
}
