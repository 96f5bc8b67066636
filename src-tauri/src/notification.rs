use crate::error::AppResult;
use log::{info, warn};
use serde::Serialize;

/// Whether native notifications may be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Unsupported,
    Denied,
    Granted,
    /// Not decided yet, the user can still be asked
    Unknown,
}

/// How a notification reached the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Delivery {
    Native,
    Fallback,
}

/// OS level notification backend
pub trait NativeNotifier: Send + Sync {
    fn permission_state(&self) -> PermissionState;

    fn request_permission(&self) -> PermissionState;

    fn show(&self, title: &str, body: &str) -> AppResult<()>;
}

/// In-app message shown when native notifications cannot be used
pub trait FallbackAlert: Send + Sync {
    fn alert(&self, title: &str, body: &str);
}

/// Anything the scheduler can hand a due reminder to. Never fails.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str) -> Delivery;
}

/// Native notifications with a deterministic fallback.
///
/// Permission is resolved once when the sink is built and never requested again.
pub struct NotificationSink {
    native: Option<Box<dyn NativeNotifier>>,
    fallback: Box<dyn FallbackAlert>,
    permission: PermissionState,
}

impl NotificationSink {
    pub fn new(native: Option<Box<dyn NativeNotifier>>, fallback: Box<dyn FallbackAlert>) -> Self {
        let permission = match &native {
            None => PermissionState::Unsupported,
            Some(native) => match native.permission_state() {
                PermissionState::Unknown => native.request_permission(),
                state => state,
            },
        };
        info!("Notification permission: {:?}", permission);

        Self {
            native,
            fallback,
            permission,
        }
    }

    /// Sink without a native backend, every notification goes to the console
    pub fn headless() -> Self {
        Self::new(None, Box::new(ConsoleAlert))
    }

    pub fn permission(&self) -> PermissionState {
        self.permission
    }
}

impl Notifier for NotificationSink {
    fn notify(&self, title: &str, body: &str) -> Delivery {
        if self.permission == PermissionState::Granted {
            if let Some(native) = &self.native {
                match native.show(title, body) {
                    Ok(()) => return Delivery::Native,
                    Err(e) => warn!("Native notification failed, falling back: {}", e),
                }
            }
        }

        self.fallback.alert(title, body);
        Delivery::Fallback
    }
}

/// Prints a framed message on stderr
pub struct ConsoleAlert;

impl FallbackAlert for ConsoleAlert {
    fn alert(&self, title: &str, body: &str) {
        let width = title.chars().count().max(body.chars().count()) + 4;
        let rule = "=".repeat(width);
        eprintln!("\n{}\n  {}\n\n  {}\n{}\n", rule, title, body, rule);
    }
}
