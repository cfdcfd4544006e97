//! Global shortcut that brings the dashboard window forward.
//!
//! The OS side lives behind [HotkeyService] and [WindowHost]. Only one binding is ever active:
//! installing always clears every existing registration first so reloads never stack triggers.
//!
//! The desktop host that owns the window calls [install_hotkey] at startup with its own
//! [HotkeyService], handing over the [RefreshSender] of the running dashboard. The CLI has no
//! window and never installs one.

use std::sync::Arc;

use anyhow::Result;
#[cfg(test)]
use mockall::automock;
use tracing::{error, info, warn};

use crate::source::RefreshSender;

/// Binding registered when nothing else is configured.
pub const DEFAULT_BINDING: &str = "Option+F";

pub type HotkeyCallback = Box<dyn Fn() + Send + Sync + 'static>;

#[cfg_attr(test, automock)]
pub trait HotkeyService {
    fn register(&mut self, binding: &str, on_trigger: HotkeyCallback) -> Result<()>;

    fn unregister_all(&mut self) -> Result<()>;
}

/// The process hosting the dashboard window.
#[cfg_attr(test, automock)]
pub trait WindowHost: Send + Sync {
    /// Fire and forget; the host decides how to show and focus the window.
    fn show_window(&self) -> Result<()>;
}

/// Replaces any registered shortcut with `binding`. Failures are logged and the application
/// carries on without a global shortcut; the return value tells whether the binding is active.
pub fn install_hotkey(
    service: &mut dyn HotkeyService,
    binding: &str,
    host: Arc<dyn WindowHost>,
    refresh: RefreshSender,
) -> bool {
    let result = service.unregister_all().and_then(|_| {
        service.register(
            binding,
            Box::new(move || {
                if let Err(e) = host.show_window() {
                    error!("Failed to show window {e:?}");
                }
                // A shown window should display current data.
                if !refresh.notify() {
                    warn!("Dashboard is not listening for refreshes");
                }
            }),
        )
    });

    match result {
        Ok(()) => {
            info!("Registered global shortcut {binding}");
            true
        }
        Err(e) => {
            error!("Failed to register global shortcut {binding} {e:?}");
            false
        }
    }
}
