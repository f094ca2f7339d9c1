//! Local network discovery (mDNS) availability.
//!
//! Some systems ship without a working mDNS responder. We can't fix that from
//! here, but we can tell the user instead of silently finding no peers.

use std::error::Error;

use rinf::RustSignal;
use tracing::{debug, info, instrument, warn};

use crate::{
    models::{prefs::SHORT_APP_NAME, signals::system::ShowMessageDialog},
    prefs::{PrefStore, PrefStoreExt},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
}

/// Name of the discovery component and of the OS that normally ships it.
fn platform_component() -> (&'static str, &'static str) {
    if cfg!(target_os = "macos") {
        ("Bonjour", "macOS")
    } else if cfg!(target_os = "windows") {
        ("Bonjour", "Windows")
    } else {
        ("Avahi", "Linux")
    }
}

pub fn missing_discovery_notice(app_name: &str) -> Notice {
    let (component, os) = platform_component();
    Notice {
        title: format!("Install {component}"),
        description: format!(
            "{app_name} has determined that your system may be missing the {component} \
             components, a standard part of {os} installations. Please review your {os} \
             installation."
        ),
    }
}

/// Tries to start an mDNS daemon.
#[instrument]
pub fn discovery_available() -> bool {
    match mdns_sd::ServiceDaemon::new() {
        Ok(daemon) => {
            if let Err(e) = daemon.shutdown() {
                debug!(error = &e as &dyn Error, "Failed to shut down probe mDNS daemon");
            }
            true
        }
        Err(e) => {
            warn!(error = &e as &dyn Error, "mDNS daemon unavailable");
            false
        }
    }
}

/// Shows the missing component dialog if discovery is unavailable.
pub fn check_discovery(prefs: &dyn PrefStore) -> bool {
    if discovery_available() {
        return true;
    }

    let notice = missing_discovery_notice(&prefs.get(&SHORT_APP_NAME));
    info!(title = %notice.title, "Showing missing discovery component dialog");
    ShowMessageDialog { title: notice.title, description: notice.description }
        .send_signal_to_dart();
    false
}
