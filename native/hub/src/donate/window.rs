//! UI collaborators of the donation manager.

use rinf::RustSignal;
use tracing::debug;

use crate::models::signals::{
    donate::{CloseDonateWindow, ShowDonatePowerToys, ShowDonateWindow},
    system::OpenUrlRequest,
};

/// The donation prompt window.
///
/// Answers arrive back as [`DonateCommand::Clicked`](super::DonateCommand::Clicked).
pub trait DonateWindow: Send {
    fn show(&self, url: &str, payment_url: &str);
    fn close(&self);
}

/// Support dialog for inspecting and resetting donation state.
pub trait DonatePowerToys: Send {
    fn run_dialog(&self);
}

pub trait UrlOpener: Send + Sync {
    fn open_url(&self, url: &str);
}

/// Prompt window rendered by the Flutter UI
#[derive(Debug, Default)]
pub struct DartDonateWindow;

impl DonateWindow for DartDonateWindow {
    fn show(&self, url: &str, payment_url: &str) {
        debug!(url, payment_url, "Showing donate window");
        ShowDonateWindow { url: url.to_string(), payment_url: payment_url.to_string() }
            .send_signal_to_dart();
    }

    fn close(&self) {
        CloseDonateWindow {}.send_signal_to_dart();
    }
}

#[derive(Debug, Default)]
pub struct DartDonatePowerToys;

impl DonatePowerToys for DartDonatePowerToys {
    fn run_dialog(&self) {
        ShowDonatePowerToys {}.send_signal_to_dart();
    }
}

/// Asks the UI to open URLs in the user's browser
#[derive(Debug, Default)]
pub struct DartUrlOpener;

impl UrlOpener for DartUrlOpener {
    fn open_url(&self, url: &str) {
        debug!(url, "Requesting URL open");
        OpenUrlRequest { url: url.to_string() }.send_signal_to_dart();
    }
}
