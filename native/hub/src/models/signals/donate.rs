use rinf::{DartSignal, RustSignal};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, RustSignal)]
pub struct ShowDonateWindow {
    pub url: String,
    pub payment_url: String,
}

#[derive(Serialize, Deserialize, RustSignal)]
pub struct CloseDonateWindow {}

#[derive(Serialize, Deserialize, RustSignal)]
pub struct ShowDonatePowerToys {}

/// The user answered the donation prompt.
#[derive(Debug, Serialize, Deserialize, DartSignal)]
pub struct DonateClicked {
    pub accepted: bool,
    pub payment_url: String,
}

/// Shows the prompt on demand, from the power toys dialog.
#[derive(Debug, Serialize, Deserialize, DartSignal)]
pub struct ShowDonateRequest {
    pub url: Option<String>,
    pub payment_url: Option<String>,
}

#[derive(Serialize, Deserialize, DartSignal)]
pub struct ResetDonateRequest {}

#[derive(Serialize, Deserialize, DartSignal)]
pub struct RunDonatePowerToysRequest {}
