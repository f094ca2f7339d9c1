use rinf::RustSignal;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, RustSignal)]
pub struct RustPanic {
    pub message: String,
}

/// A modal message box with a single dismiss button.
#[derive(Serialize, Deserialize, RustSignal)]
pub struct ShowMessageDialog {
    pub title: String,
    pub description: String,
}

#[derive(Serialize, Deserialize, RustSignal)]
pub struct OpenUrlRequest {
    pub url: String,
}
