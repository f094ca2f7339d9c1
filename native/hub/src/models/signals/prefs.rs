use rinf::{DartSignal, RustSignal};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, DartSignal)]
pub struct LoadPrefsRequest {}

/// Every stored pref as one JSON object
#[derive(Serialize, Deserialize, RustSignal)]
pub struct PrefsLoadedEvent {
    pub prefs_json: String,
}

#[derive(Serialize, Deserialize, RustSignal)]
pub struct PrefChangedEvent {
    pub key: String,
    pub value_json: String,
}
