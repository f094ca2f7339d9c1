//! Declared app-wide preferences.

use crate::prefs::Pref;

/// How many times the user dismissed the donation prompt with "no thanks".
pub const DONATE_NOTHANKS: Pref<i64> =
    Pref { key: "donate.nothanks_count", default: || 0, platform_specific: false };

/// Downloads left before the donation prompt may show again.
pub const DONATE_COUNTER: Pref<i64> =
    Pref { key: "donate.counter", default: || 3, platform_specific: false };

/// Unix seconds of the last accepted donation, 0 when the user never donated.
pub const LAST_DONATE_TIME: Pref<i64> =
    Pref { key: "donate.last_donate_time", default: || 0, platform_specific: false };

pub const SHORT_APP_NAME: Pref<String> =
    Pref { key: "shortAppName", default: || "Miro".to_string(), platform_specific: false };
