pub mod prefs;
pub(crate) mod signals;
