pub(crate) mod donate;
pub(crate) mod download;
pub(crate) mod prefs;
pub(crate) mod system;
