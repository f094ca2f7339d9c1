use std::{
    collections::BTreeMap,
    error::Error,
    fs,
    path::PathBuf,
    sync::{Arc, RwLock},
};

use anyhow::{Context, Result, ensure};
use rinf::{DartSignal, RustSignal};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::models::signals::prefs::{LoadPrefsRequest, PrefChangedEvent, PrefsLoadedEvent};

const PREFS_FILE_NAME: &str = "prefs.json";

/// A declared preference: its storage key and how to produce its default.
#[derive(Debug)]
pub struct Pref<T> {
    pub key: &'static str,
    pub default: fn() -> T,
    /// Carried for parity with the platform options table.
    pub platform_specific: bool,
}

impl<T> Pref<T> {
    pub fn default_value(&self) -> T {
        (self.default)()
    }
}

/// A preference value changed in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefChanged {
    pub key: String,
    pub value: Value,
}

/// Untyped key/value preference storage.
pub trait PrefStore: Send + Sync {
    fn get_value(&self, key: &str) -> Option<Value>;

    /// Stores `value` under `key` and persists it right away.
    fn set_value(&self, key: &str, value: Value) -> Result<()>;
}

/// Typed access to a [`PrefStore`] through [`Pref`] descriptors.
pub trait PrefStoreExt: PrefStore {
    /// Returns the stored value, or the pref's default when it is missing or has
    /// the wrong type.
    fn get<T: DeserializeOwned>(&self, pref: &Pref<T>) -> T {
        let Some(value) = self.get_value(pref.key) else {
            return pref.default_value();
        };
        match serde_json::from_value(value) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = &e as &dyn Error, key = pref.key, "Stored pref has wrong type, using default");
                pref.default_value()
            }
        }
    }

    fn set<T: Serialize>(&self, pref: &Pref<T>, value: T) -> Result<()> {
        let value = serde_json::to_value(value)
            .with_context(|| format!("Failed to serialize pref {}", pref.key))?;
        self.set_value(pref.key, value)
    }

    fn reset<T: Serialize>(&self, pref: &Pref<T>) -> Result<()> {
        self.set(pref, pref.default_value())
    }
}

impl<S: PrefStore + ?Sized> PrefStoreExt for S {}

/// Preferences persisted as a flat JSON object in the app directory
#[derive(Debug)]
pub struct PrefsHandler {
    prefs_file_path: PathBuf,
    values: RwLock<BTreeMap<String, Value>>,
    changes_tx: broadcast::Sender<PrefChanged>,
}

impl PrefsHandler {
    #[instrument(skip(app_dir))]
    pub fn new(app_dir: PathBuf) -> Arc<Self> {
        let (changes_tx, _) = broadcast::channel(64);
        let handler = Self {
            prefs_file_path: app_dir.join(PREFS_FILE_NAME),
            values: RwLock::new(BTreeMap::new()),
            changes_tx,
        };

        match handler.load_prefs() {
            Ok(values) => *handler.values.write().unwrap_or_else(|e| e.into_inner()) = values,
            Err(e) => {
                warn!(error = e.as_ref() as &dyn Error, "Failed to load prefs, using defaults.");
            }
        }

        Arc::new(handler)
    }

    /// Create a receiver for pref changes
    pub fn subscribe(&self) -> broadcast::Receiver<PrefChanged> {
        self.changes_tx.subscribe()
    }

    /// Answers pref requests from the UI until the signal channel closes.
    pub async fn receive_prefs_requests(self: Arc<Self>) {
        let load_receiver = LoadPrefsRequest::get_dart_signal_receiver();
        let mut changes = self.subscribe();

        info!("Starting to listen for prefs requests");

        loop {
            tokio::select! {
                Some(_) = load_receiver.recv() => {
                    info!("Received LoadPrefsRequest");
                    match serde_json::to_string(&self.snapshot()) {
                        Ok(prefs_json) => PrefsLoadedEvent { prefs_json }.send_signal_to_dart(),
                        Err(e) => error!(error = &e as &dyn Error, "Failed to serialize prefs"),
                    }
                },
                change = changes.recv() => match change {
                    Ok(PrefChanged { key, value }) => {
                        PrefChangedEvent { key, value_json: value.to_string() }.send_signal_to_dart();
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Pref change forwarder lagged behind");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                else => break,
            }
        }
        error!("Prefs request loop ended");
    }

    /// Copy of every stored value
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.values.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Load prefs from file, or nothing if the file doesn't exist
    #[instrument(skip(self))]
    fn load_prefs(&self) -> Result<BTreeMap<String, Value>> {
        if !self.prefs_file_path.exists() {
            info!(path = %self.prefs_file_path.display(), "Prefs file doesn't exist, using defaults");
            return Ok(BTreeMap::new());
        }

        info!(path = %self.prefs_file_path.display(), "Loading prefs from file");
        let file_content =
            fs::read_to_string(&self.prefs_file_path).context("Failed to read prefs file")?;

        let values: BTreeMap<String, Value> =
            serde_json::from_str(&file_content).context("Failed to parse prefs file")?;

        debug!(count = values.len(), "Loaded prefs successfully");
        Ok(values)
    }

    /// Write prefs to file through a temporary file
    #[instrument(skip(self, values))]
    fn save_prefs(&self, values: &BTreeMap<String, Value>) -> Result<()> {
        trace!(path = %self.prefs_file_path.display(), "Saving prefs to file");
        let prefs_json =
            serde_json::to_string_pretty(values).context("Failed to serialize prefs")?;

        if let Some(parent) = self.prefs_file_path.parent()
            && !parent.exists()
        {
            info!(path = %parent.display(), "Creating prefs directory");
            fs::create_dir_all(parent).context("Failed to create prefs directory")?;
        }

        let tmp = self.prefs_file_path.with_extension("json.tmp");
        let res = fs::write(&tmp, prefs_json)
            .context("Failed to write temporary prefs file")
            .and_then(|_| {
                fs::rename(&tmp, &self.prefs_file_path).with_context(|| {
                    format!("Failed to replace {}", self.prefs_file_path.display())
                })
            });
        if res.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        res
    }
}

impl PrefStore for PrefsHandler {
    fn get_value(&self, key: &str) -> Option<Value> {
        self.values.read().unwrap_or_else(|e| e.into_inner()).get(key).cloned()
    }

    #[instrument(skip(self, value))]
    fn set_value(&self, key: &str, value: Value) -> Result<()> {
        ensure!(!key.is_empty(), "Pref key must not be empty");

        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        if values.get(key) == Some(&value) {
            trace!("Pref unchanged, not saving");
            return Ok(());
        }

        // Memory only changes once the file does
        let mut updated = values.clone();
        updated.insert(key.to_string(), value.clone());
        self.save_prefs(&updated)?;
        *values = updated;
        drop(values);

        debug!(value = %value, "Pref changed");
        // No subscribers is fine
        let _ = self.changes_tx.send(PrefChanged { key: key.to_string(), value });
        Ok(())
    }
}
