//! Periodic donation prompt.
//!
//! Every completed download counts down `donate.counter`. When a download
//! completes with the counter already at zero and no donation on record, the
//! prompt is shown. The counter is re-armed on every download, to a value
//! that grows with the number of times the user said "no thanks". Once the
//! user donates, the prompt never shows again until the state is reset.

use std::{error::Error, sync::Arc};

use rinf::DartSignal;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tracing::{Instrument, debug, error, info, info_span, instrument, trace, warn};

use crate::{
    events::SystemEvent,
    models::{
        prefs::{DONATE_COUNTER, DONATE_NOTHANKS, LAST_DONATE_TIME},
        signals::donate::{
            DonateClicked, ResetDonateRequest, RunDonatePowerToysRequest, ShowDonateRequest,
        },
    },
    prefs::{PrefChanged, PrefStore, PrefStoreExt},
};

pub mod window;

use window::{DonatePowerToys, DonateWindow, UrlOpener};

/// Countdown assigned after each download, indexed by "no thanks" count.
pub const NOTHANKS_REARM_COUNTS: [i64; 2] = [50, 100];
/// Landing page variant, indexed by "no thanks" count.
pub const DONATE_URL_VARIANTS: [u32; 3] = [1, 2, 3];
pub const DONATE_URL_FALLBACK_VARIANT: &str = "t";
pub const DONATE_URL_BASE: &str = "http://getmiro.com/give/";
pub const PAYMENT_URL: &str = "http://getmiro.com/";

/// Reads a stored integer, accepting fractional Unix timestamps.
///
/// Fractions round up so a positive timestamp never reads back as zero.
fn integer_from_value(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|v| v.ceil() as i64))
}

/// Entry for `nothanks` declines, treating negative counts as zero.
fn table_entry<T>(table: &[T], nothanks: i64) -> Option<&T> {
    let index = usize::try_from(nothanks.max(0)).unwrap_or(usize::MAX);
    table.get(index)
}

/// Downloads until the prompt may show again.
pub fn rearm_count(nothanks: i64) -> i64 {
    // Declining more often than the table covers keeps the last entry
    table_entry(&NOTHANKS_REARM_COUNTS, nothanks)
        .or(NOTHANKS_REARM_COUNTS.last())
        .copied()
        .unwrap_or_default()
}

/// Landing page shown in the prompt.
pub fn donate_url(nothanks: i64) -> String {
    match table_entry(&DONATE_URL_VARIANTS, nothanks) {
        Some(variant) => format!("{DONATE_URL_BASE}m{variant}/"),
        None => format!("{DONATE_URL_BASE}m{DONATE_URL_FALLBACK_VARIANT}/"),
    }
}

/// Where the donation countdown stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NagPhase {
    /// The next completed download shows the prompt.
    Eligible,
    CountingDown,
    /// The user donated; prompts stay off until reset.
    Donated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DonateState {
    pub nothanks: i64,
    pub counter: i64,
    pub last_donate_time: i64,
}

impl DonateState {
    pub fn load(prefs: &dyn PrefStore) -> Self {
        Self {
            nothanks: prefs.get(&DONATE_NOTHANKS),
            counter: prefs.get(&DONATE_COUNTER),
            last_donate_time: prefs
                .get_value(LAST_DONATE_TIME.key)
                .and_then(|value| integer_from_value(&value))
                .unwrap_or_else(|| LAST_DONATE_TIME.default_value()),
        }
    }

    pub fn phase(&self) -> NagPhase {
        if self.last_donate_time > 0 {
            NagPhase::Donated
        } else if self.counter > 0 {
            NagPhase::CountingDown
        } else {
            NagPhase::Eligible
        }
    }
}

/// Requests coming from the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DonateCommand {
    Clicked { accepted: bool, payment_url: String },
    Show { url: Option<String>, payment_url: Option<String> },
    Reset,
    RunPowerToys,
    Shutdown,
}

/// Decides when to show the donation prompt.
///
/// All methods expect to be called from a single task, see [`DonateManager::run`].
pub struct DonateManager {
    prefs: Arc<dyn PrefStore>,
    url_opener: Arc<dyn UrlOpener>,
    window: Option<Box<dyn DonateWindow>>,
    powertoys: Option<Box<dyn DonatePowerToys>>,
    state: DonateState,
}

impl DonateManager {
    #[instrument(skip_all)]
    pub fn new(prefs: Arc<dyn PrefStore>, url_opener: Arc<dyn UrlOpener>) -> Self {
        let state = DonateState::load(prefs.as_ref());
        debug!(?state, phase = ?state.phase(), "Loaded donation state");
        Self { prefs, url_opener, window: None, powertoys: None, state }
    }

    /// Hooks up the UI side. Until this is called, prompts are silently skipped.
    pub fn attach_windows(
        &mut self,
        window: Box<dyn DonateWindow>,
        powertoys: Box<dyn DonatePowerToys>,
    ) {
        self.window = Some(window);
        self.powertoys = Some(powertoys);
    }

    pub fn state(&self) -> DonateState {
        self.state
    }

    pub fn run_powertoys(&self) {
        if let Some(powertoys) = &self.powertoys {
            powertoys.run_dialog();
        }
    }

    /// Keeps the in-memory copy in sync with the pref store.
    pub fn on_config_changed(&mut self, key: &str, value: &Value) {
        let slot = if key == DONATE_NOTHANKS.key {
            &mut self.state.nothanks
        } else if key == DONATE_COUNTER.key {
            &mut self.state.counter
        } else if key == LAST_DONATE_TIME.key {
            &mut self.state.last_donate_time
        } else {
            return;
        };

        match integer_from_value(value) {
            Some(v) => {
                trace!(key, value = v, "Donation pref changed");
                *slot = v;
            }
            None => warn!(key, %value, "Ignoring non-integer donation pref"),
        }
    }

    /// Counts a completed download. Returns whether the prompt was due.
    #[instrument(skip(self))]
    pub fn on_download_complete(&mut self) -> bool {
        let rearm = rearm_count(self.state.nothanks);

        self.state.counter = self.state.counter.saturating_sub(1);

        // Persisted values may be corrupted
        if self.state.counter < 0 {
            self.state.counter = 0;
        }
        if self.state.last_donate_time < 0 {
            self.state.last_donate_time = 0;
        }

        debug!(
            nothanks = self.state.nothanks,
            counter = self.state.counter,
            last_donate_time = self.state.last_donate_time,
            "Download complete"
        );

        let show = self.state.counter == 0 && self.state.last_donate_time == 0;

        self.state.counter = rearm;
        if let Err(e) = self.prefs.set(&DONATE_COUNTER, rearm) {
            warn!(error = e.as_ref() as &dyn Error, "Failed to save donate counter");
        }

        if show {
            info!(rearm, "Donation prompt due");
            self.show_donate(None, None);
        }
        show
    }

    #[instrument(skip(self))]
    pub fn on_donate_clicked(&mut self, accepted: bool, payment_url: &str) {
        if accepted {
            self.url_opener.open_url(payment_url);
            self.state.last_donate_time = time::OffsetDateTime::now_utc().unix_timestamp();
            info!(last_donate_time = self.state.last_donate_time, "User chose to donate");
            if let Err(e) = self.prefs.set(&LAST_DONATE_TIME, self.state.last_donate_time) {
                warn!(error = e.as_ref() as &dyn Error, "Failed to save last donate time");
            }
        } else {
            self.state.nothanks = self.state.nothanks.saturating_add(1);
            info!(nothanks = self.state.nothanks, "User declined to donate");
            if let Err(e) = self.prefs.set(&DONATE_NOTHANKS, self.state.nothanks) {
                warn!(error = e.as_ref() as &dyn Error, "Failed to save no thanks count");
            }
            if let Some(window) = &self.window {
                window.close();
            }
        }
    }

    /// Shows the prompt, picking the landing page from the "no thanks" count
    /// when `url` is not given.
    pub fn show_donate(&self, url: Option<&str>, payment_url: Option<&str>) {
        let url = url
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| donate_url(self.state.nothanks));
        let payment_url = payment_url.filter(|u| !u.is_empty()).unwrap_or(PAYMENT_URL);

        match &self.window {
            Some(window) => window.show(&url, payment_url),
            None => debug!(%url, "Donate window not created yet, skipping prompt"),
        }
    }

    /// Restores the donation prefs to their defaults.
    #[instrument(skip(self))]
    pub fn reset(&mut self) {
        info!("Resetting donation state");
        for result in [
            self.prefs.reset(&DONATE_NOTHANKS),
            self.prefs.reset(&LAST_DONATE_TIME),
            self.prefs.reset(&DONATE_COUNTER),
        ] {
            if let Err(e) = result {
                warn!(error = e.as_ref() as &dyn Error, "Failed to reset donation pref");
            }
        }
        self.state = DonateState {
            nothanks: DONATE_NOTHANKS.default_value(),
            counter: DONATE_COUNTER.default_value(),
            last_donate_time: LAST_DONATE_TIME.default_value(),
        };
    }

    pub fn shutdown(&mut self) {
        if let Some(window) = self.window.take() {
            window.close();
        }
    }

    pub fn handle_command(&mut self, command: DonateCommand) {
        match command {
            DonateCommand::Clicked { accepted, payment_url } => {
                self.on_donate_clicked(accepted, &payment_url)
            }
            DonateCommand::Show { url, payment_url } => {
                self.show_donate(url.as_deref(), payment_url.as_deref())
            }
            DonateCommand::Reset => self.reset(),
            DonateCommand::RunPowerToys => self.run_powertoys(),
            DonateCommand::Shutdown => self.shutdown(),
        }
    }

    /// Handles pref changes, system events and UI commands one at a time
    /// until the command channel closes or a shutdown is requested.
    pub async fn run(
        mut self,
        mut pref_changes: broadcast::Receiver<PrefChanged>,
        mut events: broadcast::Receiver<SystemEvent>,
        mut commands: mpsc::UnboundedReceiver<DonateCommand>,
    ) {
        info!("Donation manager started");
        loop {
            // Pref changes first, so events see the latest stored values
            tokio::select! {
                biased;

                change = pref_changes.recv() => match change {
                    Ok(PrefChanged { key, value }) => self.on_config_changed(&key, &value),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // The store is the source of truth, reload from it
                        warn!(skipped, "Missed pref changes, reloading donation state");
                        self.state = DonateState::load(self.prefs.as_ref());
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        error!("Pref change channel closed");
                        break;
                    }
                },
                event = events.recv() => match event {
                    Ok(SystemEvent::DownloadComplete { item_id }) => {
                        trace!(%item_id, "Received download complete");
                        self.on_download_complete();
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Missed system events");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        error!("System event channel closed");
                        break;
                    }
                },
                command = commands.recv() => match command {
                    Some(DonateCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
            }
        }
        self.shutdown();
        info!("Donation manager stopped");
    }
}

/// Forwards donation requests from the UI to the manager's command channel.
pub fn start_request_handler(commands: mpsc::UnboundedSender<DonateCommand>) {
    tokio::spawn(
        async move {
            let clicked_receiver = DonateClicked::get_dart_signal_receiver();
            let show_receiver = ShowDonateRequest::get_dart_signal_receiver();
            let reset_receiver = ResetDonateRequest::get_dart_signal_receiver();
            let powertoys_receiver = RunDonatePowerToysRequest::get_dart_signal_receiver();

            loop {
                let command = tokio::select! {
                    Some(pack) = clicked_receiver.recv() => DonateCommand::Clicked {
                        accepted: pack.message.accepted,
                        payment_url: pack.message.payment_url,
                    },
                    Some(pack) = show_receiver.recv() => DonateCommand::Show {
                        url: pack.message.url,
                        payment_url: pack.message.payment_url,
                    },
                    Some(_) = reset_receiver.recv() => DonateCommand::Reset,
                    Some(_) = powertoys_receiver.recv() => DonateCommand::RunPowerToys,
                    else => {
                        error!("All donate request channels closed");
                        break;
                    }
                };
                debug!(?command, "Received donate request");
                if commands.send(command).is_err() {
                    debug!("Donation manager is gone, stopping request handler");
                    break;
                }
            }
        }
        .instrument(info_span!("task_donate_request_handler")),
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;
    use tempfile::{TempDir, tempdir};
    use test_log::test;

    use super::*;
    use crate::{events::SystemEvents, prefs::PrefsHandler};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum UiCall {
        Show { url: String, payment_url: String },
        Close,
        PowerToys,
        OpenUrl(String),
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<UiCall>>>);

    impl Recorder {
        fn calls(&self) -> Vec<UiCall> {
            self.0.lock().unwrap().clone()
        }

        fn push(&self, call: UiCall) {
            self.0.lock().unwrap().push(call);
        }
    }

    impl DonateWindow for Recorder {
        fn show(&self, url: &str, payment_url: &str) {
            self.push(UiCall::Show { url: url.to_string(), payment_url: payment_url.to_string() });
        }

        fn close(&self) {
            self.push(UiCall::Close);
        }
    }

    impl DonatePowerToys for Recorder {
        fn run_dialog(&self) {
            self.push(UiCall::PowerToys);
        }
    }

    impl UrlOpener for Recorder {
        fn open_url(&self, url: &str) {
            self.push(UiCall::OpenUrl(url.to_string()));
        }
    }

    struct Fixture {
        _dir: TempDir,
        prefs: Arc<PrefsHandler>,
        ui: Recorder,
    }

    impl Fixture {
        fn new(nothanks: i64, counter: i64, last_donate_time: i64) -> Self {
            let dir = tempdir().unwrap();
            let prefs = PrefsHandler::new(dir.path().to_path_buf());
            prefs.set(&DONATE_NOTHANKS, nothanks).unwrap();
            prefs.set(&DONATE_COUNTER, counter).unwrap();
            prefs.set(&LAST_DONATE_TIME, last_donate_time).unwrap();
            Self { _dir: dir, prefs, ui: Recorder::default() }
        }

        fn manager(&self) -> DonateManager {
            let mut manager =
                DonateManager::new(self.prefs.clone(), Arc::new(self.ui.clone()));
            manager.attach_windows(Box::new(self.ui.clone()), Box::new(self.ui.clone()));
            manager
        }
    }

    #[test]
    fn rearm_count_saturates() {
        assert_eq!(rearm_count(0), 50);
        assert_eq!(rearm_count(1), 100);
        assert_eq!(rearm_count(2), 100);
        assert_eq!(rearm_count(i64::MAX), 100);
        assert_eq!(rearm_count(-3), 50);
    }

    #[test]
    fn donate_url_falls_back_past_the_table() {
        assert_eq!(donate_url(0), "http://getmiro.com/give/m1/");
        assert_eq!(donate_url(2), "http://getmiro.com/give/m3/");
        assert_eq!(donate_url(3), "http://getmiro.com/give/mt/");
        assert_eq!(donate_url(100), "http://getmiro.com/give/mt/");
    }

    #[test]
    fn last_download_of_the_countdown_shows() {
        let fixture = Fixture::new(0, 1, 0);
        let mut manager = fixture.manager();

        assert!(manager.on_download_complete());
        assert_eq!(manager.state().counter, 50);
        assert_eq!(fixture.prefs.get(&DONATE_COUNTER), 50);
        assert_eq!(fixture.ui.calls().len(), 1);
    }

    #[test]
    fn counting_down_does_not_show_and_rearms() {
        let fixture = Fixture::new(0, 2, 0);
        let mut manager = fixture.manager();

        assert!(!manager.on_download_complete());
        assert_eq!(manager.state().counter, 50);
        assert_eq!(fixture.prefs.get(&DONATE_COUNTER), 50);
        assert!(fixture.ui.calls().is_empty());
    }

    #[test]
    fn eligible_shows_and_rearms_in_the_same_call() {
        let fixture = Fixture::new(1, 0, 0);
        let mut manager = fixture.manager();
        assert_eq!(manager.state().phase(), NagPhase::Eligible);

        assert!(manager.on_download_complete());
        assert_eq!(manager.state().counter, 100);
        assert_eq!(manager.state().phase(), NagPhase::CountingDown);
        assert_eq!(fixture.prefs.get(&DONATE_COUNTER), 100);
        assert_eq!(
            fixture.ui.calls(),
            vec![UiCall::Show {
                url: "http://getmiro.com/give/m2/".to_string(),
                payment_url: PAYMENT_URL.to_string(),
            }]
        );

        // Freshly re-armed, so the next download stays quiet
        assert!(!manager.on_download_complete());
    }

    #[test]
    fn donated_state_never_shows() {
        let fixture = Fixture::new(0, 0, 1_300_000_000);
        let mut manager = fixture.manager();
        assert_eq!(manager.state().phase(), NagPhase::Donated);

        for _ in 0..120 {
            assert!(!manager.on_download_complete());
        }
        assert!(fixture.ui.calls().is_empty());
    }

    #[test]
    fn negative_values_are_normalized_before_deciding() {
        let fixture = Fixture::new(0, -5, -1);
        let mut manager = fixture.manager();

        assert!(manager.on_download_complete());
        assert_eq!(manager.state().last_donate_time, 0);
        assert_eq!(manager.state().counter, 50);
    }

    #[test]
    fn extreme_stored_values_do_not_overflow() {
        let fixture = Fixture::new(i64::MAX, i64::MIN, 0);
        let mut manager = fixture.manager();

        assert!(manager.on_download_complete());
        assert_eq!(manager.state().counter, 100);

        manager.on_donate_clicked(false, PAYMENT_URL);
        assert_eq!(fixture.prefs.get(&DONATE_NOTHANKS), i64::MAX);
    }

    #[test]
    fn fractional_donate_time_counts_as_donated() {
        let fixture = Fixture::new(0, 0, 0);
        fixture.prefs.set_value(LAST_DONATE_TIME.key, json!(1_300_000_000.25)).unwrap();
        let mut manager = fixture.manager();

        assert_eq!(manager.state().last_donate_time, 1_300_000_001);
        assert!(!manager.on_download_complete());

        manager.on_config_changed(LAST_DONATE_TIME.key, &json!(0.5));
        assert_eq!(manager.state().phase(), NagPhase::Donated);
    }

    #[test]
    fn prompt_is_skipped_without_window() {
        let fixture = Fixture::new(0, 0, 0);
        let mut manager = DonateManager::new(fixture.prefs.clone(), Arc::new(fixture.ui.clone()));

        assert!(manager.on_download_complete());
        assert!(fixture.ui.calls().is_empty());
        assert_eq!(fixture.prefs.get(&DONATE_COUNTER), 50);
    }

    #[test]
    fn accepting_opens_payment_url_and_records_time() {
        let fixture = Fixture::new(2, 10, 0);
        let mut manager = fixture.manager();

        manager.on_donate_clicked(true, "https://pay.example/");

        assert_eq!(fixture.ui.calls(), vec![UiCall::OpenUrl("https://pay.example/".to_string())]);
        let recorded = fixture.prefs.get(&LAST_DONATE_TIME);
        assert!(recorded > 0);
        assert_eq!(manager.state().last_donate_time, recorded);
        assert_eq!(fixture.prefs.get(&DONATE_NOTHANKS), 2);
        assert_eq!(manager.state().phase(), NagPhase::Donated);
    }

    #[test]
    fn declining_counts_and_closes_window() {
        let fixture = Fixture::new(0, 10, 0);
        let mut manager = fixture.manager();

        manager.on_donate_clicked(false, PAYMENT_URL);

        assert_eq!(fixture.ui.calls(), vec![UiCall::Close]);
        assert_eq!(fixture.prefs.get(&DONATE_NOTHANKS), 1);
        assert_eq!(fixture.prefs.get(&LAST_DONATE_TIME), 0);
        assert_eq!(manager.state().nothanks, 1);
    }

    #[test]
    fn explicit_urls_override_defaults() {
        let fixture = Fixture::new(5, 10, 0);
        let manager = fixture.manager();

        manager.show_donate(Some("https://landing.example/"), Some("https://pay.example/"));
        manager.show_donate(None, None);

        assert_eq!(
            fixture.ui.calls(),
            vec![
                UiCall::Show {
                    url: "https://landing.example/".to_string(),
                    payment_url: "https://pay.example/".to_string(),
                },
                UiCall::Show {
                    url: "http://getmiro.com/give/mt/".to_string(),
                    payment_url: PAYMENT_URL.to_string(),
                },
            ]
        );
    }

    #[test]
    fn reset_restores_declared_defaults() {
        let fixture = Fixture::new(4, 17, 1_300_000_000);
        let mut manager = fixture.manager();

        manager.reset();

        assert_eq!(fixture.prefs.get_value(DONATE_NOTHANKS.key), Some(json!(0)));
        assert_eq!(fixture.prefs.get_value(DONATE_COUNTER.key), Some(json!(3)));
        assert_eq!(fixture.prefs.get_value(LAST_DONATE_TIME.key), Some(json!(0)));
        assert_eq!(manager.state(), DonateState { nothanks: 0, counter: 3, last_donate_time: 0 });
    }

    #[test]
    fn config_changes_update_state() {
        let fixture = Fixture::new(0, 10, 0);
        let mut manager = fixture.manager();

        manager.on_config_changed(DONATE_COUNTER.key, &json!(0));
        manager.on_config_changed(DONATE_NOTHANKS.key, &json!(1));
        manager.on_config_changed("showTrayicon", &json!(false));
        manager.on_config_changed(LAST_DONATE_TIME.key, &json!("soon"));

        assert_eq!(manager.state(), DonateState { nothanks: 1, counter: 0, last_donate_time: 0 });
    }

    #[test]
    fn shutdown_closes_window_once() {
        let fixture = Fixture::new(0, 10, 0);
        let mut manager = fixture.manager();

        manager.shutdown();
        manager.shutdown();
        manager.show_donate(None, None);

        assert_eq!(fixture.ui.calls(), vec![UiCall::Close]);
    }

    #[test]
    fn powertoys_dialog_runs_when_attached() {
        let fixture = Fixture::new(0, 10, 0);
        let manager = fixture.manager();
        manager.run_powertoys();
        assert_eq!(fixture.ui.calls(), vec![UiCall::PowerToys]);
    }

    #[test(tokio::test(flavor = "multi_thread"))]
    async fn run_loop_handles_events_in_order() {
        let fixture = Fixture::new(0, 1, 0);
        let events = SystemEvents::new();
        let (tx, rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(fixture.manager().run(
            fixture.prefs.subscribe(),
            events.subscribe(),
            rx,
        ));

        // Counter drops to zero via the store, then the download fires the prompt
        fixture.prefs.set(&DONATE_COUNTER, 0).unwrap();
        events.publish(SystemEvent::DownloadComplete { item_id: "item".to_string() });
        tx.send(DonateCommand::Clicked { accepted: false, payment_url: PAYMENT_URL.to_string() })
            .unwrap();
        tx.send(DonateCommand::Shutdown).unwrap();
        handle.await.unwrap();

        assert_eq!(
            fixture.ui.calls(),
            vec![
                UiCall::Show {
                    url: "http://getmiro.com/give/m1/".to_string(),
                    payment_url: PAYMENT_URL.to_string(),
                },
                UiCall::Close,
                UiCall::Close,
            ]
        );
        assert_eq!(fixture.prefs.get(&DONATE_NOTHANKS), 1);
        assert_eq!(fixture.prefs.get(&DONATE_COUNTER), 50);
    }

    #[test(tokio::test(flavor = "multi_thread"))]
    async fn lagged_pref_changes_reload_from_store() {
        let fixture = Fixture::new(0, 10, 0);
        let events = SystemEvents::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = fixture.manager();
        let pref_changes = fixture.prefs.subscribe();

        // The donation lands first and is pushed out of the channel by the
        // counter updates that follow
        fixture.prefs.set(&LAST_DONATE_TIME, 1_300_000_000).unwrap();
        for counter in (0..100).rev() {
            fixture.prefs.set(&DONATE_COUNTER, counter).unwrap();
        }
        events.publish(SystemEvent::DownloadComplete { item_id: "item".to_string() });
        tx.send(DonateCommand::Shutdown).unwrap();

        manager.run(pref_changes, events.subscribe(), rx).await;

        // Only the reload sees the donation, so no prompt
        assert_eq!(fixture.ui.calls(), vec![UiCall::Close]);
        assert_eq!(fixture.prefs.get(&DONATE_COUNTER), 50);
    }
}
