use rinf::DartSignal;
use serde::{Deserialize, Serialize};

/// Sent by the UI once a download has finished.
#[derive(Debug, Serialize, Deserialize, DartSignal)]
pub struct DownloadCompletedEvent {
    pub item_id: String,
}
