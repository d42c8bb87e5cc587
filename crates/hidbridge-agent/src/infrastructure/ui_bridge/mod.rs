//! Shared state bridge between the agent and the on-device menu UI.
//!
//! The menu/display UI and its input polling live outside this crate; what
//! they need from the agent is a place to read link status from and write
//! the preset selection to. [`AgentAppState`] is that place. All fields sit
//! behind `tokio::sync::Mutex` because both the reconnection controller and
//! the UI's poll loop touch them from async context.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Link status as shown on the device display.
///
/// `PeerNotDetected` (host unreachable) is deliberately distinct from
/// `PresetNotSelected` (nothing to run yet): they call for different user
/// action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkStatus {
    /// No preset selected; the agent is idle and not connecting.
    PresetNotSelected,
    /// Attempting to reach the host (or streaming not yet acknowledged).
    Connecting,
    /// Handshake acknowledged; events are flowing.
    Streaming,
    /// The host could not be reached or the link dropped.
    PeerNotDetected,
}

/// The preset the user picked, as supplied by the external preset registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetSelection {
    /// Preset name without extension.
    pub name: String,
    /// Hex-encoded SHA-256 fingerprint of the preset file.
    pub sha256: String,
}

/// Runtime state shared between the agent and the UI.
pub struct AgentAppState {
    status: Mutex<LinkStatus>,
    selected_preset: Mutex<Option<PresetSelection>>,
}

impl AgentAppState {
    /// Creates fresh state: no preset, nothing connected.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Current link status.
    pub async fn status(&self) -> LinkStatus {
        *self.status.lock().await
    }

    /// Updates the link status shown to the UI.
    pub async fn set_status(&self, status: LinkStatus) {
        *self.status.lock().await = status;
    }

    /// The currently selected preset, if any.
    pub async fn selected_preset(&self) -> Option<PresetSelection> {
        self.selected_preset.lock().await.clone()
    }

    /// Selects a preset (called by the UI when the user picks one).
    pub async fn select_preset(&self, selection: PresetSelection) {
        *self.selected_preset.lock().await = Some(selection);
    }

    /// Clears the selection; the controller stops connecting.
    pub async fn clear_preset(&self) {
        *self.selected_preset.lock().await = None;
    }

    /// Serializable snapshot for the UI's poll loop.
    pub async fn snapshot(&self) -> AgentStatusDto {
        AgentStatusDto {
            status: format!("{:?}", self.status().await),
            selected_preset: self.selected_preset().await.map(|p| p.name),
        }
    }
}

impl Default for AgentAppState {
    fn default() -> Self {
        Self {
            status: Mutex::new(LinkStatus::PresetNotSelected),
            selected_preset: Mutex::new(None),
        }
    }
}

/// Plain snapshot handed across the UI boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatusDto {
    /// Status variant name, e.g. `"Streaming"`.
    pub status: String,
    /// Name of the selected preset, if any.
    pub selected_preset: Option<String>,
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initial_state_has_no_preset_and_idle_status() {
        let state = AgentAppState::new();
        assert_eq!(state.status().await, LinkStatus::PresetNotSelected);
        assert_eq!(state.selected_preset().await, None);
    }

    #[tokio::test]
    async fn test_select_preset_is_visible_to_readers() {
        let state = AgentAppState::new();
        state
            .select_preset(PresetSelection {
                name: "p1".to_string(),
                sha256: "abc".to_string(),
            })
            .await;

        let selected = state.selected_preset().await.unwrap();
        assert_eq!(selected.name, "p1");
        assert_eq!(selected.sha256, "abc");
    }

    #[tokio::test]
    async fn test_clear_preset_removes_selection() {
        let state = AgentAppState::new();
        state
            .select_preset(PresetSelection {
                name: "p1".to_string(),
                sha256: "abc".to_string(),
            })
            .await;

        state.clear_preset().await;

        assert_eq!(state.selected_preset().await, None);
    }

    #[tokio::test]
    async fn test_snapshot_reflects_status_and_preset() {
        let state = AgentAppState::new();
        state.set_status(LinkStatus::PeerNotDetected).await;
        state
            .select_preset(PresetSelection {
                name: "p2".to_string(),
                sha256: "def".to_string(),
            })
            .await;

        let dto = state.snapshot().await;

        assert_eq!(dto.status, "PeerNotDetected");
        assert_eq!(dto.selected_preset.as_deref(), Some("p2"));
    }
}
