//! Detection of deployment state transitions.
//!
//! A project is polled for its latest deployment. Each poll produces an [Observation], which is
//! compared against the [TrackedState] recorded after the previous poll. [decide] is a pure
//! function of the two: it returns the notifications to send and the state to record next, and
//! leaves fetching, sending and persisting to its caller.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Status values the upstream API is known to report for a deployment stage
#[derive(Clone, Copy, Debug, Display, EnumString, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum Status {
    Pending,
    Active,
    InProgress,
    Idle,
    Success,
    Failed,
    Canceled,
    Error,
    Skipped,
}

impl Status {
    pub fn class(self) -> StatusClass {
        match self {
            Status::Pending | Status::Active | Status::InProgress | Status::Idle => {
                StatusClass::NonTerminal
            }
            Status::Success
            | Status::Failed
            | Status::Canceled
            | Status::Error
            | Status::Skipped => StatusClass::Terminal,
        }
    }
}

/// Whether a deployment can still move on from a status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusClass {
    /// The deployment is still in flight
    NonTerminal,
    /// The deployment will not change status anymore
    Terminal,
    /// A status we have no mapping for. It never triggers a notification on its own
    Unknown,
}

/// Classify a raw status string. Never fails: anything unmapped is [StatusClass::Unknown].
pub fn classify(status: &str) -> StatusClass {
    Status::from_str(status)
        .map(Status::class)
        .unwrap_or(StatusClass::Unknown)
}

/// Descriptive details of a deployment. Only ever displayed, never used to detect transitions.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct DeploymentMetadata {
    pub url: Option<String>,
    pub environment: Option<String>,
    pub branch: Option<String>,
    pub commit_hash: Option<String>,
    pub commit_message: Option<String>,
    pub commit_author: Option<String>,
    pub commit_url: Option<String>,
}

/// The latest deployment of a project as seen by one poll
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Observation {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub metadata: DeploymentMetadata,
}

impl Observation {
    pub fn new(id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: status.into(),
            metadata: DeploymentMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: DeploymentMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// The status in the casing it is tracked and classified in
    pub fn normalized_status(&self) -> String {
        self.status.to_lowercase()
    }
}

/// The deployment id and status a notification decision was last made for
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct TrackedState {
    pub id: String,
    pub status: String,
}

impl TrackedState {
    pub fn new(id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: status.into(),
        }
    }

    pub fn from_observation(observation: &Observation) -> Self {
        Self {
            id: observation.id.clone(),
            status: observation.normalized_status(),
        }
    }
}

/// A notification that should be sent for a project
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotifyAction {
    /// A deployment was seen while still in flight for the first time
    Started(Observation),
    /// A deployment was seen in a terminal status for the first time
    Finished(Observation),
}

impl NotifyAction {
    pub fn observation(&self) -> &Observation {
        match self {
            NotifyAction::Started(observation) | NotifyAction::Finished(observation) => observation,
        }
    }
}

/// Outcome of comparing a new observation against the tracked state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decision {
    /// Notifications to send, in order
    pub actions: Vec<NotifyAction>,
    /// The tracked state after this poll. `None` only if nothing was tracked and the observation
    /// was unusable.
    pub state: Option<TrackedState>,
    /// Whether `state` differs from what was tracked and has to be written back
    pub changed: bool,
}

impl Decision {
    fn unchanged(previous: Option<&TrackedState>) -> Self {
        Self {
            actions: Vec::new(),
            state: previous.cloned(),
            changed: false,
        }
    }

    fn track(current: &Observation, action: Option<NotifyAction>) -> Self {
        Self {
            actions: action.into_iter().collect(),
            state: Some(TrackedState::from_observation(current)),
            changed: true,
        }
    }
}

/// Decide which notification, if any, an observation warrants given the previously tracked state.
///
/// At most one action is returned. A deployment that is first seen already finished only gets a
/// [NotifyAction::Finished]: a missed start is never synthesized.
pub fn decide(previous: Option<&TrackedState>, current: &Observation) -> Decision {
    if current.id.trim().is_empty() {
        return Decision::unchanged(previous);
    }

    let current_class = classify(&current.normalized_status());

    match previous {
        Some(previous) if previous.id == current.id => {
            let was_terminal = classify(&previous.status) == StatusClass::Terminal;

            if current_class == StatusClass::Terminal && !was_terminal {
                Decision::track(current, Some(NotifyAction::Finished(current.clone())))
            } else {
                Decision::unchanged(Some(previous))
            }
        }
        // Never seen, or superseded by a newer deployment
        _ => {
            let action = match current_class {
                StatusClass::NonTerminal => Some(NotifyAction::Started(current.clone())),
                StatusClass::Terminal => Some(NotifyAction::Finished(current.clone())),
                StatusClass::Unknown => None,
            };

            Decision::track(current, action)
        }
    }
}
