/// Externally visible lifecycle of an audio input controller.
///
/// State transitions:
/// ```text
/// closed ──open──▶ open_stopped ──start──▶ open_running
///   ▲                  │   ▲                   │
///   └──────close───────┘   └───────stop────────┘
///   ▲                                          │
///   └──────────────────close───────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Closed,
    OpenStopped,
    OpenRunning,
}

impl LifecycleState {
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::OpenRunning)
    }
}

/// State shared between the controller and its capture thread.
///
/// Always read and written under the session mutex; the capture thread
/// parks on the paired condvar while `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunState {
    Stopped,
    Running,
    Closing,
}

impl RunState {
    pub(crate) fn lifecycle(self) -> LifecycleState {
        match self {
            Self::Stopped => LifecycleState::OpenStopped,
            Self::Running => LifecycleState::OpenRunning,
            Self::Closing => LifecycleState::Closed,
        }
    }
}
