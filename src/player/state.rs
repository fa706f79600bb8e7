//! Playback state and its transition table.
//!
//! `PlaybackState::next` is the only place a state is derived from another.
//! It is pure: the controller asks it first and touches the audio backend only
//! when the answer is `Some`.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing {
        started_at_frame: u64,
    },
    Paused {
        paused_at_frame: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackAction {
    /// Start from `from_frame` when stopped; resume from the stored frame when paused.
    Play { from_frame: u64 },
    Pause { at_frame: u64 },
    Stop,
    Seek { frame: u64 },
    /// Output reached the end of the content.
    Finished,
    /// The playback backend failed.
    Failed,
}

impl PlaybackAction {
    pub fn name(&self) -> &'static str {
        match self {
            PlaybackAction::Play { .. } => "play",
            PlaybackAction::Pause { .. } => "pause",
            PlaybackAction::Stop => "stop",
            PlaybackAction::Seek { .. } => "seek",
            PlaybackAction::Finished => "finish",
            PlaybackAction::Failed => "fail",
        }
    }
}

impl PlaybackState {
    pub fn name(&self) -> &'static str {
        match self {
            PlaybackState::Stopped => "stopped",
            PlaybackState::Playing { .. } => "playing",
            PlaybackState::Paused { .. } => "paused",
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing { .. })
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, PlaybackState::Paused { .. })
    }

    /// State after `action`, or `None` when the action is not allowed here.
    pub fn next(self, action: PlaybackAction) -> Option<PlaybackState> {
        use PlaybackAction as A;
        use PlaybackState as S;

        match (self, action) {
            (_, A::Stop) => Some(S::Stopped),

            (S::Stopped, A::Play { from_frame }) => Some(S::Playing {
                started_at_frame: from_frame,
            }),
            (S::Paused { paused_at_frame }, A::Play { .. }) => Some(S::Playing {
                started_at_frame: paused_at_frame,
            }),
            (S::Playing { .. }, A::Play { .. }) => None,

            (S::Playing { .. }, A::Pause { at_frame }) => Some(S::Paused {
                paused_at_frame: at_frame,
            }),
            (_, A::Pause { .. }) => None,

            (S::Stopped, A::Seek { .. }) => Some(S::Stopped),
            (S::Playing { .. }, A::Seek { frame }) => Some(S::Playing {
                started_at_frame: frame,
            }),
            (S::Paused { .. }, A::Seek { frame }) => Some(S::Paused {
                paused_at_frame: frame,
            }),

            (S::Playing { .. }, A::Finished | A::Failed) => Some(S::Stopped),
            (_, A::Finished | A::Failed) => None,
        }
    }
}
