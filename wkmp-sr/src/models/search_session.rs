//! Search session state machine
//!
//! `Idle -> Searching -> {Completed | NoResults | Cancelled | Failed} -> Idle`
//!
//! `NoResults` is the zero-result flavor of `Completed`; both are successful
//! completions. `Failed` carries a display message in [`SearchSession::error`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wkmp_common::events::SearchEndReason;

use crate::error::{SearchError, SearchResult};

/// Search session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SearchState {
    /// No search running; collection may hold results of an ended search
    Idle,
    /// Stream is being consumed
    Searching,
    /// Stream exhausted with results
    Completed,
    /// Stream exhausted without results
    NoResults,
    /// Cancelled by the user or superseded; partial results stay visible
    Cancelled,
    /// Provider failed; partial results stay visible
    Failed,
}

impl SearchState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::NoResults | Self::Cancelled | Self::Failed
        )
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed | Self::NoResults)
    }

    fn can_transition_to(&self, next: SearchState) -> bool {
        match (self, next) {
            (Self::Idle, Self::Searching) => true,
            (Self::Searching, next) => next.is_terminal(),
            (current, Self::Idle) => current.is_terminal(),
            _ => false,
        }
    }

    /// Event-level reason for a terminal state
    pub fn end_reason(&self) -> Option<SearchEndReason> {
        match self {
            Self::Completed => Some(SearchEndReason::Completed),
            Self::NoResults => Some(SearchEndReason::NoResults),
            Self::Cancelled => Some(SearchEndReason::Cancelled),
            Self::Failed => Some(SearchEndReason::Failed),
            Self::Idle | Self::Searching => None,
        }
    }
}

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub session_id: Uuid,
    pub old_state: SearchState,
    pub new_state: SearchState,
    pub transitioned_at: DateTime<Utc>,
}

/// One logical search operation (in-memory only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSession {
    pub session_id: Uuid,
    pub state: SearchState,
    /// Query text as typed
    pub query: String,
    /// Text sent to the network after filter tokens were consumed
    pub effective_query: String,
    pub album_mode: bool,
    /// Records materialized so far
    pub found: usize,
    /// Failure message for `Failed`
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl SearchSession {
    /// New session in `Idle`
    pub fn new(query: impl Into<String>, effective_query: impl Into<String>, album_mode: bool) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            state: SearchState::Idle,
            query: query.into(),
            effective_query: effective_query.into(),
            album_mode,
            found: 0,
            error: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to new state; illegal transitions leave the session untouched
    pub fn transition_to(&mut self, new_state: SearchState) -> SearchResult<StateTransition> {
        if !self.state.can_transition_to(new_state) {
            return Err(SearchError::InvalidTransition {
                from: self.state,
                to: new_state,
            });
        }

        let transition = StateTransition {
            session_id: self.session_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        match new_state {
            SearchState::Searching => {
                self.found = 0;
                self.error = None;
                self.started_at = transition.transitioned_at;
                self.ended_at = None;
            }
            s if s.is_terminal() => self.ended_at = Some(transition.transitioned_at),
            _ => {}
        }

        Ok(transition)
    }

    /// Finish a running search; picks `Completed` or `NoResults` from the
    /// found count
    pub fn complete(&mut self) -> SearchResult<StateTransition> {
        let next = if self.found > 0 {
            SearchState::Completed
        } else {
            SearchState::NoResults
        };
        self.transition_to(next)
    }

    pub fn fail(&mut self, message: impl Into<String>) -> SearchResult<StateTransition> {
        let transition = self.transition_to(SearchState::Failed)?;
        self.error = Some(message.into());
        Ok(transition)
    }

    pub fn is_searching(&self) -> bool {
        self.state == SearchState::Searching
    }
}
