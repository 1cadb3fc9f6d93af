//! Optimistic vote controller.
//!
//! A vote is applied to the [`PollBoard`] before the server answers. Success
//! keeps the speculative state; failure restores the poll from the snapshot
//! taken just before the change.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::board::{BeginVote, PollBoard};
use super::model::{NewPoll, OptionId, Poll, PollId};
use crate::error::ClientError;
use crate::events::EventBus;
use crate::session::SessionStore;

/// Server operations the controller depends on.
pub trait VoteBackend: Send + Sync {
    fn list_polls(&self) -> impl Future<Output = Result<Vec<Poll>, ClientError>> + Send;

    fn submit_vote(
        &self,
        poll_id: PollId,
        option_id: OptionId,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn create_poll(&self, draft: &NewPoll) -> impl Future<Output = Result<Poll, ClientError>> + Send;

    fn delete_poll(&self, poll_id: PollId) -> impl Future<Output = Result<(), ClientError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The server accepted the vote; the speculative state stands.
    Committed,
    /// The option was already the recorded vote; nothing was sent.
    Unchanged,
}

pub struct VoteController<B> {
    backend: B,
    board: Mutex<PollBoard>,
    session: Arc<SessionStore>,
    events: EventBus,
    /// Cancelled when the owning view goes away. Late responses are then
    /// awaited but not applied.
    interest: CancellationToken,
}

impl<B: VoteBackend> VoteController<B> {
    pub fn new(backend: B, session: Arc<SessionStore>, events: EventBus) -> Self {
        Self {
            backend,
            board: Mutex::new(PollBoard::default()),
            session,
            events,
            interest: CancellationToken::new(),
        }
    }

    /// Copy of the polls currently shown.
    pub fn polls(&self) -> Vec<Poll> {
        self.board().polls().to_vec()
    }

    pub fn poll(&self, poll_id: PollId) -> Option<Poll> {
        self.board().get(poll_id).cloned()
    }

    pub fn is_voting(&self) -> bool {
        self.board().is_voting()
    }

    pub fn is_detached(&self) -> bool {
        self.interest.is_cancelled()
    }

    /// Stop applying responses to the board.
    pub fn detach(&self) {
        debug!("Vote controller detached");
        self.interest.cancel();
    }

    /// Load server state. Returns `false` when the result was not applied
    /// (vote in flight, board changed during the fetch, or detached).
    pub async fn reload(&self) -> Result<bool, ClientError> {
        let generation = {
            let board = self.board();
            if board.is_voting() {
                debug!("Reload skipped while a vote is in flight");
                return Ok(false);
            }
            board.generation()
        };
        let polls = self.backend.list_polls().await.inspect_err(|e| self.report(e))?;
        if self.is_detached() {
            return Ok(false);
        }
        let count = polls.len();
        let mut board = self.board();
        if board.generation() != generation {
            debug!(count, "Reload discarded, board changed while fetching");
            return Ok(false);
        }
        let applied = board.replace_all(polls);
        debug!(count, applied, "Polls reloaded");
        Ok(applied)
    }

    /// Cast or change the current user's vote on `poll_id`.
    pub async fn cast_vote(
        &self,
        poll_id: PollId,
        option_id: Option<OptionId>,
    ) -> Result<VoteOutcome, ClientError> {
        self.require_principal()?;
        let pending = match self.board().begin_vote(poll_id, option_id)? {
            BeginVote::Started(pending) => pending,
            BeginVote::Unchanged => {
                debug!(poll_id, "Vote unchanged, nothing sent");
                return Ok(VoteOutcome::Unchanged);
            }
        };
        debug!(poll_id, option_id = pending.option_id, correlation = %pending.correlation, "Submitting vote");

        let result = self.backend.submit_vote(poll_id, pending.option_id).await;

        if self.is_detached() {
            debug!(poll_id, "Vote response arrived after detach");
            return result.map(|()| VoteOutcome::Committed);
        }
        match result {
            Ok(()) => {
                self.board().commit(pending.correlation);
                info!(poll_id, "Vote recorded");
                self.events.success("Vote recorded.");
                Ok(VoteOutcome::Committed)
            }
            Err(e) => {
                self.board().rollback(pending);
                warn!(poll_id, error = %e, "Vote rejected, rolled back");
                self.report(&e);
                Err(e)
            }
        }
    }

    /// Validate and create a poll, then add it to the board.
    pub async fn create_poll(
        &self,
        title: &str,
        description: Option<&str>,
        options: &[String],
    ) -> Result<Poll, ClientError> {
        self.require_principal()?;
        let draft = NewPoll::new(title, description, options)?;
        let poll = self
            .backend
            .create_poll(&draft)
            .await
            .inspect_err(|e| self.report(e))?;
        if !self.is_detached() {
            self.board().push(poll.clone());
        }
        info!(poll_id = poll.id, "Poll created");
        self.events.success("Poll created.");
        Ok(poll)
    }

    pub async fn delete_poll(&self, poll_id: PollId) -> Result<(), ClientError> {
        self.require_principal()?;
        self.backend
            .delete_poll(poll_id)
            .await
            .inspect_err(|e| self.report(e))?;
        if !self.is_detached() {
            self.board().remove(poll_id);
        }
        info!(poll_id, "Poll deleted");
        self.events.success("Poll deleted.");
        Ok(())
    }

    fn require_principal(&self) -> Result<(), ClientError> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            Err(ClientError::validation("Not signed in."))
        }
    }

    /// Notify about a failure the gateway has not already announced.
    fn report(&self, e: &ClientError) {
        if !matches!(
            e,
            ClientError::SessionExpired | ClientError::NetworkUnreachable(_)
        ) {
            self.events.error(e.user_message());
        }
    }

    fn board(&self) -> MutexGuard<'_, PollBoard> {
        self.board
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
