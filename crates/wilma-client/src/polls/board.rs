//! Poll board: the locally displayed polls plus the in-flight vote slot.

use uuid::Uuid;

use super::model::{OptionId, Poll, PollId, VoteChange};
use crate::error::ClientError;

/// The vote currently awaiting a server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlight {
    pub poll_id: PollId,
    pub correlation: Uuid,
}

/// Rollback record for one speculative vote. Never persisted.
#[derive(Debug, Clone)]
pub struct PendingVote {
    pub snapshot: Poll,
    pub option_id: OptionId,
    pub correlation: Uuid,
}

impl PendingVote {
    pub const fn poll_id(&self) -> PollId {
        self.snapshot.id
    }
}

/// Result of [`PollBoard::begin_vote`].
#[derive(Debug)]
pub enum BeginVote {
    /// Speculative change applied; the caller must commit or roll back.
    Started(PendingVote),
    /// The option is already the recorded vote.
    Unchanged,
}

#[derive(Debug, Default)]
pub struct PollBoard {
    polls: Vec<Poll>,
    voting: Option<InFlight>,
    /// Bumped on every local change a server reload must not overwrite.
    generation: u64,
}

impl PollBoard {
    pub fn new(polls: Vec<Poll>) -> Self {
        Self {
            polls,
            voting: None,
            generation: 0,
        }
    }

    pub fn polls(&self) -> &[Poll] {
        &self.polls
    }

    pub fn get(&self, id: PollId) -> Option<&Poll> {
        self.polls.iter().find(|p| p.id == id)
    }

    pub const fn voting(&self) -> Option<&InFlight> {
        self.voting.as_ref()
    }

    pub const fn is_voting(&self) -> bool {
        self.voting.is_some()
    }

    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Replace all polls with server state. Refused while a vote is in flight.
    pub fn replace_all(&mut self, polls: Vec<Poll>) -> bool {
        if self.voting.is_some() {
            return false;
        }
        self.polls = polls;
        true
    }

    pub fn push(&mut self, poll: Poll) {
        self.generation += 1;
        self.polls.push(poll);
    }

    pub fn remove(&mut self, id: PollId) -> Option<Poll> {
        let index = self.polls.iter().position(|p| p.id == id)?;
        self.generation += 1;
        Some(self.polls.remove(index))
    }

    /// Validate a vote and apply it speculatively.
    ///
    /// On `Started`, the in-flight slot is taken until [`commit`](Self::commit)
    /// or [`rollback`](Self::rollback).
    pub fn begin_vote(
        &mut self,
        poll_id: PollId,
        option_id: Option<OptionId>,
    ) -> Result<BeginVote, ClientError> {
        let option_id = option_id.ok_or_else(|| ClientError::validation("No option selected."))?;
        if let Some(in_flight) = &self.voting {
            return Err(ClientError::validation(format!(
                "A vote for poll {} is still being submitted.",
                in_flight.poll_id
            )));
        }
        let poll = self
            .polls
            .iter_mut()
            .find(|p| p.id == poll_id)
            .ok_or_else(|| ClientError::validation(format!("Unknown poll {poll_id}.")))?;
        if !poll.has_option(option_id) {
            return Err(ClientError::validation(format!(
                "Poll {poll_id} has no option {option_id}."
            )));
        }

        let snapshot = poll.snapshot();
        if poll.apply_vote(option_id) == VoteChange::Unchanged {
            return Ok(BeginVote::Unchanged);
        }
        let correlation = Uuid::new_v4();
        self.generation += 1;
        self.voting = Some(InFlight {
            poll_id,
            correlation,
        });
        Ok(BeginVote::Started(PendingVote {
            snapshot,
            option_id,
            correlation,
        }))
    }

    /// Keep the speculative state and free the slot.
    pub fn commit(&mut self, correlation: Uuid) -> bool {
        if !self.owns_slot(correlation) {
            return false;
        }
        self.voting = None;
        true
    }

    /// Restore the poll from the snapshot and free the slot.
    pub fn rollback(&mut self, pending: PendingVote) -> bool {
        if !self.owns_slot(pending.correlation) {
            return false;
        }
        self.voting = None;
        self.restore(pending.snapshot);
        true
    }

    /// Put `snapshot` back in place of the poll with the same id.
    pub fn restore(&mut self, snapshot: Poll) -> bool {
        match self.polls.iter_mut().find(|p| p.id == snapshot.id) {
            Some(poll) => {
                *poll = snapshot;
                true
            }
            None => false,
        }
    }

    fn owns_slot(&self, correlation: Uuid) -> bool {
        self.voting
            .as_ref()
            .is_some_and(|in_flight| in_flight.correlation == correlation)
    }
}
