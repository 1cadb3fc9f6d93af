//! Polls: data model, the local poll board and the optimistic vote
//! controller.

mod board;
mod controller;
pub(crate) mod model;

pub use board::{BeginVote, InFlight, PendingVote, PollBoard};
pub use controller::{VoteBackend, VoteController, VoteOutcome};
pub use model::{NewPoll, OptionId, Poll, PollId, PollOption, VoteChange};
