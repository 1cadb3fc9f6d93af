//! Poll types and the speculative vote arithmetic.

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

pub type PollId = i64;
pub type OptionId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOption {
    pub id: OptionId,
    pub text: String,
    #[serde(default)]
    pub votes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: PollId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub options: Vec<PollOption>,
    #[serde(default)]
    pub total_votes: u32,
    #[serde(default)]
    pub user_vote_option_id: Option<OptionId>,
}

/// Validated body for poll creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPoll {
    pub title: String,
    pub description: Option<String>,
    pub options: Vec<String>,
}

impl NewPoll {
    /// Trim inputs and drop blank options. Requires a title and at least two
    /// options.
    pub fn new(
        title: &str,
        description: Option<&str>,
        options: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<Self, ClientError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ClientError::validation("A title is required."));
        }
        let options: Vec<String> = options
            .into_iter()
            .map(|o| o.as_ref().trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if options.len() < 2 {
            return Err(ClientError::validation("At least two options are required."));
        }
        Ok(Self {
            title: title.to_string(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(ToString::to_string),
            options,
        })
    }
}

/// Effect of [`Poll::apply_vote`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteChange {
    /// No previous vote; the total grew by one.
    First,
    /// Vote moved from another option; the total is unchanged.
    Switched { from: OptionId },
    /// Same option as the recorded vote; nothing changed.
    Unchanged,
}

impl Poll {
    pub fn option(&self, id: OptionId) -> Option<&PollOption> {
        self.options.iter().find(|o| o.id == id)
    }

    pub fn has_option(&self, id: OptionId) -> bool {
        self.option(id).is_some()
    }

    /// Deep copy taken before a speculative change.
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    /// `total_votes` equals the sum of the option counts.
    pub fn is_consistent(&self) -> bool {
        self.options.iter().map(|o| u64::from(o.votes)).sum::<u64>() == u64::from(self.total_votes)
    }

    /// Record the current user's vote for `option_id` locally.
    ///
    /// Counts never go below zero.
    pub fn apply_vote(&mut self, option_id: OptionId) -> VoteChange {
        let previous = self.user_vote_option_id.filter(|id| self.has_option(*id));
        let change = match previous {
            Some(previous) if previous == option_id => return VoteChange::Unchanged,
            Some(previous) => {
                if let Some(option) = self.option_mut(previous) {
                    option.votes = option.votes.saturating_sub(1);
                }
                VoteChange::Switched { from: previous }
            }
            // A recorded vote for an option the poll no longer has counts as none.
            None => {
                self.total_votes = self.total_votes.saturating_add(1);
                VoteChange::First
            }
        };
        if let Some(option) = self.option_mut(option_id) {
            option.votes = option.votes.saturating_add(1);
        }
        self.user_vote_option_id = Some(option_id);
        change
    }

    fn option_mut(&mut self, id: OptionId) -> Option<&mut PollOption> {
        self.options.iter_mut().find(|o| o.id == id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    /// Poll 1 with options 10 (3 votes) and 11 (2 votes).
    pub(crate) fn poll(user_vote: Option<OptionId>) -> Poll {
        Poll {
            id: 1,
            title: "Neue Pumpstation?".into(),
            description: None,
            created_by: "admin".into(),
            created_at: "2025-05-01T10:00:00Z".into(),
            options: vec![
                PollOption {
                    id: 10,
                    text: "Ja".into(),
                    votes: 3,
                },
                PollOption {
                    id: 11,
                    text: "Nein".into(),
                    votes: 2,
                },
            ],
            total_votes: 5,
            user_vote_option_id: user_vote,
        }
    }

    fn votes(poll: &Poll) -> (u32, u32, u32) {
        (
            poll.option(10).unwrap().votes,
            poll.option(11).unwrap().votes,
            poll.total_votes,
        )
    }

    #[test]
    fn first_vote_increments_option_and_total() {
        let mut p = poll(None);
        assert_eq!(p.apply_vote(10), VoteChange::First);
        assert_eq!(votes(&p), (4, 2, 6));
        assert_eq!(p.user_vote_option_id, Some(10));
        assert!(p.is_consistent());
    }

    #[test]
    fn switched_vote_moves_one_count() {
        let mut p = poll(Some(10));
        assert_eq!(p.apply_vote(11), VoteChange::Switched { from: 10 });
        assert_eq!(votes(&p), (2, 3, 5));
        assert!(p.is_consistent());
    }

    #[test]
    fn switched_vote_floors_previous_option_at_zero() {
        let mut p = poll(Some(10));
        p.options[0].votes = 0;
        p.total_votes = 2;
        p.apply_vote(11);
        assert_eq!(p.option(10).unwrap().votes, 0);
        assert_eq!(p.option(11).unwrap().votes, 3);
    }

    #[test]
    fn same_option_is_unchanged() {
        let mut p = poll(Some(11));
        let before = p.snapshot();
        assert_eq!(p.apply_vote(11), VoteChange::Unchanged);
        assert_eq!(p, before);
    }

    #[test]
    fn new_poll_trims_and_drops_blank_options() {
        let draft = NewPoll::new("  Termin  ", Some("  "), ["Montag ", "", "  ", " Freitag"]).unwrap();
        assert_eq!(draft.title, "Termin");
        assert_eq!(draft.description, None);
        assert_eq!(draft.options, vec!["Montag", "Freitag"]);
        assert_eq!(
            serde_json::to_value(&draft).unwrap(),
            serde_json::json!({"title": "Termin", "description": null, "options": ["Montag", "Freitag"]})
        );
    }

    #[test]
    fn new_poll_requires_title_and_two_options() {
        assert!(matches!(
            NewPoll::new(" ", None, ["a", "b"]),
            Err(ClientError::Validation(_))
        ));
        assert!(matches!(
            NewPoll::new("t", None, ["a", "  "]),
            Err(ClientError::Validation(_))
        ));
    }

    #[test]
    fn deserializes_camel_case_dto() {
        let json = r#"{
            "id": 3,
            "title": "Wartungsfenster",
            "description": null,
            "createdBy": "admin",
            "createdAt": "2025-05-02T08:30:00",
            "options": [{"id": 7, "text": "Montag", "votes": 1}, {"id": 8, "text": "Freitag", "votes": 0}],
            "totalVotes": 1,
            "userVoteOptionId": 7
        }"#;
        let p: Poll = serde_json::from_str(json).unwrap();
        assert_eq!(p.user_vote_option_id, Some(7));
        assert_eq!(p.options.len(), 2);
        assert!(p.has_option(8));
        assert!(p.is_consistent());
    }

    #[test]
    fn vote_recorded_for_missing_option_counts_as_first() {
        let mut p = poll(Some(99));
        assert_eq!(p.apply_vote(11), VoteChange::First);
        assert_eq!(p.total_votes, 6);
        assert_eq!(p.option(11).unwrap().votes, 3);
        assert!(p.is_consistent());
    }
}
