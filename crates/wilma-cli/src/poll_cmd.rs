//! Poll subcommands: list, show, vote, create, delete.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};
use std::sync::Arc;

use wilma_client::api::PollsApi;
use wilma_client::polls::{OptionId, PollId, VoteController, VoteOutcome};

use crate::context::Context;
use crate::output_fmt::write_poll_detail;

/// Poll subcommand actions.
#[derive(clap::Subcommand, Debug)]
pub enum PollAction {
    /// List all polls with their current counts.
    List,
    /// Show one poll.
    Show {
        /// Poll ID.
        poll: PollId,
    },
    /// Vote for an option, or move an existing vote to it.
    Vote {
        /// Poll ID.
        poll: PollId,
        /// Option ID.
        option: OptionId,
    },
    /// Create a poll (at least two options).
    Create {
        /// Poll title.
        #[arg(short, long)]
        title: String,
        /// Optional description.
        #[arg(short, long)]
        description: Option<String>,
        /// Answer option; repeat for each option.
        #[arg(short, long = "option", required = true)]
        options: Vec<String>,
    },
    /// Delete a poll.
    Delete {
        /// Poll ID.
        poll: PollId,
    },
}

/// Execute a poll subcommand.
pub async fn run(action: PollAction, ctx: &Context) -> anyhow::Result<()> {
    ctx.require_login()?;
    let controller = VoteController::new(
        ctx.polls(),
        Arc::clone(ctx.gateway.session()),
        ctx.gateway.event_bus().clone(),
    );
    let mut out = io::stdout();
    match action {
        PollAction::List => {
            controller.reload().await?;
            let polls = controller.polls();
            if polls.is_empty() {
                writeln!(out, "No polls")?;
            }
            for poll in &polls {
                write_poll_detail(&mut out, poll)?;
                writeln!(out)?;
            }
        }
        PollAction::Show { poll } => {
            let poll = ctx.polls().get(poll).await?;
            write_poll_detail(&mut out, &poll)?;
        }
        PollAction::Vote { poll, option } => {
            vote(&controller, poll, option, &mut out).await?;
        }
        PollAction::Create {
            title,
            description,
            options,
        } => {
            let poll = controller
                .create_poll(&title, description.as_deref(), &options)
                .await?;
            write_poll_detail(&mut out, &poll)?;
        }
        PollAction::Delete { poll } => {
            controller.delete_poll(poll).await?;
            writeln!(out, "Deleted poll {poll}")?;
        }
    }
    Ok(())
}

async fn vote(
    controller: &VoteController<PollsApi>,
    poll_id: PollId,
    option_id: OptionId,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    controller.reload().await?;
    if controller.poll(poll_id).is_none() {
        anyhow::bail!("Poll {poll_id} not found");
    }
    let outcome = controller.cast_vote(poll_id, Some(option_id)).await?;
    if outcome == VoteOutcome::Unchanged {
        writeln!(out, "Already voted for option {option_id}")?;
    }
    if let Some(poll) = controller.poll(poll_id) {
        write_poll_detail(out, &poll)?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Harness {
        #[command(subcommand)]
        action: PollAction,
    }

    #[test]
    fn create_collects_repeated_options() {
        let parsed = Harness::try_parse_from([
            "poll", "create", "--title", "Lunch", "-o", "Pizza", "--option", "Sushi",
        ])
        .unwrap();
        match parsed.action {
            PollAction::Create {
                title,
                description,
                options,
            } => {
                assert_eq!(title, "Lunch");
                assert_eq!(description, None);
                assert_eq!(options, vec!["Pizza", "Sushi"]);
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn create_requires_an_option() {
        assert!(Harness::try_parse_from(["poll", "create", "--title", "Lunch"]).is_err());
    }

    #[test]
    fn vote_takes_poll_and_option() {
        let parsed = Harness::try_parse_from(["poll", "vote", "3", "11"]).unwrap();
        assert!(matches!(parsed.action, PollAction::Vote { poll: 3, option: 11 }));
    }
}
