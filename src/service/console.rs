//! Line-oriented command surface
//!
//! Each input line names the acting participant and a command, e.g.
//! `alice queue mid top` or `bob blue`. Commands that do not act on behalf of
//! someone (`clear`, `mode`, `mmr`, `ranks`, `tiers`, `result`, `help`) are
//! written without an actor. Tokens are validated here so the session never
//! sees an unknown role, mode or side.

use crate::error::{MatchmakingError, Result};
use crate::matchmaking::{
    JoinReport, LeaveReport, MatchAttempt, MatchRecord, QueueSnapshot, ResultReport, Session,
    ToggleReport,
};
use crate::types::{MatchmakingMode, ParticipantId, RolePreference, Side, Team, TEAM_SIZE};
use crate::utils::short_id;
use std::fmt::Write;

/// A parsed console command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Join when not queued, leave when queued
    Queue {
        participant_id: ParticipantId,
        roles: RolePreference,
    },
    Join {
        participant_id: ParticipantId,
        roles: RolePreference,
    },
    Leave {
        participant_id: ParticipantId,
    },
    /// Report the reporter's match as won by `winner`
    Report {
        participant_id: ParticipantId,
        winner: Side,
    },
    /// Void the reporter's match and clear the queue
    Reset {
        participant_id: ParticipantId,
    },
    Clear,
    Mode(Option<MatchmakingMode>),
    /// Leaderboard, or one participant's rating
    Mmr(Option<ParticipantId>),
    Record {
        participant_id: ParticipantId,
    },
    Ranks,
    Tiers,
    Status,
    /// Record a game played outside the queue
    ManualResult {
        winner: Side,
        blue: Vec<ParticipantId>,
        red: Vec<ParticipantId>,
    },
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  <name> queue [roles...]     join the queue, or leave it when already queued
  <name> join [roles...]      join the queue (roles: top jungle mid bottom support fill)
  <name> leave                leave the queue
  <name> blue | <name> red    report your match as won by that side
  <name> reset                void your match and clear the queue
  <name> record               show a win/loss record
  mmr [name]                  leaderboard, or one rating
  mode [balanced|random]      show or change the matchmaking mode
  result <blue|red> a b c d e vs f g h i j
                              record a game played outside the queue
  clear | ranks | tiers | status | help | quit";

impl Command {
    /// Parse one input line; `Ok(None)` for blank lines
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((&first, rest)) = tokens.split_first() else {
            return Ok(None);
        };

        let command = match first.to_lowercase().as_str() {
            "clear" => Command::Clear,
            "ranks" => Command::Ranks,
            "tiers" => Command::Tiers,
            "status" => Command::Status,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            "mode" => Command::Mode(rest.first().map(|t| t.parse()).transpose()?),
            "mmr" => Command::Mmr(rest.first().map(|t| t.to_string())),
            "result" => parse_manual_result(rest)?,
            _ => parse_actor_command(first, rest)?,
        };

        Ok(Some(command))
    }
}

fn parse_actor_command(actor: &str, rest: &[&str]) -> Result<Command> {
    let Some((&verb, args)) = rest.split_first() else {
        return Err(invalid_command(format!("unknown command: {}", actor)));
    };
    let participant_id = actor.to_string();

    let command = match verb.to_lowercase().as_str() {
        "queue" | "q" => Command::Queue {
            participant_id,
            roles: RolePreference::parse_tokens(args)?,
        },
        "join" => Command::Join {
            participant_id,
            roles: RolePreference::parse_tokens(args)?,
        },
        "leave" => Command::Leave { participant_id },
        "blue" | "red" => Command::Report {
            participant_id,
            winner: verb.parse()?,
        },
        "reset" => Command::Reset { participant_id },
        "record" => Command::Record { participant_id },
        other => return Err(invalid_command(format!("unknown command: {}", other))),
    };

    Ok(command)
}

fn parse_manual_result(args: &[&str]) -> Result<Command> {
    let Some((&winner, rosters)) = args.split_first() else {
        return Err(invalid_command("result needs a winning side".to_string()));
    };
    let winner: Side = winner.parse()?;

    let separator = rosters
        .iter()
        .position(|t| t.eq_ignore_ascii_case("vs"))
        .ok_or_else(|| invalid_command("result rosters must be separated by 'vs'".to_string()))?;
    let blue: Vec<ParticipantId> = rosters[..separator].iter().map(|t| t.to_string()).collect();
    let red: Vec<ParticipantId> = rosters[separator + 1..]
        .iter()
        .map(|t| t.to_string())
        .collect();

    if blue.len() != TEAM_SIZE || red.len() != TEAM_SIZE {
        return Err(MatchmakingError::InvalidTeam {
            reason: format!(
                "each roster needs {} names, got {} and {}",
                TEAM_SIZE,
                blue.len(),
                red.len()
            ),
        }
        .into());
    }

    Ok(Command::ManualResult { winner, blue, red })
}

fn invalid_command(message: String) -> anyhow::Error {
    anyhow::anyhow!("{} (try 'help')", message)
}

/// Outcome of running a command
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Quit,
}

/// Run a command against the session and render the reply
pub async fn execute(session: &mut Session, command: Command) -> Result<Reply> {
    let text = match command {
        Command::Queue {
            participant_id,
            roles,
        } => match session.toggle(&participant_id, roles).await? {
            ToggleReport::Joined(report) => render_join(&report),
            ToggleReport::Left(report) => render_leave(&participant_id, &report),
        },
        Command::Join {
            participant_id,
            roles,
        } => render_join(&session.join(&participant_id, roles).await?),
        Command::Leave { participant_id } => {
            render_leave(&participant_id, &session.leave(&participant_id).await?)
        }
        Command::Report {
            participant_id,
            winner,
        } => match session.report(&participant_id, winner).await? {
            Some(report) => render_result(&report),
            None => format!("{} is not in a game", participant_id),
        },
        Command::Reset { participant_id } => {
            let report = session.void(&participant_id);
            match report.voided {
                Some(record) => format!(
                    "game {} voided, queue has been reset",
                    short_id(&record.id)
                ),
                None => "queue has been reset".to_string(),
            }
        }
        Command::Clear => {
            session.clear();
            "queue has been cleared".to_string()
        }
        Command::Mode(Some(mode)) => {
            session.set_mode(mode);
            format!("mode set to {}", mode)
        }
        Command::Mode(None) => {
            let available: Vec<&str> = MatchmakingMode::ALL.iter().map(|m| m.as_str()).collect();
            format!(
                "available modes: {}\ncurrent mode: {}",
                available.join(", "),
                session.mode()
            )
        }
        Command::Mmr(Some(participant_id)) => {
            format!("{:.0}", session.rating(&participant_id).await?)
        }
        Command::Mmr(None) => {
            let mut text = String::new();
            for entry in session.leaderboard().await? {
                let _ = writeln!(
                    text,
                    "{:2}: {} ({:.0})",
                    entry.position, entry.participant_id, entry.rating
                );
            }
            if text.is_empty() {
                "nobody has played yet".to_string()
            } else {
                text.trim_end().to_string()
            }
        }
        Command::Record { participant_id } => match session.record(&participant_id).await? {
            Some(record) => record.to_string(),
            None => format!("{} has no record", participant_id),
        },
        Command::Ranks => {
            let mut text = String::new();
            for (participant_id, tier) in session.ranks().await? {
                let _ = writeln!(text, "{}: {}", participant_id, tier);
            }
            text.trim_end().to_string()
        }
        Command::Tiers => session
            .tiers()
            .iter()
            .map(|tier| format!("{} (#{:06X})", tier, tier.color))
            .collect::<Vec<_>>()
            .join("\n"),
        Command::Status => {
            let queue = session.queue();
            let mut text = render_queue(&queue);
            for record in session.active_matches() {
                let _ = write!(text, "\nin game: {}", short_id(&record.id));
            }
            let _ = write!(text, "\nmode: {}", session.mode());
            text
        }
        Command::ManualResult { winner, blue, red } => {
            render_result(&session.manual_result(&blue, &red, winner == Side::Blue).await?)
        }
        Command::Help => HELP.to_string(),
        Command::Quit => return Ok(Reply::Quit),
    };

    Ok(Reply::Text(text))
}

fn render_queue(queue: &QueueSnapshot) -> String {
    format!(
        "{:2}/{} currently in queue: {}",
        queue.len(),
        queue.needed,
        queue.participant_ids().join(", ")
    )
}

fn render_leave(participant_id: &str, report: &LeaveReport) -> String {
    match report {
        LeaveReport::Left { attempt, queue } => {
            let mut text = format!(
                "{} has left the queue\n{}",
                participant_id,
                render_queue(queue)
            );
            render_attempt(&mut text, attempt);
            text
        }
        LeaveReport::NotQueued => format!("{} is not in the queue", participant_id),
    }
}

fn render_join(report: &JoinReport) -> String {
    let mut text = format!(
        "{} has joined the queue\n{}",
        report.participant_id,
        render_queue(&report.queue)
    );
    render_attempt(&mut text, &report.attempt);
    text
}

fn render_attempt(text: &mut String, attempt: &MatchAttempt) {
    match attempt {
        MatchAttempt::NotReady { .. } => {}
        MatchAttempt::Created(record) => {
            let _ = write!(text, "\n{}", render_match(record));
        }
        MatchAttempt::Infeasible(reason) => {
            let _ = write!(text, "\nno teams possible yet: {}", reason);
        }
    }
}

fn render_team(label: &str, team: &Team, win: f64, loss: f64) -> String {
    let mut text = format!(
        "{} ({:.0}, win {:+.0} / loss {:+.0})",
        label, team.aggregate_rating, win, loss
    );
    for (member, role) in team.lineup() {
        match role {
            Some(role) => {
                let _ = write!(
                    text,
                    "\n  {:8} {} ({:.0})",
                    role.to_string(),
                    member.id,
                    member.rating
                );
            }
            None => {
                let _ = write!(text, "\n  {} ({:.0})", member.id, member.rating);
            }
        }
    }
    text
}

fn render_match(record: &MatchRecord) -> String {
    format!(
        "game {} ({})\n{}\n{}\nblue win chance: {:.1}%",
        short_id(&record.id),
        record.mode,
        render_team(
            "Blue Team",
            &record.blue,
            record.stakes.blue_win,
            record.stakes.blue_loss
        ),
        render_team(
            "Red Team",
            &record.red,
            record.stakes.red_win,
            record.stakes.red_loss
        ),
        record.expected_blue_win * 100.0
    )
}

fn render_result(report: &ResultReport) -> String {
    let mut text = format!(
        "{} side wins game {}: blue {:+.1}, red {:+.1}",
        report.outcome.winner,
        short_id(&report.record.id),
        report.outcome.blue_delta,
        report.outcome.red_delta()
    );
    for change in &report.rank_changes {
        let _ = write!(
            text,
            "\n{}: {} -> {}",
            change.participant_id,
            change.previous.as_deref().unwrap_or("unranked"),
            change.current
        );
    }
    text
}
