//! Line-oriented shell over the reminder collection.

use std::sync::Arc;

use chrono::{Duration, Local, Utc};
use miette::{IntoDiagnostic, Result, bail, miette};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

use remindme_core::{
    AlertState, FiredAlert, LocalPlatform, ReconcileOutcome, Reconciled, Reminder,
    ReminderCollection, ReminderId, RequestedAlert,
};

const HELP: &str = "\
commands:
  add <title> [@ <delay>]   add a reminder, optionally alerting after <delay>
  list [--json]             show reminders
  alert <n> <delay>         set or move the alert of reminder <n>
  alert <n> off             remove the alert of reminder <n>
  rename <n> <title>        change the title of reminder <n>
  done <n> / undone <n>     mark reminder <n> done or not done
  delete <n>                delete reminder <n> and its alert
  help                      show this message
  quit                      exit
<delay> is a whole number followed by s, m, h or d (e.g. 90s, 15m, 2h).";

/// A parsed shell command. Indexes are 1-based list positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add {
        title: String,
        delay: Option<Duration>,
    },
    List {
        json: bool,
    },
    Alert {
        index: usize,
        delay: Option<Duration>,
    },
    Rename {
        index: usize,
        title: String,
    },
    Done {
        index: usize,
        done: bool,
    },
    Delete {
        index: usize,
    },
    Help,
    Quit,
}

/// Parse one input line.
pub fn parse_command(line: &str) -> Result<Command> {
    let line = line.trim();
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match verb {
        "add" => {
            let split = rest
                .rsplit_once(" @ ")
                .or_else(|| rest.strip_prefix("@ ").map(|delay| ("", delay)));
            let (title, delay) = match split {
                Some((title, delay)) => (title.trim(), Some(parse_delay(delay)?)),
                None => (rest, None),
            };
            if title.is_empty() {
                bail!("add needs a title");
            }
            Command::Add {
                title: title.to_string(),
                delay,
            }
        }
        "list" | "ls" => Command::List {
            json: rest == "--json",
        },
        "alert" => {
            let (index, arg) = split_index(rest)?;
            let delay = match arg {
                "off" | "none" => None,
                delay => Some(parse_delay(delay)?),
            };
            Command::Alert { index, delay }
        }
        "rename" => {
            let (index, title) = split_index(rest)?;
            Command::Rename {
                index,
                title: title.to_string(),
            }
        }
        "done" | "undone" => Command::Done {
            index: parse_index(rest)?,
            done: verb == "done",
        },
        "delete" | "rm" => Command::Delete {
            index: parse_index(rest)?,
        },
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "" => bail!("empty command"),
        other => bail!("unknown command '{}', try 'help'", other),
    };
    Ok(command)
}

/// Parse `<int><s|m|h|d>`.
pub fn parse_delay(s: &str) -> Result<Duration> {
    let s = s.trim();
    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| miette!("delay '{}' needs a unit (s, m, h, d)", s))?;
    let (amount, unit) = s.split_at(split);
    let amount: i64 = amount
        .parse()
        .map_err(|_| miette!("invalid delay amount in '{}'", s))?;
    if amount <= 0 {
        bail!("delay must be positive");
    }
    let delay = match unit {
        "s" => Duration::try_seconds(amount),
        "m" => Duration::try_minutes(amount),
        "h" => Duration::try_hours(amount),
        "d" => Duration::try_days(amount),
        other => bail!("unknown delay unit '{}'", other),
    };
    delay.ok_or_else(|| miette!("delay '{}' is too large", s))
}

/// The alert time `delay` from now, or no alert.
fn requested_after(delay: Option<Duration>) -> Result<RequestedAlert> {
    let at = delay
        .map(|d| {
            Utc::now()
                .checked_add_signed(d)
                .ok_or_else(|| miette!("delay too large"))
        })
        .transpose()?;
    Ok(RequestedAlert::from(at))
}

fn parse_index(s: &str) -> Result<usize> {
    let index: usize = s
        .trim()
        .parse()
        .map_err(|_| miette!("expected a reminder number, got '{}'", s))?;
    if index == 0 {
        bail!("reminder numbers start at 1");
    }
    Ok(index)
}

fn split_index(s: &str) -> Result<(usize, &str)> {
    let (index, rest) = s
        .split_once(char::is_whitespace)
        .ok_or_else(|| miette!("expected '<n> <argument>'"))?;
    Ok((parse_index(index)?, rest.trim()))
}

/// Read commands from stdin until `quit` or end of input, printing fired
/// alerts as they arrive.
pub async fn run(
    reminders: Arc<ReminderCollection>,
    platform: Arc<LocalPlatform>,
    mut fired_rx: mpsc::UnboundedReceiver<FiredAlert>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", HELP);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.into_diagnostic()? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => {
                        if let Err(e) = execute(&reminders, command).await {
                            println!("error: {}", e);
                        }
                    }
                    Err(e) => println!("error: {}", e),
                }
            }
            Some(alert) = fired_rx.recv() => {
                println!("*** ALERT: {} ***", alert.title);
            }
        }
    }

    info!(pending = platform.pending_count(), "shell closed");
    Ok(())
}

async fn execute(reminders: &ReminderCollection, command: Command) -> Result<()> {
    debug!(?command, "executing command");
    match command {
        Command::Add { title, delay } => {
            let requested = requested_after(delay)?;
            let reconciled = reminders.create(&title, requested).await.into_diagnostic()?;
            report(&reconciled);
        }
        Command::List { json } => {
            let list = reminders.list().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&list).into_diagnostic()?);
            } else if list.is_empty() {
                println!("no reminders");
            } else {
                for (i, reminder) in list.iter().enumerate() {
                    println!("{:>3}. {}", i + 1, render(reminder));
                }
            }
        }
        Command::Alert { index, delay } => {
            let id = resolve(reminders, index).await?;
            let requested = requested_after(delay)?;
            let reconciled = reminders
                .apply_notification_request(id, requested)
                .await
                .into_diagnostic()?;
            report(&reconciled);
        }
        Command::Rename { index, title } => {
            let id = resolve(reminders, index).await?;
            let reconciled = reminders.rename(id, &title).await.into_diagnostic()?;
            report(&reconciled);
        }
        Command::Done { index, done } => {
            let id = resolve(reminders, index).await?;
            let reminder = reminders.set_done(id, done).await.into_diagnostic()?;
            println!("{}", render(&reminder));
        }
        Command::Delete { index } => {
            let id = resolve(reminders, index).await?;
            let reminder = reminders.delete(id).await.into_diagnostic()?;
            println!("deleted: {}", reminder.title);
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
    Ok(())
}

async fn resolve(reminders: &ReminderCollection, index: usize) -> Result<ReminderId> {
    reminders
        .list()
        .await
        .get(index - 1)
        .map(|r| r.id)
        .ok_or_else(|| miette!("no reminder number {}", index))
}

fn report(reconciled: &Reconciled) {
    println!("{}", render(&reconciled.reminder));
    match reconciled.outcome {
        ReconcileOutcome::Failed(kind) if kind.needs_settings() => println!(
            "There was a problem creating an alert for this reminder. \
             Please check that alerts are allowed for this app in Settings."
        ),
        ReconcileOutcome::Failed(_) => {
            println!("The alert could not be scheduled. Adjust the time and try again.")
        }
        _ => {}
    }
}

fn render(reminder: &Reminder) -> String {
    let check = if reminder.done { "x" } else { " " };
    let alert = match (&reminder.notification, reminder.alert_state()) {
        (Some(n), state) => {
            let when = n.scheduled_for.with_timezone(&Local).format("%Y-%m-%d %H:%M");
            let status = match state {
                AlertState::Scheduled => "scheduled",
                AlertState::Failed => "not scheduled",
                _ => "pending",
            };
            format!("  (alert {}, {})", when, status)
        }
        (None, _) => String::new(),
    };
    format!("[{}] {}{}", check, reminder.title, alert)
}
