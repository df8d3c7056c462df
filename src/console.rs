//! Line-oriented operator console: the stand-in for the original window's
//! buttons, interval picker and data view.

use std::str::FromStr;

use anyhow::Result;
use log::warn;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::{
    config::SampleInterval,
    error::ConfigError,
    metrics::MetricSampler,
    observer::{format_elapsed, RecorderEvent},
    recording::Recorder,
    settings::SettingsStore,
    store::SampleStore,
};

const DEFAULT_SHOW_LIMIT: usize = 10;

pub const HELP: &str = "\
commands:
  start            begin recording samples
  stop             stop recording
  interval <secs>  change the sampling interval
  show [n]         print the n most recent samples (default 10)
  status           print the recording state
  help             print this message
  quit             exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Interval(SampleInterval),
    Show(usize),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseCommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),
    #[error("'{0}' is not a number")]
    BadNumber(String),
    #[error(transparent)]
    Interval(ConfigError),
}

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let Some(cmd) = parts.next() else {
            return Err(ParseCommandError::Empty);
        };
        let arg = parts.next();

        match cmd.to_ascii_lowercase().as_str() {
            "start" => Ok(Command::Start),
            "stop" => Ok(Command::Stop),
            "interval" => {
                let raw = arg.ok_or(ParseCommandError::MissingArgument("interval"))?;
                let secs = parse_number::<u64>(raw)?;
                SampleInterval::new(secs)
                    .map(Command::Interval)
                    .map_err(ParseCommandError::Interval)
            }
            "show" => match arg {
                Some(raw) => Ok(Command::Show(parse_number(raw)?)),
                None => Ok(Command::Show(DEFAULT_SHOW_LIMIT)),
            },
            "status" => Ok(Command::Status),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(ParseCommandError::Unknown(other.to_string())),
        }
    }
}

fn parse_number<T: FromStr>(raw: &str) -> Result<T, ParseCommandError> {
    raw.parse()
        .map_err(|_| ParseCommandError::BadNumber(raw.to_string()))
}

/// One line for the live view, e.g.
/// `CPU: 1.0% | RAM: 2.0% | Disk: 3.0% | Recording Time: 00:00:04`.
pub fn render_event(event: &RecorderEvent) -> String {
    match event {
        RecorderEvent::Sample {
            reading,
            recording,
            elapsed_secs,
        } => {
            let elapsed = match (recording, elapsed_secs) {
                (true, Some(secs)) => format_elapsed(std::time::Duration::from_secs(*secs)),
                _ => format_elapsed(std::time::Duration::ZERO),
            };
            format!("{reading} | Recording Time: {elapsed}")
        }
        RecorderEvent::Error { message } => format!("error: {message}"),
    }
}

/// Reads commands from `input` until `quit` or end of input, writing replies to `out`.
pub async fn run_console<M, S, R, W>(
    recorder: &Recorder<M, S>,
    settings: Option<&SettingsStore>,
    input: R,
    mut out: W,
) -> Result<()>
where
    M: MetricSampler,
    S: SampleStore,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let reply = match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(command) => execute(recorder, settings, command).await,
            Err(err) => err.to_string(),
        };

        out.write_all(reply.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
    }
    Ok(())
}

async fn execute<M, S>(
    recorder: &Recorder<M, S>,
    settings: Option<&SettingsStore>,
    command: Command,
) -> String
where
    M: MetricSampler,
    S: SampleStore,
{
    match command {
        Command::Start => match recorder.start().await {
            Ok(_) => "Recording started: samples will now be written to the database.".into(),
            Err(err) => err.to_string(),
        },
        Command::Stop => match recorder.stop().await {
            Ok(elapsed) => format!(
                "Recording stopped after {}.",
                format_elapsed(elapsed)
            ),
            Err(err) => err.to_string(),
        },
        Command::Interval(interval) => {
            recorder.set_interval(interval);
            if let Some(settings) = settings {
                if let Err(err) = settings.update_interval(interval) {
                    warn!("Failed to remember interval: {err:#}");
                }
            }
            format!("Update interval set to {}s.", interval.secs())
        }
        Command::Show(limit) => match recorder.recent(limit).await {
            Ok(samples) if samples.is_empty() => "No data available.".into(),
            Ok(samples) => samples
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n"),
            Err(err) => format!("Failed to fetch data from the database: {err}"),
        },
        Command::Status => {
            let session = recorder.session().await;
            match (session.started_at(), session.elapsed(tokio::time::Instant::now())) {
                (Some(since), Some(elapsed)) => format!(
                    "recording since {} ({}), interval {}s",
                    since.to_rfc3339(),
                    format_elapsed(elapsed),
                    recorder.interval().secs()
                ),
                _ => format!("idle, interval {}s", recorder.interval().secs()),
            }
        }
        Command::Help => HELP.to_string(),
        Command::Quit => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn parses_commands() {
        assert_eq!("start".parse::<Command>(), Ok(Command::Start));
        assert_eq!(" STOP ".parse::<Command>(), Ok(Command::Stop));
        assert_eq!(
            "interval 3".parse::<Command>(),
            Ok(Command::Interval(SampleInterval::new(3).unwrap()))
        );
        assert_eq!("show".parse::<Command>(), Ok(Command::Show(10)));
        assert_eq!("show 2".parse::<Command>(), Ok(Command::Show(2)));
        assert_eq!("exit".parse::<Command>(), Ok(Command::Quit));
        assert_eq!(
            format!("show {}", usize::MAX).parse::<Command>(),
            Ok(Command::Show(usize::MAX))
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!("".parse::<Command>(), Err(ParseCommandError::Empty));
        assert_eq!(
            "interval".parse::<Command>(),
            Err(ParseCommandError::MissingArgument("interval"))
        );
        assert_eq!(
            "interval soon".parse::<Command>(),
            Err(ParseCommandError::BadNumber("soon".into()))
        );
        assert!(matches!(
            "interval 0".parse::<Command>(),
            Err(ParseCommandError::Interval(ConfigError::InvalidInterval { .. }))
        ));
        assert_eq!(
            "show -1".parse::<Command>(),
            Err(ParseCommandError::BadNumber("-1".into()))
        );
        assert_eq!(
            "interval 0".parse::<Command>().unwrap_err().to_string(),
            "sampling interval must be between 1 and 60 seconds, got 0"
        );
        assert!(matches!(
            "dance".parse::<Command>(),
            Err(ParseCommandError::Unknown(_))
        ));
    }

    #[test]
    fn renders_live_line() {
        let reading = crate::metrics::Reading::new(Utc::now(), 1.0, 2.0, 3.0).unwrap();
        let idle = RecorderEvent::Sample {
            reading,
            recording: false,
            elapsed_secs: None,
        };
        assert_eq!(
            render_event(&idle),
            "CPU: 1.0% | RAM: 2.0% | Disk: 3.0% | Recording Time: 00:00:00"
        );

        let recording = RecorderEvent::Sample {
            reading,
            recording: true,
            elapsed_secs: Some(65),
        };
        assert!(render_event(&recording).ends_with("Recording Time: 00:01:05"));
    }
}
