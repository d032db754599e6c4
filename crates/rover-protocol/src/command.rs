//! Control-port command parser.
//!
//! One command per line. Verbs match case-insensitively after trimming
//! surrounding whitespace. `steer` carries an integer suffix after a `:`
//! delimiter, clamped to the mechanically safe servo range before it ever
//! reaches the actuator.

use rover_core::DriftMode;
use thiserror::Error;

/// Minimum steering servo angle in degrees.
pub const STEER_MIN: i32 = 30;
/// Maximum steering servo angle in degrees.
pub const STEER_MAX: i32 = 130;

/// A validated control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `go` / legacy `forward`: full speed ahead.
    Forward,
    /// `goSlow`: reduced forward speed.
    ForwardSlow,
    /// `back` / legacy `backward`.
    Reverse,
    /// `stop`: halt the motors and raise the standby indicator.
    Stop,
    /// `drift` / `drift1`: spin in place.
    Drift(DriftMode),
    /// `onHeadlights` / `offHeadlights` and legacy `lights_on` / `lights_off`.
    Headlights(bool),
    /// `steer:<angle>`, clamped to `[STEER_MIN, STEER_MAX]`.
    Steer(u8),
}

/// Errors from [`parse_command`]. Never fatal to the channel: the caller
/// logs and discards the line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("empty command line")]
    Empty,

    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    #[error("bad steer argument: {0:?}")]
    BadSteerArgument(String),
}

/// Parse one line of control input into a [`Command`].
pub fn parse_command(line: &str) -> Result<Command, CommandParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(CommandParseError::Empty);
    }

    if let Some(arg) = strip_prefix_ignore_case(line, "steer:") {
        let angle: i32 = arg
            .trim()
            .parse()
            .map_err(|_| CommandParseError::BadSteerArgument(arg.to_string()))?;
        return Ok(Command::Steer(angle.clamp(STEER_MIN, STEER_MAX) as u8));
    }

    let command = match line.to_ascii_lowercase().as_str() {
        "go" | "forward" => Command::Forward,
        "goslow" => Command::ForwardSlow,
        "back" | "backward" => Command::Reverse,
        "stop" => Command::Stop,
        "drift" => Command::Drift(DriftMode::Clockwise),
        "drift1" => Command::Drift(DriftMode::CounterClockwise),
        "onheadlights" | "lights_on" => Command::Headlights(true),
        "offheadlights" | "lights_off" => Command::Headlights(false),
        _ => return Err(CommandParseError::UnknownCommand(line.to_string())),
    };
    Ok(command)
}

fn strip_prefix_ignore_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    if line.len() >= prefix.len() && line[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&line[prefix.len()..])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn verbs_match_case_insensitively_and_trimmed() {
        assert_eq!(parse_command("  GO\n").unwrap(), Command::Forward);
        assert_eq!(parse_command("go").unwrap(), Command::Forward);
        assert_eq!(parse_command("Go").unwrap(), Command::Forward);
        assert_eq!(parse_command("GOSLOW").unwrap(), Command::ForwardSlow);
        assert_eq!(parse_command("\tback\r\n").unwrap(), Command::Reverse);
    }

    #[test]
    fn every_verb_parses() {
        assert_eq!(parse_command("stop").unwrap(), Command::Stop);
        assert_eq!(
            parse_command("drift").unwrap(),
            Command::Drift(DriftMode::Clockwise)
        );
        assert_eq!(
            parse_command("drift1").unwrap(),
            Command::Drift(DriftMode::CounterClockwise)
        );
        assert_eq!(
            parse_command("onHeadlights").unwrap(),
            Command::Headlights(true)
        );
        assert_eq!(
            parse_command("offHeadlights").unwrap(),
            Command::Headlights(false)
        );
    }

    #[test]
    fn legacy_synonyms_still_work() {
        assert_eq!(parse_command("forward").unwrap(), Command::Forward);
        assert_eq!(parse_command("backward").unwrap(), Command::Reverse);
        assert_eq!(parse_command("lights_on").unwrap(), Command::Headlights(true));
        assert_eq!(
            parse_command("LIGHTS_OFF").unwrap(),
            Command::Headlights(false)
        );
    }

    #[test]
    fn steer_parses_and_clamps() {
        assert_eq!(parse_command("steer:90").unwrap(), Command::Steer(90));
        assert_eq!(parse_command("STEER:45").unwrap(), Command::Steer(45));
        // Out-of-range angles clamp to the safe servo limits.
        assert_eq!(parse_command("steer:200").unwrap(), Command::Steer(130));
        assert_eq!(parse_command("steer:-50").unwrap(), Command::Steer(30));
    }

    #[test]
    fn malformed_steer_is_an_error_not_a_panic() {
        assert_eq!(
            parse_command("steer:fast"),
            Err(CommandParseError::BadSteerArgument("fast".to_string()))
        );
        assert_eq!(
            parse_command("steer:"),
            Err(CommandParseError::BadSteerArgument(String::new()))
        );
    }

    #[test]
    fn unknown_verbs_are_errors() {
        assert_eq!(
            parse_command("launch"),
            Err(CommandParseError::UnknownCommand("launch".to_string()))
        );
        assert_eq!(parse_command("   \n"), Err(CommandParseError::Empty));
    }
}
