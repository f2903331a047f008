use thiserror::Error;

/// One line of player input. Positions are already converted to zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    Start,
    Show,
    Next,
    Prev,
    Goto(usize),
    Select(usize),
    Clear,
    Mark,
    Pause,
    Resume,
    Status,
    Submit,
    Confirm,
    Cancel,
    Retry,
    History,
    Exit,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum CommandError {
    #[error("type a command, or 'help' for the list")]
    Empty,
    #[error("unknown command '{0}'; type 'help' for the list")]
    Unknown(String),
    #[error("'{0}' needs a number, e.g. '{0} 2'")]
    MissingNumber(&'static str),
    #[error("'{0}' is not a number from 1 upwards")]
    InvalidNumber(String),
}

pub(crate) const HELP: &str = "\
Commands:
  start            begin the exam (starts the clock)
  show             show the current question
  next | prev      move to the next or previous question
  goto N           jump to question N
  select N         choose option N for the current question
  clear            remove the answer and review mark of the current question
  mark             toggle the review mark of the current question
  pause | resume   stop or restart the clock
  status           question palette, counts and time left
  submit           review counts before submitting
  confirm | cancel finish or abandon the submit step
  retry            resend a failed submission, or reload a failed exam
  history          your previous attempts at this exam
  exit             leave the player (Ctrl-C does the same)";

pub(crate) fn parse(line: &str) -> Result<Command, CommandError> {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        return Err(CommandError::Empty);
    };
    let word = word.to_ascii_lowercase();

    let command = match word.as_str() {
        "start" | "begin" => Command::Start,
        "show" | "s" => Command::Show,
        "next" | "n" => Command::Next,
        "prev" | "previous" | "p" => Command::Prev,
        "goto" | "g" => Command::Goto(position("goto", parts.next())?),
        "select" | "answer" | "a" => Command::Select(position("select", parts.next())?),
        "clear" => Command::Clear,
        "mark" | "m" => Command::Mark,
        "pause" => Command::Pause,
        "resume" => Command::Resume,
        "status" | "st" => Command::Status,
        "submit" => Command::Submit,
        "confirm" | "yes" => Command::Confirm,
        "cancel" | "no" => Command::Cancel,
        "retry" => Command::Retry,
        "history" => Command::History,
        "exit" | "quit" | "q" => Command::Exit,
        "help" | "?" => Command::Help,
        _ => return Err(CommandError::Unknown(word)),
    };
    Ok(command)
}

fn position(command: &'static str, raw: Option<&str>) -> Result<usize, CommandError> {
    let raw = raw.ok_or(CommandError::MissingNumber(command))?;
    match raw.parse::<usize>() {
        Ok(value) if value >= 1 => Ok(value - 1),
        _ => Err(CommandError::InvalidNumber(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_commands_case_insensitively() {
        assert_eq!(parse("next"), Ok(Command::Next));
        assert_eq!(parse("  PREV "), Ok(Command::Prev));
        assert_eq!(parse("q"), Ok(Command::Exit));
        assert_eq!(parse("Confirm"), Ok(Command::Confirm));
    }

    #[test]
    fn numbers_are_one_based() {
        assert_eq!(parse("goto 3"), Ok(Command::Goto(2)));
        assert_eq!(parse("select 1"), Ok(Command::Select(0)));
    }

    #[test]
    fn bad_input_is_an_error_not_a_panic() {
        assert_eq!(parse(""), Err(CommandError::Empty));
        assert_eq!(parse("goto"), Err(CommandError::MissingNumber("goto")));
        assert_eq!(parse("select 0"), Err(CommandError::InvalidNumber("0".to_string())));
        assert_eq!(parse("select -2"), Err(CommandError::InvalidNumber("-2".to_string())));
        assert_eq!(parse("goto x"), Err(CommandError::InvalidNumber("x".to_string())));
        assert_eq!(parse("dance"), Err(CommandError::Unknown("dance".to_string())));
    }
}
