use std::str::FromStr;

/// One line of the interactive console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Voice(String),
    State,
    Transcript,
    Stats,
    Help,
    Quit,
}

pub const HELP: &str = "commands: start | stop | voice <id> | state | transcript | stats | help | quit";

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let name = parts.next().unwrap_or_default().to_ascii_lowercase();
        let command = match name.as_str() {
            "start" => Command::Start,
            "stop" => Command::Stop,
            "voice" => match parts.next() {
                Some(id) => Command::Voice(id.to_string()),
                None => return Err("usage: voice <id>".to_string()),
            },
            "state" => Command::State,
            "transcript" => Command::Transcript,
            "stats" => Command::Stats,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            "" => return Err(HELP.to_string()),
            other => return Err(format!("unknown command: {}. {}", other, HELP)),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("start".parse::<Command>(), Ok(Command::Start));
        assert_eq!("  STOP ".parse::<Command>(), Ok(Command::Stop));
        assert_eq!(
            "voice es-female-1".parse::<Command>(),
            Ok(Command::Voice("es-female-1".to_string()))
        );
        assert_eq!("exit".parse::<Command>(), Ok(Command::Quit));
    }

    #[test]
    fn test_rejects() {
        assert!("voice".parse::<Command>().is_err());
        assert!("".parse::<Command>().is_err());
        assert!("dance".parse::<Command>().unwrap_err().contains("unknown command"));
    }
}
