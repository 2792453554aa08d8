//! Line-oriented command grammar for the interactive shell.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    List,
    Pages,
    Next,
    Prev,
    More,
    Open { id: i64 },
    Peek { id: i64 },
    Compose,
    Title { text: String },
    Body { text: String },
    Submit,
    Cancel,
    Refresh,
    Cache,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty input")]
    Empty,
    #[error("unknown command: {word}")]
    Unknown { word: String },
    #[error("`{command}` needs a post id")]
    MissingId { command: &'static str },
    #[error("not a post id: {given}")]
    InvalidId { given: String },
}

/// Parse one input line. The verb is case-insensitive; `title` and `body`
/// keep the rest of the line verbatim.
pub fn parse_command(line: &str) -> Result<ShellCommand, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::Empty);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (line, ""),
    };

    match word.to_ascii_lowercase().as_str() {
        "list" => Ok(ShellCommand::List),
        "pages" => Ok(ShellCommand::Pages),
        "next" => Ok(ShellCommand::Next),
        "prev" => Ok(ShellCommand::Prev),
        "more" => Ok(ShellCommand::More),
        "open" => parse_id(rest, "open").map(|id| ShellCommand::Open { id }),
        "peek" => parse_id(rest, "peek").map(|id| ShellCommand::Peek { id }),
        "compose" => Ok(ShellCommand::Compose),
        "title" => Ok(ShellCommand::Title {
            text: rest.to_owned(),
        }),
        "body" => Ok(ShellCommand::Body {
            text: rest.to_owned(),
        }),
        "submit" => Ok(ShellCommand::Submit),
        "cancel" => Ok(ShellCommand::Cancel),
        "refresh" => Ok(ShellCommand::Refresh),
        "cache" => Ok(ShellCommand::Cache),
        "help" | "?" => Ok(ShellCommand::Help),
        "quit" | "exit" | "q" => Ok(ShellCommand::Quit),
        _ => Err(ParseError::Unknown {
            word: word.to_owned(),
        }),
    }
}

fn parse_id(rest: &str, command: &'static str) -> Result<i64, ParseError> {
    let given = rest.split_whitespace().next().ok_or(ParseError::MissingId { command })?;
    given.parse().map_err(|_| ParseError::InvalidId {
        given: given.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_words_parse() {
        assert_eq!(parse_command("list"), Ok(ShellCommand::List));
        assert_eq!(parse_command("  pages  "), Ok(ShellCommand::Pages));
        assert_eq!(parse_command("QUIT"), Ok(ShellCommand::Quit));
        assert_eq!(parse_command("?"), Ok(ShellCommand::Help));
    }

    #[test]
    fn open_takes_a_numeric_id() {
        assert_eq!(parse_command("open 7"), Ok(ShellCommand::Open { id: 7 }));
        assert_eq!(parse_command("peek 12"), Ok(ShellCommand::Peek { id: 12 }));
        assert_eq!(
            parse_command("open"),
            Err(ParseError::MissingId { command: "open" })
        );
        assert_eq!(
            parse_command("open seven"),
            Err(ParseError::InvalidId {
                given: "seven".to_owned()
            })
        );
    }

    #[test]
    fn title_keeps_the_rest_of_the_line() {
        assert_eq!(
            parse_command("title Hello query world"),
            Ok(ShellCommand::Title {
                text: "Hello query world".to_owned()
            })
        );
        assert_eq!(
            parse_command("body  two  spaces stay"),
            Ok(ShellCommand::Body {
                text: "two  spaces stay".to_owned()
            })
        );
    }

    #[test]
    fn bare_title_clears_the_field() {
        assert_eq!(
            parse_command("title"),
            Ok(ShellCommand::Title {
                text: String::new()
            })
        );
    }

    #[test]
    fn empty_and_unknown_input_are_distinct_errors() {
        assert_eq!(parse_command("   "), Err(ParseError::Empty));
        assert_eq!(
            parse_command("wibble 3"),
            Err(ParseError::Unknown {
                word: "wibble".to_owned()
            })
        );
    }
}
