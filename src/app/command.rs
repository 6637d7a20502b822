//! Command parsing for the interactive study shell

/// Parsed command from the study shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Complete cards: study <topic> <index>...
    Study { topic: String, indices: Vec<u32> },
    /// Show points, level, streak and the daily challenge: stats
    Stats,
    /// List earned and locked achievements: achievements
    Achievements,
    /// List accessible topics with completion: topics
    Topics,
    /// Send a deck back to its first card: restart <topic>
    Restart(String),
    /// Bookmark a card: save <topic> <index> [note]
    Save { topic: String, index: u32, note: Option<String> },
    /// List bookmarked cards: saved
    Saved,
    /// Remove a bookmark: unsave <id>
    Unsave(u64),
    /// Show the leaderboard: leaderboard
    Leaderboard,
    /// Show help: help or h
    Help,
    /// Leave the shell: q or quit
    Quit,
    /// Empty input
    Nop,
}

/// Result of parsing a command
#[derive(Debug, PartialEq, Eq)]
pub enum ParseResult {
    /// Successfully parsed command
    Ok(Command),
    /// Unknown command
    UnknownCommand(String),
    /// Command needs an argument
    MissingArgument(String),
    /// An argument could not be read
    InvalidArgument(String),
}

/// Parse one line of shell input
pub fn parse_command(input: &str) -> ParseResult {
    let input = input.trim();

    if input.is_empty() {
        return ParseResult::Ok(Command::Nop);
    }

    let mut parts = input.split_whitespace();
    let cmd = parts.next().unwrap_or("");
    let args: Vec<&str> = parts.collect();

    match cmd.to_lowercase().as_str() {
        "study" | "s" => {
            let Some((topic, rest)) = args.split_first() else {
                return ParseResult::MissingArgument("study".to_string());
            };
            if rest.is_empty() {
                return ParseResult::MissingArgument("study".to_string());
            }
            match rest.iter().map(|s| s.parse()).collect::<Result<Vec<u32>, _>>() {
                Ok(indices) => ParseResult::Ok(Command::Study { topic: topic.to_string(), indices }),
                Err(_) => ParseResult::InvalidArgument(rest.join(" ")),
            }
        }
        "stats" | "st" => ParseResult::Ok(Command::Stats),
        "achievements" | "ach" => ParseResult::Ok(Command::Achievements),
        "topics" | "ls" => ParseResult::Ok(Command::Topics),
        "restart" => match args.first() {
            Some(topic) => ParseResult::Ok(Command::Restart(topic.to_string())),
            None => ParseResult::MissingArgument("restart".to_string()),
        },
        "save" => {
            let (Some(topic), Some(index)) = (args.first(), args.get(1)) else {
                return ParseResult::MissingArgument("save".to_string());
            };
            let Ok(index) = index.parse() else {
                return ParseResult::InvalidArgument(index.to_string());
            };
            let note = if args.len() > 2 { Some(args[2..].join(" ")) } else { None };
            ParseResult::Ok(Command::Save { topic: topic.to_string(), index, note })
        }
        "saved" => ParseResult::Ok(Command::Saved),
        "unsave" | "rm" => match args.first() {
            Some(id) => match id.parse() {
                Ok(id) => ParseResult::Ok(Command::Unsave(id)),
                Err(_) => ParseResult::InvalidArgument(id.to_string()),
            },
            None => ParseResult::MissingArgument("unsave".to_string()),
        },
        "leaderboard" | "lb" => ParseResult::Ok(Command::Leaderboard),
        "help" | "h" | "?" => ParseResult::Ok(Command::Help),
        "quit" | "q" | "exit" => ParseResult::Ok(Command::Quit),
        _ => ParseResult::UnknownCommand(cmd.to_string()),
    }
}
