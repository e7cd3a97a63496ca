//! Parses assistant replies into domain commands.
//!
//! The model emits `<tool>name(args)</tool>` tags; every tag in a reply is
//! parsed independently, in document order. Parsing is decoupled from
//! dispatch: the engine only ever sees the `Command` union.

use once_cell::sync::Lazy;
use regex::Regex;

static TOOL_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<tool>\s*(.*?)\s*</tool>").expect("valid tool tag regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    GetParticipants,
    GetNftData,
    ExecuteTrade { ticker: String, amount: u128 },
    WaitFor { seconds: u64 },
    Stop,
    Unknown { name: String },
}

impl Command {
    pub fn name(&self) -> &str {
        match self {
            Command::GetParticipants => "getParticipants",
            Command::GetNftData => "getNFTData",
            Command::ExecuteTrade { .. } => "executeTrade",
            Command::WaitFor { .. } => "waitFor",
            Command::Stop => "stop",
            Command::Unknown { name } => name,
        }
    }
}

/// Extract every well-formed `<tool>` tag from an assistant reply.
pub fn parse_commands(content: &str) -> Vec<Command> {
    TOOL_TAG
        .captures_iter(content)
        .map(|cap| parse_one(cap[1].trim()))
        .collect()
}

fn parse_one(body: &str) -> Command {
    let (name, args) = split_call(body);

    match name {
        "getParticipants" => Command::GetParticipants,
        "getNFTData" => Command::GetNftData,
        "executeTrade" => parse_execute_trade(&args)
            .unwrap_or(Command::Unknown { name: "executeTrade".into() }),
        "stop" => Command::Stop,
        _ if name.starts_with("waitFor") => parse_wait_for(name, &args)
            .unwrap_or(Command::Unknown { name: name.to_string() }),
        _ => Command::Unknown { name: name.to_string() },
    }
}

/// Split `name(arg1, arg2)` into the name and its argument list. A bare
/// name yields an empty list.
fn split_call(body: &str) -> (&str, Vec<&str>) {
    match body.find('(') {
        Some(open) => {
            let name = body[..open].trim();
            let inner = body[open + 1..].trim_end().trim_end_matches(')');
            let args = inner
                .split(',')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .collect();
            (name, args)
        }
        None => (body.trim(), Vec::new()),
    }
}

fn parse_execute_trade(args: &[&str]) -> Option<Command> {
    let ticker = args.first()?.trim_matches(['"', '\'']).to_string();
    if ticker.is_empty() {
        return None;
    }
    let amount: u128 = args.get(1)?.parse().ok()?;
    Some(Command::ExecuteTrade { ticker, amount })
}

/// `waitFor` carries its delay either as an argument (`waitFor(10)`) or as
/// a numeric suffix on the name itself (`waitFor10`).
fn parse_wait_for(name: &str, args: &[&str]) -> Option<Command> {
    let seconds = match args.first() {
        Some(arg) => arg.parse().ok()?,
        None => name.strip_prefix("waitFor")?.parse().ok()?,
    };
    Some(Command::WaitFor { seconds })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_tags_in_document_order() {
        let content = "I will check the room first. <tool>getParticipants</tool> then \
                       <tool>getNFTData</tool> and finally <tool>stop</tool>";
        assert_eq!(
            parse_commands(content),
            vec![Command::GetParticipants, Command::GetNftData, Command::Stop]
        );
    }

    #[test]
    fn fixed_names_parse_with_and_without_parens() {
        assert_eq!(
            parse_commands("<tool>getNFTData()</tool><tool>getParticipants()</tool>"),
            vec![Command::GetNftData, Command::GetParticipants]
        );
        assert_eq!(parse_commands("<tool>stop()</tool>"), vec![Command::Stop]);
    }

    #[test]
    fn parses_execute_trade_arguments() {
        let commands = parse_commands("<tool>executeTrade(USDT, 100000000)</tool>");
        assert_eq!(
            commands,
            vec![Command::ExecuteTrade { ticker: "USDT".into(), amount: 100_000000 }]
        );
    }

    #[test]
    fn malformed_execute_trade_becomes_unknown() {
        let commands = parse_commands("<tool>executeTrade(USDT)</tool>");
        assert_eq!(commands, vec![Command::Unknown { name: "executeTrade".into() }]);
    }

    #[test]
    fn wait_for_argument_and_suffix_forms() {
        assert_eq!(
            parse_commands("<tool>waitFor(12)</tool>"),
            vec![Command::WaitFor { seconds: 12 }]
        );
        assert_eq!(
            parse_commands("<tool>waitFor5</tool>"),
            vec![Command::WaitFor { seconds: 5 }]
        );
    }

    #[test]
    fn wait_for_without_number_is_unknown() {
        assert_eq!(
            parse_commands("<tool>waitFor(soon)</tool>"),
            vec![Command::Unknown { name: "waitFor".into() }]
        );
    }

    #[test]
    fn unknown_tool_preserves_name() {
        assert_eq!(
            parse_commands("<tool>launchMissiles</tool>"),
            vec![Command::Unknown { name: "launchMissiles".into() }]
        );
    }

    #[test]
    fn no_tags_yields_no_commands() {
        assert!(parse_commands("just prose, nothing to run").is_empty());
    }

    #[test]
    fn exact_count_for_n_tags() {
        let content = "<tool>stop</tool>".repeat(7);
        assert_eq!(parse_commands(&content).len(), 7);
    }

    #[test]
    fn tag_spanning_lines_is_parsed() {
        let content = "<tool>\n  executeTrade(WBTC, 5000)\n</tool>";
        assert_eq!(
            parse_commands(content),
            vec![Command::ExecuteTrade { ticker: "WBTC".into(), amount: 5000 }]
        );
    }
}
