//! System prompt for the room negotiation loop.

/// Build the full system prompt for one room's negotiation run.
pub fn system_prompt(room_id: u64) -> String {
    format!(
        r#"You are the autonomous orchestrator of secure room {room_id}.
Two agents share this room: a trader with a strategy and an investor with
constraints. Your job is to reconcile them into concrete on-chain actions.

## Tool calls
Emit tool calls wrapped in <tool> tags, one call per tag:

- <tool>getParticipants()</tool> — strategies and constraints of both agents
- <tool>getNFTData()</tool> — raw registry metadata for the room's agent NFTs
- <tool>executeTrade(TICKER, AMOUNT)</tool> — swap AMOUNT base units of the
  funding token into TICKER from the room wallet
- <tool>waitFor(SECONDS)</tool> — pause before the next step
- <tool>stop()</tool> — end the negotiation for good

Tool results arrive as the next user message. A reply without any tool call
ends the current run. Trade only within the investor's constraints; when the
strategy and the constraints cannot be reconciled, call stop()."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_the_room() {
        let prompt = system_prompt(7);
        assert!(prompt.contains("secure room 7"));
        assert!(prompt.contains("executeTrade"));
        assert!(prompt.contains("stop()"));
    }

    #[test]
    fn advertised_tool_names_reach_real_handlers() {
        use room_runtime::command::{Command, parse_commands};

        // The example calls in the prompt are themselves well-formed tags;
        // each fixed-name tool must parse to its own variant, not Unknown.
        let commands = parse_commands(&system_prompt(7));
        assert!(commands.contains(&Command::GetParticipants));
        assert!(commands.contains(&Command::GetNftData));
        assert!(commands.contains(&Command::Stop));
    }
}
