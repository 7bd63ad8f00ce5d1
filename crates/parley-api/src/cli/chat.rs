//! Line-oriented chat loop.
//!
//! Each stdin line is one turn. Replies go to stdout as JSON, diagnostics
//! to stderr. `/redeem <token>` redeems a one-time link the way the session
//! list page would.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info_span};

use parley_core::agent::engine::AgentError;
use parley_core::reply::ReplyError;
use parley_core::reply::dispatch::LIST_SESSIONS_ACTION;
use parley_observe::genai_attrs::{AGENT_NAME, OP_INVOKE_AGENT};
use parley_types::user::Identity;

use super::session::sessions_json;
use crate::state::AppState;

/// One parsed stdin line.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Blank,
    Quit,
    Redeem(&'a str),
    Message(&'a str),
}

fn parse_line(line: &str) -> Input<'_> {
    let line = line.trim();
    match line {
        "" => Input::Blank,
        "/quit" | "/exit" => Input::Quit,
        _ => match line.strip_prefix("/redeem") {
            Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => {
                Input::Redeem(rest.trim())
            }
            _ => Input::Message(line),
        },
    }
}

pub async fn run_chat(state: &AppState, identity: Identity, shutdown: CancellationToken) -> anyhow::Result<()> {
    eprintln!(
        "parley: chatting as '{}' (links point at {}). /quit to leave.",
        identity.user_id, state.config.base_url
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };

        match parse_line(&line) {
            Input::Blank => continue,
            Input::Quit => break,
            Input::Redeem(token) => redeem(state, token).await,
            Input::Message(text) => {
                let turn = shutdown.child_token();
                let span = info_span!(
                    "invoke_agent",
                    gen_ai.operation.name = OP_INVOKE_AGENT,
                    gen_ai.agent.name = AGENT_NAME,
                );
                let result = state
                    .pipeline
                    .reply(&identity, text, &turn)
                    .instrument(span)
                    .await;

                match result {
                    Ok(reply) => println!("{}", serde_json::to_string_pretty(&reply)?),
                    Err(ReplyError::Agent(AgentError::Cancelled)) => {
                        eprintln!("parley: turn cancelled");
                        break;
                    }
                    Err(e) if e.is_model_fault() => {
                        eprintln!("parley: the model produced an unusable reply: {e}");
                    }
                    Err(e) => eprintln!("parley: turn failed: {e}"),
                }
            }
        }
    }

    Ok(())
}

async fn redeem(state: &AppState, token: &str) {
    let redemption = match state.vault.validate(token) {
        Ok(redemption) => redemption,
        Err(e) => {
            eprintln!("parley: {e}");
            return;
        }
    };

    if redemption.action != LIST_SESSIONS_ACTION {
        eprintln!("parley: no handler for action '{}'", redemption.action);
        return;
    }

    match state.pipeline.sessions().list_sessions(&redemption.user_id).await {
        Ok((sessions, selected)) => match serde_json::to_string_pretty(&sessions_json(&sessions, selected)) {
            Ok(out) => println!("{out}"),
            Err(e) => eprintln!("parley: {e}"),
        },
        Err(e) => eprintln!("parley: failed to list sessions: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(parse_line("   "), Input::Blank);
        assert_eq!(parse_line("/quit"), Input::Quit);
        assert_eq!(parse_line(" /exit "), Input::Quit);
        assert_eq!(parse_line("/redeem abc-123"), Input::Redeem("abc-123"));
        assert_eq!(parse_line("/redeem"), Input::Redeem(""));
        assert_eq!(parse_line("/redeemable things"), Input::Message("/redeemable things"));
        assert_eq!(parse_line(" what's the weather? "), Input::Message("what's the weather?"));
    }
}
