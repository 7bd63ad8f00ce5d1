//! `parley sessions ...` subcommands.

use serde_json::{Value, json};
use uuid::Uuid;

use parley_types::session::Session;

use super::SessionCommand;
use crate::state::AppState;

/// Listing shape shared with the `/redeem` chat command.
pub fn sessions_json(sessions: &[Session], selected: Option<Uuid>) -> Value {
    let rows: Vec<Value> = sessions
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "selected": Some(s.id) == selected,
                "created_at": s.created_at,
                "conversations": s.conversations.len(),
                "summary": s.summary,
            })
        })
        .collect();
    json!({ "selected": selected, "sessions": rows })
}

fn session_detail(session: &Session) -> Value {
    let conversations: Vec<Value> = session
        .conversations
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "created_at": c.created_at,
                "input": c.input,
                "output": c.output,
            })
        })
        .collect();
    json!({
        "id": session.id,
        "created_at": session.created_at,
        "summary": session.summary,
        "conversations": conversations,
    })
}

pub async fn run(state: &AppState, command: SessionCommand) -> anyhow::Result<()> {
    let sessions = state.pipeline.sessions();

    let output = match command {
        SessionCommand::List { user } => {
            let (list, selected) = sessions.list_sessions(&user).await?;
            sessions_json(&list, selected)
        }
        SessionCommand::Show { user, id } => session_detail(&sessions.session(&user, &id).await?),
        SessionCommand::New { user } => session_detail(&sessions.create_session(&user).await?),
        SessionCommand::Switch { user, id } => session_detail(&sessions.switch_session(&user, &id).await?),
        SessionCommand::Delete { user, id } => {
            sessions.delete_session(&user, &id).await?;
            json!({ "deleted": id })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::message::Message;
    use parley_types::session::Conversation;

    #[test]
    fn listing_marks_selected() {
        let first = Session::new("U1");
        let mut second = Session::new("U1");
        second.record(
            Conversation::new("hi", "hello", vec![Message::human("hi"), Message::ai("hello")]),
            Some("Greeted.".into()),
        );

        let out = sessions_json(&[first.clone(), second.clone()], Some(second.id));
        assert_eq!(out["selected"], json!(second.id));
        assert_eq!(out["sessions"][0]["selected"], false);
        assert_eq!(out["sessions"][1]["selected"], true);
        assert_eq!(out["sessions"][1]["conversations"], 1);
        assert_eq!(out["sessions"][1]["summary"], "Greeted.");
    }

    #[test]
    fn detail_lists_turns() {
        let mut session = Session::new("U1");
        session.record(Conversation::new("q", "a", vec![]), None);
        let out = session_detail(&session);
        assert_eq!(out["conversations"][0]["input"], "q");
        assert_eq!(out["conversations"][0]["output"], "a");
    }
}
