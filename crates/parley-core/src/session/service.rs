//! SessionService -- every session mutation goes through here.
//!
//! Resolves the session a turn runs in, appends finished conversations
//! (refreshing the rolling summary), and backs the session management
//! operations a user can perform: list, inspect, create, switch, delete.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use parley_types::error::RepositoryError;
use parley_types::session::{Conversation, Session};
use parley_types::user::{Identity, User, UserError};

use super::repository::{SessionRepository, UserRepository};
use crate::agent::summarizer::Summarizer;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Ownership(#[from] UserError),
}

pub struct SessionService<S, U> {
    sessions: Arc<S>,
    users: Arc<U>,
    summarizer: Summarizer,
}

impl<S, U> SessionService<S, U>
where
    S: SessionRepository,
    U: UserRepository,
{
    pub fn new(sessions: Arc<S>, users: Arc<U>, summarizer: Summarizer) -> Self {
        Self {
            sessions,
            users,
            summarizer,
        }
    }

    /// Load the user or start a fresh one.
    async fn load_user(&self, user_id: &str) -> Result<User, SessionError> {
        match self.users.find(user_id).await {
            Ok(user) => Ok(user),
            Err(RepositoryError::NotFound) => Ok(User::new(user_id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Create a session, persist it, and make it the user's selection.
    async fn open_session(&self, user: &mut User) -> Result<Session, SessionError> {
        let session = Session::new(&user.id);
        self.sessions.save(&session).await?;

        user.add_session_id(session.id);
        self.users.save(user).await?;

        info!(user_id = %user.id, session_id = %session.id, "session created");
        Ok(session)
    }

    /// The user and selected session for a new turn.
    ///
    /// Creates the user and a first session on first contact, and a new
    /// session when the selected one has gone missing.
    #[tracing::instrument(name = "resolve_turn_context", skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn resolve_for_turn(&self, identity: &Identity) -> Result<(User, Session), SessionError> {
        let mut user = self.load_user(&identity.user_id).await?;
        user.profile = identity.profile.clone();
        user.verified = identity.verified;

        let session = match user.selected_session_id {
            Some(id) => match self.sessions.find(&id).await {
                Ok(session) => session,
                Err(RepositoryError::NotFound) => {
                    warn!(session_id = %id, "selected session missing, starting a new one");
                    self.open_session(&mut user).await?
                }
                Err(e) => return Err(e.into()),
            },
            None => self.open_session(&mut user).await?,
        };

        Ok((user, session))
    }

    /// Record a finished turn on `session` and persist it.
    ///
    /// The summary is refreshed first. If that fails the previous summary
    /// is kept and the conversation is still saved.
    #[tracing::instrument(
        name = "append_conversation",
        skip(self, session, conversation),
        fields(session_id = %session.id, conversation_id = %conversation.id)
    )]
    pub async fn append_conversation(
        &self,
        session: &mut Session,
        conversation: Conversation,
    ) -> Result<(), SessionError> {
        let summary = match self
            .summarizer
            .generate_summary(&session.summary, &conversation)
            .await
        {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(error = %e, "summary generation failed, keeping previous summary");
                None
            }
        };

        session.record(conversation, summary);
        self.sessions.save(session).await?;
        Ok(())
    }

    /// All sessions of a user plus the selected id.
    ///
    /// Sessions that have disappeared from the store are skipped.
    pub async fn list_sessions(
        &self,
        user_id: &str,
    ) -> Result<(Vec<Session>, Option<Uuid>), SessionError> {
        let user = self.users.find(user_id).await?;

        let mut sessions = Vec::with_capacity(user.session_ids.len());
        for id in &user.session_ids {
            match self.sessions.find(id).await {
                Ok(session) => sessions.push(session),
                Err(RepositoryError::NotFound) => {
                    warn!(session_id = %id, "listed session not found");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok((sessions, user.selected_session_id))
    }

    /// One session, if it belongs to the user.
    pub async fn session(&self, user_id: &str, session_id: &Uuid) -> Result<Session, SessionError> {
        let user = self.users.find(user_id).await?;
        if !user.owns_session(session_id) {
            return Err(UserError::UnknownSession(*session_id).into());
        }
        Ok(self.sessions.find(session_id).await?)
    }

    /// Start a new session and select it.
    pub async fn create_session(&self, user_id: &str) -> Result<Session, SessionError> {
        let mut user = self.load_user(user_id).await?;
        self.open_session(&mut user).await
    }

    /// Select another owned session.
    pub async fn switch_session(&self, user_id: &str, session_id: &Uuid) -> Result<Session, SessionError> {
        let mut user = self.users.find(user_id).await?;
        user.select_session(*session_id)?;
        let session = self.sessions.find(session_id).await?;
        self.users.save(&user).await?;

        info!(user_id, session_id = %session_id, "session switched");
        Ok(session)
    }

    /// Delete an owned session. The selected session cannot be deleted.
    pub async fn delete_session(&self, user_id: &str, session_id: &Uuid) -> Result<(), SessionError> {
        let mut user = self.users.find(user_id).await?;
        user.remove_session_id(session_id)?;

        self.sessions.delete(session_id).await?;
        self.users.save(&user).await?;

        info!(user_id, session_id = %session_id, "session deleted");
        Ok(())
    }
}
