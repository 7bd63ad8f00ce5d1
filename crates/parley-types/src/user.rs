//! User aggregate and per-turn identity.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Account details from the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

/// Who is speaking in the current turn, as resolved by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Platform user id.
    pub user_id: String,
    pub profile: Option<UserProfile>,
    pub verified: bool,
}

impl Identity {
    pub fn anonymous(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            profile: None,
            verified: false,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UserError {
    #[error("session {0} does not belong to this user")]
    UnknownSession(Uuid),

    #[error("session {0} is currently selected")]
    SessionSelected(Uuid),
}

/// Owner of sessions; holds which one is currently selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub session_ids: Vec<Uuid>,
    #[serde(default)]
    pub selected_session_id: Option<Uuid>,
    #[serde(default)]
    pub verified: bool,
    /// Filled from the identity context each turn, never persisted.
    #[serde(skip)]
    pub profile: Option<UserProfile>,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            session_ids: Vec::new(),
            selected_session_id: None,
            verified: false,
            profile: None,
        }
    }

    pub fn owns_session(&self, session_id: &Uuid) -> bool {
        self.session_ids.contains(session_id)
    }

    /// Register a new session and make it the selected one.
    pub fn add_session_id(&mut self, session_id: Uuid) {
        if !self.owns_session(&session_id) {
            self.session_ids.push(session_id);
        }
        self.selected_session_id = Some(session_id);
    }

    /// Select an owned session.
    pub fn select_session(&mut self, session_id: Uuid) -> Result<(), UserError> {
        if !self.owns_session(&session_id) {
            return Err(UserError::UnknownSession(session_id));
        }
        self.selected_session_id = Some(session_id);
        Ok(())
    }

    /// Forget a session. The selected session cannot be removed.
    pub fn remove_session_id(&mut self, session_id: &Uuid) -> Result<(), UserError> {
        if self.selected_session_id.as_ref() == Some(session_id) {
            return Err(UserError::SessionSelected(*session_id));
        }

        let position = self
            .session_ids
            .iter()
            .position(|id| id == session_id)
            .ok_or(UserError::UnknownSession(*session_id))?;
        self.session_ids.remove(position);
        Ok(())
    }

    /// Username for links, falling back to the platform id.
    pub fn username(&self) -> &str {
        match &self.profile {
            Some(profile) if !profile.username.is_empty() => &profile.username,
            _ => &self.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_session_selects_it() {
        let mut user = User::new("U1");
        let first = Uuid::now_v7();
        let second = Uuid::now_v7();

        user.add_session_id(first);
        user.add_session_id(second);

        assert_eq!(user.session_ids, vec![first, second]);
        assert_eq!(user.selected_session_id, Some(second));
    }

    #[test]
    fn cannot_remove_selected_or_unknown() {
        let mut user = User::new("U1");
        let first = Uuid::now_v7();
        let second = Uuid::now_v7();
        user.add_session_id(first);
        user.add_session_id(second);

        assert_eq!(
            user.remove_session_id(&second),
            Err(UserError::SessionSelected(second))
        );
        let stranger = Uuid::now_v7();
        assert_eq!(
            user.remove_session_id(&stranger),
            Err(UserError::UnknownSession(stranger))
        );

        user.remove_session_id(&first).unwrap();
        assert_eq!(user.session_ids, vec![second]);
    }

    #[test]
    fn profile_is_not_persisted() {
        let mut user = User::new("U1");
        user.profile = Some(UserProfile {
            id: "p".into(),
            username: "alice".into(),
            ..Default::default()
        });

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("alice"));

        let back: User = serde_json::from_str(&json).unwrap();
        assert!(back.profile.is_none());
    }

    #[test]
    fn username_falls_back_to_id() {
        let mut user = User::new("U1");
        assert_eq!(user.username(), "U1");

        user.profile = Some(UserProfile {
            username: "alice".into(),
            ..Default::default()
        });
        assert_eq!(user.username(), "alice");
    }
}
