use crate::models::SessionUser;

/// Session state as reported by the external authentication provider.
/// The store never derives this itself; it is handed in on every change.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    Loading,
    Authenticated(SessionUser),
    Unauthenticated,
}

impl SessionStatus {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionStatus::Authenticated(_))
    }

    pub fn user(&self) -> Option<&SessionUser> {
        match self {
            SessionStatus::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}
