// ============================
// livepoll-backend-lib/src/registry.rs
// ============================
//! Connection registry: who is the presenter and who has joined as a respondent.
use livepoll_common::{ConnectionId, RespondentInfo};

use crate::error::AppError;

/// A joined respondent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Respondent {
    pub id: ConnectionId,
    pub display_name: String,
}

impl From<&Respondent> for RespondentInfo {
    fn from(respondent: &Respondent) -> Self {
        RespondentInfo {
            id: respondent.id,
            display_name: respondent.display_name.clone(),
        }
    }
}

/// Roles bound to connections. A connection holds at most one role.
#[derive(Debug, Default)]
pub struct Registry {
    presenter: Option<ConnectionId>,
    /// Join order is the roster order
    respondents: Vec<Respondent>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presenter(&self) -> Option<ConnectionId> {
        self.presenter
    }

    pub fn is_presenter(&self, conn: ConnectionId) -> bool {
        self.presenter == Some(conn)
    }

    pub fn is_respondent(&self, conn: ConnectionId) -> bool {
        self.respondents.iter().any(|r| r.id == conn)
    }

    /// Bind `conn` as the presenter
    pub fn register_presenter(&mut self, conn: ConnectionId) -> Result<(), AppError> {
        if self.presenter.is_some() {
            return Err(AppError::PresenterAlreadyPresent);
        }
        if self.is_respondent(conn) {
            return Err(AppError::AlreadyJoined);
        }
        self.presenter = Some(conn);
        Ok(())
    }

    /// Add a respondent. `display_name` must already be validated.
    pub fn register_respondent(
        &mut self,
        conn: ConnectionId,
        display_name: String,
    ) -> Result<&Respondent, AppError> {
        if self.is_presenter(conn) || self.is_respondent(conn) {
            return Err(AppError::AlreadyJoined);
        }
        self.respondents.push(Respondent {
            id: conn,
            display_name,
        });
        Ok(&self.respondents[self.respondents.len() - 1])
    }

    /// Remove a respondent; removing an unknown id is a no-op
    pub fn remove_respondent(&mut self, conn: ConnectionId) -> Option<Respondent> {
        let index = self.respondents.iter().position(|r| r.id == conn)?;
        Some(self.respondents.remove(index))
    }

    /// Drop the presenter and every respondent
    pub fn clear(&mut self) {
        self.presenter = None;
        self.respondents.clear();
    }

    pub fn respondent_count(&self) -> usize {
        self.respondents.len()
    }

    pub fn roster(&self) -> Vec<RespondentInfo> {
        self.respondents.iter().map(RespondentInfo::from).collect()
    }
}
