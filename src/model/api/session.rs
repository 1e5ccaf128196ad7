use serde::{Deserialize, Serialize};

use crate::model::identity::VoterIdentity;

/// What the frontend needs to know about the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub name: String,
    pub email: String,
    pub is_admin: bool,
    pub is_eligible_voter: bool,
    pub has_voted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
}

impl SessionInfo {
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            user: None,
        }
    }

    pub fn signed_in(
        identity: VoterIdentity,
        is_admin: bool,
        is_eligible_voter: bool,
        has_voted: bool,
    ) -> Self {
        Self {
            authenticated: true,
            user: Some(SessionUser {
                name: identity.name,
                email: identity.email,
                is_admin,
                is_eligible_voter,
                has_voted,
            }),
        }
    }
}
