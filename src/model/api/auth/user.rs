use std::fmt::Display;

use crate::error::AuthorizationError;
use crate::model::{eligibility::Electorate, identity::VoterIdentity};

/// A kind of signed-in user, having defined rights.
pub trait User {
    /// The rights of this user type.
    const RIGHTS: Rights;
}

/// Any signed-in user. Whether they may actually vote is decided when they try.
pub struct Voter;

/// A signed-in user on the administrator allow-list.
pub struct Admin;

impl User for Voter {
    const RIGHTS: Rights = Rights::Voter;
}

impl User for Admin {
    const RIGHTS: Rights = Rights::Admin;
}

/// Different privilege levels.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Rights {
    Voter,
    Admin,
}

impl Rights {
    /// Does `identity` hold these rights right now?
    ///
    /// Checked against the allow-lists on every request, never stored in the token.
    pub fn check(
        self,
        identity: &VoterIdentity,
        electorate: &Electorate,
    ) -> Result<(), AuthorizationError> {
        match self {
            Self::Voter => Ok(()),
            Self::Admin if electorate.is_admin(identity) => Ok(()),
            Self::Admin => Err(AuthorizationError::AdminRequired),
        }
    }
}

impl Display for Rights {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Voter => "voter",
                Self::Admin => "admin",
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_rights_follow_the_allowlist() {
        let electorate = Electorate::example();
        assert!(Rights::Admin
            .check(&VoterIdentity::admin_example(), &electorate)
            .is_ok());
        assert_eq!(
            Rights::Admin.check(&VoterIdentity::voter_example(), &electorate),
            Err(AuthorizationError::AdminRequired)
        );
        assert!(Rights::Voter
            .check(&VoterIdentity::ineligible_example(), &electorate)
            .is_ok());
    }
}
