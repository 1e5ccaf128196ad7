use serde::{Deserialize, Serialize};

/// A verified identity as supplied by the identity provider.
///
/// This system never mints or destroys identities. `user_id` is the provider's
/// opaque subject identifier and is the key of the vote ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterIdentity {
    pub user_id: String,
    pub email: String,
    pub name: String,
}

impl VoterIdentity {
    pub fn new(
        user_id: impl Into<String>,
        email: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            name: name.into(),
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl VoterIdentity {
        pub fn admin_example() -> Self {
            Self::new("google-admin-1", "admin@example.com", "Amira Haddad")
        }

        pub fn voter_example() -> Self {
            Self::new("google-voter-1", "voter@example.com", "Karim Nasser")
        }

        pub fn voter_example2() -> Self {
            Self::new("google-voter-2", "Second.Voter@Example.com", "Lina Saleh")
        }

        pub fn ineligible_example() -> Self {
            Self::new("google-outsider-1", "outsider@example.org", "Omar Khalil")
        }
    }
}
