use std::collections::HashSet;
use std::fmt;

use serde::{
    de::{self, SeqAccess, Visitor},
    Deserialize, Deserializer,
};

use crate::error::{AuthorizationError, Result, StateConflict};
use crate::model::{identity::VoterIdentity, ledger::VoteLedger};

/// A statically configured set of email addresses.
///
/// Entries are trimmed and compared case-insensitively. Blank entries are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allowlist(HashSet<String>);

impl Allowlist {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            emails
                .into_iter()
                .filter_map(|email| normalise(email.as_ref()))
                .collect(),
        )
    }

    pub fn contains(&self, email: &str) -> bool {
        normalise(email).map_or(false, |email| self.0.contains(&email))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn normalise(email: &str) -> Option<String> {
    let email = email.trim();
    (!email.is_empty()).then(|| email.to_lowercase())
}

/// Accepts either a list of addresses or a single comma-separated string, so
/// the list can be supplied through one environment variable.
impl<'de> Deserialize<'de> for Allowlist {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct AllowlistVisitor;

        impl<'de> Visitor<'de> for AllowlistVisitor {
            type Value = Allowlist;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a list of email addresses or a comma-separated string")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Self::Value, E> {
                Ok(Allowlist::new(value.split(',')))
            }

            fn visit_seq<A: SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut emails = Vec::new();
                while let Some(email) = seq.next_element::<String>()? {
                    emails.push(email);
                }
                Ok(Allowlist::new(emails))
            }
        }

        deserializer.deserialize_any(AllowlistVisitor)
    }
}

/// Who may administer and who may vote.
///
/// The two lists are independent: being an administrator grants no vote.
#[derive(Debug, Clone, Default)]
pub struct Electorate {
    admins: Allowlist,
    voters: Allowlist,
}

impl Electorate {
    pub fn new(admins: Allowlist, voters: Allowlist) -> Self {
        if voters.is_empty() {
            warn!("Eligible voter list is empty: nobody will be able to vote");
        }
        Self { admins, voters }
    }

    pub fn is_admin(&self, identity: &VoterIdentity) -> bool {
        self.admins.contains(&identity.email)
    }

    /// Is this identity on the voter list? An empty list admits nobody.
    pub fn is_eligible(&self, identity: &VoterIdentity) -> bool {
        self.voters.contains(&identity.email)
    }

    /// Decide whether `identity` may cast a ballot into `ledger`.
    ///
    /// Callers must hold the ledger's write lock until the ballot is appended.
    pub fn can_vote(&self, identity: Option<&VoterIdentity>, ledger: &VoteLedger) -> Result<()> {
        let identity = identity.ok_or(AuthorizationError::NotAuthenticated)?;
        if !self.is_eligible(identity) {
            warn!(
                "User {} attempted to vote but is not eligible",
                identity.email
            );
            return Err(AuthorizationError::NotEligible.into());
        }
        if ledger.has_voted(&identity.user_id) {
            return Err(StateConflict::AlreadyVoted.into());
        }
        Ok(())
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Electorate {
        pub fn example() -> Self {
            Self::new(
                Allowlist::new(["admin@example.com"]),
                Allowlist::new(["voter@example.com", "second.voter@example.com"]),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use rocket::serde::json;

    use super::*;
    use crate::error::{Error, Reason};
    use crate::model::ballot::{Ballot, Selection};

    fn reason(result: Result<()>) -> Reason {
        result.map_err(|e: Error| e.reason()).unwrap_err()
    }

    #[test]
    fn allowlist_is_trimmed_and_case_insensitive() {
        let list = Allowlist::new([" Voter@Example.com ", "", "  "]);
        assert_eq!(list.len(), 1);
        assert!(list.contains("voter@example.com"));
        assert!(list.contains("VOTER@example.COM "));
        assert!(!list.contains(""));
    }

    #[test]
    fn allowlist_deserialises_from_list_or_string() {
        let from_list: Allowlist = json::from_str(r#"["a@example.com", "b@example.com"]"#).unwrap();
        let from_string: Allowlist = json::from_str(r#""a@example.com, b@example.com,""#).unwrap();
        assert_eq!(from_list, from_string);
        assert_eq!(from_list.len(), 2);
    }

    #[test]
    fn anonymous_callers_are_not_authenticated() {
        let electorate = Electorate::example();
        let ledger = VoteLedger::default();
        assert_eq!(
            reason(electorate.can_vote(None, &ledger)),
            Reason::NotAuthenticated
        );
    }

    #[test]
    fn empty_list_admits_nobody() {
        let electorate = Electorate::new(Allowlist::default(), Allowlist::default());
        let ledger = VoteLedger::default();
        assert_eq!(
            reason(electorate.can_vote(Some(&VoterIdentity::voter_example()), &ledger)),
            Reason::NotEligible
        );
    }

    #[test]
    fn admin_status_grants_no_vote() {
        let electorate = Electorate::example();
        let admin = VoterIdentity::admin_example();
        assert!(electorate.is_admin(&admin));
        assert_eq!(
            reason(electorate.can_vote(Some(&admin), &VoteLedger::default())),
            Reason::NotEligible
        );
    }

    #[test]
    fn prior_ballot_blocks_a_second_vote() {
        let electorate = Electorate::example();
        let voter = VoterIdentity::voter_example();
        let mut ledger = VoteLedger::default();
        assert!(electorate.can_vote(Some(&voter), &ledger).is_ok());

        ledger
            .append(Ballot::new(&voter.user_id, Selection::example(), chrono::Utc::now()))
            .unwrap();
        assert_eq!(
            reason(electorate.can_vote(Some(&voter), &ledger)),
            Reason::AlreadyVoted
        );
    }
}
