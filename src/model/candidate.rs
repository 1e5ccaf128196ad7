use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Registry-assigned candidate identifier.
pub type CandidateId = u32;

pub const DEFAULT_PHOTO: &str = "/images/default.jpg";

/// Publicly visible candidate attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub name: String,
    pub position: String,
    pub photo: String,
    pub bio: String,
    pub activity: u32,
}

/// Attributes visible only to administrators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateDetails {
    pub email: String,
    pub phone: String,
    pub place_of_birth: String,
    pub residence: String,
    pub field_of_expertise: String,
}

/// A candidate as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: CandidateId,
    #[serde(flatten)]
    pub profile: CandidateProfile,
    #[serde(flatten)]
    pub private: PrivateDetails,
}

impl Candidate {
    pub fn new(id: CandidateId, candidate: NewCandidate) -> Self {
        Self {
            id,
            profile: candidate.profile,
            private: candidate.private,
        }
    }

    /// The candidate with its private attributes stripped.
    pub fn public(&self) -> PublicCandidate {
        PublicCandidate {
            id: self.id,
            profile: self.profile.clone(),
        }
    }

    pub fn full(&self) -> FullCandidate {
        FullCandidate {
            id: self.id,
            profile: self.profile.clone(),
            private: self.private.clone(),
        }
    }
}

/// API view of a candidate without private attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicCandidate {
    pub id: CandidateId,
    #[serde(flatten)]
    pub profile: CandidateProfile,
}

/// API view of a candidate for administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullCandidate {
    pub id: CandidateId,
    #[serde(flatten)]
    pub profile: CandidateProfile,
    #[serde(flatten)]
    pub private: PrivateDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CandidateView {
    Public(PublicCandidate),
    Full(FullCandidate),
}

/// Candidate fields as submitted by an administrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateSpec {
    pub name: String,
    pub bio: String,
    pub position: String,
    pub photo: Option<String>,
    pub activity: u32,
    pub email: String,
    pub phone: String,
    pub place_of_birth: String,
    pub residence: String,
    pub field_of_expertise: String,
}

/// A validated candidate awaiting an ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCandidate {
    pub profile: CandidateProfile,
    pub private: PrivateDetails,
}

impl TryFrom<CandidateSpec> for NewCandidate {
    type Error = ValidationError;

    fn try_from(spec: CandidateSpec) -> Result<Self, Self::Error> {
        let name = spec.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::MissingName);
        }
        let bio = spec.bio.trim().to_string();
        if bio.is_empty() {
            return Err(ValidationError::MissingBio);
        }
        let photo = spec
            .photo
            .map(|photo| photo.trim().to_string())
            .filter(|photo| !photo.is_empty())
            .unwrap_or_else(|| DEFAULT_PHOTO.to_string());

        Ok(Self {
            profile: CandidateProfile {
                name,
                position: spec.position.trim().to_string(),
                photo,
                bio,
                activity: spec.activity,
            },
            private: PrivateDetails {
                email: spec.email.trim().to_string(),
                phone: spec.phone.trim().to_string(),
                place_of_birth: spec.place_of_birth.trim().to_string(),
                residence: spec.residence.trim().to_string(),
                field_of_expertise: spec.field_of_expertise.trim().to_string(),
            },
        })
    }
}

/// The roster of candidates, kept in ascending ID order.
#[derive(Debug, Default)]
pub struct CandidateRegistry {
    candidates: Vec<Candidate>,
}

impl CandidateRegistry {
    pub fn new(mut candidates: Vec<Candidate>) -> Self {
        candidates.sort_by_key(|candidate| candidate.id);
        Self { candidates }
    }

    /// List every candidate. Private attributes are omitted unless requested.
    pub fn list(&self, include_private: bool) -> Vec<CandidateView> {
        self.candidates
            .iter()
            .map(|candidate| {
                if include_private {
                    CandidateView::Full(candidate.full())
                } else {
                    CandidateView::Public(candidate.public())
                }
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }

    pub fn get(&self, id: CandidateId) -> Option<&Candidate> {
        self.candidates.iter().find(|candidate| candidate.id == id)
    }

    pub fn contains(&self, id: CandidateId) -> bool {
        self.get(id).is_some()
    }

    pub fn insert(&mut self, candidate: Candidate) {
        let position = self
            .candidates
            .partition_point(|existing| existing.id < candidate.id);
        self.candidates.insert(position, candidate);
    }

    pub fn remove(&mut self, id: CandidateId) -> Option<Candidate> {
        let position = self
            .candidates
            .iter()
            .position(|candidate| candidate.id == id)?;
        Some(self.candidates.remove(position))
    }
}
