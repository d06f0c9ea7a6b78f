use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Addressable fields of a resource record. Each name is also the payload key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FieldRef {
    Title,
    Identifier,
    #[serde(rename = "id_0")]
    Id0,
    EadId,
    Level,
    ResourceType,
    FindingAidTitle,
    FindingAidStatus,
    FindingAidLanguage,
    RepositoryProcessingNote,
    Publish,
    Restrictions,
    Uri,
}

impl FieldRef {
    pub const ALL: [Self; 13] = [
        Self::Title,
        Self::Identifier,
        Self::Id0,
        Self::EadId,
        Self::Level,
        Self::ResourceType,
        Self::FindingAidTitle,
        Self::FindingAidStatus,
        Self::FindingAidLanguage,
        Self::RepositoryProcessingNote,
        Self::Publish,
        Self::Restrictions,
        Self::Uri,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Identifier => "identifier",
            Self::Id0 => "id_0",
            Self::EadId => "ead_id",
            Self::Level => "level",
            Self::ResourceType => "resource_type",
            Self::FindingAidTitle => "finding_aid_title",
            Self::FindingAidStatus => "finding_aid_status",
            Self::FindingAidLanguage => "finding_aid_language",
            Self::RepositoryProcessingNote => "repository_processing_note",
            Self::Publish => "publish",
            Self::Restrictions => "restrictions",
            Self::Uri => "uri",
        }
    }
}

impl Display for FieldRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
