use serde::{Deserialize, Serialize};

/// Read-only snapshot of a user, embedded at mutation time (author, liker,
/// tagged user). Never a live link to the profile aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Avatar image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl UserRef {
    pub fn new(id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_name: user_name.into(),
            full_name: None,
            avatar: None,
        }
    }

    /// Reference carrying only an identity (unpopulated like entries).
    pub fn id_only(id: impl Into<String>) -> Self {
        Self::new(id, String::new())
    }
}
