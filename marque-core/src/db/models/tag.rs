//! Tag Model

use serde::{Deserialize, Deserializer, Serialize};

/// Tag record as persisted in the `tags` collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    /// Single path segment; unique among siblings (case-insensitive)
    pub name: String,
    /// `None` = root-level tag. Weak reference: consumers walking the
    /// hierarchy handle an unresolved parent, it is never repaired here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Sibling ordering; not required to be contiguous
    #[serde(default)]
    pub order: i32,
    /// Display color as `#RRGGBB`; irrelevant to hierarchy logic
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

fn default_color() -> String {
    "#A3B18A".to_string()
}

/// Fields for tag creation; omitted ones take generated defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagCreate {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub order: Option<i32>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Partial tag update; an omitted field keeps its stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Double-optional: omitted keeps the parent, `Some(None)` (JSON `null`)
    /// moves the tag to root
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Maps a present JSON `null` to `Some(None)` instead of `None`
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}
