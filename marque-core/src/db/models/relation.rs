//! Tag Relation Model

use serde::{Deserialize, Serialize};

/// Join record linking one tag to one externally-owned bookmark
///
/// `(tag_id, item_id)` is the identity; the collection never holds the same
/// pair twice. Neither side embeds a list of the other, so deletion flows
/// must clean these records up explicitly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TagRelation {
    pub tag_id: String,
    pub item_id: String,
    #[serde(default)]
    pub created_at: i64,
}

impl TagRelation {
    /// Whether this record links the given pair
    pub fn matches(&self, tag_id: &str, item_id: &str) -> bool {
        self.tag_id == tag_id && self.item_id == item_id
    }
}
