use serde::{Deserialize, Serialize};

/// The two kinds of listings published by the lost-and-found API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    /// Items handed in to a police station or storage facility.
    Found,
    /// Items reported as lost by their owners.
    Lost,
}

impl ItemCategory {
    pub const ALL: [ItemCategory; 2] = [ItemCategory::Found, ItemCategory::Lost];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCategory::Found => "found",
            ItemCategory::Lost => "lost",
        }
    }

    /// Name of the table holding this category, also used as the sync ledger key.
    pub fn table_name(&self) -> &'static str {
        match self {
            ItemCategory::Found => "get_list",
            ItemCategory::Lost => "lost_list",
        }
    }

    /// Accepts both the public name and the table name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "found" | "get_list" => Some(ItemCategory::Found),
            "lost" | "lost_list" => Some(ItemCategory::Lost),
            _ => None,
        }
    }
}

impl std::fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
