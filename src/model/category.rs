use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user-defined task category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Category {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    pub color: String,
    pub sort_order: i32,
    pub is_default: bool,
}

impl Category {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            color: color.into(),
            sort_order: 0,
            is_default: false,
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            color: "#808080".to_string(),
            sort_order: 0,
            is_default: false,
        }
    }
}
