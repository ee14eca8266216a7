use serde::{Deserialize, Serialize};

/// Direction of a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeDirection {
    Like,
    Unlike,
}

impl LikeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            LikeDirection::Like => "like",
            LikeDirection::Unlike => "unlike",
        }
    }
}
