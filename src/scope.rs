// 🔍 Scope Selection
// Regional (every municipality) or one municipality by exact name.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name")]
pub enum ScopeSelection {
    Regional,
    Municipality(String),
}

impl ScopeSelection {
    pub fn municipality(name: impl Into<String>) -> Self {
        ScopeSelection::Municipality(name.into())
    }

    /// Row predicate: identity for regional, case-sensitive equality otherwise
    pub fn includes(&self, municipality: &str) -> bool {
        match self {
            ScopeSelection::Regional => true,
            ScopeSelection::Municipality(name) => name == municipality,
        }
    }

    pub fn is_regional(&self) -> bool {
        matches!(self, ScopeSelection::Regional)
    }

    /// Section heading for the active scope
    pub fn title(&self) -> String {
        match self {
            ScopeSelection::Regional => "Regional summary".to_string(),
            ScopeSelection::Municipality(name) => format!("Summary of {}", name),
        }
    }

    /// Scope picker options: regional first, then the sorted unique names
    pub fn options<'a, I>(municipalities: I) -> Vec<ScopeSelection>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut names: Vec<&str> = municipalities.into_iter().collect();
        names.sort_unstable();
        names.dedup();

        std::iter::once(ScopeSelection::Regional)
            .chain(names.into_iter().map(ScopeSelection::municipality))
            .collect()
    }
}

impl Default for ScopeSelection {
    fn default() -> Self {
        ScopeSelection::Regional
    }
}

impl fmt::Display for ScopeSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeSelection::Regional => write!(f, "Regional"),
            ScopeSelection::Municipality(name) => write!(f, "{}", name),
        }
    }
}
