//! Collection model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// One of the fixed record collections kept in the local store.
///
/// Each collection owns one local table and maps to exactly one remote table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Personnel
    Funcionarios,
    /// Inventory
    Estoque,
    /// Suppliers
    Fornecedores,
    /// Equipment expiry deadlines
    Prazos,
    /// Equipment hand-outs
    Lancamentos,
}

impl Collection {
    /// Every collection, in the order a sync cycle pulls them.
    pub const ALL: [Self; 5] = [
        Self::Funcionarios,
        Self::Estoque,
        Self::Fornecedores,
        Self::Prazos,
        Self::Lancamentos,
    ];

    /// Stable collection name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Funcionarios => "funcionarios",
            Self::Estoque => "estoque",
            Self::Fornecedores => "fornecedores",
            Self::Prazos => "prazos",
            Self::Lancamentos => "lancamentos",
        }
    }

    /// Name of the local `SQLite` table holding this collection.
    #[must_use]
    pub const fn local_table(self) -> &'static str {
        self.as_str()
    }

    /// Name of the table on the authoritative backend.
    #[must_use]
    pub const fn remote_table(self) -> &'static str {
        match self {
            Self::Funcionarios => "funcionarios",
            Self::Estoque => "estoque",
            Self::Fornecedores => "fornecedores",
            Self::Prazos => "prazos",
            Self::Lancamentos => "lancamentos",
        }
    }

    /// Key under which the pull cursor is stored in the `meta` table.
    #[must_use]
    pub fn cursor_key(self) -> String {
        format!("last_sync_{}", self.as_str())
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|collection| collection.as_str() == normalized)
            .ok_or_else(|| Error::InvalidInput(format!("unknown collection: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for collection in Collection::ALL {
            let parsed: Collection = collection.as_str().parse().unwrap();
            assert_eq!(parsed, collection);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(
            " Estoque ".parse::<Collection>().unwrap(),
            Collection::Estoque
        );
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!("sync_queue".parse::<Collection>().is_err());
    }

    #[test]
    fn test_cursor_key() {
        assert_eq!(Collection::Prazos.cursor_key(), "last_sync_prazos");
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&Collection::Lancamentos).unwrap();
        assert_eq!(json, "\"lancamentos\"");
    }
}
