//! Block identifiers and the things a block can rest on

use serde::{Deserialize, Serialize};
use std::fmt;

/// Input token naming the ground support
pub const TABLE_TOKEN: &str = "Table";

/// A named block in the world
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Block(String);

impl Block {
    /// Create a block from its name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The block's name
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Block {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// What a block rests on: the table, or another block
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Support {
    Table,
    Block(Block),
}

impl Support {
    /// Parse an input token, mapping `Table` to the ground support
    pub fn from_token(token: &str) -> Self {
        if token == TABLE_TOKEN {
            Support::Table
        } else {
            Support::Block(Block::new(token))
        }
    }

    /// The supporting block, if this is not the table
    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Support::Table => None,
            Support::Block(block) => Some(block),
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self, Support::Table)
    }
}

impl From<Block> for Support {
    fn from(block: Block) -> Self {
        Support::Block(block)
    }
}

impl fmt::Display for Support {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Support::Table => f.write_str(TABLE_TOKEN),
            Support::Block(block) => block.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_token_maps_to_table_variant() {
        assert_eq!(Support::from_token("Table"), Support::Table);
        assert_eq!(Support::from_token("A"), Support::Block(Block::new("A")));
        // case matters: only the exact token names the table
        assert_eq!(Support::from_token("table"), Support::Block(Block::new("table")));
    }

    #[test]
    fn test_support_display() {
        assert_eq!(Support::Table.to_string(), "Table");
        assert_eq!(Support::from(Block::new("B")).to_string(), "B");
        assert!(Support::Table.as_block().is_none());
        assert!(Support::Table.is_table());
    }
}
