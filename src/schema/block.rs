use serde::{Deserialize, Serialize};

use super::command::CommandData;
use super::reference::{BlockId, RefType, Reference, SourceLocation};
use super::value::Value;

/// A declared variable and its initial value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableData {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

/// A named, addressable sequence of commands: one section of the script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockData {
    pub id: BlockId,
    #[serde(default)]
    pub parent: Option<BlockId>,
    #[serde(default)]
    pub children: Vec<BlockId>,
    #[serde(default)]
    pub level: usize,
    pub name: String,
    #[serde(default)]
    pub commands: Vec<CommandData>,
    #[serde(default)]
    pub source: Option<SourceLocation>,
    /// Variables whose truthiness starts this block while it is idle.
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub variables: Vec<VariableData>,
}

impl BlockData {
    pub fn reference(&self) -> Reference {
        Reference {
            id: self.id.0.clone(),
            parent_id: self.parent.as_ref().map(|p| p.0.clone()),
            ref_type: RefType::Block,
            type_id: "Block".to_string(),
        }
    }
}
