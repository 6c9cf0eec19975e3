//! Compiled program: the immutable input to the engine.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::block::{BlockData, VariableData};
use super::command::{CommandData, CommandParams};
use super::reference::{BlockId, CommandId};
use super::value::Value;

#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("program has no blocks")]
    Empty,
    #[error("root block not found: {0}")]
    UnknownRoot(BlockId),
    #[error("duplicate block id: {0}")]
    DuplicateBlock(BlockId),
    #[error("block {block} names unknown parent {parent}")]
    UnknownParent { block: BlockId, parent: BlockId },
    #[error("block {0} is its own ancestor")]
    ParentCycle(BlockId),
    #[error("block {block} lists unknown child {child}")]
    UnknownChild { block: BlockId, child: BlockId },
    #[error("command {command} in {block} has index {found}, expected {expected}")]
    CommandIndex {
        block: BlockId,
        command: CommandId,
        expected: usize,
        found: usize,
    },
}

/// A compiled Sparkdown program: block tree plus global declarations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub root: BlockId,
    /// Blocks in declaration order. Tick order follows the tree built from
    /// this list, so the order is significant.
    pub blocks: Vec<BlockData>,
    #[serde(default)]
    pub variables: Vec<VariableData>,
}

impl Program {
    pub fn builder() -> ProgramBuilder {
        ProgramBuilder::default()
    }

    /// Load a program from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<Program, ProgramError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse and validate a program from a RON string.
    pub fn parse_ron(input: &str) -> Result<Program, ProgramError> {
        let program: Program = ron::from_str(input)?;
        program.validate()?;
        Ok(program)
    }

    /// Check structural consistency: unique ids, known root, parents and
    /// children that exist, an acyclic parent chain, and command indices
    /// matching their position.
    pub fn validate(&self) -> Result<(), ProgramError> {
        if self.blocks.is_empty() {
            return Err(ProgramError::Empty);
        }

        let mut ids = FxHashSet::default();
        for block in &self.blocks {
            if !ids.insert(&block.id) {
                return Err(ProgramError::DuplicateBlock(block.id.clone()));
            }
        }

        if !ids.contains(&self.root) {
            return Err(ProgramError::UnknownRoot(self.root.clone()));
        }

        for block in &self.blocks {
            if let Some(parent) = &block.parent {
                if !ids.contains(parent) {
                    return Err(ProgramError::UnknownParent {
                        block: block.id.clone(),
                        parent: parent.clone(),
                    });
                }
            }
            for child in &block.children {
                if !ids.contains(child) {
                    return Err(ProgramError::UnknownChild {
                        block: block.id.clone(),
                        child: child.clone(),
                    });
                }
            }
            for (expected, command) in block.commands.iter().enumerate() {
                if command.index != expected {
                    return Err(ProgramError::CommandIndex {
                        block: block.id.clone(),
                        command: command.id.clone(),
                        expected,
                        found: command.index,
                    });
                }
            }
        }

        self.check_parent_cycles()
    }

    /// Every parent chain must reach a block without a parent.
    fn check_parent_cycles(&self) -> Result<(), ProgramError> {
        let parents: FxHashMap<&BlockId, Option<&BlockId>> = self
            .blocks
            .iter()
            .map(|b| (&b.id, b.parent.as_ref()))
            .collect();
        for block in &self.blocks {
            let mut current = block.parent.as_ref();
            let mut steps = 0;
            while let Some(id) = current {
                if steps == self.blocks.len() {
                    return Err(ProgramError::ParentCycle(block.id.clone()));
                }
                steps += 1;
                current = parents.get(id).copied().flatten();
            }
        }
        Ok(())
    }

    pub fn block(&self, id: &str) -> Option<&BlockData> {
        self.blocks.iter().find(|b| b.id.as_str() == id)
    }

    /// Serialize to pretty RON.
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }
}

/// Builds programs in code, filling in ids, children, levels and command
/// indices the way the compiler would.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    blocks: Vec<BlockData>,
    variables: Vec<VariableData>,
}

impl ProgramBuilder {
    /// Add a block. The first block without a parent becomes the root.
    /// Parents must be added before their children.
    pub fn block(mut self, id: &str, parent: Option<&str>, commands: Vec<CommandParams>) -> Self {
        let block_id = BlockId::from(id);
        let name = id.rsplit('.').next().unwrap_or(id).to_string();
        let commands = commands
            .into_iter()
            .enumerate()
            .map(|(index, params)| CommandData {
                id: CommandId(format!("{}.{}", id, index)),
                parent: block_id.clone(),
                index,
                params,
                wait_until_finished: true,
                source: None,
            })
            .collect();

        let parent = parent.map(BlockId::from);
        let level = match &parent {
            Some(p) => self
                .blocks
                .iter()
                .find(|b| &b.id == p)
                .map(|b| b.level + 1)
                .unwrap_or(1),
            None => 0,
        };
        if let Some(p) = &parent {
            if let Some(parent_block) = self.blocks.iter_mut().find(|b| &b.id == p) {
                parent_block.children.push(block_id.clone());
            }
        }

        self.blocks.push(BlockData {
            id: block_id,
            parent,
            children: Vec::new(),
            level,
            name,
            commands,
            source: None,
            triggers: Vec::new(),
            variables: Vec::new(),
        });
        self
    }

    /// Declare a trigger variable on an already-added block.
    pub fn trigger(mut self, block: &str, variable: &str) -> Self {
        if let Some(b) = self.blocks.iter_mut().find(|b| b.id.as_str() == block) {
            b.triggers.push(variable.to_string());
        }
        self
    }

    /// Declare a global variable.
    pub fn variable(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.variables.push(VariableData {
            name: name.to_string(),
            value: value.into(),
        });
        self
    }

    /// Mark a command as fire-and-forget (`wait_until_finished = false`).
    pub fn no_wait(mut self, block: &str, index: usize) -> Self {
        if let Some(cmd) = self
            .blocks
            .iter_mut()
            .find(|b| b.id.as_str() == block)
            .and_then(|b| b.commands.get_mut(index))
        {
            cmd.wait_until_finished = false;
        }
        self
    }

    pub fn build(self) -> Result<Program, ProgramError> {
        let root = self
            .blocks
            .iter()
            .find(|b| b.parent.is_none())
            .map(|b| b.id.clone())
            .ok_or(ProgramError::Empty)?;
        let program = Program {
            root,
            blocks: self.blocks,
            variables: self.variables,
        };
        program.validate()?;
        Ok(program)
    }
}
