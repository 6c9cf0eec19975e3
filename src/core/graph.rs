//! Block graph: static lookup structure over the compiled block tree.
//!
//! Built once from a [`Program`]; never mutated afterwards. Section paths
//! used by jump and choice commands are resolved here, at build time.

use rustc_hash::FxHashMap;

use crate::schema::block::BlockData;
use crate::schema::command::{CommandData, CommandParams};
use crate::schema::program::Program;
use crate::schema::reference::{BlockId, CommandId};

/// Where a section path leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JumpTarget {
    Block(BlockId),
    /// `!END` / `!QUIT`: stop the game.
    Quit,
}

#[derive(Debug, Clone)]
pub struct BlockGraph {
    root: BlockId,
    blocks: FxHashMap<BlockId, BlockData>,
    children: FxHashMap<BlockId, Vec<BlockId>>,
    /// Pre-order walk from the root (parent before child, siblings in
    /// declaration order), followed by any blocks outside the root tree.
    order: Vec<BlockId>,
    jump_targets: FxHashMap<CommandId, JumpTarget>,
    choice_targets: FxHashMap<(CommandId, usize), JumpTarget>,
}

impl BlockGraph {
    pub fn new(program: &Program) -> Self {
        let mut blocks = FxHashMap::default();
        let mut children: FxHashMap<BlockId, Vec<BlockId>> = FxHashMap::default();

        for block in &program.blocks {
            blocks.insert(block.id.clone(), block.clone());
        }

        // Declared child lists win; otherwise derive them from parent links.
        for block in &program.blocks {
            if !block.children.is_empty() {
                children.insert(block.id.clone(), block.children.clone());
            }
        }
        for block in &program.blocks {
            if let Some(parent) = &block.parent {
                let declared = program
                    .block(parent.as_str())
                    .map(|p| !p.children.is_empty())
                    .unwrap_or(false);
                if !declared {
                    children
                        .entry(parent.clone())
                        .or_default()
                        .push(block.id.clone());
                }
            }
        }

        let mut order = Vec::with_capacity(program.blocks.len());
        let mut stack = vec![program.root.clone()];
        while let Some(id) = stack.pop() {
            if order.contains(&id) {
                continue;
            }
            if let Some(kids) = children.get(&id) {
                stack.extend(kids.iter().rev().cloned());
            }
            order.push(id);
        }
        for block in &program.blocks {
            if !order.contains(&block.id) {
                order.push(block.id.clone());
            }
        }

        let mut graph = BlockGraph {
            root: program.root.clone(),
            blocks,
            children,
            order,
            jump_targets: FxHashMap::default(),
            choice_targets: FxHashMap::default(),
        };
        graph.resolve_targets(program);
        graph
    }

    fn resolve_targets(&mut self, program: &Program) {
        for block in &program.blocks {
            for command in &block.commands {
                match &command.params {
                    CommandParams::Jump(params) => {
                        match self.evaluate_block_id(&block.id, &params.value) {
                            Some(target) => {
                                self.jump_targets.insert(command.id.clone(), target);
                            }
                            None => tracing::debug!(
                                command = %command.id,
                                path = %params.value,
                                "jump target unresolved"
                            ),
                        }
                    }
                    CommandParams::Display(params) => {
                        for (i, choice) in params.choices.iter().enumerate() {
                            if let Some(target) = self.evaluate_block_id(&block.id, &choice.section) {
                                self.choice_targets.insert((command.id.clone(), i), target);
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    pub fn root(&self) -> &BlockId {
        &self.root
    }

    pub fn get(&self, id: &str) -> Option<&BlockData> {
        self.blocks.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.blocks.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Deterministic tick order.
    pub fn order(&self) -> &[BlockId] {
        &self.order
    }

    pub fn blocks(&self) -> impl Iterator<Item = &BlockData> {
        self.order.iter().filter_map(|id| self.blocks.get(id))
    }

    pub fn parent(&self, id: &str) -> Option<&BlockId> {
        self.blocks.get(id).and_then(|b| b.parent.as_ref())
    }

    pub fn children(&self, id: &str) -> &[BlockId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn commands(&self, id: &str) -> &[CommandData] {
        self.blocks
            .get(id)
            .map(|b| b.commands.as_slice())
            .unwrap_or(&[])
    }

    pub fn command(&self, id: &str, index: usize) -> Option<&CommandData> {
        self.commands(id).get(index)
    }

    /// Target of a jump command, resolved at build time.
    pub fn jump_target(&self, command: &CommandId) -> Option<&JumpTarget> {
        self.jump_targets.get(command)
    }

    /// Target of one option of a display command, resolved at build time.
    pub fn choice_target(&self, command: &CommandId, option: usize) -> Option<&JumpTarget> {
        self.choice_targets.get(&(command.clone(), option))
    }

    fn siblings(&self, id: &str) -> &[BlockId] {
        match self.parent(id) {
            Some(parent) => self.children(parent.as_str()),
            None => &[],
        }
    }

    fn sibling_offset(&self, id: &BlockId, offset: isize) -> Option<BlockId> {
        let siblings = self.siblings(id.as_str());
        let pos = siblings.iter().position(|s| s == id)? as isize + offset;
        if pos < 0 {
            return None;
        }
        siblings.get(pos as usize).cloned()
    }

    fn child_named(&self, id: &str, name: &str) -> Option<BlockId> {
        self.children(id)
            .iter()
            .find(|c| self.blocks.get(*c).map(|b| b.name == name).unwrap_or(false))
            .cloned()
    }

    /// Resolve a name as seen from `from`: its own children first, then
    /// each ancestor (and its children) out to the root. The walk is
    /// bounded so an unvalidated parent cycle cannot spin forever.
    fn lookup_name(&self, from: &BlockId, name: &str) -> Option<BlockId> {
        let mut current = Some(from.clone());
        for _ in 0..=self.blocks.len() {
            let id = current?;
            if let Some(found) = self.child_named(id.as_str(), name) {
                return Some(found);
            }
            if self.blocks.get(&id).map(|b| b.name == name).unwrap_or(false) {
                return Some(id);
            }
            current = self.parent(id.as_str()).cloned();
        }
        None
    }

    fn step(&self, current: &BlockId, segment: &str, first: bool) -> Option<BlockId> {
        match segment {
            "^" => self.parent(current.as_str()).cloned(),
            "[" => self.siblings(current.as_str()).first().cloned(),
            "]" => self.siblings(current.as_str()).last().cloned(),
            ">" => self.sibling_offset(current, 1),
            "<" => self.sibling_offset(current, -1),
            name if first => self.lookup_name(current, name),
            name => self.child_named(current.as_str(), name),
        }
    }

    /// Resolve a section path relative to block `from`.
    ///
    /// Paths are `.`-separated. The first named segment is looked up in
    /// scope (children, then ancestors); later ones name children.
    /// `^` parent, `[` first sibling, `]` last sibling, `>` next sibling,
    /// `<` previous sibling. An exact block id always matches.
    pub fn evaluate_block_id(&self, from: &BlockId, path: &str) -> Option<JumpTarget> {
        let path = path.trim();
        if path.eq_ignore_ascii_case("!END") || path.eq_ignore_ascii_case("!QUIT") {
            return Some(JumpTarget::Quit);
        }
        if path.is_empty() {
            return None;
        }
        if self.blocks.contains_key(path) {
            return Some(JumpTarget::Block(BlockId::from(path)));
        }

        let mut current = from.clone();
        for (i, segment) in path.split('.').enumerate() {
            current = self.step(&current, segment.trim(), i == 0)?;
        }
        Some(JumpTarget::Block(current))
    }
}
