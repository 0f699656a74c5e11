use serde::{Deserialize, Serialize};

use talescript_core::node::{ConditionalBlock, DecisionBlock};
use talescript_core::value::Value;

use crate::ctx::Transcript;
use crate::runtime::node_stack::NodeFrame;
use crate::runtime::{MadeChoice, Scoped, TakenBranch};

/// Everything needed to rebuild a running story.
///
/// Presentation state (CG, music, player visibility) is deliberately absent:
/// the command history is replayed on load and recreates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraversalSnapshot {
    pub node_stack: Vec<NodeFrame>,
    pub current_line: usize,
    /// True when the save was taken with a decision menu up.
    pub awaiting_decision: bool,
    pub active_decisions: Vec<Scoped<DecisionBlock>>,
    pub made_choices: Vec<Scoped<MadeChoice>>,
    pub active_conditionals: Vec<Scoped<ConditionalBlock>>,
    pub resolved_branches: Vec<Scoped<TakenBranch>>,
    pub command_history: Vec<String>,
    pub completed_nodes: Vec<String>,
    pub variables: Vec<(String, Value)>,
    pub transcript: Vec<Transcript>,
}

/// One save slot on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveFile {
    /// Seconds since the Unix epoch, for slot listings.
    pub timestamp: u64,
    pub snapshot: TraversalSnapshot,
}

/// Cross-save state, kept as readable JSON next to the slots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistentData {
    /// Next auto-save slot in the rotation.
    #[serde(default)]
    pub next_auto_slot: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveKind {
    Auto,
    Quick,
    Manual,
}

impl SaveKind {
    pub fn file_name(&self, slot: u32) -> String {
        match self {
            SaveKind::Auto => format!("auto_save_{:02}.save", slot),
            SaveKind::Quick => format!("quick_save_{:02}.save", slot),
            SaveKind::Manual => format!("save_{:02}.save", slot),
        }
    }
}
