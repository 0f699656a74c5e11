use serde::{Deserialize, Serialize};

/// One entry in the node call stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeFrame {
    pub node: String,
    /// File stem the node was loaded from.
    pub source: String,
    /// Line to continue from when this frame becomes the top again.
    pub resume_line: usize,
}

impl NodeFrame {
    pub fn new(node: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            source: source.into(),
            resume_line: 0,
        }
    }
}

/// `GoTo` pushes, node completion pops, the story ends when it empties.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeStack {
    stack: Vec<NodeFrame>,
}

impl NodeStack {
    pub fn push(&mut self, frame: NodeFrame) {
        self.stack.push(frame);
    }

    pub fn pop(&mut self) -> Option<NodeFrame> {
        self.stack.pop()
    }

    pub fn top(&self) -> Option<&NodeFrame> {
        self.stack.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut NodeFrame> {
        self.stack.last_mut()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }

    pub fn frames(&self) -> &[NodeFrame] {
        &self.stack
    }

    pub fn from_frames(frames: Vec<NodeFrame>) -> Self {
        Self { stack: frames }
    }
}
