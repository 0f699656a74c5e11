//! The traversal state machine.
//!
//! One [`Runtime`] walks one story: it keeps the node call stack, the line
//! cursor, block bookkeeping, the command history and the variable store,
//! and turns script lines into [`OutputEvent`]s on the [`Ctx`] queue. It
//! never blocks; when it needs the player it parks in
//! [`RuntimeState::AwaitingDecision`] (or finishes a line and waits for
//! [`InputEvent::Advance`]) and the front-end feeds input back in.
//!
//! Block handling uses two kinds of record. Entering a decision or
//! conditional pushes a marker (`active_*`) that stays until the owning
//! node completes; markers stop a block from triggering twice in one node
//! visit, which matters for zero-length branches and for the cursor landing
//! back on a block start after a restore. Actually being inside a chosen
//! option or a taken branch is a separate in-progress record
//! (`made_choices` / `resolved_branches`) that carries the block's end line
//! and pops as soon as the cursor leaves the range.

pub mod commands;
pub mod node_stack;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use talescript_core::node::{Conditional, ConditionalBlock, Decision, DecisionBlock, NodeData};
use talescript_core::value::VariableStore;

use crate::config::TextConfig;
use crate::ctx::Ctx;
use crate::event::{InputEvent, OutputEvent};
use crate::manager::ScriptManager;
use crate::storage::types::TraversalSnapshot;
use crate::writer::{strip_markup, TextWriter};
use commands::{dispatch, Command, CommandEffect};
use node_stack::{NodeFrame, NodeStack};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    /// No story running (not started yet, finished, or halted on an error).
    Idle,
    /// A line is on screen, revealing or revealed.
    Presenting,
    /// A decision menu is up; only `DecisionMade` moves the story.
    AwaitingDecision,
    /// Frozen by the front-end; timers and input are held.
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    Normal,
    Auto,
    FastForward,
}

/// Block state tagged with the node that owns it, so a `GoTo` into another
/// node never trips over the caller's line ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scoped<T> {
    pub node: String,
    pub item: T,
}

/// A chosen option currently being traversed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MadeChoice {
    pub option: Decision,
    /// Where the cursor lands when the option body ends.
    pub block_end: usize,
}

/// A conditional branch currently being traversed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakenBranch {
    pub branch: Conditional,
    pub block_end: usize,
}

enum DecisionStep {
    None,
    Jumped,
    Presented,
}

pub struct Runtime {
    manager: ScriptManager,
    text_cfg: TextConfig,
    vars: VariableStore,

    node: Option<NodeData>,
    stack: NodeStack,
    current_line: usize,

    active_decisions: Vec<Scoped<DecisionBlock>>,
    made_choices: Vec<Scoped<MadeChoice>>,
    active_conditionals: Vec<Scoped<ConditionalBlock>>,
    resolved_branches: Vec<Scoped<TakenBranch>>,

    command_history: Vec<String>,
    completed_nodes: Vec<String>,
    completed_set: FxHashSet<String>,

    state: RuntimeState,
    resume_state: RuntimeState,
    mode: PlaybackMode,

    writer: Option<TextWriter>,
    line_done: bool,
    line_raw_len: usize,
    auto_timer: Option<f32>,
    ff_timer: f32,
    current_speaker: Option<String>,
}

impl Runtime {
    pub fn new(manager: ScriptManager, text_cfg: TextConfig) -> Self {
        Self {
            manager,
            text_cfg,
            vars: VariableStore::new(),
            node: None,
            stack: NodeStack::default(),
            current_line: 0,
            active_decisions: Vec::new(),
            made_choices: Vec::new(),
            active_conditionals: Vec::new(),
            resolved_branches: Vec::new(),
            command_history: Vec::new(),
            completed_nodes: Vec::new(),
            completed_set: FxHashSet::default(),
            state: RuntimeState::Idle,
            resume_state: RuntimeState::Idle,
            mode: PlaybackMode::Normal,
            writer: None,
            line_done: false,
            line_raw_len: 0,
            auto_timer: None,
            ff_timer: 0.0,
            current_speaker: None,
        }
    }

    pub fn state(&self) -> RuntimeState {
        self.state
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn current_line(&self) -> usize {
        self.current_line
    }

    pub fn node_name(&self) -> Option<&str> {
        self.node.as_ref().map(|n| n.name.as_str())
    }

    pub fn frames(&self) -> &[NodeFrame] {
        self.stack.frames()
    }

    pub fn completed_nodes(&self) -> &[String] {
        &self.completed_nodes
    }

    pub fn command_history(&self) -> &[String] {
        &self.command_history
    }

    pub fn variables(&self) -> &VariableStore {
        &self.vars
    }

    /// Host games poke story flags through here.
    pub fn variables_mut(&mut self) -> &mut VariableStore {
        &mut self.vars
    }

    /// Labels of the decision currently awaiting input.
    pub fn decision_labels(&self) -> Option<Vec<String>> {
        if self.state != RuntimeState::AwaitingDecision {
            return None;
        }
        self.active_decisions.last().map(|s| s.item.labels())
    }

    /// The revealed part of the current line.
    pub fn visible_text(&self) -> Option<String> {
        self.writer.as_ref().map(|w| w.visible_text())
    }

    pub fn line_complete(&self) -> bool {
        self.writer.as_ref().is_none_or(|w| w.is_finished())
    }

    /// Begins a fresh story. Ignored when one is already on the stack or
    /// the node was completed in an earlier session.
    pub fn start(&mut self, ctx: &mut Ctx, name: &str) {
        if !self.stack.is_empty() {
            log::warn!("start('{}') ignored, a story is already active", name);
            return;
        }
        if self.completed_set.contains(name) {
            log::warn!("start('{}') ignored, node already completed", name);
            return;
        }
        log::info!("Starting story at '{}'", name);
        match self.manager.find_node(name, &mut self.vars) {
            Ok(node) => {
                if node.is_empty() {
                    log::warn!("node '{}' has no content", name);
                }
                self.stack.push(NodeFrame::new(&node.name, &node.source));
                self.node = Some(node);
                self.current_line = 0;
                self.state = RuntimeState::Presenting;
                self.run_cycle(ctx);
            }
            Err(e) => {
                log::error!("cannot start at '{}': {}", name, e);
                self.halt(ctx);
            }
        }
    }

    pub fn feed(&mut self, ctx: &mut Ctx, ev: InputEvent) {
        match ev {
            InputEvent::Advance => self.advance(ctx),
            InputEvent::DecisionMade { index } => self.make_decision(ctx, index),
            InputEvent::SetMode { mode } => self.set_mode(ctx, mode),
            InputEvent::Pause => self.pause(),
            InputEvent::Resume => self.resume(),
            other => log::debug!("input {:?} is not handled by the runtime", other),
        }
    }

    /// Player advance: finish the reveal first, move on the second time.
    /// In auto or fast-forward, the first input just drops back to normal.
    pub fn advance(&mut self, ctx: &mut Ctx) {
        if self.state != RuntimeState::Presenting {
            log::debug!("advance ignored in {:?}", self.state);
            return;
        }
        if self.mode != PlaybackMode::Normal {
            self.set_mode(ctx, PlaybackMode::Normal);
            return;
        }
        let revealing = self.writer.as_ref().is_some_and(|w| !w.is_finished());
        if revealing {
            self.skip_reveal();
        } else {
            self.next_line(ctx);
        }
    }

    pub fn make_decision(&mut self, ctx: &mut Ctx, index: usize) {
        if self.state != RuntimeState::AwaitingDecision {
            log::debug!("decision input ignored in {:?}", self.state);
            return;
        }
        let Some(active) = self.active_decisions.last() else {
            log::error!("awaiting a decision with none active");
            self.halt(ctx);
            return;
        };
        let Some(option) = active.item.options.get(index).cloned() else {
            log::warn!("decision index {} out of range", index);
            return;
        };
        let node = active.node.clone();
        let block_end = active.item.end_line;
        log::info!("Decision: {}", option.label.trim());

        self.current_line = option.start_line;
        self.made_choices.push(Scoped {
            node,
            item: MadeChoice { option, block_end },
        });
        self.state = RuntimeState::Presenting;
        self.run_cycle(ctx);
    }

    pub fn set_mode(&mut self, ctx: &mut Ctx, mode: PlaybackMode) {
        if self.mode == mode {
            return;
        }
        log::info!("Playback mode: {:?}", mode);
        self.mode = mode;
        self.auto_timer = None;
        match mode {
            PlaybackMode::Normal => {}
            PlaybackMode::Auto => {
                // a line that is already fully shown advances right away
                if self.state == RuntimeState::Presenting && self.line_done {
                    self.next_line(ctx);
                }
            }
            PlaybackMode::FastForward => {
                self.ff_timer = self.text_cfg.fast_forward_interval;
                if self.state == RuntimeState::Presenting {
                    self.skip_reveal();
                }
            }
        }
    }

    pub fn pause(&mut self) {
        if matches!(
            self.state,
            RuntimeState::Presenting | RuntimeState::AwaitingDecision
        ) {
            self.resume_state = self.state;
            self.state = RuntimeState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == RuntimeState::Paused {
            self.state = self.resume_state;
        }
    }

    /// Drives the reveal and the auto/fast-forward timers. Anything but
    /// `Presenting` freezes time.
    pub fn tick(&mut self, ctx: &mut Ctx, dt: f32) {
        if self.state != RuntimeState::Presenting {
            return;
        }
        if let Some(writer) = self.writer.as_mut() {
            if !writer.is_finished() {
                writer.tick(dt);
                if writer.is_finished() {
                    self.on_reveal_complete();
                }
                return;
            }
        }
        match self.mode {
            PlaybackMode::Normal => {}
            PlaybackMode::Auto => {
                if let Some(timer) = self.auto_timer.as_mut() {
                    *timer -= dt;
                    if *timer <= 0.0 {
                        self.auto_timer = None;
                        self.next_line(ctx);
                    }
                }
            }
            PlaybackMode::FastForward => {
                self.ff_timer -= dt;
                if self.ff_timer <= 0.0 {
                    self.ff_timer = self.text_cfg.fast_forward_interval;
                    self.next_line(ctx);
                }
            }
        }
    }

    /// Completes the current reveal instantly.
    pub fn skip_reveal(&mut self) {
        if self.state != RuntimeState::Presenting {
            return;
        }
        if let Some(writer) = self.writer.as_mut() {
            if !writer.is_finished() {
                writer.write_all();
            }
        }
        if !self.line_done {
            self.on_reveal_complete();
        }
    }

    fn on_reveal_complete(&mut self) {
        self.line_done = true;
        if self.mode == PlaybackMode::Auto {
            self.auto_timer = Some(self.reading_time());
        }
    }

    /// How long auto mode lingers on a finished line.
    fn reading_time(&self) -> f32 {
        self.text_cfg.time_per_character
            * self.line_raw_len as f32
            * self.text_cfg.auto_forward_factor
    }

    fn next_line(&mut self, ctx: &mut Ctx) {
        self.current_line += 1;
        self.run_cycle(ctx);
    }

    /// The advance cycle: resolve block boundaries and commands until a
    /// content line is presented, a decision parks the runtime, or the
    /// stack runs dry.
    fn run_cycle(&mut self, ctx: &mut Ctx) {
        loop {
            let line_count = match self.node.as_ref() {
                Some(node) => node.lines.len(),
                None => {
                    self.state = RuntimeState::Idle;
                    return;
                }
            };

            if self.current_line >= line_count {
                if self.finish_node(ctx) {
                    continue;
                }
                return;
            }

            if self.process_conditionals() {
                continue;
            }

            match self.process_decisions(ctx) {
                DecisionStep::Presented => return,
                DecisionStep::Jumped => continue,
                DecisionStep::None => {}
            }

            let line = match self.node.as_ref() {
                Some(node) => node.lines[self.current_line].clone(),
                None => return,
            };

            if let Some(cmd) = Command::parse(&line) {
                // the cursor moves past the command before it runs, so a
                // GoTo return resumes after it, and replay order matches
                self.command_history.push(line);
                self.current_line += 1;
                match dispatch(ctx, &cmd, false) {
                    CommandEffect::Continue => continue,
                    CommandEffect::EnterNode(target) => {
                        if self.switch_node(ctx, &target) {
                            continue;
                        }
                        return;
                    }
                }
            }

            let (speaker, text) = split_line(&line);
            let resolved = self.resolve_text(&text);
            if resolved.trim().is_empty() {
                self.current_line += 1;
                continue;
            }
            self.present_line(ctx, speaker, resolved);
            return;
        }
    }

    /// Branch bookkeeping at the cursor. Returns true when the cursor moved
    /// or a record was pushed, so the caller re-runs all checks.
    fn process_conditionals(&mut self) -> bool {
        let Some(node_name) = self.node.as_ref().map(|n| n.name.clone()) else {
            return false;
        };

        // leaving the innermost taken branch
        if let Some(taken) = self.resolved_branches.last() {
            if taken.node == node_name && self.current_line >= taken.item.branch.end_line {
                self.current_line = taken.item.block_end;
                self.resolved_branches.pop();
                return true;
            }
        }

        let entering = self
            .node
            .as_ref()
            .and_then(|n| n.conditional_at(self.current_line))
            .cloned();
        let Some(block) = entering else {
            return false;
        };
        if self
            .active_conditionals
            .iter()
            .any(|s| s.node == node_name && s.item.start_line == block.start_line)
        {
            return false;
        }

        let resolved = block.resolve(&self.vars).cloned();
        let block_end = block.end_line;
        self.active_conditionals.push(Scoped {
            node: node_name.clone(),
            item: block,
        });
        match resolved {
            Some(branch) => {
                log::debug!("conditional took branch at line {}", branch.start_line);
                self.current_line = branch.start_line;
                self.resolved_branches.push(Scoped {
                    node: node_name,
                    item: TakenBranch {
                        branch,
                        block_end,
                    },
                });
            }
            None => {
                log::debug!("no branch true, skipping to line {}", block_end);
                self.current_line = block_end;
            }
        }
        true
    }

    fn process_decisions(&mut self, ctx: &mut Ctx) -> DecisionStep {
        let Some(node_name) = self.node.as_ref().map(|n| n.name.clone()) else {
            return DecisionStep::None;
        };

        // leaving the innermost chosen option
        if let Some(choice) = self.made_choices.last() {
            if choice.node == node_name && self.current_line >= choice.item.option.end_line {
                self.current_line = choice.item.block_end;
                self.made_choices.pop();
                return DecisionStep::Jumped;
            }
        }

        let entering = self
            .node
            .as_ref()
            .and_then(|n| n.decision_at(self.current_line))
            .cloned();
        let Some(block) = entering else {
            return DecisionStep::None;
        };
        if self
            .active_decisions
            .iter()
            .any(|s| s.node == node_name && s.item.start_line == block.start_line)
        {
            return DecisionStep::None;
        }

        let options = block.labels();
        log::debug!(
            "decision at line {} with {} option(s)",
            block.start_line,
            options.len()
        );
        self.active_decisions.push(Scoped {
            node: node_name,
            item: block,
        });
        self.writer = None;
        self.state = RuntimeState::AwaitingDecision;
        ctx.push(OutputEvent::ShowDecision { options });
        DecisionStep::Presented
    }

    /// Pops the finished node, clears its block state, and resumes the
    /// caller. Returns false when the story is over (or resuming failed).
    fn finish_node(&mut self, ctx: &mut Ctx) -> bool {
        let Some(frame) = self.stack.pop() else {
            self.state = RuntimeState::Idle;
            ctx.push(OutputEvent::End);
            return false;
        };
        let name = frame.node;

        if !self.completed_set.contains(&name) {
            self.completed_set.insert(name.clone());
            self.completed_nodes.push(name.clone());
        }
        self.active_decisions.retain(|s| s.node != name);
        self.made_choices.retain(|s| s.node != name);
        self.active_conditionals.retain(|s| s.node != name);
        self.resolved_branches.retain(|s| s.node != name);

        log::info!("Node '{}' completed", name);
        ctx.push(OutputEvent::NodeEnded { node: name });

        if let Some(top) = self.stack.top() {
            let parent = top.node.clone();
            let resume = top.resume_line;
            match self.manager.find_node(&parent, &mut self.vars) {
                Ok(node) => {
                    self.node = Some(node);
                    self.current_line = resume;
                    true
                }
                Err(e) => {
                    log::error!("failed to resume '{}': {}", parent, e);
                    self.halt(ctx);
                    false
                }
            }
        } else {
            self.node = None;
            self.writer = None;
            self.state = RuntimeState::Idle;
            log::info!("Story finished");
            ctx.push(OutputEvent::End);
            false
        }
    }

    /// `GoTo` target entry. Completed targets are skipped and traversal
    /// carries on in the current node.
    fn switch_node(&mut self, ctx: &mut Ctx, target: &str) -> bool {
        if self.completed_set.contains(target) {
            log::debug!("GoTo '{}' skipped, node already completed", target);
            return true;
        }
        if let Some(top) = self.stack.top_mut() {
            top.resume_line = self.current_line;
        }
        match self.manager.find_node(target, &mut self.vars) {
            Ok(node) => {
                if node.is_empty() {
                    log::warn!("node '{}' has no content", target);
                }
                log::info!("Entering node '{}'", target);
                self.stack.push(NodeFrame::new(&node.name, &node.source));
                self.node = Some(node);
                self.current_line = 0;
                true
            }
            Err(e) => {
                log::error!("GoTo '{}' failed: {}", target, e);
                self.halt(ctx);
                false
            }
        }
    }

    fn present_line(&mut self, ctx: &mut Ctx, speaker: Option<String>, text: String) {
        if let Some(name) = &speaker {
            // the camera follows whoever speaks, except the player
            if name != "Player" && self.current_speaker.as_deref() != Some(name.as_str()) {
                ctx.push(OutputEvent::MoveCamera {
                    target: name.clone(),
                });
            }
            self.current_speaker = Some(name.clone());
        }

        self.line_raw_len = strip_markup(&text).chars().count();
        ctx.record_line(speaker.clone(), text.clone());
        self.writer = Some(TextWriter::new(&text, self.text_cfg.text_speed));
        self.line_done = false;
        self.state = RuntimeState::Presenting;
        ctx.push(OutputEvent::ShowDialogue { speaker, text });

        if self.mode == PlaybackMode::FastForward {
            self.skip_reveal();
        }
    }

    /// `{name}` interpolation. Unknown names stay as written.
    fn resolve_text(&self, text: &str) -> String {
        let pattern = regex::Regex::new(r"\{(\w+)\}").unwrap();
        pattern
            .replace_all(text, |caps: &regex::Captures| {
                match self.vars.raw(&caps[1]) {
                    Some(value) => value.to_string(),
                    None => {
                        log::debug!("no variable for {}", &caps[0]);
                        caps[0].to_string()
                    }
                }
            })
            .into_owned()
    }

    fn halt(&mut self, ctx: &mut Ctx) {
        self.state = RuntimeState::Idle;
        self.writer = None;
        self.auto_timer = None;
        ctx.push(OutputEvent::End);
    }

    /// Complete story position, ready for the save system. The transcript
    /// rides along so a loaded game can show its history.
    pub fn snapshot(&self, ctx: &Ctx) -> TraversalSnapshot {
        let mut node_stack = self.stack.frames().to_vec();
        if let Some(top) = node_stack.last_mut() {
            top.resume_line = self.current_line;
        }
        TraversalSnapshot {
            node_stack,
            current_line: self.current_line,
            awaiting_decision: self.state == RuntimeState::AwaitingDecision,
            active_decisions: self.active_decisions.clone(),
            made_choices: self.made_choices.clone(),
            active_conditionals: self.active_conditionals.clone(),
            resolved_branches: self.resolved_branches.clone(),
            command_history: self.command_history.clone(),
            completed_nodes: self.completed_nodes.clone(),
            variables: self.vars.snapshot(),
            transcript: ctx.transcript.clone(),
        }
    }

    /// Rebuilds a running story from a snapshot. Presentation state is not
    /// deserialized: replaying the command history re-emits every CG, music
    /// and visibility effect in order, and the current line (or pending
    /// decision) is presented again.
    pub fn restore(
        &mut self,
        ctx: &mut Ctx,
        snap: TraversalSnapshot,
    ) -> Result<(), crate::manager::LoadError> {
        let top = match snap.node_stack.last() {
            Some(frame) => frame.clone(),
            None => {
                // a save taken after the story ended: no node to load, but
                // completion state and variables still matter for what the
                // player can start next
                ctx.reset_presentation();
                ctx.transcript = snap.transcript;
                self.node = None;
                self.stack.clear();
                self.vars = VariableStore::new();
                self.vars.load_all(snap.variables);
                self.active_decisions = snap.active_decisions;
                self.made_choices = snap.made_choices;
                self.active_conditionals = snap.active_conditionals;
                self.resolved_branches = snap.resolved_branches;
                self.command_history = snap.command_history;
                self.completed_nodes = snap.completed_nodes;
                self.completed_set = self.completed_nodes.iter().cloned().collect();
                self.writer = None;
                self.line_done = false;
                self.current_speaker = None;
                self.mode = PlaybackMode::Normal;
                self.auto_timer = None;
                self.ff_timer = 0.0;
                self.state = RuntimeState::Idle;
                log::info!("Restored a finished story");
                return Ok(());
            }
        };

        // load the node before tearing anything down, so a missing script
        // leaves the running story intact
        let mut vars = VariableStore::new();
        let node = self.manager.find_node(&top.node, &mut vars)?;
        vars.load_all(snap.variables);

        ctx.reset_presentation();
        ctx.transcript = snap.transcript;

        self.vars = vars;
        self.node = Some(node);
        self.stack = NodeStack::from_frames(snap.node_stack);
        self.active_decisions = snap.active_decisions;
        self.made_choices = snap.made_choices;
        self.active_conditionals = snap.active_conditionals;
        self.resolved_branches = snap.resolved_branches;
        self.completed_nodes = snap.completed_nodes;
        self.completed_set = self.completed_nodes.iter().cloned().collect();

        // 重放命令历史，恢复演出状态；GoTo 在重放中不生效
        for raw in &snap.command_history {
            if let Some(cmd) = Command::parse(raw) {
                dispatch(ctx, &cmd, true);
            }
        }
        self.command_history = snap.command_history;

        self.current_line = snap.current_line;
        self.mode = PlaybackMode::Normal;
        self.auto_timer = None;
        self.ff_timer = 0.0;
        self.writer = None;
        self.line_done = false;
        self.current_speaker = None;

        if snap.awaiting_decision {
            if let Some(active) = self.active_decisions.last() {
                let options = active.item.labels();
                self.state = RuntimeState::AwaitingDecision;
                ctx.push(OutputEvent::ShowDecision { options });
            } else {
                log::error!("snapshot says a decision was pending but none is active");
                self.state = RuntimeState::Presenting;
                self.run_cycle(ctx);
            }
        } else {
            // the saved line re-presents itself, so drop its transcript
            // entry instead of recording it twice
            ctx.transcript.pop();
            self.state = RuntimeState::Presenting;
            self.run_cycle(ctx);
        }
        log::info!("Restored story at '{}' line {}", top.node, snap.current_line);
        Ok(())
    }
}

/// Splits `Speaker|text` on the first pipe; no pipe means narration.
fn split_line(line: &str) -> (Option<String>, String) {
    match line.split_once('|') {
        Some((speaker, text)) => (Some(speaker.trim().to_string()), text.trim().to_string()),
        None => (None, line.to_string()),
    }
}
