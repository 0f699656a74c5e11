use crate::ctx::Ctx;
use crate::event::{InputEvent, OutputEvent};
use crate::renderer::Renderer;
use crate::runtime::Runtime;
use crate::storage::{self, types::SaveKind};

/// Couples a runtime to a blocking renderer and owns the save/load plumbing,
/// so front-ends never touch the storage layer themselves.
pub struct Driver<R: Renderer> {
    runtime: Runtime,
    renderer: R,
}

impl<R: Renderer> Driver<R> {
    pub fn new(runtime: Runtime, renderer: R) -> Self {
        Self { runtime, renderer }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut Runtime {
        &mut self.runtime
    }

    /// Runs a story to completion (or player exit).
    pub fn run(&mut self, ctx: &mut Ctx, start: &str) {
        self.runtime.start(ctx, start);
        self.pump(ctx);
    }

    fn pump(&mut self, ctx: &mut Ctx) {
        loop {
            let Some(out) = ctx.pop() else {
                // nothing queued and nothing pending: the story is over
                return;
            };
            if let OutputEvent::ShowDialogue { .. } = out {
                // a blocking renderer prints the whole line at once
                self.runtime.skip_reveal();
            }
            if let OutputEvent::NodeEnded { node } = &out {
                log::debug!("auto save at end of '{}'", node);
                let snap = self.runtime.snapshot(ctx);
                if let Err(e) = storage::write_auto(&snap) {
                    log::error!("auto save failed: {}", e);
                }
            }
            let Some(input) = self.renderer.render(&out) else {
                continue;
            };
            if !self.feed(ctx, input) {
                return;
            }
        }
    }

    /// Routes one input event. Save and load are handled here; everything
    /// else goes to the runtime. Returns false when the player exits.
    pub fn feed(&mut self, ctx: &mut Ctx, ev: InputEvent) -> bool {
        match ev {
            InputEvent::Exit => {
                log::info!("Exit requested");
                false
            }
            InputEvent::SaveRequest { slot } => {
                let snap = self.runtime.snapshot(ctx);
                if let Err(e) = storage::save(SaveKind::Manual, slot, &snap) {
                    log::error!("save failed: {}", e);
                }
                // the saved position re-presents itself on load, so the
                // running story just moves on
                self.runtime.feed(ctx, InputEvent::Advance);
                true
            }
            InputEvent::LoadRequest { slot } => {
                match storage::load(SaveKind::Manual, slot) {
                    Ok(save) => {
                        if let Err(e) = self.runtime.restore(ctx, save.snapshot) {
                            log::error!("load failed: {}", e);
                            self.represent_current(ctx);
                        }
                    }
                    Err(e) => {
                        log::error!("load failed: {}", e);
                        self.represent_current(ctx);
                    }
                }
                true
            }
            other => {
                self.runtime.feed(ctx, other);
                true
            }
        }
    }

    /// Puts the line already on screen back on the queue after a failed
    /// load, so the pump has something to prompt on.
    fn represent_current(&self, ctx: &mut Ctx) {
        if let Some(line) = ctx.latest_line().cloned() {
            ctx.push(OutputEvent::ShowDialogue {
                speaker: line.speaker,
                text: line.text,
            });
        }
    }
}
