//! The willow engine: script lookup, traversal, text pacing, presentation
//! events, saves and the bundled terminal front-end.
//!
//! A front-end owns a [`Ctx`] and a [`Runtime`] (usually through
//! [`renderer::driver::Driver`]), feeds [`event::InputEvent`]s in and drains
//! [`event::OutputEvent`]s out. Everything visual or audible happens on the
//! front-end's side of that boundary.

pub mod config;
pub mod ctx;
pub mod event;
pub mod manager;
pub mod renderer;
pub mod runtime;
pub mod storage;
pub mod writer;

pub use ctx::Ctx;
pub use event::{InputEvent, OutputEvent};
pub use manager::ScriptManager;
pub use renderer::driver::Driver;
pub use renderer::terminal::TerminalRenderer;
pub use renderer::Renderer;
pub use runtime::{PlaybackMode, Runtime, RuntimeState};
