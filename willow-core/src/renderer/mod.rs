pub mod driver;
pub mod terminal;

use crate::event::{InputEvent, OutputEvent};

pub trait Renderer {
    fn render(&mut self, out: &OutputEvent) -> Option<InputEvent>;
}
