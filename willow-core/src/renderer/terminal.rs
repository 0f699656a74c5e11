use std::io::{stdin, stdout, Write};

use crate::event::{InputEvent, OutputEvent};
use crate::renderer::Renderer;

/// Plain stdin/stdout front-end. Lines appear whole (the driver skips the
/// reveal), `[emp]`/`[it]` markup becomes ANSI styling, and a bare Enter
/// advances.
pub struct TerminalRenderer;

const EMPHASIS: &str = "\x1b[1;33m";
const ITALIC: &str = "\x1b[3m";
const RESET: &str = "\x1b[0m";

fn style(text: &str) -> String {
    text.replace("[emp]", EMPHASIS)
        .replace("[/emp]", RESET)
        .replace("[it]", ITALIC)
        .replace("[/it]", RESET)
}

impl Renderer for TerminalRenderer {
    fn render(&mut self, out: &OutputEvent) -> Option<InputEvent> {
        match out {
            OutputEvent::ShowDialogue { speaker, text } => {
                match speaker {
                    Some(name) => println!("{}: {}", name, style(text)),
                    None => println!("* {}", style(text)),
                }
                self.wait_advance()
            }
            OutputEvent::ShowDecision { options } => {
                for (i, o) in options.iter().enumerate() {
                    println!("  [{}] {}", i + 1, o.trim());
                }
                self.wait_decision(options.len())
            }
            OutputEvent::MoveCamera { target } => {
                println!("[Camera] {}", target);
                None
            }
            OutputEvent::ShowPlayer => {
                println!("[Player] visible");
                None
            }
            OutputEvent::HidePlayer => {
                println!("[Player] hidden");
                None
            }
            OutputEvent::ShowCg { name } => {
                println!("[CG] {}", name);
                None
            }
            OutputEvent::HideCg => {
                println!("[CG] cleared");
                None
            }
            OutputEvent::PlayMusic { name } => {
                println!("[Music] {}", name);
                None
            }
            OutputEvent::StopMusic => {
                println!("[Music] stopped");
                None
            }
            OutputEvent::PlaySfx { name } => {
                println!("[Sfx] {}", name);
                None
            }
            OutputEvent::NodeEnded { .. } | OutputEvent::End => None,
        }
    }
}

impl TerminalRenderer {
    fn wait_advance(&mut self) -> Option<InputEvent> {
        loop {
            print!("> ");
            stdout().flush().unwrap();
            let mut buf = String::new();
            stdin().read_line(&mut buf).unwrap();
            let trimmed = buf.trim_end();
            if trimmed.is_empty() {
                return Some(InputEvent::Advance);
            }
            if trimmed.eq_ignore_ascii_case("exit") {
                return Some(InputEvent::Exit);
            }
            if let Some(rest) = trimmed.strip_prefix(":save") {
                if let Ok(slot) = rest.trim().parse::<u32>() {
                    return Some(InputEvent::SaveRequest { slot });
                }
            }
            if let Some(rest) = trimmed.strip_prefix(":load") {
                if let Ok(slot) = rest.trim().parse::<u32>() {
                    return Some(InputEvent::LoadRequest { slot });
                }
            }
            println!("invalid");
        }
    }

    fn wait_decision(&mut self, len: usize) -> Option<InputEvent> {
        loop {
            print!("Select> ");
            stdout().flush().unwrap();
            let mut buf = String::new();
            stdin().read_line(&mut buf).unwrap();
            if let Ok(n) = buf.trim().parse::<usize>() {
                if n >= 1 && n <= len {
                    return Some(InputEvent::DecisionMade { index: n - 1 });
                }
            }
            println!("invalid");
        }
    }
}
