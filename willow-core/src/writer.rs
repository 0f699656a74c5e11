//! Timed character reveal for dialogue lines.

use regex::Regex;

/// Removes `[..]` markup tags, leaving the text a reader actually sees.
/// Reading-time estimates and the transcript use this form.
pub fn strip_markup(text: &str) -> String {
    let tag = Regex::new(r"\[.*?\]").unwrap();
    tag.replace_all(text, "").into_owned()
}

/// Reveals one line character by character. Markup tags cost no reveal time
/// and never appear half-open: the whole `[..]` run becomes visible with the
/// character it precedes.
#[derive(Debug, Clone)]
pub struct TextWriter {
    chars: Vec<char>,
    index: usize,
    timer: f32,
    time_per_char: f32,
    finished: bool,
}

impl TextWriter {
    /// `chars_per_second` at or below zero disables pacing entirely.
    pub fn new(text: &str, chars_per_second: f32) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let finished = chars.is_empty();
        let time_per_char = if chars_per_second > 0.0 {
            1.0 / chars_per_second
        } else {
            0.0
        };
        Self {
            chars,
            index: 0,
            timer: 0.0,
            time_per_char,
            finished,
        }
    }

    pub fn tick(&mut self, dt: f32) {
        if self.finished {
            return;
        }
        if self.time_per_char <= 0.0 {
            self.write_all();
            return;
        }
        self.timer -= dt;
        while self.timer <= 0.0 && !self.finished {
            self.timer += self.time_per_char;
            self.reveal_next();
        }
    }

    pub fn write_all(&mut self) {
        self.index = self.chars.len();
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn visible_text(&self) -> String {
        self.chars[..self.index].iter().collect()
    }

    pub fn full_text(&self) -> String {
        self.chars.iter().collect()
    }

    fn reveal_next(&mut self) {
        self.skip_tags();
        if self.index < self.chars.len() {
            self.index += 1;
        }
        // tags at the end of the line should not hold the line open
        self.skip_tags();
        if self.index >= self.chars.len() {
            self.finished = true;
        }
    }

    fn skip_tags(&mut self) {
        while self.index < self.chars.len() && self.chars[self.index] == '[' {
            match self.chars[self.index..].iter().position(|&c| c == ']') {
                Some(off) => self.index += off + 1,
                None => self.index = self.chars.len(),
            }
        }
    }
}
