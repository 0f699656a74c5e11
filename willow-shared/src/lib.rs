//! Process-wide configuration shared by every willow crate.

pub mod config;
