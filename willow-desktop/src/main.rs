mod config_gen;
mod setup;

use std::path::Path;

use willow_core::config::{SystemConfig, TextConfig};
use willow_core::renderer::driver::Driver;
use willow_core::{Ctx, Runtime, ScriptManager, TerminalRenderer};

fn main() {
    setup::init();
    log::info!(">>> Willow Desktop Launcher Started <<<");

    let sys_cfg: SystemConfig = willow_shared::config::get("system");
    let text_cfg: TextConfig = willow_shared::config::get("text");

    log::info!("Script root from config: {}", sys_cfg.script_path);

    if !Path::new(&sys_cfg.script_path).exists() {
        log::error!("Script directory not found: {}", sys_cfg.script_path);
        panic!(
            "Script directory '{}' not found. Please check config.toml or file path.",
            sys_cfg.script_path
        );
    }

    let manager = ScriptManager::new(&sys_cfg.script_path);
    let runtime = Runtime::new(manager, text_cfg);
    let mut ctx = Ctx::default();
    let mut driver = Driver::new(runtime, TerminalRenderer);

    driver.run(&mut ctx, &sys_cfg.start_node);

    log::info!("Session over");
}
