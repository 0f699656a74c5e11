use willow_core::config::TextConfig;
use willow_core::renderer::driver::Driver;
use willow_core::{Ctx, Runtime, ScriptManager, TerminalRenderer};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    willow_shared::config::init("config.toml").expect("Should not fail");

    let manager = ScriptManager::new("game/");
    let runtime = Runtime::new(manager, TextConfig::default());
    let mut ctx = Ctx::default();
    let mut driver = Driver::new(runtime, TerminalRenderer);
    driver.run(&mut ctx, "Start");
}
