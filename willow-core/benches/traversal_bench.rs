use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use std::fs;
use std::path::PathBuf;

use willow_core::config::TextConfig;
use willow_core::event::{InputEvent, OutputEvent};
use willow_core::renderer::driver::Driver;
use willow_core::renderer::Renderer;
use willow_core::runtime::{Runtime, RuntimeState};
use willow_core::{Ctx, ScriptManager};

fn make_script(lines: usize) -> String {
    let mut buf = String::with_capacity(lines * 32);
    buf.push_str("var mood = \"calm\"\nvar visits = 0\n");
    buf.push_str("#Node:Start\n");
    for i in 0..lines {
        match i % 8 {
            0 => buf.push_str(&format!("Mira|Line {i} in the {{mood}} air.\n")),
            1 => buf.push_str(&format!("The meadow hums, take {i}.\n")),
            2 => buf.push_str(&format!("[CG=cg{i}]\n")),
            3 => buf.push_str(&format!("[Music=bgm{i}]\n")),
            4 => buf.push_str("if (visits >= 0)\nRin|Counted.\nendif\n"),
            5 => buf.push_str(&format!("Rin|Reply {i}.\n")),
            6 => buf.push_str(
                "#StartDecision\n-Onward\nMira|Onward then.\n-Rest\nMira|A short rest.\n#EndDecision\n",
            ),
            7 => buf.push_str("[HideCG]\n"),
            _ => unreachable!(),
        }
    }
    buf.push_str("#EndNode\n");
    buf
}

fn script_dir(tag: &str, lines: usize) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("willow_bench_{}_{}", tag, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("story.dlg"), make_script(lines)).unwrap();
    dir
}

struct NullRenderer;
impl Renderer for NullRenderer {
    fn render(&mut self, out: &OutputEvent) -> Option<InputEvent> {
        match out {
            OutputEvent::ShowDialogue { .. } => Some(InputEvent::Advance),
            OutputEvent::ShowDecision { .. } => Some(InputEvent::DecisionMade { index: 0 }),
            _ => None,
        }
    }
}

static INIT: std::sync::Once = std::sync::Once::new();
fn init_config() {
    INIT.call_once(|| {
        let saves =
            std::env::temp_dir().join(format!("willow_bench_saves_{}", std::process::id()));
        let toml = format!(
            "[system]\nscript_path = \"game/\"\nsave_path = \"{}\"\nlog_path = \"logs/\"\nlog_level = \"error\"\nstart_node = \"Start\"\n",
            saves.display()
        );
        let _ = willow_shared::config::init_from_str(&toml);
    });
}

fn bench_traversal(c: &mut Criterion) {
    const LINES: usize = 10_000;
    let mut group = c.benchmark_group("traversal");
    group.sample_size(10);

    group.bench_function("run 10k lines", |b| {
        init_config();
        let dir = script_dir("run", LINES);
        b.iter_batched(
            Ctx::default,
            |mut ctx| {
                let runtime = Runtime::new(ScriptManager::new(&dir), TextConfig::default());
                let mut drv = Driver::new(runtime, NullRenderer);
                drv.run(&mut ctx, "Start");
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("restore mid-story", |b| {
        init_config();
        let dir = script_dir("restore", LINES);
        let mut rt = Runtime::new(ScriptManager::new(&dir), TextConfig::default());
        let mut ctx = Ctx::default();
        rt.start(&mut ctx, "Start");
        for _ in 0..200 {
            match rt.state() {
                RuntimeState::Presenting => {
                    rt.skip_reveal();
                    rt.advance(&mut ctx);
                }
                RuntimeState::AwaitingDecision => rt.make_decision(&mut ctx, 0),
                _ => break,
            }
        }
        ctx.drain();
        let snap = rt.snapshot(&ctx);

        b.iter_batched(
            || {
                (
                    Runtime::new(ScriptManager::new(&dir), TextConfig::default()),
                    Ctx::default(),
                    snap.clone(),
                )
            },
            |(mut rt, mut ctx, snap)| {
                rt.restore(&mut ctx, snap).unwrap();
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group!(benches, bench_traversal);
criterion_main!(benches);
