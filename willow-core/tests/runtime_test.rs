use std::fs;
use std::path::{Path, PathBuf};

use willow_core::config::TextConfig;
use willow_core::ctx::Ctx;
use willow_core::event::OutputEvent;
use willow_core::manager::{LoadError, ScriptManager};
use willow_core::runtime::{PlaybackMode, Runtime, RuntimeState};

/// Writes a throwaway script directory and returns its path. Each test gets
/// its own directory so they can run in parallel.
fn script_dir(name: &str, files: &[(&str, &str)]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("willow_rt_{}_{}", std::process::id(), name));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    for (file, text) in files {
        fs::write(dir.join(file), text).unwrap();
    }
    dir
}

fn runtime_for(dir: &Path) -> Runtime {
    Runtime::new(ScriptManager::new(dir), TextConfig::default())
}

/// Finish the reveal and move to the next line, the way a front-end does.
fn advance(rt: &mut Runtime, ctx: &mut Ctx) {
    rt.skip_reveal();
    rt.advance(ctx);
}

fn dialogue_texts(events: &[OutputEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            OutputEvent::ShowDialogue { text, .. } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_linear_traversal() {
    let dir = script_dir(
        "linear",
        &[(
            "story.dlg",
            r#"
#Node:Start
Holly|Hello there.
It was a quiet morning.
Holly|Ready?
#EndNode
"#,
        )],
    );
    let mut rt = runtime_for(&dir);
    let mut ctx = Ctx::default();

    rt.start(&mut ctx, "Start");
    let events = ctx.drain();
    assert_eq!(
        events,
        vec![
            OutputEvent::MoveCamera {
                target: "Holly".into()
            },
            OutputEvent::ShowDialogue {
                speaker: Some("Holly".into()),
                text: "Hello there.".into()
            },
        ]
    );

    advance(&mut rt, &mut ctx);
    // narration has no speaker and moves no camera
    assert_eq!(
        ctx.drain(),
        vec![OutputEvent::ShowDialogue {
            speaker: None,
            text: "It was a quiet morning.".into()
        }]
    );

    advance(&mut rt, &mut ctx);
    // same speaker again, camera stays put
    assert_eq!(
        ctx.drain(),
        vec![OutputEvent::ShowDialogue {
            speaker: Some("Holly".into()),
            text: "Ready?".into()
        }]
    );

    advance(&mut rt, &mut ctx);
    assert_eq!(
        ctx.drain(),
        vec![
            OutputEvent::NodeEnded {
                node: "Start".into()
            },
            OutputEvent::End,
        ]
    );
    assert_eq!(rt.state(), RuntimeState::Idle);
    assert_eq!(rt.completed_nodes(), ["Start".to_string()]);
    assert_eq!(ctx.transcript.len(), 3);
}

#[test]
fn test_interpolation_and_conditionals() {
    let dir = script_dir(
        "cond",
        &[(
            "story.dlg",
            r#"
var coins = 12
#Node:Start
Holly|I have {coins} coins.
if (coins >= 10)
Holly|Enough for the ferry.
else
Holly|Not enough.
endif
#EndNode
"#,
        )],
    );
    let mut rt = runtime_for(&dir);
    let mut ctx = Ctx::default();

    rt.start(&mut ctx, "Start");
    assert_eq!(dialogue_texts(&ctx.drain()), ["I have 12 coins."]);

    advance(&mut rt, &mut ctx);
    assert_eq!(dialogue_texts(&ctx.drain()), ["Enough for the ferry."]);

    advance(&mut rt, &mut ctx);
    assert_eq!(rt.state(), RuntimeState::Idle);
    assert!(!ctx
        .transcript
        .iter()
        .any(|t| t.text.contains("Not enough")));
}

#[test]
fn test_false_conditional_without_else_is_skipped() {
    let dir = script_dir(
        "skip",
        &[(
            "story.dlg",
            r#"
var ok = false
#Node:Start
Holly|Before.
if (ok)
Holly|Hidden.
endif
Holly|After.
#EndNode
"#,
        )],
    );
    let mut rt = runtime_for(&dir);
    let mut ctx = Ctx::default();

    rt.start(&mut ctx, "Start");
    ctx.drain();
    advance(&mut rt, &mut ctx);
    assert_eq!(dialogue_texts(&ctx.drain()), ["After."]);

    advance(&mut rt, &mut ctx);
    assert_eq!(rt.state(), RuntimeState::Idle);
    assert_eq!(ctx.transcript.len(), 2);
}

#[test]
fn test_decision_flow() {
    let dir = script_dir(
        "decision",
        &[(
            "story.dlg",
            r#"
#Node:Start
Guide|Choose.
#StartDecision
-Go left
Guide|You went left.
-Go right
Guide|You went right.
#EndDecision
Guide|Onward.
#EndNode
"#,
        )],
    );
    let mut rt = runtime_for(&dir);
    let mut ctx = Ctx::default();

    rt.start(&mut ctx, "Start");
    ctx.drain();
    advance(&mut rt, &mut ctx);
    assert_eq!(
        ctx.drain(),
        vec![OutputEvent::ShowDecision {
            options: vec!["Go left".into(), "Go right".into()]
        }]
    );
    assert_eq!(rt.state(), RuntimeState::AwaitingDecision);

    // out-of-range input leaves the menu up
    rt.make_decision(&mut ctx, 5);
    assert_eq!(rt.state(), RuntimeState::AwaitingDecision);
    assert!(ctx.drain().is_empty());

    rt.make_decision(&mut ctx, 1);
    assert_eq!(dialogue_texts(&ctx.drain()), ["You went right."]);

    // leaving the option body lands after the block
    advance(&mut rt, &mut ctx);
    assert_eq!(dialogue_texts(&ctx.drain()), ["Onward."]);

    advance(&mut rt, &mut ctx);
    assert_eq!(rt.state(), RuntimeState::Idle);
}

#[test]
fn test_commands_mutate_presentation() {
    let dir = script_dir(
        "commands",
        &[(
            "story.dlg",
            r#"
#Node:Start
[CG=dawn]
[Music=theme]
[ShowPlayer]
Holly|Morning.
[HideCG]
Holly|Later.
#EndNode
"#,
        )],
    );
    let mut rt = runtime_for(&dir);
    let mut ctx = Ctx::default();

    rt.start(&mut ctx, "Start");
    let events = ctx.drain();
    assert_eq!(events[0], OutputEvent::ShowCg { name: "dawn".into() });
    assert_eq!(
        events[1],
        OutputEvent::PlayMusic {
            name: "theme".into()
        }
    );
    assert_eq!(events[2], OutputEvent::ShowPlayer);
    assert_eq!(ctx.current_cg.as_deref(), Some("dawn"));
    assert_eq!(ctx.current_music.as_deref(), Some("theme"));
    assert!(ctx.player_visible);

    advance(&mut rt, &mut ctx);
    assert!(ctx.drain().contains(&OutputEvent::HideCg));
    assert_eq!(ctx.current_cg, None);

    assert_eq!(
        rt.command_history(),
        [
            "[CG=dawn]".to_string(),
            "[Music=theme]".to_string(),
            "[ShowPlayer]".to_string(),
            "[HideCG]".to_string(),
        ]
    );
}

#[test]
fn test_goto_runs_node_and_resumes() {
    let dir = script_dir(
        "goto",
        &[
            (
                "main.dlg",
                r#"
#Node:Start
Holly|Before.
[GoTo=Meadow]
[GoTo=Meadow]
Holly|After.
#EndNode
"#,
            ),
            (
                "meadow.dlg",
                r#"
#Node:Meadow
Bee|Buzz.
#EndNode
"#,
            ),
        ],
    );
    let mut rt = runtime_for(&dir);
    let mut ctx = Ctx::default();

    rt.start(&mut ctx, "Start");
    ctx.drain();

    advance(&mut rt, &mut ctx);
    assert_eq!(dialogue_texts(&ctx.drain()), ["Buzz."]);
    assert_eq!(rt.frames().len(), 2);
    assert_eq!(rt.node_name(), Some("Meadow"));

    // Meadow ends; the second GoTo is a no-op because Meadow completed
    advance(&mut rt, &mut ctx);
    let events = ctx.drain();
    assert!(events.contains(&OutputEvent::NodeEnded {
        node: "Meadow".into()
    }));
    assert_eq!(dialogue_texts(&events), ["After."]);
    assert_eq!(rt.node_name(), Some("Start"));

    advance(&mut rt, &mut ctx);
    assert_eq!(rt.state(), RuntimeState::Idle);
    assert_eq!(
        rt.completed_nodes(),
        ["Meadow".to_string(), "Start".to_string()]
    );
}

#[test]
fn test_conditional_state_survives_nested_node() {
    let dir = script_dir(
        "nested",
        &[
            (
                "main.dlg",
                r#"
var brave = true
#Node:Start
if (brave)
[GoTo=Cave]
Holly|Back out in the sun.
endif
#EndNode
"#,
            ),
            (
                "cave.dlg",
                r#"
#Node:Cave
Echo|Deep below.
#EndNode
"#,
            ),
        ],
    );
    let mut rt = runtime_for(&dir);
    let mut ctx = Ctx::default();

    rt.start(&mut ctx, "Start");
    assert_eq!(dialogue_texts(&ctx.drain()), ["Deep below."]);

    advance(&mut rt, &mut ctx);
    assert_eq!(dialogue_texts(&ctx.drain()), ["Back out in the sun."]);

    advance(&mut rt, &mut ctx);
    assert_eq!(rt.state(), RuntimeState::Idle);
    assert_eq!(
        rt.completed_nodes(),
        ["Cave".to_string(), "Start".to_string()]
    );
}

#[test]
fn test_snapshot_restore_replays_presentation() {
    let dir = script_dir(
        "restore",
        &[(
            "story.dlg",
            r#"
var name = "Iris"
#Node:Start
[Music=rain]
Iris|Line one.
Iris|Line two, says {name}.
Iris|Line three.
#EndNode
"#,
        )],
    );
    let mut rt = runtime_for(&dir);
    let mut ctx = Ctx::default();

    rt.start(&mut ctx, "Start");
    ctx.drain();
    advance(&mut rt, &mut ctx);
    assert_eq!(dialogue_texts(&ctx.drain()), ["Line two, says Iris."]);

    let snap = rt.snapshot(&ctx);

    let mut rt2 = runtime_for(&dir);
    let mut ctx2 = Ctx::default();
    rt2.restore(&mut ctx2, snap).unwrap();

    // replay rebuilt the music, then the saved line came up again
    let events = ctx2.drain();
    assert_eq!(
        events[0],
        OutputEvent::PlayMusic {
            name: "rain".into()
        }
    );
    assert_eq!(dialogue_texts(&events), ["Line two, says Iris."]);
    assert_eq!(ctx2.current_music.as_deref(), Some("rain"));
    assert_eq!(ctx2.transcript.len(), 2);
    assert_eq!(rt2.state(), RuntimeState::Presenting);

    advance(&mut rt2, &mut ctx2);
    assert_eq!(dialogue_texts(&ctx2.drain()), ["Line three."]);
    advance(&mut rt2, &mut ctx2);
    assert_eq!(rt2.state(), RuntimeState::Idle);
}

#[test]
fn test_restore_with_pending_decision() {
    let dir = script_dir(
        "restore_decision",
        &[(
            "story.dlg",
            r#"
#Node:Start
Guide|Pick.
#StartDecision
-A
Guide|Apple.
-B
Guide|Bramble.
#EndDecision
#EndNode
"#,
        )],
    );
    let mut rt = runtime_for(&dir);
    let mut ctx = Ctx::default();

    rt.start(&mut ctx, "Start");
    ctx.drain();
    advance(&mut rt, &mut ctx);
    assert_eq!(rt.state(), RuntimeState::AwaitingDecision);

    let snap = rt.snapshot(&ctx);

    let mut rt2 = runtime_for(&dir);
    let mut ctx2 = Ctx::default();
    rt2.restore(&mut ctx2, snap).unwrap();

    assert_eq!(rt2.state(), RuntimeState::AwaitingDecision);
    assert_eq!(
        ctx2.drain(),
        vec![OutputEvent::ShowDecision {
            options: vec!["A".into(), "B".into()]
        }]
    );
    assert_eq!(ctx2.transcript.len(), 1);

    rt2.make_decision(&mut ctx2, 0);
    assert_eq!(dialogue_texts(&ctx2.drain()), ["Apple."]);
}

#[test]
fn test_auto_mode_advances_on_reading_time() {
    let dir = script_dir(
        "auto",
        &[(
            "story.dlg",
            r#"
#Node:Start
Holly|Tick.
Holly|Tock.
#EndNode
"#,
        )],
    );
    // zero reveal speed: the first tick shows the whole line
    let cfg = TextConfig {
        text_speed: 0.0,
        time_per_character: 0.1,
        auto_forward_factor: 0.5,
        fast_forward_interval: 0.25,
    };
    let mut rt = Runtime::new(ScriptManager::new(&dir), cfg);
    let mut ctx = Ctx::default();

    rt.start(&mut ctx, "Start");
    ctx.drain();
    rt.set_mode(&mut ctx, PlaybackMode::Auto);

    // reveal completes, then "Tick." (5 chars) waits 5 * 0.1 * 0.5 seconds
    rt.tick(&mut ctx, 0.016);
    assert!(ctx.drain().is_empty());
    rt.tick(&mut ctx, 0.3);
    assert_eq!(dialogue_texts(&ctx.drain()), ["Tock."]);

    rt.tick(&mut ctx, 0.016);
    rt.tick(&mut ctx, 0.3);
    assert_eq!(rt.state(), RuntimeState::Idle);
    assert_eq!(ctx.transcript.len(), 2);
}

#[test]
fn test_advance_drops_back_to_normal_mode() {
    let dir = script_dir(
        "modedrop",
        &[(
            "story.dlg",
            r#"
#Node:Start
Holly|One.
Holly|Two.
#EndNode
"#,
        )],
    );
    let mut rt = runtime_for(&dir);
    let mut ctx = Ctx::default();

    rt.start(&mut ctx, "Start");
    ctx.drain();
    rt.set_mode(&mut ctx, PlaybackMode::Auto);

    // player input cancels auto instead of advancing
    rt.advance(&mut ctx);
    assert_eq!(rt.mode(), PlaybackMode::Normal);
    assert!(ctx.drain().is_empty());
    assert_eq!(ctx.transcript.len(), 1);
}

#[test]
fn test_fast_forward_stops_at_decision() {
    let dir = script_dir(
        "ff",
        &[(
            "story.dlg",
            r#"
#Node:Start
Holly|One.
Holly|Two.
#StartDecision
-Stay
Holly|Stayed.
#EndDecision
#EndNode
"#,
        )],
    );
    let mut rt = runtime_for(&dir);
    let mut ctx = Ctx::default();

    rt.start(&mut ctx, "Start");
    ctx.drain();
    rt.set_mode(&mut ctx, PlaybackMode::FastForward);

    rt.tick(&mut ctx, 0.3);
    assert_eq!(dialogue_texts(&ctx.drain()), ["Two."]);

    rt.tick(&mut ctx, 0.3);
    assert_eq!(
        ctx.drain(),
        vec![OutputEvent::ShowDecision {
            options: vec!["Stay".into()]
        }]
    );
    assert_eq!(rt.state(), RuntimeState::AwaitingDecision);

    // fast-forward never answers a menu
    rt.tick(&mut ctx, 0.3);
    assert!(ctx.drain().is_empty());
}

#[test]
fn test_pause_freezes_everything() {
    let dir = script_dir(
        "pause",
        &[(
            "story.dlg",
            r#"
#Node:Start
Holly|One.
Holly|Two.
#EndNode
"#,
        )],
    );
    let mut rt = runtime_for(&dir);
    let mut ctx = Ctx::default();

    rt.start(&mut ctx, "Start");
    ctx.drain();
    rt.skip_reveal();

    rt.pause();
    assert_eq!(rt.state(), RuntimeState::Paused);
    rt.tick(&mut ctx, 10.0);
    rt.advance(&mut ctx);
    assert!(ctx.drain().is_empty());

    rt.resume();
    assert_eq!(rt.state(), RuntimeState::Presenting);
    rt.advance(&mut ctx);
    assert_eq!(dialogue_texts(&ctx.drain()), ["Two."]);
}

#[test]
fn test_start_guards() {
    let dir = script_dir(
        "guards",
        &[(
            "story.dlg",
            r#"
#Node:Start
Holly|Only line.
#EndNode
"#,
        )],
    );
    let mut rt = runtime_for(&dir);
    let mut ctx = Ctx::default();

    rt.start(&mut ctx, "Start");
    ctx.drain();

    // starting again while running is ignored
    rt.start(&mut ctx, "Start");
    assert!(ctx.drain().is_empty());

    advance(&mut rt, &mut ctx);
    ctx.drain();
    assert_eq!(rt.state(), RuntimeState::Idle);

    // a completed node never restarts
    rt.start(&mut ctx, "Start");
    assert_eq!(rt.state(), RuntimeState::Idle);
    assert!(ctx.drain().is_empty());
}

#[test]
fn test_missing_start_node_halts() {
    let dir = script_dir(
        "missing",
        &[(
            "story.dlg",
            r#"
#Node:Start
Holly|Hi.
#EndNode
"#,
        )],
    );
    let mut rt = runtime_for(&dir);
    let mut ctx = Ctx::default();

    rt.start(&mut ctx, "Nowhere");
    assert_eq!(rt.state(), RuntimeState::Idle);
    assert_eq!(ctx.drain(), vec![OutputEvent::End]);
}

#[test]
fn test_manager_reports_parse_errors_with_path() {
    let dir = script_dir(
        "badfile",
        &[(
            "broken.dlg",
            r#"
#Node:Start
-stray option
#EndNode
"#,
        )],
    );
    let manager = ScriptManager::new(&dir);
    let mut vars = talescript_core::value::VariableStore::new();
    let err = manager.find_node("Start", &mut vars).unwrap_err();
    match err {
        LoadError::Parse { path, source } => {
            assert!(path.ends_with("broken.dlg"));
            assert_eq!(source.line, 3);
        }
        other => panic!("expected a parse error, got {:?}", other),
    }
}

#[test]
fn test_manager_skips_foreign_files_and_collects_vars() {
    let dir = script_dir(
        "mixed",
        &[
            ("a_vars.dlg", "var greeting = \"salut\"\n"),
            ("notes.txt", "#Node:Start\nnot a script\n#EndNode\n"),
            (
                "z_story.dlg",
                r#"
#Node:Start
Holly|{greeting}!
#EndNode
"#,
            ),
        ],
    );
    let mut rt = runtime_for(&dir);
    let mut ctx = Ctx::default();

    rt.start(&mut ctx, "Start");
    assert_eq!(dialogue_texts(&ctx.drain()), ["salut!"]);
}
