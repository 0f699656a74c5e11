use crate::runtime::PlaybackMode;

/// Everything the engine asks a front-end to present. Dialogue text keeps
/// its `[emp]`/`[it]` markup; how that looks is the front-end's business.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputEvent {
    ShowDialogue { speaker: Option<String>, text: String },
    ShowDecision { options: Vec<String> },

    /// Point the camera at a character. Fire-and-forget; the engine does
    /// not wait for the move to finish.
    MoveCamera { target: String },
    ShowPlayer,
    HidePlayer,

    ShowCg { name: String },
    HideCg,
    PlayMusic { name: String },
    StopMusic,
    PlaySfx { name: String },

    /// A node finished and was marked completed.
    NodeEnded { node: String },
    /// The node stack emptied; the story is over.
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Advance,
    DecisionMade { index: usize },
    SetMode { mode: PlaybackMode },
    Pause,
    Resume,
    SaveRequest { slot: u32 },
    LoadRequest { slot: u32 },
    Exit,
}
