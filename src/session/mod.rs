//! Opening a deck for editing and running study sessions over it

mod open_deck;
mod runner;

pub use open_deck::OpenDeck;
pub use runner::{
    CheckpointSlot, PromptContext, ReviewPrompt, SessionOptions, SessionRunner, SessionSummary,
    StopReason,
};
