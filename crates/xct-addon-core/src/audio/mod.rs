mod output;
pub(crate) mod player;
mod sounds;

pub use {
    output::{AudioOutput, PlayOutcome, RodioOutput},
    player::{
        PlaybackEnd, PlaybackHandle, PlaybackReport, PlaybackRequest, PlaybackSlot, Player,
    },
    sounds::SoundLibrary,
};
