//! Sound cues. Playback is fire-and-forget: failures are logged, never acted on.

use log::{trace, warn};
use std::io::Write;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    TilePop,
    TilePowerUp,
    TileRowExplosion,
    SpeedIncrease,
    CharacterMove,
    RoundLost,
}

impl SoundCue {
    pub fn name(self) -> &'static str {
        match self {
            Self::TilePop => "gameTilePop",
            Self::TilePowerUp => "gameTilePowerup",
            Self::TileRowExplosion => "gameTileRowExplosion",
            Self::SpeedIncrease => "gameSpeedIncrease",
            Self::CharacterMove => "gameCharacterMove",
            Self::RoundLost => "gameRoundLost",
        }
    }

    /// Cues loud enough to ring the terminal bell.
    fn rings_bell(self) -> bool {
        matches!(self, Self::TilePowerUp | Self::SpeedIncrease | Self::RoundLost)
    }
}

#[derive(Debug, Error)]
pub enum SoundError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait SoundService {
    fn play(&mut self, cue: SoundCue) -> Result<(), SoundError>;
}

/// Plays a cue and swallows any failure.
pub fn play_cue(service: &mut dyn SoundService, cue: SoundCue) {
    if let Err(e) = service.play(cue) {
        warn!("sound cue {} failed: {e}", cue.name());
    }
}

/// Rings the terminal bell for the loud cues.
#[derive(Debug, Default)]
pub struct TerminalBell;

impl SoundService for TerminalBell {
    fn play(&mut self, cue: SoundCue) -> Result<(), SoundError> {
        trace!("cue {}", cue.name());
        if cue.rings_bell() {
            let mut out = std::io::stdout();
            out.write_all(b"\x07")?;
            out.flush()?;
        }
        Ok(())
    }
}

/// Used when sound is disabled.
#[derive(Debug, Default)]
pub struct Silent;

impl SoundService for Silent {
    fn play(&mut self, cue: SoundCue) -> Result<(), SoundError> {
        trace!("cue {} (muted)", cue.name());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records cues; optionally fails every call.
    #[derive(Debug, Default, Clone)]
    pub(crate) struct Recorder {
        pub cues: Rc<RefCell<Vec<SoundCue>>>,
        pub fail: bool,
    }

    impl SoundService for Recorder {
        fn play(&mut self, cue: SoundCue) -> Result<(), SoundError> {
            self.cues.borrow_mut().push(cue);
            if self.fail {
                return Err(SoundError::Io(std::io::Error::other("no audio device")));
            }
            Ok(())
        }
    }

    #[test]
    fn failures_are_swallowed() {
        let mut rec = Recorder {
            fail: true,
            ..Recorder::default()
        };
        play_cue(&mut rec, SoundCue::TilePop);
        assert_eq!(*rec.cues.borrow(), vec![SoundCue::TilePop]);
    }
}
