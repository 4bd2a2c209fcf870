//! TAS (Tool-Assisted Speedrun) movie recording and playback.
//!
//! A movie is a linear timeline of per-frame joypad input for controllers one and two, anchored
//! to a randomly generated GUID so that a save state can be checked for consistency against the
//! recording it was taken during. There is no rewinding or branching timeline beyond what a
//! save-state load already provides: loading an earlier state during `RECORDING` truncates the
//! tail of the timeline and continues recording from there.

use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};
use thiserror::Error;
use tracing::info;

pub type Result<T> = std::result::Result<T, Error>;

/// Binary movie file magic, matches the 4 ASCII bytes `1ST`+0x31.
pub const MAGIC: u32 = 0x5441_3331;
/// Upper bound on recordable frames, matching the pre-allocated capacity of a movie timeline.
pub const MAX_FRAMES: usize = 216_000;

#[derive(Error, Debug)]
#[must_use]
pub enum Error {
    #[error("invalid movie header: {0}")]
    InvalidHeader(String),
    #[error("movie exceeds max frame count of {MAX_FRAMES} ({0} requested)")]
    TooManyFrames(usize),
    #[error("movie guid does not match the active recording")]
    GuidMismatch,
    #[error("save state diverges from the active movie at frame {0}")]
    PrefixMismatch(u32),
    #[error("save state is ahead of the current read-only playback position")]
    FutureInReadOnly,
    #[error("{context}: {source:?}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl Error {
    fn io(source: std::io::Error, context: impl Into<String>) -> Self {
        Self::Io {
            source,
            context: context.into(),
        }
    }
}

/// A 64-bit opaque identifier minted fresh for each new recording. `0` means "no movie".
pub type Guid = u64;

/// Generates a new, non-zero movie GUID.
pub fn new_guid() -> Guid {
    loop {
        let guid = rand::random::<u64>();
        if guid != 0 {
            return guid;
        }
    }
}

/// Recorded joypad state for a single frame, for both the primary and secondary controller.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct FrameInput {
    pub joy1: u16,
    pub joy2: u16,
}

/// Movie engine state machine.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub enum Mode {
    #[default]
    Inactive,
    Recording,
    Playback,
    Finished,
}

/// What a [`Movie`] wants [`crate::control_deck::ControlDeck`] to do with a save state it is
/// about to load, per the consistency rules in section 4.8.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoadAction {
    /// No movie is involved on either side; load proceeds untouched.
    NoMovieInvolved,
    /// The save state is inconsistent with the active (or about-to-be-active) movie; refuse the
    /// load entirely and leave emulator/movie state unchanged.
    Reject,
    /// No movie was active locally; adopt the save state's movie and enter read-only playback.
    AdoptReadOnlyPlayback,
    /// Replace the current timeline with the save state's, optionally truncating the tail on the
    /// next frame boundary to support branching off an earlier point while recording.
    ReplaceTimeline { needs_truncation: bool },
}

/// The TAS Movie Engine: a GUID-anchored, linear record/playback timeline of joypad input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Movie {
    mode: Mode,
    guid: Guid,
    read_only: bool,
    frames: Vec<FrameInput>,
    frame_count: u32,
}

impl Default for Movie {
    fn default() -> Self {
        Self::new()
    }
}

impl Movie {
    /// Creates a new, inactive movie engine with its frame ring pre-allocated.
    pub fn new() -> Self {
        Self {
            mode: Mode::Inactive,
            guid: 0,
            read_only: false,
            frames: Vec::with_capacity(MAX_FRAMES),
            frame_count: 0,
        }
    }

    #[inline]
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    #[inline]
    #[must_use]
    pub const fn guid(&self) -> Guid {
        self.guid
    }

    #[inline]
    #[must_use]
    pub const fn read_only(&self) -> bool {
        self.read_only
    }

    #[inline]
    #[must_use]
    pub const fn frame_count(&self) -> u32 {
        self.frame_count
    }

    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self.mode, Mode::Inactive)
    }

    /// Frames recorded or loaded so far, i.e. the movie's save-state payload.
    #[must_use]
    pub fn payload(&self) -> &[FrameInput] {
        &self.frames[..self.frame_count as usize]
    }

    /// `INACTIVE --start_recording--> RECORDING`. The caller is responsible for resetting the
    /// emulator to power-on state; this only resets the movie timeline itself.
    pub fn start_recording(&mut self) {
        self.mode = Mode::Recording;
        self.guid = new_guid();
        self.read_only = false;
        self.frames.clear();
        self.frame_count = 0;
        info!("started recording new movie, guid={:#x}", self.guid);
    }

    /// `INACTIVE --start_playback--> PLAYBACK`. The caller is responsible for resetting the
    /// emulator to power-on state before the first frame is stepped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooManyFrames`] if the movie allocation would exceed [`MAX_FRAMES`].
    pub fn start_playback(&mut self, frames: Vec<FrameInput>, guid: Guid, read_only: bool) -> Result<()> {
        if frames.len() > MAX_FRAMES {
            return Err(Error::TooManyFrames(frames.len()));
        }
        self.frame_count = frames.len() as u32;
        self.frames = frames;
        self.frames.reserve(MAX_FRAMES.saturating_sub(self.frames.len()));
        self.guid = guid;
        self.read_only = read_only;
        self.mode = Mode::Playback;
        info!("started playback, guid={:#x}, frames={}", self.guid, self.frame_count);
        Ok(())
    }

    /// `RECORDING --stop--> INACTIVE` / `PLAYBACK --stop--> INACTIVE` /
    /// `FINISHED --stop--> INACTIVE`. The recorded or played timeline stays in memory (its
    /// payload can still be persisted with [`Movie::save_to_file`]) but the engine no longer
    /// intercepts input.
    pub fn stop(&mut self) {
        self.mode = Mode::Inactive;
        self.read_only = false;
    }

    /// Replace the in-memory timeline, keeping the engine in whatever mode the caller already
    /// transitioned it to (used when adopting/branching from a save state).
    fn replace_timeline(&mut self, frames: Vec<FrameInput>, guid: Guid) {
        self.frame_count = frames.len() as u32;
        self.frames = frames;
        self.frames.reserve(MAX_FRAMES.saturating_sub(self.frames.len()));
        self.guid = guid;
    }

    /// Set the tail of the timeline to be dropped at the next frame boundary. Used after loading
    /// a save state taken earlier in the current recording (branching).
    pub fn truncate_to(&mut self, frame_index: u32) {
        self.frame_count = self.frame_count.min(frame_index);
        self.frames.truncate(self.frame_count as usize);
    }

    /// Drives one frame of the movie state machine. During `RECORDING`, captures `*joy1`/`*joy2`
    /// into the timeline at `frame_index` and extends `frame_count`. During `PLAYBACK`, overwrites
    /// `*joy1`/`*joy2` with the recorded values, transitioning to `FINISHED` once `frame_index`
    /// reaches the end of the tape. A no-op while `INACTIVE` or `FINISHED`.
    pub fn step(&mut self, frame_index: u32, joy1: &mut u16, joy2: &mut u16) {
        match self.mode {
            Mode::Recording => {
                let idx = frame_index as usize;
                if idx >= MAX_FRAMES {
                    info!("movie recording hit max frame count of {MAX_FRAMES}, stopping");
                    self.stop();
                    return;
                }
                let input = FrameInput {
                    joy1: *joy1,
                    joy2: *joy2,
                };
                if idx < self.frames.len() {
                    self.frames[idx] = input;
                } else {
                    self.frames.push(input);
                }
                self.frame_count = self.frame_count.max(frame_index + 1);
            }
            Mode::Playback => {
                if frame_index < self.frame_count {
                    let input = self.frames[frame_index as usize];
                    *joy1 = input.joy1;
                    *joy2 = input.joy2;
                } else {
                    self.mode = Mode::Finished;
                    info!("movie playback finished at frame {frame_index}");
                }
            }
            Mode::Inactive | Mode::Finished => {}
        }
    }

    /// Decide what a save-state load should do to this movie, per the consistency rules of
    /// section 4.8. Does not mutate `self`; the caller applies the resulting [`LoadAction`].
    #[must_use]
    pub fn resolve_load(
        &self,
        saved_guid: Guid,
        saved_frames: &[FrameInput],
        saved_frame_index: u32,
    ) -> LoadAction {
        if saved_guid == 0 {
            return if self.is_active() {
                // The state was saved with no movie active, but one is active now. Treat as
                // inconsistent rather than silently dropping the current recording.
                LoadAction::Reject
            } else {
                LoadAction::NoMovieInvolved
            };
        }

        if !self.is_active() {
            return LoadAction::AdoptReadOnlyPlayback;
        }

        if saved_guid != self.guid {
            return LoadAction::Reject;
        }

        let shared_len = (self.frame_count as usize).min(saved_frames.len());
        if self.frames[..shared_len] != saved_frames[..shared_len] {
            return LoadAction::Reject;
        }

        if self.read_only && saved_frames.len() as u32 > self.frame_count {
            return LoadAction::Reject;
        }

        let needs_truncation = saved_frame_index < saved_frames.len() as u32;
        LoadAction::ReplaceTimeline { needs_truncation }
    }

    /// Apply a [`LoadAction::ReplaceTimeline`] or [`LoadAction::AdoptReadOnlyPlayback`] decision
    /// made by [`Movie::resolve_load`].
    pub fn apply_load(&mut self, action: LoadAction, saved_guid: Guid, saved_frames: Vec<FrameInput>) {
        match action {
            LoadAction::AdoptReadOnlyPlayback => {
                self.replace_timeline(saved_frames, saved_guid);
                self.read_only = true;
                self.mode = Mode::Playback;
            }
            LoadAction::ReplaceTimeline { .. } => {
                self.replace_timeline(saved_frames, saved_guid);
            }
            LoadAction::NoMovieInvolved | LoadAction::Reject => {}
        }
    }

    /// Persist the timeline to a standalone movie file: `magic:u32`, `frame_count:u32`, then
    /// `frame_count` packed `FrameInput`s (4 bytes each, `joy1` then `joy2`, little-endian).
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be created or written to.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|err| Error::io(err, "failed to create movie file"))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(&MAGIC.to_le_bytes())
            .map_err(|err| Error::io(err, "failed to write movie header"))?;
        writer
            .write_all(&self.frame_count.to_le_bytes())
            .map_err(|err| Error::io(err, "failed to write movie header"))?;
        for input in self.payload() {
            writer
                .write_all(&input.joy1.to_le_bytes())
                .map_err(|err| Error::io(err, "failed to write movie frame"))?;
            writer
                .write_all(&input.joy2.to_le_bytes())
                .map_err(|err| Error::io(err, "failed to write movie frame"))?;
        }
        Ok(())
    }

    /// Load a standalone movie file written by [`Movie::save_to_file`]. Returns the parsed
    /// frames; it's the caller's responsibility to feed them to [`Movie::start_playback`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] if the magic doesn't match, or an IO error if the file
    /// can't be read.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Vec<FrameInput>> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| Error::io(err, "failed to open movie file"))?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader
            .read_exact(&mut magic)
            .map_err(|err| Error::io(err, "failed to read movie header"))?;
        let magic = u32::from_le_bytes(magic);
        if magic != MAGIC {
            return Err(Error::InvalidHeader(format!(
                "invalid magic (expected {MAGIC:#010X}, found {magic:#010X})"
            )));
        }

        let mut frame_count = [0u8; 4];
        reader
            .read_exact(&mut frame_count)
            .map_err(|err| Error::io(err, "failed to read movie header"))?;
        let frame_count = u32::from_le_bytes(frame_count) as usize;
        if frame_count > MAX_FRAMES {
            return Err(Error::TooManyFrames(frame_count));
        }

        let mut frames = Vec::with_capacity(frame_count);
        for _ in 0..frame_count {
            let mut joy1 = [0u8; 2];
            let mut joy2 = [0u8; 2];
            reader
                .read_exact(&mut joy1)
                .map_err(|err| Error::io(err, "failed to read movie frame"))?;
            reader
                .read_exact(&mut joy2)
                .map_err(|err| Error::io(err, "failed to read movie frame"))?;
            frames.push(FrameInput {
                joy1: u16::from_le_bytes(joy1),
                joy2: u16::from_le_bytes(joy2),
            });
        }
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_then_replay_matches() {
        let mut movie = Movie::new();
        movie.start_recording();
        let guid = movie.guid();

        let scripted = [(0x01u16, 0u16), (0x80, 0), (0x00, 0x02)];
        for (frame, &(joy1, joy2)) in scripted.iter().enumerate() {
            let mut j1 = joy1;
            let mut j2 = joy2;
            movie.step(frame as u32, &mut j1, &mut j2);
            assert_eq!((j1, j2), (joy1, joy2));
        }
        assert_eq!(movie.frame_count(), 3);
        movie.stop();

        let mut playback = Movie::new();
        playback
            .start_playback(movie.payload().to_vec(), guid, true)
            .expect("valid playback");
        for (frame, &(joy1, joy2)) in scripted.iter().enumerate() {
            let mut j1 = 0xFFFF;
            let mut j2 = 0xFFFF;
            playback.step(frame as u32, &mut j1, &mut j2);
            assert_eq!((j1, j2), (joy1, joy2));
        }
        assert_eq!(playback.mode(), Mode::Playback);
        let mut j1 = 0;
        let mut j2 = 0;
        playback.step(scripted.len() as u32, &mut j1, &mut j2);
        assert_eq!(playback.mode(), Mode::Finished);
    }

    #[test]
    fn resolve_load_rejects_guid_mismatch() {
        let mut movie = Movie::new();
        movie.start_recording();
        assert_eq!(
            movie.resolve_load(movie.guid().wrapping_add(1), &[], 0),
            LoadAction::Reject
        );
    }

    #[test]
    fn resolve_load_rejects_diverging_prefix() {
        let mut movie = Movie::new();
        movie.start_recording();
        let guid = movie.guid();
        let mut j1 = 0x01;
        let mut j2 = 0;
        movie.step(0, &mut j1, &mut j2);

        let saved_frames = vec![FrameInput { joy1: 0x02, joy2: 0 }];
        assert_eq!(
            movie.resolve_load(guid, &saved_frames, 1),
            LoadAction::Reject
        );
    }

    #[test]
    fn resolve_load_rejects_future_in_read_only() {
        let mut movie = Movie::new();
        movie
            .start_playback(vec![FrameInput::default(); 5], 42, true)
            .expect("valid playback");
        let saved_frames = vec![FrameInput::default(); 10];
        assert_eq!(
            movie.resolve_load(42, &saved_frames, 10),
            LoadAction::Reject
        );
    }

    #[test]
    fn resolve_load_allows_branch_with_truncation() {
        let mut movie = Movie::new();
        movie.start_recording();
        let guid = movie.guid();
        for frame in 0..5 {
            let mut j1 = 0;
            let mut j2 = 0;
            movie.step(frame, &mut j1, &mut j2);
        }
        let saved_frames = movie.payload()[..2].to_vec();
        assert_eq!(
            movie.resolve_load(guid, &saved_frames, 2),
            LoadAction::ReplaceTimeline {
                needs_truncation: true
            }
        );
    }

    #[test]
    fn adopts_saved_movie_when_none_active() {
        let movie = Movie::new();
        let saved_frames = vec![FrameInput::default(); 3];
        assert_eq!(
            movie.resolve_load(7, &saved_frames, 3),
            LoadAction::AdoptReadOnlyPlayback
        );
    }

    #[test]
    fn save_and_load_file_round_trips() {
        let mut movie = Movie::new();
        movie.start_recording();
        for frame in 0..4 {
            let mut j1 = frame as u16;
            let mut j2 = 0;
            movie.step(frame, &mut j1, &mut j2);
        }

        let dir = std::env::temp_dir().join(format!("movie_test_{:x}", movie.guid()));
        movie.save_to_file(&dir).expect("save movie");
        let loaded = Movie::load_from_file(&dir).expect("load movie");
        assert_eq!(loaded, movie.payload());
        let _ = std::fs::remove_file(&dir);
    }
}
