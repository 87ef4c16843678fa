use crate::{
    CoreResult,
    audio::{AudioOutput, PlayOutcome, SoundLibrary},
    model::{SystemVolume, VolumePolicy},
};

use std::{
    collections::HashMap,
    path::Path,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    thread::JoinHandle,
};

use tracing::{debug, error, info, instrument};

/// Who owns a playback, for preemption purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackSlot {
    /// Tied to a settings row. A new request on the same row stops the old one.
    Row(i64),
    /// Fire-and-forget playback from background dispatch. Never preempted.
    Detached,
}

/// What to play and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackRequest {
    /// File name inside the sound library.
    pub file: String,
    /// Loudness rule.
    pub volume: VolumePolicy,
    /// Number of sequential plays, at least 1.
    pub play_count: u32,
}

/// How a whole playback ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEnd {
    /// All requested plays completed.
    Finished,
    /// Stopped or replaced before finishing.
    Preempted,
    /// A pass failed to open or decode.
    Failed,
}

/// Summary returned when a playback thread exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackReport {
    /// Number of natural completions observed.
    pub completions: u32,
    /// Why playback stopped.
    pub end: PlaybackEnd,
}

/// Handle to a playback running on its own thread.
#[derive(Debug)]
pub struct PlaybackHandle {
    join: JoinHandle<PlaybackReport>,
}

impl PlaybackHandle {
    /// Block until playback ends.
    pub fn wait(self) -> PlaybackReport {
        self.join.join().unwrap_or(PlaybackReport {
            completions: 0,
            end: PlaybackEnd::Failed,
        })
    }

    /// Whether the playback thread has exited.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

struct ActivePlayback {
    generation: u64,
    cancel: Arc<AtomicBool>,
}

/// Plays sound files with volume and repeat policy.
///
/// Each playback runs on a dedicated thread. Row-slot playbacks are tracked
/// so a newer request on the same row cancels the older one; detached
/// playbacks are independent and may overlap.
pub struct Player {
    output: Arc<dyn AudioOutput>,
    library: SoundLibrary,
    system_volume: SystemVolume,
    active: Arc<Mutex<HashMap<i64, ActivePlayback>>>,
    next_generation: AtomicU64,
}

impl Player {
    /// Player over an output backend and a sound library.
    pub fn new(
        output: Arc<dyn AudioOutput>,
        library: SoundLibrary,
        system_volume: SystemVolume,
    ) -> Self {
        Self {
            output,
            library,
            system_volume,
            active: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(1),
        }
    }

    /// The sound library files are resolved against.
    pub fn library(&self) -> &SoundLibrary {
        &self.library
    }

    /// Start playback. Fails only if the file cannot be located.
    #[instrument(skip(self))]
    pub fn play(&self, slot: PlaybackSlot, request: PlaybackRequest) -> CoreResult<PlaybackHandle> {
        let path = self.library.resolve(&request.file)?;
        let volume = request.volume.resolve(self.system_volume);
        let play_count = request.play_count.max(1);
        let cancel = Arc::new(AtomicBool::new(false));
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        if let PlaybackSlot::Row(row) = slot {
            let previous = lock_active(&self.active).insert(
                row,
                ActivePlayback {
                    generation,
                    cancel: Arc::clone(&cancel),
                },
            );
            if let Some(previous) = previous {
                previous.cancel.store(true, Ordering::Release);
                debug!(row, "Preempted in-flight playback for row");
            }
        }

        info!(
            path = %path.display(),
            volume,
            play_count,
            ?slot,
            "Starting playback"
        );

        let output = Arc::clone(&self.output);
        let active = Arc::clone(&self.active);
        let join = std::thread::spawn(move || {
            let report = play_repeated(output.as_ref(), &path, volume, play_count, &cancel);

            // Release the row only if no newer playback has claimed it.
            if let PlaybackSlot::Row(row) = slot {
                let mut active = lock_active(&active);
                if active.get(&row).is_some_and(|a| a.generation == generation) {
                    active.remove(&row);
                }
            }

            debug!(path = %path.display(), ?report, "Playback released");
            report
        });

        Ok(PlaybackHandle { join })
    }

    /// Stop the playback tied to a row, if any.
    pub fn stop(&self, slot: PlaybackSlot) -> bool {
        let PlaybackSlot::Row(row) = slot else {
            return false;
        };

        match lock_active(&self.active).remove(&row) {
            Some(playback) => {
                playback.cancel.store(true, Ordering::Release);
                info!(row, "Playback stopped");
                true
            }
            None => false,
        }
    }

    /// Whether a row currently has an in-flight playback.
    pub fn is_playing(&self, slot: PlaybackSlot) -> bool {
        match slot {
            PlaybackSlot::Row(row) => lock_active(&self.active).contains_key(&row),
            PlaybackSlot::Detached => false,
        }
    }
}

/// Play `path` up to `play_count` times, restarting from the beginning after
/// each natural completion.
pub(crate) fn play_repeated(
    output: &dyn AudioOutput,
    path: &Path,
    volume: f32,
    play_count: u32,
    cancel: &AtomicBool,
) -> PlaybackReport {
    let mut completions = 0;

    loop {
        if cancel.load(Ordering::Acquire) {
            return PlaybackReport {
                completions,
                end: PlaybackEnd::Preempted,
            };
        }

        match output.play_to_end(path, volume, cancel) {
            Ok(PlayOutcome::Completed) => {
                completions += 1;
                debug!(completions, play_count, "Playback pass completed");
                if completions >= play_count {
                    return PlaybackReport {
                        completions,
                        end: PlaybackEnd::Finished,
                    };
                }
            }
            Ok(PlayOutcome::Cancelled) => {
                return PlaybackReport {
                    completions,
                    end: PlaybackEnd::Preempted,
                };
            }
            Err(e) => {
                error!(path = %path.display(), completions, error = ?e, "Error playing sound");
                return PlaybackReport {
                    completions,
                    end: PlaybackEnd::Failed,
                };
            }
        }
    }
}

// Recover from lock poison; the map only holds cancel flags.
fn lock_active(
    active: &Mutex<HashMap<i64, ActivePlayback>>,
) -> MutexGuard<'_, HashMap<i64, ActivePlayback>> {
    active.lock().unwrap_or_else(|e| {
        error!("Playback registry lock poisoned, recovering: {}", e);
        e.into_inner()
    })
}
