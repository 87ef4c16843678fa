use crate::{CoreError, CoreResult};

use std::{
    fs::File,
    io::BufReader,
    panic::Location,
    path::Path,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use error_location::ErrorLocation;
use rodio::{Decoder, OutputStream, Sink};
use tracing::{debug, instrument};

/// How often an in-flight pass checks the cancel flag.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How a single pass over a sound file ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The file played to its natural end.
    Completed,
    /// The cancel flag was raised before the end.
    Cancelled,
}

/// Device-facing half of playback: plays one file once, blocking.
pub trait AudioOutput: Send + Sync + 'static {
    /// Play `path` from the beginning at `volume` until it ends or `cancel`
    /// is raised.
    fn play_to_end(&self, path: &Path, volume: f32, cancel: &AtomicBool)
    -> CoreResult<PlayOutcome>;
}

/// [`AudioOutput`] on the default output device via rodio.
///
/// `OutputStream` is `!Send`, so the stream is opened on the calling
/// thread for every pass and dropped when the pass ends.
#[derive(Debug, Default, Clone, Copy)]
pub struct RodioOutput;

impl AudioOutput for RodioOutput {
    #[instrument(skip(self, cancel))]
    fn play_to_end(
        &self,
        path: &Path,
        volume: f32,
        cancel: &AtomicBool,
    ) -> CoreResult<PlayOutcome> {
        let (_stream, stream_handle) =
            OutputStream::try_default().map_err(|e| CoreError::AudioDevice {
                reason: format!("Failed to open output stream: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let file = File::open(path).map_err(|e| CoreError::AudioDecode {
            reason: format!("Failed to open {}: {}", path.display(), e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let source = Decoder::new(BufReader::new(file)).map_err(|e| CoreError::AudioDecode {
            reason: format!("Failed to decode {}: {}", path.display(), e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let sink = Sink::try_new(&stream_handle).map_err(|e| CoreError::AudioDevice {
            reason: format!("Failed to create sink: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        sink.set_volume(volume);
        sink.append(source);

        while !sink.empty() {
            if cancel.load(Ordering::Acquire) {
                sink.stop();
                debug!(path = %path.display(), "Playback pass cancelled");
                return Ok(PlayOutcome::Cancelled);
            }
            std::thread::sleep(CANCEL_POLL_INTERVAL);
        }

        Ok(PlayOutcome::Completed)
    }
}
