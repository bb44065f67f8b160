//! CPAL-based audio output for desktop platforms (Linux, macOS, Windows)
//!
//! `cpal::Stream` is not `Send`, so each emitter owns a dedicated thread that
//! opens the stream, plays it, and drops it when the emitter is stopped or
//! reaches its end.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::error::PlaybackError;

use super::{AudioOutput, EmitterId, EmitterRequest};

enum EmitterSignal {
    Stop,
    Finished,
}

/// Output that plays emitters on the default output device
pub struct CpalOutput {
    active: Mutex<HashMap<EmitterId, std_mpsc::Sender<EmitterSignal>>>,
}

impl CpalOutput {
    pub fn new() -> Self {
        Self {
            active: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for CpalOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for CpalOutput {
    fn start(&self, request: EmitterRequest) -> Result<(), PlaybackError> {
        let id = request.id;
        let (signal_tx, signal_rx) = std_mpsc::channel();
        let (ready_tx, ready_rx) = std_mpsc::channel();
        let callback_signal = signal_tx.clone();

        thread::Builder::new()
            .name(format!("emitter-{}", id.0))
            .spawn(move || run_emitter(request, callback_signal, signal_rx, ready_tx))
            .map_err(|e| PlaybackError::PlaybackFailure {
                reason: format!("Failed to spawn emitter thread: {}", e),
            })?;

        ready_rx.recv().map_err(|_| PlaybackError::PlaybackFailure {
            reason: "Emitter thread exited before the stream opened".to_string(),
        })??;

        let mut active = self.active.lock().map_err(|_| PlaybackError::LockPoisoned {
            component: "cpal_output".to_string(),
        })?;
        active.insert(id, signal_tx);
        Ok(())
    }

    fn stop(&self, id: EmitterId) -> Result<(), PlaybackError> {
        let signal = self
            .active
            .lock()
            .map_err(|_| PlaybackError::LockPoisoned {
                component: "cpal_output".to_string(),
            })?
            .remove(&id)
            .ok_or(PlaybackError::NoActiveEmitter)?;

        // The thread may already have exited after finishing
        let _ = signal.send(EmitterSignal::Stop);
        Ok(())
    }
}

fn run_emitter(
    request: EmitterRequest,
    callback_signal: std_mpsc::Sender<EmitterSignal>,
    signal_rx: std_mpsc::Receiver<EmitterSignal>,
    ready_tx: std_mpsc::Sender<Result<(), PlaybackError>>,
) {
    let stream = match open_stream(&request, callback_signal) {
        Ok(stream) => stream,
        Err(err) => {
            let _ = ready_tx.send(Err(err));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(PlaybackError::PlaybackFailure {
            reason: format!("Output start failed: {}", e),
        }));
        return;
    }
    let _ = ready_tx.send(Ok(()));

    // Stop wins over a completion that raced it; either way the stream drops
    if let Ok(EmitterSignal::Finished) = signal_rx.recv() {
        let _ = request.completion.send(request.id);
    }
    drop(stream);
    log::debug!("[CpalOutput] Emitter {} released", request.id.0);
}

fn open_stream(
    request: &EmitterRequest,
    signal: std_mpsc::Sender<EmitterSignal>,
) -> Result<cpal::Stream, PlaybackError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| PlaybackError::PlaybackFailure {
            reason: "No default output device found".to_string(),
        })?;

    let config = device
        .default_output_config()
        .map_err(|e| PlaybackError::PlaybackFailure {
            reason: format!("Failed to get default output config: {:?}", e),
        })?;

    if config.sample_format() != cpal::SampleFormat::F32 {
        return Err(PlaybackError::PlaybackFailure {
            reason: "Only F32 sample format is currently supported for output".to_string(),
        });
    }

    let stream_config: cpal::StreamConfig = config.into();
    let device_channels = stream_config.channels as usize;
    let device_rate = stream_config.sample_rate.0 as f64;

    let track = Arc::clone(&request.track);
    let source_channels = track.channels() as usize;
    let step = track.sample_rate() as f64 / device_rate;
    let mut cursor = track.frame_at(request.offset) as f64;
    let end_frame = track.frame_at(request.end) as f64;
    let finished = AtomicBool::new(false);

    let err_fn = |err| log::warn!("[CpalOutput] Output stream error: {}", err);

    device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let samples = track.samples();
                // data.len() = frames * channels
                for frame in data.chunks_mut(device_channels) {
                    if cursor >= end_frame {
                        frame.fill(0.0);
                        continue;
                    }
                    let base = cursor as usize * source_channels;
                    for (ch, out) in frame.iter_mut().enumerate() {
                        *out = samples[base + ch.min(source_channels - 1)];
                    }
                    cursor += step;
                }

                if cursor >= end_frame && !finished.swap(true, Ordering::Relaxed) {
                    let _ = signal.send(EmitterSignal::Finished);
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| PlaybackError::PlaybackFailure {
            reason: format!("{:?}", e),
        })
}
