//! Sine tones on the default output device via cpal.

use super::ToneOutput;
use crate::error::{AppError, AppResult};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::StreamConfig;
use std::f32::consts::TAU;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info};

const AMPLITUDE: f32 = 0.3;

/// What the output callback is currently rendering.
#[derive(Debug, Default)]
struct ToneState {
    frequency_hz: f32,
    /// Frames left in the current tone; zero means silence
    remaining: u64,
    /// Position in the current cycle, 0.0..1.0
    phase: f32,
}

impl ToneState {
    fn start(&mut self, frequency_hz: f32, duration: Duration, sample_rate: u32) {
        self.frequency_hz = frequency_hz;
        self.remaining = (duration.as_secs_f64() * f64::from(sample_rate)) as u64;
        self.phase = 0.0;
    }

    fn silence(&mut self) {
        self.remaining = 0;
    }

    /// Render interleaved frames, the same sample on every channel.
    fn fill(&mut self, data: &mut [f32], channels: usize, sample_rate: u32) {
        let step = self.frequency_hz / sample_rate as f32;
        for frame in data.chunks_mut(channels.max(1)) {
            let sample = if self.remaining > 0 {
                self.remaining -= 1;
                let value = (self.phase * TAU).sin() * AMPLITUDE;
                self.phase = (self.phase + step).fract();
                value
            } else {
                0.0
            };
            frame.fill(sample);
        }
    }
}

/// Speaker output. The cpal stream lives on its own thread for as long as the
/// speaker exists; tones are switched on and off through shared state, so
/// `silence` takes effect on the next audio buffer.
pub struct Speaker {
    state: Arc<Mutex<ToneState>>,
    sample_rate: u32,
    _shutdown: mpsc::Sender<()>,
}

impl Speaker {
    /// Open the default output device.
    ///
    /// # Errors
    ///
    /// Returns an audio error if there is no output device or the stream
    /// cannot be started.
    pub fn open() -> AppResult<Self> {
        let state = Arc::new(Mutex::new(ToneState::default()));
        let (ready_tx, ready_rx) = mpsc::channel::<AppResult<u32>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let stream_state = Arc::clone(&state);
        std::thread::Builder::new()
            .name("tone-output".into())
            .spawn(move || match build_stream(stream_state) {
                Ok((stream, sample_rate)) => {
                    let _ = ready_tx.send(Ok(sample_rate));
                    // returns once the speaker is dropped
                    let _ = shutdown_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| AppError::audio(format!("cannot start audio thread: {e}")))?;

        let sample_rate = ready_rx
            .recv()
            .map_err(|_| AppError::audio("audio thread exited during setup"))??;

        Ok(Self {
            state,
            sample_rate,
            _shutdown: shutdown_tx,
        })
    }
}

fn build_stream(state: Arc<Mutex<ToneState>>) -> AppResult<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AppError::audio("no default output device"))?;

    let device_name = device
        .description()
        .map(|d| d.name().to_owned())
        .unwrap_or_else(|_| "<unknown>".into());
    info!("using output device: {device_name}");

    let default_config = device
        .default_output_config()
        .map_err(|e| AppError::audio(format!("no default output config: {e}")))?;
    let sample_rate = default_config.sample_rate();
    let channels = usize::from(default_config.channels());

    let stream_config = StreamConfig {
        channels: default_config.channels(),
        sample_rate,
        buffer_size: cpal::BufferSize::Default,
    };

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| match state.lock() {
                Ok(mut tone) => tone.fill(data, channels, sample_rate),
                Err(_) => data.fill(0.0),
            },
            move |err| {
                error!("audio output stream error: {err}");
            },
            None,
        )
        .map_err(|e| AppError::audio(format!("failed to build output stream: {e}")))?;

    stream
        .play()
        .map_err(|e| AppError::audio(format!("failed to start output stream: {e}")))?;

    Ok((stream, sample_rate))
}

impl ToneOutput for Speaker {
    fn start_tone(&self, frequency_hz: f32, duration: Duration) {
        if let Ok(mut tone) = self.state.lock() {
            tone.start(frequency_hz, duration, self.sample_rate);
        }
    }

    fn silence(&self) {
        if let Ok(mut tone) = self.state.lock() {
            tone.silence();
        }
    }
}
