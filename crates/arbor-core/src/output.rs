//! CPAL output backend.

use crate::backend::OutputBackend;
use crate::config::SessionConfig;
use crate::lockfree::AtomicFlag;
use crate::pcm;
use crate::stream::MasterStream;
use crate::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

const HANDOFF_TIMEOUT: Duration = Duration::from_secs(1);

/// Wrapper to hold a `cpal::Stream` in a `Send` context.
///
/// `cpal::Stream` is `!Send` due to platform internals. The backend is only
/// driven from one control thread at a time (the engine keeps it behind a
/// mutex), and the stream is dropped by whichever thread calls `stop`.
struct StreamHandle(#[allow(dead_code)] cpal::Stream);

// SAFETY: see `StreamHandle`. Never accessed concurrently.
unsafe impl Send for StreamHandle {}

struct Running {
    _stream: StreamHandle,
    halt: Arc<AtomicFlag>,
    intake: Sender<MasterStream>,
    reclaim: Receiver<MasterStream>,
    handoff: Receiver<MasterStream>,
}

/// Plays the master stream on a hardware output device.
///
/// The device callback size is independent of the session block size; a
/// small carry buffer renders whole session blocks and feeds the device
/// whatever it asks for. Until a stream is attached the device plays silence.
pub struct CpalBackend {
    device_index: Option<usize>,
    running: Option<Running>,
}

impl CpalBackend {
    /// `None` selects the host's default output device.
    pub fn new(device_index: Option<usize>) -> Self {
        Self {
            device_index,
            running: None,
        }
    }

    pub fn set_device(&mut self, index: Option<usize>) {
        self.device_index = index;
    }

    pub fn device_name(&self) -> Result<String> {
        Ok(get_device(self.device_index)?.name()?)
    }

    pub fn list_devices() -> Result<Vec<String>> {
        cpal::default_host()
            .output_devices()?
            .enumerate()
            .map(|(i, d)| Ok(format!("{i}: {}", d.name()?)))
            .collect()
    }
}

impl OutputBackend for CpalBackend {
    fn name(&self) -> &str {
        "cpal"
    }

    fn open(&mut self, session: &SessionConfig) -> Result<()> {
        if self.running.is_some() {
            return Err(Error::StreamRunning);
        }

        let device = get_device(self.device_index)?;
        let supported = device.default_output_config()?;
        if supported.sample_rate().0 != session.sample_rate {
            tracing::warn!(
                device_rate = supported.sample_rate().0,
                session_rate = session.sample_rate,
                "device default rate differs from session rate"
            );
        }
        let config = cpal::StreamConfig {
            channels: session.num_outputs as u16,
            sample_rate: cpal::SampleRate(session.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let halt = Arc::new(AtomicFlag::new(false));
        let (intake_tx, intake_rx) = crossbeam_channel::bounded(1);
        let (handoff_tx, handoff_rx) = crossbeam_channel::bounded(1);
        let state = CallbackState {
            stream: None,
            intake: intake_rx.clone(),
            adapter: BlockAdapter::new(session.bytes_per_block()),
            halt: halt.clone(),
            handoff: handoff_tx,
        };

        let cpal_stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, state)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, state)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, state)?,
            format => {
                return Err(Error::InvalidConfig(format!(
                    "Unsupported sample format: {format:?}"
                )));
            }
        };
        cpal_stream.play()?;

        tracing::info!(device = ?device.name().ok(), "cpal output opened");
        self.running = Some(Running {
            _stream: StreamHandle(cpal_stream),
            halt,
            intake: intake_tx,
            reclaim: intake_rx,
            handoff: handoff_rx,
        });
        Ok(())
    }

    fn attach(&mut self, stream: MasterStream) -> std::result::Result<(), MasterStream> {
        match &self.running {
            Some(running) => running.intake.try_send(stream).map_err(|e| e.into_inner()),
            None => Err(stream),
        }
    }

    fn stop(&mut self) -> Result<MasterStream> {
        let running = self.running.take().ok_or(Error::StreamStopped)?;
        running.halt.set(true);
        let stream = running
            .handoff
            .recv_timeout(HANDOFF_TIMEOUT)
            .ok()
            .or_else(|| running.reclaim.try_recv().ok());
        drop(running);
        let Some(mut stream) = stream else {
            tracing::error!(timeout = ?HANDOFF_TIMEOUT, "audio callback never returned the master stream");
            return Err(Error::HandoffTimeout);
        };
        stream.stop();
        tracing::info!("cpal output stopped");
        Ok(stream)
    }

    fn is_running(&self) -> bool {
        self.running.is_some()
    }
}

fn get_device(index: Option<usize>) -> Result<cpal::Device> {
    let host = cpal::default_host();

    match index {
        Some(i) => {
            let devices: Vec<_> = host.output_devices()?.collect();
            let count = devices.len();
            devices.into_iter().nth(i).ok_or_else(|| {
                Error::InvalidDevice(format!("Device index {i} out of range ({count} available)"))
            })
        }
        None => host
            .default_output_device()
            .ok_or_else(|| Error::InvalidDevice("No output device available".into())),
    }
}

/// Everything the device callback owns.
struct CallbackState {
    stream: Option<MasterStream>,
    intake: Receiver<MasterStream>,
    adapter: BlockAdapter,
    halt: Arc<AtomicFlag>,
    handoff: Sender<MasterStream>,
}

/// Carries rendered session blocks across device callbacks of any size.
struct BlockAdapter {
    bytes: Vec<u8>,
    samples: Vec<i16>,
    cursor: usize,
}

impl BlockAdapter {
    fn new(block_bytes: usize) -> Self {
        let samples = vec![0; block_bytes / pcm::BYTES_PER_SAMPLE];
        Self {
            bytes: vec![0; block_bytes],
            cursor: samples.len(),
            samples,
        }
    }

    #[inline]
    fn fill<T: cpal::SizedSample + cpal::FromSample<i16>>(
        &mut self,
        stream: &mut MasterStream,
        data: &mut [T],
    ) {
        for sample in data.iter_mut() {
            if self.cursor >= self.samples.len() {
                if stream.process_block(&mut self.bytes) == 0 {
                    self.bytes.fill(0);
                }
                for (dst, value) in self.samples.iter_mut().zip(pcm::read_interleaved(&self.bytes)) {
                    *dst = value;
                }
                self.cursor = 0;
            }
            *sample = T::from_sample(self.samples[self.cursor]);
            self.cursor += 1;
        }
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut state: CallbackState,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample + cpal::FromSample<i16>,
{
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            if state.halt.get() {
                if let Some(stream) = state.stream.take().or_else(|| state.intake.try_recv().ok()) {
                    let _ = state.handoff.try_send(stream);
                }
                output_silence(data);
                return;
            }
            if state.stream.is_none() {
                state.stream = state.intake.try_recv().ok();
            }

            let Some(stream) = state.stream.as_mut() else {
                output_silence(data);
                return;
            };
            let adapter = &mut state.adapter;
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                adapter.fill(stream, data);
            }));

            if result.is_err() {
                output_silence(data);
            }
        },
        |err| tracing::error!(%err, "output stream error"),
        None,
    )?;

    Ok(stream)
}

/// Output silence (halt and panic recovery).
#[inline]
fn output_silence<T: cpal::SizedSample + cpal::FromSample<i16>>(data: &mut [T]) {
    for sample in data.iter_mut() {
        *sample = T::from_sample(0i16);
    }
}
