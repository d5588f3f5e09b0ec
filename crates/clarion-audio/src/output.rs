//! Audio output using cpal.

use crate::clock::Clock;
use crate::mixer::{Mixer, SharedMixer};
use clarion_core::{Error, OutputSettings, Result};
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    BufferSize, Device, SampleFormat, Stream, StreamConfig,
};
use tracing::{debug, error, info};

/// Audio output stream configuration.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub buffer_size: Option<u32>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
            buffer_size: None,
        }
    }
}

/// Audio output stream wrapper.
///
/// Owns the cpal stream, which pulls frames from a [`Mixer`] on the
/// device's callback thread. `cpal::Stream` is not `Send`, so this value
/// must stay on the thread that created it.
pub struct AudioOutput {
    _stream: Stream,
    config: OutputConfig,
    device_name: String,
    clock: Clock,
    mixer: SharedMixer,
}

impl AudioOutput {
    /// Open the configured device (or the host default) and start streaming.
    pub fn new(settings: &OutputSettings) -> Result<Self> {
        let host = cpal::default_host();

        let device = match &settings.device {
            Some(name) => host
                .output_devices()
                .map_err(|e| Error::AudioOutput(format!("Failed to list devices: {e}")))?
                .find(|d| d.name().ok().as_deref() == Some(name.as_str()))
                .ok_or_else(|| Error::AudioOutput(format!("Output device not found: {name}")))?,
            None => host
                .default_output_device()
                .ok_or_else(|| Error::AudioOutput("No output device found".to_string()))?,
        };

        Self::with_device(device, settings.buffer_size)
    }

    /// Start streaming on a specific device.
    #[allow(clippy::needless_pass_by_value)] // Device is typically moved
    pub fn with_device(device: Device, buffer_size: Option<u32>) -> Result<Self> {
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Using audio output device: {device_name}");

        let supported_config = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("Failed to get output config: {e}")))?;

        debug!("Supported output config: {:?}", supported_config);

        let sample_format = supported_config.sample_format();
        let mut config: StreamConfig = supported_config.into();
        if let Some(frames) = buffer_size {
            config.buffer_size = BufferSize::Fixed(frames);
        }

        let output_config = OutputConfig {
            sample_rate: config.sample_rate.0,
            channels: config.channels,
            buffer_size,
        };

        debug!(
            "Output config: {}Hz, {} channels",
            output_config.sample_rate, output_config.channels
        );

        let clock = Clock::new(output_config.sample_rate);
        let mixer = Mixer::shared(clock.clone(), output_config.channels);

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(&device, &config, mixer.clone())?,
            SampleFormat::I16 => Self::build_stream::<i16>(&device, &config, mixer.clone())?,
            SampleFormat::U16 => Self::build_stream::<u16>(&device, &config, mixer.clone())?,
            _ => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {sample_format:?}"
                )));
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {e}")))?;

        Ok(Self {
            _stream: stream,
            config: output_config,
            device_name,
            clock,
            mixer,
        })
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &Device,
        config: &StreamConfig,
        mixer: SharedMixer,
    ) -> Result<Stream> {
        let err_fn = |err| {
            error!("Audio stream error: {err}");
        };

        let mut scratch: Vec<f32> = Vec::new();

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    scratch.resize(data.len(), 0.0);
                    mixer.lock().render(&mut scratch);

                    for (sample, mixed) in data.iter_mut().zip(&scratch) {
                        // Soft clipping: gains above unity are allowed
                        let limited = if mixed.abs() > 0.9 { mixed.tanh() } else { *mixed };
                        *sample = T::from_sample(limited);
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {e}")))?;

        Ok(stream)
    }

    /// Get the output configuration.
    pub const fn config(&self) -> &OutputConfig {
        &self.config
    }

    /// Get the device name.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Clock driven by this stream.
    pub const fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Mixer feeding this stream.
    pub const fn mixer(&self) -> &SharedMixer {
        &self.mixer
    }
}

/// List available output devices.
pub fn list_output_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();

    let devices: Vec<String> = host
        .output_devices()
        .map_err(|e| Error::AudioOutput(format!("Failed to list devices: {e}")))?
        .filter_map(|d| d.name().ok())
        .collect();

    Ok(devices)
}

/// Get the default output device name.
pub fn default_device_name() -> Option<String> {
    let host = cpal::default_host();
    host.default_output_device().and_then(|d| d.name().ok())
}
