//! Real-time backend streaming to a cpal output device.

use std::thread::JoinHandle;

use clarion_core::{Error, OutputSettings, Result};
use crossbeam_channel::{bounded, Sender};
use tracing::{debug, error, info};

use super::AudioBackend;
use crate::clock::Clock;
use crate::mixer::SharedMixer;
use crate::output::{AudioOutput, OutputConfig};

/// Backend driven by a cpal output stream.
///
/// The stream lives on a dedicated thread (cpal streams are not `Send`);
/// the backend keeps the shared clock and mixer and stops the thread on drop.
pub struct CpalBackend {
    clock: Clock,
    mixer: SharedMixer,
    config: OutputConfig,
    device_name: String,
    shutdown_tx: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl CpalBackend {
    /// Open the output device and start rendering.
    pub fn new(settings: &OutputSettings) -> Result<Self> {
        let (ready_tx, ready_rx) = bounded(1);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let settings = settings.clone();

        let thread = std::thread::Builder::new()
            .name("clarion-output".to_string())
            .spawn(move || match AudioOutput::new(&settings) {
                Ok(output) => {
                    let _ = ready_tx.send(Ok((
                        output.clock().clone(),
                        output.mixer().clone(),
                        output.config().clone(),
                        output.device_name().to_string(),
                    )));
                    // Keep the stream alive until the backend is dropped
                    let _ = shutdown_rx.recv();
                    debug!("Output thread shutting down");
                }
                Err(e) => {
                    error!("Failed to initialize audio output: {e}");
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| Error::AudioOutput(format!("Failed to spawn output thread: {e}")))?;

        let (clock, mixer, config, device_name) = ready_rx
            .recv()
            .map_err(|_| Error::AudioOutput("Output thread exited during startup".to_string()))??;

        info!(
            "Audio output initialized: {} Hz, {} channels, device: {}",
            config.sample_rate, config.channels, device_name
        );

        Ok(Self {
            clock,
            mixer,
            config,
            device_name,
            shutdown_tx,
            thread: Some(thread),
        })
    }

    /// Get the output configuration.
    pub const fn config(&self) -> &OutputConfig {
        &self.config
    }

    /// Get the device name.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl AudioBackend for CpalBackend {
    fn clock(&self) -> &Clock {
        &self.clock
    }

    fn mixer(&self) -> &SharedMixer {
        &self.mixer
    }
}

impl Drop for CpalBackend {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
