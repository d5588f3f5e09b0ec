//! Subcommand implementations.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clarion_audio::output::{default_device_name, list_output_devices};
use clarion_audio::{
    AudioBackend, CpalBackend, CrossfadeAction, Crossfader, Loader, OfflineBackend,
    PlaybackGraph, PlaybackHandle, SoundContext, SoundEvent,
};
use clarion_core::{AssetRoot, ClarionConfig, Error};
use tracing::{debug, info, warn};

use crate::cli::Cli;

const DEMO_MANIFEST: &str = include_str!("../assets/demo.json");
const OFFLINE_SAMPLE_RATE: u32 = 48000;

/// Everything a subcommand needs, built once from the CLI flags.
pub struct Session {
    ctx: SoundContext,
    loader: Loader,
    graph: PlaybackGraph,
    fader: Crossfader,
    offline: Option<Arc<OfflineBackend>>,
}

impl Session {
    pub fn open(cli: &Cli) -> Result<Self> {
        let config = build_config(cli)?;

        let mut offline = None;
        let backend: Arc<dyn AudioBackend> = if cli.offline {
            let backend = Arc::new(OfflineBackend::new(OFFLINE_SAMPLE_RATE, 2));
            offline = Some(backend.clone());
            backend
        } else {
            let backend =
                CpalBackend::new(&config.output).context("Failed to open audio output")?;
            info!(
                "Output: {} ({} Hz)",
                backend.device_name(),
                backend.config().sample_rate
            );
            Arc::new(backend)
        };

        let ctx = SoundContext::from_config(&config, backend)?;
        let graph = PlaybackGraph::new(ctx.clone());
        Ok(Self {
            loader: Loader::new(ctx.clone()),
            fader: Crossfader::new(graph.clone()),
            graph,
            ctx,
            offline,
        })
    }

    /// Let the clock run for `secs`: real time on a device, rendered
    /// instantly offline.
    async fn wait(&self, secs: f64) {
        match &self.offline {
            Some(backend) => {
                let out = backend.advance(secs);
                let peak = out.iter().fold(0.0f32, |peak, s| peak.max(s.abs()));
                info!("Rendered {secs:.2}s offline (peak {peak:.3})");
            }
            None => tokio::time::sleep(Duration::from_secs_f64(secs.max(0.0))).await,
        }
    }

    /// Load `ids` together and report each outcome. Returns how many loaded.
    async fn load(&self, ids: Vec<String>) -> usize {
        let results = self.loader.load_all(ids).join().await;
        let mut loaded = 0;
        for (id, result) in results {
            match result {
                Ok(report) => {
                    loaded += 1;
                    println!(
                        "  loaded  {id:<16} {:>8} bytes  {:>6.2}s  {}",
                        report.bytes, report.duration_secs, report.url
                    );
                }
                Err(e) => println!("  failed  {id:<16} {e}"),
            }
        }
        self.report_events();
        loaded
    }

    fn play(&self, id: &str) -> bool {
        match self.graph.play(id) {
            Ok(handle) => {
                println!("  playing {id} (gain {:.2})", handle.gain_value());
                true
            }
            Err(Error::NotLoaded(_)) => {
                println!("  {id} is not loaded yet");
                false
            }
            Err(e) => {
                warn!("Could not play {id}: {e}");
                false
            }
        }
    }

    /// Like [`PlaybackGraph::play_or_unmute`], but a sound that cannot play
    /// yet is reported and yields `None` instead of an error.
    fn play_or_unmute(&self, id: &str) -> Result<Option<PlaybackHandle>> {
        match self.graph.play_or_unmute(id) {
            Ok(handle) => Ok(Some(handle)),
            Err(e) if e.is_precondition() => {
                println!("  {id} is not loaded yet");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Drain the context's event queue. Crossfade schedules are printed,
    /// everything is logged at debug level.
    pub fn report_events(&self) {
        while let Some(event) = self.ctx.try_recv_event() {
            debug!("Event: {event:?}");
            if let SoundEvent::CrossfadeScheduled {
                from,
                to,
                start,
                end,
            } = event
            {
                println!("  crossfade {from} -> {to} scheduled {start:.2}s..{end:.2}s");
            }
        }
    }
}

fn build_config(cli: &Cli) -> Result<ClarionConfig> {
    let mut config = ClarionConfig::load_or_default(cli.config.as_deref())?;
    if config.sounds.is_empty() {
        info!("No sounds configured, using the bundled demo manifest");
        let demo = ClarionConfig::from_json(DEMO_MANIFEST)?;
        config.sounds = demo.sounds;
    }
    if let Some(assets) = &cli.assets {
        config.assets = AssetRoot::parse(assets)?;
    }
    if let Some(format) = cli.format {
        config.format = Some(format);
    }
    Ok(config)
}

pub fn devices() -> Result<()> {
    let default = default_device_name();
    let devices = list_output_devices()?;
    if devices.is_empty() {
        println!("No output devices found");
    }
    for name in devices {
        let marker = if default.as_deref() == Some(name.as_str()) { "*" } else { " " };
        println!("{marker} {name}");
    }
    Ok(())
}

pub async fn load(session: &Session, ids: Vec<String>, group: Option<String>) -> Result<()> {
    let ids = match group {
        Some(group) => session.ctx.registry().group(&group),
        None if ids.is_empty() => session.ctx.registry().ids(),
        None => ids,
    };
    println!("Loading {} sounds as .{}", ids.len(), session.ctx.format());
    let total = ids.len();
    let loaded = session.load(ids).await;
    println!("{loaded}/{total} loaded");
    Ok(())
}

pub async fn play(
    session: &Session,
    ids: Vec<String>,
    volume: Option<f32>,
    looping: bool,
    seconds: f64,
) -> Result<()> {
    if looping {
        let mut registry = session.ctx.registry();
        for id in &ids {
            let mut descriptor = registry.get(id)?.descriptor().clone();
            descriptor.looping = true;
            registry.register(descriptor)?;
        }
    }

    session.load(ids.clone()).await;

    for id in &ids {
        if let Some(volume) = volume {
            session.graph.set_volume(id, volume)?;
        }
        session.play(id);
    }

    session.wait(seconds).await;
    for id in &ids {
        if session.graph.stop(id).is_ok() {
            println!("  stopped {id}");
        }
    }
    Ok(())
}

pub async fn crossfade(
    session: &Session,
    from: &str,
    to: &str,
    duration: Option<f64>,
) -> Result<()> {
    let duration = duration.unwrap_or_else(|| session.ctx.crossfade_secs());
    session.load(vec![from.to_string(), to.to_string()]).await;

    let Some(outgoing) = session.play_or_unmute(from)? else {
        return Ok(());
    };
    let Some(incoming) = session.play_or_unmute(to)? else {
        session.graph.stop(from)?;
        return Ok(());
    };
    incoming.gain().gain().set_value(0.0);
    session.wait(1.0).await;

    let schedule = session
        .fader
        .crossfade_over(&outgoing, &incoming, duration)?;
    println!(
        "  {from} -> {to} over {:.1}s ({:.2}s..{:.2}s)",
        schedule.duration(),
        schedule.start,
        schedule.end
    );

    session.wait(duration + 0.5).await;
    println!(
        "  gains now: {from} {:.2}, {to} {:.2}",
        outgoing.gain_value(),
        incoming.gain_value()
    );

    session.graph.stop(from)?;
    session.graph.stop(to)?;
    Ok(())
}

/// Run through the manifest's examples in order: one-shot effects, loops
/// muted as a group, the crossfading music pair, then the nyan loop.
pub async fn demo(session: &Session) -> Result<()> {
    let ids = session.ctx.registry().ids();
    println!("Loading {} sounds as .{}", ids.len(), session.ctx.format());
    session.load(ids).await;

    let sfx = session.ctx.registry().group("sfx");
    if !sfx.is_empty() {
        println!("Sound effects");
        for id in &sfx {
            session.play(id);
            session.wait(0.8).await;
        }
    }

    let loops = session.ctx.registry().group("loops");
    if !loops.is_empty() {
        println!("Loops");
        for id in &loops {
            session.play(id);
        }
        session.wait(2.0).await;
        println!("  muted {} loops", session.graph.mute_group("loops"));
        for id in &loops {
            let _ = session.graph.stop(id);
        }
    }

    let music = session.ctx.registry().group("music");
    if let [a, b] = music.as_slice() {
        println!("Crossfade");
        let secs = session.ctx.crossfade_secs();
        for _ in 0..3 {
            match session.fader.toggle(a, b) {
                Ok(CrossfadeAction::Started) => println!("  started {a} and {b}"),
                Ok(CrossfadeAction::Faded { .. }) => session.report_events(),
                Err(e) => {
                    println!("  crossfade unavailable: {e}");
                    break;
                }
            }
            session.wait(secs + 0.5).await;
        }
        for id in [a, b] {
            let _ = session.graph.stop(id);
        }
    }

    if session.ctx.registry().contains("nyan") {
        println!("Nyan");
        if session.play("nyan") {
            session.wait(2.0).await;
            session.graph.mute("nyan")?;
            println!("  muted nyan");
            session.wait(0.5).await;
            session.graph.play_or_unmute("nyan")?;
            println!("  unmuted nyan");
            session.wait(2.0).await;
            session.graph.stop("nyan")?;
        }
    }

    Ok(())
}
