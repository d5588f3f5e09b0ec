//! Crossfades: opposite linear gain ramps scheduled on the output clock.

use clarion_core::{Error, Result};
use tracing::info;

use crate::context::SoundContext;
use crate::events::SoundEvent;
use crate::graph::{PlaybackGraph, PlaybackHandle};
use crate::param::AudioParam;

/// Time window of a scheduled crossfade, in output clock seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossfadeSchedule {
    pub start: f64,
    pub end: f64,
}

impl CrossfadeSchedule {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// What [`Crossfader::toggle`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum CrossfadeAction {
    /// Neither sound was playing; both were started.
    Started,
    /// Faded `from` out and `to` in.
    Faded {
        from: String,
        to: String,
        schedule: CrossfadeSchedule,
    },
}

#[derive(Debug, Clone)]
pub struct Crossfader {
    graph: PlaybackGraph,
}

impl Crossfader {
    pub const fn new(graph: PlaybackGraph) -> Self {
        Self { graph }
    }

    fn ctx(&self) -> &SoundContext {
        self.graph.context()
    }

    /// Fade `outgoing` to 0 and `incoming` to 1 over the default duration.
    pub fn crossfade(
        &self,
        outgoing: &PlaybackHandle,
        incoming: &PlaybackHandle,
    ) -> Result<CrossfadeSchedule> {
        self.crossfade_over(outgoing, incoming, self.ctx().crossfade_secs())
    }

    /// Fade `outgoing` to 0 and `incoming` to 1 over `duration_secs`,
    /// both ramps starting now from each gain's current value.
    ///
    /// Pending automation on either gain is replaced, so a crossfade issued
    /// mid-ramp continues from wherever the previous one had got to.
    pub fn crossfade_over(
        &self,
        outgoing: &PlaybackHandle,
        incoming: &PlaybackHandle,
        duration_secs: f64,
    ) -> Result<CrossfadeSchedule> {
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "crossfade duration must be positive, got {duration_secs}"
            )));
        }

        let start = self.ctx().now();
        let end = start + duration_secs;
        ramp_from_current(outgoing.gain().gain(), 0.0, start, end);
        ramp_from_current(incoming.gain().gain(), 1.0, start, end);

        info!(
            "Crossfading {} -> {} from {start:.3}s to {end:.3}s",
            outgoing.sound(),
            incoming.sound()
        );
        Ok(CrossfadeSchedule { start, end })
    }

    /// Crossfade between the active graphs of two registered sounds.
    pub fn crossfade_sounds(&self, from: &str, to: &str) -> Result<CrossfadeSchedule> {
        let outgoing = self.active_handle(from)?;
        let incoming = self.active_handle(to)?;
        let schedule = self.crossfade(&outgoing, &incoming)?;

        self.ctx().emit(SoundEvent::CrossfadeScheduled {
            from: from.to_string(),
            to: to.to_string(),
            start: schedule.start,
            end: schedule.end,
        });
        Ok(schedule)
    }

    /// Start both sounds if neither is playing; otherwise fade from the one
    /// with a non-zero gain to the other.
    ///
    /// Starting is all or nothing: if either sound cannot play, neither is
    /// left playing.
    pub fn toggle(&self, a: &str, b: &str) -> Result<CrossfadeAction> {
        let (handle_a, handle_b) = (self.graph.handle(a), self.graph.handle(b));

        if handle_a.is_none() && handle_b.is_none() {
            self.ensure_loaded(a)?;
            self.ensure_loaded(b)?;
            self.graph.play(a)?;
            if let Err(e) = self.graph.play(b) {
                let _ = self.graph.stop(a);
                return Err(e);
            }
            return Ok(CrossfadeAction::Started);
        }

        let a_audible = handle_a.is_some_and(|h| h.gain_value().abs() > f32::EPSILON);
        let (from, to) = if a_audible { (a, b) } else { (b, a) };
        let schedule = self.crossfade_sounds(from, to)?;

        Ok(CrossfadeAction::Faded {
            from: from.to_string(),
            to: to.to_string(),
            schedule,
        })
    }

    fn ensure_loaded(&self, id: &str) -> Result<()> {
        let registry = self.ctx().registry();
        match registry.get(id) {
            Ok(sound) if sound.is_loaded() => Ok(()),
            _ => Err(Error::NotLoaded(id.to_string())),
        }
    }

    fn active_handle(&self, id: &str) -> Result<PlaybackHandle> {
        self.graph.handle(id).map_or_else(
            || {
                if self.ctx().registry().contains(id) {
                    Err(Error::NotPlaying(id.to_string()))
                } else {
                    Err(Error::NotFound(id.to_string()))
                }
            },
            Ok,
        )
    }
}

fn ramp_from_current(param: &AudioParam, target: f32, start: f64, end: f64) {
    let current = param.value_at(start);
    param.cancel_scheduled_values(start);
    param.set_value_at_time(current, start);
    param.linear_ramp_to_value_at_time(target, end);
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Arc;

    use super::*;
    use crate::backend::OfflineBackend;
    use crate::buffer::AudioBuffer;
    use crate::fetch::Fetcher;
    use clarion_core::{AudioFormat, PlaybackPhase, SoundDescriptor};

    const RATE: u32 = 1000;

    fn setup() -> (Crossfader, Arc<OfflineBackend>) {
        let backend = Arc::new(OfflineBackend::new(RATE, 1));
        let ctx = SoundContext::new(backend.clone(), Fetcher::memory(), AudioFormat::Wav);
        for (id, volume) in [("battle", 1.0), ("eclipse", 0.0)] {
            let mut registry = ctx.registry();
            registry
                .register(
                    SoundDescriptor::new(id, format!("audio/{id}"))
                        .with_volume(volume)
                        .with_loop(true)
                        .with_group("music"),
                )
                .unwrap();
            registry
                .get_mut(id)
                .unwrap()
                .set_buffer(AudioBuffer::new(vec![0.1; 200], RATE, 1).unwrap());
        }
        (Crossfader::new(PlaybackGraph::new(ctx)), backend)
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_crossfade_reaches_targets() {
        let (fader, backend) = setup();
        let battle = fader.graph.play("battle").unwrap();
        let eclipse = fader.graph.play("eclipse").unwrap();
        backend.advance(1.0);

        let schedule = fader.crossfade(&battle, &eclipse).unwrap();
        assert!((schedule.start - 1.0).abs() < 1e-9);
        assert!((schedule.duration() - 3.0).abs() < 1e-9);

        let gain_a = battle.gain().gain();
        let gain_b = eclipse.gain().gain();
        assert!(close(gain_a.value_at(schedule.start), 1.0));
        assert!(close(gain_b.value_at(schedule.start), 0.0));
        assert!(close(gain_a.value_at(2.5), 0.5));
        assert!(close(gain_b.value_at(2.5), 0.5));

        backend.advance(3.1);
        assert!(close(battle.gain_value(), 0.0));
        assert!(close(eclipse.gain_value(), 1.0));
    }

    #[test]
    fn test_crossfade_mid_ramp_starts_from_current() {
        let (fader, backend) = setup();
        let battle = fader.graph.play("battle").unwrap();
        let eclipse = fader.graph.play("eclipse").unwrap();

        fader.crossfade_over(&battle, &eclipse, 2.0).unwrap();
        backend.advance(0.5);
        assert!(close(battle.gain_value(), 0.75));

        let schedule = fader.crossfade_over(&eclipse, &battle, 1.0).unwrap();
        assert!(close(battle.gain().gain().value_at(schedule.start), 0.75));
        assert!(close(eclipse.gain().gain().value_at(schedule.start), 0.25));

        backend.advance(1.1);
        assert!(close(battle.gain_value(), 1.0));
        assert!(close(eclipse.gain_value(), 0.0));
    }

    #[test]
    fn test_crossfade_rejects_bad_duration() {
        let (fader, _) = setup();
        let battle = fader.graph.play("battle").unwrap();
        let eclipse = fader.graph.play("eclipse").unwrap();
        assert!(fader.crossfade_over(&battle, &eclipse, 0.0).is_err());
        assert!(fader.crossfade_over(&battle, &eclipse, f64::NAN).is_err());
    }

    #[test]
    fn test_crossfade_sounds_requires_playing() {
        let (fader, _) = setup();
        fader.graph.play("battle").unwrap();
        assert!(matches!(
            fader.crossfade_sounds("battle", "eclipse"),
            Err(Error::NotPlaying(_))
        ));
        assert!(matches!(
            fader.crossfade_sounds("battle", "nyan"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_toggle_starts_then_alternates() {
        let (fader, backend) = setup();
        assert_eq!(
            fader.toggle("battle", "eclipse").unwrap(),
            CrossfadeAction::Started
        );

        match fader.toggle("battle", "eclipse").unwrap() {
            CrossfadeAction::Faded { from, to, .. } => {
                assert_eq!((from.as_str(), to.as_str()), ("battle", "eclipse"));
            }
            CrossfadeAction::Started => panic!("expected a fade"),
        }

        backend.advance(3.5);
        match fader.toggle("battle", "eclipse").unwrap() {
            CrossfadeAction::Faded { from, to, .. } => {
                assert_eq!((from.as_str(), to.as_str()), ("eclipse", "battle"));
            }
            CrossfadeAction::Started => panic!("expected a fade"),
        }
    }

    #[test]
    fn test_toggle_start_is_all_or_nothing() {
        let (fader, backend) = setup();
        fader
            .ctx()
            .registry()
            .register(SoundDescriptor::new("nyan", "audio/nyan").with_loop(true))
            .unwrap();

        for (a, b) in [("battle", "nyan"), ("nyan", "battle"), ("battle", "unknown")] {
            let err = fader.toggle(a, b).unwrap_err();
            assert!(matches!(err, Error::NotLoaded(_)));
            assert!(fader.graph.handle("battle").is_none());
            assert_eq!(fader.graph.phase("battle").unwrap(), PlaybackPhase::Idle);
        }
        assert_eq!(backend.active_voices(), 0);
    }
}
