//! Fire-and-forget audio/VFX cues emitted by the gauntlet.

use crossbeam_channel::Sender;
use serde::Serialize;

use super::backend::ObjectId;
use super::grab::CollisionPolicy;
use super::manager::Mode;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum GauntletEffect {
    /// Grab cue and grab emission on
    GrabStarted { object: ObjectId },
    /// Grab emission off
    GrabEnded { object: ObjectId },
    /// Grace delay elapsed: collisions of the held object now get a reaction
    CollisionArmed { object: ObjectId },
    /// Mode switch cue and mode emission swap
    ModeSwitched { mode: Mode },
    /// Push cue
    ObjectThrown { object: ObjectId, impulse: [f32; 3] },
    /// Teleport cue at the destination
    Teleported { position: [f32; 3] },
    CollisionReaction {
        object: ObjectId,
        policy: CollisionPolicy,
    },
    /// Crosshair sprite swap
    CrosshairChanged { in_range: bool },
    /// A respawn area reset an object
    Respawned { object: ObjectId },
}

/// Receiver of gauntlet cues. The gauntlet never waits on a sink.
pub trait EffectSink {
    fn emit(&mut self, effect: GauntletEffect);
}

impl EffectSink for Vec<GauntletEffect> {
    fn emit(&mut self, effect: GauntletEffect) {
        self.push(effect);
    }
}

impl EffectSink for Sender<GauntletEffect> {
    fn emit(&mut self, effect: GauntletEffect) {
        // Nobody listening is fine.
        let _ = self.send(effect);
    }
}

/// Sends every cue to both sinks.
impl<A: EffectSink, B: EffectSink> EffectSink for (A, B) {
    fn emit(&mut self, effect: GauntletEffect) {
        self.0.emit(effect.clone());
        self.1.emit(effect);
    }
}

/// Logs every cue at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EffectSink for TracingSink {
    fn emit(&mut self, effect: GauntletEffect) {
        tracing::debug!(target: "gauntlet::effects", ?effect, "effect");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_ignores_disconnected_receiver() {
        let (mut tx, rx) = crossbeam_channel::unbounded::<GauntletEffect>();
        tx.emit(GauntletEffect::GrabStarted { object: 1 });
        assert_eq!(rx.try_recv().unwrap(), GauntletEffect::GrabStarted { object: 1 });
        drop(rx);
        tx.emit(GauntletEffect::GrabEnded { object: 1 });
    }

    #[test]
    fn test_pair_sink_forwards_to_both() {
        let mut sink: (Vec<GauntletEffect>, TracingSink) = (Vec::new(), TracingSink);
        sink.emit(GauntletEffect::Respawned { object: 3 });
        assert_eq!(sink.0, vec![GauntletEffect::Respawned { object: 3 }]);

        let (tx, rx) = crossbeam_channel::unbounded::<GauntletEffect>();
        let mut sink = (tx, Vec::<GauntletEffect>::new());
        sink.emit(GauntletEffect::GrabEnded { object: 2 });
        assert_eq!(rx.try_recv().unwrap(), GauntletEffect::GrabEnded { object: 2 });
        assert_eq!(sink.1, vec![GauntletEffect::GrabEnded { object: 2 }]);
    }

    #[test]
    fn test_effect_serializes_with_tag() {
        let json = serde_json::to_string(&GauntletEffect::ModeSwitched { mode: Mode::Teleport }).unwrap();
        assert_eq!(json, r#"{"effect":"mode_switched","mode":"teleport"}"#);
    }
}
