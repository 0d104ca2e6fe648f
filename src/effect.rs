use std::collections::VecDeque;

/// Which transition an effect records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    /// A thread died here.
    Pulse,
    /// A forward-running thread died here.
    FallForward,
    /// A reversed thread died here.
    FallReverse,
    /// A cell was written by COPY, or a SPAWN cell expired.
    Zoom,
}

impl EffectKind {
    /// How long the effect stays queued, in milliseconds.
    pub fn life_span(self) -> u32 {
        match self {
            EffectKind::Pulse | EffectKind::FallForward | EffectKind::FallReverse => 1000,
            EffectKind::Zoom => 500,
        }
    }

    /// Drawing layer; lower values are drawn first.
    pub fn render_order(self) -> u8 {
        match self {
            EffectKind::Pulse => 1,
            EffectKind::FallForward | EffectKind::FallReverse => 2,
            EffectKind::Zoom => 3,
        }
    }
}

/// A transient visual event. Plain data: how it is drawn is up to the
/// renderer (see `view::sprite`).
///
/// Two effects are equal when kind, position and progress all match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Effect {
    pub kind: EffectKind,
    pub ip: usize,
    /// Milliseconds since the effect was queued.
    pub progress: u32,
}

impl Effect {
    pub fn new(kind: EffectKind, ip: usize) -> Self {
        Self {
            kind,
            ip,
            progress: 0,
        }
    }

    pub fn life_span(&self) -> u32 {
        self.kind.life_span()
    }

    pub fn render_order(&self) -> u8 {
        self.kind.render_order()
    }

    pub fn is_expired(&self) -> bool {
        self.progress > self.life_span()
    }

    /// Progress as a fraction of the life span, clamped to `[0, 1]`.
    pub fn fraction(&self) -> f32 {
        (self.progress as f32 / self.life_span() as f32).min(1.0)
    }
}

/// Queue of live effects. Newest first; duplicates are dropped on insert.
#[derive(Debug, Default, Clone)]
pub struct EffectQueue {
    effects: VecDeque<Effect>,
}

impl EffectQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an effect at the front. Returns false when an equal effect is
    /// already queued.
    pub fn push(&mut self, effect: Effect) -> bool {
        if self.effects.contains(&effect) {
            return false;
        }
        self.effects.push_front(effect);
        true
    }

    /// Age every effect by `delta_ms` and drop the ones past their life span.
    /// Survivors keep their relative order.
    pub fn advance(&mut self, delta_ms: u32) {
        self.effects.retain_mut(|effect| {
            effect.progress = effect.progress.saturating_add(delta_ms);
            !effect.is_expired()
        });
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Effects in queue order (newest first).
    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.effects.iter()
    }

    /// Effects in drawing order: ascending render order, queue order within
    /// a layer. Each call yields a fresh snapshot.
    pub fn by_render_order(&self) -> impl Iterator<Item = &Effect> {
        let mut ordered: Vec<&Effect> = self.effects.iter().collect();
        ordered.sort_by_key(|e| e.render_order());
        ordered.into_iter()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn expired_effects_never_survive(deltas in prop::collection::vec(0u32..400, 1..20)) {
            let mut queue = EffectQueue::new();
            queue.push(Effect::new(EffectKind::Zoom, 0));
            let mut total = 0u32;
            for d in deltas {
                queue.advance(d);
                total += d;
                prop_assert_eq!(queue.len() == 1, total <= EffectKind::Zoom.life_span());
                for e in queue.iter() {
                    prop_assert!(e.progress <= e.life_span());
                }
            }
        }
    }
}
