//! Time-based scalar animations (fades) advanced by an external clock.
//!
//! The scheduler never looks at wall time: the owner calls [`TweenScheduler::tick`]
//! once per frame with the elapsed time, and applies the reported values to
//! whatever the target describes. Completion hands the payload back exactly once,
//! either from a tick or from a forced [`TweenScheduler::complete`].

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    // linear interpolation
    #[default]
    Linear,
    // decelerating quadratic, the usual tween-library default
    OutQuad,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::OutQuad => t * (2.0 - t),
        }
    }
}

/// Handle to a tween. Ids are never reused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TweenId(u64);

/// One observation of a tween, produced by `tick` or `complete`.
#[derive(Debug)]
pub struct TweenUpdate<T, P> {
    pub id: TweenId,
    pub target: T,
    pub value: f32,
    /// Set when the tween reached its end; the tween is gone from the scheduler.
    pub finished: Option<P>,
}

impl<T, P> TweenUpdate<T, P> {
    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }
}

#[derive(Debug)]
struct Tween<T, P> {
    from: f32,
    to: f32,
    duration: Duration,
    elapsed: Duration,
    easing: Easing,
    target: T,
    payload: P,
}

impl<T, P> Tween<T, P> {
    fn value(&self) -> f32 {
        if self.duration.is_zero() {
            return self.to;
        }

        let t = self.elapsed.as_secs_f32() / self.duration.as_secs_f32();
        self.from + (self.to - self.from) * self.easing.apply(t)
    }

    fn is_done(&self) -> bool {
        self.elapsed >= self.duration
    }
}

pub struct TweenScheduler<T, P> {
    tweens: BTreeMap<TweenId, Tween<T, P>>,
    next_id: u64,
}

impl<T, P> Default for TweenScheduler<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, P> TweenScheduler<T, P> {
    pub fn new() -> Self {
        Self {
            tweens: BTreeMap::new(),
            next_id: 0,
        }
    }

    pub fn animate(
        &mut self,
        from: f32,
        to: f32,
        duration: Duration,
        easing: Easing,
        target: T,
        payload: P,
    ) -> TweenId {
        let id = TweenId(self.next_id);
        self.next_id += 1;

        self.tweens.insert(
            id,
            Tween {
                from,
                to,
                duration,
                elapsed: Duration::ZERO,
                easing,
                target,
                payload,
            },
        );
        id
    }

    /// True while the tween is running. Completed and unknown ids are not playing.
    pub fn is_playing(&self, id: TweenId) -> bool {
        self.tweens.contains_key(&id)
    }

    pub fn running_count(&self) -> usize {
        self.tweens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tweens.is_empty()
    }

    /// Ids of every running tween, oldest first.
    pub fn running_ids(&self) -> Vec<TweenId> {
        self.tweens.keys().copied().collect()
    }

    /// Fast-forward a tween to its end value and hand back its payload.
    ///
    /// Only the first call on an id yields an update.
    pub fn complete(&mut self, id: TweenId) -> Option<TweenUpdate<T, P>> {
        let tween = self.tweens.remove(&id)?;
        Some(TweenUpdate {
            id,
            target: tween.target,
            value: tween.to,
            finished: Some(tween.payload),
        })
    }
}

impl<T: Clone, P> TweenScheduler<T, P> {
    /// Advance every running tween by `dt`, oldest first.
    pub fn tick(&mut self, dt: Duration) -> Vec<TweenUpdate<T, P>> {
        let ids = self.running_ids();
        let mut updates = Vec::with_capacity(ids.len());

        for id in ids {
            let Some(tween) = self.tweens.get_mut(&id) else {
                continue;
            };
            tween.elapsed = tween.elapsed.saturating_add(dt);

            if tween.is_done() {
                if let Some(update) = self.complete(id) {
                    updates.push(update);
                }
            } else {
                updates.push(TweenUpdate {
                    id,
                    target: tween.target.clone(),
                    value: tween.value(),
                    finished: None,
                });
            }
        }

        updates
    }
}
