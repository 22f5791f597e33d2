//! 指数分布延迟采样：`d = -mean * ln(1 - U)`，`U ~ Uniform[0, 1)`。
use rand::Rng;

use crate::net::structure::{Transition, TransitionKind};
use crate::sim::clock::SimTime;

pub fn sample_exponential<R: Rng + ?Sized>(rng: &mut R, mean: f64, floor: SimTime) -> SimTime {
    let u: f64 = rng.random();
    let delay = -mean * (1.0 - u).ln();
    delay.max(floor)
}

/// Zero for immediate transitions, an exponential sample for timed ones.
pub fn firing_delay<R: Rng + ?Sized>(rng: &mut R, transition: &Transition, floor: SimTime) -> SimTime {
    match transition.kind {
        TransitionKind::Immediate => 0.0,
        TransitionKind::Timed => sample_exponential(rng, transition.delay_mean, floor),
    }
}
