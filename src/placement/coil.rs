//! Spiral and ring placement along the axis of the decorated object
//!
//! The walk runs in normalized axial units: `y = 0` is the base of the host
//! and `y = 1` its top. Each site is then offered a Bernoulli test; accepted
//! sites receive a decorated decorator turned outward at the site azimuth.

use crate::engine::evaluator::Evaluator;
use crate::geometry::collection::GeometryCollection;
use crate::geometry::shape::Pose;
use crate::graph::module::{ModuleId, Variables};
use crate::io::configuration::{GEOMETRY_EPSILON, MIN_AXIAL_STEP};
use crate::math::GOLDEN_ANGLE;
use crate::math::curve::{ResponseCurve, ScaledParam};
use crate::math::random::{Distribution, RandomStream, Seed};
use crate::placement::decorated::{
    DecoratorRequest, DistortionParams, SizeParams, back_reference, decorated_decorator,
};
use crate::placement::host::HostFrame;
use glam::DQuat;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

/// How the azimuth and the axial position advance
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoilMode {
    /// Full turns of `r_step` slots at fixed height
    #[default]
    Rings,
    /// `r_step` slots per turn, climbing a little at every slot
    Spiral,
    /// Golden-angle turns, climbing like [`CoilMode::Spiral`]
    Golden,
}

/// Parameters of a coil module
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoilParams {
    /// Walk pattern
    pub mode: CoilMode,
    /// Start of the walk, fraction of the host height
    pub y_from: f64,
    /// End of the walk, fraction of the host height
    pub y_to: f64,
    /// Axial advance per turn, fraction of the host height
    pub y_step: f64,
    /// Factor on `y_step` over the normalized height
    pub step_curve: ResponseCurve,
    /// Slots per turn
    pub r_step: u32,
    /// Rings per full turn of the starting azimuth offset, 0 for none
    pub r_start: u32,
    /// Acceptance probability
    pub probability: ScaledParam,
    /// Steps over which the probability ramps back after an acceptance
    pub damping: u32,
    /// Tilt away from the axis, radians
    pub vertical_angle: Distribution,
    /// Turn about the axis on top of the slot azimuth, radians
    pub horizontal_angle: Distribution,
    /// Axial position jitter, fraction of the host height
    pub jitter: Distribution,
    /// Distance from the axis, 1 = on the surface
    pub radial_factor: f64,
    /// Half turn for decorators on the back half (negative Z)
    pub flip_back: bool,
    /// Undo the frame change the host deformation causes
    pub counter_action: bool,
    /// Size perturbation
    pub size: SizeParams,
    /// Deformation of each decorator
    pub distortion: DistortionParams,
}

impl Default for CoilParams {
    fn default() -> Self {
        Self {
            mode: CoilMode::Rings,
            y_from: 0.0,
            y_to: 1.0,
            y_step: 0.1,
            step_curve: ResponseCurve::one(),
            r_step: 4,
            r_start: 0,
            probability: ScaledParam::fixed(1.0),
            damping: 0,
            vertical_angle: Distribution::constant(0.0),
            horizontal_angle: Distribution::constant(0.0),
            jitter: Distribution::constant(0.0),
            radial_factor: 1.0,
            flip_back: false,
            counter_action: false,
            size: SizeParams::default(),
            distortion: DistortionParams::default(),
        }
    }
}

impl CoilParams {
    /// Candidate sites before any probability test
    pub fn walker(&self) -> CoilWalker<'_> {
        CoilWalker::new(self)
    }

    /// Whether any parameter reads the back-reference value
    pub fn reads_back_reference(&self) -> bool {
        self.probability.reads_back_reference()
            || self.size.reads_back_reference()
            || self.distortion.reads_back_reference()
    }
}

/// Candidate position on the coil
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoilSite {
    /// Normalized axial position
    pub y: f64,
    /// Azimuth in `[0, 2π)`
    pub azimuth: f64,
    /// Turn or ring number, from 0
    pub band: usize,
    /// Slot within the band, from 0
    pub slot: usize,
}

/// Iterator over the candidate sites of a coil
///
/// The walk starts half an advance above `y_from` and continues while
/// `y ≤ y_to`. The advance is `y_step × step_curve(y)`, floored at
/// [`MIN_AXIAL_STEP`]; spiral modes spread it over the `r_step` slots of a
/// turn.
#[derive(Clone, Debug)]
pub struct CoilWalker<'a> {
    params: &'a CoilParams,
    slots: usize,
    y: f64,
    azimuth: f64,
    band: usize,
    slot: usize,
}

impl<'a> CoilWalker<'a> {
    /// Walker at the first site of `params`
    pub fn new(params: &'a CoilParams) -> Self {
        let slots = params.r_step.max(1) as usize;
        let mut walker = Self {
            params,
            slots,
            y: params.y_from,
            azimuth: 0.0,
            band: 0,
            slot: 0,
        };
        let first = match params.mode {
            CoilMode::Rings => walker.advance(),
            CoilMode::Spiral | CoilMode::Golden => walker.advance() / slots as f64,
        };
        walker.y += first * 0.5;
        walker
    }

    fn advance(&self) -> f64 {
        let curve = self.params.step_curve.calc_value(self.y);
        (self.params.y_step * curve).max(MIN_AXIAL_STEP)
    }

    fn ring_offset(&self) -> f64 {
        if self.params.r_start == 0 {
            0.0
        } else {
            (self.band as f64 * TAU / f64::from(self.params.r_start)).rem_euclid(TAU)
        }
    }
}

impl Iterator for CoilWalker<'_> {
    type Item = CoilSite;

    fn next(&mut self) -> Option<CoilSite> {
        if self.y > self.params.y_to + GEOMETRY_EPSILON {
            return None;
        }
        let slot_angle = TAU / self.slots as f64;
        let site = match self.params.mode {
            CoilMode::Rings => CoilSite {
                y: self.y,
                azimuth: (self.slot as f64).mul_add(slot_angle, self.ring_offset()) % TAU,
                band: self.band,
                slot: self.slot,
            },
            CoilMode::Spiral | CoilMode::Golden => CoilSite {
                y: self.y,
                azimuth: self.azimuth,
                band: self.band,
                slot: self.slot,
            },
        };

        match self.params.mode {
            CoilMode::Rings => {
                self.slot += 1;
                if self.slot == self.slots {
                    self.slot = 0;
                    self.y += self.advance();
                    self.band += 1;
                }
            }
            CoilMode::Spiral | CoilMode::Golden => {
                let turn = if self.params.mode == CoilMode::Golden {
                    GOLDEN_ANGLE
                } else {
                    slot_angle
                };
                self.azimuth = (self.azimuth + turn).rem_euclid(TAU);
                self.y += self.advance() / self.slots as f64;
                self.slot += 1;
                if self.slot == self.slots {
                    self.slot = 0;
                    self.band += 1;
                }
            }
        }
        Some(site)
    }
}

/// Probability ramp after an accepted placement
///
/// With damping `D`, the step after an acceptance runs at `p / (D + 1)`,
/// the next at `2p / (D + 1)`, and so on until the full `p` is back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Damping {
    steps: u32,
    remaining: u32,
}

impl Damping {
    /// Ramp over `steps` steps; 0 disables damping
    pub const fn new(steps: u32) -> Self {
        Self {
            steps,
            remaining: 0,
        }
    }

    /// Effective probability for this step; advances the ramp
    pub fn apply(&mut self, probability: f64) -> f64 {
        let factor = 1.0 - f64::from(self.remaining) / f64::from(self.steps + 1);
        self.remaining = self.remaining.saturating_sub(1);
        probability * factor
    }

    /// Restart the ramp after an acceptance
    pub const fn accept(&mut self) {
        self.remaining = self.steps;
    }
}

/// Place decorators along the axis of `host`
///
/// Draw order per site: back-reference fork (when read), acceptance test,
/// vertical angle, horizontal angle, size pair, axial jitter, decorator fork.
pub fn place(
    ev: &mut Evaluator<'_>,
    module: ModuleId,
    params: &CoilParams,
    host: &GeometryCollection,
    seed: Seed,
) -> Option<GeometryCollection> {
    let frame = HostFrame::from_collection(host)?;
    if frame.height() <= GEOMETRY_EPSILON {
        debug!("coil {module}: host has no height");
        return None;
    }

    let mut stream = RandomStream::new(seed);
    let mut damping = Damping::new(params.damping);
    let mut placed = GeometryCollection::new();
    let reads_back = params.reads_back_reference();
    let mut count = 0_usize;

    for site in params.walker() {
        let variables = Variables {
            axial_position: site.y,
            azimuth: site.azimuth / TAU,
            level: f64::from(frame.level),
        };
        let back = if reads_back {
            back_reference(ev, module, &variables, &mut stream)
        } else {
            None
        };

        let probability = damping.apply(params.probability.evaluate(site.y, back));
        if !stream.chance(probability) {
            continue;
        }
        damping.accept();

        let vertical = stream.sample(&params.vertical_angle);
        let horizontal = stream.sample(&params.horizontal_angle);
        let (size_r, size_y) = params.size.sample(&mut stream, site.y, back);
        let jitter = stream.sample(&params.jitter);
        let child = stream.fork();

        let request = DecoratorRequest {
            size_r,
            size_y,
            distortion: params.distortion.evaluate(site.y, back),
            axial_position: site.y,
            azimuth: site.azimuth / TAU,
        };
        let Some(decorator) = decorated_decorator(ev, module, &request, child) else {
            continue;
        };

        let surface = frame.surface_pose(
            (site.y + jitter).clamp(0.0, 1.0),
            site.azimuth,
            params.radial_factor,
            params.counter_action,
        );
        let mut rotation = surface.rotation
            * DQuat::from_rotation_y(-(site.azimuth + horizontal))
            * DQuat::from_rotation_z(-vertical);
        if params.flip_back && site.azimuth.sin() < 0.0 {
            rotation *= DQuat::from_rotation_y(PI);
        }
        let pose = Pose {
            translation: surface.translation,
            rotation,
        };

        trace!(
            "coil {module}: band {} slot {} at y={:.3} az={:.3}",
            site.band, site.slot, site.y, site.azimuth
        );
        placed.merge(decorator.placed(&(frame.transform * pose.to_affine()), frame.level + 1));
        ev.record_placement(module);
        count += 1;
    }

    ev.record_draws(module, stream.draws());
    debug!("coil {module}: placed {count} decorators");
    placed.non_empty()
}
