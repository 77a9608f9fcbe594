//! Golden-ratio placement over a spherical cap
//!
//! The cap is walked in equal-area steps of `cos θ` while the azimuth turns
//! by the golden angle, which spreads placements evenly without rings or
//! seams. The step length follows the reciprocal of a density curve so that
//! dense regions get shorter steps.

use crate::engine::evaluator::Evaluator;
use crate::geometry::collection::GeometryCollection;
use crate::graph::module::{ModuleId, Variables};
use crate::io::configuration::{DEFAULT_ESTIMATE_SAMPLES, GEOMETRY_EPSILON, MAX_BALL_INSTANCES};
use crate::math::GOLDEN_ANGLE;
use crate::math::curve::ScaledParam;
use crate::math::random::{Distribution, RandomStream, Seed};
use crate::placement::decorated::{
    DecoratorRequest, DistortionParams, SizeParams, back_reference, decorated_decorator,
    estimate_footprint,
};
use crate::placement::host::HostFrame;
use glam::DQuat;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Extent of the cap
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BallMode {
    /// Polar range as configured
    #[default]
    Sphere,
    /// Polar range clamped to the upper half
    Hemisphere,
}

/// Parameters of a golden ball module
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoldenBallParams {
    /// Cap extent
    pub mode: BallMode,
    /// First polar angle from +Y, radians
    pub from: f64,
    /// Last polar angle from +Y, radians
    pub to: f64,
    /// Coverage density; the curve reads the normalized cap position
    pub density: ScaledParam,
    /// Decorator samples used to estimate the footprint
    pub estimate: usize,
    /// Distance moved toward the centre, fraction of the radius
    pub inward: f64,
    /// Tilt away from the normal, radians
    pub vertical_angle: Distribution,
    /// Spin about the normal, radians
    pub horizontal_angle: Distribution,
    /// Undo the frame change the host deformation causes
    pub counter_action: bool,
    /// Size perturbation
    pub size: SizeParams,
    /// Deformation of each decorator
    pub distortion: DistortionParams,
}

impl Default for GoldenBallParams {
    fn default() -> Self {
        Self {
            mode: BallMode::Sphere,
            from: 0.0,
            to: PI,
            density: ScaledParam::fixed(1.0),
            estimate: DEFAULT_ESTIMATE_SAMPLES,
            inward: 0.0,
            vertical_angle: Distribution::constant(0.0),
            horizontal_angle: Distribution::constant(0.0),
            counter_action: false,
            size: SizeParams::default(),
            distortion: DistortionParams::default(),
        }
    }
}

impl GoldenBallParams {
    /// Polar range after the mode clamp, `None` when empty
    pub fn polar_range(&self) -> Option<(f64, f64)> {
        let from = self.from.clamp(0.0, PI);
        let mut to = self.to.clamp(0.0, PI);
        if self.mode == BallMode::Hemisphere {
            to = to.min(FRAC_PI_2);
        }
        (to > from).then_some((from, to))
    }

    /// Whether any parameter reads the back-reference value
    pub fn reads_back_reference(&self) -> bool {
        self.density.reads_back_reference()
            || self.size.reads_back_reference()
            || self.distortion.reads_back_reference()
    }
}

/// Placement on the cap
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BallSite {
    /// Polar angle from +Y
    pub theta: f64,
    /// Azimuth in `[0, 2π)`
    pub azimuth: f64,
    /// Normalized cap position, `0` at `from` and `1` at `to`
    pub position: f64,
}

/// Equal-area walk over `cos θ ∈ [cos to, cos from]`
///
/// Each step lowers `cos θ` by `span × weight / object_number`, where `span`
/// is the cosine range of the cap and `weight` the reciprocal density at the
/// current position. The first site sits half a step below the cap edge.
#[derive(Clone, Debug)]
pub struct GoldenWalker {
    cos_from: f64,
    cos_to: f64,
    object_number: f64,
    cos: f64,
    azimuth: f64,
}

impl GoldenWalker {
    /// Walker over the cap `from..to` for `object_number` placements at unit
    /// weight; `first_weight` sizes the initial half step
    pub fn new(from: f64, to: f64, object_number: f64, azimuth: f64, first_weight: f64) -> Self {
        let cos_from = from.cos();
        let cos_to = to.cos();
        let mut walker = Self {
            cos_from,
            cos_to,
            object_number,
            cos: cos_from,
            azimuth: azimuth.rem_euclid(TAU),
        };
        walker.cos -= walker.step(first_weight) * 0.5;
        walker
    }

    fn span(&self) -> f64 {
        self.cos_from - self.cos_to
    }

    fn step(&self, weight: f64) -> f64 {
        if self.object_number <= 0.0 {
            return f64::INFINITY;
        }
        self.span() * weight / self.object_number
    }

    /// Site at the walker position, `None` once the walk has left the cap
    pub fn current(&self) -> Option<BallSite> {
        if !(-1.0..=1.0).contains(&self.cos) || self.cos < self.cos_to {
            return None;
        }
        let span = self.span();
        let position = if span > GEOMETRY_EPSILON {
            ((self.cos_from - self.cos) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Some(BallSite {
            theta: self.cos.acos(),
            azimuth: self.azimuth,
            position,
        })
    }

    /// Move to the next site with the reciprocal density `weight`
    pub fn advance(&mut self, weight: f64) {
        self.cos -= self.step(weight);
        self.azimuth = (self.azimuth + GOLDEN_ANGLE).rem_euclid(TAU);
    }

    /// Every site of a walk whose weight depends only on the cap position
    pub fn sites(mut self, weight: impl Fn(f64) -> f64) -> impl Iterator<Item = BallSite> {
        std::iter::from_fn(move || {
            let site = self.current()?;
            self.advance(weight(site.position));
            Some(site)
        })
    }
}

/// Place decorators over a spherical cap around `host`
///
/// Draw order: footprint estimate forks, starting azimuth, then per site:
/// back-reference fork (when read), vertical angle, spin, size pair,
/// decorator fork.
pub fn place(
    ev: &mut Evaluator<'_>,
    module: ModuleId,
    params: &GoldenBallParams,
    host: &GeometryCollection,
    seed: Seed,
) -> Option<GeometryCollection> {
    let frame = HostFrame::from_collection(host)?;
    let (from, to) = params.polar_range()?;
    let mut stream = RandomStream::new(seed);

    let Some(estimate) = estimate_footprint(ev, module, params.estimate, &mut stream) else {
        ev.record_draws(module, stream.draws());
        return None;
    };
    let host_radius = frame.radius();
    let radius = if host_radius > GEOMETRY_EPSILON {
        host_radius
    } else {
        estimate.radial_extent
    };
    if radius <= GEOMETRY_EPSILON || estimate.object_area <= GEOMETRY_EPSILON {
        warn!("golden ball {module}: degenerate radius or footprint");
        ev.record_draws(module, stream.draws());
        return None;
    }

    let pointwise = params.density.reads_back_reference();
    let reciprocal = params.density.curve.reciprocal();
    // Integrated mode divides the count and every step weight by the same
    // integral, so the walk still places about `expected × ∫ curve`
    let norm = if pointwise {
        1.0
    } else {
        reciprocal.calc_integral(0.0, 1.0).max(GEOMETRY_EPSILON)
    };
    let weight = |x: f64| reciprocal.calc_value(x) / norm;
    let cap_area = 2.0 * radius * radius * (from.cos() - to.cos());
    let expected = cap_area * params.density.value / estimate.object_area;
    let object_number = expected / norm;
    debug!(
        "golden ball {module}: radius {radius:.3}, area {:.4}, {object_number:.1} objects",
        estimate.object_area
    );
    if object_number <= GEOMETRY_EPSILON {
        ev.record_draws(module, stream.draws());
        return None;
    }

    let start_azimuth = stream.uniform_range(0.0, TAU);
    let mut walker = GoldenWalker::new(
        from,
        to,
        object_number,
        start_azimuth,
        weight(0.0),
    );
    let mut placed = GeometryCollection::new();
    let mut count = 0_usize;
    let mut steps = 0_usize;

    while let Some(site) = walker.current() {
        steps += 1;
        if steps > MAX_BALL_INSTANCES {
            warn!("golden ball {module}: stopped at {MAX_BALL_INSTANCES} instances");
            break;
        }
        let variables = Variables {
            axial_position: site.position,
            azimuth: site.azimuth / TAU,
            level: f64::from(frame.level),
        };
        let back = if params.reads_back_reference() {
            back_reference(ev, module, &variables, &mut stream)
        } else {
            None
        };
        let abscissa = params.density.abscissa(site.position, back);

        let vertical = stream.sample(&params.vertical_angle);
        let spin = stream.sample(&params.horizontal_angle);
        let (size_r, size_y) = params.size.sample(&mut stream, site.position, back);
        let child = stream.fork();

        let request = DecoratorRequest {
            size_r,
            size_y,
            distortion: params.distortion.evaluate(site.position, back),
            axial_position: site.position,
            azimuth: site.azimuth / TAU,
        };
        if let Some(decorator) = decorated_decorator(ev, module, &request, child) {
            let mut pose = frame.ball_pose(
                site.theta,
                site.azimuth,
                radius,
                params.inward,
                params.counter_action,
            );
            pose.rotation =
                pose.rotation * DQuat::from_rotation_y(spin) * DQuat::from_rotation_z(-vertical);
            trace!(
                "golden ball {module}: theta={:.3} az={:.3}",
                site.theta, site.azimuth
            );
            placed.merge(decorator.placed(&(frame.transform * pose.to_affine()), frame.level + 1));
            ev.record_placement(module);
            count += 1;
        }

        walker.advance(weight(abscissa));
    }

    ev.record_draws(module, stream.draws());
    debug!("golden ball {module}: placed {count} decorators");
    placed.non_empty()
}
