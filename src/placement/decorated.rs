//! The decorated decorator shared by every placement algorithm

use crate::engine::evaluator::Evaluator;
use crate::geometry::collection::GeometryCollection;
use crate::geometry::shape::Distortion;
use crate::graph::module::{DECORATOR_PORT, ModuleId, Variables};
use crate::io::configuration::{MIN_FOOTPRINT, MIN_SHRINK};
use crate::math::curve::ScaledParam;
use crate::math::random::{Distribution, RandomStream, Seed};
use log::warn;
use serde::{Deserialize, Serialize};

/// Curve-scaled deformation applied to each placed decorator
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DistortionParams {
    /// Bend angle, radians
    #[serde(default)]
    pub bend: ScaledParam,
    /// Twist angle, radians
    #[serde(default)]
    pub twist: ScaledParam,
    /// Fractional taper
    #[serde(default)]
    pub taper: ScaledParam,
}

impl DistortionParams {
    /// Whether any parameter reads the back-reference value
    pub fn reads_back_reference(&self) -> bool {
        self.bend.reads_back_reference()
            || self.twist.reads_back_reference()
            || self.taper.reads_back_reference()
    }

    /// Deformation at a normalized position
    pub fn evaluate(&self, position: f64, back_reference: Option<f64>) -> Distortion {
        Distortion::new(
            self.bend.evaluate(position, back_reference),
            self.twist.evaluate(position, back_reference),
            self.taper.evaluate(position, back_reference),
        )
    }
}

/// Random size perturbation scaled by a position curve
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SizeParams {
    /// Radial size factor
    #[serde(default = "unit_distribution")]
    pub size_r: Distribution,
    /// Axial size factor
    #[serde(default = "unit_distribution")]
    pub size_y: Distribution,
    /// Common factor over the placement position
    #[serde(default = "unit_param")]
    pub scale: ScaledParam,
}

const fn unit_distribution() -> Distribution {
    Distribution::constant(1.0)
}

const fn unit_param() -> ScaledParam {
    ScaledParam::fixed(1.0)
}

impl Default for SizeParams {
    fn default() -> Self {
        Self {
            size_r: unit_distribution(),
            size_y: unit_distribution(),
            scale: unit_param(),
        }
    }
}

impl SizeParams {
    /// Whether the scale reads the back-reference value
    pub fn reads_back_reference(&self) -> bool {
        self.scale.reads_back_reference()
    }

    /// Draw `(size_r, size_y)`; always consumes two steps
    pub fn sample(
        &self,
        stream: &mut RandomStream,
        position: f64,
        back_reference: Option<f64>,
    ) -> (f64, f64) {
        let scale = self.scale.evaluate(position, back_reference);
        let size_r = stream.sample(&self.size_r) * scale;
        let size_y = stream.sample(&self.size_y) * scale;
        (size_r.max(MIN_SHRINK), size_y.max(MIN_SHRINK))
    }
}

/// How one decorator copy should be shaped before it is placed
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecoratorRequest {
    /// Radial size factor
    pub size_r: f64,
    /// Axial size factor
    pub size_y: f64,
    /// Deformation to add
    pub distortion: Distortion,
    /// Normalized axial position written into the material
    pub axial_position: f64,
    /// Normalized azimuth written into the material
    pub azimuth: f64,
}

impl DecoratorRequest {
    /// Unscaled, undeformed copy at the origin
    pub const fn neutral() -> Self {
        Self {
            size_r: 1.0,
            size_y: 1.0,
            distortion: Distortion::IDENTITY,
            axial_position: 0.0,
            azimuth: 0.0,
        }
    }
}

/// Pull the decorator of `module`, shape it per `request` and let the
/// module's downstream links decorate it in turn
///
/// Returns the decorator in its own frame with the primary instances at
/// level 0, or `None` when nothing feeds the decorator input.
pub fn decorated_decorator(
    ev: &mut Evaluator<'_>,
    module: ModuleId,
    request: &DecoratorRequest,
    seed: Seed,
) -> Option<GeometryCollection> {
    let mut stream = RandomStream::new(seed);
    let pull_seed = stream.fork();

    let decorator = ev
        .index()
        .resolve_one(module, DECORATOR_PORT)
        .and_then(|source| ev.pull_object(source.module, source.output_port, pull_seed));

    let result = decorator.map(|mut shaped| {
        shaped.resize_and_distort(
            request.size_r.max(MIN_SHRINK),
            request.size_y.max(MIN_SHRINK),
            &request.distortion,
        );
        shaped.set_material_parameters(request.axial_position, request.azimuth);
        let decorations = ev.fan_out(module, &shaped, &mut stream);
        shaped.merge(decorations);
        shaped
    });

    ev.record_draws(module, stream.draws());
    result
}

/// Pull the value wired to the back-reference input of `module`
pub fn back_reference(
    ev: &mut Evaluator<'_>,
    module: ModuleId,
    variables: &Variables,
    stream: &mut RandomStream,
) -> Option<f64> {
    let seed = stream.fork();
    ev.pull_back_reference(module, variables, seed)
}

/// Average footprint and height of sampled decorators
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FootprintEstimate {
    /// Mean of the squared horizontal extent
    pub object_area: f64,
    /// Mean vertical extent
    pub radial_extent: f64,
    /// Samples that produced geometry
    pub samples: usize,
}

/// Monte-Carlo estimate of the space one decorator takes
///
/// Draws `samples` neutral decorated decorators, each from its own fork, and
/// measures their bounds. The horizontal extent is floored at
/// [`MIN_FOOTPRINT`]. `None` when no sample produced geometry.
pub fn estimate_footprint(
    ev: &mut Evaluator<'_>,
    module: ModuleId,
    samples: usize,
    stream: &mut RandomStream,
) -> Option<FootprintEstimate> {
    let mut area = 0.0;
    let mut radial = 0.0;
    let mut measured = 0_usize;
    for _ in 0..samples.max(1) {
        let seed = stream.fork();
        let Some(bounds) = decorated_decorator(ev, module, &DecoratorRequest::neutral(), seed)
            .and_then(|sample| sample.bounds())
        else {
            continue;
        };
        let size = bounds.size();
        let footprint = size.x.max(size.z).max(MIN_FOOTPRINT);
        area += footprint * footprint;
        radial += size.y;
        measured += 1;
    }

    if measured == 0 {
        warn!("module {module}: no decorator sample to estimate a footprint from");
        return None;
    }
    Some(FootprintEstimate {
        object_area: area / measured as f64,
        radial_extent: radial / measured as f64,
        samples: measured,
    })
}
