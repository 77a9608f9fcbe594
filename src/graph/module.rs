//! Modules, typed ports and the closed set of module kinds

use crate::geometry::collection::Material;
use crate::geometry::shape::{Distortion, ShapeSpec};
use crate::graph::backlink::LinkSource;
use crate::graph::selector::WeightTable;
use crate::math::curve::ResponseCurve;
use crate::math::random::Distribution;
use crate::placement::coil::CoilParams;
use crate::placement::field::FieldParams;
use crate::placement::golden_ball::GoldenBallParams;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a module in its graph
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(pub usize);

impl ModuleId {
    /// Index into the graph's module list
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Data type carried by a port
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortKind {
    /// Unconnectable placeholder
    Null,
    /// Geometry collections
    Object,
    /// Scalar values
    Value,
}

/// How an input port receives its data
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PortRole {
    /// Geometry is offered to the module through `decorate`
    Push,
    /// The module pulls from whatever feeds the port
    Pull,
    /// Both: pulled on demand and routed when offered
    Route,
}

impl PortRole {
    /// Whether fan-out may offer geometry to a port with this role
    pub const fn accepts_push(self) -> bool {
        matches!(self, Self::Push | Self::Route)
    }
}

/// Static description of an input port
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputPort {
    /// Carried data type
    pub kind: PortKind,
    /// Delivery role
    pub role: PortRole,
}

/// Host geometry input of placement modules
pub const HOST_PORT: usize = 0;
/// Decorator geometry input of placement modules
pub const DECORATOR_PORT: usize = 1;
/// Back-reference value input of placement modules
pub const BACK_REFERENCE_PORT: usize = 2;
/// The single output of every module kind
pub const OUTPUT_PORT: usize = 0;

const PLACEMENT_INPUTS: [InputPort; 3] = [
    InputPort {
        kind: PortKind::Object,
        role: PortRole::Push,
    },
    InputPort {
        kind: PortKind::Object,
        role: PortRole::Pull,
    },
    InputPort {
        kind: PortKind::Value,
        role: PortRole::Pull,
    },
];
const ROUTE_INPUTS: [InputPort; 1] = [InputPort {
    kind: PortKind::Object,
    role: PortRole::Route,
}];
const PULL_OBJECT_INPUTS: [InputPort; 1] = [InputPort {
    kind: PortKind::Object,
    role: PortRole::Pull,
}];
const PULL_VALUE_INPUTS: [InputPort; 1] = [InputPort {
    kind: PortKind::Value,
    role: PortRole::Pull,
}];
const OBJECT_OUTPUTS: [PortKind; 1] = [PortKind::Object];
const VALUE_OUTPUTS: [PortKind; 1] = [PortKind::Value];

/// Entry of the variable array handed to value pulls
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variable {
    /// Normalized position along the host axis
    AxialPosition,
    /// Normalized azimuth, `0..1` for a full turn
    Azimuth,
    /// Decoration level of the host
    Level,
}

/// Variable array for value pulls
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Variables {
    /// Normalized position along the host axis
    pub axial_position: f64,
    /// Normalized azimuth
    pub azimuth: f64,
    /// Decoration level of the host
    pub level: f64,
}

impl Variables {
    /// Read one variable
    pub const fn get(&self, variable: Variable) -> f64 {
        match variable {
            Variable::AxialPosition => self.axial_position,
            Variable::Azimuth => self.azimuth,
            Variable::Level => self.level,
        }
    }
}

/// Downstream end of a link
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkTarget {
    /// Consuming module
    pub module: ModuleId,
    /// Input port on the consumer
    pub input_port: usize,
}

/// Parameters of a geometry source
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectParams {
    /// Shape recipe
    pub shape: ShapeSpec,
    /// Material template
    #[serde(default)]
    pub material: Option<Material>,
}

/// Parameters of the branch selector
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RandomObjectParams {
    /// Weights over the modules feeding the input
    #[serde(default)]
    pub upstream: WeightTable<LinkSource>,
    /// Weights over the modules fed by the output
    #[serde(default)]
    pub downstream: WeightTable<LinkTarget>,
}

/// Parameters of the fixed deformation filter
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistortParams {
    /// Radial size factor
    #[serde(default = "unit")]
    pub size_r: f64,
    /// Axial size factor
    #[serde(default = "unit")]
    pub size_y: f64,
    /// Deformation added to the primary instances
    #[serde(default)]
    pub distortion: Distortion,
}

const fn unit() -> f64 {
    1.0
}

/// Closed set of module behaviours
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModuleKind {
    /// Geometry source
    Object(ObjectParams),
    /// Spiral and ring placement along an axis
    Coil(CoilParams),
    /// Golden-ratio placement over a spherical cap
    GoldenBall(GoldenBallParams),
    /// Placement over the host mesh surface
    Field(FieldParams),
    /// Weighted choice between sources or consumers
    RandomObject(RandomObjectParams),
    /// Fixed resize and deformation of pulled geometry
    Distort(DistortParams),
    /// Constant value
    Constant {
        /// Output value
        value: f64,
    },
    /// Entry of the variable array
    Variable {
        /// Which entry
        variable: Variable,
    },
    /// Response curve over the input value (or the axial position)
    Curve {
        /// The curve
        curve: ResponseCurve,
    },
    /// Random draw
    Random {
        /// Sampled distribution
        distribution: Distribution,
    },
}

impl ModuleKind {
    /// Input ports in order
    pub fn inputs(&self) -> &'static [InputPort] {
        match self {
            Self::Coil(_) | Self::GoldenBall(_) | Self::Field(_) => &PLACEMENT_INPUTS,
            Self::RandomObject(_) => &ROUTE_INPUTS,
            Self::Distort(_) => &PULL_OBJECT_INPUTS,
            Self::Curve { .. } => &PULL_VALUE_INPUTS,
            Self::Object(_) | Self::Constant { .. } | Self::Variable { .. } | Self::Random { .. } => {
                &[]
            }
        }
    }

    /// Output port kinds in order
    pub fn outputs(&self) -> &'static [PortKind] {
        match self {
            Self::Object(_)
            | Self::Coil(_)
            | Self::GoldenBall(_)
            | Self::Field(_)
            | Self::RandomObject(_)
            | Self::Distort(_) => &OBJECT_OUTPUTS,
            Self::Constant { .. }
            | Self::Variable { .. }
            | Self::Curve { .. }
            | Self::Random { .. } => &VALUE_OUTPUTS,
        }
    }

    /// Whether this kind places decorators onto a host
    pub const fn is_placement(&self) -> bool {
        matches!(self, Self::Coil(_) | Self::GoldenBall(_) | Self::Field(_))
    }

    /// Short kind name for logs
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Object(_) => "object",
            Self::Coil(_) => "coil",
            Self::GoldenBall(_) => "golden_ball",
            Self::Field(_) => "field",
            Self::RandomObject(_) => "random_object",
            Self::Distort(_) => "distort",
            Self::Constant { .. } => "constant",
            Self::Variable { .. } => "variable",
            Self::Curve { .. } => "curve",
            Self::Random { .. } => "random",
        }
    }
}

/// Forward link table of one output port
///
/// `targets` and `target_input_ports` are parallel lists of equal length.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutputLinks {
    targets: Vec<ModuleId>,
    target_input_ports: Vec<usize>,
}

impl OutputLinks {
    /// Table from parallel lists; `None` when their lengths differ
    pub fn from_parallel(targets: Vec<ModuleId>, target_input_ports: Vec<usize>) -> Option<Self> {
        (targets.len() == target_input_ports.len()).then_some(Self {
            targets,
            target_input_ports,
        })
    }

    /// Target modules in link order
    pub fn targets(&self) -> &[ModuleId] {
        &self.targets
    }

    /// Target input ports, index-aligned with [`OutputLinks::targets`]
    pub fn target_input_ports(&self) -> &[usize] {
        &self.target_input_ports
    }

    /// Number of links
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether there are no links
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Links in order
    pub fn iter(&self) -> impl Iterator<Item = LinkTarget> + '_ {
        self.targets
            .iter()
            .zip(&self.target_input_ports)
            .map(|(&module, &input_port)| LinkTarget { module, input_port })
    }

    /// Whether `target` is linked
    pub fn contains(&self, target: LinkTarget) -> bool {
        self.iter().any(|t| t == target)
    }

    pub(crate) fn push(&mut self, target: LinkTarget) {
        self.targets.push(target.module);
        self.target_input_ports.push(target.input_port);
    }

    pub(crate) fn remove(&mut self, target: LinkTarget) -> bool {
        let Some(position) = self.iter().position(|t| t == target) else {
            return false;
        };
        self.targets.remove(position);
        self.target_input_ports.remove(position);
        true
    }

    /// Rewrite targets through `translate`, dropping links it maps to `None`
    pub(crate) fn translate(&mut self, translate: impl Fn(ModuleId) -> Option<ModuleId>) {
        let mut targets = Vec::with_capacity(self.targets.len());
        let mut ports = Vec::with_capacity(self.targets.len());
        for link in self.iter() {
            if let Some(module) = translate(link.module) {
                targets.push(module);
                ports.push(link.input_port);
            }
        }
        self.targets = targets;
        self.target_input_ports = ports;
    }
}

/// Node of the generation graph
#[derive(Clone, Debug, PartialEq)]
pub struct Module {
    /// Display name, also used for shapes and exports
    pub name: String,
    /// Behaviour and parameters
    pub kind: ModuleKind,
    /// Suppress the decoration this module's output would add (quick preview)
    pub stop_here: bool,
    outputs: Vec<OutputLinks>,
}

impl Module {
    /// Unlinked module of the given kind
    pub fn new(name: impl Into<String>, kind: ModuleKind) -> Self {
        let outputs = vec![OutputLinks::default(); kind.outputs().len()];
        Self {
            name: name.into(),
            kind,
            stop_here: false,
            outputs,
        }
    }

    /// Number of input ports
    pub fn num_input(&self) -> usize {
        self.kind.inputs().len()
    }

    /// Number of output ports
    pub fn num_output(&self) -> usize {
        self.kind.outputs().len()
    }

    /// Description of an input port
    pub fn input(&self, port: usize) -> Option<InputPort> {
        self.kind.inputs().get(port).copied()
    }

    /// Kind of an output port
    pub fn output_kind(&self, port: usize) -> Option<PortKind> {
        self.kind.outputs().get(port).copied()
    }

    /// Forward links of an output port
    pub fn links(&self, port: usize) -> Option<&OutputLinks> {
        self.outputs.get(port)
    }

    /// Forward links of every output port
    pub fn all_links(&self) -> &[OutputLinks] {
        &self.outputs
    }

    pub(crate) fn links_mut(&mut self, port: usize) -> Option<&mut OutputLinks> {
        self.outputs.get_mut(port)
    }

    pub(crate) fn all_links_mut(&mut self) -> &mut [OutputLinks] {
        &mut self.outputs
    }

    pub(crate) fn replace_links(&mut self, outputs: Vec<OutputLinks>) {
        self.outputs = outputs;
        self.outputs
            .resize(self.kind.outputs().len(), OutputLinks::default());
    }
}
