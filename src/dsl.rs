//! Serialized material node-graph model.
//!
//! A graph is a flat node list plus a link list; group nodes own a nested
//! graph of the same shape. The model is immutable input for the compiler:
//! socket kinds are fixed at construction time and evaluators dispatch on
//! them without coercing shader sockets.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::assets::ImageRef;

/// Semantic type of a socket. Fixed at graph construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SocketKind {
    Shader,
    Color,
    Vector,
    Value,
}

/// Literal default carried by an unlinked socket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SocketDefault {
    Value(f32),
    Vector([f32; 3]),
}

impl Default for SocketDefault {
    fn default() -> Self {
        SocketDefault::Value(0.0)
    }
}

impl SocketDefault {
    pub fn as_value(&self) -> f32 {
        match self {
            SocketDefault::Value(v) => *v,
            // Rec. 709 luma, same conversion the evaluators emit for linked sockets
            SocketDefault::Vector(v) => v[0] * 0.2126 + v[1] * 0.7152 + v[2] * 0.0722,
        }
    }

    pub fn as_vector(&self) -> [f32; 3] {
        match self {
            SocketDefault::Value(v) => [*v, *v, *v],
            SocketDefault::Vector(v) => *v,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Socket {
    pub name: String,
    pub kind: SocketKind,
    #[serde(default)]
    pub default_value: SocketDefault,
}

impl Socket {
    pub fn shader(name: &str) -> Self {
        Socket {
            name: name.to_string(),
            kind: SocketKind::Shader,
            default_value: SocketDefault::default(),
        }
    }

    pub fn color(name: &str, default: [f32; 3]) -> Self {
        Socket {
            name: name.to_string(),
            kind: SocketKind::Color,
            default_value: SocketDefault::Vector(default),
        }
    }

    pub fn vector(name: &str, default: [f32; 3]) -> Self {
        Socket {
            name: name.to_string(),
            kind: SocketKind::Vector,
            default_value: SocketDefault::Vector(default),
        }
    }

    pub fn value(name: &str, default: f32) -> Self {
        Socket {
            name: name.to_string(),
            kind: SocketKind::Value,
            default_value: SocketDefault::Value(default),
        }
    }
}

/// Directed edge from a node's output socket to another node's input socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub from_node: String,
    pub from_socket: usize,
    pub to_node: String,
    pub to_socket: usize,
}

/// Closed tag set over every supported material node. Adding a variant
/// without a matching evaluator arm is a compile error, not a runtime one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    // Shader combinators
    MixShader,
    AddShader,

    // Shading-model leaves
    BsdfPrincipled,
    BsdfDiffuse,
    BsdfGlossy,
    BsdfAnisotropic,
    BsdfGlass,
    BsdfTransparent,
    BsdfTranslucent,
    BsdfVelvet,
    BsdfToon,
    BsdfRefraction,
    Emission,
    AmbientOcclusion,
    SubsurfaceScattering,
    Holdout,
    VolumeAbsorption,
    VolumeScatter,

    // Group boundary
    Group,
    GroupInput,
    GroupOutput,
    Reroute,

    // Vector/color producers
    Attribute,
    TexCoord,
    UvMap,
    Rgb,
    VertexColor,
    TexImage,
    TexChecker,
    TexBrick,
    TexGradient,
    TexNoise,
    TexVoronoi,
    TexMusgrave,
    TexWave,
    TexMagic,
    Mapping,
    NormalMap,
    Bump,
    Normal,
    CurveVec,
    CurveRgb,
    CombineXyz,
    CombineRgb,
    MixRgb,
    Invert,
    Gamma,
    BrightContrast,
    HueSat,
    Geometry,
    Tangent,

    // Scalar producers
    Value,
    Math,
    VectorMath,
    ColorRamp,
    SeparateXyz,
    SeparateRgb,
    RgbToBw,
    Clamp,
    MapRange,
    LayerWeight,
    Fresnel,
    LightPath,
    ObjectInfo,
    ParticleInfo,
    CameraData,
    Wireframe,

    // Output sink
    OutputMaterial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MathOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Logarithm,
    Sqrt,
    Absolute,
    Minimum,
    Maximum,
    LessThan,
    GreaterThan,
    Round,
    Floor,
    Ceil,
    Fract,
    Modulo,
    Sine,
    Cosine,
    Tangent,
    Arcsine,
    Arccosine,
    Arctangent,
    Arctan2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VectorMathOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Normalize,
    Scale,
    Reflect,
    Project,
    CrossProduct,
    Sine,
    Cosine,
    Tangent,
    Modulo,
    Fraction,
    Snap,
    Wrap,
    Ceil,
    Floor,
    Maximum,
    Minimum,
    Absolute,
    DotProduct,
    Distance,
    Length,
}

/// Blend operations for the MixRgb node. Modes without a faithful cheap
/// formula (hue/saturation/value/color/overlay/dodge/burn/linear-light)
/// degrade to a plain linear mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlendMode {
    Mix,
    Add,
    Multiply,
    Subtract,
    Screen,
    Divide,
    Difference,
    Darken,
    Lighten,
    Overlay,
    Dodge,
    Burn,
    Hue,
    Saturation,
    Value,
    Color,
    SoftLight,
    LinearLight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RampInterpolation {
    Constant,
    Linear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RampStop {
    pub position: f32,
    pub color: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorRampParams {
    pub interpolation: RampInterpolation,
    pub stops: Vec<RampStop>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GradientKind {
    Linear,
    Quadratic,
    Easing,
    Diagonal,
    Radial,
    QuadraticSphere,
    Spherical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoronoiMetric {
    Euclidean,
    Manhattan,
    Chebychev,
    Minkowski,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WaveKind {
    Bands,
    Rings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WaveProfile {
    Sin,
    Saw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MappingKind {
    Point,
    Texture,
    Vector,
}

/// Point on a channel curve, for CurveVec/CurveRgb nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub position: f32,
    pub value: f32,
}

/// Kind-specific constant parameters. Only the fields relevant to a node's
/// kind are read; the rest stay at their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeParams {
    pub operation: Option<MathOp>,
    pub vector_operation: Option<VectorMathOp>,
    pub blend_mode: Option<BlendMode>,
    pub use_clamp: bool,
    pub invert: bool,
    pub ramp: Option<ColorRampParams>,
    pub gradient: Option<GradientKind>,
    pub voronoi_metric: Option<VoronoiMetric>,
    pub wave_kind: Option<WaveKind>,
    pub wave_profile: Option<WaveProfile>,
    pub mapping_kind: Option<MappingKind>,
    pub image: Option<ImageRef>,
    pub group: Option<Box<NodeGraph>>,
    pub attribute_name: Option<String>,
    /// UV layer index for UvMap/Attribute nodes; 1 selects the secondary map.
    pub uv_index: Option<u32>,
    /// Per-channel curve points (x, y, z / r, g, b [, combined]).
    pub curves: Option<Vec<Vec<CurvePoint>>>,
    /// Expose this constant as a runtime-linked uniform instead of a literal.
    pub material_param: bool,
    pub from_min: f32,
    pub from_max: f32,
    pub to_min: f32,
    pub to_max: f32,
}

impl Default for NodeParams {
    fn default() -> Self {
        NodeParams {
            operation: None,
            vector_operation: None,
            blend_mode: None,
            use_clamp: false,
            invert: false,
            ramp: None,
            gradient: None,
            voronoi_metric: None,
            wave_kind: None,
            wave_profile: None,
            mapping_kind: None,
            image: None,
            group: None,
            attribute_name: None,
            uv_index: None,
            curves: None,
            material_param: false,
            from_min: 0.0,
            from_max: 1.0,
            to_min: 0.0,
            to_max: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique within its graph; shader-side variable names derive from it.
    pub name: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub inputs: Vec<Socket>,
    #[serde(default)]
    pub outputs: Vec<Socket>,
    #[serde(default)]
    pub params: NodeParams,
}

impl Node {
    pub fn new(name: &str, kind: NodeKind) -> Self {
        Node {
            name: name.to_string(),
            kind,
            inputs: Vec::new(),
            outputs: Vec::new(),
            params: NodeParams::default(),
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<Socket>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<Socket>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_params(mut self, params: NodeParams) -> Self {
        self.params = params;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeGraph {
    pub name: String,
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

impl NodeGraph {
    pub fn new(name: &str) -> Self {
        NodeGraph {
            name: name.to_string(),
            nodes: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn node_by_kind(&self, kind: NodeKind) -> Option<&Node> {
        self.nodes.iter().find(|n| n.kind == kind)
    }

    /// The link driving the given input socket, if any. At most one link may
    /// target an input socket; the first match wins.
    pub fn input_link(&self, node: &str, socket: usize) -> Option<&Link> {
        self.links
            .iter()
            .find(|l| l.to_node == node && l.to_socket == socket)
    }

    pub fn link(&mut self, from_node: &str, from_socket: usize, to_node: &str, to_socket: usize) {
        self.links.push(Link {
            from_node: from_node.to_string(),
            from_socket,
            to_node: to_node.to_string(),
            to_socket,
        });
    }
}

pub fn load_graph_from_path(path: impl AsRef<Path>) -> Result<NodeGraph> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read graph json at {}", path.display()))?;
    let graph: NodeGraph = serde_json::from_str(&text).context("failed to parse graph json")?;
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_kind_tags_use_screaming_snake_case() {
        let json = serde_json::to_string(&NodeKind::BsdfPrincipled).unwrap();
        assert_eq!(json, "\"BSDF_PRINCIPLED\"");
        let kind: NodeKind = serde_json::from_str("\"TEX_NOISE\"").unwrap();
        assert_eq!(kind, NodeKind::TexNoise);
    }

    #[test]
    fn socket_default_roundtrip() {
        let s = Socket::color("Base Color", [0.8, 0.8, 0.8]);
        let json = serde_json::to_string(&s).unwrap();
        let back: Socket = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, SocketKind::Color);
        assert_eq!(back.default_value.as_vector(), [0.8, 0.8, 0.8]);
    }

    #[test]
    fn graph_roundtrip_preserves_links() {
        let mut g = NodeGraph::new("mat");
        g.nodes.push(
            Node::new("rgb", NodeKind::Rgb)
                .with_outputs(vec![Socket::color("Color", [1.0, 0.0, 0.0])]),
        );
        g.nodes.push(
            Node::new("out", NodeKind::OutputMaterial).with_inputs(vec![Socket::shader("Surface")]),
        );
        g.link("rgb", 0, "out", 0);

        let json = serde_json::to_string(&g).unwrap();
        let back: NodeGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back.links.len(), 1);
        assert!(back.input_link("out", 0).is_some());
        assert!(back.input_link("out", 1).is_none());
    }

    #[test]
    fn scalar_default_coerces_to_vector_by_splat() {
        let d = SocketDefault::Value(0.5);
        assert_eq!(d.as_vector(), [0.5, 0.5, 0.5]);
    }
}
