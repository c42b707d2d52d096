//! Per-pass compiler state.
//!
//! Every material compile constructs a fresh [`CompileContext`]; nothing in
//! here outlives a pass or is shared between materials. The only cross-pass
//! resource is the [`AssetRegistry`], which tolerates concurrent appends.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::assets::{AssetRegistry, ImageResolver};
use crate::dsl::{Node, NodeGraph};

use super::stage::{EmissionTarget, StageKind};

/// What the stage scheduler asked this invocation to produce.
#[derive(Debug, Clone, Copy)]
pub struct CompileConfig {
    pub surface: bool,
    /// Emit the opacity channel. Off by default; the scheduler turns it on
    /// for blended and translucent passes.
    pub opacity: bool,
    pub displacement: bool,
    /// Restrict the pass to base color; skips normal mapping entirely.
    pub basecol_only: bool,
    /// Route displacement to the tessellation-evaluation stage instead of
    /// the vertex stage.
    pub tessellation: bool,
    /// Whether the mesh pipeline exports precomputed tangents. Without them
    /// normal mapping synthesizes a tangent frame from screen-space
    /// derivatives.
    pub export_tangents: bool,
}

impl Default for CompileConfig {
    fn default() -> Self {
        CompileConfig {
            surface: true,
            opacity: false,
            displacement: true,
            basecol_only: false,
            tessellation: false,
            export_tangents: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    MissingAsset,
    UnsupportedNode,
    /// A lossy implicit conversion, e.g. a color output reduced to luma for
    /// a value input.
    TypeCoercion,
}

/// Non-fatal condition recorded during a pass and returned with the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub node: String,
    pub message: String,
}

/// Particle data channels referenced by ParticleInfo nodes. The particle
/// system uploads only the channels a material actually reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParticleChannel {
    Index,
    Age,
    Lifetime,
    Location,
    Size,
    Velocity,
    AngularVelocity,
}

/// The seven canonical material output channels as expression strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOuts {
    pub basecol: String,
    pub roughness: String,
    pub metallic: String,
    pub occlusion: String,
    pub specular: String,
    pub opacity: String,
    pub emission: String,
}

impl ChannelOuts {
    /// Neutral defaults used when a shader socket is unlinked.
    pub fn neutral() -> Self {
        ChannelOuts {
            basecol: "vec3(0.8, 0.8, 0.8)".to_string(),
            roughness: "0.0".to_string(),
            metallic: "0.0".to_string(),
            occlusion: "1.0".to_string(),
            specular: "1.0".to_string(),
            opacity: "1.0".to_string(),
            emission: "0.0".to_string(),
        }
    }
}

/// One level of group nesting: the group node at the call site and the graph
/// that contains it. Group-input sockets resolve against this frame.
#[derive(Clone, Copy)]
pub(crate) struct GroupFrame<'g> {
    pub call_node: &'g Node,
    pub graph: &'g NodeGraph,
}

/// Memoization key: a node output is evaluated at most once per stage per
/// enclosing-group instantiation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct MemoKey {
    pub node: String,
    pub socket: usize,
    pub scope: String,
    pub stage: StageKind,
}

pub struct CompileContext<'g> {
    pub config: CompileConfig,

    pub vert: EmissionTarget,
    pub frag: EmissionTarget,
    pub geom: EmissionTarget,
    pub tesc: EmissionTarget,
    pub tese: EmissionTarget,
    cur_stage: StageKind,

    pub(crate) parents: Vec<GroupFrame<'g>>,
    pub(crate) memo: HashMap<MemoKey, String>,
    /// Texture fetches shared between sockets of one image node.
    pub(crate) parsed_stores: HashSet<String>,
    /// Scoped node ids currently being evaluated; re-entry means a cycle.
    pub(crate) eval_stack: Vec<String>,

    /// Bump side-channel: while set, texture/procedural leaves additionally
    /// emit four offset samples for finite-difference normal reconstruction.
    pub sample_bump: bool,
    pub sample_bump_res: String,

    /// One-shot guard: only the first normal consumer per pass wins.
    pub normal_parsed: bool,
    pub emission_found: bool,
    pub particle_channels: BTreeSet<ParticleChannel>,
    pub diagnostics: Vec<Diagnostic>,

    pub(crate) resolver: &'g dyn ImageResolver,
    pub(crate) registry: &'g AssetRegistry,
}

impl<'g> CompileContext<'g> {
    pub fn new(
        config: CompileConfig,
        resolver: &'g dyn ImageResolver,
        registry: &'g AssetRegistry,
    ) -> Self {
        CompileContext {
            config,
            vert: EmissionTarget::new(StageKind::Vertex),
            frag: EmissionTarget::new(StageKind::Fragment),
            geom: EmissionTarget::new(StageKind::Geometry),
            tesc: EmissionTarget::new(StageKind::TessControl),
            tese: EmissionTarget::new(StageKind::TessEval),
            cur_stage: StageKind::Fragment,
            parents: Vec::new(),
            memo: HashMap::new(),
            parsed_stores: HashSet::new(),
            eval_stack: Vec::new(),
            sample_bump: false,
            sample_bump_res: String::new(),
            normal_parsed: false,
            emission_found: false,
            particle_channels: BTreeSet::new(),
            diagnostics: Vec::new(),
            resolver,
            registry,
        }
    }

    pub fn stage(&self) -> StageKind {
        self.cur_stage
    }

    pub fn set_stage(&mut self, stage: StageKind) {
        self.cur_stage = stage;
    }

    pub fn target(&mut self, stage: StageKind) -> &mut EmissionTarget {
        match stage {
            StageKind::Vertex => &mut self.vert,
            StageKind::Fragment => &mut self.frag,
            StageKind::Geometry => &mut self.geom,
            StageKind::TessControl => &mut self.tesc,
            StageKind::TessEval => &mut self.tese,
        }
    }

    /// The emission target statements currently flow into.
    pub fn cur(&mut self) -> &mut EmissionTarget {
        self.target(self.cur_stage)
    }

    /// Reset the traversal state between the surface and displacement
    /// sections of one compile. Emitted statements are kept.
    pub(crate) fn reset_pass(&mut self) {
        self.parents.clear();
        self.memo.clear();
        self.parsed_stores.clear();
        self.eval_stack.clear();
        self.normal_parsed = false;
        self.sample_bump = false;
        self.sample_bump_res.clear();
    }

    /// Name-mangling scope derived from the group call stack.
    pub(crate) fn scope(&self) -> String {
        self.parents
            .iter()
            .map(|f| f.call_node.name.as_str())
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Unique, shading-language-safe name for a node in the current scope.
    pub fn node_name(&self, raw: &str) -> String {
        let mut s = String::new();
        for frame in &self.parents {
            s.push_str(&frame.call_node.name);
            s.push('_');
        }
        s.push_str(raw);
        safesrc(&s)
    }

    /// Register an include library on the current target and with the shared
    /// asset registry.
    pub fn add_include(&mut self, path: &str) {
        self.registry.register_include(path);
        self.cur().add_include(path);
    }

    pub fn warn(&mut self, kind: DiagnosticKind, node: &str, message: impl Into<String>) {
        let message = message.into();
        log::warn!("material node `{node}`: {message}");
        self.diagnostics.push(Diagnostic {
            kind,
            node: node.to_string(),
            message,
        });
    }
}

/// Sanitize a node name for use in generated source. Consecutive
/// underscores are reserved for generated suffixes.
pub(crate) fn safesrc(name: &str) -> String {
    let mut s: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    while s.contains("__") {
        s = s.replace("__", "_x");
    }
    if s.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        s.insert(0, '_');
    }
    s
}
