//! Material node-graph compiler.
//!
//! [`compile_material`] walks a [`NodeGraph`] backwards from its material
//! output node and emits ordered statement lists into per-stage
//! [`EmissionTarget`]s. Evaluation is demand-driven: shader sockets produce
//! the seven-channel [`ChannelOuts`] tuple, vector/color and value sockets
//! produce expression strings. Every non-shader socket result is materialized
//! exactly once per stage and scope through [`write_result`].

use crate::assets::{AssetRegistry, ImageResolver};
use crate::dsl::{Link, Node, NodeGraph, NodeKind, Socket, SocketKind};

pub mod context;
pub mod error;
pub mod stage;

mod color_nodes;
mod converter_nodes;
mod input_nodes;
mod shader_nodes;
mod texture_nodes;
mod vector_nodes;

pub use context::{
    ChannelOuts, CompileConfig, CompileContext, Diagnostic, DiagnosticKind, ParticleChannel,
};
pub use error::GraphError;
pub use stage::{EmissionTarget, StageKind, Uniform, VertexElement};

use context::{safesrc, GroupFrame, MemoKey};
use stage::{fmt_f32, to_vec3};

/// Input socket layout of the material output node.
const OUT_SURFACE: usize = 0;
const OUT_VOLUME: usize = 1;
const OUT_DISPLACEMENT: usize = 2;

/// Result of one material compile: the populated stage targets plus
/// everything the host pipeline needs to bind them.
#[derive(Debug)]
pub struct CompiledMaterial {
    pub vert: EmissionTarget,
    pub frag: EmissionTarget,
    pub geom: EmissionTarget,
    pub tesc: EmissionTarget,
    pub tese: EmissionTarget,
    pub emission_found: bool,
    pub particle_channels: std::collections::BTreeSet<ParticleChannel>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompiledMaterial {
    pub fn target(&self, stage: StageKind) -> &EmissionTarget {
        match stage {
            StageKind::Vertex => &self.vert,
            StageKind::Fragment => &self.frag,
            StageKind::Geometry => &self.geom,
            StageKind::TessControl => &self.tesc,
            StageKind::TessEval => &self.tese,
        }
    }
}

/// Compile one material graph.
///
/// The graph is read-only and may be shared between threads; all mutable
/// state lives in a per-call [`CompileContext`]. Missing assets and
/// unsupported nodes degrade to placeholders and surface as diagnostics;
/// malformed graphs (cycles, dangling links, shader-type violations) fail
/// with a [`GraphError`].
pub fn compile_material<'g>(
    graph: &'g NodeGraph,
    config: CompileConfig,
    resolver: &'g dyn ImageResolver,
    registry: &'g AssetRegistry,
) -> Result<CompiledMaterial, GraphError> {
    let output = graph
        .node_by_kind(NodeKind::OutputMaterial)
        .ok_or_else(|| GraphError::MissingOutput {
            graph: graph.name.clone(),
        })?;

    let mut ctx = CompileContext::new(config, resolver, registry);

    if graph.input_link(&output.name, OUT_VOLUME).is_some() {
        ctx.warn(
            DiagnosticKind::UnsupportedNode,
            &output.name,
            "volume shading is not supported, the Volume socket is ignored",
        );
    }

    if config.surface || config.opacity || config.basecol_only {
        ctx.set_stage(StageKind::Fragment);
        let outs = parse_shader_input(&mut ctx, graph, output, OUT_SURFACE)?;
        let emission_found = ctx.emission_found;
        let frag = ctx.target(StageKind::Fragment);
        if config.basecol_only {
            frag.write(format!("vec3 basecol = {};", outs.basecol));
        } else if config.surface {
            frag.write(format!("vec3 basecol = {};", outs.basecol));
            frag.write(format!("float roughness = {};", outs.roughness));
            frag.write(format!("float metallic = {};", outs.metallic));
            frag.write(format!("float occlusion = {};", outs.occlusion));
            frag.write(format!("float specular = {};", outs.specular));
            if emission_found {
                frag.write(format!("float emission = {};", outs.emission));
            }
        }
        if config.opacity && !config.basecol_only {
            frag.write(format!("float opacity = {};", outs.opacity));
        }
    }

    if config.displacement && graph.input_link(&output.name, OUT_DISPLACEMENT).is_some() {
        ctx.reset_pass();
        let stage = if config.tessellation {
            StageKind::TessEval
        } else {
            StageKind::Vertex
        };
        ctx.set_stage(stage);
        let disp = parse_vector_input(&mut ctx, graph, output, OUT_DISPLACEMENT)?;
        ctx.cur().write(format!("vec3 disp = {disp};"));
    }

    Ok(CompiledMaterial {
        vert: ctx.vert,
        frag: ctx.frag,
        geom: ctx.geom,
        tesc: ctx.tesc,
        tese: ctx.tese,
        emission_found: ctx.emission_found,
        particle_channels: ctx.particle_channels,
        diagnostics: ctx.diagnostics,
    })
}

fn resolve_link<'g>(
    graph: &'g NodeGraph,
    link: &Link,
) -> Result<(&'g Node, &'g Socket), GraphError> {
    let from = graph
        .node(&link.from_node)
        .ok_or_else(|| GraphError::UnknownNode {
            node: link.from_node.clone(),
        })?;
    let socket = from
        .outputs
        .get(link.from_socket)
        .ok_or_else(|| GraphError::UnknownNode {
            node: link.from_node.clone(),
        })?;
    Ok((from, socket))
}

/// Evaluate a shader input socket. Unlinked sockets yield the neutral
/// channel tuple; links from non-shader sockets are a hard type error.
pub(crate) fn parse_shader_input<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
    socket: usize,
) -> Result<ChannelOuts, GraphError> {
    let Some(link) = graph.input_link(&node.name, socket) else {
        return Ok(ChannelOuts::neutral());
    };
    let link = link.clone();
    let (from, out_socket) = resolve_link(graph, &link)?;
    if out_socket.kind != SocketKind::Shader {
        return Err(GraphError::TypeMismatch {
            node: from.name.clone(),
            socket: link.from_socket,
            expected: "shader",
        });
    }
    parse_shader(ctx, graph, from, link.from_socket)
}

pub(crate) fn parse_shader<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
    socket: usize,
) -> Result<ChannelOuts, GraphError> {
    let scoped = format!("{}:{}:{}", ctx.scope(), node.name, socket);
    if ctx.eval_stack.contains(&scoped) {
        return Err(GraphError::Cycle {
            node: node.name.clone(),
        });
    }
    ctx.eval_stack.push(scoped);
    let res = match node.kind {
        NodeKind::Group => parse_group_shader(ctx, graph, node, socket),
        NodeKind::GroupInput => parse_group_input_shader(ctx, socket),
        NodeKind::Reroute => parse_shader_input(ctx, graph, node, 0),
        _ => shader_nodes::parse(ctx, graph, node, socket),
    };
    ctx.eval_stack.pop();
    res
}

fn parse_group_shader<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
    socket: usize,
) -> Result<ChannelOuts, GraphError> {
    let Some(inner) = node.params.group.as_deref() else {
        ctx.warn(
            DiagnosticKind::UnsupportedNode,
            &node.name,
            "group node carries no graph",
        );
        return Ok(ChannelOuts::neutral());
    };
    let Some(group_out) = inner.node_by_kind(NodeKind::GroupOutput) else {
        ctx.warn(
            DiagnosticKind::UnsupportedNode,
            &node.name,
            "group graph has no output node",
        );
        return Ok(ChannelOuts::neutral());
    };
    ctx.parents.push(GroupFrame {
        call_node: node,
        graph,
    });
    let res = parse_shader_input(ctx, inner, group_out, socket);
    ctx.parents.pop();
    res
}

fn parse_group_input_shader<'g>(
    ctx: &mut CompileContext<'g>,
    socket: usize,
) -> Result<ChannelOuts, GraphError> {
    let Some(frame) = ctx.parents.pop() else {
        return Ok(ChannelOuts::neutral());
    };
    let res = parse_shader_input(ctx, frame.graph, frame.call_node, socket);
    ctx.parents.push(frame);
    res
}

/// Evaluate an input socket as a vec3 expression. Value-typed sources are
/// splatted; shader sources are a type error.
pub(crate) fn parse_vector_input<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
    socket: usize,
) -> Result<String, GraphError> {
    let Some(link) = graph.input_link(&node.name, socket) else {
        let def = node
            .inputs
            .get(socket)
            .map(|s| s.default_value.as_vector())
            .unwrap_or([0.0; 3]);
        return Ok(to_vec3(def));
    };
    let link = link.clone();
    let (from, out_socket) = resolve_link(graph, &link)?;
    match out_socket.kind {
        SocketKind::Shader => Err(GraphError::TypeMismatch {
            node: from.name.clone(),
            socket: link.from_socket,
            expected: "vector",
        }),
        SocketKind::Value => {
            let res = write_result(ctx, graph, from, link.from_socket)?;
            Ok(format!("vec3({res})"))
        }
        SocketKind::Color | SocketKind::Vector => write_result(ctx, graph, from, link.from_socket),
    }
}

/// Evaluate an input socket as a float expression. Color/vector sources
/// reduce to luma; shader sources are a type error.
pub(crate) fn parse_value_input<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
    socket: usize,
) -> Result<String, GraphError> {
    let Some(link) = graph.input_link(&node.name, socket) else {
        let def = node
            .inputs
            .get(socket)
            .map(|s| s.default_value.as_value())
            .unwrap_or(0.0);
        return Ok(fmt_f32(def));
    };
    let link = link.clone();
    let (from, out_socket) = resolve_link(graph, &link)?;
    match out_socket.kind {
        SocketKind::Shader => Err(GraphError::TypeMismatch {
            node: from.name.clone(),
            socket: link.from_socket,
            expected: "value",
        }),
        SocketKind::Color | SocketKind::Vector => {
            let res = write_result(ctx, graph, from, link.from_socket)?;
            ctx.warn(
                DiagnosticKind::TypeCoercion,
                &link.from_node,
                format!(
                    "output {} reduced to brightness for the value input {} of `{}`",
                    link.from_socket, socket, node.name
                ),
            );
            Ok(rgb_to_bw(&res))
        }
        SocketKind::Value => write_result(ctx, graph, from, link.from_socket),
    }
}

pub(crate) fn res_var_name(ctx: &CompileContext, node: &Node, socket: &Socket) -> String {
    format!("{}_{}_res", ctx.node_name(&node.name), safesrc(&socket.name))
}

pub(crate) fn store_var_name(ctx: &CompileContext, node: &Node) -> String {
    format!("{}_store", ctx.node_name(&node.name))
}

/// Materialize a node output as a named variable in the current stage.
/// Memoized per (node, socket, scope, stage): a shared subtree is emitted
/// once and every further consumer reuses the variable.
pub(crate) fn write_result<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
    socket: usize,
) -> Result<String, GraphError> {
    let out_socket = node
        .outputs
        .get(socket)
        .ok_or_else(|| GraphError::UnknownNode {
            node: node.name.clone(),
        })?;
    let key = MemoKey {
        node: node.name.clone(),
        socket,
        scope: ctx.scope(),
        stage: ctx.stage(),
    };
    if let Some(var) = ctx.memo.get(&key) {
        return Ok(var.clone());
    }

    let scoped = format!("{}:{}:{}", ctx.scope(), node.name, socket);
    if ctx.eval_stack.contains(&scoped) {
        return Err(GraphError::Cycle {
            node: node.name.clone(),
        });
    }
    ctx.eval_stack.push(scoped);
    let evaluated = match out_socket.kind {
        SocketKind::Shader => Err(GraphError::TypeMismatch {
            node: node.name.clone(),
            socket,
            expected: "vector",
        }),
        SocketKind::Color | SocketKind::Vector => {
            parse_vector(ctx, graph, node, socket).map(|rhs| ("vec3", rhs))
        }
        SocketKind::Value => parse_value(ctx, graph, node, socket).map(|rhs| ("float", rhs)),
    };
    ctx.eval_stack.pop();
    let (glsl_type, rhs) = evaluated?;

    let res_var = res_var_name(ctx, node, out_socket);
    ctx.cur().write(format!("{glsl_type} {res_var} = {rhs};"));
    ctx.memo.insert(key, res_var.clone());
    Ok(res_var)
}

fn parse_vector<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
    socket: usize,
) -> Result<String, GraphError> {
    match node.kind {
        NodeKind::Group => parse_group_vector(ctx, graph, node, socket),
        NodeKind::GroupInput => parse_group_input_vector(ctx, socket),
        NodeKind::Reroute => parse_vector_input(ctx, graph, node, 0),

        NodeKind::Attribute => input_nodes::attribute(ctx, node),
        NodeKind::TexCoord => input_nodes::tex_coord(ctx, socket),
        NodeKind::UvMap => input_nodes::uv_map(ctx, node),
        NodeKind::Rgb => input_nodes::rgb(ctx, node),
        NodeKind::VertexColor => input_nodes::vertex_color(ctx),
        NodeKind::Geometry => input_nodes::geometry(ctx, socket),
        NodeKind::Tangent => input_nodes::tangent(ctx),
        NodeKind::ObjectInfo => input_nodes::object_info_vector(ctx, socket),
        NodeKind::ParticleInfo => input_nodes::particle_info_vector(ctx, socket),
        NodeKind::CameraData => input_nodes::camera_data_vector(),

        NodeKind::TexImage => texture_nodes::tex_image(ctx, graph, node, socket),
        NodeKind::TexChecker => texture_nodes::tex_checker(ctx, graph, node, socket),
        NodeKind::TexBrick => texture_nodes::tex_brick(ctx, graph, node, socket),
        NodeKind::TexGradient => texture_nodes::tex_gradient(ctx, graph, node, socket),
        NodeKind::TexNoise => texture_nodes::tex_noise(ctx, graph, node, socket),
        NodeKind::TexVoronoi => texture_nodes::tex_voronoi(ctx, graph, node, socket),
        NodeKind::TexMusgrave => texture_nodes::tex_musgrave(ctx, graph, node),
        NodeKind::TexWave => texture_nodes::tex_wave(ctx, graph, node, socket),
        NodeKind::TexMagic => texture_nodes::tex_magic(ctx, graph, node, socket),

        NodeKind::Mapping => vector_nodes::mapping(ctx, graph, node),
        NodeKind::NormalMap => vector_nodes::normal_map(ctx, graph, node),
        NodeKind::Bump => vector_nodes::bump(ctx, graph, node),
        NodeKind::Normal => vector_nodes::normal_out(node),
        NodeKind::CurveVec => vector_nodes::curve_vec(ctx, graph, node),
        NodeKind::CurveRgb => color_nodes::curve_rgb(ctx, graph, node),

        NodeKind::CombineXyz => converter_nodes::combine_xyz(ctx, graph, node),
        NodeKind::CombineRgb => converter_nodes::combine_rgb(ctx, graph, node),
        NodeKind::VectorMath => converter_nodes::vector_math(ctx, graph, node),
        NodeKind::ColorRamp => converter_nodes::color_ramp(ctx, graph, node, socket),

        NodeKind::MixRgb => color_nodes::mix_rgb(ctx, graph, node),
        NodeKind::Invert => color_nodes::invert(ctx, graph, node),
        NodeKind::Gamma => color_nodes::gamma(ctx, graph, node),
        NodeKind::BrightContrast => color_nodes::bright_contrast(ctx, graph, node),
        NodeKind::HueSat => color_nodes::hue_sat(ctx, graph, node),

        // Value-only producers splat when a vector is requested.
        NodeKind::Value
        | NodeKind::Math
        | NodeKind::SeparateXyz
        | NodeKind::SeparateRgb
        | NodeKind::RgbToBw
        | NodeKind::Clamp
        | NodeKind::MapRange
        | NodeKind::LayerWeight
        | NodeKind::Fresnel
        | NodeKind::LightPath
        | NodeKind::Wireframe => {
            let res = parse_value(ctx, graph, node, socket)?;
            Ok(format!("vec3({res})"))
        }

        NodeKind::MixShader
        | NodeKind::AddShader
        | NodeKind::BsdfPrincipled
        | NodeKind::BsdfDiffuse
        | NodeKind::BsdfGlossy
        | NodeKind::BsdfAnisotropic
        | NodeKind::BsdfGlass
        | NodeKind::BsdfTransparent
        | NodeKind::BsdfTranslucent
        | NodeKind::BsdfVelvet
        | NodeKind::BsdfToon
        | NodeKind::BsdfRefraction
        | NodeKind::Emission
        | NodeKind::AmbientOcclusion
        | NodeKind::SubsurfaceScattering
        | NodeKind::Holdout
        | NodeKind::VolumeAbsorption
        | NodeKind::VolumeScatter
        | NodeKind::GroupOutput
        | NodeKind::OutputMaterial => Err(GraphError::TypeMismatch {
            node: node.name.clone(),
            socket,
            expected: "vector",
        }),
    }
}

fn parse_value<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
    socket: usize,
) -> Result<String, GraphError> {
    match node.kind {
        NodeKind::Group => parse_group_value(ctx, graph, node, socket),
        NodeKind::GroupInput => parse_group_input_value(ctx, socket),
        NodeKind::Reroute => parse_value_input(ctx, graph, node, 0),

        NodeKind::Value => converter_nodes::value(ctx, node),
        NodeKind::Math => converter_nodes::math(ctx, graph, node),
        NodeKind::VectorMath => converter_nodes::vector_math_value(ctx, graph, node),
        NodeKind::ColorRamp => converter_nodes::color_ramp(ctx, graph, node, socket),
        NodeKind::SeparateXyz => converter_nodes::separate_xyz(ctx, graph, node, socket),
        NodeKind::SeparateRgb => converter_nodes::separate_rgb(ctx, graph, node, socket),
        NodeKind::RgbToBw => converter_nodes::rgb_to_bw_node(ctx, graph, node),
        NodeKind::Clamp => converter_nodes::clamp(ctx, graph, node),
        NodeKind::MapRange => converter_nodes::map_range(ctx, graph, node),

        NodeKind::LayerWeight => input_nodes::layer_weight(ctx, graph, node, socket),
        NodeKind::Fresnel => input_nodes::fresnel(ctx, graph, node),
        NodeKind::LightPath => input_nodes::light_path(socket),
        NodeKind::ObjectInfo => input_nodes::object_info_value(ctx, socket),
        NodeKind::ParticleInfo => input_nodes::particle_info_value(ctx, socket),
        NodeKind::CameraData => input_nodes::camera_data_value(ctx, socket),
        NodeKind::Wireframe => input_nodes::wireframe(ctx, node),
        NodeKind::Geometry => input_nodes::geometry_value(socket),

        NodeKind::TexImage => texture_nodes::tex_image(ctx, graph, node, socket),
        NodeKind::TexChecker => texture_nodes::tex_checker(ctx, graph, node, socket),
        NodeKind::TexBrick => texture_nodes::tex_brick(ctx, graph, node, socket),
        NodeKind::TexGradient => texture_nodes::tex_gradient(ctx, graph, node, socket),
        NodeKind::TexNoise => texture_nodes::tex_noise(ctx, graph, node, socket),
        NodeKind::TexVoronoi => texture_nodes::tex_voronoi(ctx, graph, node, socket),
        NodeKind::TexMusgrave => texture_nodes::tex_musgrave(ctx, graph, node),
        NodeKind::TexWave => texture_nodes::tex_wave(ctx, graph, node, socket),
        NodeKind::TexMagic => texture_nodes::tex_magic(ctx, graph, node, socket),

        NodeKind::Normal => vector_nodes::normal_dot(ctx, graph, node),

        // Color-only producers reduce to luma when a value is requested.
        NodeKind::Attribute
        | NodeKind::TexCoord
        | NodeKind::UvMap
        | NodeKind::Rgb
        | NodeKind::VertexColor
        | NodeKind::Tangent
        | NodeKind::Mapping
        | NodeKind::NormalMap
        | NodeKind::Bump
        | NodeKind::CurveVec
        | NodeKind::CurveRgb
        | NodeKind::CombineXyz
        | NodeKind::CombineRgb
        | NodeKind::MixRgb
        | NodeKind::Invert
        | NodeKind::Gamma
        | NodeKind::BrightContrast
        | NodeKind::HueSat => {
            let res = parse_vector(ctx, graph, node, socket)?;
            Ok(rgb_to_bw(&res))
        }

        NodeKind::MixShader
        | NodeKind::AddShader
        | NodeKind::BsdfPrincipled
        | NodeKind::BsdfDiffuse
        | NodeKind::BsdfGlossy
        | NodeKind::BsdfAnisotropic
        | NodeKind::BsdfGlass
        | NodeKind::BsdfTransparent
        | NodeKind::BsdfTranslucent
        | NodeKind::BsdfVelvet
        | NodeKind::BsdfToon
        | NodeKind::BsdfRefraction
        | NodeKind::Emission
        | NodeKind::AmbientOcclusion
        | NodeKind::SubsurfaceScattering
        | NodeKind::Holdout
        | NodeKind::VolumeAbsorption
        | NodeKind::VolumeScatter
        | NodeKind::GroupOutput
        | NodeKind::OutputMaterial => Err(GraphError::TypeMismatch {
            node: node.name.clone(),
            socket,
            expected: "value",
        }),
    }
}

fn parse_group_vector<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
    socket: usize,
) -> Result<String, GraphError> {
    let Some(inner) = node.params.group.as_deref() else {
        ctx.warn(
            DiagnosticKind::UnsupportedNode,
            &node.name,
            "group node carries no graph",
        );
        return Ok("vec3(0.0, 0.0, 0.0)".to_string());
    };
    let Some(group_out) = inner.node_by_kind(NodeKind::GroupOutput) else {
        ctx.warn(
            DiagnosticKind::UnsupportedNode,
            &node.name,
            "group graph has no output node",
        );
        return Ok("vec3(0.0, 0.0, 0.0)".to_string());
    };
    ctx.parents.push(GroupFrame {
        call_node: node,
        graph,
    });
    let res = parse_vector_input(ctx, inner, group_out, socket);
    ctx.parents.pop();
    res
}

fn parse_group_input_vector<'g>(
    ctx: &mut CompileContext<'g>,
    socket: usize,
) -> Result<String, GraphError> {
    let Some(frame) = ctx.parents.pop() else {
        return Ok("vec3(0.0, 0.0, 0.0)".to_string());
    };
    let res = parse_vector_input(ctx, frame.graph, frame.call_node, socket);
    ctx.parents.push(frame);
    res
}

fn parse_group_value<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
    socket: usize,
) -> Result<String, GraphError> {
    let Some(inner) = node.params.group.as_deref() else {
        ctx.warn(
            DiagnosticKind::UnsupportedNode,
            &node.name,
            "group node carries no graph",
        );
        return Ok("0.0".to_string());
    };
    let Some(group_out) = inner.node_by_kind(NodeKind::GroupOutput) else {
        ctx.warn(
            DiagnosticKind::UnsupportedNode,
            &node.name,
            "group graph has no output node",
        );
        return Ok("0.0".to_string());
    };
    ctx.parents.push(GroupFrame {
        call_node: node,
        graph,
    });
    let res = parse_value_input(ctx, inner, group_out, socket);
    ctx.parents.pop();
    res
}

fn parse_group_input_value<'g>(
    ctx: &mut CompileContext<'g>,
    socket: usize,
) -> Result<String, GraphError> {
    let Some(frame) = ctx.parents.pop() else {
        return Ok("0.0".to_string());
    };
    let res = parse_value_input(ctx, frame.graph, frame.call_node, socket);
    ctx.parents.push(frame);
    res
}

/// Drive the surface normal `n` from a shading node's Normal input. Only the
/// first linked Normal input per pass takes effect; NormalMap and Bump write
/// `n` themselves.
pub(crate) fn write_normal<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
    socket: usize,
) -> Result<(), GraphError> {
    if ctx.normal_parsed || ctx.config.basecol_only {
        return Ok(());
    }
    let Some(link) = graph.input_link(&node.name, socket) else {
        return Ok(());
    };
    let link = link.clone();
    ctx.normal_parsed = true;
    let res = parse_vector_input(ctx, graph, node, socket)?;
    let (from, _) = resolve_link(graph, &link)?;
    if !matches!(from.kind, NodeKind::NormalMap | NodeKind::Bump) {
        ctx.cur().write(format!("n = normalize({res});"));
    }
    Ok(())
}

/// Rec. 709 luma reduction, the canonical color-to-value coercion.
pub(crate) fn rgb_to_bw(expr: &str) -> String {
    format!("dot({expr}, vec3(0.2126, 0.7152, 0.0722))")
}

/// Emit the four offset height samples a downstream Bump node differentiates.
/// The height expression is re-evaluated with its first argument nudged along
/// x and y; naive single-level splitting, nested calls keep their own commas
/// on the tail side.
pub(crate) fn write_bump(ctx: &mut CompileContext, node: &Node, res: &str, scl: f32) {
    ctx.sample_bump_res = format!("{}_bump", ctx.node_name(&node.name));
    let Some((callee, rest)) = res.split_once('(') else {
        ctx.sample_bump = false;
        return;
    };
    let (co, post) = match rest.split_once(',') {
        Some((co, tail)) => (co, format!(",{tail}")),
        None => (rest.strip_suffix(')').unwrap_or(rest), ")".to_string()),
    };
    let s = fmt_f32(scl);
    let offsets = [
        format!("vec3(-{s}, 0.0, 0.0)"),
        format!("vec3({s}, 0.0, 0.0)"),
        format!("vec3(0.0, -{s}, 0.0)"),
        format!("vec3(0.0, {s}, 0.0)"),
    ];
    let base = ctx.sample_bump_res.clone();
    for (i, ofs) in offsets.iter().enumerate() {
        ctx.cur().write(format!(
            "float {base}_{n} = {callee}({co} + {ofs}{post};",
            n = i + 1
        ));
    }
    ctx.sample_bump = false;
}
