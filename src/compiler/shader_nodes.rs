//! Shading-model nodes and shader combinators.
//!
//! Every node here produces the seven-channel tuple; combinators blend the
//! tuples of their operands channel by channel. Canonical input layouts are
//! spelled out per node next to the socket indices.

use crate::dsl::{Node, NodeGraph, NodeKind};

use super::context::{ChannelOuts, CompileContext, DiagnosticKind};
use super::error::GraphError;
use super::{parse_shader_input, parse_value_input, parse_vector_input, rgb_to_bw, write_normal};

pub(crate) fn parse<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
    socket: usize,
) -> Result<ChannelOuts, GraphError> {
    match node.kind {
        NodeKind::MixShader => mix_shader(ctx, graph, node),
        NodeKind::AddShader => add_shader(ctx, graph, node),
        NodeKind::BsdfPrincipled => bsdf_principled(ctx, graph, node),
        NodeKind::BsdfDiffuse => bsdf_diffuse(ctx, graph, node),
        NodeKind::BsdfGlossy | NodeKind::BsdfAnisotropic => bsdf_glossy(ctx, graph, node),
        NodeKind::BsdfGlass | NodeKind::BsdfRefraction => bsdf_glass(ctx, graph, node),
        NodeKind::BsdfTransparent => bsdf_transparent(ctx),
        NodeKind::BsdfTranslucent => bsdf_translucent(ctx, graph, node),
        NodeKind::BsdfVelvet => bsdf_velvet(ctx, graph, node),
        NodeKind::BsdfToon | NodeKind::SubsurfaceScattering => bsdf_diffuse_like(ctx, graph, node),
        NodeKind::Emission => emission(ctx, graph, node),
        NodeKind::AmbientOcclusion => ambient_occlusion(ctx, graph, node),
        NodeKind::Holdout => Ok(holdout()),
        NodeKind::VolumeAbsorption | NodeKind::VolumeScatter => {
            ctx.warn(
                DiagnosticKind::UnsupportedNode,
                &node.name,
                "volume shading nodes are not supported",
            );
            Ok(ChannelOuts::neutral())
        }
        _ => Err(GraphError::TypeMismatch {
            node: node.name.clone(),
            socket,
            expected: "shader",
        }),
    }
}

fn mix_chan(a: &str, b: &str, inv: &str, fac: &str) -> String {
    format!("({a} * {inv} + {b} * {fac})")
}

/// Inputs: 0 Fac, 1 Shader, 2 Shader.
fn mix_shader<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<ChannelOuts, GraphError> {
    let prefix = if graph.input_link(&node.name, 0).is_some() {
        ""
    } else {
        "const "
    };
    let fac = parse_value_input(ctx, graph, node, 0)?;
    let name = ctx.node_name(&node.name);
    let fac_var = format!("{name}_fac");
    let fac_inv = format!("{name}_fac_inv");
    ctx.cur().write(format!("{prefix}float {fac_var} = {fac};"));
    ctx.cur()
        .write(format!("{prefix}float {fac_inv} = 1.0 - {fac_var};"));

    let a = parse_shader_input(ctx, graph, node, 1)?;
    let b = parse_shader_input(ctx, graph, node, 2)?;
    Ok(ChannelOuts {
        basecol: mix_chan(&a.basecol, &b.basecol, &fac_inv, &fac_var),
        roughness: mix_chan(&a.roughness, &b.roughness, &fac_inv, &fac_var),
        metallic: mix_chan(&a.metallic, &b.metallic, &fac_inv, &fac_var),
        occlusion: mix_chan(&a.occlusion, &b.occlusion, &fac_inv, &fac_var),
        specular: mix_chan(&a.specular, &b.specular, &fac_inv, &fac_var),
        opacity: mix_chan(&a.opacity, &b.opacity, &fac_inv, &fac_var),
        emission: mix_chan(&a.emission, &b.emission, &fac_inv, &fac_var),
    })
}

/// Inputs: 0 Shader, 1 Shader. Energy-carrying channels add, the rest
/// average.
fn add_shader<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<ChannelOuts, GraphError> {
    let a = parse_shader_input(ctx, graph, node, 0)?;
    let b = parse_shader_input(ctx, graph, node, 1)?;
    let avg = |x: &str, y: &str| format!("({x} * 0.5 + {y} * 0.5)");
    Ok(ChannelOuts {
        basecol: format!("({} + {})", a.basecol, b.basecol),
        roughness: avg(&a.roughness, &b.roughness),
        metallic: avg(&a.metallic, &b.metallic),
        occlusion: avg(&a.occlusion, &b.occlusion),
        specular: avg(&a.specular, &b.specular),
        opacity: avg(&a.opacity, &b.opacity),
        emission: format!("({} + {})", a.emission, b.emission),
    })
}

/// Inputs: 0 Base Color, 1 Roughness, 2 Metallic, 3 Specular,
/// 4 Emission Color, 5 Emission Strength, 6 Alpha, 7 Normal.
fn bsdf_principled<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<ChannelOuts, GraphError> {
    write_normal(ctx, graph, node, 7)?;
    let mut outs = ChannelOuts::neutral();
    outs.basecol = parse_vector_input(ctx, graph, node, 0)?;
    outs.roughness = parse_value_input(ctx, graph, node, 1)?;
    outs.metallic = parse_value_input(ctx, graph, node, 2)?;
    outs.specular = parse_value_input(ctx, graph, node, 3)?;

    let strength_default = node
        .inputs
        .get(5)
        .map(|s| s.default_value.as_value())
        .unwrap_or(0.0);
    if graph.input_link(&node.name, 4).is_some()
        || graph.input_link(&node.name, 5).is_some()
        || strength_default != 0.0
    {
        ctx.emission_found = true;
        let ecol = parse_vector_input(ctx, graph, node, 4)?;
        let estr = parse_value_input(ctx, graph, node, 5)?;
        outs.emission = format!("({} * {estr})", rgb_to_bw(&ecol));
    }
    if ctx.config.opacity {
        outs.opacity = parse_value_input(ctx, graph, node, 6)?;
    }
    Ok(outs)
}

/// Inputs: 0 Color, 1 Roughness, 2 Normal.
fn bsdf_diffuse<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<ChannelOuts, GraphError> {
    write_normal(ctx, graph, node, 2)?;
    let mut outs = ChannelOuts::neutral();
    outs.basecol = parse_vector_input(ctx, graph, node, 0)?;
    outs.roughness = parse_value_input(ctx, graph, node, 1)?;
    outs.specular = "0.0".to_string();
    Ok(outs)
}

/// Inputs: 0 Color, 1 Roughness, then Normal last. Fully metallic.
fn bsdf_glossy<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<ChannelOuts, GraphError> {
    write_normal(ctx, graph, node, node.inputs.len().saturating_sub(1))?;
    let mut outs = ChannelOuts::neutral();
    outs.basecol = parse_vector_input(ctx, graph, node, 0)?;
    outs.roughness = parse_value_input(ctx, graph, node, 1)?;
    outs.metallic = "1.0".to_string();
    Ok(outs)
}

/// Inputs: 0 Color, 1 Roughness, then Normal last. Renders fully
/// transparent in the opacity pass.
fn bsdf_glass<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<ChannelOuts, GraphError> {
    write_normal(ctx, graph, node, node.inputs.len().saturating_sub(1))?;
    let mut outs = ChannelOuts::neutral();
    outs.basecol = parse_vector_input(ctx, graph, node, 0)?;
    outs.roughness = parse_value_input(ctx, graph, node, 1)?;
    if ctx.config.opacity {
        outs.opacity = "0.0".to_string();
    }
    Ok(outs)
}

fn bsdf_transparent(ctx: &mut CompileContext) -> Result<ChannelOuts, GraphError> {
    let mut outs = ChannelOuts::neutral();
    if ctx.config.opacity {
        outs.opacity = "0.0".to_string();
    }
    Ok(outs)
}

/// Inputs: 0 Color, 1 Normal. Opacity follows the inverse of brightness.
fn bsdf_translucent<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<ChannelOuts, GraphError> {
    write_normal(ctx, graph, node, 1)?;
    let mut outs = ChannelOuts::neutral();
    outs.basecol = parse_vector_input(ctx, graph, node, 0)?;
    if ctx.config.opacity {
        outs.opacity = format!("(1.0 - {})", rgb_to_bw(&outs.basecol));
    }
    Ok(outs)
}

/// Inputs: 0 Color, 1 Sigma, 2 Normal.
fn bsdf_velvet<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<ChannelOuts, GraphError> {
    write_normal(ctx, graph, node, 2)?;
    let mut outs = ChannelOuts::neutral();
    outs.basecol = parse_vector_input(ctx, graph, node, 0)?;
    outs.roughness = "1.0".to_string();
    outs.metallic = parse_value_input(ctx, graph, node, 1)?;
    Ok(outs)
}

/// Diffuse-shaped nodes whose extra inputs have no channel mapping: Color
/// first, Normal last.
fn bsdf_diffuse_like<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<ChannelOuts, GraphError> {
    write_normal(ctx, graph, node, node.inputs.len().saturating_sub(1))?;
    let mut outs = ChannelOuts::neutral();
    outs.basecol = parse_vector_input(ctx, graph, node, 0)?;
    outs.specular = "0.0".to_string();
    Ok(outs)
}

/// Inputs: 0 Color, 1 Strength.
fn emission<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<ChannelOuts, GraphError> {
    ctx.emission_found = true;
    let mut outs = ChannelOuts::neutral();
    outs.basecol = parse_vector_input(ctx, graph, node, 0)?;
    outs.emission = parse_value_input(ctx, graph, node, 1)?;
    outs.specular = "0.0".to_string();
    Ok(outs)
}

/// Inputs: 0 Color, 1 Distance. The color brightness drives occlusion.
fn ambient_occlusion<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<ChannelOuts, GraphError> {
    let mut outs = ChannelOuts::neutral();
    let col = parse_vector_input(ctx, graph, node, 0)?;
    outs.occlusion = rgb_to_bw(&col);
    Ok(outs)
}

fn holdout() -> ChannelOuts {
    let mut outs = ChannelOuts::neutral();
    outs.basecol = "vec3(0.0, 0.0, 0.0)".to_string();
    outs.roughness = "0.0".to_string();
    outs.metallic = "0.0".to_string();
    outs.specular = "0.0".to_string();
    outs.occlusion = "0.0".to_string();
    outs
}
