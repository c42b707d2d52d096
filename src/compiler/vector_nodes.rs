//! Vector manipulation and normal-perturbation nodes.

use crate::dsl::{CurvePoint, MappingKind, Node, NodeGraph};

use super::color_nodes::curve_channel_expr;
use super::context::CompileContext;
use super::error::GraphError;
use super::stage::{to_vec3, VertexElement};
use super::{parse_value_input, parse_vector_input};

const ZERO_VEC: &str = "vec3(0.0, 0.0, 0.0)";

/// Inputs: 0 Vector, 1 Location, 2 Rotation, 3 Scale. Rotation only emits
/// the euler helper when it can be nonzero.
pub(crate) fn mapping<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<String, GraphError> {
    let co = parse_vector_input(ctx, graph, node, 0)?;
    let loc = parse_vector_input(ctx, graph, node, 1)?;
    let rot = parse_vector_input(ctx, graph, node, 2)?;
    let scale = parse_vector_input(ctx, graph, node, 3)?;
    let rotated = rot != ZERO_VEC;
    if rotated {
        ctx.add_include("std/mapping.glsl");
    }
    let wrap = |expr: String| {
        if rotated {
            format!("rotate_euler({expr}, {rot})")
        } else {
            expr
        }
    };
    Ok(match node.params.mapping_kind.unwrap_or(MappingKind::Point) {
        MappingKind::Point => {
            let scaled = wrap(format!("({co} * {scale})"));
            format!("({scaled} + {loc})")
        }
        MappingKind::Texture => wrap(format!("(({co} - {loc}) / {scale})")),
        MappingKind::Vector => wrap(format!("({co} * {scale})")),
    })
}

/// Inputs: 0 Strength, 1 Color. Perturbs `n` in place from a tangent-space
/// normal texture; with no exported tangents the frame is derived from
/// screen-space derivatives.
pub(crate) fn normal_map<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<String, GraphError> {
    if ctx.config.basecol_only || graph.input_link(&node.name, 1).is_none() {
        return Ok("n".to_string());
    }
    let strength = parse_value_input(ctx, graph, node, 0)?;
    let c = parse_vector_input(ctx, graph, node, 1)?;
    let name = ctx.node_name(&node.name);
    ctx.cur()
        .write(format!("vec3 {name}_texn = {c} * 2.0 - 1.0;"));
    ctx.cur().write(format!("{name}_texn.y = -{name}_texn.y;"));
    if strength != "1.0" {
        ctx.cur().write(format!("{name}_texn.xy *= {strength};"));
    }
    if ctx.config.export_tangents {
        ctx.vert.add_elem(VertexElement::Tangent);
        ctx.cur().write(format!("n = normalize(TBN * {name}_texn);"));
    } else {
        ctx.add_include("std/normals.glsl");
        ctx.vert.add_elem(VertexElement::Uv0);
        ctx.cur().write(format!(
            "mat3 {name}_tbn = cotangent_frame(n, -vVec, texCoord);"
        ));
        ctx.cur()
            .write(format!("n = normalize({name}_tbn * {name}_texn);"));
    }
    Ok("n".to_string())
}

/// Inputs: 0 Strength, 2 Height, 3 Normal; socket 1 (Distance) plays no part
/// in the finite-difference reconstruction. The Height subtree is evaluated
/// with the bump side-channel armed; the sampling leaf leaves four offset
/// samples behind which are differentiated here.
pub(crate) fn bump<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<String, GraphError> {
    if ctx.config.basecol_only {
        return Ok("n".to_string());
    }
    let strength = parse_value_input(ctx, graph, node, 0)?;
    ctx.sample_bump = true;
    let _ = parse_value_input(ctx, graph, node, 2)?;
    ctx.sample_bump = false;
    if ctx.sample_bump_res.is_empty() {
        // height did not come from a samplable leaf
        return Ok("n".to_string());
    }
    let b = ctx.sample_bump_res.clone();
    let ext = if node.params.invert {
        ["1", "2", "3", "4"]
    } else {
        ["2", "1", "4", "3"]
    };
    let name = ctx.node_name(&node.name);
    ctx.cur().write(format!(
        "float {name}_dx = ({b}_{} - {b}_{}) * {strength};",
        ext[0], ext[1]
    ));
    ctx.cur().write(format!(
        "float {name}_dy = ({b}_{} - {b}_{}) * {strength};",
        ext[2], ext[3]
    ));
    ctx.cur()
        .write(format!("n = normalize(vec3(n.x + {name}_dx, n.y + {name}_dy, n.z));"));
    ctx.sample_bump_res.clear();
    Ok("n".to_string())
}

/// Output 0: the node's fixed direction.
pub(crate) fn normal_out(node: &Node) -> Result<String, GraphError> {
    let dir = node
        .outputs
        .first()
        .map(|s| s.default_value.as_vector())
        .unwrap_or([0.0, 0.0, 1.0]);
    Ok(to_vec3(dir))
}

/// Output 1: dot of the input normal against the fixed direction.
pub(crate) fn normal_dot<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<String, GraphError> {
    let v = parse_vector_input(ctx, graph, node, 0)?;
    let dir = normal_out(node)?;
    Ok(format!("dot({v}, {dir})"))
}

/// Inputs: 0 Fac, 1 Vector. Per-axis curves come from the node params.
pub(crate) fn curve_vec<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<String, GraphError> {
    let fac = parse_value_input(ctx, graph, node, 0)?;
    let v = parse_vector_input(ctx, graph, node, 1)?;
    let Some(curves) = node.params.curves.as_ref() else {
        return Ok(v);
    };
    let name = ctx.node_name(&node.name);
    ctx.cur().write(format!("vec3 {name}_in = {v};"));
    let empty: Vec<CurvePoint> = Vec::new();
    let chans = ["x", "y", "z"];
    let mut parts = Vec::with_capacity(3);
    for (i, chan) in chans.iter().enumerate() {
        let points = curves.get(i).unwrap_or(&empty);
        let x = format!("{name}_in.{chan}");
        parts.push(curve_channel_expr(&x, points));
    }
    Ok(format!(
        "mix({name}_in, vec3({}, {}, {}), {fac})",
        parts[0], parts[1], parts[2]
    ))
}
