//! Color manipulation nodes.

use crate::dsl::{BlendMode, CurvePoint, Node, NodeGraph};

use super::context::CompileContext;
use super::error::GraphError;
use super::stage::fmt_f32;
use super::{parse_value_input, parse_vector_input};

/// Inputs: 0 Fac, 1 Color1, 2 Color2. Modes without a faithful per-channel
/// formula degrade to a plain linear mix.
pub(crate) fn mix_rgb<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<String, GraphError> {
    let fac = parse_value_input(ctx, graph, node, 0)?;
    let c1 = parse_vector_input(ctx, graph, node, 1)?;
    let c2 = parse_vector_input(ctx, graph, node, 2)?;
    let mode = node.params.blend_mode.unwrap_or(BlendMode::Mix);
    let out = match mode {
        BlendMode::Mix
        | BlendMode::Hue
        | BlendMode::Saturation
        | BlendMode::Value
        | BlendMode::Color
        | BlendMode::Overlay
        | BlendMode::Dodge
        | BlendMode::Burn
        | BlendMode::LinearLight => format!("mix({c1}, {c2}, {fac})"),
        BlendMode::Add => format!("mix({c1}, {c1} + {c2}, {fac})"),
        BlendMode::Multiply => format!("mix({c1}, {c1} * {c2}, {fac})"),
        BlendMode::Subtract => format!("mix({c1}, {c1} - {c2}, {fac})"),
        BlendMode::Screen => format!(
            "(vec3(1.0) - (vec3(1.0 - {fac}) + {fac} * (vec3(1.0) - {c2})) * (vec3(1.0) - {c1}))"
        ),
        BlendMode::Divide => format!("(vec3((1.0 - {fac}) * {c1} + {fac} * {c1} / {c2}))"),
        BlendMode::Difference => format!("mix({c1}, abs({c1} - {c2}), {fac})"),
        BlendMode::Darken => format!("min({c1}, {c2} * {fac})"),
        BlendMode::Lighten => format!("max({c1}, {c2} * {fac})"),
        BlendMode::SoftLight => format!(
            "mix({c1}, (vec3(1.0) - {c1}) * {c1} * {c2} + {c1} * (vec3(1.0) - (vec3(1.0) - {c1}) * (vec3(1.0) - {c2})), {fac})"
        ),
    };
    Ok(if node.params.use_clamp {
        format!("clamp({out}, vec3(0.0), vec3(1.0))")
    } else {
        out
    })
}

/// Inputs: 0 Fac, 1 Color.
pub(crate) fn invert<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<String, GraphError> {
    let fac = parse_value_input(ctx, graph, node, 0)?;
    let col = parse_vector_input(ctx, graph, node, 1)?;
    Ok(format!("mix({col}, vec3(1.0) - {col}, {fac})"))
}

/// Inputs: 0 Color, 1 Gamma.
pub(crate) fn gamma<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<String, GraphError> {
    let col = parse_vector_input(ctx, graph, node, 0)?;
    let g = parse_value_input(ctx, graph, node, 1)?;
    Ok(format!("pow({col}, vec3({g}))"))
}

/// Inputs: 0 Color, 1 Bright, 2 Contrast.
pub(crate) fn bright_contrast<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<String, GraphError> {
    let col = parse_vector_input(ctx, graph, node, 0)?;
    let bright = parse_value_input(ctx, graph, node, 1)?;
    let contrast = parse_value_input(ctx, graph, node, 2)?;
    ctx.add_include("std/color.glsl");
    Ok(format!("brightcontrast({col}, {bright}, {contrast})"))
}

/// Inputs: 0 Hue, 1 Saturation, 2 Value, 3 Fac, 4 Color.
pub(crate) fn hue_sat<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<String, GraphError> {
    let hue = parse_value_input(ctx, graph, node, 0)?;
    let sat = parse_value_input(ctx, graph, node, 1)?;
    let val = parse_value_input(ctx, graph, node, 2)?;
    let fac = parse_value_input(ctx, graph, node, 3)?;
    let col = parse_vector_input(ctx, graph, node, 4)?;
    ctx.add_include("std/color.glsl");
    Ok(format!(
        "hue_sat({col}, vec4({hue} - 0.5, {sat}, {val}, 1.0 - {fac}))"
    ))
}

/// Piecewise-linear curve over one channel, unrolled into nested selects.
/// Curve points are sorted by position at authoring time.
pub(crate) fn curve_channel_expr(x: &str, points: &[CurvePoint]) -> String {
    match points {
        [] => x.to_string(),
        [p] => fmt_f32(p.value),
        _ => {
            let last = points.len() - 1;
            let mut expr = fmt_f32(points[last].value);
            for i in (0..last).rev() {
                let p0 = fmt_f32(points[i].position);
                let p1 = fmt_f32(points[i + 1].position);
                let v0 = fmt_f32(points[i].value);
                let v1 = fmt_f32(points[i + 1].value);
                expr = format!(
                    "({x} < {p1} ? mix({v0}, {v1}, ({x} - {p0}) / ({p1} - {p0})) : {expr})"
                );
            }
            format!("({x} < {p0} ? {v0} : {expr})",
                p0 = fmt_f32(points[0].position),
                v0 = fmt_f32(points[0].value))
        }
    }
}

/// Inputs: 0 Fac, 1 Color. Per-channel curves come from the node params.
pub(crate) fn curve_rgb<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<String, GraphError> {
    let fac = parse_value_input(ctx, graph, node, 0)?;
    let col = parse_vector_input(ctx, graph, node, 1)?;
    let Some(curves) = node.params.curves.as_ref() else {
        return Ok(col);
    };
    let name = ctx.node_name(&node.name);
    ctx.cur().write(format!("vec3 {name}_in = {col};"));
    let empty: Vec<CurvePoint> = Vec::new();
    let chans = ["r", "g", "b"];
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetRegistry, MemoryImageResolver};
    use crate::dsl::{NodeKind, NodeParams, Socket};

    fn mix_node(mode: BlendMode, clamp: bool) -> Node {
        Node::new("mix", NodeKind::MixRgb)
            .with_inputs(vec![
                Socket::value("Fac", 0.5),
                Socket::color("Color1", [1.0, 0.0, 0.0]),
                Socket::color("Color2", [0.0, 1.0, 0.0]),
            ])
            .with_outputs(vec![Socket::color("Color", [0.0, 0.0, 0.0])])
            .with_params(NodeParams {
                blend_mode: Some(mode),
                use_clamp: clamp,
                ..Default::default()
            })
    }

    #[test]
    fn multiply_blend_mixes_toward_the_product() {
        let resolver = MemoryImageResolver::default();
        let registry = AssetRegistry::new();
        let mut ctx = CompileContext::new(Default::default(), &resolver, &registry);
        let g = {
            let mut g = NodeGraph::new("mat");
            g.nodes.push(mix_node(BlendMode::Multiply, false));
            g
        };
        let node = g.node("mix").unwrap();
        let res = mix_rgb(&mut ctx, &g, node).unwrap();
        assert_eq!(
            res,
            "mix(vec3(1.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0) * vec3(0.0, 1.0, 0.0), 0.5)"
        );
    }

    #[test]
    fn hue_blend_degrades_to_plain_mix_and_clamps() {
        let resolver = MemoryImageResolver::default();
        let registry = AssetRegistry::new();
        let mut ctx = CompileContext::new(Default::default(), &resolver, &registry);
        let g = {
            let mut g = NodeGraph::new("mat");
            g.nodes.push(mix_node(BlendMode::Hue, true));
            g
        };
        let node = g.node("mix").unwrap();
        let res = mix_rgb(&mut ctx, &g, node).unwrap();
        assert!(res.starts_with("clamp(mix("));
        assert!(res.ends_with(", vec3(0.0), vec3(1.0))"));
    }

    #[test]
    fn curve_expr_interpolates_between_stops() {
        let points = vec![
            CurvePoint { position: 0.0, value: 0.0 },
            CurvePoint { position: 1.0, value: 1.0 },
        ];
        let expr = curve_channel_expr("x", &points);
        assert_eq!(
            expr,
            "(x < 0.0 ? 0.0 : (x < 1.0 ? mix(0.0, 1.0, (x - 0.0) / (1.0 - 0.0)) : 1.0))"
        );
    }
}
