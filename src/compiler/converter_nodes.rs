//! Scalar and conversion nodes.

use crate::dsl::{MathOp, Node, NodeGraph, VectorMathOp};

use super::context::{CompileContext, DiagnosticKind};
use super::error::GraphError;
use super::stage::{fmt_f32, to_vec3};
use super::{parse_value_input, parse_vector_input, rgb_to_bw};

/// Constant value, optionally exposed as a runtime-linked uniform.
pub(crate) fn value(ctx: &mut CompileContext, node: &Node) -> Result<String, GraphError> {
    if node.params.material_param {
        let name = ctx.node_name(&node.name);
        ctx.cur().add_uniform("float", &name, Some(&node.name));
        Ok(name)
    } else {
        let v = node
            .outputs
            .first()
            .map(|s| s.default_value.as_value())
            .unwrap_or(0.0);
        Ok(fmt_f32(v))
    }
}

/// Inputs: 0 Value, 1 Value.
pub(crate) fn math<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<String, GraphError> {
    let a = parse_value_input(ctx, graph, node, 0)?;
    let b = parse_value_input(ctx, graph, node, 1)?;
    let op = node.params.operation.unwrap_or(MathOp::Add);
    let out = match op {
        MathOp::Add => format!("({a} + {b})"),
        MathOp::Subtract => format!("({a} - {b})"),
        MathOp::Multiply => format!("({a} * {b})"),
        MathOp::Divide => format!("({a} / {b})"),
        MathOp::Power => format!("pow({a}, {b})"),
        MathOp::Logarithm => format!("(log({a}) / log({b}))"),
        MathOp::Sqrt => format!("sqrt({a})"),
        MathOp::Absolute => format!("abs({a})"),
        MathOp::Minimum => format!("min({a}, {b})"),
        MathOp::Maximum => format!("max({a}, {b})"),
        MathOp::LessThan => format!("float({a} < {b})"),
        MathOp::GreaterThan => format!("float({a} > {b})"),
        MathOp::Round => format!("floor({a} + 0.5)"),
        MathOp::Floor => format!("floor({a})"),
        MathOp::Ceil => format!("ceil({a})"),
        MathOp::Fract => format!("fract({a})"),
        MathOp::Modulo => format!("mod({a}, {b})"),
        MathOp::Sine => format!("sin({a})"),
        MathOp::Cosine => format!("cos({a})"),
        MathOp::Tangent => format!("tan({a})"),
        MathOp::Arcsine => format!("asin({a})"),
        MathOp::Arccosine => format!("acos({a})"),
        MathOp::Arctangent => format!("atan({a})"),
        MathOp::Arctan2 => format!("atan({a}, {b})"),
    };
    Ok(if node.params.use_clamp {
        format!("clamp({out}, 0.0, 1.0)")
    } else {
        out
    })
}

/// Inputs: 0 Vector, 1 Vector, 2 Scale. Vector output; scalar-producing
/// operations splat.
pub(crate) fn vector_math<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<String, GraphError> {
    let op = node.params.vector_operation.unwrap_or(VectorMathOp::Add);
    if matches!(
        op,
        VectorMathOp::DotProduct | VectorMathOp::Distance | VectorMathOp::Length
    ) {
        let v = vector_math_value(ctx, graph, node)?;
        return Ok(format!("vec3({v})"));
    }
    let a = parse_vector_input(ctx, graph, node, 0)?;
    let b = parse_vector_input(ctx, graph, node, 1)?;
    Ok(match op {
        VectorMathOp::Add => format!("({a} + {b})"),
        VectorMathOp::Subtract => format!("({a} - {b})"),
        VectorMathOp::Multiply => format!("({a} * {b})"),
        VectorMathOp::Divide => format!("({a} / {b})"),
        VectorMathOp::Normalize => format!("normalize({a})"),
        VectorMathOp::Scale => {
            let s = parse_value_input(ctx, graph, node, 2)?;
            format!("({a} * {s})")
        }
        VectorMathOp::Reflect => format!("reflect({a}, normalize({b}))"),
        VectorMathOp::Project => format!("(dot({a}, {b}) / dot({b}, {b}) * {b})"),
        VectorMathOp::CrossProduct => format!("cross({a}, {b})"),
        VectorMathOp::Sine => format!("sin({a})"),
        VectorMathOp::Cosine => format!("cos({a})"),
        VectorMathOp::Tangent => format!("tan({a})"),
        // wrap lacks a min bound in this socket layout, mod is the closest fit
        VectorMathOp::Modulo | VectorMathOp::Wrap => format!("mod({a}, {b})"),
        VectorMathOp::Fraction => format!("fract({a})"),
        VectorMathOp::Snap => format!("(floor({a} / {b}) * {b})"),
        VectorMathOp::Ceil => format!("ceil({a})"),
        VectorMathOp::Floor => format!("floor({a})"),
        VectorMathOp::Maximum => format!("max({a}, {b})"),
        VectorMathOp::Minimum => format!("min({a}, {b})"),
        VectorMathOp::Absolute => format!("abs({a})"),
        VectorMathOp::DotProduct | VectorMathOp::Distance | VectorMathOp::Length => {
            unreachable!("handled above")
        }
    })
}

/// Value output of the vector math node.
pub(crate) fn vector_math_value<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<String, GraphError> {
    let op = node.params.vector_operation.unwrap_or(VectorMathOp::Add);
    match op {
        VectorMathOp::DotProduct => {
            let a = parse_vector_input(ctx, graph, node, 0)?;
            let b = parse_vector_input(ctx, graph, node, 1)?;
            Ok(format!("dot({a}, {b})"))
        }
        VectorMathOp::Distance => {
            let a = parse_vector_input(ctx, graph, node, 0)?;
            let b = parse_vector_input(ctx, graph, node, 1)?;
            Ok(format!("distance({a}, {b})"))
        }
        VectorMathOp::Length => {
            let a = parse_vector_input(ctx, graph, node, 0)?;
            Ok(format!("length({a})"))
        }
        _ => {
            let v = vector_math(ctx, graph, node)?;
            Ok(rgb_to_bw(&v))
        }
    }
}

/// Inputs: 0 Fac. Outputs: 0 Color, 1 Alpha. Stops are hoisted into const
/// arrays and selected with an unrolled comparison chain.
pub(crate) fn color_ramp<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
    socket: usize,
) -> Result<String, GraphError> {
    if socket == 1 {
        return Ok("1.0".to_string());
    }
    let Some(ramp) = node.params.ramp.clone() else {
        ctx.warn(
            DiagnosticKind::UnsupportedNode,
            &node.name,
            "color ramp node carries no stops",
        );
        return Ok("vec3(0.0, 0.0, 0.0)".to_string());
    };
    if ramp.stops.is_empty() {
        return Ok("vec3(0.0, 0.0, 0.0)".to_string());
    }
    if ramp.stops.len() == 1 {
        return Ok(to_vec3(ramp.stops[0].color));
    }

    let fac = parse_value_input(ctx, graph, node, 0)?;
    let name = ctx.node_name(&node.name);
    let len = ramp.stops.len();
    let cols = ramp
        .stops
        .iter()
        .map(|s| to_vec3(s.color))
        .collect::<Vec<_>>()
        .join(", ");
    let facs = ramp
        .stops
        .iter()
        .map(|s| fmt_f32(s.position))
        .collect::<Vec<_>>()
        .join(", ");
    ctx.cur()
        .add_const("vec3", &format!("{name}_cols"), &cols, Some(len));
    ctx.cur()
        .add_const("float", &format!("{name}_facs"), &facs, Some(len));
    ctx.cur().write(format!("float {name}_fac = {fac};"));

    let mut index = String::from("0");
    for i in 1..len {
        index = format!("(({name}_fac > {name}_facs[{i}]) ? {i} : {index})");
    }
    match ramp.interpolation {
        crate::dsl::RampInterpolation::Constant => Ok(format!("{name}_cols[{index}]")),
        crate::dsl::RampInterpolation::Linear => {
            ctx.cur().write(format!("int {name}_i = {index};"));
            let last = len - 1;
            Ok(format!(
                "mix({name}_cols[{name}_i], {name}_cols[min({name}_i + 1, {last})], clamp(({name}_fac - {name}_facs[{name}_i]) / ({name}_facs[min({name}_i + 1, {last})] - {name}_facs[{name}_i]), 0.0, 1.0))"
            ))
        }
    }
}

/// Inputs: 0 Vector. Outputs: 0 X, 1 Y, 2 Z.
pub(crate) fn separate_xyz<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
    socket: usize,
) -> Result<String, GraphError> {
    let v = parse_vector_input(ctx, graph, node, 0)?;
    let chan = ["x", "y", "z"][socket.min(2)];
    Ok(format!("{v}.{chan}"))
}

/// Inputs: 0 Color. Outputs: 0 R, 1 G, 2 B.
pub(crate) fn separate_rgb<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
    socket: usize,
) -> Result<String, GraphError> {
    let v = parse_vector_input(ctx, graph, node, 0)?;
    let chan = ["r", "g", "b"][socket.min(2)];
    Ok(format!("{v}.{chan}"))
}

/// Inputs: 0 X, 1 Y, 2 Z.
pub(crate) fn combine_xyz<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<String, GraphError> {
    let x = parse_value_input(ctx, graph, node, 0)?;
    let y = parse_value_input(ctx, graph, node, 1)?;
    let z = parse_value_input(ctx, graph, node, 2)?;
    Ok(format!("vec3({x}, {y}, {z})"))
}

/// Inputs: 0 R, 1 G, 2 B.
pub(crate) fn combine_rgb<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<String, GraphError> {
    let r = parse_value_input(ctx, graph, node, 0)?;
    let g = parse_value_input(ctx, graph, node, 1)?;
    let b = parse_value_input(ctx, graph, node, 2)?;
    Ok(format!("vec3({r}, {g}, {b})"))
}

/// Inputs: 0 Color.
pub(crate) fn rgb_to_bw_node<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<String, GraphError> {
    let col = parse_vector_input(ctx, graph, node, 0)?;
    Ok(rgb_to_bw(&col))
}

/// Inputs: 0 Value, 1 Min, 2 Max.
pub(crate) fn clamp<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<String, GraphError> {
    let v = parse_value_input(ctx, graph, node, 0)?;
    let lo = parse_value_input(ctx, graph, node, 1)?;
    let hi = parse_value_input(ctx, graph, node, 2)?;
    Ok(format!("clamp({v}, {lo}, {hi})"))
}

/// Inputs: 0 Value. Range bounds come from the node params.
pub(crate) fn map_range<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<String, GraphError> {
    let v = parse_value_input(ctx, graph, node, 0)?;
    let fmin = fmt_f32(node.params.from_min);
    let fmax = fmt_f32(node.params.from_max);
    let tmin = fmt_f32(node.params.to_min);
    let tmax = fmt_f32(node.params.to_max);
    let out =
        format!("(({v} - {fmin}) / ({fmax} - {fmin}) * ({tmax} - {tmin}) + {tmin})");
    Ok(if node.params.use_clamp {
        format!("clamp({out}, {tmin}, {tmax})")
    } else {
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetRegistry, MemoryImageResolver};
    use crate::dsl::{ColorRampParams, NodeKind, NodeParams, RampInterpolation, RampStop, Socket};

    fn ctx_fixture<'g>(
        resolver: &'g MemoryImageResolver,
        registry: &'g AssetRegistry,
    ) -> CompileContext<'g> {
        CompileContext::new(Default::default(), resolver, registry)
    }

    #[test]
    fn math_power_with_clamp() {
        let resolver = MemoryImageResolver::default();
        let registry = AssetRegistry::new();
        let mut ctx = ctx_fixture(&resolver, &registry);
        let mut g = NodeGraph::new("mat");
        g.nodes.push(
            Node::new("m", NodeKind::Math)
                .with_inputs(vec![Socket::value("A", 2.0), Socket::value("B", 3.0)])
                .with_outputs(vec![Socket::value("Value", 0.0)])
                .with_params(NodeParams {
                    operation: Some(MathOp::Power),
                    use_clamp: true,
                    ..Default::default()
                }),
        );
        let node = g.node("m").unwrap();
        assert_eq!(
            math(&mut ctx, &g, node).unwrap(),
            "clamp(pow(2.0, 3.0), 0.0, 1.0)"
        );
    }

    #[test]
    fn dot_product_requested_as_vector_splats() {
        let resolver = MemoryImageResolver::default();
        let registry = AssetRegistry::new();
        let mut ctx = ctx_fixture(&resolver, &registry);
        let mut g = NodeGraph::new("mat");
        g.nodes.push(
            Node::new("vm", NodeKind::VectorMath)
                .with_inputs(vec![
                    Socket::vector("A", [1.0, 0.0, 0.0]),
                    Socket::vector("B", [0.0, 1.0, 0.0]),
                    Socket::value("Scale", 1.0),
                ])
                .with_outputs(vec![
                    Socket::vector("Vector", [0.0, 0.0, 0.0]),
                    Socket::value("Value", 0.0),
                ])
                .with_params(NodeParams {
                    vector_operation: Some(VectorMathOp::DotProduct),
                    ..Default::default()
                }),
        );
        let node = g.node("vm").unwrap();
        assert_eq!(
            vector_math(&mut ctx, &g, node).unwrap(),
            "vec3(dot(vec3(1.0, 0.0, 0.0), vec3(0.0, 1.0, 0.0)))"
        );
    }

    #[test]
    fn constant_ramp_hoists_stop_arrays() {
        let resolver = MemoryImageResolver::default();
        let registry = AssetRegistry::new();
        let mut ctx = ctx_fixture(&resolver, &registry);
        let mut g = NodeGraph::new("mat");
        g.nodes.push(
            Node::new("ramp", NodeKind::ColorRamp)
                .with_inputs(vec![Socket::value("Fac", 0.5)])
                .with_outputs(vec![
                    Socket::color("Color", [0.0, 0.0, 0.0]),
                    Socket::value("Alpha", 1.0),
                ])
                .with_params(NodeParams {
                    ramp: Some(ColorRampParams {
                        interpolation: RampInterpolation::Constant,
                        stops: vec![
                            RampStop { position: 0.0, color: [0.0, 0.0, 0.0] },
                            RampStop { position: 0.5, color: [1.0, 1.0, 1.0] },
                        ],
                    }),
                    ..Default::default()
                }),
        );
        let node = g.node("ramp").unwrap();
        let res = color_ramp(&mut ctx, &g, node, 0).unwrap();
        assert_eq!(res, "ramp_cols[((ramp_fac > ramp_facs[1]) ? 1 : 0)]");
        let src = ctx.frag.source();
        assert!(src.contains(
            "const vec3 ramp_cols[2] = vec3[](vec3(0.0, 0.0, 0.0), vec3(1.0, 1.0, 1.0));"
        ));
        assert!(src.contains("const float ramp_facs[2] = float[](0.0, 0.5);"));
    }

    #[test]
    fn map_range_uses_param_bounds() {
        let resolver = MemoryImageResolver::default();
        let registry = AssetRegistry::new();
        let mut ctx = ctx_fixture(&resolver, &registry);
        let mut g = NodeGraph::new("mat");
        g.nodes.push(
            Node::new("mr", NodeKind::MapRange)
                .with_inputs(vec![Socket::value("Value", 0.5)])
                .with_outputs(vec![Socket::value("Result", 0.0)])
                .with_params(NodeParams {
                    from_max: 2.0,
                    to_max: 10.0,
                    ..Default::default()
                }),
        );
        let node = g.node("mr").unwrap();
        assert_eq!(
            map_range(&mut ctx, &g, node).unwrap(),
            "((0.5 - 0.0) / (2.0 - 0.0) * (10.0 - 0.0) + 0.0)"
        );
    }
}
