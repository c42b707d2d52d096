//! Geometry, coordinate and scene-data nodes.
//!
//! Most of these read varyings the mesh pipeline always provides
//! (`wposition`, `n`, `vVec`) or uniforms linked by name at bind time.
//! UV sets, vertex colors and tangents additionally request the matching
//! vertex buffer element.

use crate::dsl::{Node, NodeGraph};

use super::context::{CompileContext, DiagnosticKind, ParticleChannel};
use super::error::GraphError;
use super::parse_value_input;
use super::stage::{to_vec3, VertexElement};

fn uv_expr(index: u32) -> &'static str {
    if index == 1 {
        "vec3(texCoord1.x, 1.0 - texCoord1.y, 0.0)"
    } else {
        "vec3(texCoord.x, 1.0 - texCoord.y, 0.0)"
    }
}

fn uv_elem(index: u32) -> VertexElement {
    if index == 1 {
        VertexElement::Uv1
    } else {
        VertexElement::Uv0
    }
}

/// Named attribute lookup. UV maps and vertex colors resolve to their
/// dedicated channels, anything else is unknown to the mesh format.
pub(crate) fn attribute(ctx: &mut CompileContext, node: &Node) -> Result<String, GraphError> {
    let name = node.params.attribute_name.as_deref().unwrap_or("");
    match name {
        "UVMap" => {
            let index = node.params.uv_index.unwrap_or(0);
            ctx.vert.add_elem(uv_elem(index));
            Ok(uv_expr(index).to_string())
        }
        "Col" | "Color" => Ok(vertex_color(ctx)?),
        _ => {
            ctx.warn(
                DiagnosticKind::UnsupportedNode,
                &node.name,
                format!("unknown attribute `{name}`"),
            );
            Ok("vec3(0.0, 0.0, 0.0)".to_string())
        }
    }
}

/// Outputs: 0 Generated, 1 Normal, 2 UV, 3 Object, 4 Camera, 5 Window,
/// 6 Reflection.
pub(crate) fn tex_coord(ctx: &mut CompileContext, socket: usize) -> Result<String, GraphError> {
    Ok(match socket {
        0 => "bposition".to_string(),
        1 | 3 => {
            if socket == 1 {
                "n".to_string()
            } else {
                "mposition".to_string()
            }
        }
        2 => {
            ctx.vert.add_elem(VertexElement::Uv0);
            uv_expr(0).to_string()
        }
        4 => "vposition".to_string(),
        5 => "wvpposition.xyz".to_string(),
        _ => "reflect(-vVec, n)".to_string(),
    })
}

pub(crate) fn uv_map(ctx: &mut CompileContext, node: &Node) -> Result<String, GraphError> {
    let index = node.params.uv_index.unwrap_or(0);
    ctx.vert.add_elem(uv_elem(index));
    Ok(uv_expr(index).to_string())
}

/// Constant color, optionally exposed as a runtime-linked uniform.
pub(crate) fn rgb(ctx: &mut CompileContext, node: &Node) -> Result<String, GraphError> {
    if node.params.material_param {
        let name = ctx.node_name(&node.name);
        ctx.cur().add_uniform("vec3", &name, Some(&node.name));
        Ok(name)
    } else {
        let def = node
            .outputs
            .first()
            .map(|s| s.default_value.as_vector())
            .unwrap_or([0.0; 3]);
        Ok(to_vec3(def))
    }
}

pub(crate) fn vertex_color(ctx: &mut CompileContext) -> Result<String, GraphError> {
    ctx.vert.add_elem(VertexElement::Color);
    Ok("vcolor".to_string())
}

/// Outputs: 0 Position, 1 Normal, 2 Tangent, 3 True Normal, 4 Incoming,
/// 5 Parametric. Backfacing and Pointiness are value sockets, see
/// [`geometry_value`].
pub(crate) fn geometry(ctx: &mut CompileContext, socket: usize) -> Result<String, GraphError> {
    Ok(match socket {
        0 => "wposition".to_string(),
        1 | 3 => "n".to_string(),
        2 => return tangent(ctx),
        4 => "vVec".to_string(),
        _ => "mposition".to_string(),
    })
}

/// Outputs: 6 Backfacing, 7 Pointiness.
pub(crate) fn geometry_value(socket: usize) -> Result<String, GraphError> {
    Ok(match socket {
        6 => "(1.0 - float(gl_FrontFacing))".to_string(),
        // pointiness needs curvature data the mesh format does not carry
        _ => "0.0".to_string(),
    })
}

pub(crate) fn tangent(ctx: &mut CompileContext) -> Result<String, GraphError> {
    ctx.vert.add_elem(VertexElement::Tangent);
    Ok("wtangent".to_string())
}

/// Outputs: 0 Location, 1 Color.
pub(crate) fn object_info_vector(
    ctx: &mut CompileContext,
    socket: usize,
) -> Result<String, GraphError> {
    let (name, link) = if socket == 1 {
        ("objectColor", "_objectColor")
    } else {
        ("objectLocation", "_objectLocation")
    };
    ctx.cur().add_uniform("vec3", name, Some(link));
    Ok(name.to_string())
}

/// Outputs: 2 Object Index, 3 Material Index, 4 Random.
pub(crate) fn object_info_value(
    ctx: &mut CompileContext,
    socket: usize,
) -> Result<String, GraphError> {
    let (name, link) = match socket {
        3 => ("materialIndex", "_materialIndex"),
        4 => ("objectRandom", "_objectRandom"),
        _ => ("objectIndex", "_objectIndex"),
    };
    ctx.cur().add_uniform("float", name, Some(link));
    Ok(name.to_string())
}

/// Outputs: 3 Location, 5 Velocity, 6 Angular Velocity.
pub(crate) fn particle_info_vector(
    ctx: &mut CompileContext,
    socket: usize,
) -> Result<String, GraphError> {
    let (channel, var) = match socket {
        5 => (ParticleChannel::Velocity, "p_velocity"),
        6 => (ParticleChannel::AngularVelocity, "p_angvelocity"),
        _ => (ParticleChannel::Location, "p_location"),
    };
    ctx.particle_channels.insert(channel);
    Ok(var.to_string())
}

/// Outputs: 0 Index, 1 Age, 2 Lifetime, 4 Size.
pub(crate) fn particle_info_value(
    ctx: &mut CompileContext,
    socket: usize,
) -> Result<String, GraphError> {
    let (channel, var) = match socket {
        1 => (ParticleChannel::Age, "p_age"),
        2 => (ParticleChannel::Lifetime, "p_lifetime"),
        4 => (ParticleChannel::Size, "p_size"),
        _ => (ParticleChannel::Index, "p_index"),
    };
    ctx.particle_channels.insert(channel);
    Ok(var.to_string())
}

/// Output 0: View Vector.
pub(crate) fn camera_data_vector() -> Result<String, GraphError> {
    Ok("vVec".to_string())
}

/// Outputs: 1 View Z Depth, 2 View Distance.
pub(crate) fn camera_data_value(
    ctx: &mut CompileContext,
    socket: usize,
) -> Result<String, GraphError> {
    if socket == 2 {
        ctx.cur().add_uniform("vec3", "eye", Some("_cameraPosition"));
        Ok("distance(eye, wposition)".to_string())
    } else {
        Ok("gl_FragCoord.z".to_string())
    }
}

/// Inputs: 0 Blend. Outputs: 0 Fresnel, 1 Facing.
pub(crate) fn layer_weight<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
    socket: usize,
) -> Result<String, GraphError> {
    let blend = parse_value_input(ctx, graph, node, 0)?;
    if socket == 1 {
        Ok(format!(
            "pow(1.0 - abs(dot(n, vVec)), 1.0 / max({blend}, 0.0001))"
        ))
    } else {
        Ok(format!(
            "clamp(pow(1.0 - dot(n, vVec), (1.0 - {blend}) * 5.0), 0.0, 1.0)"
        ))
    }
}

/// Inputs: 0 IOR.
pub(crate) fn fresnel<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<String, GraphError> {
    let ior = parse_value_input(ctx, graph, node, 0)?;
    ctx.add_include("std/brdf.glsl");
    Ok(format!("fresnel_dielectric({ior}, dot(n, vVec))"))
}

/// Rasterized shading only ever sees camera rays.
pub(crate) fn light_path(socket: usize) -> Result<String, GraphError> {
    Ok(match socket {
        0 => "1.0".to_string(),
        _ => "0.0".to_string(),
    })
}

pub(crate) fn wireframe(ctx: &mut CompileContext, node: &Node) -> Result<String, GraphError> {
    ctx.warn(
        DiagnosticKind::UnsupportedNode,
        &node.name,
        "wireframe shading is not supported",
    );
    Ok("0.0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetRegistry, MemoryImageResolver};
    use crate::dsl::{NodeKind, NodeParams, Socket};

    #[test]
    fn uv_map_requests_the_matching_vertex_element() {
        let resolver = MemoryImageResolver::default();
        let registry = AssetRegistry::new();
        let mut ctx = CompileContext::new(Default::default(), &resolver, &registry);
        let node = Node::new("uv", NodeKind::UvMap).with_params(NodeParams {
            uv_index: Some(1),
            ..Default::default()
        });
        let res = uv_map(&mut ctx, &node).unwrap();
        assert_eq!(res, "vec3(texCoord1.x, 1.0 - texCoord1.y, 0.0)");
        assert!(ctx.vert.vertex_elements().any(|e| e == VertexElement::Uv1));
    }

    #[test]
    fn rgb_as_material_param_becomes_a_linked_uniform() {
        let resolver = MemoryImageResolver::default();
        let registry = AssetRegistry::new();
        let mut ctx = CompileContext::new(Default::default(), &resolver, &registry);
        let node = Node::new("Tint", NodeKind::Rgb)
            .with_outputs(vec![Socket::color("Color", [0.5, 0.5, 0.5])])
            .with_params(NodeParams {
                material_param: true,
                ..Default::default()
            });
        let res = rgb(&mut ctx, &node).unwrap();
        assert_eq!(res, "Tint");
        assert_eq!(ctx.frag.uniforms()[0].link.as_deref(), Some("Tint"));
    }

    #[test]
    fn particle_reads_register_their_channels() {
        let resolver = MemoryImageResolver::default();
        let registry = AssetRegistry::new();
        let mut ctx = CompileContext::new(Default::default(), &resolver, &registry);
        particle_info_vector(&mut ctx, 5).unwrap();
        particle_info_value(&mut ctx, 2).unwrap();
        assert!(ctx.particle_channels.contains(&ParticleChannel::Velocity));
        assert!(ctx.particle_channels.contains(&ParticleChannel::Lifetime));
        assert!(!ctx.particle_channels.contains(&ParticleChannel::Age));
    }
}
