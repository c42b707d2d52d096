//! Image and procedural texture nodes.
//!
//! Image fetches go through a per-node store variable so the Color and Alpha
//! sockets of one image node share a single `texture()` call. Procedurals
//! call into the `std/procedurals.glsl` include library; an unlinked Vector
//! input samples in object space (`bposition`).

use crate::assets::{ColorSpace, TexProjection};
use crate::dsl::{GradientKind, Node, NodeGraph};

use super::context::{CompileContext, DiagnosticKind};
use super::error::GraphError;
use super::stage::VertexElement;
use super::{parse_value_input, parse_vector_input, store_var_name, write_bump};

const MAGENTA: &str = "vec4(1.0, 0.0, 1.0, 1.0)";

fn proc_coord<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<String, GraphError> {
    if graph.input_link(&node.name, 0).is_some() {
        parse_vector_input(ctx, graph, node, 0)
    } else {
        Ok("bposition".to_string())
    }
}

/// Inputs: 0 Vector. Outputs: 0 Color, 1 Alpha.
pub(crate) fn tex_image<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
    socket: usize,
) -> Result<String, GraphError> {
    let store = store_var_name(ctx, node);
    if !ctx.parsed_stores.contains(&store) {
        ctx.parsed_stores.insert(store.clone());
        write_image_store(ctx, graph, node, &store)?;
    }
    Ok(if socket == 1 {
        format!("{store}.a")
    } else {
        format!("{store}.rgb")
    })
}

fn write_image_store<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
    store: &str,
) -> Result<(), GraphError> {
    let resolved = node
        .params
        .image
        .as_ref()
        .and_then(|image| ctx.resolver.resolve_image(image));
    let Some(resolved) = resolved else {
        let file = node
            .params
            .image
            .as_ref()
            .map(|i| i.file.as_str())
            .unwrap_or("<none>");
        ctx.warn(
            DiagnosticKind::MissingAsset,
            &node.name,
            format!("image `{file}` could not be resolved"),
        );
        ctx.cur().write(format!("vec4 {store} = {MAGENTA};"));
        ctx.sample_bump = false;
        return Ok(());
    };

    ctx.registry.register_texture_asset(&resolved.file_name);
    let tex_name = ctx.node_name(&node.name);
    let link = format!("${}", resolved.file_name);
    ctx.cur().add_uniform("sampler2D", &tex_name, Some(&link));

    let projection = node
        .params
        .image
        .as_ref()
        .map(|i| i.projection)
        .unwrap_or(TexProjection::Flat);
    if projection == TexProjection::Box {
        ctx.add_include("std/mapping.glsl");
        ctx.cur().write(format!(
            "vec4 {store} = tex_triplanar({tex_name}, wposition * 0.25, n);"
        ));
        if resolved.color_space == ColorSpace::Srgb {
            ctx.cur()
                .write(format!("{store}.rgb = pow({store}.rgb, vec3(2.2));"));
        }
        // finite differences need a flat parametrization
        ctx.sample_bump = false;
        return Ok(());
    }

    let uv = if graph.input_link(&node.name, 0).is_some() {
        let v = parse_vector_input(ctx, graph, node, 0)?;
        format!("{v}.xy")
    } else {
        ctx.vert.add_elem(VertexElement::Uv0);
        "vec2(texCoord.x, 1.0 - texCoord.y)".to_string()
    };
    ctx.cur()
        .write(format!("vec4 {store} = texture({tex_name}, {uv});"));
    if resolved.color_space == ColorSpace::Srgb {
        ctx.cur()
            .write(format!("{store}.rgb = pow({store}.rgb, vec3(2.2));"));
    }

    if ctx.sample_bump {
        ctx.sample_bump_res = format!("{store}_bump");
        let base = ctx.sample_bump_res.clone();
        let offsets = [
            "vec2(-0.001, 0.0)",
            "vec2(0.001, 0.0)",
            "vec2(0.0, -0.001)",
            "vec2(0.0, 0.001)",
        ];
        for (i, ofs) in offsets.iter().enumerate() {
            ctx.cur().write(format!(
                "float {base}_{n} = texture({tex_name}, {uv} + {ofs}).r;",
                n = i + 1
            ));
        }
        ctx.sample_bump = false;
    }
    Ok(())
}

/// Inputs: 0 Vector, 1 Color1, 2 Color2, 3 Scale. Outputs: 0 Color, 1 Fac.
pub(crate) fn tex_checker<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
    socket: usize,
) -> Result<String, GraphError> {
    ctx.add_include("std/procedurals.glsl");
    let co = proc_coord(ctx, graph, node)?;
    let scale = parse_value_input(ctx, graph, node, 3)?;
    // offset samples are scalar, take the _f form regardless of the socket
    if ctx.sample_bump {
        write_bump(ctx, node, &format!("tex_checker_f({co}, {scale})"), 0.001);
    }
    if socket == 1 {
        Ok(format!("tex_checker_f({co}, {scale})"))
    } else {
        let c1 = parse_vector_input(ctx, graph, node, 1)?;
        let c2 = parse_vector_input(ctx, graph, node, 2)?;
        Ok(format!("tex_checker({co}, {c1}, {c2}, {scale})"))
    }
}

/// Inputs: 0 Vector, 1 Color1, 2 Color2, 3 Mortar, 4 Scale.
/// Outputs: 0 Color, 1 Fac.
pub(crate) fn tex_brick<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
    socket: usize,
) -> Result<String, GraphError> {
    ctx.add_include("std/procedurals.glsl");
    let co = proc_coord(ctx, graph, node)?;
    let scale = parse_value_input(ctx, graph, node, 4)?;
    if ctx.sample_bump {
        write_bump(ctx, node, &format!("tex_brick_f({co} * {scale})"), 0.001);
    }
    if socket == 1 {
        Ok(format!("tex_brick_f({co} * {scale})"))
    } else {
        let c1 = parse_vector_input(ctx, graph, node, 1)?;
        let c2 = parse_vector_input(ctx, graph, node, 2)?;
        let mortar = parse_vector_input(ctx, graph, node, 3)?;
        Ok(format!("tex_brick({co} * {scale}, {c1}, {c2}, {mortar})"))
    }
}

/// Inputs: 0 Vector. Outputs: 0 Color, 1 Fac.
pub(crate) fn tex_gradient<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
    socket: usize,
) -> Result<String, GraphError> {
    let co = proc_coord(ctx, graph, node)?;
    let kind = node.params.gradient.unwrap_or(GradientKind::Linear);
    let f = match kind {
        GradientKind::Linear => format!("{co}.x"),
        GradientKind::Quadratic => format!("(max({co}.x, 0.0) * max({co}.x, 0.0))"),
        GradientKind::Easing => format!("smoothstep(0.0, 1.0, {co}.x)"),
        GradientKind::Diagonal => format!("(({co}.x + {co}.y) * 0.5)"),
        GradientKind::Radial => format!("(atan({co}.y, {co}.x) / (3.141592 * 2.0) + 0.5)"),
        GradientKind::QuadraticSphere => format!(
            "(max(1.0 - length({co}), 0.0) * max(1.0 - length({co}), 0.0))"
        ),
        GradientKind::Spherical => format!("max(1.0 - length({co}), 0.0)"),
    };
    let fac = format!("clamp({f}, 0.0, 1.0)");
    Ok(if socket == 1 {
        fac
    } else {
        format!("vec3({fac})")
    })
}

/// Inputs: 0 Vector, 1 Scale, 2 Detail, 3 Distortion. Outputs: 0 Color, 1 Fac.
pub(crate) fn tex_noise<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
    socket: usize,
) -> Result<String, GraphError> {
    ctx.add_include("std/procedurals.glsl");
    let co = proc_coord(ctx, graph, node)?;
    let scale = parse_value_input(ctx, graph, node, 1)?;
    let detail = parse_value_input(ctx, graph, node, 2)?;
    let distortion = parse_value_input(ctx, graph, node, 3)?;
    let f = format!("tex_noise({co} * {scale}, {detail}, {distortion})");
    if ctx.sample_bump {
        write_bump(ctx, node, &f, 0.1);
    }
    Ok(if socket == 1 {
        f
    } else {
        format!(
            "vec3({f}, tex_noise({co} * {scale} + 120.0, {detail}, {distortion}), tex_noise({co} * {scale} + 168.0, {detail}, {distortion}))"
        )
    })
}

/// Inputs: 0 Vector, 1 Scale. Outputs: 0 Color, 1 Fac. The distance metric
/// is fixed to euclidean.
pub(crate) fn tex_voronoi<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
    socket: usize,
) -> Result<String, GraphError> {
    ctx.add_include("std/procedurals.glsl");
    let co = proc_coord(ctx, graph, node)?;
    let scale = parse_value_input(ctx, graph, node, 1)?;
    if ctx.sample_bump {
        write_bump(ctx, node, &format!("tex_voronoi_f({co} * {scale})"), 0.001);
    }
    Ok(if socket == 1 {
        format!("tex_voronoi_f({co} * {scale})")
    } else {
        format!("tex_voronoi({co} * {scale})")
    })
}

/// Inputs: 0 Vector, 1 Scale. Single Fac output.
pub(crate) fn tex_musgrave<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
) -> Result<String, GraphError> {
    ctx.add_include("std/procedurals.glsl");
    let co = proc_coord(ctx, graph, node)?;
    let scale = parse_value_input(ctx, graph, node, 1)?;
    let res = format!("tex_musgrave_f({co} * {scale} * 0.5)");
    if ctx.sample_bump {
        write_bump(ctx, node, &res, 0.1);
    }
    Ok(res)
}

/// Inputs: 0 Vector, 1 Scale, 2 Distortion. Outputs: 0 Color, 1 Fac. Band
/// and ring shapes share one profile.
pub(crate) fn tex_wave<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
    socket: usize,
) -> Result<String, GraphError> {
    ctx.add_include("std/procedurals.glsl");
    let co = proc_coord(ctx, graph, node)?;
    let scale = parse_value_input(ctx, graph, node, 1)?;
    let res = format!("tex_wave_f({co} * {scale})");
    if ctx.sample_bump {
        write_bump(ctx, node, &res, 0.001);
    }
    Ok(if socket == 1 {
        res
    } else {
        format!("vec3({res})")
    })
}

/// Inputs: 0 Vector, 1 Scale, 2 Distortion. Outputs: 0 Color, 1 Fac.
pub(crate) fn tex_magic<'g>(
    ctx: &mut CompileContext<'g>,
    graph: &'g NodeGraph,
    node: &'g Node,
    socket: usize,
) -> Result<String, GraphError> {
    ctx.add_include("std/procedurals.glsl");
    let co = proc_coord(ctx, graph, node)?;
    let scale = parse_value_input(ctx, graph, node, 1)?;
    if ctx.sample_bump {
        write_bump(ctx, node, &format!("tex_magic_f({co} * {scale} * 4.0)"), 0.1);
    }
    Ok(if socket == 1 {
        format!("tex_magic_f({co} * {scale} * 4.0)")
    } else {
        format!("tex_magic({co} * {scale} * 4.0)")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetRegistry, ImageRef, MemoryImageResolver};
    use crate::dsl::{NodeKind, NodeParams, Socket};

    fn image_node(file: &str) -> Node {
        Node::new("img", NodeKind::TexImage)
            .with_inputs(vec![Socket::vector("Vector", [0.0, 0.0, 0.0])])
            .with_outputs(vec![
                Socket::color("Color", [0.0, 0.0, 0.0]),
                Socket::value("Alpha", 1.0),
            ])
            .with_params(NodeParams {
                image: Some(ImageRef::new(file)),
                ..Default::default()
            })
    }

    #[test]
    fn color_and_alpha_share_one_texture_fetch() {
        let resolver = MemoryImageResolver::new(["wood.png"]);
        let registry = AssetRegistry::new();
        let mut ctx = CompileContext::new(Default::default(), &resolver, &registry);
        let mut g = NodeGraph::new("mat");
        g.nodes.push(image_node("wood.png"));
        let node = g.node("img").unwrap();

        let color = tex_image(&mut ctx, &g, node, 0).unwrap();
        let alpha = tex_image(&mut ctx, &g, node, 1).unwrap();
        assert_eq!(color, "img_store.rgb");
        assert_eq!(alpha, "img_store.a");
        let fetches = ctx
            .frag
            .statements()
            .iter()
            .filter(|s| s.contains("texture(img,"))
            .count();
        assert_eq!(fetches, 1);
        assert_eq!(registry.textures(), vec!["wood.png".to_string()]);
    }

    #[test]
    fn srgb_images_are_linearized_after_the_fetch() {
        let resolver = MemoryImageResolver::new(["wood.png"]);
        let registry = AssetRegistry::new();
        let mut ctx = CompileContext::new(Default::default(), &resolver, &registry);
        let mut g = NodeGraph::new("mat");
        g.nodes.push(image_node("wood.png"));
        let node = g.node("img").unwrap();
        tex_image(&mut ctx, &g, node, 0).unwrap();
        assert!(ctx
            .frag
            .contains("img_store.rgb = pow(img_store.rgb, vec3(2.2));"));
        assert_eq!(ctx.frag.uniforms()[0].link.as_deref(), Some("$wood.png"));
    }

    #[test]
    fn missing_image_degrades_to_magenta_with_a_diagnostic() {
        let resolver = MemoryImageResolver::default();
        let registry = AssetRegistry::new();
        let mut ctx = CompileContext::new(Default::default(), &resolver, &registry);
        let mut g = NodeGraph::new("mat");
        g.nodes.push(image_node("gone.png"));
        let node = g.node("img").unwrap();
        let res = tex_image(&mut ctx, &g, node, 0).unwrap();
        assert_eq!(res, "img_store.rgb");
        assert!(ctx
            .frag
            .contains("vec4 img_store = vec4(1.0, 0.0, 1.0, 1.0);"));
        assert_eq!(ctx.diagnostics.len(), 1);
        assert_eq!(ctx.diagnostics[0].kind, DiagnosticKind::MissingAsset);
        assert!(registry.textures().is_empty());
    }

    #[test]
    fn box_projection_samples_triplanar() {
        let resolver = MemoryImageResolver::new(["rock.png"]);
        let registry = AssetRegistry::new();
        let mut ctx = CompileContext::new(Default::default(), &resolver, &registry);
        let mut g = NodeGraph::new("mat");
        let mut node = image_node("rock.png");
        node.params.image.as_mut().unwrap().projection = crate::assets::TexProjection::Box;
        g.nodes.push(node);
        let node = g.node("img").unwrap();
        tex_image(&mut ctx, &g, node, 0).unwrap();
        assert!(ctx
            .frag
            .contains("vec4 img_store = tex_triplanar(img, wposition * 0.25, n);"));
        assert!(ctx.frag.has_include("std/mapping.glsl"));
    }

    #[test]
    fn procedurals_pull_in_the_include_library() {
        let resolver = MemoryImageResolver::default();
        let registry = AssetRegistry::new();
        let mut ctx = CompileContext::new(Default::default(), &resolver, &registry);
        let mut g = NodeGraph::new("mat");
        g.nodes.push(
            Node::new("noise", NodeKind::TexNoise)
                .with_inputs(vec![
                    Socket::vector("Vector", [0.0, 0.0, 0.0]),
                    Socket::value("Scale", 5.0),
                    Socket::value("Detail", 2.0),
                    Socket::value("Distortion", 0.0),
                ])
                .with_outputs(vec![
                    Socket::color("Color", [0.0, 0.0, 0.0]),
                    Socket::value("Fac", 0.0),
                ]),
        );
        let node = g.node("noise").unwrap();
        let fac = tex_noise(&mut ctx, &g, node, 1).unwrap();
        assert_eq!(fac, "tex_noise(bposition * 5.0, 2.0, 0.0)");
        assert!(ctx.frag.has_include("std/procedurals.glsl"));
        assert_eq!(registry.includes(), vec!["std/procedurals.glsl".to_string()]);
    }
}
