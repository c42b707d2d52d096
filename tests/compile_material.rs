use node_shade::assets::{AssetRegistry, ImageRef, MemoryImageResolver};
use node_shade::compiler::{
    compile_material, CompileConfig, DiagnosticKind, GraphError, StageKind,
};
use node_shade::dsl::{MathOp, Node, NodeGraph, NodeKind, NodeParams, Socket};

fn output_node() -> Node {
    Node::new("out", NodeKind::OutputMaterial).with_inputs(vec![
        Socket::shader("Surface"),
        Socket::shader("Volume"),
        Socket::vector("Displacement", [0.0, 0.0, 0.0]),
    ])
}

fn principled_node(name: &str) -> Node {
    Node::new(name, NodeKind::BsdfPrincipled)
        .with_inputs(vec![
            Socket::color("Base Color", [0.8, 0.8, 0.8]),
            Socket::value("Roughness", 0.4),
            Socket::value("Metallic", 0.0),
            Socket::value("Specular", 0.5),
            Socket::color("Emission", [0.0, 0.0, 0.0]),
            Socket::value("Emission Strength", 0.0),
            Socket::value("Alpha", 1.0),
            Socket::vector("Normal", [0.0, 0.0, 0.0]),
        ])
        .with_outputs(vec![Socket::shader("BSDF")])
}

fn noise_node(name: &str) -> Node {
    Node::new(name, NodeKind::TexNoise)
        .with_inputs(vec![
            Socket::vector("Vector", [0.0, 0.0, 0.0]),
            Socket::value("Scale", 5.0),
            Socket::value("Detail", 2.0),
            Socket::value("Distortion", 0.0),
        ])
        .with_outputs(vec![
            Socket::color("Color", [0.0, 0.0, 0.0]),
            Socket::value("Fac", 0.0),
        ])
}

fn compile(graph: &NodeGraph) -> Result<node_shade::CompiledMaterial, GraphError> {
    let resolver = MemoryImageResolver::default();
    let registry = AssetRegistry::new();
    compile_material(graph, CompileConfig::default(), &resolver, &registry)
}

#[test]
fn principled_surface_end_to_end() {
    let mut g = NodeGraph::new("plastic");
    g.nodes.push(
        Node::new("rgb", NodeKind::Rgb).with_outputs(vec![Socket::color("Color", [1.0, 0.0, 0.0])]),
    );
    g.nodes.push(
        Node::new("rough", NodeKind::Value).with_outputs(vec![Socket::value("Value", 0.5)]),
    );
    g.nodes.push(principled_node("pbr"));
    g.nodes.push(output_node());
    g.link("rgb", 0, "pbr", 0);
    g.link("rough", 0, "pbr", 1);
    g.link("pbr", 0, "out", 0);

    let mat = compile(&g).unwrap();
    assert!(mat.frag.contains("vec3 rgb_Color_res = vec3(1.0, 0.0, 0.0);"));
    assert!(mat.frag.contains("float rough_Value_res = 0.5;"));
    assert!(mat.frag.contains("vec3 basecol = rgb_Color_res;"));
    assert!(mat.frag.contains("float roughness = rough_Value_res;"));
    assert!(mat.frag.contains("float metallic = 0.0;"));
    assert!(!mat.frag.contains("opacity"));
    assert!(!mat.frag.contains("emission"));
    assert!(!mat.emission_found);
    assert!(mat.vert.is_empty());
    assert!(mat.diagnostics.is_empty());
}

#[test]
fn shared_subtree_is_declared_once_per_stage() {
    let mut g = NodeGraph::new("mat");
    g.nodes.push(noise_node("noise"));
    g.nodes.push(
        Node::new("m1", NodeKind::Math)
            .with_inputs(vec![Socket::value("A", 0.0), Socket::value("B", 0.2)])
            .with_outputs(vec![Socket::value("Value", 0.0)])
            .with_params(NodeParams {
                operation: Some(MathOp::Add),
                ..Default::default()
            }),
    );
    g.nodes.push(
        Node::new("m2", NodeKind::Math)
            .with_inputs(vec![Socket::value("A", 0.0), Socket::value("B", 0.0)])
            .with_outputs(vec![Socket::value("Value", 0.0)])
            .with_params(NodeParams {
                operation: Some(MathOp::Multiply),
                ..Default::default()
            }),
    );
    g.nodes.push(principled_node("pbr"));
    g.nodes.push(output_node());
    g.link("noise", 1, "m1", 0);
    g.link("noise", 1, "m2", 0);
    g.link("m1", 0, "pbr", 1);
    g.link("m2", 0, "pbr", 2);
    g.link("pbr", 0, "out", 0);

    let mat = compile(&g).unwrap();
    let declarations = mat
        .frag
        .statements()
        .iter()
        .filter(|s| s.starts_with("float noise_Fac_res ="))
        .count();
    assert_eq!(declarations, 1);
    assert!(mat.frag.contains("float m1_Value_res = (noise_Fac_res + 0.2);"));
    assert!(mat.frag.contains("float m2_Value_res = (noise_Fac_res * 0.0);"));
}

#[test]
fn cyclic_links_are_rejected() {
    let mut g = NodeGraph::new("mat");
    for name in ["a", "b"] {
        g.nodes.push(
            Node::new(name, NodeKind::Math)
                .with_inputs(vec![Socket::value("A", 0.0), Socket::value("B", 0.0)])
                .with_outputs(vec![Socket::value("Value", 0.0)]),
        );
    }
    g.nodes.push(principled_node("pbr"));
    g.nodes.push(output_node());
    g.link("a", 0, "b", 0);
    g.link("b", 0, "a", 0);
    g.link("a", 0, "pbr", 1);
    g.link("pbr", 0, "out", 0);

    match compile(&g) {
        Err(GraphError::Cycle { node }) => assert!(node == "a" || node == "b"),
        other => panic!("expected Cycle, got {other:?}"),
    }
}

#[test]
fn shader_socket_cannot_feed_a_value_input() {
    let mut g = NodeGraph::new("mat");
    g.nodes.push(principled_node("pbr"));
    g.nodes.push(principled_node("pbr2"));
    g.nodes.push(output_node());
    g.link("pbr2", 0, "pbr", 1);
    g.link("pbr", 0, "out", 0);

    match compile(&g) {
        Err(GraphError::TypeMismatch { node, expected, .. }) => {
            assert_eq!(node, "pbr2");
            assert_eq!(expected, "value");
        }
        other => panic!("expected TypeMismatch, got {other:?}"),
    }
}

#[test]
fn mix_shader_weights_operands_even_at_factor_zero() {
    let mut g = NodeGraph::new("mat");
    g.nodes.push(
        Node::new("red", NodeKind::BsdfDiffuse)
            .with_inputs(vec![
                Socket::color("Color", [1.0, 0.0, 0.0]),
                Socket::value("Roughness", 0.0),
                Socket::vector("Normal", [0.0, 0.0, 0.0]),
            ])
            .with_outputs(vec![Socket::shader("BSDF")]),
    );
    g.nodes.push(
        Node::new("mix", NodeKind::MixShader)
            .with_inputs(vec![
                Socket::value("Fac", 0.0),
                Socket::shader("Shader"),
                Socket::shader("Shader"),
            ])
            .with_outputs(vec![Socket::shader("Shader")]),
    );
    g.nodes.push(output_node());
    g.link("red", 0, "mix", 1);
    g.link("mix", 0, "out", 0);

    let mat = compile(&g).unwrap();
    assert!(mat.frag.contains("const float mix_fac = 0.0;"));
    assert!(mat.frag.contains("const float mix_fac_inv = 1.0 - mix_fac;"));
    assert!(mat.frag.contains(
        "vec3 basecol = (vec3(1.0, 0.0, 0.0) * mix_fac_inv + vec3(0.8, 0.8, 0.8) * mix_fac);"
    ));
}

#[test]
fn missing_image_keeps_the_compile_alive() {
    let mut g = NodeGraph::new("mat");
    g.nodes.push(
        Node::new("img", NodeKind::TexImage)
            .with_inputs(vec![Socket::vector("Vector", [0.0, 0.0, 0.0])])
            .with_outputs(vec![
                Socket::color("Color", [0.0, 0.0, 0.0]),
                Socket::value("Alpha", 1.0),
            ])
            .with_params(NodeParams {
                image: Some(ImageRef::new("lost.png")),
                ..Default::default()
            }),
    );
    g.nodes.push(principled_node("pbr"));
    g.nodes.push(output_node());
    g.link("img", 0, "pbr", 0);
    g.link("pbr", 0, "out", 0);

    let resolver = MemoryImageResolver::default();
    let registry = AssetRegistry::new();
    let mat = compile_material(&g, CompileConfig::default(), &resolver, &registry).unwrap();
    assert!(mat.frag.contains("vec4 img_store = vec4(1.0, 0.0, 1.0, 1.0);"));
    assert!(mat.frag.contains("vec3 basecol = img_Color_res;"));
    assert_eq!(mat.diagnostics.len(), 1);
    assert_eq!(mat.diagnostics[0].kind, DiagnosticKind::MissingAsset);
    assert!(registry.textures().is_empty());
}

#[test]
fn bump_height_samples_are_scoped_to_the_bump_evaluation() {
    let mut g = NodeGraph::new("mat");
    g.nodes.push(noise_node("noise"));
    g.nodes.push(
        Node::new("bmp", NodeKind::Bump)
            .with_inputs(vec![
                Socket::value("Strength", 1.0),
                Socket::value("Distance", 0.1),
                Socket::value("Height", 1.0),
                Socket::vector("Normal", [0.0, 0.0, 0.0]),
            ])
            .with_outputs(vec![Socket::vector("Normal", [0.0, 0.0, 0.0])]),
    );
    g.nodes.push(principled_node("pbr"));
    g.nodes.push(output_node());
    g.link("noise", 1, "bmp", 2);
    g.link("bmp", 0, "pbr", 7);
    g.link("noise", 1, "pbr", 1);
    g.link("pbr", 0, "out", 0);

    let mat = compile(&g).unwrap();
    let offset_samples = mat
        .frag
        .statements()
        .iter()
        .filter(|s| s.starts_with("float noise_bump_"))
        .count();
    assert_eq!(offset_samples, 4);
    assert!(mat
        .frag
        .contains("n = normalize(vec3(n.x + bmp_dx, n.y + bmp_dy, n.z));"));
    // the roughness use of the same subtree reuses the memoized variable
    assert!(mat.frag.contains("float roughness = noise_Fac_res;"));
}

#[test]
fn displacement_targets_vertex_or_tessellation() {
    let mut g = NodeGraph::new("mat");
    g.nodes.push(
        Node::new("rgb", NodeKind::Rgb).with_outputs(vec![Socket::color("Color", [0.0, 1.0, 0.0])]),
    );
    g.nodes.push(output_node());
    g.link("rgb", 0, "out", 2);

    let resolver = MemoryImageResolver::default();
    let registry = AssetRegistry::new();

    let mat = compile_material(&g, CompileConfig::default(), &resolver, &registry).unwrap();
    assert!(mat.vert.contains("vec3 disp = rgb_Color_res;"));
    assert!(mat.target(StageKind::TessEval).is_empty());

    let tess = CompileConfig {
        tessellation: true,
        ..Default::default()
    };
    let mat = compile_material(&g, tess, &resolver, &registry).unwrap();
    assert!(mat.tese.contains("vec3 disp = rgb_Color_res;"));
    assert!(!mat.vert.contains("disp"));
}

#[test]
fn group_results_are_mangled_per_call_site() {
    let mut inner = NodeGraph::new("double");
    inner.nodes.push(
        Node::new("gi", NodeKind::GroupInput).with_outputs(vec![Socket::value("Value", 0.0)]),
    );
    inner.nodes.push(
        Node::new("gmath", NodeKind::Math)
            .with_inputs(vec![Socket::value("A", 0.0), Socket::value("B", 2.0)])
            .with_outputs(vec![Socket::value("Value", 0.0)])
            .with_params(NodeParams {
                operation: Some(MathOp::Multiply),
                ..Default::default()
            }),
    );
    inner.nodes.push(
        Node::new("go", NodeKind::GroupOutput).with_inputs(vec![Socket::value("Value", 0.0)]),
    );
    inner.link("gi", 0, "gmath", 0);
    inner.link("gmath", 0, "go", 0);

    let mut g = NodeGraph::new("mat");
    g.nodes.push(
        Node::new("v", NodeKind::Value).with_outputs(vec![Socket::value("Value", 0.25)]),
    );
    g.nodes.push(
        Node::new("grp", NodeKind::Group)
            .with_inputs(vec![Socket::value("In", 0.0)])
            .with_outputs(vec![Socket::value("Out", 0.0)])
            .with_params(NodeParams {
                group: Some(Box::new(inner)),
                ..Default::default()
            }),
    );
    g.nodes.push(principled_node("pbr"));
    g.nodes.push(output_node());
    g.link("v", 0, "grp", 0);
    g.link("grp", 0, "pbr", 1);
    g.link("pbr", 0, "out", 0);

    let mat = compile(&g).unwrap();
    assert!(mat.frag.contains("float v_Value_res = 0.25;"));
    assert!(mat.frag.contains("float grp_gi_Value_res = v_Value_res;"));
    assert!(mat
        .frag
        .contains("float grp_gmath_Value_res = (grp_gi_Value_res * 2.0);"));
    assert!(mat.frag.contains("float roughness = grp_Out_res;"));
}

#[test]
fn linked_volume_socket_is_reported_and_ignored() {
    let mut g = NodeGraph::new("mat");
    g.nodes.push(principled_node("pbr"));
    g.nodes.push(output_node());
    g.link("pbr", 0, "out", 1);

    let mat = compile(&g).unwrap();
    assert!(mat
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::UnsupportedNode));
    // surface is unlinked, neutral channels still come out
    assert!(mat.frag.contains("vec3 basecol = vec3(0.8, 0.8, 0.8);"));
}
