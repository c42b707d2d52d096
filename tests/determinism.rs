use node_shade::assets::{AssetRegistry, MemoryImageResolver};
use node_shade::compiler::{compile_material, CompileConfig};
use node_shade::dsl::{MathOp, Node, NodeGraph, NodeKind, NodeParams, Socket};
use proptest::prelude::*;

const OPS: [MathOp; 8] = [
    MathOp::Add,
    MathOp::Subtract,
    MathOp::Multiply,
    MathOp::Maximum,
    MathOp::Minimum,
    MathOp::Sine,
    MathOp::Power,
    MathOp::Fract,
];

/// Value node feeding a chain of math nodes into a principled roughness.
fn math_chain(seed: f32, ops: &[(usize, f32)]) -> NodeGraph {
    let mut g = NodeGraph::new("chain");
    g.nodes.push(
        Node::new("v", NodeKind::Value).with_outputs(vec![Socket::value("Value", seed)]),
    );
    let mut prev = "v".to_string();
    for (i, (op, operand)) in ops.iter().enumerate() {
        let name = format!("m{i}");
        g.nodes.push(
            Node::new(&name, NodeKind::Math)
                .with_inputs(vec![Socket::value("A", 0.0), Socket::value("B", *operand)])
                .with_outputs(vec![Socket::value("Value", 0.0)])
                .with_params(NodeParams {
                    operation: Some(OPS[*op % OPS.len()]),
                    ..Default::default()
                }),
        );
        g.link(&prev, 0, &name, 0);
        prev = name;
    }
    g.nodes.push(
        Node::new("pbr", NodeKind::BsdfPrincipled)
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
            .with_outputs(vec![Socket::shader("BSDF")]),
    );
    g.nodes.push(
        Node::new("out", NodeKind::OutputMaterial).with_inputs(vec![
            Socket::shader("Surface"),
            Socket::shader("Volume"),
            Socket::vector("Displacement", [0.0, 0.0, 0.0]),
        ]),
    );
    g.link(&prev, 0, "pbr", 1);
    g.link("pbr", 0, "out", 0);
    g
}

fn sources(graph: &NodeGraph) -> (String, String) {
    let resolver = MemoryImageResolver::default();
    let registry = AssetRegistry::new();
    let mat = compile_material(graph, CompileConfig::default(), &resolver, &registry).unwrap();
    (mat.vert.source(), mat.frag.source())
}

proptest! {
    #[test]
    fn recompiling_the_same_graph_is_byte_identical(
        seed in -4.0f32..4.0,
        ops in prop::collection::vec((0usize..8, -4.0f32..4.0), 1..12),
    ) {
        let graph = math_chain(seed, &ops);
        let first = sources(&graph);
        let second = sources(&graph);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn chain_emits_one_declaration_per_math_node(
        seed in -4.0f32..4.0,
        ops in prop::collection::vec((0usize..8, -4.0f32..4.0), 1..12),
    ) {
        let graph = math_chain(seed, &ops);
        let resolver = MemoryImageResolver::default();
        let registry = AssetRegistry::new();
        let mat = compile_material(&graph, CompileConfig::default(), &resolver, &registry).unwrap();
        for i in 0..ops.len() {
            let decl = format!("float m{i}_Value_res =");
            let count = mat
                .frag
                .statements()
                .iter()
                .filter(|s| s.starts_with(&decl))
                .count();
            prop_assert_eq!(count, 1);
        }
    }
}
