//! Shader-graph material compiler.
//!
//! Turns a DAG of physically-based material nodes (BSDFs, shader mix/add
//! combinators, procedural and image textures, math and color utilities,
//! nested groups) into ordered per-stage GLSL statement lists. Traversal is
//! demand-driven from the material output node; shared subtrees are emitted
//! once per stage, missing assets degrade to placeholders with diagnostics,
//! and malformed graphs fail with typed errors.
//!
//! ```
//! use node_shade::assets::{AssetRegistry, MemoryImageResolver};
//! use node_shade::compiler::{compile_material, CompileConfig};
//! use node_shade::dsl::{Node, NodeGraph, NodeKind, Socket};
//!
//! let mut graph = NodeGraph::new("plastic");
//! graph.nodes.push(
//!     Node::new("out", NodeKind::OutputMaterial).with_inputs(vec![
//!         Socket::shader("Surface"),
//!         Socket::shader("Volume"),
//!         Socket::vector("Displacement", [0.0, 0.0, 0.0]),
//!     ]),
//! );
//!
//! let resolver = MemoryImageResolver::default();
//! let registry = AssetRegistry::new();
//! let mat = compile_material(&graph, CompileConfig::default(), &resolver, &registry).unwrap();
//! assert!(mat.frag.contains("vec3 basecol = vec3(0.8, 0.8, 0.8);"));
//! ```

pub mod assets;
pub mod compiler;
pub mod dsl;

pub use compiler::{compile_material, CompileConfig, CompiledMaterial, GraphError};
