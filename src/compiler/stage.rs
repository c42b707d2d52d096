//! Per-stage emission targets.
//!
//! An [`EmissionTarget`] is a structured, append-only statement sink plus the
//! registries that accompany a stage: uniforms, hoisted constants, include
//! libraries and required vertex input elements. Flattening to shading
//! language text happens once, at the very end, in [`EmissionTarget::source`].

use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageKind {
    Vertex,
    Fragment,
    Geometry,
    TessControl,
    TessEval,
}

impl StageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StageKind::Vertex => "vert",
            StageKind::Fragment => "frag",
            StageKind::Geometry => "geom",
            StageKind::TessControl => "tesc",
            StageKind::TessEval => "tese",
        }
    }
}

/// Vertex buffer elements a stage requires the mesh to provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VertexElement {
    /// Primary UV set (`texCoord`).
    Uv0,
    /// Secondary UV set (`texCoord1`).
    Uv1,
    /// Vertex colors (`vcolor`).
    Color,
    /// Precomputed tangents (`tang`).
    Tangent,
}

impl VertexElement {
    pub fn name(self) -> &'static str {
        match self {
            VertexElement::Uv0 => "tex",
            VertexElement::Uv1 => "tex1",
            VertexElement::Color => "col",
            VertexElement::Tangent => "tang",
        }
    }

    /// Packed vertex-buffer format the exporter writes for this element.
    pub fn data_format(self) -> &'static str {
        match self {
            VertexElement::Uv0 | VertexElement::Uv1 => "short2norm",
            VertexElement::Color | VertexElement::Tangent => "short4norm",
        }
    }
}

/// Uniform declaration with an optional external binding key (e.g. a node
/// name for runtime-linked parameters, or `$file.png` for bundled samplers).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uniform {
    pub glsl_type: String,
    pub name: String,
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ConstDecl {
    glsl_type: String,
    name: String,
    value: String,
    array_size: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct EmissionTarget {
    pub stage: StageKind,
    statements: Vec<String>,
    consts: Vec<ConstDecl>,
    uniforms: Vec<Uniform>,
    includes: Vec<String>,
    vertex_elements: BTreeSet<VertexElement>,
}

impl EmissionTarget {
    pub fn new(stage: StageKind) -> Self {
        EmissionTarget {
            stage,
            statements: Vec::new(),
            consts: Vec::new(),
            uniforms: Vec::new(),
            includes: Vec::new(),
            vertex_elements: BTreeSet::new(),
        }
    }

    /// Append one statement. Statements are never reordered or removed.
    pub fn write(&mut self, stmt: impl Into<String>) {
        self.statements.push(stmt.into());
    }

    /// Hoist a constant above the statement stream. Deduplicated by name.
    pub fn add_const(
        &mut self,
        glsl_type: &str,
        name: &str,
        value: &str,
        array_size: Option<usize>,
    ) {
        if self.consts.iter().any(|c| c.name == name) {
            return;
        }
        self.consts.push(ConstDecl {
            glsl_type: glsl_type.to_string(),
            name: name.to_string(),
            value: value.to_string(),
            array_size,
        });
    }

    /// Declare a uniform. Deduplicated by name; the first declaration wins.
    pub fn add_uniform(&mut self, glsl_type: &str, name: &str, link: Option<&str>) {
        if self.uniforms.iter().any(|u| u.name == name) {
            return;
        }
        self.uniforms.push(Uniform {
            glsl_type: glsl_type.to_string(),
            name: name.to_string(),
            link: link.map(str::to_string),
        });
    }

    /// Reference an include library. Ordered, deduplicated.
    pub fn add_include(&mut self, path: &str) {
        if !self.includes.iter().any(|i| i == path) {
            self.includes.push(path.to_string());
        }
    }

    pub fn has_include(&self, path: &str) -> bool {
        self.includes.iter().any(|i| i == path)
    }

    pub fn add_elem(&mut self, elem: VertexElement) {
        self.vertex_elements.insert(elem);
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    pub fn uniforms(&self) -> &[Uniform] {
        &self.uniforms
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub fn vertex_elements(&self) -> impl Iterator<Item = VertexElement> + '_ {
        self.vertex_elements.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty() && self.consts.is_empty()
    }

    /// Whether any emitted statement contains the given fragment. Test helper
    /// mirroring the original's `Shader.contains`.
    pub fn contains(&self, needle: &str) -> bool {
        self.statements.iter().any(|s| s.contains(needle))
    }

    /// Flatten to shading-language text. Include bodies are unioned in by the
    /// host before its GPU compiler runs; here they stay as directives.
    pub fn source(&self) -> String {
        let mut s = String::from("#version 450\n");
        for inc in &self.includes {
            s.push_str(&format!("#include \"{inc}\"\n"));
        }
        for u in &self.uniforms {
            s.push_str(&format!("uniform {} {};\n", u.glsl_type, u.name));
        }
        for c in &self.consts {
            match c.array_size {
                Some(n) => s.push_str(&format!(
                    "const {ty} {name}[{n}] = {ty}[]({value});\n",
                    ty = c.glsl_type,
                    name = c.name,
                    value = c.value,
                )),
                None => s.push_str(&format!(
                    "const {} {} = {};\n",
                    c.glsl_type, c.name, c.value
                )),
            }
        }
        s.push_str("void main() {\n");
        for stmt in &self.statements {
            s.push('\t');
            s.push_str(stmt);
            s.push('\n');
        }
        s.push_str("}\n");
        s
    }
}

/// Format a float the way the statement emitters expect: finite, shortest
/// round-trip text, always with a decimal point so GLSL reads it as a float.
pub fn fmt_f32(v: f32) -> String {
    if !v.is_finite() {
        return "0.0".to_string();
    }
    let s = format!("{v}");
    if s.contains('.') || s.contains('e') {
        s
    } else {
        format!("{s}.0")
    }
}

pub fn to_vec1(v: f32) -> String {
    fmt_f32(v)
}

pub fn to_vec2(v: [f32; 2]) -> String {
    format!("vec2({}, {})", fmt_f32(v[0]), fmt_f32(v[1]))
}

pub fn to_vec3(v: [f32; 3]) -> String {
    format!("vec3({}, {}, {})", fmt_f32(v[0]), fmt_f32(v[1]), fmt_f32(v[2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_f32_emits_shortest_float_text() {
        assert_eq!(fmt_f32(0.5), "0.5");
        assert_eq!(fmt_f32(1.0), "1.0");
        assert_eq!(fmt_f32(0.0), "0.0");
        assert_eq!(fmt_f32(f32::NAN), "0.0");
        // not exactly representable; the shortest text still round-trips
        assert_eq!(fmt_f32(0.1), "0.1");
        assert_eq!(fmt_f32(0.2), "0.2");
        assert_eq!(fmt_f32(0.4), "0.4");
    }

    #[test]
    fn uniforms_dedup_by_name() {
        let mut t = EmissionTarget::new(StageKind::Fragment);
        t.add_uniform("sampler2D", "tex_a", Some("$a.png"));
        t.add_uniform("sampler2D", "tex_a", None);
        assert_eq!(t.uniforms().len(), 1);
        assert_eq!(t.uniforms()[0].link.as_deref(), Some("$a.png"));
    }

    #[test]
    fn includes_keep_first_seen_order() {
        let mut t = EmissionTarget::new(StageKind::Fragment);
        t.add_include("std/procedurals.glsl");
        t.add_include("std/normals.glsl");
        t.add_include("std/procedurals.glsl");
        assert_eq!(t.includes(), ["std/procedurals.glsl", "std/normals.glsl"]);
    }

    #[test]
    fn source_renders_const_arrays() {
        let mut t = EmissionTarget::new(StageKind::Fragment);
        t.add_const("float", "RAMP_FACS", "0.0, 1.0", Some(2));
        t.write("float x = RAMP_FACS[0];");
        let src = t.source();
        assert!(src.contains("const float RAMP_FACS[2] = float[](0.0, 1.0);"));
        assert!(src.contains("void main() {"));
    }
}
