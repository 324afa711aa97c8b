//! GLSL sources and the registry that assigns them ids.
//!
//! Sources omit the `#version` line; the GL backend prepends the one matching
//! the running context.

/// Vertex shader shared by every program.
///
/// Positions arrive in normalized canvas space ([0, 1], y down) and are mapped
/// to device coordinates here after `_transform` is applied.
pub const VERTEX_SHADER: &str = r#"
in vec2 _vertex_position;
in vec4 _vertex_color;
in vec2 _vertex_tex_coord;

uniform mat4 _transform;

out vec4 _fragment_color;
out vec2 _fragment_tex_coord;

void main() {
    vec4 position = _transform * vec4(_vertex_position, 0.0, 1.0);
    gl_Position = vec4(position.x * 2.0 - 1.0, 1.0 - position.y * 2.0, 0.0, 1.0);
    gl_PointSize = 1.0;
    _fragment_color = _vertex_color;
    _fragment_tex_coord = _vertex_tex_coord;
}
"#;

/// Solid or textured fill. egui textures are sRGB, so samples are converted
/// back to gamma space before blending.
pub const DEFAULT_FRAGMENT_SHADER: &str = r#"
#ifdef GL_ES
precision mediump float;
#endif

in vec4 _fragment_color;
in vec2 _fragment_tex_coord;

uniform sampler2D _texture;
uniform int _texture_set;

out vec4 _out_color;

vec3 srgb_from_linear(vec3 rgb) {
    bvec3 cutoff = lessThan(rgb, vec3(0.0031308));
    vec3 lower = rgb * vec3(12.92);
    vec3 higher = vec3(1.055) * pow(rgb, vec3(1.0 / 2.4)) - vec3(0.055);
    return mix(higher, lower, vec3(cutoff));
}

void main() {
    if (_texture_set == 1) {
        vec4 texel = texture(_texture, _fragment_tex_coord);
        _out_color = vec4(srgb_from_linear(texel.rgb), texel.a) * _fragment_color;
    } else {
        _out_color = _fragment_color;
    }
}
"#;

/// Checkerboard keyed to device pixels, independent of zoom
pub const TILING_FRAGMENT_SHADER: &str = r#"
#ifdef GL_ES
precision mediump float;
#endif

in vec4 _fragment_color;
in vec2 _fragment_tex_coord;

uniform vec2 _canvas_size;
uniform float _tile_size;
uniform vec4 _light_color;
uniform vec4 _dark_color;

out vec4 _out_color;

void main() {
    // Tiles start at the top-left corner of the viewport
    vec2 position = vec2(gl_FragCoord.x, _canvas_size.y - gl_FragCoord.y);
    vec2 tile = floor(position / max(_tile_size, 1.0));
    bool light = mod(tile.x + tile.y, 2.0) < 1.0;
    _out_color = (light ? _light_color : _dark_color) * _fragment_color.a;
}
"#;

/// Copies a framebuffer texture onto the screen
pub const COMPOSITE_FRAGMENT_SHADER: &str = r#"
#ifdef GL_ES
precision mediump float;
#endif

in vec4 _fragment_color;
in vec2 _fragment_tex_coord;

uniform sampler2D _texture;

out vec4 _out_color;

void main() {
    _out_color = texture(_texture, _fragment_tex_coord);
}
"#;

/// Index of a program in a [`ShaderLibrary`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderId(usize);

impl ShaderId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Fragment source paired with the shared vertex shader
#[derive(Debug, Clone, PartialEq)]
pub struct Shader {
    pub name: String,
    pub fragment_source: String,
}

/// Every program the canvas draws with, compiled once by the GL backend
#[derive(Debug, Clone)]
pub struct ShaderLibrary {
    shaders: Vec<Shader>,
}

impl Default for ShaderLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderLibrary {
    pub const DEFAULT: ShaderId = ShaderId(0);

    /// Creates a library holding the default fill program
    pub fn new() -> Self {
        Self {
            shaders: vec![Shader {
                name: "default".to_string(),
                fragment_source: DEFAULT_FRAGMENT_SHADER.to_string(),
            }],
        }
    }

    pub fn register(&mut self, name: &str, fragment_source: &str) -> ShaderId {
        if let Some(index) = self.shaders.iter().position(|shader| shader.name == name) {
            log::warn!("Shader `{}` registered twice, keeping the first source", name);
            return ShaderId(index);
        }
        self.shaders.push(Shader {
            name: name.to_string(),
            fragment_source: fragment_source.to_string(),
        });
        ShaderId(self.shaders.len() - 1)
    }

    pub fn get(&self, id: ShaderId) -> Option<&Shader> {
        self.shaders.get(id.0)
    }

    pub fn find(&self, name: &str) -> Option<ShaderId> {
        self.shaders.iter().position(|shader| shader.name == name).map(ShaderId)
    }

    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ShaderId, &Shader)> {
        self.shaders.iter().enumerate().map(|(i, shader)| (ShaderId(i), shader))
    }
}
