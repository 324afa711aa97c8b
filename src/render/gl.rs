//! OpenGL backend for the canvas.
//!
//! Runs inside an egui paint callback. Every surface of the [`DrawList`] is
//! rendered into its own offscreen framebuffer, then the framebuffers are
//! composited in order onto the framebuffer egui is painting into.

use super::shader::{ShaderLibrary, COMPOSITE_FRAGMENT_SHADER, VERTEX_SHADER};
use super::shape::{PrimitiveKind, Vertex};
use super::surface::DrawList;
use super::task::{BlendMode, DrawCommand, UniformValue};
use crate::error::RenderError;
use crate::transform::Transform;
use eframe::egui_glow::{self, ShaderVersion};
use eframe::glow::{self, HasContext, PixelUnpackData};

const POSITION_LOCATION: u32 = 0;
const COLOR_LOCATION: u32 = 1;
const TEX_COORD_LOCATION: u32 = 2;

/// Offscreen color target of one surface
struct RenderTarget {
    framebuffer: glow::Framebuffer,
    texture: glow::Texture,
    size: [i32; 2],
}

/// Owns every GL object the canvas draws with.
///
/// Must be created and destroyed with the GL context of the window current.
pub struct GlRenderer {
    /// Indexed by `ShaderId`
    programs: Vec<glow::Program>,
    composite_program: glow::Program,
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    targets: Vec<RenderTarget>,
    destroyed: bool,
}

impl GlRenderer {
    pub fn new(gl: &glow::Context, shaders: &ShaderLibrary) -> Result<Self, RenderError> {
        let version = ShaderVersion::get(gl);
        if !version.is_new_shader_interface() {
            return Err(RenderError::UnsupportedShaderVersion);
        }
        log::info!("Compiling {} canvas shaders ({:?})", shaders.len(), version);

        let mut programs = Vec::with_capacity(shaders.len());
        for (_, shader) in shaders.iter() {
            programs.push(compile_program(gl, &version, &shader.name, &shader.fragment_source)?);
        }
        let composite_program = compile_program(gl, &version, "composite", COMPOSITE_FRAGMENT_SHADER)?;

        let (vao, vbo) = unsafe {
            let vao = gl.create_vertex_array().map_err(RenderError::Gl)?;
            let vbo = gl.create_buffer().map_err(RenderError::Gl)?;

            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            let stride = std::mem::size_of::<Vertex>() as i32;
            let float = std::mem::size_of::<f32>() as i32;
            gl.enable_vertex_attrib_array(POSITION_LOCATION);
            gl.vertex_attrib_pointer_f32(POSITION_LOCATION, 2, glow::FLOAT, false, stride, 0);
            gl.enable_vertex_attrib_array(COLOR_LOCATION);
            gl.vertex_attrib_pointer_f32(COLOR_LOCATION, 4, glow::FLOAT, false, stride, 2 * float);
            gl.enable_vertex_attrib_array(TEX_COORD_LOCATION);
            gl.vertex_attrib_pointer_f32(TEX_COORD_LOCATION, 2, glow::FLOAT, false, stride, 6 * float);
            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            (vao, vbo)
        };

        Ok(Self {
            programs,
            composite_program,
            vao,
            vbo,
            targets: Vec::new(),
            destroyed: false,
        })
    }

    /// Renders `draw_list` into the area described by `info`
    pub fn paint(
        &mut self,
        gl: &glow::Context,
        painter: &egui_glow::Painter,
        draw_list: &DrawList,
        info: &egui::PaintCallbackInfo,
    ) {
        if self.destroyed {
            log::warn!("GlRenderer::paint called after destroy");
            return;
        }
        let viewport = info.viewport_in_pixels();
        let clip = info.clip_rect_in_pixels();
        let size = [viewport.width_px, viewport.height_px];
        if size[0] <= 0 || size[1] <= 0 {
            return;
        }

        if let Err(err) = self.ensure_targets(gl, draw_list.surfaces.len(), size) {
            log::error!("Failed to allocate canvas framebuffers: {}", err);
            return;
        }

        unsafe {
            gl.disable(glow::SCISSOR_TEST);
            gl.enable(glow::BLEND);
            gl.bind_vertex_array(Some(self.vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.vbo));
            gl.active_texture(glow::TEXTURE0);

            for (surface, target) in draw_list.surfaces.iter().zip(&self.targets) {
                gl.bind_framebuffer(glow::FRAMEBUFFER, Some(target.framebuffer));
                gl.viewport(0, 0, size[0], size[1]);
                gl.clear_color(0.0, 0.0, 0.0, 0.0);
                gl.clear(glow::COLOR_BUFFER_BIT);
                for command in &surface.commands {
                    self.draw(gl, painter, command);
                }
            }

            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            gl.viewport(viewport.left_px, viewport.from_bottom_px, size[0], size[1]);
            gl.enable(glow::SCISSOR_TEST);
            gl.scissor(clip.left_px, clip.from_bottom_px, clip.width_px, clip.height_px);
            gl.blend_equation(glow::FUNC_ADD);
            gl.blend_func(glow::ONE, glow::ONE_MINUS_SRC_ALPHA);

            let quad = composite_quad();
            gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, bytemuck::cast_slice(&quad), glow::STREAM_DRAW);
            gl.use_program(Some(self.composite_program));
            set_transform(gl, self.composite_program, &Transform::IDENTITY.as_column_major());
            let sampler = gl.get_uniform_location(self.composite_program, "_texture");
            gl.uniform_1_i32(sampler.as_ref(), 0);
            for target in self.targets.iter().take(draw_list.surfaces.len()) {
                gl.bind_texture(glow::TEXTURE_2D, Some(target.texture));
                gl.draw_arrays(glow::TRIANGLE_FAN, 0, quad.len() as i32);
            }

            gl.bind_texture(glow::TEXTURE_2D, None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            gl.bind_vertex_array(None);
            gl.use_program(None);
        }
    }

    unsafe fn draw(&self, gl: &glow::Context, painter: &egui_glow::Painter, command: &DrawCommand) {
        let Some(&program) = self.programs.get(command.shader.index()) else {
            log::warn!("No program compiled for shader {:?}", command.shader);
            return;
        };

        unsafe {
            gl.use_program(Some(program));
            apply_blend_mode(gl, command.blend_mode);
            set_transform(gl, program, &command.transform);

            let texture = command.texture.and_then(|id| {
                let texture = painter.texture(id);
                if texture.is_none() {
                    log::debug!("Texture {:?} is not uploaded yet", id);
                }
                texture
            });
            gl.bind_texture(glow::TEXTURE_2D, texture);
            let sampler = gl.get_uniform_location(program, "_texture");
            gl.uniform_1_i32(sampler.as_ref(), 0);
            let texture_set = gl.get_uniform_location(program, "_texture_set");
            gl.uniform_1_i32(texture_set.as_ref(), i32::from(texture.is_some()));

            for (name, value) in &command.uniforms {
                let Some(location) = gl.get_uniform_location(program, name) else {
                    continue;
                };
                match *value {
                    UniformValue::Float(v) => gl.uniform_1_f32(Some(&location), v),
                    UniformValue::Int(v) => gl.uniform_1_i32(Some(&location), v),
                    UniformValue::Vec2([x, y]) => gl.uniform_2_f32(Some(&location), x, y),
                    UniformValue::Vec4([x, y, z, w]) => gl.uniform_4_f32(Some(&location), x, y, z, w),
                    UniformValue::Mat4(m) => gl.uniform_matrix_4_f32_slice(Some(&location), false, &m),
                }
            }

            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&command.vertices),
                glow::STREAM_DRAW,
            );
            gl.draw_arrays(primitive_mode(command.kind), 0, command.vertices.len() as i32);
        }
    }

    fn ensure_targets(&mut self, gl: &glow::Context, count: usize, size: [i32; 2]) -> Result<(), RenderError> {
        for target in &mut self.targets {
            if target.size != size {
                unsafe { allocate_color_storage(gl, target.texture, size) };
                target.size = size;
            }
        }
        while self.targets.len() < count {
            self.targets.push(create_target(gl, size)?);
        }
        Ok(())
    }

    /// Frees every GL object. Further calls do nothing.
    pub fn destroy(&mut self, gl: &glow::Context) {
        if self.destroyed {
            return;
        }
        unsafe {
            for program in self.programs.drain(..) {
                gl.delete_program(program);
            }
            gl.delete_program(self.composite_program);
            gl.delete_vertex_array(self.vao);
            gl.delete_buffer(self.vbo);
            for target in self.targets.drain(..) {
                gl.delete_framebuffer(target.framebuffer);
                gl.delete_texture(target.texture);
            }
        }
        self.destroyed = true;
        log::info!("Canvas GL resources destroyed");
    }
}

fn compile_program(
    gl: &glow::Context,
    version: &ShaderVersion,
    name: &str,
    fragment_source: &str,
) -> Result<glow::Program, RenderError> {
    let header = version.version_declaration();
    unsafe {
        let program = gl.create_program().map_err(RenderError::Gl)?;
        let mut compiled = Vec::with_capacity(2);
        for (kind, source) in [
            (glow::VERTEX_SHADER, VERTEX_SHADER),
            (glow::FRAGMENT_SHADER, fragment_source),
        ] {
            let shader = match gl.create_shader(kind) {
                Ok(shader) => shader,
                Err(err) => {
                    release_partial_program(
                        program,
                        compiled,
                        |shader| gl.delete_shader(shader),
                        |program| gl.delete_program(program),
                    );
                    return Err(RenderError::Gl(err));
                }
            };
            gl.shader_source(shader, &format!("{}\n{}", header, source));
            gl.compile_shader(shader);
            if !gl.get_shader_compile_status(shader) {
                let log = gl.get_shader_info_log(shader);
                compiled.push(shader);
                release_partial_program(
                    program,
                    compiled,
                    |shader| gl.delete_shader(shader),
                    |program| gl.delete_program(program),
                );
                return Err(RenderError::ShaderCompilation {
                    name: name.to_string(),
                    log,
                });
            }
            gl.attach_shader(program, shader);
            compiled.push(shader);
        }

        gl.bind_attrib_location(program, POSITION_LOCATION, "_vertex_position");
        gl.bind_attrib_location(program, COLOR_LOCATION, "_vertex_color");
        gl.bind_attrib_location(program, TEX_COORD_LOCATION, "_vertex_tex_coord");
        gl.link_program(program);

        for shader in compiled {
            gl.detach_shader(program, shader);
            gl.delete_shader(shader);
        }

        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            return Err(RenderError::ShaderLink {
                name: name.to_string(),
                log,
            });
        }
        Ok(program)
    }
}

/// Frees a program whose build stopped half way, shaders first
fn release_partial_program<P, S>(
    program: P,
    shaders: Vec<S>,
    mut delete_shader: impl FnMut(S),
    delete_program: impl FnOnce(P),
) {
    for shader in shaders {
        delete_shader(shader);
    }
    delete_program(program);
}

fn create_target(gl: &glow::Context, size: [i32; 2]) -> Result<RenderTarget, RenderError> {
    unsafe {
        let texture = gl.create_texture().map_err(RenderError::Gl)?;
        allocate_color_storage(gl, texture, size);

        let framebuffer = gl.create_framebuffer().map_err(RenderError::Gl)?;
        gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
        gl.framebuffer_texture_2d(
            glow::FRAMEBUFFER,
            glow::COLOR_ATTACHMENT0,
            glow::TEXTURE_2D,
            Some(texture),
            0,
        );
        let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
        gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        if status != glow::FRAMEBUFFER_COMPLETE {
            gl.delete_framebuffer(framebuffer);
            gl.delete_texture(texture);
            return Err(RenderError::Gl(format!("Framebuffer incomplete: 0x{:x}", status)));
        }
        Ok(RenderTarget {
            framebuffer,
            texture,
            size,
        })
    }
}

unsafe fn allocate_color_storage(gl: &glow::Context, texture: glow::Texture, [width, height]: [i32; 2]) {
    unsafe {
        gl.bind_texture(glow::TEXTURE_2D, Some(texture));
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            glow::RGBA8 as i32,
            width,
            height,
            0,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            PixelUnpackData::Slice(None),
        );
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::NEAREST as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::NEAREST as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
        gl.bind_texture(glow::TEXTURE_2D, None);
    }
}

unsafe fn set_transform(gl: &glow::Context, program: glow::Program, matrix: &[f32; 16]) {
    unsafe {
        let location = gl.get_uniform_location(program, "_transform");
        gl.uniform_matrix_4_f32_slice(location.as_ref(), false, matrix);
    }
}

unsafe fn apply_blend_mode(gl: &glow::Context, blend_mode: BlendMode) {
    unsafe {
        match blend_mode {
            BlendMode::Normal => {
                gl.blend_equation(glow::FUNC_ADD);
                gl.blend_func(glow::ONE, glow::ONE_MINUS_SRC_ALPHA);
            }
            BlendMode::Add => {
                gl.blend_equation(glow::FUNC_ADD);
                gl.blend_func(glow::ONE, glow::ONE);
            }
            BlendMode::Subtract => {
                gl.blend_equation(glow::FUNC_REVERSE_SUBTRACT);
                gl.blend_func(glow::ONE, glow::ONE);
            }
            BlendMode::ReverseSubtract => {
                gl.blend_equation(glow::FUNC_SUBTRACT);
                gl.blend_func(glow::ONE, glow::ONE);
            }
            BlendMode::Multiply => {
                gl.blend_equation(glow::FUNC_ADD);
                gl.blend_func_separate(glow::DST_COLOR, glow::ZERO, glow::DST_ALPHA, glow::ZERO);
            }
            BlendMode::Min => {
                gl.blend_equation(glow::MIN);
                gl.blend_func(glow::ONE, glow::ONE);
            }
            BlendMode::Max => {
                gl.blend_equation(glow::MAX);
                gl.blend_func(glow::ONE, glow::ONE);
            }
        }
    }
}

fn primitive_mode(kind: PrimitiveKind) -> u32 {
    match kind {
        PrimitiveKind::Points => glow::POINTS,
        PrimitiveKind::Lines => glow::LINES,
        PrimitiveKind::LineStrip => glow::LINE_STRIP,
        PrimitiveKind::LineLoop => glow::LINE_LOOP,
        PrimitiveKind::Triangles => glow::TRIANGLES,
        PrimitiveKind::TriangleFan => glow::TRIANGLE_FAN,
    }
}

/// Full-area quad; framebuffer textures are stored bottom row first
fn composite_quad() -> [Vertex; 4] {
    let vertex = |x: f32, y: f32| Vertex {
        position: [x, y],
        color: [1.0; 4],
        tex_coord: [x, 1.0 - y],
    };
    [vertex(0.0, 0.0), vertex(1.0, 0.0), vertex(1.0, 1.0), vertex(0.0, 1.0)]
}
