//! Uploads YUV planes into three luminance textures and draws them through the
//! conversion program. Every method must run on the thread the GL context is
//! current on.

use glow::HasContext;
use tracing::{debug, info};

use crate::config::ChromaFilter;
use crate::error::Error;
use crate::frame::{Plane, YuvFrame};
use crate::shader::{
    fragment_shader, POSITION_ATTRIB, QUAD, QUAD_STRIDE, QUAD_VERTICES, SAMPLERS,
    TEX_COORD_ATTRIB, VERTEX_SHADER,
};
use crate::upload::pack_plane;

impl ChromaFilter {
    pub fn gl_filter(self) -> i32 {
        match self {
            ChromaFilter::Linear => glow::LINEAR as i32,
            ChromaFilter::Nearest => glow::NEAREST as i32,
        }
    }
}

struct TextureSet {
    width: u32,
    height: u32,
    planes: [glow::Texture; 3],
}

pub struct YuvPainter {
    program: glow::Program,
    vbo: glow::Buffer,
    position: u32,
    tex_coord: u32,
    samplers: [Option<glow::UniformLocation>; 3],
    textures: Option<TextureSet>,
    chroma_filter: ChromaFilter,
    scratch: Vec<u8>,
}

impl YuvPainter {
    /// Compiles the conversion program and uploads the quad. Textures are
    /// created on the first frame, once its size is known.
    ///
    /// # Safety
    /// A GL context must be current on the calling thread.
    pub unsafe fn new(gl: &glow::Context, chroma_filter: ChromaFilter) -> Result<Self, Error> {
        unsafe {
            let program = link_program(gl, VERTEX_SHADER, &fragment_shader())?;

            let attribs = (
                gl.get_attrib_location(program, POSITION_ATTRIB),
                gl.get_attrib_location(program, TEX_COORD_ATTRIB),
            );
            let (Some(position), Some(tex_coord)) = attribs else {
                gl.delete_program(program);
                return Err(Error::Gl("quad attributes missing from program".into()));
            };
            let samplers = SAMPLERS.map(|name| gl.get_uniform_location(program, name));

            let vbo = match gl.create_buffer() {
                Ok(vbo) => vbo,
                Err(e) => {
                    gl.delete_program(program);
                    return Err(Error::Gl(e));
                }
            };
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&QUAD),
                glow::STATIC_DRAW,
            );

            // packed rows of any width
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);

            debug!(?chroma_filter, "YUV program ready");
            Ok(Self {
                program,
                vbo,
                position,
                tex_coord,
                samplers,
                textures: None,
                chroma_filter,
                scratch: Vec::new(),
            })
        }
    }

    /// Uploads `frame` and draws it over the whole `viewport`.
    ///
    /// # Safety
    /// The context this painter was created with must be current.
    pub unsafe fn paint(
        &mut self,
        gl: &glow::Context,
        frame: &dyn YuvFrame,
        viewport: (u32, u32),
    ) -> Result<(), Error> {
        unsafe {
            let (width, height) = (frame.width(), frame.height());
            let stale = self
                .textures
                .as_ref()
                .is_none_or(|set| set.width != width || set.height != height);
            if stale {
                if let Some(old) = self.textures.take() {
                    delete_textures(gl, &old);
                }
                self.textures = Some(create_textures(gl, width, height, self.chroma_filter)?);
                info!(width, height, "Allocated YUV textures");
            }
            let Some(set) = self.textures.as_ref() else {
                return Err(Error::Gl("texture set missing".into()));
            };

            for plane in Plane::ALL {
                let view = frame.plane(plane)?;
                let pixels = pack_plane(&view, &mut self.scratch)?;
                gl.bind_texture(glow::TEXTURE_2D, Some(set.planes[plane.index()]));
                gl.tex_sub_image_2d(
                    glow::TEXTURE_2D,
                    0,
                    0,
                    0,
                    view.width as i32,
                    view.height as i32,
                    glow::LUMINANCE,
                    glow::UNSIGNED_BYTE,
                    glow::PixelUnpackData::Slice(pixels),
                );
            }

            gl.viewport(0, 0, viewport.0 as i32, viewport.1 as i32);
            gl.clear_color(0.0, 0.0, 0.0, 1.0);
            gl.clear(glow::COLOR_BUFFER_BIT);

            gl.use_program(Some(self.program));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.vbo));
            gl.vertex_attrib_pointer_f32(self.position, 2, glow::FLOAT, false, QUAD_STRIDE, 0);
            gl.enable_vertex_attrib_array(self.position);
            gl.vertex_attrib_pointer_f32(
                self.tex_coord,
                2,
                glow::FLOAT,
                false,
                QUAD_STRIDE,
                2 * std::mem::size_of::<f32>() as i32,
            );
            gl.enable_vertex_attrib_array(self.tex_coord);

            for (unit, (texture, sampler)) in set.planes.iter().zip(&self.samplers).enumerate() {
                gl.active_texture(glow::TEXTURE0 + unit as u32);
                gl.bind_texture(glow::TEXTURE_2D, Some(*texture));
                gl.uniform_1_i32(sampler.as_ref(), unit as i32);
            }

            gl.draw_arrays(glow::TRIANGLE_STRIP, 0, QUAD_VERTICES);
            Ok(())
        }
    }

    /// # Safety
    /// The context this painter was created with must be current.
    pub unsafe fn destroy(mut self, gl: &glow::Context) {
        unsafe {
            if let Some(set) = self.textures.take() {
                delete_textures(gl, &set);
            }
            gl.delete_buffer(self.vbo);
            gl.delete_program(self.program);
        }
    }
}

unsafe fn compile_shader(gl: &glow::Context, kind: u32, source: &str) -> Result<glow::Shader, Error> {
    unsafe {
        let shader = gl.create_shader(kind).map_err(Error::Gl)?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);
        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(Error::Gl(format!("shader compile failed: {log}")));
        }
        Ok(shader)
    }
}

unsafe fn link_program(gl: &glow::Context, vertex: &str, fragment: &str) -> Result<glow::Program, Error> {
    unsafe {
        let vs = compile_shader(gl, glow::VERTEX_SHADER, vertex)?;
        let fs = match compile_shader(gl, glow::FRAGMENT_SHADER, fragment) {
            Ok(fs) => fs,
            Err(e) => {
                gl.delete_shader(vs);
                return Err(e);
            }
        };

        let linked = gl.create_program().map_err(Error::Gl).and_then(|program| {
            gl.attach_shader(program, vs);
            gl.attach_shader(program, fs);
            gl.link_program(program);
            gl.detach_shader(program, vs);
            gl.detach_shader(program, fs);
            if gl.get_program_link_status(program) {
                Ok(program)
            } else {
                let log = gl.get_program_info_log(program);
                gl.delete_program(program);
                Err(Error::Gl(format!("program link failed: {log}")))
            }
        });

        gl.delete_shader(vs);
        gl.delete_shader(fs);
        linked
    }
}

unsafe fn create_textures(
    gl: &glow::Context,
    width: u32,
    height: u32,
    chroma_filter: ChromaFilter,
) -> Result<TextureSet, Error> {
    unsafe {
        let mut planes = Vec::with_capacity(3);
        for plane in Plane::ALL {
            let texture = match gl.create_texture() {
                Ok(texture) => texture,
                Err(e) => {
                    for texture in planes {
                        gl.delete_texture(texture);
                    }
                    return Err(Error::Gl(e));
                }
            };
            let (w, h) = plane.dimensions(width, height);
            let filter = match plane {
                Plane::Y => glow::LINEAR as i32,
                Plane::U | Plane::V => chroma_filter.gl_filter(),
            };
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, filter);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, filter);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::LUMINANCE as i32,
                w as i32,
                h as i32,
                0,
                glow::LUMINANCE,
                glow::UNSIGNED_BYTE,
                None,
            );
            planes.push(texture);
        }
        let planes: [glow::Texture; 3] = planes
            .try_into()
            .map_err(|_| Error::Gl("expected three plane textures".into()))?;
        Ok(TextureSet {
            width,
            height,
            planes,
        })
    }
}

unsafe fn delete_textures(gl: &glow::Context, set: &TextureSet) {
    for texture in set.planes {
        unsafe { gl.delete_texture(texture) };
    }
}
