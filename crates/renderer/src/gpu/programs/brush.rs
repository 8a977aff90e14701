use anyhow::Result;

use crate::draw_object::{BrushStrokes, SegmentBlend};
use crate::gpu::uniforms::BrushUniforms;

use super::{
    attribute_buffer, begin_pass, linear_sampler, texture_bind_group, texture_layout,
    uniform_layout, vertex_buffer, CompiledProgram, ProgramDescriptor, UniformSlot,
    PREMULTIPLIED_OVER,
};

const POSITION: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
const CORNER: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];
const PROPERTIES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32x3];
const COLOR: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![3 => Float32x4];
const TEXCOORD: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![4 => Float32x2];

/// Flattens every brush touch into the stroke framebuffer.
///
/// Paint and blur touches blend over earlier ones; eraser touches use a
/// pipeline with blending disabled so they overwrite the framebuffer.
pub(crate) struct BrushProgram {
    _program: CompiledProgram,
    over: wgpu::RenderPipeline,
    replace: wgpu::RenderPipeline,
    uniforms: UniformSlot,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

impl BrushProgram {
    pub fn new(device: &wgpu::Device) -> Result<Self> {
        let uniform_layout = uniform_layout(device, "brush uniforms");
        let texture_layout = texture_layout(device, "brush background texture");
        let program = CompiledProgram::new(
            device,
            &ProgramDescriptor {
                label: "brush program",
                vertex_glsl: VERTEX_GLSL,
                fragment_glsl: FRAGMENT_GLSL,
                bind_group_layouts: &[&uniform_layout, &texture_layout],
            },
        )?;
        let buffers = [
            attribute_buffer(&POSITION),
            attribute_buffer(&CORNER),
            attribute_buffer(&PROPERTIES),
            attribute_buffer(&COLOR),
            attribute_buffer(&TEXCOORD),
        ];
        let over = program.pipeline(device, "brush over pipeline", &buffers, Some(PREMULTIPLIED_OVER));
        let replace = program.pipeline(device, "brush replace pipeline", &buffers, None);
        let uniforms = UniformSlot::new(
            device,
            &uniform_layout,
            "brush uniform buffer",
            std::mem::size_of::<BrushUniforms>() as u64,
        );
        Ok(Self {
            _program: program,
            over,
            replace,
            uniforms,
            texture_layout,
            sampler: linear_sampler(device),
        })
    }

    fn link(&self, pass: &mut wgpu::RenderPass<'_>, blend: SegmentBlend, textures: &wgpu::BindGroup) {
        let pipeline = match blend {
            SegmentBlend::Over => &self.over,
            SegmentBlend::Replace => &self.replace,
        };
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.uniforms.bind_group, &[]);
        pass.set_bind_group(1, textures, &[]);
    }

    /// Clears `framebuffer` and draws every segment of `strokes` into it.
    /// `background` is the photo sampled by blur touches.
    pub fn draw(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        framebuffer: &wgpu::TextureView,
        background: &wgpu::TextureView,
        strokes: &BrushStrokes,
        uniforms: &BrushUniforms,
    ) {
        self.uniforms.upload(device, encoder, uniforms);
        let textures = texture_bind_group(device, &self.texture_layout, background, &self.sampler);
        let positions = vertex_buffer(device, "brush positions", &strokes.positions);
        let corners = vertex_buffer(device, "brush corners", &strokes.corners);
        let properties = vertex_buffer(device, "brush properties", &strokes.properties);
        let colors = vertex_buffer(device, "brush colors", &strokes.colors);
        let texcoords = vertex_buffer(device, "brush texcoords", &strokes.texcoords);

        let mut pass = begin_pass(encoder, "brush pass", framebuffer, Some(wgpu::Color::TRANSPARENT));
        for segment in &strokes.segments {
            self.link(&mut pass, segment.blend, &textures);
            pass.set_vertex_buffer(0, positions.slice(..));
            pass.set_vertex_buffer(1, corners.slice(..));
            pass.set_vertex_buffer(2, properties.slice(..));
            pass.set_vertex_buffer(3, colors.slice(..));
            pass.set_vertex_buffer(4, texcoords.slice(..));
            pass.draw(segment.vertices.clone(), 0..1);
        }
    }

    pub fn destroy(&self) {
        self.uniforms.destroy();
    }
}

pub(crate) const VERTEX_GLSL: &str = r"#version 450
layout(location = 0) in vec2 a_position;
layout(location = 1) in vec2 a_corner;
layout(location = 2) in vec3 a_properties;
layout(location = 3) in vec4 a_color;
layout(location = 4) in vec2 a_texcoord;

layout(location = 0) out vec2 v_corner;
layout(location = 1) out vec3 v_properties;
layout(location = 2) out vec4 v_color;
layout(location = 3) out vec2 v_uv;

layout(std140, set = 0, binding = 0) uniform BrushParams {
    mat3 u_matrix;
    vec4 u_blur;
} ubo;

void main() {
    vec3 clip = ubo.u_matrix * vec3(a_position, 1.0);
    v_corner = a_corner;
    v_properties = a_properties;
    v_color = a_color;
    v_uv = a_texcoord;
    gl_Position = vec4(clip.xy, 0.0, 1.0);
}
";

/// Style index in `v_properties.y`: 0 paint, 1 blur, 2 eraser.
pub(crate) const FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_corner;
layout(location = 1) in vec3 v_properties;
layout(location = 2) in vec4 v_color;
layout(location = 3) in vec2 v_uv;

layout(location = 0) out vec4 out_color;

layout(std140, set = 0, binding = 0) uniform BrushParams {
    mat3 u_matrix;
    vec4 u_blur;
} ubo;

layout(set = 1, binding = 0) uniform texture2D u_background;
layout(set = 1, binding = 1) uniform sampler u_background_sampler;

vec3 blurred_background(vec2 uv) {
    vec3 total = vec3(0.0);
    for (int i = 0; i < 15; i++) {
        float step_index = float(i);
        float angle = step_index * 2.39996323;
        float radius = sqrt((step_index + 0.5) / 15.0) * ubo.u_blur.z;
        vec2 offset = vec2(cos(angle), sin(angle)) * radius * ubo.u_blur.xy;
        total += textureLod(sampler2D(u_background, u_background_sampler), uv + offset, 0.0).rgb;
    }
    return total / 15.0;
}

void main() {
    float dist = length(v_corner);
    if (dist > 1.0) {
        discard;
    }
    float radius = max(v_properties.x * 0.5, 1.0);
    float feather = clamp(v_properties.z / radius, 0.001, 1.0);
    float edge = 1.0 - smoothstep(1.0 - feather, 1.0, dist);
    float style = v_properties.y;

    vec3 blurred = blurred_background(v_uv);
    vec3 rgb = style > 0.5 ? blurred : v_color.rgb;
    float alpha = style > 1.5 ? 0.0 : v_color.a * edge;
    out_color = vec4(rgb * alpha, alpha);
}
";
