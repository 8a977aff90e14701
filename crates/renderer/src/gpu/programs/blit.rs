use anyhow::Result;

use crate::draw_object::TexturedQuad;

use super::{
    attribute_buffer, begin_pass, linear_sampler, texture_bind_group, texture_layout,
    vertex_buffer, CompiledProgram, ProgramDescriptor, PREMULTIPLIED_OVER,
};

const POSITION: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
const TEXCOORD: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];

/// Composites an offscreen framebuffer over the target, texel for texel.
pub(crate) struct BlitProgram {
    _program: CompiledProgram,
    pipeline: wgpu::RenderPipeline,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

impl BlitProgram {
    pub fn new(device: &wgpu::Device) -> Result<Self> {
        let texture_layout = texture_layout(device, "blit texture");
        let program = CompiledProgram::new(
            device,
            &ProgramDescriptor {
                label: "blit program",
                vertex_glsl: VERTEX_GLSL,
                fragment_glsl: FRAGMENT_GLSL,
                bind_group_layouts: &[&texture_layout],
            },
        )?;
        let pipeline = program.pipeline(
            device,
            "blit pipeline",
            &[attribute_buffer(&POSITION), attribute_buffer(&TEXCOORD)],
            Some(PREMULTIPLIED_OVER),
        );
        Ok(Self {
            _program: program,
            pipeline,
            texture_layout,
            sampler: linear_sampler(device),
        })
    }

    fn link(&self, pass: &mut wgpu::RenderPass<'_>, textures: &wgpu::BindGroup) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, textures, &[]);
    }

    /// `object` is expected in clip space, see `draw_object::fullscreen_object`.
    pub fn draw(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        source: &wgpu::TextureView,
        object: &TexturedQuad,
    ) {
        let textures = texture_bind_group(device, &self.texture_layout, source, &self.sampler);
        let positions = vertex_buffer(device, "blit positions", &object.positions);
        let texcoords = vertex_buffer(device, "blit texcoords", &object.texcoords);

        let mut pass = begin_pass(encoder, "blit pass", target, None);
        self.link(&mut pass, &textures);
        pass.set_vertex_buffer(0, positions.slice(..));
        pass.set_vertex_buffer(1, texcoords.slice(..));
        pass.draw(0..object.vertex_count(), 0..1);
    }
}

pub(crate) const VERTEX_GLSL: &str = r"#version 450
layout(location = 0) in vec2 a_position;
layout(location = 1) in vec2 a_texcoord;
layout(location = 0) out vec2 v_uv;

void main() {
    v_uv = a_texcoord;
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

pub(crate) const FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;

layout(set = 0, binding = 0) uniform texture2D u_source;
layout(set = 0, binding = 1) uniform sampler u_source_sampler;

void main() {
    out_color = textureLod(sampler2D(u_source, u_source_sampler), v_uv, 0.0);
}
";
