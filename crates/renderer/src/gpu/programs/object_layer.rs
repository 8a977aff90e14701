use anyhow::Result;

use crate::draw_object::TexturedQuad;
use crate::gpu::uniforms::LayerUniforms;

use super::{
    attribute_buffer, begin_pass, linear_sampler, texture_bind_group, texture_layout,
    uniform_layout, vertex_buffer, CompiledProgram, ProgramDescriptor, UniformSlot,
    PREMULTIPLIED_OVER,
};

const POSITION: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
const TEXCOORD: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];

/// Text and sticker layers, each a textured quad composited over whatever
/// the target already holds.
pub(crate) struct ObjectLayerProgram {
    _program: CompiledProgram,
    pipeline: wgpu::RenderPipeline,
    uniforms: UniformSlot,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

impl ObjectLayerProgram {
    pub fn new(device: &wgpu::Device) -> Result<Self> {
        let uniform_layout = uniform_layout(device, "layer uniforms");
        let texture_layout = texture_layout(device, "layer texture");
        let program = CompiledProgram::new(
            device,
            &ProgramDescriptor {
                label: "layer program",
                vertex_glsl: VERTEX_GLSL,
                fragment_glsl: FRAGMENT_GLSL,
                bind_group_layouts: &[&uniform_layout, &texture_layout],
            },
        )?;
        let pipeline = program.pipeline(
            device,
            "layer pipeline",
            &[attribute_buffer(&POSITION), attribute_buffer(&TEXCOORD)],
            Some(PREMULTIPLIED_OVER),
        );
        let uniforms = UniformSlot::new(
            device,
            &uniform_layout,
            "layer uniform buffer",
            std::mem::size_of::<LayerUniforms>() as u64,
        );
        Ok(Self {
            _program: program,
            pipeline,
            uniforms,
            texture_layout,
            sampler: linear_sampler(device),
        })
    }

    fn link(&self, pass: &mut wgpu::RenderPass<'_>, textures: &wgpu::BindGroup) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.uniforms.bind_group, &[]);
        pass.set_bind_group(1, textures, &[]);
    }

    pub fn draw(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        texture: &wgpu::TextureView,
        object: &TexturedQuad,
        uniforms: &LayerUniforms,
    ) {
        self.uniforms.upload(device, encoder, uniforms);
        let textures = texture_bind_group(device, &self.texture_layout, texture, &self.sampler);
        let positions = vertex_buffer(device, "layer positions", &object.positions);
        let texcoords = vertex_buffer(device, "layer texcoords", &object.texcoords);

        let mut pass = begin_pass(encoder, "layer pass", target, None);
        self.link(&mut pass, &textures);
        pass.set_vertex_buffer(0, positions.slice(..));
        pass.set_vertex_buffer(1, texcoords.slice(..));
        pass.draw(0..object.vertex_count(), 0..1);
    }

    pub fn destroy(&self) {
        self.uniforms.destroy();
    }
}

pub(crate) const VERTEX_GLSL: &str = r"#version 450
layout(location = 0) in vec2 a_position;
layout(location = 1) in vec2 a_texcoord;
layout(location = 0) out vec2 v_uv;

layout(std140, set = 0, binding = 0) uniform LayerParams {
    mat3 u_matrix;
    vec4 u_params;
} ubo;

void main() {
    vec3 clip = ubo.u_matrix * vec3(a_position, 1.0);
    v_uv = a_texcoord;
    gl_Position = vec4(clip.xy, 0.0, 1.0);
}
";

pub(crate) const FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;

layout(std140, set = 0, binding = 0) uniform LayerParams {
    mat3 u_matrix;
    vec4 u_params;
} ubo;

layout(set = 1, binding = 0) uniform texture2D u_layer;
layout(set = 1, binding = 1) uniform sampler u_layer_sampler;

void main() {
    vec4 texel = textureLod(sampler2D(u_layer, u_layer_sampler), v_uv, 0.0);
    float alpha = texel.a * ubo.u_params.x;
    out_color = vec4(texel.rgb * alpha, alpha);
}
";
