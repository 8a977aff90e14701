use anyhow::Result;

use crate::draw_object::TexturedQuad;
use crate::gpu::uniforms::BackgroundUniforms;

use super::{
    attribute_buffer, begin_pass, linear_sampler, texture_bind_group, texture_layout,
    uniform_layout, vertex_buffer, CompiledProgram, ProgramDescriptor, UniformSlot,
    PREMULTIPLIED_OVER,
};

const POSITION: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
const TEXCOORD: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];

/// The photo with every tone and colour adjustment applied. Drawing it
/// clears the target first, so it must come before anything layered on top.
pub(crate) struct BackgroundProgram {
    _program: CompiledProgram,
    pipeline: wgpu::RenderPipeline,
    uniforms: UniformSlot,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

impl BackgroundProgram {
    pub fn new(device: &wgpu::Device) -> Result<Self> {
        let uniform_layout = uniform_layout(device, "background uniforms");
        let texture_layout = texture_layout(device, "background texture");
        let program = CompiledProgram::new(
            device,
            &ProgramDescriptor {
                label: "background program",
                vertex_glsl: VERTEX_GLSL,
                fragment_glsl: FRAGMENT_GLSL,
                bind_group_layouts: &[&uniform_layout, &texture_layout],
            },
        )?;
        let pipeline = program.pipeline(
            device,
            "background pipeline",
            &[attribute_buffer(&POSITION), attribute_buffer(&TEXCOORD)],
            Some(PREMULTIPLIED_OVER),
        );
        let uniforms = UniformSlot::new(
            device,
            &uniform_layout,
            "background uniform buffer",
            std::mem::size_of::<BackgroundUniforms>() as u64,
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

    /// Clears `target` to `clear`, then draws the photo if there is one.
    pub fn draw(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        clear: wgpu::Color,
        photo: Option<(&wgpu::TextureView, &TexturedQuad, &BackgroundUniforms)>,
    ) {
        let Some((photo_view, object, uniforms)) = photo else {
            let _pass = begin_pass(encoder, "background clear pass", target, Some(clear));
            return;
        };
        self.uniforms.upload(device, encoder, uniforms);
        let textures = texture_bind_group(device, &self.texture_layout, photo_view, &self.sampler);
        let positions = vertex_buffer(device, "background positions", &object.positions);
        let texcoords = vertex_buffer(device, "background texcoords", &object.texcoords);

        let mut pass = begin_pass(encoder, "background pass", target, Some(clear));
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

layout(std140, set = 0, binding = 0) uniform BackgroundParams {
    mat3 u_matrix;
    vec4 u_texel;
    vec4 u_tone;
    vec4 u_color;
    vec4 u_finish;
} ubo;

void main() {
    vec3 clip = ubo.u_matrix * vec3(a_position, 1.0);
    v_uv = a_texcoord;
    gl_Position = vec4(clip.xy, 0.0, 1.0);
}
";

/// Adjustment order: enhance, brightness, contrast, saturation, fade,
/// shadows/highlights, warmth, vignette, grain, sharpen.
pub(crate) const FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;

layout(std140, set = 0, binding = 0) uniform BackgroundParams {
    mat3 u_matrix;
    vec4 u_texel;
    vec4 u_tone;
    vec4 u_color;
    vec4 u_finish;
} ubo;

layout(set = 1, binding = 0) uniform texture2D u_photo;
layout(set = 1, binding = 1) uniform sampler u_photo_sampler;

const vec3 LUMA = vec3(0.299, 0.587, 0.114);

vec4 photo_at(vec2 uv) {
    return textureLod(sampler2D(u_photo, u_photo_sampler), uv, 0.0);
}

vec3 saturate3(vec3 rgb) {
    return clamp(rgb, vec3(0.0), vec3(1.0));
}

vec3 apply_enhance(vec3 rgb, float amount) {
    vec3 stretched = saturate3((rgb - vec3(0.05)) / vec3(0.9));
    float luma = dot(rgb, LUMA);
    vec3 lifted = saturate3(stretched + vec3((0.5 - luma) * 0.1));
    return mix(rgb, lifted, vec3(amount));
}

vec3 apply_brightness(vec3 rgb, float amount) {
    vec3 brighter = vec3(1.0) - pow(vec3(1.0) - rgb, vec3(1.0 + amount));
    vec3 darker = pow(rgb, vec3(1.0 - amount));
    return amount >= 0.0 ? brighter : darker;
}

vec3 apply_contrast(vec3 rgb, float amount) {
    return saturate3((rgb - vec3(0.5)) * amount + vec3(0.5));
}

vec3 apply_saturation(vec3 rgb, float amount) {
    vec3 grey = vec3(dot(rgb, LUMA));
    return saturate3(mix(grey, rgb, vec3(amount)));
}

vec3 apply_fade(vec3 rgb, float amount) {
    vec3 lifted = vec3(-0.9772) * rgb * rgb * rgb
        + vec3(1.708) * rgb * rgb
        + vec3(-0.0603) * rgb
        + vec3(0.2878);
    return saturate3(mix(rgb, lifted, vec3(amount)));
}

vec3 apply_shadows_highlights(vec3 rgb, float shadows, float highlights) {
    float luma = dot(rgb, LUMA);
    float shadow = clamp(
        pow(luma, 1.0 / shadows) - 0.76 * pow(luma, 2.0 / shadows) - luma,
        0.0,
        1.0
    );
    float dark = 1.0 - luma;
    float highlight = clamp(
        1.0 - (pow(dark, 1.0 / (2.0 - highlights)) - 0.8 * pow(dark, 2.0 / (2.0 - highlights))) - luma,
        -1.0,
        0.0
    );
    float tone = luma + shadow + highlight;
    return saturate3(rgb * (tone / max(luma, 0.0001)));
}

vec3 apply_warmth(vec3 rgb, float amount) {
    mat3 to_yiq = mat3(
        0.299, 0.596, 0.211,
        0.587, -0.274, -0.523,
        0.114, -0.322, 0.312
    );
    mat3 to_rgb = mat3(
        1.0, 1.0, 1.0,
        0.956, -0.272, -1.106,
        0.621, -0.647, 1.703
    );
    vec3 yiq = to_yiq * rgb;
    vec3 shifted = vec3(yiq.x, clamp(yiq.y + amount * 0.1, -0.5226, 0.5226), yiq.z);
    return saturate3(to_rgb * shifted);
}

vec3 apply_vignette(vec3 rgb, vec2 uv, float amount) {
    float dist = length(uv - vec2(0.5)) * 1.41421356;
    float falloff = smoothstep(0.7 - 0.31, 0.7 + 0.31, dist);
    return rgb * (1.0 - amount * falloff);
}

vec3 apply_grain(vec3 rgb, vec2 coord, float amount) {
    float noise = fract(sin(dot(coord, vec2(12.9898, 78.233))) * 43758.5453) - 0.5;
    return saturate3(rgb + vec3(noise * amount));
}

vec3 apply_sharpen(vec3 rgb, vec2 uv, float amount) {
    vec2 texel = ubo.u_texel.xy;
    vec3 centre = photo_at(uv).rgb;
    vec3 around = photo_at(uv + vec2(texel.x, 0.0)).rgb
        + photo_at(uv - vec2(texel.x, 0.0)).rgb
        + photo_at(uv + vec2(0.0, texel.y)).rgb
        + photo_at(uv - vec2(0.0, texel.y)).rgb;
    vec3 detail = centre * 4.0 - around;
    return saturate3(rgb + detail * amount);
}

void main() {
    vec4 base = photo_at(v_uv);
    vec3 rgb = saturate3(base.rgb);

    rgb = apply_enhance(rgb, ubo.u_tone.x);
    rgb = apply_brightness(rgb, ubo.u_tone.y);
    rgb = apply_contrast(rgb, ubo.u_tone.z);
    rgb = apply_saturation(rgb, ubo.u_tone.w);
    rgb = apply_fade(rgb, ubo.u_color.y);
    rgb = apply_shadows_highlights(rgb, ubo.u_color.w, ubo.u_color.z);
    rgb = apply_warmth(rgb, ubo.u_color.x);
    rgb = apply_vignette(rgb, v_uv, ubo.u_finish.x);
    rgb = apply_grain(rgb, gl_FragCoord.xy, ubo.u_finish.y);
    rgb = apply_sharpen(rgb, v_uv, ubo.u_finish.z);

    out_color = vec4(rgb * base.a, base.a);
}
";
