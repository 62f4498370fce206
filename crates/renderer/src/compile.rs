use std::borrow::Cow;

use anyhow::{Context, Result};
use wgpu::naga::ShaderStage;

/// Compiles one of the in-repo GLSL stages into a shader module.
///
/// Compilation failures are fatal for the mounting engine; the label names
/// the failing stage so the diagnostic locates it without guesswork.
pub(crate) fn compile_glsl(
    device: &wgpu::Device,
    label: &'static str,
    source: &'static str,
    stage: ShaderStage,
) -> Result<wgpu::ShaderModule> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(source),
            stage,
            defines: &[],
        },
    });
    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        anyhow::bail!("failed to compile shader stage '{label}': {error}");
    }
    Ok(module)
}

/// Compiles the static full-screen triangle vertex shader.
pub(crate) fn compile_fullscreen_vertex(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    compile_glsl(
        device,
        "fullscreen triangle vertex",
        FULLSCREEN_VERTEX_GLSL,
        ShaderStage::Vertex,
    )
    .context("failed to compile the fullscreen vertex stage")
}

/// Minimal full-screen triangle vertex shader.
pub(crate) const FULLSCREEN_VERTEX_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = pos * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

/// Flow-field fragment shader.
///
/// The uniform block layout must match `FieldUniforms` in
/// `gpu/uniforms.rs`. Per fragment: center the UV, apply the pointer
/// parallax, rotate, compress radially for faux depth, then accumulate up
/// to eight warped color blobs while tracking the strongest weight as
/// coverage. A hash dither breaks up banding in the dark gradients.
pub(crate) const FIELD_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;

layout(std140, set = 0, binding = 0) uniform FieldParams {
    vec4 resolution;  // width, height, aspect, time mirror
    vec4 pointer;     // x, y in [-1, 1]
    vec4 motion;      // time, rotation angle, scroll depth, flash mix
    vec4 shape;       // scale, frequency, warp strength, noise amount
    vec4 style;       // mouse influence, parallax, color count, coverage alpha
    vec4 colors[8];
} params;

float dither_hash(vec2 seed, float t) {
    return fract(sin(dot(seed, vec2(12.9898, 78.233)) + t * 0.131) * 43758.5453);
}

void main() {
    vec2 centered = v_uv * 2.0 - 1.0;
    centered.x *= params.resolution.z;

    vec2 p = centered + params.pointer.xy * params.style.y;

    float angle = params.motion.y;
    mat2 spin = mat2(cos(angle), -sin(angle), sin(angle), cos(angle));
    p = spin * p;

    // Radial compression fakes a view down a deep tube; the scroll depth
    // pushes the zoom further in as the grid phase progresses.
    float compression = 1.0 / (0.5 + 0.2 * dot(p, p));
    p *= compression * params.shape.x * (1.0 + params.motion.z * 0.04);

    float t = params.motion.x;
    int active = int(params.style.z + 0.5);

    vec2 q = p;
    vec3 accum = vec3(0.0);
    float coverage = 0.0;
    for (int i = 0; i < 8; i++) {
        if (i >= active) {
            break;
        }
        float fi = float(i);
        q += params.shape.z * vec2(
            sin(q.y * params.shape.y + t + fi * 2.399),
            cos(q.x * params.shape.y - t * 1.3 + fi * 1.711));
        q += params.pointer.xy * params.style.x * 0.15;
        float weight = exp(-dot(q, q) * (1.2 + fi * 0.35));
        accum += params.colors[i].rgb * weight;
        coverage = max(coverage, weight);
    }

    vec3 rgb = clamp(accum, 0.0, 1.0);
    rgb += (dither_hash(gl_FragCoord.xy, t) - 0.5) * params.shape.w;
    rgb = clamp(rgb, 0.0, 1.0);
    rgb = mix(rgb, vec3(1.0), params.motion.w);

    float alpha = mix(1.0, coverage, params.style.w);
    out_color = vec4(rgb, alpha);
}
";

/// Tube vertex shader; positions arrive in tunnel space.
pub(crate) const TUNNEL_VERTEX_GLSL: &str = r"#version 450
layout(location = 0) in vec3 position;
layout(location = 1) in vec2 uv;
layout(location = 0) out vec2 v_uv;

layout(std140, set = 0, binding = 0) uniform TunnelParams {
    mat4 view_proj;
    vec4 scroll;  // repeat x, v offset, flash mix, shatter progress
} params;

void main() {
    v_uv = uv;
    gl_Position = params.view_proj * vec4(position, 1.0);
}
";

/// Tube fragment shader: mirrored-repeat star texture with hyperdrive
/// compression applied through the horizontal repeat factor.
pub(crate) const TUNNEL_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;

layout(std140, set = 0, binding = 0) uniform TunnelParams {
    mat4 view_proj;
    vec4 scroll;
} params;

layout(set = 0, binding = 1) uniform texture2D star_texture;
layout(set = 0, binding = 2) uniform sampler star_sampler;

void main() {
    vec2 tiled = vec2(v_uv.x * params.scroll.x, v_uv.y - params.scroll.y);
    vec3 rgb = texture(sampler2D(star_texture, star_sampler), tiled).rgb;
    // The deep end of the tube fades toward black so the entry reads as the
    // bright horizon the camera is flying toward.
    float fade = 1.0 - smoothstep(0.55, 1.0, v_uv.y);
    out_color = vec4(rgb * fade, 1.0);
}
";

/// Shard vertex shader: expands per-instance rectangles in NDC.
///
/// Six vertices per instance form two triangles; the instance stream
/// supplies center, half extent, rotation, and the UV rectangle of the
/// scene capture that this shard reassembles.
pub(crate) const SHARD_VERTEX_GLSL: &str = r"#version 450
layout(location = 0) in vec2 inst_center;
layout(location = 1) in vec2 inst_half;
layout(location = 2) in vec2 inst_spin;  // rotation, unused
layout(location = 3) in vec4 inst_uv_rect;
layout(location = 0) out vec2 v_uv;

const vec2 corners[6] = vec2[6](
    vec2(-1.0, -1.0), vec2(1.0, -1.0), vec2(1.0, 1.0),
    vec2(-1.0, -1.0), vec2(1.0, 1.0), vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 corner = corners[vertex_index];
    float angle = inst_spin.x;
    mat2 rot = mat2(cos(angle), -sin(angle), sin(angle), cos(angle));
    vec2 ndc = inst_center + rot * (corner * inst_half);
    vec2 unit = corner * 0.5 + vec2(0.5, 0.5);
    v_uv = mix(inst_uv_rect.xy, inst_uv_rect.zw, vec2(unit.x, 1.0 - unit.y));
    gl_Position = vec4(ndc, 0.0, 1.0);
}
";

/// Shard fragment shader: samples the captured tunnel frame and applies
/// the flash whiteout on top.
pub(crate) const SHARD_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;

layout(std140, set = 0, binding = 0) uniform TunnelParams {
    mat4 view_proj;
    vec4 scroll;
} params;

layout(set = 0, binding = 1) uniform texture2D scene_texture;
layout(set = 0, binding = 2) uniform sampler scene_sampler;

void main() {
    vec3 rgb = texture(sampler2D(scene_texture, scene_sampler), v_uv).rgb;
    rgb = mix(rgb, vec3(1.0), params.scroll.z);
    out_color = vec4(rgb, 1.0);
}
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_fragment_caps_the_color_loop_at_eight() {
        assert!(FIELD_FRAGMENT_GLSL.contains("vec4 colors[8]"));
        assert!(FIELD_FRAGMENT_GLSL.contains("i < 8"));
        assert!(FIELD_FRAGMENT_GLSL.contains("i >= active"));
    }

    #[test]
    fn tunnel_stages_share_one_uniform_block() {
        for source in [
            TUNNEL_VERTEX_GLSL,
            TUNNEL_FRAGMENT_GLSL,
            SHARD_FRAGMENT_GLSL,
        ] {
            assert!(source.contains("uniform TunnelParams"));
            assert!(source.contains("mat4 view_proj"));
        }
    }

    #[test]
    fn every_stage_declares_a_main() {
        for source in [
            FULLSCREEN_VERTEX_GLSL,
            FIELD_FRAGMENT_GLSL,
            TUNNEL_VERTEX_GLSL,
            TUNNEL_FRAGMENT_GLSL,
            SHARD_VERTEX_GLSL,
            SHARD_FRAGMENT_GLSL,
        ] {
            assert!(source.contains("void main()"));
        }
    }
}
