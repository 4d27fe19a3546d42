//! GLSL ES 3.0 sources for every GPU pass.
//!
//! Analysis kernels mirror [`crate::analysis::kernel`] texel for texel:
//! texture row 0 holds raster row 0, so `+y` in texel space is one row down
//! the image, and stored vectors are flipped to world Y-up on output. Output
//! bytes use the same code as [`crate::raster::encode_component`].

/// Fullscreen triangle from `gl_VertexID`; draw 3 vertices with an empty VAO.
pub const FULLSCREEN_VERTEX: &str = r#"#version 300 es
out vec2 v_uv;
void main() {
    v_uv = vec2((gl_VertexID << 1) & 2, gl_VertexID & 2);
    gl_Position = vec4(v_uv * 2.0 - 1.0, 0.0, 1.0);
}
"#;

/// `max(c·factor − epsilon, 0)` per channel, saturated at 1.
pub const DECAY_FRAGMENT: &str = r#"#version 300 es
precision highp float;
in vec2 v_uv;
uniform sampler2D u_source;
uniform float u_factor;
uniform float u_epsilon;
out vec4 frag_color;
void main() {
    vec3 c = min(texture(u_source, v_uv).rgb, vec3(1.0));
    frag_color = vec4(max(c * u_factor - vec3(u_epsilon), vec3(0.0)), 1.0);
}
"#;

/// Particle points. World origin at the viewport centre, Y up.
pub const PARTICLE_VERTEX: &str = r#"#version 300 es
layout(location = 0) in vec2 a_position;
layout(location = 1) in vec3 a_color;
layout(location = 2) in float a_size;
uniform vec2 u_half_viewport;
uniform float u_particle_size;
out vec3 v_color;
void main() {
    v_color = a_color;
    gl_Position = vec4(a_position / u_half_viewport, 0.0, 1.0);
    gl_PointSize = max(u_particle_size * a_size, 1.5);
}
"#;

/// Soft disc, blended additively by the caller.
pub const PARTICLE_FRAGMENT: &str = r#"#version 300 es
precision highp float;
in vec3 v_color;
uniform float u_opacity;
out vec4 frag_color;
void main() {
    vec2 d = gl_PointCoord * 2.0 - 1.0;
    float falloff = 1.0 - dot(d, d);
    if (falloff <= 0.0) {
        discard;
    }
    frag_color = vec4(v_color * u_opacity * falloff, 1.0);
}
"#;

/// 3×3 frame-difference motion estimate.
pub const MOTION_FRAGMENT: &str = r#"#version 300 es
precision highp float;
in vec2 v_uv;
uniform sampler2D u_current;
uniform sampler2D u_previous;
uniform vec2 u_texel;
uniform float u_threshold;
uniform bool u_mirror;
out vec4 frag_color;

vec2 encode(vec2 v) {
    v = clamp(v, -1.0, 1.0);
    vec2 span = mix(vec2(128.0), vec2(127.0), step(0.0, v));
    return (128.0 + round(v * span)) / 255.0;
}

float lum(sampler2D tex, vec2 uv) {
    vec3 c = texture(tex, uv).rgb;
    return (c.r + c.g + c.b) / 3.0;
}

void main() {
    vec2 base = u_mirror ? vec2(1.0 - v_uv.x, v_uv.y) : v_uv;
    float sx = u_mirror ? -1.0 : 1.0;
    vec2 m = vec2(0.0);
    for (int j = -1; j <= 1; j++) {
        for (int i = -1; i <= 1; i++) {
            vec2 uv = base + vec2(float(i) * sx, float(j)) * u_texel;
            float diff = lum(u_current, uv) - lum(u_previous, uv);
            m += vec2(float(i), float(j)) * diff;
        }
    }
    m *= 0.5;
    if (length(m) < u_threshold) {
        m = vec2(0.0);
    }
    m.y = -m.y;
    frag_color = vec4(encode(m), 0.0, 1.0);
}
"#;

/// Sobel gradient with neighbours `u_edge_width` texels apart.
pub const SOBEL_FRAGMENT: &str = r#"#version 300 es
precision highp float;
in vec2 v_uv;
uniform sampler2D u_current;
uniform vec2 u_texel;
uniform float u_edge_width;
uniform float u_threshold;
uniform bool u_mirror;
out vec4 frag_color;

vec2 encode(vec2 v) {
    v = clamp(v, -1.0, 1.0);
    vec2 span = mix(vec2(128.0), vec2(127.0), step(0.0, v));
    return (128.0 + round(v * span)) / 255.0;
}

float lum(vec2 uv) {
    vec3 c = texture(u_current, uv).rgb;
    return (c.r + c.g + c.b) / 3.0;
}

void main() {
    vec2 base = u_mirror ? vec2(1.0 - v_uv.x, v_uv.y) : v_uv;
    vec2 o = u_texel * u_edge_width;
    float tl = lum(base + vec2(-o.x, -o.y));
    float t  = lum(base + vec2( 0.0, -o.y));
    float tr = lum(base + vec2( o.x, -o.y));
    float l  = lum(base + vec2(-o.x,  0.0));
    float r  = lum(base + vec2( o.x,  0.0));
    float bl = lum(base + vec2(-o.x,  o.y));
    float b  = lum(base + vec2( 0.0,  o.y));
    float br = lum(base + vec2( o.x,  o.y));

    vec2 g = vec2((tr + 2.0 * r + br) - (tl + 2.0 * l + bl),
                  (bl + 2.0 * b + br) - (tl + 2.0 * t + tr)) / 4.0;
    if (u_mirror) {
        g.x = -g.x;
    }
    if (length(g) < u_threshold) {
        g = vec2(0.0);
    }
    g.y = -g.y;
    frag_color = vec4(encode(g), 0.0, 1.0);
}
"#;
