//! GLSL 3.30 core sources for the built-in scenes.

/// Textured quad: position, colour and uv attributes, one combined
/// `transform` matrix.
pub const QUAD_VERTEX: &str = r#"#version 330 core
layout (location = 0) in vec3 aPos;
layout (location = 1) in vec3 aColor;
layout (location = 2) in vec2 aTexCoord;

uniform mat4 transform;

out vec3 vColor;
out vec2 vTexCoord;

void main() {
    gl_Position = transform * vec4(aPos, 1.0);
    vColor = aColor;
    vTexCoord = aTexCoord;
}
"#;

/// Mixes two textures and tints by the vertex colour scaled with
/// `ourColor`.
pub const QUAD_FRAGMENT: &str = r#"#version 330 core
in vec3 vColor;
in vec2 vTexCoord;

uniform float ourColor;
uniform sampler2D ourTexture1;
uniform sampler2D ourTexture2;

out vec4 FragColor;

void main() {
    vec4 base = mix(texture(ourTexture1, vTexCoord), texture(ourTexture2, vTexCoord), 0.2);
    FragColor = base * vec4(mix(vec3(1.0), vColor, ourColor), 1.0);
}
"#;

/// Shared by every mesh scene. Matches the [`Vertex`](learngl_core::Vertex)
/// layout: position, normal, uv.
pub const MESH_VERTEX: &str = r#"#version 330 core
layout (location = 0) in vec3 aPos;
layout (location = 1) in vec3 aNormal;
layout (location = 2) in vec2 aTexCoord;

uniform mat4 model;
uniform mat4 view;
uniform mat4 projection;

out vec3 vWorldPos;
out vec3 vNormal;
out vec2 vTexCoord;

void main() {
    vec4 world = model * vec4(aPos, 1.0);
    vWorldPos = world.xyz;
    vNormal = mat3(transpose(inverse(model))) * aNormal;
    vTexCoord = aTexCoord;
    gl_Position = projection * view * world;
}
"#;

/// Two diffuse textures blended, as in the coordinate-systems lesson.
pub const CUBES_FRAGMENT: &str = r#"#version 330 core
in vec3 vWorldPos;
in vec3 vNormal;
in vec2 vTexCoord;

uniform sampler2D texture_diffuse1;
uniform sampler2D texture_diffuse2;

out vec4 FragColor;

void main() {
    vec4 first = texture(texture_diffuse1, vTexCoord);
    vec4 second = texture(texture_diffuse2, vTexCoord);
    FragColor = mix(first, second, 0.2);
}
"#;

/// Phong shading with one point light. Uses `texture_diffuse1` when
/// `useTexture` is set, otherwise `objectColor`.
pub const LIT_FRAGMENT: &str = r#"#version 330 core
in vec3 vWorldPos;
in vec3 vNormal;
in vec2 vTexCoord;

uniform sampler2D texture_diffuse1;
uniform bool useTexture;
uniform vec3 objectColor;
uniform vec3 lightPos;
uniform vec3 lightColor;
uniform vec3 viewPos;

out vec4 FragColor;

void main() {
    vec3 base = useTexture ? texture(texture_diffuse1, vTexCoord).rgb : objectColor;
    vec3 n = normalize(vNormal);
    vec3 toLight = normalize(lightPos - vWorldPos);
    vec3 toView = normalize(viewPos - vWorldPos);

    vec3 ambient = 0.1 * lightColor;
    vec3 diffuse = max(dot(n, toLight), 0.0) * lightColor;
    vec3 specular = 0.5 * pow(max(dot(toView, reflect(-toLight, n)), 0.0), 32.0) * lightColor;
    FragColor = vec4((ambient + diffuse + specular) * base, 1.0);
}
"#;

/// Flat colour for the stencil outline pass.
pub const OUTLINE_FRAGMENT: &str = r#"#version 330 core
uniform vec3 outlineColor;

out vec4 FragColor;

void main() {
    FragColor = vec4(outlineColor, 1.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use learngl_core::{HeadlessGpu, ShaderProgram};

    const ALL: [(&str, &str); 6] = [
        ("QUAD_VERTEX", QUAD_VERTEX),
        ("QUAD_FRAGMENT", QUAD_FRAGMENT),
        ("MESH_VERTEX", MESH_VERTEX),
        ("CUBES_FRAGMENT", CUBES_FRAGMENT),
        ("LIT_FRAGMENT", LIT_FRAGMENT),
        ("OUTLINE_FRAGMENT", OUTLINE_FRAGMENT),
    ];

    #[test]
    fn every_source_targets_glsl_330_core() {
        for (name, src) in ALL {
            assert!(
                src.starts_with("#version 330 core"),
                "{name} must start with the version directive:\n{src}"
            );
        }
    }

    #[test]
    fn vertex_sources_pin_attribute_locations() {
        for src in [QUAD_VERTEX, MESH_VERTEX] {
            for slot in 0..3 {
                let decl = format!("layout (location = {slot})");
                assert!(src.contains(&decl), "missing {decl} in:\n{src}");
            }
        }
    }

    #[test]
    fn scene_programs_link() {
        let gpu = HeadlessGpu::new();
        for (vs, fs) in [
            (QUAD_VERTEX, QUAD_FRAGMENT),
            (MESH_VERTEX, CUBES_FRAGMENT),
            (MESH_VERTEX, LIT_FRAGMENT),
            (MESH_VERTEX, OUTLINE_FRAGMENT),
        ] {
            let mut program = ShaderProgram::build(&gpu, "scene", vs, fs).unwrap();
            assert!(program.is_linked());
            program.release(&gpu).unwrap();
        }
        assert_eq!(gpu.live_objects(), 0);
    }

    #[test]
    fn lit_fragment_declares_light_uniforms() {
        for name in ["lightPos", "lightColor", "viewPos", "texture_diffuse1"] {
            assert!(
                LIT_FRAGMENT.contains(&format!(" {name};")),
                "expected uniform {name} in:\n{LIT_FRAGMENT}"
            );
        }
    }
}
