pub(crate) const SHADER: &str = r#"
struct PointLight {
    position: vec4<f32>,
    ambient: vec4<f32>,
    diffuse: vec4<f32>,
    specular: vec4<f32>,
    attenuation: vec4<f32>,
}

struct GlobalUniform {
    view_proj: mat4x4<f32>,
    camera_position: vec4<f32>,
    material_ambient: vec4<f32>,
    material_diffuse: vec4<f32>,
    material_specular: vec4<f32>,
    params: vec4<f32>,
    lights: array<PointLight, 2>,
}

struct ObjectUniform {
    model: mat4x4<f32>,
    normal: mat3x4<f32>,
}

@group(0) @binding(0)
var<uniform> globals: GlobalUniform;

@group(1) @binding(0)
var<uniform> object: ObjectUniform;

@group(2) @binding(0)
var diffuse_texture: texture_2d<f32>;
@group(2) @binding(1)
var diffuse_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var output: VertexOutput;
    let world_pos = object.model * vec4<f32>(input.position, 1.0);
    output.position = globals.view_proj * world_pos;
    output.world_pos = world_pos.xyz;

    let normal_matrix = mat3x3<f32>(
        object.normal[0].xyz,
        object.normal[1].xyz,
        object.normal[2].xyz,
    );
    output.normal = normalize(normal_matrix * input.normal);
    output.uv = input.uv;
    return output;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let tex_color = textureSample(diffuse_texture, diffuse_sampler, input.uv).rgb;
    let normal = normalize(input.normal);
    let view_dir = normalize(globals.camera_position.xyz - input.world_pos);
    let shininess = max(globals.material_specular.w, 1e-3);
    let intensity = globals.params.x;

    var result = vec3<f32>(0.0);
    for (var i = 0u; i < 2u; i = i + 1u) {
        let light = globals.lights[i];
        let to_light = light.position.xyz - input.world_pos;
        let distance = length(to_light);
        let light_dir = normalize(to_light);

        let diff = max(dot(normal, light_dir), 0.0);
        let reflect_dir = reflect(-light_dir, normal);
        let spec = pow(max(dot(view_dir, reflect_dir), 0.0), shininess);
        let attenuation = 1.0
            / (light.attenuation.x
                + light.attenuation.y * distance
                + light.attenuation.z * distance * distance);

        let ambient = light.ambient.rgb * globals.material_ambient.rgb * tex_color;
        let diffuse = light.diffuse.rgb * diff * globals.material_diffuse.rgb * tex_color;
        let specular = light.specular.rgb * spec * globals.material_specular.rgb;
        result = result + (ambient + diffuse + specular) * attenuation * intensity;
    }

    return vec4<f32>(result, 1.0);
}
"#;
