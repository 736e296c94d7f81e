//! GPU programs and their uniform slots.
//!
//! Every canvas program shares the vertex stage `VERTEX_SHADER`. Its fragment
//! stage may be replaced, as long as it keeps consuming the varyings of the
//! vertex stage. Four uniforms are reserved and recomputed by the canvas on
//! every draw, see `UniformDefaults`.

use std::convert::TryFrom;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::math::prelude::{Matrix3, Matrix4, SquareMatrix, Vector2, Vector3, Vector4};

use super::backends::Visitor;
use super::errors::*;
use super::VideoSystem;

impl_handle!(ShaderHandle);

/// Uniform variable of a program. Matrices are stored column by column.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum UniformVariable {
    I32(i32),
    F32(f32),
    Vector2f([f32; 2]),
    Vector3f([f32; 3]),
    Vector4f([f32; 4]),
    Matrix3f([[f32; 3]; 3]),
    Matrix4f([[f32; 4]; 4]),
}

impl From<i32> for UniformVariable {
    fn from(v: i32) -> Self {
        UniformVariable::I32(v)
    }
}

impl From<f32> for UniformVariable {
    fn from(v: f32) -> Self {
        UniformVariable::F32(v)
    }
}

impl From<[f32; 2]> for UniformVariable {
    fn from(v: [f32; 2]) -> Self {
        UniformVariable::Vector2f(v)
    }
}

impl From<[f32; 3]> for UniformVariable {
    fn from(v: [f32; 3]) -> Self {
        UniformVariable::Vector3f(v)
    }
}

impl From<[f32; 4]> for UniformVariable {
    fn from(v: [f32; 4]) -> Self {
        UniformVariable::Vector4f(v)
    }
}

impl From<Vector2<f32>> for UniformVariable {
    fn from(v: Vector2<f32>) -> Self {
        UniformVariable::Vector2f(*v.as_ref())
    }
}

impl From<Vector3<f32>> for UniformVariable {
    fn from(v: Vector3<f32>) -> Self {
        UniformVariable::Vector3f(*v.as_ref())
    }
}

impl From<Vector4<f32>> for UniformVariable {
    fn from(v: Vector4<f32>) -> Self {
        UniformVariable::Vector4f(*v.as_ref())
    }
}

impl From<Matrix3<f32>> for UniformVariable {
    fn from(v: Matrix3<f32>) -> Self {
        UniformVariable::Matrix3f(*v.as_ref())
    }
}

impl From<Matrix4<f32>> for UniformVariable {
    fn from(v: Matrix4<f32>) -> Self {
        UniformVariable::Matrix4f(*v.as_ref())
    }
}

/// Picks the uniform type by the number of floats, matrices are expected
/// column by column.
impl<'a> TryFrom<&'a [f32]> for UniformVariable {
    type Error = Error;

    fn try_from(v: &'a [f32]) -> Result<Self> {
        match v.len() {
            1 => Ok(UniformVariable::F32(v[0])),
            2 => Ok(UniformVariable::Vector2f([v[0], v[1]])),
            3 => Ok(UniformVariable::Vector3f([v[0], v[1], v[2]])),
            4 => Ok(UniformVariable::Vector4f([v[0], v[1], v[2], v[3]])),
            9 => {
                let mut m = [[0.0; 3]; 3];
                for (i, column) in v.chunks(3).enumerate() {
                    m[i].copy_from_slice(column);
                }
                Ok(UniformVariable::Matrix3f(m))
            }
            16 => {
                let mut m = [[0.0; 4]; 4];
                for (i, column) in v.chunks(4).enumerate() {
                    m[i].copy_from_slice(column);
                }
                Ok(UniformVariable::Matrix4f(m))
            }
            n => Err(Error::UniformShapeUnsupported(n)),
        }
    }
}

/// The reserved uniforms, computed by the canvas for each draw. They always
/// win over user uniforms of the same name.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct UniformDefaults {
    /// The transform applied to vertex positions.
    pub transform: Matrix3<f32>,
    /// Multiplied with every output color.
    pub color_mask: Vector4<f32>,
    /// `(min x, min y, width, height)` of the destination canvas.
    pub bounds: Vector4<f32>,
    /// `(x, y, width, height)` of the source texture in integer pixels.
    pub tex_bounds: Vector4<f32>,
}

impl Default for UniformDefaults {
    fn default() -> Self {
        UniformDefaults {
            transform: Matrix3::identity(),
            color_mask: Vector4::new(1.0, 1.0, 1.0, 1.0),
            bounds: Vector4::new(0.0, 0.0, 0.0, 0.0),
            tex_bounds: Vector4::new(0.0, 0.0, 0.0, 0.0),
        }
    }
}

impl UniformDefaults {
    pub const TRANSFORM: &'static str = "uTransform";
    pub const COLOR_MASK: &'static str = "uColorMask";
    pub const BOUNDS: &'static str = "uBounds";
    pub const TEX_BOUNDS: &'static str = "uTexBounds";

    #[inline]
    pub fn is_reserved(name: &str) -> bool {
        name == Self::TRANSFORM
            || name == Self::COLOR_MASK
            || name == Self::BOUNDS
            || name == Self::TEX_BOUNDS
    }

    pub fn variables(&self) -> [(&'static str, UniformVariable); 4] {
        [
            (Self::TRANSFORM, self.transform.into()),
            (Self::COLOR_MASK, self.color_mask.into()),
            (Self::BOUNDS, self.bounds.into()),
            (Self::TEX_BOUNDS, self.tex_bounds.into()),
        ]
    }
}

/// Writes the reserved uniforms into the bound program, followed by every
/// user uniform whose name is not reserved.
pub fn apply_uniforms(
    visitor: &mut dyn Visitor,
    defaults: &UniformDefaults,
    uniforms: &[(String, UniformVariable)],
) -> crate::errors::Result<()> {
    for &(name, v) in defaults.variables().iter() {
        visitor.set_uniform(name, v)?;
    }

    for &(ref name, v) in uniforms {
        if !UniformDefaults::is_reserved(name) {
            visitor.set_uniform(name, v)?;
        }
    }

    Ok(())
}

pub const VERTEX_SHADER: &str = r#"
#version 330 core

in vec2  aPosition;
in vec4  aColor;
in vec2  aTexCoords;
in float aIntensity;

out vec4  vColor;
out vec2  vTexCoords;
out float vIntensity;
out vec2  vPosition;

uniform mat3 uTransform;
uniform vec4 uBounds;

void main() {
    vec2 transPos = (uTransform * vec3(aPosition, 1.0)).xy;
    vec2 normPos = (transPos - uBounds.xy) / uBounds.zw * 2.0 - vec2(1.0, 1.0);
    gl_Position = vec4(normPos, 0.0, 1.0);

    vColor = aColor;
    vPosition = aPosition;
    vTexCoords = aTexCoords;
    vIntensity = aIntensity;
}
"#;

/// Mixes vertex colors with texels by intensity, then applies the color mask.
pub const FRAGMENT_SHADER: &str = r#"
#version 330 core

in vec4  vColor;
in vec2  vTexCoords;
in float vIntensity;
in vec2  vPosition;

out vec4 fragColor;

uniform vec4 uColorMask;
uniform vec4 uTexBounds;
uniform sampler2D uTexture;

void main() {
    if (vIntensity == 0.0) {
        fragColor = uColorMask * vColor;
    } else {
        fragColor = vec4(0.0, 0.0, 0.0, 0.0);
        fragColor += (1.0 - vIntensity) * vColor;
        vec2 t = (vTexCoords - uTexBounds.xy) / uTexBounds.zw;
        fragColor += vIntensity * vColor * texture(uTexture, t);
        fragColor *= uColorMask;
    }
}
"#;

/// Owns a linked program, deleted without blocking on drop.
pub(crate) struct ShaderObject {
    handle: ShaderHandle,
    video: VideoSystem,
}

impl ShaderObject {
    /// Links `fs` with the shared vertex stage. Blocks until linked.
    fn link(video: &VideoSystem, fs: &str) -> Result<Self> {
        let handle = video.create_shader_handle();
        let src = fs.to_owned();
        let rsp = video
            .executor()
            .call(move |visitor| visitor.create_shader(handle, VERTEX_SHADER, &src));

        if let Err(err) = rsp {
            video.free_shader_handle(handle);
            return Err(Error::ShaderCreationFailure(format!("{}", err)));
        }

        debug!("Linked {}.", handle);
        Ok(ShaderObject {
            handle,
            video: video.clone(),
        })
    }

    #[inline]
    pub fn handle(&self) -> ShaderHandle {
        self.handle
    }
}

impl Drop for ShaderObject {
    fn drop(&mut self) {
        self.video.delete_shader(self.handle);
    }
}

struct ShaderState {
    program: Arc<ShaderObject>,
    fs: String,
    uniforms: Vec<(String, UniformVariable)>,
}

/// A program plus its named uniform slots.
pub struct Shader {
    video: VideoSystem,
    state: RwLock<ShaderState>,
}

impl Shader {
    /// Links `fs` with the shared vertex stage. Blocks until linked.
    pub fn new(video: &VideoSystem, fs: &str) -> Result<Self> {
        let program = ShaderObject::link(video, fs)?;
        Ok(Shader {
            video: video.clone(),
            state: RwLock::new(ShaderState {
                program: Arc::new(program),
                fs: fs.to_owned(),
                uniforms: Vec::new(),
            }),
        })
    }

    /// Returns the handle of the current program.
    #[inline]
    pub fn handle(&self) -> ShaderHandle {
        self.state.read().unwrap().program.handle()
    }

    /// Keeps the current program alive for an operation that draws with it.
    pub(crate) fn program(&self) -> Arc<ShaderObject> {
        self.state.read().unwrap().program.clone()
    }

    #[inline]
    pub fn vertex_source(&self) -> &'static str {
        VERTEX_SHADER
    }

    #[inline]
    pub fn fragment_source(&self) -> String {
        self.state.read().unwrap().fs.clone()
    }

    /// Sets a user uniform slot, replacing the value of a slot with the same
    /// name. Slots named like reserved uniforms are stored, but never reach
    /// the program.
    pub fn set_uniform<T>(&self, name: &str, value: T)
    where
        T: Into<UniformVariable>,
    {
        let value = value.into();
        let mut state = self.state.write().unwrap();

        if let Some(slot) = state.uniforms.iter_mut().find(|v| v.0 == name) {
            slot.1 = value;
            return;
        }

        state.uniforms.push((name.to_owned(), value));
    }

    pub fn uniform(&self, name: &str) -> Option<UniformVariable> {
        let state = self.state.read().unwrap();
        state.uniforms.iter().find(|v| v.0 == name).map(|v| v.1)
    }

    /// Returns a copy of all the user uniform slots.
    pub fn uniforms(&self) -> Vec<(String, UniformVariable)> {
        self.state.read().unwrap().uniforms.clone()
    }

    /// Replaces the fragment stage and relinks, blocking until done. On
    /// failure the current program stays in use. User uniform slots are kept.
    /// The previous program lives on until the draws using it are done.
    pub fn set_fragment_shader(&self, fs: &str) -> Result<()> {
        let program = ShaderObject::link(&self.video, fs)?;

        let mut state = self.state.write().unwrap();
        state.fs = fs.to_owned();
        state.program = Arc::new(program);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn shapes() {
        let v: &[f32] = &[1.0, 2.0];
        assert_eq!(
            UniformVariable::try_from(v).unwrap(),
            UniformVariable::Vector2f([1.0, 2.0])
        );

        let v: Vec<f32> = (0..9).map(|i| i as f32).collect();
        assert_eq!(
            UniformVariable::try_from(&v[..]).unwrap(),
            UniformVariable::Matrix3f([[0.0, 1.0, 2.0], [3.0, 4.0, 5.0], [6.0, 7.0, 8.0]])
        );

        let v: &[f32] = &[1.0, 2.0, 3.0, 4.0, 5.0];
        match UniformVariable::try_from(v) {
            Err(Error::UniformShapeUnsupported(5)) => {}
            other => panic!("unexpected {:?}", other),
        }

        let v: &[f32] = &[];
        assert!(UniformVariable::try_from(v).is_err());
    }

    #[test]
    fn reserved() {
        assert!(UniformDefaults::is_reserved("uColorMask"));
        assert!(!UniformDefaults::is_reserved("uTime"));

        let vars = UniformDefaults::default().variables();
        assert_eq!(vars[1].1, UniformVariable::Vector4f([1.0, 1.0, 1.0, 1.0]));
    }
}
