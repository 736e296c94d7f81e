//! CPU rasterizer backend.
//!
//! # Restrictions
//!
//!  - Only the base composition program is executed. Programs linked with a
//!    custom fragment stage are accepted, but render like the base program.
//!  - Textures are RGBA8 with premultiplied alpha, stored bottom row first.
//!  - Blending happens in floating point and is quantized to 8 bits per
//!    component on store.
//!  - Coverage is sampled at pixel centers with a top-left fill rule, so
//!    triangles sharing an edge never touch a pixel twice.

use std::collections::HashMap;

use crate::errors::*;
use crate::math::prelude::{Color, Matrix3, PixelRect, SquareMatrix, Vector2, Vector3, Vector4};

use super::super::blend::BlendFactor;
use super::super::mesh::{MeshHandle, MeshVertex};
use super::super::shader::{ShaderHandle, UniformDefaults, UniformVariable, FRAGMENT_SHADER};
use super::super::texture::{FrameHandle, TextureHandle, TextureParams};
use super::utils::DataVec;
use super::Visitor;

#[derive(Debug, Clone)]
struct SoftTexture {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    smooth: bool,
}

impl SoftTexture {
    fn contains(&self, area: PixelRect) -> bool {
        area.x >= 0
            && area.y >= 0
            && area.w >= 0
            && area.h >= 0
            && (area.x + area.w) as u32 <= self.width
            && (area.y + area.h) as u32 <= self.height
    }

    #[inline]
    fn texel(&self, x: i32, y: i32) -> Color {
        let x = x.max(0).min(self.width as i32 - 1) as usize;
        let y = y.max(0).min(self.height as i32 - 1) as usize;
        let i = (y * self.width as usize + x) * 4;
        let v = &self.pixels[i..i + 4];
        Color::from_bytes([v[0], v[1], v[2], v[3]])
    }

    /// Samples at normalized coordinates with clamp-to-edge wrapping.
    fn sample(&self, t: Vector2<f32>) -> Color {
        if self.width == 0 || self.height == 0 {
            return Color::transparent();
        }

        let u = t.x * self.width as f32;
        let v = t.y * self.height as f32;

        if !self.smooth {
            return self.texel(u.floor() as i32, v.floor() as i32);
        }

        let (u, v) = (u - 0.5, v - 0.5);
        let (x0, y0) = (u.floor(), v.floor());
        let (fx, fy) = (u - x0, v - y0);
        let (x0, y0) = (x0 as i32, y0 as i32);

        let bottom = self.texel(x0, y0) * (1.0 - fx) + self.texel(x0 + 1, y0) * fx;
        let top = self.texel(x0, y0 + 1) * (1.0 - fx) + self.texel(x0 + 1, y0 + 1) * fx;
        bottom * (1.0 - fy) + top * fy
    }
}

#[derive(Debug, Clone)]
struct SoftShader {
    uniforms: HashMap<String, UniformVariable>,
}

/// The inputs of the base composition program, read from the uniforms of
/// the bound program.
struct Program {
    transform: Matrix3<f32>,
    bounds: Vector4<f32>,
    color_mask: Color,
    tex_bounds: Vector4<f32>,
}

impl Program {
    fn new(shader: &SoftShader) -> Self {
        let mut program = Program {
            transform: Matrix3::identity(),
            bounds: Vector4::new(0.0, 0.0, 1.0, 1.0),
            color_mask: Color::white(),
            tex_bounds: Vector4::new(0.0, 0.0, 1.0, 1.0),
        };

        let uniforms = &shader.uniforms;

        if let Some(&UniformVariable::Matrix3f(m)) = uniforms.get(UniformDefaults::TRANSFORM) {
            program.transform = m.into();
        }

        if let Some(&UniformVariable::Vector4f(v)) = uniforms.get(UniformDefaults::BOUNDS) {
            program.bounds = v.into();
        }

        if let Some(&UniformVariable::Vector4f(v)) = uniforms.get(UniformDefaults::COLOR_MASK) {
            program.color_mask = v.into();
        }

        if let Some(&UniformVariable::Vector4f(v)) = uniforms.get(UniformDefaults::TEX_BOUNDS) {
            program.tex_bounds = v.into();
        }

        program
    }

    /// Transforms a vertex position into window coordinates of `vp`.
    #[inline]
    fn project(&self, position: [f32; 2], vp: PixelRect) -> Vector2<f32> {
        let p = self.transform * Vector3::new(position[0], position[1], 1.0);
        Vector2::new(
            (p.x - self.bounds.x) / self.bounds.z * vp.w as f32 + vp.x as f32,
            (p.y - self.bounds.y) / self.bounds.w * vp.h as f32 + vp.y as f32,
        )
    }

    #[inline]
    fn shade(
        &self,
        color: Color,
        texcoord: Vector2<f32>,
        intensity: f32,
        sampler: Option<&SoftTexture>,
    ) -> Color {
        if intensity == 0.0 {
            return self.color_mask * color;
        }

        let t = Vector2::new(
            (texcoord.x - self.tex_bounds.x) / self.tex_bounds.z,
            (texcoord.y - self.tex_bounds.y) / self.tex_bounds.w,
        );

        // An unbound sampler reads opaque black, like GL texture unit zero.
        let texel = sampler.map(|s| s.sample(t)).unwrap_or_else(Color::black);
        (color * (1.0 - intensity) + color * texel * intensity) * self.color_mask
    }
}

/// Executes canvas draws on the CPU.
pub struct SoftwareVisitor {
    warn_custom_shaders: bool,
    textures: DataVec<SoftTexture>,
    frames: DataVec<TextureHandle>,
    shaders: DataVec<SoftShader>,
    meshes: DataVec<Vec<MeshVertex>>,
    binded_frame: Option<FrameHandle>,
    binded_shader: Option<ShaderHandle>,
    binded_texture: Option<TextureHandle>,
    viewport: PixelRect,
    blend: (BlendFactor, BlendFactor),
}

impl SoftwareVisitor {
    pub fn new(warn_custom_shaders: bool) -> Self {
        SoftwareVisitor {
            warn_custom_shaders,
            textures: DataVec::new(),
            frames: DataVec::new(),
            shaders: DataVec::new(),
            meshes: DataVec::new(),
            binded_frame: None,
            binded_shader: None,
            binded_texture: None,
            viewport: PixelRect::default(),
            blend: (BlendFactor::One, BlendFactor::Zero),
        }
    }

    fn target(&self) -> Result<TextureHandle> {
        let frame = self
            .binded_frame
            .ok_or_else(|| format_err!("No render target is bound."))?;

        self.frames
            .get(frame)
            .cloned()
            .ok_or_else(|| format_err!("{} is invalid.", frame))
    }
}

impl Visitor for SoftwareVisitor {
    fn create_texture(
        &mut self,
        handle: TextureHandle,
        params: TextureParams,
        data: Option<&[u8]>,
    ) -> Result<()> {
        let pixels = match data {
            Some(v) => {
                if v.len() != params.len() {
                    bail!(
                        "Pixel data of {} has {} bytes, expected {}.",
                        handle,
                        v.len(),
                        params.len()
                    );
                }
                v.to_vec()
            }
            None => vec![0; params.len()],
        };

        let texture = SoftTexture {
            width: params.dimensions.x,
            height: params.dimensions.y,
            pixels,
            smooth: params.smooth,
        };

        self.textures.create(handle, texture);
        Ok(())
    }

    fn update_texture(
        &mut self,
        handle: TextureHandle,
        area: PixelRect,
        data: &[u8],
    ) -> Result<()> {
        let texture = self
            .textures
            .get_mut(handle)
            .ok_or_else(|| format_err!("{} is invalid.", handle))?;

        if !texture.contains(area) || data.len() != area.len() * 4 {
            bail!("Trying to update {} out of bounds.", handle);
        }

        let row = area.w as usize * 4;
        for (i, src) in data.chunks(row.max(1)).enumerate().take(area.h as usize) {
            let offset = ((area.y as usize + i) * texture.width as usize + area.x as usize) * 4;
            texture.pixels[offset..offset + row].copy_from_slice(src);
        }

        Ok(())
    }

    fn read_texture(&mut self, handle: TextureHandle, area: PixelRect) -> Result<Vec<u8>> {
        let texture = self
            .textures
            .get(handle)
            .ok_or_else(|| format_err!("{} is invalid.", handle))?;

        if !texture.contains(area) {
            bail!("Trying to read {} out of bounds.", handle);
        }

        let row = area.w as usize * 4;
        let mut bytes = Vec::with_capacity(area.len() * 4);
        for y in area.y..area.y + area.h {
            let offset = (y as usize * texture.width as usize + area.x as usize) * 4;
            bytes.extend_from_slice(&texture.pixels[offset..offset + row]);
        }

        Ok(bytes)
    }

    fn texture_smooth(&self, handle: TextureHandle) -> Result<bool> {
        self.textures
            .get(handle)
            .map(|v| v.smooth)
            .ok_or_else(|| format_err!("{} is invalid.", handle))
    }

    fn set_texture_smooth(&mut self, handle: TextureHandle, smooth: bool) -> Result<()> {
        let texture = self
            .textures
            .get_mut(handle)
            .ok_or_else(|| format_err!("{} is invalid.", handle))?;
        texture.smooth = smooth;
        Ok(())
    }

    fn delete_texture(&mut self, handle: TextureHandle) -> Result<()> {
        if self.binded_texture == Some(handle) {
            self.binded_texture = None;
        }

        self.textures
            .free(handle)
            .map(|_| ())
            .ok_or_else(|| format_err!("{} is invalid.", handle))
    }

    fn create_frame(&mut self, handle: FrameHandle, texture: TextureHandle) -> Result<()> {
        if self.textures.get(texture).is_none() {
            bail!("{} is invalid.", texture);
        }

        self.frames.create(handle, texture);
        Ok(())
    }

    fn delete_frame(&mut self, handle: FrameHandle) -> Result<()> {
        if self.binded_frame == Some(handle) {
            self.binded_frame = None;
        }

        self.frames
            .free(handle)
            .map(|_| ())
            .ok_or_else(|| format_err!("{} is invalid.", handle))
    }

    fn bind_frame(&mut self, handle: Option<FrameHandle>) -> Result<()> {
        if let Some(h) = handle {
            if self.frames.get(h).is_none() {
                bail!("{} is invalid.", h);
            }
        }

        self.binded_frame = handle;
        Ok(())
    }

    fn set_viewport(&mut self, vp: PixelRect) -> Result<()> {
        self.viewport = vp;
        Ok(())
    }

    fn set_blend_func(&mut self, src: BlendFactor, dst: BlendFactor) -> Result<()> {
        self.blend = (src, dst);
        Ok(())
    }

    fn clear(&mut self, color: Color) -> Result<()> {
        let target = self.target()?;
        let texture = self
            .textures
            .get_mut(target)
            .ok_or_else(|| format_err!("{} is invalid.", target))?;

        let bytes = color.to_bytes();
        for v in texture.pixels.chunks_mut(4) {
            v.copy_from_slice(&bytes);
        }

        Ok(())
    }

    fn create_shader(&mut self, handle: ShaderHandle, vs: &str, fs: &str) -> Result<()> {
        for (stage, src) in [("vertex", vs), ("fragment", fs)].iter() {
            if !src.contains("void main") {
                bail!("The {} stage of {} has no entry point.", stage, handle);
            }
        }

        if self.warn_custom_shaders && fs.trim() != FRAGMENT_SHADER.trim() {
            warn!(
                "The software backend can not run custom fragment shaders, \
                 {} renders with the base program.",
                handle
            );
        }

        let shader = SoftShader {
            uniforms: HashMap::new(),
        };

        self.shaders.create(handle, shader);
        Ok(())
    }

    fn delete_shader(&mut self, handle: ShaderHandle) -> Result<()> {
        if self.binded_shader == Some(handle) {
            self.binded_shader = None;
        }

        self.shaders
            .free(handle)
            .map(|_| ())
            .ok_or_else(|| format_err!("{} is invalid.", handle))
    }

    fn bind_shader(&mut self, handle: Option<ShaderHandle>) -> Result<()> {
        if let Some(h) = handle {
            if self.shaders.get(h).is_none() {
                bail!("{} is invalid.", h);
            }
        }

        self.binded_shader = handle;
        Ok(())
    }

    fn set_uniform(&mut self, name: &str, variable: UniformVariable) -> Result<()> {
        let handle = self
            .binded_shader
            .ok_or_else(|| format_err!("No program is bound."))?;

        let shader = self
            .shaders
            .get_mut(handle)
            .ok_or_else(|| format_err!("{} is invalid.", handle))?;

        shader.uniforms.insert(name.to_owned(), variable);
        Ok(())
    }

    fn create_mesh(&mut self, handle: MeshHandle, vertices: &[MeshVertex]) -> Result<()> {
        self.meshes.create(handle, vertices.to_vec());
        Ok(())
    }

    fn update_mesh(&mut self, handle: MeshHandle, vertices: &[MeshVertex]) -> Result<()> {
        let mesh = self
            .meshes
            .get_mut(handle)
            .ok_or_else(|| format_err!("{} is invalid.", handle))?;

        mesh.clear();
        mesh.extend_from_slice(vertices);
        Ok(())
    }

    fn delete_mesh(&mut self, handle: MeshHandle) -> Result<()> {
        self.meshes
            .free(handle)
            .map(|_| ())
            .ok_or_else(|| format_err!("{} is invalid.", handle))
    }

    fn bind_texture(&mut self, handle: Option<TextureHandle>) -> Result<()> {
        if let Some(h) = handle {
            if self.textures.get(h).is_none() {
                bail!("{} is invalid.", h);
            }
        }

        self.binded_texture = handle;
        Ok(())
    }

    fn draw(&mut self, mesh: MeshHandle) -> Result<u32> {
        let target = self.target()?;

        let shader = self
            .binded_shader
            .ok_or_else(|| format_err!("No program is bound."))?;
        let shader = self
            .shaders
            .get(shader)
            .ok_or_else(|| format_err!("{} is invalid.", shader))?;
        let program = Program::new(shader);

        let vertices = self
            .meshes
            .get(mesh)
            .cloned()
            .ok_or_else(|| format_err!("{} is invalid.", mesh))?;

        // The sampled texture may be the render target itself, so draws read
        // from a snapshot.
        let sampler = match self.binded_texture {
            Some(h) => Some(
                self.textures
                    .get(h)
                    .cloned()
                    .ok_or_else(|| format_err!("{} is invalid.", h))?,
            ),
            None => None,
        };

        let (sf, df) = self.blend;
        let vp = self.viewport;
        let dst = self
            .textures
            .get_mut(target)
            .ok_or_else(|| format_err!("{} is invalid.", target))?;

        let mut rasterizer = Rasterizer {
            program: &program,
            sampler: sampler.as_ref(),
            dst,
            viewport: vp,
            blend: (sf, df),
        };

        let mut n = 0;
        for tri in vertices.chunks(3).filter(|v| v.len() == 3) {
            rasterizer.triangle([&tri[0], &tri[1], &tri[2]]);
            n += 1;
        }

        Ok(n)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

struct Rasterizer<'a> {
    program: &'a Program,
    sampler: Option<&'a SoftTexture>,
    dst: &'a mut SoftTexture,
    viewport: PixelRect,
    blend: (BlendFactor, BlendFactor),
}

/// Twice the signed area of `(a, b, c)`, positive if counter-clockwise.
#[inline]
fn edge(a: Vector2<f32>, b: Vector2<f32>, c: Vector2<f32>) -> f32 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Whether pixel centers exactly on the counter-clockwise edge `a -> b` are
/// covered. Left edges run downwards, top edges run leftwards.
#[inline]
fn owns_edge(a: Vector2<f32>, b: Vector2<f32>) -> bool {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    dy < 0.0 || (dy == 0.0 && dx < 0.0)
}

#[inline]
fn covers(w: f32, a: Vector2<f32>, b: Vector2<f32>) -> bool {
    w > 0.0 || (w == 0.0 && owns_edge(a, b))
}

impl<'a> Rasterizer<'a> {
    fn triangle(&mut self, mut v: [&MeshVertex; 3]) {
        let vp = self.viewport;
        let mut p = [
            self.program.project(v[0].position, vp),
            self.program.project(v[1].position, vp),
            self.program.project(v[2].position, vp),
        ];

        let mut area = edge(p[0], p[1], p[2]);
        if area == 0.0 || !area.is_finite() {
            return;
        }

        if area < 0.0 {
            v.swap(1, 2);
            p.swap(1, 2);
            area = -area;
        }

        let x0 = p.iter().map(|v| v.x).fold(::std::f32::INFINITY, f32::min);
        let x1 = p.iter().map(|v| v.x).fold(::std::f32::NEG_INFINITY, f32::max);
        let y0 = p.iter().map(|v| v.y).fold(::std::f32::INFINITY, f32::min);
        let y1 = p.iter().map(|v| v.y).fold(::std::f32::NEG_INFINITY, f32::max);

        let xmin = (x0.floor() as i32).max(vp.x).max(0);
        let ymin = (y0.floor() as i32).max(vp.y).max(0);
        let xmax = (x1.ceil() as i32).min(vp.x + vp.w).min(self.dst.width as i32);
        let ymax = (y1.ceil() as i32).min(vp.y + vp.h).min(self.dst.height as i32);

        for y in ymin..ymax {
            for x in xmin..xmax {
                let c = Vector2::new(x as f32 + 0.5, y as f32 + 0.5);
                let w0 = edge(p[1], p[2], c);
                let w1 = edge(p[2], p[0], c);
                let w2 = edge(p[0], p[1], c);

                if !covers(w0, p[1], p[2]) || !covers(w1, p[2], p[0]) || !covers(w2, p[0], p[1]) {
                    continue;
                }

                let (b0, b1, b2) = (w0 / area, w1 / area, w2 / area);

                let color = Color::from(v[0].color) * b0
                    + Color::from(v[1].color) * b1
                    + Color::from(v[2].color) * b2;

                let texcoord = Vector2::new(
                    v[0].texcoord[0] * b0 + v[1].texcoord[0] * b1 + v[2].texcoord[0] * b2,
                    v[0].texcoord[1] * b0 + v[1].texcoord[1] * b1 + v[2].texcoord[1] * b2,
                );

                let intensity = v[0].intensity * b0 + v[1].intensity * b1 + v[2].intensity * b2;
                let src = self.program.shade(color, texcoord, intensity, self.sampler);
                self.blend_pixel(x as usize, y as usize, src);
            }
        }
    }

    fn blend_pixel(&mut self, x: usize, y: usize, s: Color) {
        let i = (y * self.dst.width as usize + x) * 4;
        let px = &mut self.dst.pixels[i..i + 4];
        let d = Color::from_bytes([px[0], px[1], px[2], px[3]]);
        let (sf, df) = self.blend;

        let mix = |sv: f32, dv: f32| {
            sv * sf.eval(sv, s.a, dv, d.a) + dv * df.eval(sv, s.a, dv, d.a)
        };

        let out = Color::new(mix(s.r, d.r), mix(s.g, d.g), mix(s.b, d.b), mix(s.a, d.a));
        px.copy_from_slice(&out.to_bytes());
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::utils::handle::HandleLike;
    use crate::video::blend::blend_factors;
    use crate::video::blend::ComposeMethod;
    use crate::video::shader::VERTEX_SHADER;

    fn quad(x0: f32, y0: f32, x1: f32, y1: f32, color: [f32; 4]) -> Vec<MeshVertex> {
        let corners = [[x0, y0], [x1, y0], [x1, y1], [x0, y0], [x1, y1], [x0, y1]];
        corners
            .iter()
            .map(|&position| MeshVertex {
                position,
                color,
                ..Default::default()
            })
            .collect()
    }

    fn setup(w: u32, h: u32) -> (SoftwareVisitor, TextureHandle, MeshHandle) {
        let mut v = SoftwareVisitor::new(false);
        let texture = TextureHandle::new(0, 1);
        let frame = FrameHandle::new(0, 1);
        let shader = ShaderHandle::new(0, 1);
        let mesh = MeshHandle::new(0, 1);

        v.create_texture(texture, TextureParams::new(w, h, false), None).unwrap();
        v.create_frame(frame, texture).unwrap();
        v.create_shader(shader, VERTEX_SHADER, FRAGMENT_SHADER).unwrap();
        v.bind_frame(Some(frame)).unwrap();
        v.bind_shader(Some(shader)).unwrap();
        v.set_viewport(PixelRect::new(0, 0, w as i32, h as i32)).unwrap();
        v.set_uniform(UniformDefaults::BOUNDS, [0.0, 0.0, w as f32, h as f32].into())
            .unwrap();
        v.set_uniform(UniformDefaults::TRANSFORM, Matrix3::identity().into())
            .unwrap();

        (v, texture, mesh)
    }

    #[test]
    fn shared_edges_are_drawn_once() {
        let (mut v, texture, mesh) = setup(8, 8);
        let (sf, df) = blend_factors(ComposeMethod::Plus);
        v.set_blend_func(sf, df).unwrap();
        v.create_mesh(mesh, &quad(0.0, 0.0, 8.0, 8.0, [0.25, 0.0, 0.0, 0.25]))
            .unwrap();
        assert_eq!(v.draw(mesh).unwrap(), 2);

        let pixels = v.read_texture(texture, PixelRect::new(0, 0, 8, 8)).unwrap();
        for px in pixels.chunks(4) {
            assert_eq!(px, &[64, 0, 0, 64]);
        }
    }

    #[test]
    fn partial_cover() {
        let (mut v, texture, mesh) = setup(4, 4);
        v.create_mesh(mesh, &quad(0.0, 0.0, 2.0, 1.0, [1.0, 1.0, 1.0, 1.0]))
            .unwrap();
        v.draw(mesh).unwrap();

        let row0 = v.read_texture(texture, PixelRect::new(0, 0, 4, 1)).unwrap();
        assert_eq!(&row0[..8], &[255; 8]);
        assert_eq!(&row0[8..], &[0; 8]);

        let row1 = v.read_texture(texture, PixelRect::new(0, 1, 4, 1)).unwrap();
        assert_eq!(row1, vec![0; 16]);
    }

    #[test]
    fn update_and_read_area() {
        let (mut v, texture, _) = setup(3, 2);
        let data: Vec<u8> = (0..16).collect();
        v.update_texture(texture, PixelRect::new(1, 0, 2, 2), &data).unwrap();

        assert_eq!(v.read_texture(texture, PixelRect::new(1, 0, 2, 2)).unwrap(), data);
        assert_eq!(
            v.read_texture(texture, PixelRect::new(0, 1, 1, 1)).unwrap(),
            vec![0, 0, 0, 0]
        );
        assert!(v.read_texture(texture, PixelRect::new(2, 0, 2, 1)).is_err());
    }

    #[test]
    fn smooth_sampling() {
        let t = SoftTexture {
            width: 2,
            height: 1,
            pixels: vec![0, 0, 0, 255, 255, 255, 255, 255],
            smooth: true,
        };

        let c = t.sample(Vector2::new(0.5, 0.5));
        assert!((c.r - 0.5).abs() < 1e-4);

        let t = SoftTexture { smooth: false, ..t };
        assert_eq!(t.sample(Vector2::new(0.49, 0.5)).r, 0.0);
        assert_eq!(t.sample(Vector2::new(0.51, 0.5)).r, 1.0);
    }
}
