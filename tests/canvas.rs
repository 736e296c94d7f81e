extern crate glcanvas;
extern crate rand;

use std::mem;
use std::sync::{Arc, Mutex};

use glcanvas::prelude::*;
use glcanvas::video::executor::Op;
use glcanvas::video::shader::FRAGMENT_SHADER;
use rand::Rng;

fn video() -> (VideoSystem, Arc<Immediate>) {
    let params = VideoParams {
        warn_custom_shaders: false,
        ..VideoParams::default()
    };

    VideoSystem::immediate(params)
}

fn canvas(video: &VideoSystem, x0: f32, y0: f32, x1: f32, y1: f32) -> Canvas {
    Canvas::new(video, Rect::new(x0, y0, x1, y1)).unwrap()
}

fn fill(canvas: &Canvas, color: Color) {
    let tri = TrianglesData::from_rect(canvas.bounds(), color);
    canvas.make_triangles(&tri).draw();
}

fn assert_all(pixels: &[u8], expected: [u8; 4]) {
    for (i, px) in pixels.chunks(4).enumerate() {
        assert_eq!(px, &expected, "pixel {}", i);
    }
}

#[test]
fn clear() {
    let (video, _) = video();
    let c = canvas(&video, 0.0, 0.0, 100.0, 100.0);
    c.clear(Color::red());

    let pixels = c.pixels().unwrap();
    assert_eq!(pixels.len(), 4 * 100 * 100);
    assert_all(&pixels, [255, 0, 0, 255]);
    assert_eq!(c.color_at(Vector2::new(50.0, 50.0)), Color::red());
}

#[test]
fn pixels() {
    let (video, _) = video();
    let c = canvas(&video, -3.0, 2.0, 10.0, 9.0);

    let mut rng = rand::thread_rng();
    let buf: Vec<u8> = (0..4 * 13 * 7).map(|_| rng.gen()).collect();

    c.set_pixels(&buf).unwrap();
    assert_eq!(c.pixels().unwrap(), buf);

    // Row 0 is the bottom row of the bounds.
    let px = &buf[4 * (13 + 2)..4 * (13 + 2) + 4];
    assert_eq!(
        c.color_at(Vector2::new(-0.5, 3.5)),
        Color::from_bytes([px[0], px[1], px[2], px[3]])
    );
}

#[test]
#[should_panic(expected = "Canvas::set_pixels")]
fn pixels_with_wrong_length() {
    let (video, _) = video();
    let c = canvas(&video, 0.0, 0.0, 4.0, 4.0);
    let _ = c.set_pixels(&[0; 15]);
}

#[test]
fn empty_bounds() {
    let (video, _) = video();
    let c = canvas(&video, 0.0, 0.0, 0.0, 0.0);

    assert_eq!(c.pixels().unwrap(), Vec::<u8>::new());
    c.set_pixels(&[]).unwrap();

    // Nothing of the empty canvas survives growing it.
    c.clear(Color::red());
    c.set_bounds(Rect::new(0.0, 0.0, 2.0, 2.0)).unwrap();
    assert_all(&c.pixels().unwrap(), [0, 0, 0, 0]);

    c.set_bounds(Rect::new(1.0, 1.0, 1.0, 3.0)).unwrap();
    assert!(c.pixels().unwrap().is_empty());
}

#[test]
#[should_panic(expected = "Canvas::set_pixels")]
fn empty_bounds_with_pixels() {
    let (video, _) = video();
    let c = canvas(&video, 0.0, 0.0, 0.0, 5.0);
    let _ = c.set_pixels(&[0; 4]);
}

#[test]
fn resize_preserves_overlap() {
    let (video, _) = video();
    let c = canvas(&video, 0.0, 0.0, 4.0, 4.0);

    let mut rng = rand::thread_rng();
    let buf: Vec<u8> = (0..4 * 4 * 4).map(|_| rng.gen()).collect();
    c.set_pixels(&buf).unwrap();

    let bounds = Rect::new(-2.0, -2.0, 6.0, 6.0);
    c.set_bounds(bounds).unwrap();
    assert_eq!(c.bounds(), bounds);

    let pixels = c.pixels().unwrap();
    assert_eq!(pixels.len(), 4 * 8 * 8);

    for y in -2..6 {
        for x in -2..6 {
            let i = (((y + 2) * 8 + (x + 2)) * 4) as usize;
            let px = &pixels[i..i + 4];
            if x >= 0 && x < 4 && y >= 0 && y < 4 {
                let j = ((y * 4 + x) * 4) as usize;
                assert_eq!(px, &buf[j..j + 4]);
            } else {
                assert_eq!(px, &[0, 0, 0, 0]);
            }
        }
    }

    // Shrinking keeps the remaining part.
    c.set_bounds(Rect::new(1.0, 1.0, 3.0, 2.0)).unwrap();
    let pixels = c.pixels().unwrap();
    let j = ((1 * 4 + 1) * 4) as usize;
    assert_eq!(&pixels[..8], &buf[j..j + 8]);
}

#[test]
fn compose_copy() {
    let (video, _) = video();
    let c = canvas(&video, 0.0, 0.0, 16.0, 16.0);
    c.set_compose_method(ComposeMethod::Copy);

    fill(&c, Color::blue());
    fill(&c, Color::green());
    assert_all(&c.pixels().unwrap(), [0, 255, 0, 255]);
}

#[test]
fn compose_plus() {
    let (video, _) = video();
    let c = canvas(&video, 0.0, 0.0, 8.0, 8.0);
    c.clear(Color::rgb(0.2, 0.0, 0.0));
    c.set_compose_method(ComposeMethod::Plus);
    fill(&c, Color::rgb(0.3, 0.0, 0.0));

    for px in c.pixels().unwrap().chunks(4) {
        assert!((f32::from(px[0]) / 255.0 - 0.5).abs() < 0.01);
        assert_eq!(px[1], 0);
        assert_eq!(px[3], 255);
    }
}

#[test]
fn compose_over_translucent() {
    let (video, _) = video();
    let c = canvas(&video, 0.0, 0.0, 4.0, 4.0);
    c.clear(Color::blue());
    fill(&c, Color::new(1.0, 0.0, 0.0, 1.0) * 0.5);

    for px in c.pixels().unwrap().chunks(4) {
        assert!((i32::from(px[0]) - 128).abs() <= 1);
        assert!((i32::from(px[2]) - 128).abs() <= 1);
        assert_eq!(px[3], 255);
    }
}

#[test]
fn color_mask() {
    let (video, _) = video();
    let a = canvas(&video, 0.0, 0.0, 4.0, 4.0);
    let b = canvas(&video, 0.0, 0.0, 4.0, 4.0);

    a.set_color_mask(None);
    b.set_color_mask(Some(Color::white()));
    assert_eq!(a.color_mask(), b.color_mask());

    let color = Color::new(0.25, 0.5, 0.75, 1.0);
    fill(&a, color);
    fill(&b, color);
    assert_eq!(a.pixels().unwrap(), b.pixels().unwrap());

    a.set_color_mask(Some(Color::new(1.0, 0.0, 1.0, 1.0)));
    a.clear(Color::transparent());
    fill(&a, color);
    assert_all(&a.pixels().unwrap(), [64, 0, 191, 255]);
}

#[test]
fn matrix() {
    let (video, _) = video();
    let c = canvas(&video, 0.0, 0.0, 8.0, 8.0);
    c.set_matrix(Affine::IDENTITY.moved(Vector2::new(4.0, 0.0)));

    let tri = TrianglesData::from_rect(Rect::new(0.0, 0.0, 4.0, 8.0), Color::red());
    c.make_triangles(&tri).draw();

    assert_eq!(c.color_at(Vector2::new(1.0, 1.0)), Color::transparent());
    assert_eq!(c.color_at(Vector2::new(5.0, 1.0)), Color::red());
}

/// Holds back non-blocking operations until the next blocking call.
struct Deferred {
    visitor: Mutex<SoftwareVisitor>,
    pending: Mutex<Vec<Op>>,
}

impl Deferred {
    fn new() -> Self {
        Deferred {
            visitor: Mutex::new(SoftwareVisitor::new(false)),
            pending: Mutex::new(Vec::new()),
        }
    }

    fn pending(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    fn flush(&self, visitor: &mut SoftwareVisitor) {
        loop {
            let ops = mem::replace(&mut *self.pending.lock().unwrap(), Vec::new());
            if ops.is_empty() {
                return;
            }

            for op in ops {
                op(visitor);
            }
        }
    }
}

impl Executor for Deferred {
    fn call_blocking(&self, op: Op) {
        let mut visitor = self.visitor.lock().unwrap();
        self.flush(&mut visitor);
        op(&mut *visitor);
        self.flush(&mut visitor);
    }

    fn call_non_blocking(&self, op: Op) {
        self.pending.lock().unwrap().push(op);
    }
}

#[test]
fn snapshot_state() {
    let executor = Arc::new(Deferred::new());
    let video = VideoSystem::with_executor(VideoParams::default(), executor.clone());
    let c = canvas(&video, 0.0, 0.0, 4.0, 4.0);

    let tri = TrianglesData::from_rect(c.bounds(), Color::red());
    let ct = c.make_triangles(&tri);
    ct.draw();

    // The draw has not run yet, later state changes must not leak into it.
    assert!(executor.pending() > 0);
    c.set_color_mask(Some(Color::transparent()));
    c.set_compose_method(ComposeMethod::Rin);
    c.set_matrix(Affine::IDENTITY.moved(Vector2::new(100.0, 100.0)));

    let pixels = c.pixels().unwrap();
    assert_eq!(executor.pending(), 0);
    assert_all(&pixels, [255, 0, 0, 255]);

    // And they apply to the draws after.
    c.set_matrix(Affine::IDENTITY);
    ct.draw();
    assert_all(&c.pixels().unwrap(), [0, 0, 0, 0]);
}

#[test]
fn submissions() {
    let (video, executor) = video();
    let c = canvas(&video, 0.0, 0.0, 4.0, 4.0);

    executor.clear_submissions();
    c.clear(Color::red());
    assert_eq!(executor.submissions(), vec![Submission::NonBlocking]);

    c.pixels().unwrap();
    c.set_pixels(&[0; 64]).unwrap();
    assert_eq!(
        executor.submissions(),
        vec![
            Submission::NonBlocking,
            Submission::Blocking,
            Submission::Blocking
        ]
    );
}

#[test]
fn picture() {
    let (video, _) = video();
    let c = canvas(&video, 0.0, 0.0, 2.0, 2.0);

    let rect = Rect::new(0.0, 0.0, 2.0, 2.0);
    let bytes = [
        255, 0, 0, 255, 0, 255, 0, 255, //
        0, 0, 255, 255, 255, 255, 255, 255,
    ];

    let pd = PictureData::from_pixels(rect, &bytes);
    Sprite::new(rect).draw(&pd, &c, Affine::IDENTITY).unwrap();
    assert_eq!(c.pixels().unwrap(), bytes.to_vec());

    // Pixels can be sampled through the bound picture as well.
    let cp = c.make_picture(&pd).unwrap();
    assert_eq!(cp.as_color().unwrap().color_at(Vector2::new(1.5, 0.5)), Color::green());
}

#[test]
fn triangles_are_shared() {
    let (video, _) = video();
    let c = canvas(&video, 0.0, 0.0, 4.0, 4.0);

    let gt = GLTriangles::new(&video, &TrianglesData::from_rect(c.bounds(), Color::red()));
    let ct = c.make_triangles(&gt);
    assert_eq!(ct.triangles().handle(), gt.handle());
    assert_eq!(ct.len(), 6);

    let mut gt2 = gt.clone();
    gt2.update(&TrianglesData::from_rect(c.bounds(), Color::green()));
    ct.draw();
    assert_all(&c.pixels().unwrap(), [0, 255, 0, 255]);
}

#[test]
#[should_panic(expected = "GLTriangles::new")]
fn triangles_without_positions() {
    struct Empty;

    impl Triangles for Empty {
        fn len(&self) -> usize {
            3
        }

        fn set_len(&mut self, _: usize) {}

        fn slice(&self, i: usize, j: usize) -> TrianglesData {
            TrianglesData::new(j - i)
        }

        fn update(&mut self, _: &dyn Triangles) {}
    }

    let (video, _) = video();
    let c = canvas(&video, 0.0, 0.0, 4.0, 4.0);
    c.make_triangles(&Empty);
}

#[test]
#[should_panic(expected = "different canvas")]
fn cross_canvas() {
    let (video, _) = video();
    let a = canvas(&video, 0.0, 0.0, 4.0, 4.0);
    let b = canvas(&video, 0.0, 0.0, 4.0, 4.0);

    let pd = PictureData::new(Rect::new(0.0, 0.0, 2.0, 2.0));
    let tri = a.make_triangles(&TrianglesData::from_rect(a.bounds(), Color::white()));
    let pic = b.make_picture(&pd).unwrap();
    pic.draw(&tri);
}

#[test]
fn cross_canvas_always_panics() {
    let (video, _) = video();
    let a = canvas(&video, 0.0, 0.0, 4.0, 4.0);
    let b = canvas(&video, 0.0, 0.0, 4.0, 4.0);
    let pd = PictureData::new(Rect::new(0.0, 0.0, 2.0, 2.0));

    for _ in 0..4 {
        let rsp = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let tri = a.make_triangles(&TrianglesData::from_rect(a.bounds(), Color::white()));
            let pic = b.make_picture(&pd).unwrap();
            pic.draw(&tri);
        }));

        assert!(rsp.is_err());
    }

    // Nothing was submitted, so both canvases are still usable.
    a.clear(Color::red());
    assert_eq!(a.color_at(Vector2::new(0.5, 0.5)), Color::red());
}

#[test]
fn draw_onto_other_canvas() {
    let (video, _) = video();
    let a = canvas(&video, 0.0, 0.0, 4.0, 4.0);
    let b = canvas(&video, 0.0, 0.0, 8.0, 8.0);

    a.clear(Color::red());
    a.draw(&b, Affine::IDENTITY.moved(Vector2::new(4.0, 4.0))).unwrap();

    assert_eq!(b.color_at(Vector2::new(2.0, 2.0)), Color::transparent());
    assert_eq!(b.color_at(Vector2::new(2.0, 6.0)), Color::transparent());
    assert_eq!(b.color_at(Vector2::new(4.5, 4.5)), Color::red());
    assert_eq!(b.color_at(Vector2::new(7.5, 7.5)), Color::red());

    b.clear(Color::transparent());
    a.draw_color_mask(&b, Affine::IDENTITY, Some(Color::new(0.0, 0.0, 0.0, 1.0)))
        .unwrap();
    assert_eq!(b.color_at(Vector2::new(1.5, 1.5)), Color::black());
}

#[test]
fn self_view_follows_bounds() {
    let (video, _) = video();
    let a = canvas(&video, 0.0, 0.0, 4.0, 4.0);
    let b = canvas(&video, 0.0, 0.0, 8.0, 8.0);

    a.clear(Color::red());
    a.set_bounds(Rect::new(-4.0, -4.0, 4.0, 4.0)).unwrap();

    // The view spans the new bounds without re-centering, so only the old
    // content shows up at its old place.
    a.draw(&b, Affine::IDENTITY.moved(Vector2::new(4.0, 4.0))).unwrap();

    assert_eq!(b.color_at(Vector2::new(1.5, 1.5)), Color::transparent());
    assert_eq!(b.color_at(Vector2::new(4.5, 4.5)), Color::red());
    assert_eq!(b.color_at(Vector2::new(7.5, 7.5)), Color::red());
}

#[test]
fn draw_onto_itself() {
    let (video, _) = video();
    let c = canvas(&video, 0.0, 0.0, 4.0, 4.0);

    let mut buf = vec![0; 64];
    buf[..4].copy_from_slice(&[255, 0, 0, 255]);
    c.set_pixels(&buf).unwrap();

    c.set_compose_method(ComposeMethod::Copy);
    c.draw(&c, Affine::IDENTITY.moved(Vector2::new(1.0, 0.0))).unwrap();

    // The source is read as it was before the draw.
    assert_eq!(c.color_at(Vector2::new(0.5, 0.5)), Color::red());
    assert_eq!(c.color_at(Vector2::new(1.5, 0.5)), Color::red());
    assert_eq!(c.color_at(Vector2::new(2.5, 0.5)), Color::transparent());
}

#[test]
fn reserved_uniforms_win() {
    let (video, _) = video();
    let c = canvas(&video, 0.0, 0.0, 4.0, 4.0);

    c.set_uniform("uColorMask", [0.0, 0.0, 0.0, 0.0]);
    c.set_uniform("uTime", 1.5f32);
    assert_eq!(
        c.uniform("uColorMask"),
        Some(UniformVariable::Vector4f([0.0, 0.0, 0.0, 0.0]))
    );
    assert_eq!(c.uniform("uTime"), Some(UniformVariable::F32(1.5)));

    fill(&c, Color::red());
    assert_all(&c.pixels().unwrap(), [255, 0, 0, 255]);
}

#[test]
fn fragment_shader() {
    let (video, _) = video();
    let c = canvas(&video, 0.0, 0.0, 4.0, 4.0);
    c.set_uniform("uTime", 2.0f32);

    let handle = c.shader().handle();
    assert!(c.set_fragment_shader("not a shader").is_err());
    assert_eq!(c.shader().handle(), handle);
    assert_eq!(c.shader().fragment_source(), FRAGMENT_SHADER);

    let fs = "#version 330 core\nout vec4 fragColor;\nvoid main() { fragColor = vec4(1.0); }";
    c.set_fragment_shader(fs).unwrap();
    assert_ne!(c.shader().handle(), handle);
    assert_eq!(c.shader().fragment_source(), fs);
    assert_eq!(c.uniform("uTime"), Some(UniformVariable::F32(2.0)));

    // The software backend renders custom programs like the base one.
    fill(&c, Color::red());
    assert_all(&c.pixels().unwrap(), [255, 0, 0, 255]);
}

#[test]
fn smooth() {
    let (video, _) = video();
    let c = canvas(&video, 0.0, 0.0, 4.0, 4.0);
    assert!(!c.smooth());

    c.set_smooth(true);
    assert!(c.smooth());

    let pd = PictureData::new(Rect::new(0.0, 0.0, 2.0, 2.0));
    let cp = c.make_picture(&pd).unwrap();
    let ct = c.make_triangles(&Sprite::new(pd.rect).triangles(Affine::IDENTITY, Color::white()));
    cp.draw(&ct);

    assert!(cp.picture().texture().smooth().unwrap());
}

#[test]
fn resources_are_released() {
    let (video, _) = video();

    {
        let c = canvas(&video, 0.0, 0.0, 4.0, 4.0);
        fill(&c, Color::red());
        c.set_bounds(Rect::new(0.0, 0.0, 8.0, 8.0)).unwrap();
        assert_eq!(video.textures_len(), 1);
    }

    assert_eq!(video.textures_len(), 0);
    assert_eq!(video.meshes_len(), 0);
}
