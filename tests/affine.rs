extern crate glcanvas;
extern crate rand;

use glcanvas::prelude::*;
use rand::Rng;

fn random_affine<R: Rng>(rng: &mut R) -> Affine {
    let mut m = [0.0; 6];
    for v in &mut m {
        *v = rng.gen_range(-10.0, 10.0);
    }

    Affine(m)
}

#[test]
fn expansion() {
    let mut rng = rand::thread_rng();

    for _ in 0..100 {
        let m = random_affine(&mut rng);
        let mat = m.to_matrix3();
        assert_eq!(mat.row(2), Vector3::new(0.0, 0.0, 1.0));

        let p = Vector2::new(rng.gen_range(-10.0, 10.0), rng.gen_range(-10.0, 10.0));
        let expected = m.project(p);
        let v = mat * Vector3::new(p.x, p.y, 1.0);
        assert!((v.x - expected.x).abs() < 1e-3);
        assert!((v.y - expected.y).abs() < 1e-3);
        assert_eq!(v.z, 1.0);
    }
}

#[test]
fn canvas_transform() {
    let (video, _) = VideoSystem::immediate(VideoParams::default());
    let canvas = Canvas::new(&video, Rect::new(0.0, 0.0, 4.0, 4.0)).unwrap();

    let mut rng = rand::thread_rng();
    let m = random_affine(&mut rng);
    canvas.set_matrix(m);

    assert_eq!(canvas.matrix(), m);
    assert_eq!(canvas.render_state().transform, m.to_matrix3());
    assert_eq!(canvas.render_state().transform.row(2), Vector3::new(0.0, 0.0, 1.0));
}
