//! Scripted pointer drags against a decal: move it with the translate arrow,
//! spin it with a rotation ring, then widen it with a resize handle. After
//! every frame the compositor re-composites only if something changed.
//!
//! Run with `RUST_LOG=debug` to watch the gizmo and compositor logs.

use merki::prelude::*;

struct Scene {
    camera: Camera,
    pointer: Pointer,
    source: DecalSource,
    gizmo: ManipulationGizmo,
    resize: ResizeHandles,
    adapter: BindingAdapter,
    compositor: SharedCompositor,
}

impl Scene {
    /// One host frame: resize handles get first pick, then the gizmo, then
    /// the adapter syncs and the compositor redraws if dirty.
    fn frame(&mut self) {
        self.resize
            .step(&self.camera, &self.pointer, &mut self.source, &mut self.adapter);
        if !self.resize.is_dragging() {
            self.gizmo.step(&self.camera, &self.pointer, &mut self.source);
        }
        self.adapter.step(&mut self.source);
        self.compositor.borrow_mut().process_frame();
        self.pointer.end_frame();

        for event in self.gizmo.drain_events() {
            println!("  {event:?}");
        }
    }

    /// Press at `from`, move to `to`, release. Both points are in world space.
    fn drag(&mut self, from: Vec3, to: Vec3) {
        let (Some(a), Some(b)) = (self.camera.world_to_screen(from), self.camera.world_to_screen(to)) else {
            println!("  drag point is off screen");
            return;
        };
        self.pointer.move_to(a.x, a.y);
        self.frame();
        self.pointer.buttons.press(MouseButton::Left);
        self.frame();
        for i in 1..=4 {
            let p = a.lerp(b, i as f32 / 4.0);
            self.pointer.move_to(p.x, p.y);
            self.frame();
        }
        self.pointer.buttons.release(MouseButton::Left);
        self.frame();
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let compositor: SharedCompositor = std::rc::Rc::new(std::cell::RefCell::new(Compositor::new(
        SoftwareBackend::new(ReferenceMaps::ground_plane(128, 8.0)),
        CompositorConfig {
            resolution: 128,
            ..Default::default()
        },
    )));
    compositor.borrow_mut().initialize()?;
    let texture = compositor
        .borrow_mut()
        .add_texture(&DecalImage::solid(8, 8, [255, 200, 0, 255]))?;

    let mut source = DecalSource::new("sticker");
    source.set_position(Vec3::new(0.0, 0.5, 0.0));
    source.set_size(Vec2::new(2.0, 2.0));
    source.set_depth(1.0);
    source.set_texture(Some(texture));

    let mut adapter = BindingAdapter::new(CompositorSlot::with(compositor.clone()), &source);
    adapter.initialize(&mut source);

    let mut scene = Scene {
        camera: Camera::perspective(
            Transform::from_xyz(0.0, 6.0, 6.0).looking_at(Vec3::ZERO, Vec3::Y),
            60.0,
            Vec2::new(1280.0, 720.0),
        ),
        pointer: Pointer::new(),
        source,
        gizmo: ManipulationGizmo::default(),
        resize: ResizeHandles::default(),
        adapter,
        compositor,
    };
    scene.frame();
    let s = scene.gizmo.scale();

    println!("translate along X by 1");
    let start = scene.source.position() + Vec3::X * 0.5 * s;
    scene.drag(start, start + Vec3::X);
    println!("  position now {}", scene.source.position());

    println!("rotate 45 degrees about Y");
    scene.gizmo.set_mode(GizmoMode::Rotation);
    scene.frame();
    let s = scene.gizmo.scale();
    let center = scene.source.position();
    let on_ring = |degrees: f32| {
        let r = degrees.to_radians();
        center + Vec3::new(r.cos(), 0.0, -r.sin()) * s
    };
    scene.drag(on_ring(-30.0), on_ring(-75.0));
    println!("  right vector now {}", scene.source.right());

    println!("widen with the right edge handle");
    let handle = ResizeHandle::Right.position(&scene.source);
    scene.drag(handle, handle + scene.source.right() * 0.5);
    println!("  size now {}", scene.source.size());

    let compositor = scene.compositor.borrow();
    println!(
        "{} re-composite(s) over the whole session, last one drew {} decal(s)",
        compositor.recomposite_count(),
        compositor.last_draw_count()
    );
    Ok(())
}
