//! End-to-end flows: pointer → gizmo → decal source → adapter → compositor →
//! layer texels, all on the software backend.

use std::cell::RefCell;
use std::rc::Rc;

use merki::prelude::*;

const RES: u32 = 32;
const EXTENT: f32 = 4.0;

fn shared_compositor() -> SharedCompositor {
    let mut compositor = Compositor::new(
        SoftwareBackend::new(ReferenceMaps::ground_plane(RES, EXTENT)),
        CompositorConfig {
            resolution: RES,
            ..Default::default()
        },
    );
    compositor.initialize().unwrap();
    Rc::new(RefCell::new(compositor))
}

fn red_source(compositor: &SharedCompositor) -> DecalSource {
    let texture = compositor
        .borrow_mut()
        .add_texture(&DecalImage::solid(4, 4, [255, 0, 0, 255]))
        .unwrap();
    let mut source = DecalSource::new("red");
    source.set_position(Vec3::new(0.0, 0.5, 0.0));
    source.set_size(Vec2::new(1.0, 1.0));
    source.set_depth(1.0);
    source.set_texture(Some(texture));
    source
}

/// Layer texel covering world point (x, 0, z) of the ground plane.
fn texel_at(layer: &FloatImage, x: f32, z: f32) -> Vec4 {
    let u = x / EXTENT + 0.5;
    let v = z / EXTENT + 0.5;
    let px = ((u * RES as f32) as u32).min(RES - 1);
    let py = ((v * RES as f32) as u32).min(RES - 1);
    layer.get(px, py).unwrap()
}

fn is_red(texel: Vec4) -> bool {
    texel.x > 0.9 && texel.y < 0.1 && texel.w > 0.9
}

fn pointer_over(camera: &Camera, world: Vec3) -> Pointer {
    let mut pointer = Pointer::new();
    let screen = camera.world_to_screen(world).unwrap();
    pointer.move_to(screen.x, screen.y);
    pointer
}

fn move_over(pointer: &mut Pointer, camera: &Camera, world: Vec3) {
    let screen = camera.world_to_screen(world).unwrap();
    pointer.move_to(screen.x, screen.y);
}

#[test]
fn several_changes_in_one_frame_recomposite_once() {
    let compositor = shared_compositor();
    let mut c = compositor.borrow_mut();
    let texture = c.add_texture(&DecalImage::solid(1, 1, [255; 4])).unwrap();
    for name in ["a", "b", "c"] {
        c.register(DecalRecord::new(name).with_texture(texture));
    }
    c.mark_dirty();
    c.mark_dirty();
    c.mark_dirty();

    assert!(c.process_frame());
    assert!(!c.process_frame(), "nothing changed since the last pass");
    assert_eq!(c.recomposite_count(), 1);
    assert_eq!(c.last_draw_count(), 3);
}

#[test]
fn adapter_pushes_source_edits_into_layer() {
    let compositor = shared_compositor();
    let mut source = red_source(&compositor);
    let mut adapter = BindingAdapter::new(CompositorSlot::with(compositor.clone()), &source);
    assert!(adapter.initialize(&mut source));

    compositor.borrow_mut().process_frame();
    let layer = compositor.borrow_mut().read_output().unwrap();
    assert!(is_red(texel_at(&layer, 0.0, 0.0)));
    assert_eq!(texel_at(&layer, 1.5, 1.5).w, 0.0);

    source.translate(Vec3::new(1.0, 0.0, 0.0));
    assert!(adapter.step(&mut source));
    assert!(!source.has_changes());
    assert!(!adapter.step(&mut source), "no change, no push");

    assert!(compositor.borrow_mut().process_frame());
    let layer = compositor.borrow_mut().read_output().unwrap();
    assert!(is_red(texel_at(&layer, 1.0, 0.0)));
    assert_eq!(texel_at(&layer, -0.3, 0.0).w, 0.0, "old footprint is cleared");
}

#[test]
fn gizmo_drag_moves_decal_in_layer() {
    let compositor = shared_compositor();
    let mut source = red_source(&compositor);
    let mut adapter = BindingAdapter::new(CompositorSlot::with(compositor.clone()), &source);
    adapter.initialize(&mut source);
    compositor.borrow_mut().process_frame();

    let camera = Camera::perspective(
        Transform::from_xyz(0.0, 6.0, 6.0).looking_at(Vec3::ZERO, Vec3::Y),
        60.0,
        Vec2::new(800.0, 600.0),
    );
    let mut gizmo = ManipulationGizmo::default();
    gizmo.sync_to(&camera, &source);
    let grab = source.position() + Vec3::X * 0.5 * gizmo.scale();

    let mut pointer = pointer_over(&camera, grab);
    pointer.buttons.press(MouseButton::Left);
    gizmo.step(&camera, &pointer, &mut source);
    assert_eq!(gizmo.active(), Some(HandleAxis::X));
    pointer.end_frame();

    move_over(&mut pointer, &camera, grab + Vec3::X);
    gizmo.step(&camera, &pointer, &mut source);
    assert!((source.position() - Vec3::new(1.0, 0.5, 0.0)).length() < 1e-3, "got {}", source.position());

    pointer.buttons.release(MouseButton::Left);
    gizmo.step(&camera, &pointer, &mut source);
    assert!(!gizmo.is_dragging());

    adapter.step(&mut source);
    let mut c = compositor.borrow_mut();
    let record = c.get(adapter.id()).unwrap();
    assert!((record.world_position - source.position()).length() < 1e-6);
    assert!(c.process_frame());
    assert_eq!(c.recomposite_count(), 2);
    let layer = c.read_output().unwrap();
    assert!(is_red(texel_at(&layer, 1.0, 0.0)));
}

#[test]
fn gizmo_rotation_turns_decal_about_world_axis() {
    let compositor = shared_compositor();
    let mut source = red_source(&compositor);
    let mut adapter = BindingAdapter::new(CompositorSlot::with(compositor.clone()), &source);
    adapter.initialize(&mut source);

    let camera = Camera::perspective(
        Transform::from_xyz(0.0, 6.0, 6.0).looking_at(Vec3::ZERO, Vec3::Y),
        60.0,
        Vec2::new(800.0, 600.0),
    );
    let mut gizmo = ManipulationGizmo::default();
    gizmo.set_mode(GizmoMode::Rotation);
    gizmo.sync_to(&camera, &source);
    let s = gizmo.scale();
    let center = source.position();
    // Grab the Y ring on the camera's side so no other ring is in front.
    let on_ring = |degrees: f32| {
        let r = degrees.to_radians();
        center + Vec3::new(r.cos(), 0.0, -r.sin()) * s
    };

    let mut pointer = pointer_over(&camera, on_ring(-30.0));
    pointer.buttons.press(MouseButton::Left);
    gizmo.step(&camera, &pointer, &mut source);
    assert_eq!(gizmo.active(), Some(HandleAxis::Y));
    pointer.end_frame();

    move_over(&mut pointer, &camera, on_ring(-120.0));
    gizmo.step(&camera, &pointer, &mut source);

    // Still projecting straight down, footprint turned a quarter turn.
    assert!(source.direction().dot(Vec3::NEG_Y) > 0.999);
    assert!(source.right().dot(Vec3::X).abs() < 1e-3, "right is now {}", source.right());
    assert!(gizmo.arc().is_some());

    adapter.step(&mut source);
    let c = compositor.borrow();
    let record = c.get(adapter.id()).unwrap();
    assert!((record.up_vector - source.up()).length() < 1e-5);
}

#[test]
fn resize_drag_grows_decal_and_syncs() {
    let compositor = shared_compositor();
    let mut source = red_source(&compositor);
    let mut adapter = BindingAdapter::new(CompositorSlot::with(compositor.clone()), &source);
    adapter.initialize(&mut source);
    compositor.borrow_mut().process_frame();

    // Straight down, so the whole footprint sits at one view depth.
    let camera = Camera::perspective(
        Transform::from_xyz(0.0, 6.0, 0.0).looking_at(Vec3::ZERO, Vec3::NEG_Z),
        60.0,
        Vec2::new(800.0, 600.0),
    );
    let mut resize = ResizeHandles::default();
    let handle = ResizeHandle::Right.position(&source);

    let mut pointer = pointer_over(&camera, handle);
    pointer.buttons.press(MouseButton::Left);
    assert!(!resize.step(&camera, &pointer, &mut source, &mut adapter));
    assert_eq!(resize.active(), Some(ResizeHandle::Right));
    pointer.end_frame();

    move_over(&mut pointer, &camera, handle + source.right() * 0.25);
    assert!(resize.step(&camera, &pointer, &mut source, &mut adapter));
    assert!((source.size().x - 1.5).abs() < 1e-3, "got {}", source.size());
    assert!((source.size().y - 1.0).abs() < 1e-6);

    let mut c = compositor.borrow_mut();
    assert!((c.get(adapter.id()).unwrap().size.x - 1.5).abs() < 1e-3);
    assert!(c.is_dirty());
    c.process_frame();
    let layer = c.read_output().unwrap();
    assert!(is_red(texel_at(&layer, 0.65, 0.0)));
    drop(c);

    pointer.buttons.release(MouseButton::Left);
    resize.step(&camera, &pointer, &mut source, &mut adapter);
    assert!(!resize.is_dragging());
}

#[test]
fn adapter_waits_for_disabled_compositor() {
    let compositor = Rc::new(RefCell::new(Compositor::new(
        SoftwareBackend::new(ReferenceMaps::ground_plane(RES, EXTENT)),
        CompositorConfig {
            resolution: 0,
            ..Default::default()
        },
    )));
    assert!(compositor.borrow_mut().initialize().is_err());
    assert!(compositor.borrow().is_disabled());

    let mut source = DecalSource::new("late");
    let mut adapter = BindingAdapter::new(CompositorSlot::with(compositor.clone()), &source);
    assert!(!adapter.initialize(&mut source));
    assert!(!adapter.step(&mut source));
    assert!(!adapter.is_registered());

    compositor.borrow_mut().set_resolution(RES).unwrap();
    assert!(adapter.step(&mut source));
    assert!(adapter.is_registered());
    assert!(compositor.borrow().contains(adapter.id()));
}

#[test]
fn replacement_compositor_picks_up_existing_adapters() {
    let first = shared_compositor();
    let slot = CompositorSlot::with(first.clone());
    let mut source = DecalSource::new("moved");
    let mut adapter = BindingAdapter::new(slot.clone(), &source);
    adapter.initialize(&mut source);
    assert!(first.borrow().contains(adapter.id()));

    let second = shared_compositor();
    slot.install(second.clone());
    assert!(!second.borrow().contains(adapter.id()));

    assert!(adapter.step(&mut source));
    assert!(second.borrow().contains(adapter.id()));
}
