//! Composite two decals onto a flat ground plane with the software backend
//! and write the layer to `decal_layer.png` in the temp directory.
//!
//! Run with `RUST_LOG=debug` to see every re-composite.

use merki::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let reference = ReferenceMaps::ground_plane(256, 4.0);
    let material = MaterialProperties::new();
    let mut compositor = Compositor::new(
        SoftwareBackend::new(reference),
        CompositorConfig {
            resolution: 256,
            ..Default::default()
        },
    )
    .with_material(material.clone());
    compositor.initialize()?;

    let red = compositor.add_texture(&DecalImage::solid(16, 16, [220, 40, 40, 255]))?;
    let blue = compositor.add_texture(&DecalImage::solid(16, 16, [40, 80, 220, 200]))?;

    compositor.register(
        DecalRecord::new("red square")
            .with_texture(red)
            .with_position(Vec3::new(-0.4, 0.5, 0.0))
            .with_size(1.5, 1.5),
    );
    compositor.register(
        DecalRecord::new("blue stripe")
            .with_texture(blue)
            .with_position(Vec3::new(0.4, 0.5, 0.3))
            .with_size(2.5, 0.5)
            .with_opacity(0.8),
    );

    compositor.process_frame();
    println!(
        "composited {} decal(s), bound as {:?}",
        compositor.last_draw_count(),
        material.texture(&compositor.config().property_name)
    );

    let path = std::env::temp_dir().join("decal_layer.png");
    compositor.read_output()?.save_png(&path)?;
    println!("wrote {}", path.display());
    Ok(())
}
