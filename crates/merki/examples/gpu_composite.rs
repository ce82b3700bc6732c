//! Same scene as `composite_headless`, drawn by the wgpu backend.
//!
//! Pass a path to a `.wgsl` file to load the composite program from disk
//! instead of the built-in one. A broken program disables the compositor
//! and the example says so.

use merki::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let program = match std::env::args().nth(1) {
        Some(path) => ProgramSource::File(path.into()),
        None => ProgramSource::Builtin,
    };

    let backend = GpuBackend::headless(ReferenceMaps::ground_plane(512, 4.0))?.with_program(program);
    let mut compositor = Compositor::new(
        backend,
        CompositorConfig {
            resolution: 512,
            ..Default::default()
        },
    );
    if let Err(e) = compositor.initialize() {
        eprintln!("compositor disabled: {e}");
        return Ok(());
    }

    let checker = DecalImage::from_rgba8(
        2,
        2,
        vec![
            255, 255, 255, 255, 30, 30, 30, 255, //
            30, 30, 30, 255, 255, 255, 255, 255,
        ],
    )?;
    let checker = compositor.add_texture(&checker)?;

    compositor.register(
        DecalRecord::new("checker")
            .with_texture(checker)
            .with_position(Vec3::new(0.0, 0.5, 0.0))
            .with_size(2.0, 2.0),
    );
    compositor.register(
        DecalRecord::new("tinted")
            .with_texture(checker)
            .with_position(Vec3::new(0.8, 0.5, 0.8))
            .with_size(1.0, 1.0)
            .with_tint(Color::rgba(1.0, 0.5, 0.2, 1.0))
            .with_blend_mode(BlendMode::Additive),
    );
    compositor.process_frame();

    let path = std::env::temp_dir().join("decal_layer_gpu.png");
    compositor.read_output()?.save_png(&path)?;
    println!("wrote {}", path.display());
    Ok(())
}
