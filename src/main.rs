use std::sync::Arc;
use std::time::Duration;

use image::{ImageBuffer, Rgba};
use tableau::{
    Color, EngineConfig, EngineError, KeyCode, Model, Quat, Scene, Texture, Transition, Vec2, Vec3,
};

/// Soft-edged disc: opaque in the middle, fully transparent outside.
fn orb_texture() -> Texture {
    const SIZE: u32 = 128;
    let image = ImageBuffer::from_fn(SIZE, SIZE, |x, y| {
        let center = SIZE as f32 / 2.0;
        let d = Vec2::new(x as f32 + 0.5 - center, y as f32 + 0.5 - center).length() / center;
        let alpha = ((1.0 - d) * 4.0).clamp(0.0, 1.0);
        Rgba([240, 200, 120, (alpha * 255.0) as u8])
    });
    Texture::from_image("orb", image)
}

fn intro() -> Scene {
    let orb = Arc::new(orb_texture());
    Scene::builder("intro")
        .on_init(move |graph, _| {
            graph
                .node("orb")
                .sprite(Arc::clone(&orb), Vec2::splat(2.0))
                .spawn();
            graph
                .node("backdrop")
                .solid_box(Vec3::new(12.0, 8.0, 0.1), Color::rgb(0.05, 0.05, 0.08))
                .at(Vec3::new(0.0, 0.0, -2.0))
                .role(tableau::Role::Background)
                .spawn();
            Ok(())
        })
        .on_enter(|_, ctx| {
            if let Err(err) = ctx.sounds.play_background("ambience", 0.4) {
                log::debug!("no ambience: {}", err);
            }
            Ok(())
        })
        .on_exit(|_, ctx| {
            ctx.sounds.stop_all_background();
            Ok(())
        })
        .on_click(|graph, ctx, hits| {
            if graph.name(hits[0].entity).as_deref() == Some("orb") {
                ctx.transition_to("gallery", Transition::glitch(Duration::from_millis(700)));
            }
        })
        .build()
}

fn gallery() -> Scene {
    Scene::builder("gallery")
        .on_init(|graph, _| {
            for (i, x) in [-2.5f32, 0.0, 2.5].into_iter().enumerate() {
                graph
                    .node(format!("plinth-{}", i))
                    .solid_box(Vec3::new(1.0, 0.6, 1.0), Color::rgb(0.6, 0.6, 0.65))
                    .at(Vec3::new(x, -1.3, 0.0))
                    .spawn();
            }
            graph
                .node("statue")
                .model(Arc::new(Model::cube()), Color::rgb(0.8, 0.5, 0.3))
                .at(Vec3::new(0.0, 0.0, 0.0))
                .spawn();
            Ok(())
        })
        .on_update(|graph, _, dt| {
            if let Some(statue) = graph.find("statue") {
                if let Some(mut transform) = graph.transform(statue) {
                    transform.rotation = Quat::from_rotation_y(dt * 0.6) * transform.rotation;
                    graph.set_transform(statue, transform);
                }
            }
        })
        .on_click(|_, ctx, _| {
            ctx.transition_to(
                "intro",
                Transition::fade_to_color(Color::rgb(0.02, 0.02, 0.04), Duration::from_millis(400)),
            );
        })
        .build()
}

fn main() -> Result<(), EngineError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = EngineConfig::new()
        .title("Tableau")
        .size(1280, 720)
        .debug_key(KeyCode::Backquote)
        .preferences("tableau-prefs.json");

    tableau::run(config, |engine| {
        let root = engine.config().asset_root.clone();
        for (name, file, looping) in [("ui-click", "sfx/click.ogg", false), ("ambience", "sfx/ambience.ogg", true)] {
            let path = root.join(file);
            if let Err(err) = engine.sounds_mut().load_sound(name, &path, looping) {
                log::warn!("{}", err);
            }
        }

        engine.register(intro());
        engine.register(gallery());
    })
}
