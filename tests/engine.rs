use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use tableau::scene::BoundMaterial;
use tableau::{
    Engine, EngineConfig, EngineError, HeadlessRenderer, InputEvent, KeyCode, OverlayMaterial,
    RenderCall, Scene, SceneId, SoundError, Sounds, Texture, Transition, TransitionRequest,
    TransitionState, Vec2, Viewport,
};

#[derive(Clone, Default)]
struct RecordingSounds {
    played: Rc<RefCell<Vec<String>>>,
}

impl Sounds for RecordingSounds {
    fn load_sound(&mut self, _name: &str, _path: &Path, _looping: bool) -> Result<(), SoundError> {
        Ok(())
    }

    fn play_sound(&mut self, name: &str, _volume: f32) -> Result<(), SoundError> {
        self.played.borrow_mut().push(name.to_string());
        Ok(())
    }

    fn play_background(&mut self, _name: &str, _volume: f32) -> Result<(), SoundError> {
        Ok(())
    }

    fn stop_all_background(&mut self) {}
}

#[derive(Default)]
struct Counts {
    init: Rc<RefCell<u32>>,
    enter: Rc<RefCell<u32>>,
}

fn counted(name: &str) -> (Scene, Counts) {
    let counts = Counts::default();
    let init = Rc::clone(&counts.init);
    let enter = Rc::clone(&counts.enter);
    let scene = Scene::builder(name)
        .on_init(move |_, _| {
            *init.borrow_mut() += 1;
            Ok(())
        })
        .on_enter(move |_, _| {
            *enter.borrow_mut() += 1;
            Ok(())
        })
        .build();
    (scene, counts)
}

fn engine() -> (Engine<HeadlessRenderer>, RecordingSounds) {
    let sounds = RecordingSounds::default();
    let engine = Engine::new(
        EngineConfig::new(),
        HeadlessRenderer::new(Viewport::new(800, 600)),
        Box::new(sounds.clone()),
    );
    (engine, sounds)
}

fn settle(engine: &mut Engine<HeadlessRenderer>) -> u32 {
    let mut frames = 0;
    while engine.registry().is_transitioning() && frames < 600 {
        engine.tick(1.0 / 60.0).unwrap();
        frames += 1;
    }
    assert!(!engine.registry().is_transitioning(), "transition never finished");
    frames
}

fn current(engine: &Engine<HeadlessRenderer>) -> Option<&str> {
    engine.registry().current().map(SceneId::as_str)
}

#[test]
fn fade_switches_and_detaches_the_overlay() {
    let (mut engine, _) = engine();
    engine.register(Scene::builder("hall").build());
    engine.register(Scene::builder("gallery").build());
    assert_eq!(engine.start().unwrap(), SceneId::new("hall"));

    let fade = Transition::fade(Duration::from_millis(200));
    assert_eq!(engine.go_to("gallery", Some(fade)), TransitionRequest::Started);
    settle(&mut engine);

    assert_eq!(current(&engine), Some("gallery"));
    assert_eq!(engine.registry().state(), TransitionState::Idle);
    assert!(!engine.registry().overlay().unwrap().is_attached());

    let calls = engine.renderer().calls();
    assert!(calls.iter().any(|call| matches!(
        call,
        RenderCall::Render {
            overlay: Some(OverlayMaterial::Fade(_))
        }
    )));
    engine.tick(1.0 / 60.0).unwrap();
    assert_eq!(
        engine.renderer().calls().last(),
        Some(&RenderCall::Render { overlay: None })
    );
}

#[test]
fn glitch_leaves_the_fade_material_bound() {
    let (mut engine, _) = engine();
    engine.register(Scene::builder("hall").build());
    engine.register(Scene::builder("void").build());
    engine.start().unwrap();

    engine.go_to("void", Some(Transition::glitch(Duration::from_millis(150))));
    settle(&mut engine);

    assert_eq!(current(&engine), Some("void"));
    let overlay = engine.registry().overlay().unwrap();
    assert_eq!(overlay.bound(), BoundMaterial::Fade);
    assert!(!overlay.is_attached());
    assert_eq!(engine.renderer().live_captures(), 0);
    assert!(engine.renderer().calls().iter().any(|call| matches!(
        call,
        RenderCall::Render {
            overlay: Some(OverlayMaterial::Glitch(_))
        }
    )));
}

#[test]
fn repeated_requests_perform_one_transition() {
    let (mut engine, _) = engine();
    engine.register(
        Scene::builder("hall")
            .on_update(|_, ctx, _| ctx.go_to("gallery"))
            .build(),
    );
    let (gallery, counts) = counted("gallery");
    engine.register(gallery);
    engine.start().unwrap();

    // The hall keeps asking every tick until it's gone.
    engine.tick(1.0 / 60.0).unwrap();
    assert_eq!(engine.registry().pending_target(), Some(&SceneId::new("gallery")));
    settle(&mut engine);

    assert_eq!(current(&engine), Some("gallery"));
    assert_eq!(*counts.init.borrow(), 1);
    assert_eq!(*counts.enter.borrow(), 1);
}

#[test]
fn conflicting_request_is_rejected() {
    let (mut engine, _) = engine();
    engine.register(Scene::builder("hall").build());
    let (gallery, _) = counted("gallery");
    let (void, void_counts) = counted("void");
    engine.register(gallery);
    engine.register(void);
    engine.start().unwrap();

    assert_eq!(engine.go_to("gallery", None), TransitionRequest::Started);
    engine.tick(1.0 / 60.0).unwrap();
    assert_eq!(engine.go_to("gallery", None), TransitionRequest::Duplicate);
    assert_eq!(engine.go_to("void", None), TransitionRequest::Rejected);
    settle(&mut engine);

    assert_eq!(current(&engine), Some("gallery"));
    assert_eq!(*void_counts.enter.borrow(), 0);
}

#[test]
fn renderer_failure_still_lands_on_the_target() {
    let (mut engine, _) = engine();
    engine.register(Scene::builder("hall").build());
    engine.register(Scene::builder("void").build());
    engine.start().unwrap();

    engine.renderer_mut().fail_captures(true);
    engine.go_to("void", Some(Transition::glitch(Duration::from_millis(300))));
    settle(&mut engine);
    assert_eq!(current(&engine), Some("void"));
    assert_eq!(engine.registry().pending_target(), None);

    engine.renderer_mut().fail_captures(false);
    assert_eq!(engine.go_to("hall", None), TransitionRequest::Started);
    settle(&mut engine);
    assert_eq!(current(&engine), Some("hall"));
}

#[test]
fn init_runs_once_across_round_trips() {
    let (mut engine, _) = engine();
    let (hall, hall_counts) = counted("hall");
    engine.register(hall);
    engine.register(Scene::builder("gallery").build());
    engine.start().unwrap();

    for target in ["gallery", "hall", "gallery", "hall"] {
        engine.go_to(target, Some(Transition::fade(Duration::from_millis(30))));
        settle(&mut engine);
    }

    assert_eq!(*hall_counts.init.borrow(), 1);
    assert_eq!(*hall_counts.enter.borrow(), 3);
}

#[test]
fn clicks_reach_the_scene_through_opaque_pixels() {
    let (mut engine, sounds) = engine();
    let door = Arc::new(Texture::solid("door", 2, 2, [255, 255, 255, 255]));
    engine.register(
        Scene::builder("hall")
            .on_init(move |graph, _| {
                graph.node("door").sprite(Arc::clone(&door), Vec2::splat(2.0)).spawn();
                Ok(())
            })
            .on_click(|graph, ctx, hits| {
                if graph.name(hits[0].entity).as_deref() == Some("door") {
                    ctx.go_to("gallery");
                }
            })
            .build(),
    );
    engine.register(Scene::builder("gallery").build());
    engine.start().unwrap();

    // Miss: the sound still plays, nothing else happens.
    engine.handle(InputEvent::Click(Vec2::new(5.0, 5.0)));
    assert_eq!(*sounds.played.borrow(), vec!["ui-click".to_string()]);
    assert!(!engine.registry().is_transitioning());

    engine.handle(InputEvent::PointerMoved(Vec2::new(400.0, 300.0)));
    assert!(engine.dispatcher().is_hovering());

    engine.handle(InputEvent::Click(Vec2::new(400.0, 300.0)));
    assert_eq!(sounds.played.borrow().len(), 2);
    assert_eq!(engine.registry().pending_target(), Some(&SceneId::new("gallery")));
    assert_eq!(engine.dispatcher().rings().len(), 1);

    settle(&mut engine);
    assert_eq!(current(&engine), Some("gallery"));
    // The cursor followed the scene change.
    let cursor = engine.cursor().borrow();
    assert_eq!(cursor.attached_to(), Some(&SceneId::new("gallery")));
}

#[test]
fn debug_overlay_switches_and_remembers() {
    let (mut engine, _) = engine();
    engine.register(Scene::builder("intro").build());
    engine.register(Scene::builder("hall").build());
    engine.start().unwrap();

    engine.handle(InputEvent::KeyDown(KeyCode::Digit2));
    assert!(!engine.registry().is_transitioning());

    engine.handle(InputEvent::KeyDown(KeyCode::Backquote));
    assert!(engine.debug_summary().is_some());
    engine.handle(InputEvent::KeyDown(KeyCode::Digit2));
    assert_eq!(engine.registry().pending_target(), Some(&SceneId::new("hall")));
    settle(&mut engine);

    assert_eq!(engine.prefs().preferred_scene(), Some(SceneId::new("hall")));
    let summary = engine.debug_summary().unwrap();
    assert!(summary.contains("2 hall*+"));
}

#[test]
fn start_prefers_the_saved_scene() {
    let (mut engine, _) = engine();
    engine.register(Scene::builder("intro").build());
    engine.register(Scene::builder("hall").build());
    engine
        .prefs_mut()
        .set_preferred_scene(&SceneId::new("hall"))
        .unwrap();
    assert_eq!(engine.start().unwrap(), SceneId::new("hall"));

    let (mut engine, _) = engine_with(EngineConfig::new().initial_scene("hall"));
    engine.register(Scene::builder("intro").build());
    engine.register(Scene::builder("hall").build());
    engine
        .prefs_mut()
        .set_preferred_scene(&SceneId::new("removed"))
        .unwrap();
    assert_eq!(engine.start().unwrap(), SceneId::new("hall"));
}

fn engine_with(config: EngineConfig) -> (Engine<HeadlessRenderer>, RecordingSounds) {
    let sounds = RecordingSounds::default();
    let engine = Engine::new(
        config,
        HeadlessRenderer::new(Viewport::new(800, 600)),
        Box::new(sounds.clone()),
    );
    (engine, sounds)
}

#[test]
fn starting_without_scenes_fails() {
    let (mut engine, _) = engine();
    assert!(matches!(engine.start(), Err(EngineError::NoScenes)));
}

#[test]
fn dispose_shows_the_os_cursor() {
    let (mut engine, _) = engine();
    engine.register(Scene::builder("hall").build());
    engine.start().unwrap();
    assert!(engine.dispose());
    assert!(engine.dispatcher().is_disposed());
    let graph = engine.registry().scene("hall").unwrap().graph();
    assert!(graph.find("cursor").is_none());
}

fn hall_with(nodes: usize) -> Scene {
    let texture = Arc::new(Texture::solid("tile", 2, 2, [255, 255, 255, 255]));
    Scene::builder("hall")
        .on_init(move |graph, _| {
            for i in 0..nodes {
                graph
                    .node(format!("n{}", i))
                    .sprite(Arc::clone(&texture), Vec2::splat(2.0))
                    .spawn();
            }
            Ok(())
        })
        .build()
}

#[test]
fn replacing_a_scene_forgets_rings_in_its_old_graph() {
    let (mut engine, _) = engine();
    engine.register(hall_with(1));
    engine.start().unwrap();
    engine.handle(InputEvent::Click(Vec2::new(400.0, 300.0)));
    assert_eq!(engine.dispatcher().rings().len(), 1);

    engine.register(hall_with(4));
    engine.go_to("hall", Some(Transition::fade(Duration::from_millis(20))));
    for _ in 0..60 {
        engine.tick(1.0 / 60.0).unwrap();
    }

    let graph = engine.registry().scene("hall").unwrap().graph();
    for i in 0..4 {
        assert!(graph.find(&format!("n{}", i)).is_some(), "n{} is gone", i);
    }
    assert!(graph.find("cursor").is_some());
    assert!(engine.dispatcher().rings().is_empty());
}
