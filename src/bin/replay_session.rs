use std::env;
use std::fs;
use surface_placement::gesture::TouchPoint;
use surface_placement::spatial::{Pose, Vec3};
use surface_placement::{CatalogConfig, EngineConfig, InputEvent, InputOutcome};

fn main() {
    if let Err(err) = run() {
        eprintln!("[replay] error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let catalog = match env::args().nth(1) {
        Some(path) => CatalogConfig::from_json_str(&fs::read_to_string(&path)?)?,
        None => CatalogConfig::furniture(),
    };

    let mut frames = surface_placement::simulated(EngineConfig::default(), &catalog);
    let session = frames.start_session()?;
    frames
        .host_mut()
        .set_surface_pose(Some(Pose::from_position(Vec3::new(0.5, 0.0, -1.0))));
    frames.run(3);

    let mut outcomes = vec![frames.handle_input(InputEvent::PrimarySelect)];

    let drag = |x: f32| vec![TouchPoint::new(0, [x, 0.0])];
    outcomes.push(frames.handle_input(InputEvent::TouchStart { touches: drag(0.0) }));
    for step in 1..=4 {
        let touches = drag(step as f32 * 25.0);
        outcomes.push(frames.handle_input(InputEvent::TouchMove { touches }));
        frames.frame(1.0 / 60.0);
    }
    outcomes.push(frames.handle_input(InputEvent::TouchEnd { touches: Vec::new() }));

    let pinch = |spread: f32| {
        vec![
            TouchPoint::new(1, [0.0, 0.0]),
            TouchPoint::new(2, [spread, 0.0]),
        ]
    };
    outcomes.push(frames.handle_input(InputEvent::TouchStart { touches: pinch(100.0) }));
    outcomes.push(frames.handle_input(InputEvent::TouchMove { touches: pinch(150.0) }));
    outcomes.push(frames.handle_input(InputEvent::TouchEnd { touches: Vec::new() }));
    outcomes.push(frames.handle_input(InputEvent::DoubleActivate));

    frames.host_mut().end_session();
    frames.end_session(session);

    let applied = outcomes
        .iter()
        .filter(|outcome| **outcome != InputOutcome::Ignored)
        .count();
    println!(
        "[replay] {} frames, {} of {} inputs applied, stats {:?}",
        frames.stats().frames,
        applied,
        outcomes.len(),
        frames.stats()
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&frames.context().registry.snapshot())?
    );
    Ok(())
}
