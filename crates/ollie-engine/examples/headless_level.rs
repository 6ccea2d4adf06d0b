//! Headless level run -- loads a level, plays it without a window and prints
//! what happened.
//!
//! Run with:
//!   cargo run --example headless_level -p ollie-engine [-- <level.json> [ticks]]
//!
//! Without arguments a small built-in level is used. Set `RUST_LOG=debug`
//! to see the engine's tracing output.

use std::cell::Cell;
use std::rc::Rc;

use anyhow::Context;
use ollie_engine::prelude::*;

const BUILT_IN_LEVEL: &str = r##"{
    "width": 800,
    "height": 450,
    "background": "#87ceeb",
    "obstacles": [
        { "type": "obstacle_rectangle", "x": 300, "y": 0, "width": 40, "height": 180 },
        { "type": "obstacle_rectangle", "x": 300, "y": 300, "width": 40, "height": 150 },
        { "type": "obstacle_circle", "x": 520, "y": 225, "radius": 30 }
    ],
    "gates": [ { "x": 300, "y": 180, "width": 40, "height": 120 } ],
    "goals": [ { "x": 760, "y": 0, "width": 40, "height": 450 } ],
    "spawn": { "x": 60, "y": 200 }
}"##;

// ---------------------------------------------------------------------------
// Event tallies
// ---------------------------------------------------------------------------

fn tally(game: &mut Game, event: &str) -> Rc<Cell<u32>> {
    let count = Rc::new(Cell::new(0));
    let c = count.clone();
    game.on_global_event(event, move |_, _| c.set(c.get() + 1));
    count
}

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let level = match args.next() {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("reading level file {path}"))?,
        None => BUILT_IN_LEVEL.to_owned(),
    };
    let ticks: u64 = match args.next() {
        Some(n) => n.parse().with_context(|| format!("invalid tick count {n:?}"))?,
        None => 300,
    };

    let mut game = Game::new(GameConfig::default());
    let surface = RecordingSurface::new(game.world_size());
    game.add_canvas(Box::new(surface.clone()));

    let report = load_level(&level, &mut game);
    for error in &report.errors {
        eprintln!("level error: {error}");
    }
    println!("loaded {} objects", report.objects.len());

    let starts = tally(&mut game, "gameStart");
    let deaths = tally(&mut game, "playerDied");
    let gates = tally(&mut game, "gatePassed");
    let completions = tally(&mut game, "levelComplete");

    // Flap every 12 ticks so the bird makes some progress.
    game.start();
    for tick in 0..ticks {
        if tick % 12 == 0 {
            game.input_mut().key_down("Space");
        } else if tick % 12 == 1 {
            game.input_mut().key_up("Space");
        }
        game.tick();
        if game.animation_frame() {
            surface.take();
        }
    }
    game.render();

    let diagnostics = game.diagnostics();
    println!("ticks:        {}", game.tick_count());
    println!("runs started: {}", starts.get());
    println!("deaths:       {}", deaths.get());
    println!("gates passed: {}", gates.get());
    println!("completions:  {}", completions.get());
    println!("live objects: {}", diagnostics.object_count);
    println!("last frame:   {} draw commands", surface.len());

    let fingerprint = capture_level(&game).fingerprint();
    println!("level fingerprint: {fingerprint}");

    game.stop();
    Ok(())
}
