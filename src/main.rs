//! River Runner headless entry point
//!
//! Flies the autopilot through one run at a fixed 60 Hz step and logs the
//! outcome. Usage: `river-runner [tuning.json] [max_frames]`

#[cfg(not(target_arch = "wasm32"))]
use river_runner::{
    Tuning,
    consts::FRAME_DT,
    sim::{GameEvent, GamePhase, GameSession, autopilot},
};

/// Two minutes of flight
#[cfg(not(target_arch = "wasm32"))]
const DEFAULT_MAX_FRAMES: u64 = 60 * 120;

#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    log::info!("River Runner (headless) starting...");

    let mut args = std::env::args().skip(1);
    let tuning = match args.next() {
        Some(path) => Tuning::load(&path)?,
        None => Tuning::default(),
    };
    let max_frames = match args.next() {
        Some(frames) => frames.parse()?,
        None => DEFAULT_MAX_FRAMES,
    };

    let mut session = GameSession::new(tuning);
    let mut pickups = 0usize;
    let mut cause = None;

    while session.frame() < max_frames && session.phase() == GamePhase::Flying {
        let input = autopilot(&session);
        session.tick(&input, FRAME_DT);

        for event in session.drain_events() {
            match event {
                GameEvent::FuelCollected { .. } => pickups += 1,
                GameEvent::GameOver { cause: c, .. } => cause = Some(c),
                _ => {}
            }
        }

        if session.frame() % 600 == 0 {
            log::debug!(
                "frame {}: z={:.1} speed={:.2} fuel={:.1} obstacles={} pickups={}",
                session.frame(),
                session.craft().position.z,
                session.craft().speed,
                session.fuel(),
                session.pools().obstacles().active_count(),
                session.pools().pickups().active_count()
            );
        }
    }

    match cause {
        Some(cause) => log::info!(
            "Run ended after {} frames: {:?}, score {}, {} pickups",
            session.frame(),
            cause,
            session.score(),
            pickups
        ),
        None => log::info!(
            "Survived {} frames: score {}, fuel {:.1}, {} pickups",
            session.frame(),
            session.score(),
            session.fuel(),
            pickups
        ),
    }

    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // No headless runner in the browser; the library is driven by the host page
}
