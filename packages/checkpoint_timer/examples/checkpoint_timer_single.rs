//! Records phase timings in single-context mode, without any threads.
//!
//! Prints the full report, then renders a minimal report into a string, destroys the engine and
//! prints the string to show that rendered output outlives the engine data.
//!
//! Usage: `cargo run --example checkpoint_timer_single -- -s 200 -l 50`

use std::error::Error;
use std::hint::black_box;
use std::thread;
use std::time::Duration;

use argh::FromArgs;
use checkpoint_timer::{Engine, ReportOptions};
use tracing::Level;

/// A simple single-threaded application that records checkpoints in single-context mode.
#[derive(FromArgs)]
struct Args {
    /// time in microseconds to sleep in each loop
    #[argh(option, short = 's', default = "500")]
    sleep_micros: u64,

    /// number of loops
    #[argh(option, short = 'l', default = "10")]
    loops: u32,

    /// serialize slot updates and reports with a mutex
    #[argh(switch, short = 'b')]
    locking: bool,
}

fn main() -> Result<(), Box<dyn Error + Send + Sync + 'static>> {
    tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();

    let args: Args = argh::from_env();
    let sleep_time = Duration::from_micros(args.sleep_micros);

    println!("SleepTime [{sleep_time:?}]");

    let engine = Engine::builder()
        .max_contexts(0)
        .locking(args.locking)
        .build();

    engine.checkpoint(0)?;

    for _ in 0..args.loops {
        engine.checkpoint(1)?;
        engine.checkpoint(2)?;

        thread::sleep(sleep_time);
        black_box((0..10_000_u64).map(|x| x.wrapping_mul(x)).sum::<u64>());

        engine.checkpoint(3)?;
    }

    engine.checkpoint(4)?;

    engine.report(&mut std::io::stdout(), &ReportOptions::all())?;

    let mut minimal = Vec::new();
    engine.report(&mut minimal, &ReportOptions::minimal())?;
    let minimal = String::from_utf8(minimal)?;

    engine.destroy()?;

    println!();
    println!("Minimal report rendered before destroying the engine:");
    print!("{minimal}");

    Ok(())
}
