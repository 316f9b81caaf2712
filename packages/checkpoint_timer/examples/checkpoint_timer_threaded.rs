//! Records phase timings from several worker threads and prints the full report.
//!
//! Each worker hits checkpoint 0 once, then per loop checkpoints 1, 2 and (after sleeping and
//! doing a little work) 3, and finally checkpoint 4.
//!
//! Usage: `cargo run --example checkpoint_timer_threaded -- -t 4 -s 200 -l 50 -b`

use std::error::Error;
use std::hint::black_box;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use argh::FromArgs;
use checkpoint_timer::{Engine, ReportOptions};
use tracing::Level;

/// A simple threaded application that records checkpoints on every worker thread.
#[derive(FromArgs)]
struct Args {
    /// number of worker threads to create
    #[argh(option, short = 't', default = "3")]
    threads: usize,

    /// time in microseconds to sleep in each loop
    #[argh(option, short = 's', default = "500")]
    sleep_micros: u64,

    /// number of loops per worker thread
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

    println!(
        "The threads should take at least (loops * sleep) = ({} * {:?}) = {:?} of wall clock time",
        args.loops,
        sleep_time,
        sleep_time.saturating_mul(args.loops)
    );

    let engine = Arc::new(
        Engine::builder()
            .max_contexts(args.threads)
            .locking(args.locking)
            .build(),
    );

    let start = Instant::now();

    let workers = (0..args.threads)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || worker(&engine, args.loops, sleep_time))
        })
        .collect::<Vec<_>>();

    for handle in workers {
        handle.join().map_err(|_| "worker thread panicked")??;
    }

    println!("Workers finished after {:?}", start.elapsed());
    println!();

    engine.report(&mut std::io::stdout(), &ReportOptions::all())?;
    engine.destroy()?;

    Ok(())
}

fn worker(engine: &Engine, loops: u32, sleep_time: Duration) -> checkpoint_timer::Result<()> {
    engine.checkpoint(0)?;

    for _ in 0..loops {
        engine.checkpoint(1)?;
        engine.checkpoint(2)?;

        thread::sleep(sleep_time);
        black_box((0..10_000_u64).map(|x| x.wrapping_mul(x)).sum::<u64>());

        engine.checkpoint(3)?;
    }

    engine.checkpoint(4)
}
