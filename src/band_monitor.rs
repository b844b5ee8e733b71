use anyhow::Result;
use clap::Parser;
use log::info;

mod audio;
mod bands;
mod clock;

use audio::SpectrumSource;
use bands::BANDS;
use clock::Clock;

/// Terminal per-band level monitor: captures the microphone and prints the
/// same band parameters the windowed visualizer animates.
#[derive(Debug, Parser)]
#[command(name = "band-monitor", about = "Terminal per-band level monitor")]
struct Args {
    /// Animation clock step per refresh
    #[arg(long, default_value_t = 0.05)]
    step: f32,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    info!("Starting band monitor");

    let mut source = SpectrumSource::new();
    pollster::block_on(source.activate_microphone())?;
    info!("Microphone active; listening");

    let mut monitor_clock = Clock::new(args.step);

    loop {
        monitor_clock.forward();

        let levels: Vec<(usize, f32)> = {
            let snapshot = source.snapshot();
            BANDS
                .iter()
                .enumerate()
                .map(|(index, band)| {
                    let params =
                        bands::compute_band_params(band, index, snapshot, monitor_clock.value);
                    (index, params.amplitude)
                })
                .collect()
        };

        print!("\x1B[2J\x1B[1;1H"); // Clear screen and move cursor to top

        println!("freqwave band monitor");
        println!("=====================");
        println!();

        for (index, amplitude) in levels {
            // Amplitude spans roughly 65..175 px; scale into a 50-col bar.
            let bar = ((amplitude / 175.0) * 50.0) as usize;
            print!("{:>8} |", BANDS[index].name);
            for _ in 0..bar.min(50) {
                print!("█");
            }
            println!(" {:.1}", amplitude);
        }

        println!();
        println!("Press Ctrl+C to exit");
        std::thread::sleep(std::time::Duration::from_millis(50));
    }
}
