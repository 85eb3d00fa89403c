use bytesize::ByteSize;
use clap::{Parser, ValueEnum};
use copro::{Config, Engine, Idle, Region, memory::REGION_LEN, routing::ROUTES};
use eyre_pretty::{Context, Result, bail};
use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Target {
    Program,
    Data,
}

impl From<Target> for Region {
    fn from(value: Target) -> Self {
        match value {
            Target::Program => Region::Program,
            Target::Data => Region::Data,
        }
    }
}

fn parse_number(s: &str) -> std::result::Result<u32, std::num::ParseIntError> {
    let s = s.replace('_', "");
    match s.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

/// Runs a memory image on the DSP coprocessor subsystem with an idle core and reports what the
/// peripherals did.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Path to the image to load
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Region to load the image into
    #[arg(long, value_enum, default_value_t = Target::Program)]
    region: Target,
    /// Byte offset inside the region to load the image at
    #[arg(long, value_parser = parse_number, default_value = "0")]
    offset: u32,
    /// Steps to run
    #[arg(short, long, value_parser = parse_number, default_value = "1000")]
    cycles: u32,
    /// Period of timer 0, zero to leave it disabled
    #[arg(long, value_parser = parse_number, default_value = "0")]
    timer0: u32,
    /// Period of timer 1, zero to leave it disabled
    #[arg(long, value_parser = parse_number, default_value = "0")]
    timer1: u32,
    /// Transmit period of Btdmp 0, zero to leave it disabled
    #[arg(long, value_parser = parse_number, default_value = "0")]
    audio_period: u32,
    /// Words to send to the DSP through data slot 0 before running
    #[arg(long, value_parser = parse_number)]
    send: Vec<u32>,
}

fn setup_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("copro=info,coprun=info"));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(env_filter)
        .init();
}

fn main() -> Result<()> {
    eyre_pretty::install()?;
    setup_tracing();

    let args = Args::parse();
    let Ok(audio_period) = u16::try_from(args.audio_period) else {
        bail!("audio period {} does not fit in 16 bits", args.audio_period);
    };

    let frames = Arc::new(AtomicU64::new(0));
    let config = Config {
        ahbm: None,
        audio_callback: Some(Box::new({
            let frames = frames.clone();
            move |_| {
                frames.fetch_add(1, Ordering::Relaxed);
            }
        })),
    };

    let mut engine = Engine::new(Idle::default(), config);
    engine.reset();

    if let Some(input) = &args.input {
        let region = Region::from(args.region);
        let len = engine
            .memory_mut()
            .load_file(region, args.offset as usize, input)
            .context("loading input image")?;

        tracing::info!(
            "loaded {} into {region:?} at 0x{:X} ({} free)",
            ByteSize(len as u64).display(),
            args.offset,
            ByteSize((REGION_LEN - args.offset as usize - len) as u64).display(),
        );
    }

    let peripherals = engine.peripherals_mut();
    for (timer, period) in peripherals.timers.iter_mut().zip([args.timer0, args.timer1]) {
        if period != 0 {
            timer.start(period);
        }
    }

    if audio_period != 0 {
        peripherals.btdmp[0].set_transmit_period(audio_period);
        peripherals.btdmp[0].set_transmit_enabled(true);
    }

    for (i, word) in args.send.iter().enumerate() {
        let Ok(word) = u16::try_from(*word) else {
            bail!("word #{i} (0x{word:X}) does not fit in 16 bits");
        };

        engine.send_data(0, word);
        engine.run(1);
    }

    engine.run(args.cycles);

    let stats = engine.processor().stats();
    tracing::info!(
        steps = engine.steps(),
        executed = stats.executed,
        interrupts = stats.interrupts,
        vectored = stats.vectored_interrupts,
        "run finished"
    );

    for (source, vector) in &ROUTES {
        if stats.seen & vector.mask() != 0 {
            tracing::info!("vector {vector} seen, routed from {source:?}");
        }
    }

    let peripherals = engine.peripherals();
    tracing::info!(
        dma_transfers = peripherals.dma.completed(),
        external_reads = peripherals.ahbm.stats().reads,
        external_writes = peripherals.ahbm.stats().writes,
        audio_frames = frames.load(Ordering::Relaxed),
        "peripherals"
    );

    Ok(())
}
