use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use scrolly::container::{CodecReady, DemuxSink, Demuxer, Sample};
use scrolly::decode::{ByteSource, ReaderSource};
use scrolly::{
    CaptureSurface, FileBackend, HostBindings, PipelineState, ScrollyOptions, ScrollyVideo,
    SimulatedMedia,
};

#[derive(Parser, Debug)]
#[command(name = "scrolly", version)]
struct Cli {
    /// Log at debug level (overridden by `RUST_LOG`).
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the video track and sample table of an MP4 file.
    Probe(ProbeArgs),
    /// Decode a clip and write the frame shown at a scroll progress as a PNG.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// Input MP4.
    input: PathBuf,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input MP4.
    input: PathBuf,

    /// Progress in [0, 1].
    #[arg(long)]
    progress: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Instance options as JSON. `src` is replaced by the input path.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds to wait for decoding.
    #[arg(long, default_value_t = 60)]
    timeout: u64,
}

#[derive(Debug, Default, serde::Serialize)]
struct ProbeReport {
    track_id: u32,
    codec: String,
    width: u32,
    height: u32,
    timescale: u32,
    duration_secs: f64,
    sample_count: usize,
    keyframes: usize,
    first_timestamp_us: Option<i64>,
    last_timestamp_us: Option<i64>,
    /// Codec configuration record, hex encoded.
    avcc: String,
}

impl DemuxSink for ProbeReport {
    fn on_codec_ready(&mut self, ready: &CodecReady) -> scrolly::ScrollyResult<()> {
        self.track_id = ready.track_id;
        self.codec = ready.codec.clone();
        self.width = ready.coded_width;
        self.height = ready.coded_height;
        self.timescale = ready.timescale;
        self.duration_secs = ready.duration_secs;
        self.avcc = to_hex(&ready.description);
        Ok(())
    }

    fn on_sample(&mut self, sample: Sample) -> scrolly::ScrollyResult<()> {
        self.sample_count += 1;
        if sample.is_keyframe {
            self.keyframes += 1;
        }
        self.first_timestamp_us.get_or_insert(sample.timestamp_us);
        self.last_timestamp_us = Some(sample.timestamp_us);
        Ok(())
    }
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Probe(args) => cmd_probe(args),
        Command::Frame(args) => cmd_frame(args),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "scrolly=debug" } else { "scrolly=warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn probe(path: &Path) -> anyhow::Result<ProbeReport> {
    let mut source = ReaderSource::open(path, 1 << 16)?;
    let mut demuxer = Demuxer::new();
    let mut report = ProbeReport::default();
    let mut offset = 0u64;
    while let Some(chunk) = source.next_chunk()? {
        demuxer
            .append(offset, &chunk, &mut report)
            .with_context(|| format!("demux '{}'", path.display()))?;
        offset += chunk.len() as u64;
    }
    demuxer
        .flush(&mut report)
        .with_context(|| format!("demux '{}'", path.display()))?;
    Ok(report)
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let report = probe(&args.input)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("track:     {}", report.track_id);
    println!("codec:     {}", report.codec);
    println!("size:      {}x{}", report.width, report.height);
    println!("timescale: {}", report.timescale);
    println!("duration:  {:.3}s", report.duration_secs);
    println!("samples:   {} ({} keyframes)", report.sample_count, report.keyframes);
    println!("avcC:      {}", report.avcc);
    Ok(())
}

fn read_options(args: &FrameArgs) -> anyhow::Result<ScrollyOptions> {
    let src = args.input.to_string_lossy().into_owned();
    let mut options = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("read config '{}'", path.display()))?;
            let mut options = ScrollyOptions::from_json(&json)?;
            options.src = src;
            options
        }
        None => ScrollyOptions::new(src),
    };
    options.track_scroll = false;
    options.use_decode_pipeline = true;
    options.initial_progress = Some(args.progress);
    options.validate()?;
    Ok(options)
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let options = read_options(&args)?;
    let report = probe(&args.input)?;
    let viewport = kurbo::Size::new(f64::from(report.width), f64::from(report.height));

    let mut video = ScrollyVideo::new(
        options,
        SimulatedMedia::new(report.duration_secs),
        CaptureSurface::new(viewport),
        HostBindings::new().decode_backend(FileBackend::new()),
    )?;

    let state = video.wait_for_decode(Duration::from_secs(args.timeout));
    if state != PipelineState::Buffered {
        anyhow::bail!(
            "no decoded frames for '{}' (pipeline {state:?}; build with --features media-ffmpeg)",
            args.input.display()
        );
    }
    video.poll(0.0);

    let (frame, _) = video
        .painter_mut()
        .take_last()
        .context("no frame was painted")?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    frame
        .image()
        .save_with_format(&args.out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} ({}x{} at {:.3}s)",
        args.out.display(),
        frame.width(),
        frame.height(),
        video.current_time()
    );
    Ok(())
}
