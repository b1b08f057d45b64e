use std::{
    fs::{File, OpenOptions},
    os::unix::fs::OpenOptionsExt,
    path::PathBuf,
    process::ExitCode,
    sync::Arc,
    time::{Duration, Instant},
};

use aio_batch::{kernel_support, AlignedBuf, AsyncContext, Direction, Event, DEFAULT_ALIGNMENT};
use clap::Parser;
use tracing::{error, info, warn};

/// Write one block pattern `count` times through a single AIO context, then
/// optionally read it back.
#[derive(serde::Serialize, clap::Parser, Clone)]
struct Args {
    /// File or block device to write to. Must exist.
    #[clap(long, default_value = "/dev/fake-dev0")]
    path: PathBuf,
    /// Open with `O_DIRECT`. Offset and block size must then be multiples of
    /// the device's logical block size.
    #[clap(long)]
    direct: bool,
    #[clap(long, default_value_t = 64)]
    queue_depth: usize,
    /// Number of writes to issue, all to the same offset.
    #[clap(long, default_value_t = 10)]
    count: usize,
    #[clap(long, default_value_t = 4096)]
    block_size: usize,
    #[clap(long, default_value_t = 0)]
    offset: u64,
    /// Byte the block is filled with.
    #[clap(long, default_value_t = 3)]
    fill: u8,
    /// Read the block back and compare.
    #[clap(long)]
    verify: bool,
    /// Print a JSON summary to stdout.
    #[clap(long)]
    json: bool,
}

#[derive(serde::Serialize)]
struct Summary {
    args: Args,
    submit_calls: usize,
    completed: usize,
    failed: usize,
    bytes_written: u64,
    elapsed_us: u128,
    verified: Option<bool>,
    requests_submitted: u64,
    requests_completed: u64,
}

type DemoError = Box<dyn std::error::Error>;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let summary = match run(&args) {
        Ok(summary) => summary,
        Err(e) => {
            error!(path = %args.path.display(), "{e}");
            return ExitCode::FAILURE;
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                error!("cannot serialize summary: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        info!(
            completed = summary.completed,
            failed = summary.failed,
            bytes_written = summary.bytes_written,
            submit_calls = summary.submit_calls,
            elapsed = %humantime::format_duration(Duration::from_micros(
                u64::try_from(summary.elapsed_us).unwrap_or(u64::MAX)
            )),
            verified = ?summary.verified,
            "done"
        );
    }

    if summary.failed > 0 || summary.verified == Some(false) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn open(args: &Args) -> Result<File, DemoError> {
    let mut options = OpenOptions::new();
    options.read(true).write(true);
    if args.direct {
        options.custom_flags(libc::O_DIRECT);
    }
    options
        .open(&args.path)
        .map_err(|e| format!("cannot open {}: {e}", args.path.display()).into())
}

fn run(args: &Args) -> Result<Summary, DemoError> {
    if args.block_size == 0 {
        return Err("block size must be positive".into());
    }
    let file = Arc::new(open(args)?);
    let block = Arc::new(AlignedBuf::filled(
        args.block_size,
        DEFAULT_ALIGNMENT,
        args.fill,
    ));

    match (kernel_support::aio_nr(), kernel_support::aio_max_nr()) {
        (Ok(used), Ok(max)) => info!(used, max, "system-wide AIO budget"),
        (Err(e), _) | (_, Err(e)) => warn!("cannot read the AIO budget: {e}"),
    }

    let mut ctx: AsyncContext<Arc<File>, Arc<AlignedBuf>> = AsyncContext::new(args.queue_depth)?;
    for _ in 0..args.count {
        ctx.queue_write(Arc::clone(&file), args.offset, Arc::clone(&block));
    }

    let start = Instant::now();
    let mut submit_calls = 0;
    let mut completed = 0;
    let mut failed = 0;
    let mut bytes_written = 0u64;
    while ctx.pending().len() > 0 || ctx.inflight_requests() > 0 {
        if ctx.submit_requests()? > 0 {
            submit_calls += 1;
        }
        let inflight = ctx.inflight_requests();
        for event in ctx.collect_requests(1, inflight)? {
            completed += 1;
            if !check_write(&event, &block, args.block_size) {
                failed += 1;
                continue;
            }
            bytes_written += args.block_size as u64;
        }
    }
    let elapsed = start.elapsed();
    ctx.destroy();

    let verified = if args.verify {
        Some(read_back(args, file)?)
    } else {
        None
    };

    let metrics = aio_batch::metrics::global();
    Ok(Summary {
        args: args.clone(),
        submit_calls,
        completed,
        failed,
        bytes_written,
        elapsed_us: elapsed.as_micros(),
        verified,
        requests_submitted: metrics.requests_submitted,
        requests_completed: metrics.requests_completed,
    })
}

fn check_write(
    event: &Event<Arc<File>, Arc<AlignedBuf>>,
    block: &Arc<AlignedBuf>,
    block_size: usize,
) -> bool {
    if event.direction() != Direction::Write || !Arc::ptr_eq(event.buf(), block) {
        error!(?event, "completion does not belong to the submitted block");
        return false;
    }
    match event.result() {
        Ok(n) if n == block_size => true,
        Ok(n) => {
            warn!(offset = event.offset(), written = n, "short write");
            false
        }
        Err(e) => {
            warn!(offset = event.offset(), error = %e, "write failed");
            false
        }
    }
}

fn read_back(args: &Args, file: Arc<File>) -> Result<bool, DemoError> {
    let mut ctx: AsyncContext<Arc<File>, AlignedBuf> = AsyncContext::new(1)?;
    ctx.queue_read(
        file,
        args.offset,
        AlignedBuf::with_capacity(args.block_size, DEFAULT_ALIGNMENT),
    );
    ctx.submit_requests()?;
    let event = ctx
        .collect_requests(1, 1)?
        .pop()
        .ok_or("no completion for the read-back")?;
    let n = event.result()?;
    let (_file, buf) = event.into_resources();
    let ok = n == args.block_size && buf.as_slice().iter().all(|&b| b == args.fill);
    if ok {
        info!(offset = args.offset, len = n, "read-back matches");
    } else {
        error!(offset = args.offset, len = n, "read-back does not match the written block");
    }
    Ok(ok)
}
