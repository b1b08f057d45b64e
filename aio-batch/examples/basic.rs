use std::{os::unix::fs::FileExt, sync::Arc};

use aio_batch::{AsyncContext, Direction};

fn main() {
    tracing_subscriber::fmt()
        .with_file(true)
        .with_line_number(true)
        .init();
    tracing::info!("starting");

    let file = tempfile::tempfile().unwrap();
    file.write_all_at(&[23u8; 1024], 0).unwrap();
    file.write_all_at(&[42u8; 1024], 1024).unwrap();
    file.write_all_at(&[67u8; 1024], 2048).unwrap();
    let file = Arc::new(file);

    let mut ctx: AsyncContext<Arc<std::fs::File>, Vec<u8>> = AsyncContext::new(2).unwrap();
    for i in 0..3 {
        ctx.queue_read(Arc::clone(&file), i * 1024, vec![0; 1024]);
    }

    // only two fit; the third stays queued
    assert_eq!(ctx.submit_requests().unwrap(), 2);
    let mut events = ctx.collect_requests(2, 2).unwrap();
    assert_eq!(ctx.submit_requests().unwrap(), 1);
    events.extend(ctx.collect_requests(1, 1).unwrap());

    events.sort_by_key(|event| event.offset());
    for (event, expect) in events.into_iter().zip([23u8, 42, 67]) {
        assert_eq!(event.direction(), Direction::Read);
        let read = event.result().unwrap();
        assert_eq!(read, 1024, "not expecting short read");
        let (_file, buf) = event.into_resources();
        assert_eq!(buf, [expect; 1024]);
    }

    let m = aio_batch::metrics::global();
    tracing::info!(
        submitted = m.requests_submitted,
        completed = m.requests_completed,
        "done"
    );
}
