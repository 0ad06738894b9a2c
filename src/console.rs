use std::io::{self, BufRead};

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Lines read from `reader` on a detached OS thread.
///
/// Reads on tokio's blocking pool can't be cancelled and keep the runtime from
/// shutting down, so a read still pending after the prompt ends would hang the
/// process on exit. A plain thread is simply abandoned.
pub fn lines<R>(reader: R) -> ReceiverStream<io::Result<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);

    std::thread::spawn(move || {
        for line in reader.lines() {
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    ReceiverStream::new(rx)
}

pub fn stdin_lines() -> ReceiverStream<io::Result<String>> {
    lines(io::BufReader::new(io::stdin()))
}
