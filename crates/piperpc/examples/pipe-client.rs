//! Spawns `cat` and round-trips one framed request through its pipes.
//!
//! `cat` copies stdin to stdout unchanged, so the request we send comes back
//! byte for byte and decodes as the same message. A real child would decode
//! the request and reply with a response instead.
//!
//! Run with:
//!   cargo run --example pipe-client

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use piperpc::peer::PipeChannel;
use piperpc::rpc::{decode, Request};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let channel = Arc::new(PipeChannel::spawn("cat", std::iter::empty::<&str>())?);
    eprintln!("Spawned cat (pid {})", channel.pid());

    // The channel is Sync, so a plain thread can drain stdout while this
    // thread keeps sending.
    let (tx, rx) = mpsc::channel();
    let drain = {
        let channel = Arc::clone(&channel);
        thread::spawn(move || {
            let _ = channel.drain_stdout(move |message| {
                let _ = tx.send(message);
            });
        })
    };

    let request = Request::new("echo", vec![json!("hi")], channel.next_request_id());
    channel.send_request(&request)?;

    let message = rx.recv_timeout(Duration::from_secs(3))?;
    let rpc = decode(&message.body)?;
    eprintln!(
        "cat sent our {} back ({} body bytes)",
        rpc.kind(),
        message.body.len()
    );

    channel.shutdown(Duration::from_secs(2))?;
    let _ = drain.join();
    Ok(())
}
