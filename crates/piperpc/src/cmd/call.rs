use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use piperpc_frame::Message;
use piperpc_peer::PipeChannel;
use piperpc_rpc::{decode, Notification, Params, Request, RequestId, RpcMessage};
use serde_json::Value;

use crate::cmd::CallArgs;
use crate::exit::{
    peer_error, CliError, CliResult, DATA_INVALID, FAILURE, SUCCESS, TIMEOUT, USAGE,
};
use crate::output::{print_reply, OutputFormat, Reply};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

enum WaitOutcome {
    Replied(i32),
    TimedOut,
    Disconnected,
}

pub fn run(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let params = parse_params(&args.params)?;

    let (command, command_args) = args
        .command
        .split_first()
        .ok_or_else(|| CliError::new(USAGE, "missing command after --"))?;

    let channel =
        PipeChannel::spawn(command, command_args).map_err(|err| peer_error("spawn failed", err))?;
    tracing::debug!(pid = channel.pid(), command = %command, "child started");

    if args.notify {
        let notification = Notification::new(args.method, params);
        let sent = channel.send_notify(&notification);
        if let Err(err) = channel.shutdown(SHUTDOWN_GRACE) {
            tracing::warn!(%err, "shutdown failed");
        }
        sent.map_err(|err| peer_error("send failed", err))?;
        return Ok(SUCCESS);
    }

    let id = match args.id {
        Some(id) => RequestId::Number(id),
        None => RequestId::Number(channel.next_request_id()),
    };
    let request = Request::new(args.method.as_str(), params, id);

    thread::scope(|scope| {
        let (tx, rx) = mpsc::channel::<Message>();
        let drain = {
            let channel = &channel;
            scope.spawn(move || {
                channel.drain_stdout(move |message| {
                    let _ = tx.send(message);
                })
            })
        };
        scope.spawn(|| {
            let _ = channel.drain_stderr(|line| {
                tracing::info!(line, "child stderr");
            });
        });

        let outcome = match channel.send_request(&request) {
            Ok(()) => Ok(wait_for_reply(&request, timeout, &rx, format)),
            Err(err) => Err(peer_error("send failed", err)),
        };

        if let Err(err) = channel.shutdown(SHUTDOWN_GRACE) {
            tracing::warn!(%err, "shutdown failed");
        }

        match outcome? {
            WaitOutcome::Replied(code) => Ok(code),
            WaitOutcome::TimedOut => Err(CliError::new(
                TIMEOUT,
                format!("no reply to {} within {}", request.method, args.timeout),
            )),
            WaitOutcome::Disconnected => match drain.join() {
                Ok(Err(err)) => Err(peer_error("reading replies failed", err)),
                _ => Err(CliError::new(
                    FAILURE,
                    "child closed stdout without replying",
                )),
            },
        }
    })
}

/// Wait for the reply carrying `request`'s id, printing it when it arrives.
///
/// Anything else coming up the pipe is logged and skipped, the same leniency
/// the serving side applies to unexpected inbound messages.
fn wait_for_reply(
    request: &Request,
    timeout: Duration,
    rx: &mpsc::Receiver<Message>,
    format: OutputFormat,
) -> WaitOutcome {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return WaitOutcome::TimedOut;
        }
        let message = match rx.recv_timeout(remaining) {
            Ok(message) => message,
            Err(mpsc::RecvTimeoutError::Timeout) => return WaitOutcome::TimedOut,
            Err(mpsc::RecvTimeoutError::Disconnected) => return WaitOutcome::Disconnected,
        };

        match decode(&message.body) {
            Ok(RpcMessage::Response(response)) if response.id == request.id => {
                print_reply(
                    &request.method,
                    &response.id,
                    Reply::Result(&response.result),
                    &message.body,
                    format,
                );
                return WaitOutcome::Replied(SUCCESS);
            }
            Ok(RpcMessage::ErrorMessage(reply)) if reply.id == request.id => {
                print_reply(
                    &request.method,
                    &reply.id,
                    Reply::Fault(&reply.error),
                    &message.body,
                    format,
                );
                return WaitOutcome::Replied(DATA_INVALID);
            }
            Ok(other) => {
                tracing::warn!(kind = other.kind(), "skipping unmatched message");
            }
            Err(err) => {
                tracing::warn!(%err, "skipping undecodable message");
            }
        }
    }
}

fn parse_params(input: &str) -> CliResult<Params> {
    let value: Value = serde_json::from_str(input)
        .map_err(|err| CliError::new(USAGE, format!("--params is not valid JSON: {err}")))?;
    match value {
        Value::Array(items) => Ok(Params::List(items)),
        Value::Object(map) => Ok(Params::Map(map)),
        _ => Err(CliError::new(
            USAGE,
            "--params must be a JSON array or object",
        )),
    }
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use piperpc_rpc::{encode_error, encode_response, ErrorObject};
    use serde_json::json;

    use super::*;

    fn request() -> Request {
        Request::new("status", Params::none(), 7i64)
    }

    fn message_with_body(body: Vec<u8>) -> Message {
        Message::new(Vec::new(), body)
    }

    #[test]
    fn wait_matches_response_by_id() {
        let (tx, rx) = mpsc::channel();
        let body = encode_response(&RequestId::Number(7), &json!("done")).unwrap();
        tx.send(message_with_body(body)).unwrap();

        let outcome = wait_for_reply(
            &request(),
            Duration::from_secs(1),
            &rx,
            OutputFormat::Pretty,
        );
        assert!(matches!(outcome, WaitOutcome::Replied(SUCCESS)));
    }

    #[test]
    fn wait_skips_other_ids_until_match() {
        let (tx, rx) = mpsc::channel();
        let stray = encode_response(&RequestId::Number(99), &json!("stray")).unwrap();
        let wanted = encode_response(&RequestId::Number(7), &json!("done")).unwrap();
        tx.send(message_with_body(stray)).unwrap();
        tx.send(message_with_body(wanted)).unwrap();

        let outcome = wait_for_reply(
            &request(),
            Duration::from_secs(1),
            &rx,
            OutputFormat::Pretty,
        );
        assert!(matches!(outcome, WaitOutcome::Replied(SUCCESS)));
    }

    #[test]
    fn wait_maps_error_reply_to_data_invalid() {
        let (tx, rx) = mpsc::channel();
        let body = encode_error(
            &RequestId::Number(7),
            &ErrorObject::method_not_found("status"),
        )
        .unwrap();
        tx.send(message_with_body(body)).unwrap();

        let outcome = wait_for_reply(
            &request(),
            Duration::from_secs(1),
            &rx,
            OutputFormat::Pretty,
        );
        assert!(matches!(outcome, WaitOutcome::Replied(DATA_INVALID)));
    }

    #[test]
    fn wait_reports_disconnect() {
        let (tx, rx) = mpsc::channel::<Message>();
        drop(tx);

        let outcome = wait_for_reply(
            &request(),
            Duration::from_secs(1),
            &rx,
            OutputFormat::Pretty,
        );
        assert!(matches!(outcome, WaitOutcome::Disconnected));
    }

    #[test]
    fn wait_times_out_on_silence() {
        let (_tx, rx) = mpsc::channel::<Message>();

        let outcome = wait_for_reply(
            &request(),
            Duration::from_millis(25),
            &rx,
            OutputFormat::Pretty,
        );
        assert!(matches!(outcome, WaitOutcome::TimedOut));
    }

    #[test]
    fn wait_skips_undecodable_messages() {
        let (tx, rx) = mpsc::channel();
        tx.send(message_with_body(b"not json".to_vec())).unwrap();
        let wanted = encode_response(&RequestId::Number(7), &json!("done")).unwrap();
        tx.send(message_with_body(wanted)).unwrap();

        let outcome = wait_for_reply(
            &request(),
            Duration::from_secs(1),
            &rx,
            OutputFormat::Pretty,
        );
        assert!(matches!(outcome, WaitOutcome::Replied(SUCCESS)));
    }

    #[test]
    fn parse_params_accepts_array_and_object() {
        assert!(parse_params(r#"[1, 2]"#).unwrap().is_list());
        assert!(parse_params(r#"{"a": 1}"#).unwrap().is_map());
    }

    #[test]
    fn parse_params_rejects_scalars_and_garbage() {
        assert_eq!(parse_params("3").unwrap_err().code, USAGE);
        assert_eq!(parse_params("null").unwrap_err().code, USAGE);
        assert_eq!(parse_params("{nope").unwrap_err().code, USAGE);
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }
}
