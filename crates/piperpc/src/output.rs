use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use piperpc_rpc::{ErrorObject, RequestId};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// What the child answered: a result or an error object.
#[derive(Clone, Copy)]
pub enum Reply<'a> {
    Result(&'a Value),
    Fault(&'a ErrorObject),
}

impl Reply<'_> {
    fn status(&self) -> &'static str {
        match self {
            Reply::Result(_) => "ok",
            Reply::Fault(_) => "error",
        }
    }

    fn preview(&self) -> String {
        match self {
            Reply::Result(value) => value.to_string(),
            Reply::Fault(error) => error.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ReplyOutput<'a> {
    method: &'a str,
    id: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a ErrorObject>,
}

/// Print one decoded reply. `body` is the reply's exact wire body, used
/// verbatim by the raw format.
pub fn print_reply(
    method: &str,
    id: &RequestId,
    reply: Reply<'_>,
    body: &[u8],
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            let out = ReplyOutput {
                method,
                id: id.to_string(),
                status: reply.status(),
                result: match reply {
                    Reply::Result(value) => Some(value),
                    Reply::Fault(_) => None,
                },
                error: match reply {
                    Reply::Result(_) => None,
                    Reply::Fault(error) => Some(error),
                },
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["METHOD", "ID", "STATUS", "VALUE"])
                .add_row(vec![
                    method.to_string(),
                    id.to_string(),
                    reply.status().to_string(),
                    reply.preview(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "method={} id={} status={} value={}",
                method,
                id,
                reply.status(),
                reply.preview()
            );
        }
        OutputFormat::Raw => {
            print_raw(body);
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}
