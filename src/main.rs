//! Command-line codec: one message from stdin to stdout.
//!
//! `REPOSITORY_PATH` points at the repository JSON. `CODEC_MODE=decode` (default) reads FIX
//! bytes and prints the structured message as JSON; `CODEC_MODE=encode` reads a JSON message
//! and prints FIX bytes. Codec settings come from `ORCHESTRA_*` variables (see
//! [`CodecSettings::from_env`]). Warnings go to the log.

use log::{error, warn};
use orchestra_fix_codec::{Codec, CodecError, CodecSettings, Message, RawMessage, ReportingContext, Repository};
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    let _ = env_logger::try_init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), CodecError> {
    let path = std::env::var("REPOSITORY_PATH").unwrap_or_else(|_| "repository.json".to_string());
    let mode = std::env::var("CODEC_MODE").unwrap_or_else(|_| "decode".to_string());

    let repository = Repository::from_reader(BufReader::new(File::open(&path)?))?;
    let codec = Codec::new(&repository, CodecSettings::from_env())?;

    let mut input = Vec::new();
    io::stdin().read_to_end(&mut input)?;
    let mut context = ReportingContext::new();
    let mut stdout = io::stdout().lock();

    if mode.eq_ignore_ascii_case("encode") {
        let message: Message = serde_json::from_slice(&input)?;
        let bytes = codec.encode_to_bytes(&message, &mut context)?;
        stdout.write_all(&bytes)?;
    } else {
        let raw = RawMessage::new(trim_line_end(&input));
        let message = codec.decode(&raw, &mut context)?;
        serde_json::to_writer_pretty(&mut stdout, &message)?;
        writeln!(stdout)?;
    }
    stdout.flush()?;

    for warning in context.take_warnings() {
        warn!("{}", warning);
    }
    Ok(())
}

/// Drops a trailing newline left by shells and editors after the final SOH.
fn trim_line_end(input: &[u8]) -> &[u8] {
    let mut end = input.len();
    while end > 0 && matches!(input[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    &input[..end]
}
