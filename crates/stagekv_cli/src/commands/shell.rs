//! Interactive shell holding one session.

use super::{open_engine, parse_value};
use stagekv_core::{CoreError, SessionId, StagingEngine};
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::warn;

const HELP: &str = "\
Commands:
  BEGIN             open a nested transaction
  COMMIT            commit the innermost transaction
  ROLLBACK          discard the innermost transaction
  GET <key>         read a key
  SET <key> <json>  write a key
  DELETE <key>      delete a key
  DEPTH             show the nesting depth
  DUMP              show the committed store
  HELP              show this help
  QUIT              leave the shell";

/// Runs the shell command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine(path)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    println!("stagekv shell on {}. Type HELP for commands.", path.display());
    repl(&engine, stdin.lock(), stdout.lock(), true)?;
    Ok(())
}

/// Reads commands from `input` until QUIT or end of input.
///
/// Open transactions are discarded on exit.
pub fn repl<R: BufRead, W: Write>(
    engine: &StagingEngine,
    mut input: R,
    mut output: W,
    prompt: bool,
) -> io::Result<()> {
    let session = engine.create_session();
    let mut line = String::new();

    loop {
        if prompt {
            let depth = engine.depth(&session).unwrap_or(0);
            write!(output, "stagekv[{depth}]> ")?;
            output.flush()?;
        }

        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match execute(engine, &session, line) {
            Outcome::Reply(text) => writeln!(output, "{text}")?,
            Outcome::Quit => break,
        }
    }

    let depth = engine.depth(&session).unwrap_or(0);
    if depth > 0 {
        warn!(depth, "discarding open transactions");
        writeln!(output, "discarded {depth} open transaction(s)")?;
    }
    if let Err(err) = engine.close_session(&session) {
        warn!(session = %session, error = %err, "failed to close session");
    }
    Ok(())
}

enum Outcome {
    Reply(String),
    Quit,
}

fn execute(engine: &StagingEngine, session: &SessionId, line: &str) -> Outcome {
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    let result = match command.to_ascii_uppercase().as_str() {
        "BEGIN" => engine.begin(session).map(|d| format!("depth {d}")),
        "COMMIT" => engine.commit(session).map(|d| format!("depth {d}")),
        "ROLLBACK" => engine.rollback(session).map(|d| format!("depth {d}")),
        "DEPTH" => engine.depth(session).map(|d| format!("depth {d}")),
        "GET" if !rest.is_empty() => engine.get(Some(session), rest).map(|v| v.to_string()),
        "DELETE" if !rest.is_empty() => engine.delete(Some(session), rest).map(|()| "OK".into()),
        "SET" => match rest.split_once(char::is_whitespace) {
            Some((key, value)) => engine
                .put(Some(session), key, parse_value(value.trim()))
                .map(|()| "OK".into()),
            None => return Outcome::Reply("usage: SET <key> <json>".into()),
        },
        "DUMP" => engine.dump_committed().map(|data| {
            data.iter()
                .map(|(key, value)| format!("{key} = {value}"))
                .collect::<Vec<_>>()
                .join("\n")
        }),
        "HELP" => Ok(HELP.to_string()),
        "QUIT" | "EXIT" => return Outcome::Quit,
        "GET" | "DELETE" => return Outcome::Reply(format!("usage: {command} <key>")),
        _ => return Outcome::Reply(format!("unknown command: {command} (try HELP)")),
    };

    Outcome::Reply(match result {
        Ok(text) => text,
        Err(CoreError::NotFound { key }) => format!("(not found: {key})"),
        Err(err) => format!("ERR {err}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagekv_core::Value;

    fn transcript(engine: &StagingEngine, script: &str) -> Vec<String> {
        let mut output = Vec::new();
        repl(engine, script.as_bytes(), &mut output, false).unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    #[test]
    fn nested_transactions() {
        let engine = StagingEngine::open_in_memory().unwrap();
        let lines = transcript(
            &engine,
            "begin\nSET a 1\nBEGIN\nset a 2\nGET a\nROLLBACK\nGET a\nCOMMIT\nQUIT\n",
        );

        assert_eq!(
            lines,
            vec!["depth 1", "OK", "depth 2", "OK", "2", "depth 1", "1", "depth 0"]
        );
        assert_eq!(engine.get(None, "a").unwrap(), Value::from(1));
        assert_eq!(engine.session_count(), 0);
    }

    #[test]
    fn errors_are_reported_inline() {
        let engine = StagingEngine::open_in_memory().unwrap();
        let lines = transcript(&engine, "COMMIT\nGET missing\nSET\nfrobnicate\n");

        assert!(lines[0].starts_with("ERR no open transaction"));
        assert_eq!(lines[1], "(not found: missing)");
        assert_eq!(lines[2], "usage: SET <key> <json>");
        assert!(lines[3].starts_with("unknown command"));
    }

    #[test]
    fn end_of_input_discards_open_transactions() {
        let engine = StagingEngine::open_in_memory().unwrap();
        let lines = transcript(&engine, "BEGIN\nSET k v\n");

        assert_eq!(lines.last().unwrap(), "discarded 1 open transaction(s)");
        assert!(engine.get(None, "k").is_err());
        assert_eq!(engine.session_count(), 0);
    }
}
