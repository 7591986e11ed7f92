//! JSON-lines request server on stdin/stdout.

use stagekv_core::Config;
use stagekv_server::{ServerConfig, StageServer};
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::info;

/// Runs the serve-stdio command.
pub fn run(path: &Path, debug_views: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::default().with_debug_views(debug_views);
    let server = StageServer::open(path, Config::default(), config)?;
    info!(path = %path.display(), debug_views, "serving requests on stdin");

    let stdin = io::stdin();
    let stdout = io::stdout();
    let handled = serve(&server, stdin.lock(), stdout.lock())?;

    info!(handled, "input closed");
    Ok(())
}

/// Answers each non-blank input line with one response line.
///
/// Returns the number of requests handled.
pub fn serve<R: BufRead, W: Write>(server: &StageServer, input: R, mut output: W) -> io::Result<usize> {
    let mut handled = 0;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        writeln!(output, "{}", server.handle_json(&line))?;
        output.flush()?;
        handled += 1;
    }
    Ok(handled)
}
