//! Control socket session: handshake, command and response framing.
//!
//! The daemon answers a command with a mix of status-coded lines, continuation lines and raw
//! table rows, with no length prefix. Each line is classified on its own:
//!
//! - `0xxx`: command completed
//! - `1xxx`-`7xxx`: data lines, payload after the code and its separator
//! - `8xxx`: runtime error, `9xxx`: parse error
//! - lines starting with a space continue the previous line
//! - anything else is raw payload (e.g. a route row starting with `8.8.8.0/24`)
use crate::BirdError;
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::os::unix::net::UnixStream;
use std::time::{Duration, Instant};
use tracing::trace;

/// Status code the daemon sends as its greeting once it is ready for a command.
const GREETING_CODE: &str = "0001";

/// Something that can send one command to the daemon and return its decoded payload.
///
/// [SocketQuerier] talks to a real control socket; tests substitute canned responses.
pub trait Querier: Send + Sync {
    fn query(&self, command: &str) -> Result<String, BirdError>;
}

/// Classification of one response line.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Line<'a> {
    /// Command completed, with an optional payload on the same line.
    Done(Option<&'a str>),
    /// Status-coded data line, with its payload if it had a separator.
    Data(Option<&'a str>),
    /// Continuation line, leading space removed.
    Continuation(&'a str),
    /// Daemon-reported runtime (8xxx) or parse (9xxx) error.
    Error,
    /// Line without a status code, kept verbatim.
    Raw(&'a str),
}

/// Classify a single response line (without its line terminator).
pub fn classify_line(line: &str) -> Line<'_> {
    if let Some(rest) = line.strip_prefix(' ') {
        return Line::Continuation(rest);
    }

    let bytes = line.as_bytes();
    if bytes.len() < 4 || !bytes[..4].iter().all(u8::is_ascii_digit) {
        return Line::Raw(line);
    }

    let payload = match bytes.get(4) {
        Some(b' ') | Some(b'-') => Some(&line[5..]),
        _ => None,
    };

    match bytes[0] {
        b'0' => Line::Done(payload),
        b'8' | b'9' => Line::Error,
        _ => Line::Data(payload),
    }
}

/// Read response lines from `reader` until the daemon signals completion or an error.
///
/// Returns the accumulated payload with surrounding whitespace trimmed.
pub fn read_response<R: BufRead>(reader: &mut R) -> Result<String, BirdError> {
    let mut output = String::new();
    let mut buf = Vec::new();

    loop {
        let n = read_raw_line(reader, &mut buf)
            .map_err(|e| transport_error("failed to read response", &e))?;
        if n == 0 {
            return Err(BirdError::TransportError(
                "failed to read response: connection closed before completion".to_string(),
            ));
        }

        let line = String::from_utf8_lossy(&buf);
        let trimmed = line.trim_end_matches('\n').trim_end_matches('\r');
        match classify_line(trimmed) {
            Line::Continuation(rest) => push_line(&mut output, rest),
            Line::Done(payload) => {
                if let Some(payload) = payload {
                    push_line(&mut output, payload);
                }
                break;
            }
            Line::Data(payload) => {
                if let Some(payload) = payload {
                    push_line(&mut output, payload);
                }
            }
            Line::Error => return Err(BirdError::DaemonError(trimmed.to_string())),
            Line::Raw(raw) => {
                if !raw.is_empty() {
                    push_line(&mut output, raw);
                }
            }
        }
    }

    Ok(output.trim().to_string())
}

/// Read one line as bytes; the daemon echoes user text that is not always valid UTF-8.
fn read_raw_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<usize> {
    buf.clear();
    reader.read_until(b'\n', buf)
}

fn push_line(output: &mut String, line: &str) {
    output.push_str(line);
    output.push('\n');
}

fn transport_error(context: &str, e: &std::io::Error) -> BirdError {
    match e.kind() {
        ErrorKind::WouldBlock | ErrorKind::TimedOut => {
            BirdError::TransportError(format!("{}: deadline exceeded", context))
        }
        _ => BirdError::TransportError(format!("{}: {}", context, e)),
    }
}

/// [Querier] over a BIRD control socket.
///
/// Every query opens its own connection and closes it when done; nothing is shared between
/// calls.
#[derive(Debug, Clone)]
pub struct SocketQuerier {
    socket_path: String,
    timeout: Duration,
}

impl SocketQuerier {
    pub fn new(socket_path: &str, timeout: Duration) -> Self {
        Self {
            socket_path: socket_path.to_string(),
            timeout,
        }
    }

    pub fn socket_path(&self) -> &str {
        self.socket_path.as_str()
    }
}

/// Stream wrapper that applies what is left of an absolute deadline before each read.
struct DeadlineStream {
    stream: UnixStream,
    deadline: Instant,
}

impl DeadlineStream {
    fn arm(&self) -> std::io::Result<()> {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(std::io::Error::new(
                ErrorKind::TimedOut,
                "deadline exceeded",
            ));
        }
        self.stream.set_read_timeout(Some(remaining))?;
        self.stream.set_write_timeout(Some(remaining))
    }
}

impl Read for DeadlineStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.arm()?;
        self.stream.read(buf)
    }
}

impl Querier for SocketQuerier {
    fn query(&self, command: &str) -> Result<String, BirdError> {
        let deadline = Instant::now() + self.timeout;
        let stream =
            UnixStream::connect(&self.socket_path).map_err(|e| BirdError::ConnectionError {
                path: self.socket_path.clone(),
                source: e,
            })?;
        let mut writer = stream
            .try_clone()
            .map_err(|e| transport_error("failed to set up connection", &e))?;
        let mut reader = BufReader::new(DeadlineStream { stream, deadline });

        let mut buf = Vec::new();
        read_raw_line(&mut reader, &mut buf)
            .map_err(|e| transport_error("failed to read greeting", &e))?;
        let greeting = String::from_utf8_lossy(&buf);
        if !greeting.starts_with(GREETING_CODE) {
            return Err(BirdError::ProtocolError(format!(
                "unexpected greeting: {}",
                greeting.trim_end()
            )));
        }

        trace!(
            "greeted by {}: {}",
            &self.socket_path,
            greeting.trim_end()
        );
        reader
            .get_ref()
            .arm()
            .map_err(|e| transport_error("failed to send command", &e))?;
        write!(writer, "{}\r\n", command)
            .and_then(|_| writer.flush())
            .map_err(|e| transport_error("failed to send command", &e))?;

        read_response(&mut reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::os::unix::net::UnixListener;
    use std::thread;

    fn read(input: &str) -> Result<String, BirdError> {
        read_response(&mut Cursor::new(input.as_bytes()))
    }

    #[test]
    fn test_classify_line() {
        assert_eq!(classify_line("0000 "), Line::Done(Some("")));
        assert_eq!(classify_line("0000"), Line::Done(None));
        assert_eq!(classify_line("1007-BIRD 2.0.8"), Line::Data(Some("BIRD 2.0.8")));
        assert_eq!(classify_line("1002"), Line::Data(None));
        assert_eq!(classify_line(" continued"), Line::Continuation("continued"));
        assert_eq!(classify_line("8001 Route not found"), Line::Error);
        assert_eq!(classify_line("9001 syntax error"), Line::Error);
        assert_eq!(classify_line("8.8.8.0/24 unicast"), Line::Raw("8.8.8.0/24 unicast"));
        assert_eq!(classify_line("12"), Line::Raw("12"));
    }

    #[test]
    fn test_terminal_line() {
        assert_eq!(read("0000\n").unwrap(), "");
        assert_eq!(read("0000 \nignored\n").unwrap(), "");
        assert_eq!(read("0000 ok\n").unwrap(), "ok");
    }

    #[test]
    fn test_mixed_response() {
        let input = "1007-2076414 of 2076414 routes for 1038207 networks in table master4\n \
                     471160 of 471160 routes for 235580 networks in table master6\n\
                     0014 Total: 2547574 of 2547574 routes for 1273787 networks in 2 tables\n";
        let out = read(input).unwrap();
        assert_eq!(
            out,
            "2076414 of 2076414 routes for 1038207 networks in table master4\n\
             471160 of 471160 routes for 235580 networks in table master6\n\
             Total: 2547574 of 2547574 routes for 1273787 networks in 2 tables"
        );
    }

    #[test]
    fn test_raw_and_crlf_lines() {
        let input = "1007-Table master4:\r\n8.8.8.0/24 unicast [bgp1 10:00] * (100) [AS15169i]\r\n\r\n0000 \r\n";
        let out = read(input).unwrap();
        assert_eq!(
            out,
            "Table master4:\n8.8.8.0/24 unicast [bgp1 10:00] * (100) [AS15169i]"
        );
    }

    #[test]
    fn test_greeting_code_not_special_later() {
        let out = read("0001 BIRD ready.\n").unwrap();
        assert_eq!(out, "BIRD ready.");
    }

    #[test]
    fn test_daemon_errors() {
        let err = read("1007-some data\n8001 Network not found\n0000\n").unwrap_err();
        assert!(matches!(err, BirdError::DaemonError(ref l) if l == "8001 Network not found"));

        let err = read("9001 syntax error, unexpected END\n").unwrap_err();
        assert!(err.is_daemon_error());
    }

    #[test]
    fn test_non_utf8_bytes_pass_through() {
        let input: &[u8] = b"1002-bgp1_v4 BGP --- up 10:00 Established desc=caf\xE9\n0000 \n";
        let out = read_response(&mut Cursor::new(input)).unwrap();
        assert_eq!(out, "bgp1_v4 BGP --- up 10:00 Established desc=caf\u{FFFD}");
    }

    #[test]
    fn test_unterminated_response() {
        let err = read("1007-data without end\n").unwrap_err();
        assert!(matches!(err, BirdError::TransportError(_)));
    }

    /// Serve one connection with a fixed greeting and response, returning the received command.
    fn serve_once(
        listener: UnixListener,
        greeting: &'static str,
        response: &'static str,
    ) -> thread::JoinHandle<String> {
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.write_all(greeting.as_bytes()).unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut command = String::new();
            reader.read_line(&mut command).unwrap();
            stream.write_all(response.as_bytes()).unwrap();
            command
        })
    }

    #[test]
    fn test_socket_query() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bird.ctl");
        let listener = UnixListener::bind(&path).unwrap();
        let handle = serve_once(
            listener,
            "0001 BIRD 2.15 ready.\n",
            "1000-BIRD 2.15\n1011-Router ID is 192.0.2.1\n0013 Daemon is up and running\n",
        );

        let querier = SocketQuerier::new(path.to_str().unwrap(), Duration::from_secs(5));
        let out = querier.query("show status").unwrap();
        assert_eq!(
            out,
            "BIRD 2.15\nRouter ID is 192.0.2.1\nDaemon is up and running"
        );
        assert_eq!(handle.join().unwrap(), "show status\r\n");
    }

    #[test]
    fn test_socket_non_utf8_greeting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bird.ctl");
        let listener = UnixListener::bind(&path).unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.write_all(b"0001 BIRD \xE9 ready.\n").unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut command = String::new();
            reader.read_line(&mut command).unwrap();
            stream.write_all(b"1000-BIRD 2.15\n0013 Daemon is up\n").unwrap();
        });

        let querier = SocketQuerier::new(path.to_str().unwrap(), Duration::from_secs(5));
        assert_eq!(
            querier.query("show status").unwrap(),
            "BIRD 2.15\nDaemon is up"
        );
        handle.join().unwrap();
    }

    #[test]
    fn test_socket_bad_greeting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bird.ctl");
        let listener = UnixListener::bind(&path).unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.write_all(b"9999 go away\n").unwrap();
        });

        let querier = SocketQuerier::new(path.to_str().unwrap(), Duration::from_secs(5));
        let err = querier.query("show status").unwrap_err();
        assert!(matches!(err, BirdError::ProtocolError(_)));
        handle.join().unwrap();
    }

    #[test]
    fn test_socket_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bird.ctl");
        let listener = UnixListener::bind(&path).unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.write_all(b"0001 BIRD ready.\n").unwrap();
            // never answer, hold the connection open past the client deadline
            thread::sleep(Duration::from_millis(600));
        });

        let querier = SocketQuerier::new(path.to_str().unwrap(), Duration::from_millis(200));
        let err = querier.query("show protocols").unwrap_err();
        assert!(matches!(err, BirdError::TransportError(ref m) if m.contains("deadline")));
        handle.join().unwrap();
    }

    #[test]
    fn test_socket_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.ctl");
        let querier = SocketQuerier::new(path.to_str().unwrap(), Duration::from_secs(1));
        let err = querier.query("show status").unwrap_err();
        assert!(matches!(err, BirdError::ConnectionError { .. }));
    }
}
