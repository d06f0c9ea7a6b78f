//! Session client against a loopback HTTP stub
//!
//! Each stub connection serves exactly one canned response with
//! `Connection: close`, so every request arrives on a fresh socket.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;

use catalog_session::{
    ErrorKind, RecordSource, RepositoryId, RequestConfig, ResourceId, SessionClient, SessionError,
};

const LOGIN_OK: (u16, &str) = (200, r#"{"session":"abc123"}"#);
const VERSION_OK: (u16, &str) = (200, r#"{"archivesSpaceVersion":"v3.5.1"}"#);

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

fn read_request(stream: &TcpStream) -> String {
    let clone = stream
        .try_clone()
        .unwrap_or_else(|err| panic!("failed to clone stub stream: {err}"));
    let mut reader = BufReader::new(clone);
    let mut request = String::new();
    let mut content_length = 0_usize;

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
        request.push_str(&line);
        if line == "\r\n" {
            break;
        }
    }

    let mut body = vec![0_u8; content_length];
    if reader.read_exact(&mut body).is_ok() {
        request.push_str(&String::from_utf8_lossy(&body));
    }
    request
}

/// Serve the canned responses in order, one per connection
fn serve(responses: Vec<(u16, &'static str)>) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .unwrap_or_else(|err| panic!("failed to bind stub listener: {err}"));
    let address = match listener.local_addr() {
        Ok(addr) => format!("http://{addr}"),
        Err(err) => panic!("stub listener has no address: {err}"),
    };
    let (sender, receiver) = mpsc::channel();

    thread::spawn(move || {
        for (status, body) in responses {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let request = read_request(&stream);
            let _ = sender.send(request);
            let response = format!(
                "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                reason(status),
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
        }
    });

    (address, receiver)
}

fn fast_config() -> RequestConfig {
    RequestConfig {
        timeout_secs: 5,
        max_attempts: 3,
        backoff_base_secs: 0,
    }
}

fn expect_err<T>(result: Result<T, SessionError>) -> SessionError {
    match result {
        Ok(_) => panic!("expected an error"),
        Err(err) => err,
    }
}

#[test]
fn establishes_session_and_reads_record() {
    let (address, requests) = serve(vec![
        LOGIN_OK,
        VERSION_OK,
        (200, r#"{"title":"Family Papers","id_0":"MSS 1"}"#),
    ]);
    let mut client = SessionClient::with_config(address, "admin", "s3cret", fast_config());

    if let Err(err) = client.establish() {
        panic!("establish should succeed: {err}");
    }
    assert!(client.is_validated());

    let record = match client.fetch_record(RepositoryId(2), ResourceId(7)) {
        Ok(record) => record,
        Err(err) => panic!("record read should succeed: {err}"),
    };
    assert_eq!(record["title"], "Family Papers");

    let login = requests.recv().unwrap_or_default();
    assert!(login.starts_with("POST /users/admin/login"), "{login}");
    assert!(login.contains("password=s3cret"), "{login}");

    let verify = requests.recv().unwrap_or_default();
    assert!(verify.starts_with("GET /"), "{verify}");

    let read = requests.recv().unwrap_or_default();
    assert!(read.starts_with("GET /repositories/2/resources/7"), "{read}");
    assert!(
        read.to_ascii_lowercase()
            .contains("x-archivesspace-session: abc123"),
        "{read}"
    );
}

#[test]
fn rejected_login_is_authentication_error() {
    let (address, _requests) = serve(vec![(403, r#"{"error":"Login failed"}"#)]);
    let mut client = SessionClient::with_config(address, "admin", "wrong", fast_config());

    let err = expect_err(client.establish());
    assert_eq!(err.kind(), Some(ErrorKind::Authentication));
    assert!(!client.is_validated());
}

#[test]
fn refused_connection_exhausts_attempts() {
    let address = {
        let listener = TcpListener::bind("127.0.0.1:0")
            .unwrap_or_else(|err| panic!("failed to bind probe listener: {err}"));
        match listener.local_addr() {
            Ok(addr) => format!("http://{addr}"),
            Err(err) => panic!("probe listener has no address: {err}"),
        }
    };
    let mut client = SessionClient::with_config(address, "admin", "admin", fast_config());

    let err = expect_err(client.establish());
    assert_eq!(err.kind(), Some(ErrorKind::Network));
    assert!(err.to_string().contains("failed after 3 attempts"), "{err}");
}

#[test]
fn failing_verification_is_retried_then_reported_as_network() {
    let (address, _requests) = serve(vec![
        LOGIN_OK,
        (500, "{}"),
        LOGIN_OK,
        (500, "{}"),
        LOGIN_OK,
        (500, "{}"),
    ]);
    let mut client = SessionClient::with_config(address, "admin", "admin", fast_config());

    let err = expect_err(client.establish());
    assert_eq!(err.kind(), Some(ErrorKind::Network));
    assert!(err.to_string().contains("failed after 3 attempts"), "{err}");
}

#[test]
fn read_status_codes_are_classified() {
    let (address, _requests) = serve(vec![LOGIN_OK, VERSION_OK, (500, "{}"), (404, "{}")]);
    let mut client = SessionClient::with_config(address, "admin", "admin", fast_config());
    if let Err(err) = client.establish() {
        panic!("establish should succeed: {err}");
    }

    let err = expect_err(client.fetch_record(RepositoryId(2), ResourceId(1)));
    assert_eq!(err.kind(), Some(ErrorKind::Server));

    let err = expect_err(client.fetch_record(RepositoryId(2), ResourceId(2)));
    assert_eq!(err.kind(), Some(ErrorKind::Authentication));
    assert!(client.is_validated());
}

#[test]
fn malformed_body_is_a_decode_error() {
    let (address, _requests) = serve(vec![LOGIN_OK, VERSION_OK, (200, "not json")]);
    let mut client = SessionClient::with_config(address, "admin", "admin", fast_config());
    if let Err(err) = client.establish() {
        panic!("establish should succeed: {err}");
    }

    let err = expect_err(client.repository(RepositoryId(2)));
    assert!(matches!(err, SessionError::Decode(_)), "{err:?}");
    assert_eq!(err.kind(), None);
}
