use podwheel::config::LookupSettings;
use podwheel::lookup::{self, LookupError, MetadataSource, OEmbedClient};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;

/// Serves exactly one request with the given status line and body, and
/// hands back the request line it saw.
fn serve_once(status: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut reader = BufReader::new(stream.try_clone().expect("clone"));
        let mut request_line = String::new();
        reader.read_line(&mut request_line).expect("request line");
        loop {
            let mut header = String::new();
            let read = reader.read_line(&mut header).expect("header");
            if read == 0 || header == "\r\n" {
                break;
            }
        }
        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
        .expect("write");
        stream.flush().expect("flush");
        request_line
    });
    (format!("http://{addr}/oembed"), handle)
}

fn client(endpoint: String) -> OEmbedClient {
    OEmbedClient::new(&LookupSettings {
        oembed_endpoint: endpoint,
        timeout_ms: 2_000,
    })
}

#[test]
fn resolves_title_from_oembed_endpoint() {
    let (endpoint, server) = serve_once("200 OK", r#"{"title":"Artist - Song","author_name":"Uploader"}"#);
    let client = client(endpoint);

    let track = lookup::resolve_track(&client, "https://youtu.be/dQw4w9WgXcQ").expect("resolve");
    assert_eq!(track.id, "dQw4w9WgXcQ");
    assert_eq!(track.artist.as_deref(), Some("Artist"));
    assert_eq!(track.title, "Song");

    let request_line = server.join().expect("server");
    assert!(request_line.starts_with("GET /oembed?"));
    assert!(request_line.contains("format=json"));
}

#[test]
fn error_status_is_a_fetch_failure() {
    let (endpoint, server) = serve_once("404 Not Found", "{}");
    let result = client(endpoint).fetch("dQw4w9WgXcQ");
    assert!(matches!(result, Err(LookupError::Fetch(_))));
    server.join().expect("server");
}

#[test]
fn unreadable_body_is_malformed() {
    let (endpoint, server) = serve_once("200 OK", "not json");
    let result = client(endpoint).fetch("dQw4w9WgXcQ");
    assert!(matches!(result, Err(LookupError::Malformed(_))));
    server.join().expect("server");
}
