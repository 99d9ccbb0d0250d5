//! Collector tests against a canned local HTTP server.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;

use auditarr_collect::{ArrClient, CollectError, QbittorrentClient};
use auditarr_core::{ManagedBy, ManagerKind, TorrentState};
use tokio_util::sync::CancellationToken;

struct Request {
    method: String,
    target: String,
    headers: Vec<(String, String)>,
    body: String,
}

impl Request {
    fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or("")
    }

    fn query(&self) -> &str {
        self.target.split_once('?').map(|(_, q)| q).unwrap_or("")
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

struct Reply {
    status: u16,
    headers: Vec<(&'static str, String)>,
    body: String,
}

fn json(body: &str) -> Reply {
    Reply {
        status: 200,
        headers: vec![("Content-Type", "application/json".to_string())],
        body: body.to_string(),
    }
}

fn status(code: u16) -> Reply {
    Reply {
        status: code,
        headers: Vec::new(),
        body: String::new(),
    }
}

/// Serve canned replies on a random port; returns the base URL and the
/// request log.
fn serve<F>(handler: F) -> (String, Arc<Mutex<Vec<String>>>)
where
    F: Fn(&Request) -> Reply + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&log);

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { continue };
            if let Some(request) = read_request(&stream) {
                seen.lock()
                    .unwrap()
                    .push(format!("{} {}", request.method, request.target));
                write_reply(stream, handler(&request));
            }
        }
    });

    (format!("http://{addr}"), log)
}

fn read_request(stream: &TcpStream) -> Option<Request> {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).ok()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?.to_string();

    let mut headers = Vec::new();
    loop {
        let mut header = String::new();
        reader.read_line(&mut header).ok()?;
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    let length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0; length];
    reader.read_exact(&mut body).ok()?;

    Some(Request {
        method,
        target,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

fn write_reply(mut stream: TcpStream, reply: Reply) {
    let mut head = format!(
        "HTTP/1.1 {} X\r\nContent-Length: {}\r\nConnection: close\r\n",
        reply.status,
        reply.body.len()
    );
    for (name, value) in &reply.headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("\r\n");
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(reply.body.as_bytes());
    let _ = stream.flush();
}

#[tokio::test]
async fn test_sonarr_collects_episode_files() {
    let (url, log) = serve(|req| {
        if req.header("x-api-key") != Some("secret") {
            return status(401);
        }
        match (req.path(), req.query()) {
            ("/api/v3/series", _) => json(
                r#"[{"id": 1, "title": "Alpha", "monitored": true},
                    {"id": 2, "title": "Beta", "monitored": false},
                    {"id": 3, "title": "Broken", "monitored": true}]"#,
            ),
            ("/api/v3/episodefile", "seriesId=1") => json(
                r#"[{"id": 10, "path": "/data/media/tv/Alpha/a1.mkv", "dateAdded": "2024-01-01T00:00:00Z"},
                    {"id": 11, "path": "/data/media/tv/Alpha/a2.mkv"}]"#,
            ),
            ("/api/v3/episodefile", "seriesId=2") => {
                json(r#"[{"id": 20, "path": "/data/media/tv/Beta/b1.mkv"}]"#)
            }
            ("/api/v3/episodefile", _) => status(500),
            _ => status(404),
        }
    });

    let client = ArrClient::new(ManagerKind::Sonarr, &url, "secret").unwrap();
    let records = client.collect().await.unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].path, PathBuf::from("/data/media/tv/Alpha/a1.mkv"));
    assert!(records[0].imported_at.is_some());
    assert_eq!(
        records[2].owner,
        ManagedBy::Series {
            series_id: 2,
            episode_file_id: 20
        }
    );
    assert!(!records[2].monitored);

    // The failing series was requested and skipped.
    let log = log.lock().unwrap();
    assert!(log.iter().any(|r| r.ends_with("seriesId=3")));
}

#[tokio::test]
async fn test_radarr_skips_movies_without_files() {
    let (url, log) = serve(|req| match (req.path(), req.query()) {
        ("/api/v3/movie", _) => json(
            r#"[{"id": 5, "title": "Kept", "monitored": true, "hasFile": true},
                {"id": 6, "title": "Wanted", "monitored": true, "hasFile": false}]"#,
        ),
        ("/api/v3/moviefile", "movieId=5") => {
            json(r#"[{"id": 50, "path": "/data/media/movies/Kept/Kept.mkv"}]"#)
        }
        _ => status(404),
    });

    let client = ArrClient::new(ManagerKind::Radarr, &url, "key").unwrap();
    let records = client.collect().await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].owner, ManagedBy::Movie { movie_id: 5 });
    assert!(!log.lock().unwrap().iter().any(|r| r.contains("movieId=6")));
}

#[tokio::test]
async fn test_arr_connection_and_status_errors() {
    let (url, _) = serve(|req| match req.path() {
        "/api/v3/system/status" if req.header("x-api-key") == Some("good") => {
            json(r#"{"appName": "Sonarr", "version": "4.0.1.929"}"#)
        }
        _ => status(401),
    });

    let good = ArrClient::new(ManagerKind::Sonarr, &url, "good").unwrap();
    let status = good.test_connection().await.unwrap();
    assert_eq!(status.version, "4.0.1.929");

    let bad = ArrClient::new(ManagerKind::Sonarr, &url, "bad").unwrap();
    match bad.collect().await {
        Err(CollectError::Status { status, .. }) => assert_eq!(status.as_u16(), 401),
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_qbittorrent_login_and_collect() {
    let (url, _) = serve(|req| match req.path() {
        "/api/v2/auth/login" => {
            if req.method == "POST" && req.body.contains("username=admin") {
                Reply {
                    status: 200,
                    headers: vec![("Set-Cookie", "SID=abc123; HttpOnly; path=/".to_string())],
                    body: "Ok.".to_string(),
                }
            } else {
                Reply {
                    status: 200,
                    headers: Vec::new(),
                    body: "Fails.".to_string(),
                }
            }
        }
        _ if !req.header("cookie").is_some_and(|c| c.contains("SID=abc123")) => status(403),
        "/api/v2/torrents/info" => json(
            r#"[{"hash": "aaa", "name": "Show.S01", "save_path": "/data/torrents/tv",
                 "state": "uploading", "completion_on": 1700000000, "size": 100},
                {"hash": "bbb", "name": "Film", "save_path": "/data/torrents/movies",
                 "state": "downloading", "completion_on": -1, "size": 200}]"#,
        ),
        "/api/v2/torrents/files" if req.query() == "hash=aaa" => json(
            r#"[{"index": 0, "name": "Show.S01/e01.mkv", "size": 50},
                {"index": 1, "name": "Show.S01/e02.mkv", "size": 50}]"#,
        ),
        _ => status(500),
    });

    let client = QbittorrentClient::new(&url, "admin", "adminadmin").unwrap();
    let torrents = client.collect().await.unwrap();

    assert_eq!(torrents.len(), 2);
    assert_eq!(torrents[0].state, TorrentState::Completed);
    assert_eq!(torrents[0].files.len(), 2);
    assert_eq!(
        torrents[0].file_paths().next(),
        Some(PathBuf::from("/data/torrents/tv/Show.S01/e01.mkv"))
    );
    // File listing failed: kept without files.
    assert_eq!(torrents[1].state, TorrentState::Downloading);
    assert!(torrents[1].files.is_empty());
    assert_eq!(torrents[1].completed_on, None);
}

#[tokio::test]
async fn test_qbittorrent_rejected_login() {
    let (url, _) = serve(|_| Reply {
        status: 200,
        headers: Vec::new(),
        body: "Fails.".to_string(),
    });

    let client = QbittorrentClient::new(&url, "admin", "wrong").unwrap();
    assert!(matches!(client.collect().await, Err(CollectError::Auth(_))));
}

#[tokio::test]
async fn test_cancelled_collection() {
    let (url, _) = serve(|_| json("[]"));
    let token = CancellationToken::new();
    token.cancel();

    let client = ArrClient::new(ManagerKind::Radarr, &url, "key")
        .unwrap()
        .with_cancellation(token);
    let err = client.collect().await.unwrap_err();
    assert!(err.is_cancelled());
}
