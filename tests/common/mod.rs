//! In-memory mock server speaking the inline protocol.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pipedis::proto::command::RequestShape;
use pipedis::ConnectionSpec;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// How the mock treats PING.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingMode {
    Pong,
    Delay(Duration),
    Fail,
}

#[derive(Debug, Clone)]
pub struct MockOptions {
    pub password: Option<String>,
    pub ping: PingMode,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            password: None,
            ping: PingMode::Pong,
        }
    }
}

/// Every request line the server has seen, in order.
pub type Log = Arc<Mutex<Vec<String>>>;

pub struct MockServer {
    pub addr: SocketAddr,
    pub log: Log,
}

impl MockServer {
    pub async fn start() -> Self {
        Self::start_with(MockOptions::default()).await
    }

    pub async fn start_with(options: MockOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let log: Log = Arc::default();
        let store: Arc<Mutex<HashMap<String, Vec<u8>>>> = Arc::default();

        let server_log = log.clone();
        tokio::spawn(async move {
            loop {
                let (socket, _) = match listener.accept().await {
                    Ok(s) => s,
                    Err(_) => break,
                };
                let options = options.clone();
                let log = server_log.clone();
                let store = store.clone();
                tokio::spawn(async move {
                    serve(socket, options, log, store).await;
                });
            }
        });

        Self { addr, log }
    }

    pub fn spec(&self) -> ConnectionSpec {
        ConnectionSpec::new()
            .host(self.addr.ip().to_string())
            .port(self.addr.port())
            .connect_timeout(Some(Duration::from_secs(5)))
            .heartbeat(Duration::ZERO)
    }

    pub fn requests(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

async fn serve(
    socket: TcpStream,
    options: MockOptions,
    log: Log,
    store: Arc<Mutex<HashMap<String, Vec<u8>>>>,
) {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        let Some(code) = tokens.first().map(|c| c.to_ascii_uppercase()) else {
            continue;
        };
        log.lock().unwrap().push(line.trim_end().to_string());

        let cmd = pipedis::command::lookup(&code);
        let value = match cmd.map(|c| c.request_shape()) {
            Some(
                RequestShape::KeyValue
                | RequestShape::KeyIdxValue
                | RequestShape::KeyKeyValue
                | RequestShape::KeyCntValue,
            ) => {
                let mut len = String::new();
                if reader.read_line(&mut len).await.is_err() {
                    return;
                }
                let Ok(n) = len.trim_end().parse::<usize>() else {
                    return;
                };
                let mut data = vec![0u8; n + 2];
                if reader.read_exact(&mut data).await.is_err() {
                    return;
                }
                data.truncate(n);
                Some(data)
            }
            _ => None,
        };

        if code == "QUIT" {
            return;
        }
        if code == "PING" {
            match options.ping {
                PingMode::Pong => {}
                PingMode::Delay(delay) => tokio::time::sleep(delay).await,
                PingMode::Fail => {
                    if writer.write_all(b"-ERR ping refused\r\n").await.is_err() {
                        return;
                    }
                    continue;
                }
            }
        }

        let reply = respond(&code, &tokens[1..], value, &options, &store);
        if writer.write_all(&reply).await.is_err() {
            return;
        }
    }
}

fn respond(
    code: &str,
    args: &[String],
    value: Option<Vec<u8>>,
    options: &MockOptions,
    store: &Mutex<HashMap<String, Vec<u8>>>,
) -> Vec<u8> {
    let mut store = store.lock().unwrap();
    match code {
        "PING" => b"+PONG\r\n".to_vec(),
        "AUTH" => match &options.password {
            Some(p) if args.first() == Some(p) => b"+OK\r\n".to_vec(),
            _ => b"-ERR invalid password\r\n".to_vec(),
        },
        "SELECT" => b"+OK\r\n".to_vec(),
        "SET" => {
            store.insert(args[0].clone(), value.unwrap_or_default());
            b"+OK\r\n".to_vec()
        }
        "GET" => match store.get(&args[0]) {
            Some(v) => bulk(v),
            None => b"$-1\r\n".to_vec(),
        },
        "EXISTS" => int(store.contains_key(&args[0]) as i64),
        // lists only track their length
        "RPUSH" | "LPUSH" => {
            let len = store
                .get(&args[0])
                .and_then(|v| String::from_utf8_lossy(v).parse::<i64>().ok())
                .unwrap_or(0)
                + 1;
            store.insert(args[0].clone(), len.to_string().into_bytes());
            int(len)
        }
        "DEL" => {
            let removed = args.iter().filter(|k| store.remove(*k).is_some()).count();
            int(removed as i64)
        }
        "INCR" => {
            let current = store
                .get(&args[0])
                .map(|v| String::from_utf8_lossy(v).parse::<i64>());
            let next = match current {
                Some(Err(_)) => return b"-ERR value is not an integer or out of range\r\n".to_vec(),
                Some(Ok(n)) => n + 1,
                None => 1,
            };
            store.insert(args[0].clone(), next.to_string().into_bytes());
            int(next)
        }
        "TYPE" => match store.get(&args[0]) {
            Some(_) => b"+string\r\n".to_vec(),
            None => b"+none\r\n".to_vec(),
        },
        "KEYS" => {
            let mut keys: Vec<&str> = store.keys().map(String::as_str).collect();
            keys.sort_unstable();
            bulk(keys.join(" ").as_bytes())
        }
        "MGET" => {
            let mut out = format!("*{}\r\n", args.len()).into_bytes();
            for key in args {
                match store.get(key) {
                    Some(v) => out.extend(bulk(v)),
                    None => out.extend_from_slice(b"$-1\r\n"),
                }
            }
            out
        }
        "INFO" => bulk(b"# Server\r\nredis_version:1.2.6\r\nconnected_clients:1\r\n"),
        _ => b"-ERR unknown command\r\n".to_vec(),
    }
}

fn int(n: i64) -> Vec<u8> {
    format!(":{}\r\n", n).into_bytes()
}

fn bulk(data: &[u8]) -> Vec<u8> {
    let mut out = format!("${}\r\n", data.len()).into_bytes();
    out.extend_from_slice(data);
    out.extend_from_slice(b"\r\n");
    out
}

/// Accepts connections and reads everything without ever replying.
pub async fn silent_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                while let Ok(n) = socket.read(&mut buf).await {
                    if n == 0 {
                        return;
                    }
                }
            });
        }
    });
    addr
}

/// Accepts one connection, reads one request line, then hangs up.
pub async fn hangup_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((socket, _)) = listener.accept().await {
            let mut reader = BufReader::new(socket);
            let mut line = String::new();
            let _ = reader.read_line(&mut line).await;
        }
    });
    addr
}

pub fn spec_for(addr: SocketAddr) -> ConnectionSpec {
    ConnectionSpec::new()
        .host(addr.ip().to_string())
        .port(addr.port())
        .heartbeat(Duration::ZERO)
}
