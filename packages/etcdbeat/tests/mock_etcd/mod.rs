use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

pub const LEADER_BODY: &str = r#"{
    "leader": "924e2e83e93f2560",
    "followers": {
        "6e3bd23ae5f1eae0": {
            "latency": { "current": 0.002537, "average": 0.004775, "standardDeviation": 0.001567, "minimum": 1, "maximum": 1.543521 },
            "counts": { "fail": 0, "success": 745 }
        },
        "a8266ecf031671f3": {
            "latency": { "current": 0.001232, "average": 0.003211, "standardDeviation": 0.002711, "minimum": 0, "maximum": 0.951313 },
            "counts": { "fail": 2, "success": 735 }
        }
    }
}"#;

pub const SELF_BODY: &str = r#"{
    "name": "infra1",
    "id": "924e2e83e93f2560",
    "state": "StateLeader",
    "startTime": "2015-05-07T17:23:37.417146375-07:00",
    "leaderInfo": { "leader": "924e2e83e93f2560", "uptime": "2m13.561239462s", "startTime": "2015-05-07T17:23:38.228233524-07:00" },
    "recvAppendRequestCnt": 0,
    "recvBandwidthRate": 1.5,
    "recvPkgRate": 0.25,
    "sendAppendRequestCnt": 6535
}"#;

pub const STORE_BODY: &str = r#"{
    "compareAndSwapFail": 0,
    "compareAndSwapSuccess": 0,
    "compareAndDeleteFail": 1,
    "compareAndDeleteSuccess": 2,
    "createFail": 0,
    "createSuccess": 2,
    "deleteFail": 0,
    "deleteSuccess": 0,
    "expireCount": 3,
    "getsFail": 4,
    "getsSuccess": 75,
    "setsFail": 2,
    "setsSuccess": 4,
    "updateFail": 0,
    "updateSuccess": 1,
    "watchers": 7
}"#;

#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub path: String,
    pub authorization: Option<String>,
}

/// A tiny HTTP/1.1 server answering fixed responses per path, standing in for an etcd node.
pub struct MockEtcd {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<ReceivedRequest>>>,
    handle: JoinHandle<()>,
}

impl MockEtcd {
    pub async fn start(routes: Vec<(&str, u16, &str)>) -> Self {
        let routes: Arc<HashMap<String, (u16, String)>> = Arc::new(
            routes
                .into_iter()
                .map(|(path, status, body)| (path.to_owned(), (status, body.to_owned())))
                .collect(),
        );
        let requests = Arc::new(Mutex::new(vec![]));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn({
            let requests = Arc::clone(&requests);
            async move {
                while let Ok((stream, _)) = listener.accept().await {
                    tokio::spawn(serve(stream, Arc::clone(&routes), Arc::clone(&requests)));
                }
            }
        });

        Self { addr, requests, handle }
    }

    /// Serves all three stats endpoints with the sample bodies.
    pub async fn healthy() -> Self {
        Self::start(vec![
            ("/v2/stats/leader", 200, LEADER_BODY),
            ("/v2/stats/self", 200, SELF_BODY),
            ("/v2/stats/store", 200, STORE_BODY),
        ])
        .await
    }

    pub fn port(&self) -> String {
        self.addr.port().to_string()
    }

    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn hits(&self, path: &str) -> usize {
        self.requests().iter().filter(|r| r.path == path).count()
    }
}

impl Drop for MockEtcd {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(mut stream: TcpStream, routes: Arc<HashMap<String, (u16, String)>>, requests: Arc<Mutex<Vec<ReceivedRequest>>>) {
    let mut buf = Vec::new();
    let mut chunk = [0_u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let head = String::from_utf8_lossy(&buf).to_string();
    let mut lines = head.lines();
    let path = lines.next().and_then(|l| l.split_whitespace().nth(1)).unwrap_or("/").to_owned();
    let authorization = lines
        .filter_map(|l| l.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("authorization"))
        .map(|(_, value)| value.trim().to_owned());

    requests.lock().unwrap().push(ReceivedRequest {
        path: path.clone(),
        authorization,
    });

    let (status, body) = routes.get(&path).cloned().unwrap_or((404, "{}".to_owned()));
    let reason = match status {
        200 => "OK",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}
