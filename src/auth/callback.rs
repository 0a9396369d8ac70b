use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tiny_http::{Response, Server};
use url::Url;

use crate::error::AuthError;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

const SUCCESS_PAGE: &str = "Authorization successful! You may close this window.";
const DENIED_PAGE: &str = "Authorization was not granted. You may close this window.";

/// What the provider sent back to the redirect URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    Code { code: String, state: Option<String> },
    Error { error: String, state: Option<String> },
}

impl Callback {
    /// Parse a request target such as `/callback?code=..&state=..`.
    /// Returns `None` for requests that carry neither `code` nor `error`.
    /// An empty `code` is reported as an error callback.
    pub fn from_request_target(target: &str) -> Option<Self> {
        let parsed = Url::parse(&format!("http://localhost{target}")).ok()?;

        let mut code = None;
        let mut error = None;
        let mut state = None;
        for (k, v) in parsed.query_pairs() {
            match k.as_ref() {
                "code" => code = Some(v.into_owned()),
                "error" => error = Some(v.into_owned()),
                "state" => state = Some(v.into_owned()),
                _ => {}
            }
        }

        match (error, code) {
            (Some(error), _) => Some(Callback::Error { error, state }),
            (None, Some(code)) if code.is_empty() => Some(Callback::Error {
                error: "empty authorization code".to_string(),
                state,
            }),
            (None, Some(code)) => Some(Callback::Code { code, state }),
            (None, None) => None,
        }
    }

    /// Extract the authorization code, checking the anti-forgery state.
    pub fn into_code(self, expected_state: &str) -> Result<String, AuthError> {
        match self {
            Callback::Error { error, .. } => Err(AuthError::Denied(error)),
            Callback::Code { code, state } => {
                if state.as_deref() == Some(expected_state) {
                    Ok(code)
                } else {
                    Err(AuthError::StateMismatch)
                }
            }
        }
    }
}

/// A listener scoped to a single authorization attempt.
///
/// The server lives on its own thread; it answers exactly one callback, hands
/// it over the channel and exits, which closes the socket. Dropping the
/// listener stops and joins the thread on every other path.
pub struct CallbackListener {
    local_addr: SocketAddr,
    stop: Arc<AtomicBool>,
    rx: Receiver<Callback>,
    handle: Option<JoinHandle<()>>,
}

impl CallbackListener {
    pub fn bind(addr: SocketAddr) -> Result<Self, AuthError> {
        let server = Server::http(addr).map_err(|e| AuthError::Bind {
            addr: addr.to_string(),
            message: e.to_string(),
        })?;
        let local_addr = server.server_addr();
        log::debug!("OAuth callback listener bound on {local_addr}");

        let stop = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::sync_channel(1);
        let stop2 = stop.clone();
        let handle = thread::Builder::new()
            .name("oauth-callback".to_string())
            .spawn(move || serve(server, stop2, tx))
            .map_err(|e| AuthError::Bind {
                addr: local_addr.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            local_addr,
            stop,
            rx,
            handle: Some(handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Block until the callback arrives or `timeout` elapses, then shut down.
    pub fn wait(mut self, timeout: Duration) -> Result<Callback, AuthError> {
        let outcome = match self.rx.recv_timeout(timeout) {
            Ok(cb) => Ok(cb),
            Err(RecvTimeoutError::Timeout) => Err(AuthError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(AuthError::ListenerClosed),
        };
        self.shutdown();
        outcome
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::warn!("OAuth callback listener thread panicked");
        }
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn serve(server: Server, stop: Arc<AtomicBool>, tx: SyncSender<Callback>) {
    while !stop.load(Ordering::SeqCst) {
        let request = match server.recv_timeout(POLL_INTERVAL) {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            Err(e) => {
                log::warn!("OAuth callback listener failed: {e}");
                break;
            }
        };

        let Some(callback) = Callback::from_request_target(request.url()) else {
            log::debug!("ignoring non-callback request {}", request.url());
            let _ = request.respond(Response::from_string("Not found").with_status_code(404));
            continue;
        };

        let page = match callback {
            Callback::Code { .. } => SUCCESS_PAGE,
            Callback::Error { .. } => DENIED_PAGE,
        };
        if let Err(e) = request.respond(Response::from_string(page)) {
            log::debug!("could not answer the browser: {e}");
        }
        // capacity 1 and a single send: never blocks
        let _ = tx.send(callback);
        break;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{Ipv4Addr, TcpStream};

    fn loopback() -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, 0))
    }

    fn raw_get(addr: SocketAddr, target: &str) -> String {
        let mut s = TcpStream::connect(addr).unwrap();
        write!(s, "GET {target} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").unwrap();
        let mut out = String::new();
        s.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn parses_code_and_state() {
        let cb = Callback::from_request_target("/callback?state=xyz&code=4%2F0Ab").unwrap();
        assert_eq!(
            cb,
            Callback::Code {
                code: "4/0Ab".to_string(),
                state: Some("xyz".to_string())
            }
        );
    }

    #[test]
    fn error_wins_over_code() {
        let cb = Callback::from_request_target("/?error=access_denied&code=x").unwrap();
        assert!(matches!(cb, Callback::Error { ref error, .. } if error == "access_denied"));
    }

    #[test]
    fn empty_code_is_denied() {
        let cb = Callback::from_request_target("/?code=&state=s1").unwrap();
        assert!(matches!(cb, Callback::Error { ref state, .. } if state.as_deref() == Some("s1")));
        assert!(matches!(cb.into_code("s1"), Err(AuthError::Denied(_))));
    }

    #[test]
    fn unrelated_requests_are_not_callbacks() {
        assert_eq!(Callback::from_request_target("/favicon.ico"), None);
        assert_eq!(Callback::from_request_target("/?scope=x"), None);
    }

    #[test]
    fn into_code_checks_state() {
        let ok = Callback::Code {
            code: "c".to_string(),
            state: Some("s".to_string()),
        };
        assert_eq!(ok.clone().into_code("s").unwrap(), "c");
        assert!(matches!(ok.into_code("other"), Err(AuthError::StateMismatch)));

        let missing = Callback::Code {
            code: "c".to_string(),
            state: None,
        };
        assert!(matches!(missing.into_code("s"), Err(AuthError::StateMismatch)));

        let denied = Callback::Error {
            error: "access_denied".to_string(),
            state: Some("s".to_string()),
        };
        assert!(matches!(denied.into_code("s"), Err(AuthError::Denied(e)) if e == "access_denied"));
    }

    #[test]
    fn delivers_first_callback_and_skips_noise() {
        let listener = CallbackListener::bind(loopback()).unwrap();
        let addr = listener.local_addr();

        let noise = raw_get(addr, "/favicon.ico");
        assert!(noise.starts_with("HTTP/1.1 404"));

        let page = raw_get(addr, "/?code=ABC123&state=s1");
        assert!(page.contains(SUCCESS_PAGE));

        let cb = listener.wait(Duration::from_secs(5)).unwrap();
        assert_eq!(
            cb,
            Callback::Code {
                code: "ABC123".to_string(),
                state: Some("s1".to_string())
            }
        );
    }

    #[test]
    fn wait_times_out_without_callback() {
        let listener = CallbackListener::bind(loopback()).unwrap();
        let err = listener.wait(Duration::from_millis(300)).unwrap_err();
        assert!(matches!(err, AuthError::Timeout(_)));
    }

    #[test]
    fn port_is_released_after_wait() {
        let listener = CallbackListener::bind(loopback()).unwrap();
        let addr = listener.local_addr();
        let _ = listener.wait(Duration::from_millis(100));

        // the accept loop inside tiny_http winds down asynchronously
        let mut rebound = false;
        for _ in 0..50 {
            if std::net::TcpListener::bind(addr).is_ok() {
                rebound = true;
                break;
            }
            thread::sleep(Duration::from_millis(50));
        }
        assert!(rebound, "port {addr} still in use");
    }
}
