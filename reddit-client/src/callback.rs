//! One-shot localhost listener for the OAuth redirect.
//!
//! The listener accepts a single connection, drops its sockets, answers the
//! browser, and hands whatever it found to the waiting side over a oneshot
//! channel. Handler failures are logged and turned into a failure page.
//!
//! `localhost` may resolve to either loopback family, so an IPv4 loopback
//! bind also listens on `::1` at the same port when the host allows it.

use eraser_core::CoreError;
use std::net::{Ipv6Addr, SocketAddr};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use url::Url;

const MAX_REQUEST_BYTES: usize = 8192;

const SUCCESS_HTML: &str = "<html><body style='font-family: Arial, sans-serif; text-align: center; padding: 20px;'>\
<h2 style='color: #4CAF50;'>Authorization Successful!</h2>\
<p>You can close this window and return to the application.</p></body></html>";

const FAILURE_HTML: &str = "<html><body style='font-family: Arial, sans-serif; text-align: center; padding: 20px;'>\
<h2 style='color: #f44336;'>Authorization Failed!</h2>\
<p>Please try again or check the console for more information.</p>{detail}</body></html>";

/// Query parameters captured from the redirect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackPayload {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl CallbackPayload {
    pub fn has_code(&self) -> bool {
        self.code.is_some()
    }
}

#[derive(Debug)]
pub struct CallbackListener {
    local_addrs: Vec<SocketAddr>,
    outcome: oneshot::Receiver<CallbackPayload>,
}

impl CallbackListener {
    pub async fn bind(addr: SocketAddr) -> Result<Self, CoreError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let mut local_addrs = vec![local_addr];

        let companion = if addr.ip().is_loopback() && addr.is_ipv4() {
            let v6_addr = SocketAddr::from((Ipv6Addr::LOCALHOST, local_addr.port()));
            match TcpListener::bind(v6_addr).await {
                Ok(v6) => {
                    local_addrs.push(v6_addr);
                    Some(v6)
                }
                Err(e) => {
                    debug!("IPv6 loopback unavailable for the callback ({}): {}", v6_addr, e);
                    None
                }
            }
        } else {
            None
        };

        let (tx, rx) = oneshot::channel();
        tokio::spawn(serve_once(listener, companion, tx));
        info!("Listening for the OAuth redirect on {:?}", local_addrs);

        Ok(Self {
            local_addrs,
            outcome: rx,
        })
    }

    /// The address that was asked for, with the real port filled in.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addrs[0]
    }

    pub fn local_addrs(&self) -> &[SocketAddr] {
        &self.local_addrs
    }

    /// Waits, without timeout, for the single redirect.
    pub async fn wait(self) -> CallbackPayload {
        match self.outcome.await {
            Ok(payload) => payload,
            Err(_) => {
                warn!("Callback listener stopped without delivering a result");
                CallbackPayload::default()
            }
        }
    }
}

async fn serve_once(
    listener: TcpListener,
    companion: Option<TcpListener>,
    tx: oneshot::Sender<CallbackPayload>,
) {
    let accepted = match &companion {
        Some(v6) => tokio::select! {
            accepted = listener.accept() => accepted,
            accepted = v6.accept() => accepted,
        },
        None => listener.accept().await,
    };
    drop(listener);
    drop(companion);

    let payload = match accepted {
        Ok((socket, peer)) => {
            debug!("Accepted OAuth callback connection from {}", peer);
            handle_connection(socket).await
        }
        Err(e) => {
            warn!("Error while getting OAuth code: {}", e);
            CallbackPayload::default()
        }
    };

    let _ = tx.send(payload);
}

async fn handle_connection(mut socket: TcpStream) -> CallbackPayload {
    let (payload, body) = match read_request_target(&mut socket).await {
        Ok(target) => match parse_callback_target(&target) {
            Ok(payload) if payload.has_code() => (payload, SUCCESS_HTML.to_string()),
            Ok(payload) => {
                let detail = payload
                    .error
                    .as_deref()
                    .map(|reason| format!("<p>Reddit reported: {}</p>", escape_html(reason)))
                    .unwrap_or_default();
                (payload, FAILURE_HTML.replace("{detail}", &detail))
            }
            Err(e) => failure(e),
        },
        Err(e) => failure(e),
    };

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    if let Err(e) = socket.write_all(response.as_bytes()).await {
        warn!("Error in OAuth callback: failed to write response: {}", e);
    }
    let _ = socket.shutdown().await;

    payload
}

fn failure(e: CoreError) -> (CallbackPayload, String) {
    warn!("Error in OAuth callback: {}", e);
    let detail = format!("<p>Error: {}</p>", escape_html(&e.to_string()));
    (
        CallbackPayload::default(),
        FAILURE_HTML.replace("{detail}", &detail),
    )
}

async fn read_request_target(socket: &mut TcpStream) -> Result<String, CoreError> {
    let mut buffer = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    loop {
        let read = socket.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
        if buffer.windows(4).any(|w| w == b"\r\n\r\n") || buffer.len() >= MAX_REQUEST_BYTES {
            break;
        }
    }

    let request = String::from_utf8_lossy(&buffer);
    let request_line = request.lines().next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default();
    let target = parts.next().unwrap_or_default();

    if method != "GET" || target.is_empty() {
        return Err(CoreError::InvalidInput {
            message: format!("malformed OAuth callback request: {:?}", request_line),
        });
    }
    Ok(target.to_string())
}

/// Extracts `code`, `state` and `error` from a request target such as
/// `/?state=x&code=y`. The path itself is not checked.
pub fn parse_callback_target(target: &str) -> Result<CallbackPayload, CoreError> {
    let url = Url::parse(&format!("http://localhost{}", target)).map_err(|e| {
        CoreError::InvalidInput {
            message: format!("invalid OAuth callback target: {}", e),
        }
    })?;

    let mut payload = CallbackPayload::default();
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" if payload.code.is_none() => payload.code = Some(value.into_owned()),
            "state" if payload.state.is_none() => payload.state = Some(value.into_owned()),
            "error" if payload.error.is_none() => payload.error = Some(value.into_owned()),
            _ => {}
        }
    }
    Ok(payload)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_callback_target_extracts_code_and_state() {
        let payload = parse_callback_target("/?state=uniquestate&code=abc123").unwrap();
        assert_eq!(payload.code.as_deref(), Some("abc123"));
        assert_eq!(payload.state.as_deref(), Some("uniquestate"));
        assert!(payload.error.is_none());
    }

    #[test]
    fn parse_callback_target_keeps_first_code() {
        let payload = parse_callback_target("/callback?code=first&code=second").unwrap();
        assert_eq!(payload.code.as_deref(), Some("first"));
    }

    #[test]
    fn parse_callback_target_decodes_values() {
        let payload = parse_callback_target("/?code=a%2Bb%3D&error=access_denied").unwrap();
        assert_eq!(payload.code.as_deref(), Some("a+b="));
        assert_eq!(payload.error.as_deref(), Some("access_denied"));
    }

    #[test]
    fn parse_callback_target_without_query() {
        let payload = parse_callback_target("/").unwrap();
        assert_eq!(payload, CallbackPayload::default());
    }

    #[test]
    fn escape_html_neutralizes_markup() {
        assert_eq!(escape_html("<b>&\"</b>"), "&lt;b&gt;&amp;&quot;&lt;/b&gt;");
    }
}
