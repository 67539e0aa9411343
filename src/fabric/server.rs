//! Messaging server: accepts one connection at a time, reads exactly one
//! message, dispatches to a [`ServerHandler`], writes at most one response,
//! closes the connection. Grounded on
//! `original_source/MessagingServer/api/messaging_server.h`'s
//! `runMessagingServer`/`serverHandleMsg` contract; re-expressed as a single
//! generic accept loop (the idiomatic replacement for one `runMessagingServer`
//! per server binary in the original).

use derive_more::Display;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use super::wire::{Frame, Received, MAX_BODY_LEN};

/// `ServerReturnCodeTag` from the original, re-numbered so that the normal
/// exit path is `0` to match spec.md §6.3 ("0 = normal shutdown").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[repr(u8)]
pub enum ServerReturnCode {
    #[display(fmt = "server exited normally")]
    ExitNormally = 0,
    #[display(fmt = "general failure")]
    GeneralFailure = 1,
    #[display(fmt = "failed to create socket")]
    FailedToCreateSocket = 2,
    #[display(fmt = "failed to set socket options")]
    FailedToSetSocketOptions = 3,
    #[display(fmt = "failed to bind socket")]
    FailedToBindSocket = 4,
    #[display(fmt = "failed to listen on socket")]
    FailedToListenOnSocket = 5,
    #[display(fmt = "failed to accept client connection")]
    FailedToAcceptClientConnection = 6,
}

impl ServerReturnCode {
    pub fn exit_code(self) -> i32 {
        self as i32
    }
}

/// What a handler wants the fabric to do after processing one message.
pub enum HandlerOutcome {
    /// Keep accepting further connections. `Some(frame)` is written back to
    /// the client (`L` nonzero); `None` means no response is sent.
    KeepRunning(Option<Frame>),
    /// Close this connection (with no response) and stop the accept loop,
    /// reporting [`ServerReturnCode::ExitNormally`].
    ExitNormally,
}

/// The per-server callback, the Rust replacement for the original's
/// `extern ServerReturnCode serverHandleMsg(Msg *pReceivedMsg, Msg *pSendMsg)`.
pub trait ServerHandler: Send {
    /// `received` is `None` for the zero-length shutdown signal (spec.md §3).
    fn handle(&mut self, received: Received) -> HandlerOutcome;
}

/// Runs the accept loop on `port`, dispatching every request to `handler`,
/// until the handler signals [`HandlerOutcome::ExitNormally`] or a fatal
/// transport error occurs.
pub async fn run_messaging_server(
    port: u16,
    mut handler: impl ServerHandler,
) -> ServerReturnCode {
    let socket = match tokio::net::TcpSocket::new_v4() {
        Ok(s) => s,
        Err(err) => {
            warn!("failed to create listening socket: {err}");
            return ServerReturnCode::FailedToCreateSocket;
        }
    };
    if let Err(err) = socket.set_reuseaddr(true) {
        warn!("failed to set SO_REUSEADDR: {err}");
        return ServerReturnCode::FailedToSetSocketOptions;
    }
    if let Err(err) = socket.bind(([127, 0, 0, 1], port).into()) {
        warn!("failed to bind to port {port}: {err}");
        return ServerReturnCode::FailedToBindSocket;
    }
    let listener = match socket.listen(16) {
        Ok(l) => l,
        Err(err) => {
            warn!("failed to listen on port {port}: {err}");
            return ServerReturnCode::FailedToListenOnSocket;
        }
    };
    run_messaging_server_on(listener, handler).await
}

/// Runs the accept loop on an already-bound listener. Split out from
/// [`run_messaging_server`] so tests can bind to an ephemeral port (`0`) and
/// recover the actually-assigned port before serving.
pub async fn run_messaging_server_on(
    listener: TcpListener,
    mut handler: impl ServerHandler,
) -> ServerReturnCode {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                warn!("failed to accept client connection: {err}");
                return ServerReturnCode::FailedToAcceptClientConnection;
            }
        };
        debug!("accepted connection from {peer}");
        match serve_one_connection(stream, &mut handler).await {
            Ok(ConnectionOutcome::Continue) => continue,
            Ok(ConnectionOutcome::Exit) => return ServerReturnCode::ExitNormally,
            Err(err) => {
                warn!("message from client incomplete or too long: {err}");
                continue;
            }
        }
    }
}

enum ConnectionOutcome {
    Continue,
    Exit,
}

async fn serve_one_connection(
    mut stream: TcpStream,
    handler: &mut impl ServerHandler,
) -> anyhow::Result<ConnectionOutcome> {
    let len = stream.read_u8().await?;
    if len == 0 {
        handler.handle(None);
        info!("received zero-length message, shutting down");
        return Ok(ConnectionOutcome::Exit);
    }
    let len = len as usize;
    if len - 1 > MAX_BODY_LEN {
        anyhow::bail!("declared length {len} exceeds maximum body size");
    }
    let mut body = vec![0u8; len];
    read_exact_or_closed(&mut stream, &mut body).await?;
    let msg_type = body[0];
    let frame = Frame { msg_type, body: body[1..].to_vec() };

    match handler.handle(Some(frame)) {
        HandlerOutcome::KeepRunning(Some(response)) => {
            let bytes = response.to_wire_bytes();
            stream.write_all(&bytes).await?;
            Ok(ConnectionOutcome::Continue)
        }
        HandlerOutcome::KeepRunning(None) => Ok(ConnectionOutcome::Continue),
        HandlerOutcome::ExitNormally => Ok(ConnectionOutcome::Exit),
    }
}

async fn read_exact_or_closed(stream: &mut TcpStream, buf: &mut [u8]) -> anyhow::Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = stream.read(&mut buf[filled..]).await?;
        if n == 0 {
            anyhow::bail!("peer closed connection after {filled} of {} bytes", buf.len());
        }
        filled += n;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fabric::client::{run_messaging_client, ClientReturnCode};

    struct Echo;

    impl ServerHandler for Echo {
        fn handle(&mut self, received: Received) -> HandlerOutcome {
            match received {
                None => HandlerOutcome::ExitNormally,
                Some(frame) => HandlerOutcome::KeepRunning(Some(frame)),
            }
        }
    }

    async fn bind_ephemeral() -> (TcpListener, u16) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    #[tokio::test]
    async fn echoes_non_empty_message() {
        let (listener, port) = bind_ephemeral().await;
        tokio::spawn(run_messaging_server_on(listener, Echo));

        let sent = Frame::new(0, vec![]).unwrap();
        let mut received = None;
        let code = run_messaging_client(port, "127.0.0.1", &sent, Some(&mut received))
            .await
            .unwrap();
        assert_eq!(code, ClientReturnCode::Success);
        assert_eq!(received.unwrap(), sent);
    }

    #[tokio::test]
    async fn zero_length_message_shuts_server_down() {
        let (listener, port) = bind_ephemeral().await;
        let server = tokio::spawn(run_messaging_server_on(listener, Echo));

        let code = run_zero_length_client(port).await;
        assert_eq!(code, ClientReturnCode::Success);
        assert_eq!(server.await.unwrap(), ServerReturnCode::ExitNormally);
    }

    async fn run_zero_length_client(port: u16) -> ClientReturnCode {
        use tokio::io::AsyncWriteExt;
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        stream.write_all(&[0]).await.unwrap();
        ClientReturnCode::Success
    }
}
