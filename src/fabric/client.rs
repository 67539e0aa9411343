//! Messaging client: one connection carries exactly one request/response
//! pair. Grounded on
//! `original_source/MessagingClient/api/messaging_client.h`'s
//! `runMessagingClient`.

use derive_more::Display;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::wire::Frame;

/// `ClientReturnCodeTag` from the original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[repr(u8)]
pub enum ClientReturnCode {
    #[display(fmt = "client succeeded")]
    Success = 0,
    #[display(fmt = "general failure")]
    GeneralFailure = 1,
    #[display(fmt = "failed to create socket")]
    FailedToCreateSocket = 2,
    #[display(fmt = "failed to connect to server")]
    FailedToConnect = 3,
    #[display(fmt = "couldn't send whole message to server")]
    CouldntSendWholeMessage = 4,
    #[display(fmt = "message from server incomplete or too long")]
    MessageFromServerIncompleteOrTooLong = 5,
}

impl ClientReturnCode {
    pub fn exit_code(self) -> i32 {
        self as i32
    }
}

/// Connects to `(ip, port)`, sends `send_msg`, and — if `receive_into` is
/// `Some` — waits for exactly one response message. The socket is closed
/// unconditionally on every exit path.
pub async fn run_messaging_client(
    port: u16,
    ip: &str,
    send_msg: &Frame,
    receive_into: Option<&mut Option<Frame>>,
) -> anyhow::Result<ClientReturnCode> {
    let mut stream = match TcpStream::connect((ip, port)).await {
        Ok(s) => s,
        Err(err) => {
            tracing::warn!("failed to connect to {ip}:{port}: {err}");
            return Ok(ClientReturnCode::FailedToConnect);
        }
    };

    let bytes = send_msg.to_wire_bytes();
    if let Err(err) = stream.write_all(&bytes).await {
        tracing::warn!("couldn't send whole message to {ip}:{port}: {err}");
        return Ok(ClientReturnCode::CouldntSendWholeMessage);
    }

    if let Some(out) = receive_into {
        match read_response(&mut stream).await {
            Ok(frame) => *out = Some(frame),
            Err(err) => {
                tracing::warn!("message from server incomplete or too long: {err}");
                return Ok(ClientReturnCode::MessageFromServerIncompleteOrTooLong);
            }
        }
    }

    Ok(ClientReturnCode::Success)
}

/// Connects, sends `send_msg`, and returns without waiting for a response —
/// used by the timer service to deliver expiries (spec.md §4.3: "No response
/// is awaited").
pub async fn send_fire_and_forget(port: u16, ip: &str, send_msg: &Frame) -> anyhow::Result<ClientReturnCode> {
    run_messaging_client(port, ip, send_msg, None).await
}

async fn read_response(stream: &mut TcpStream) -> anyhow::Result<Frame> {
    let len = stream.read_u8().await?;
    if len == 0 {
        anyhow::bail!("server sent a zero-length response, which servers never do");
    }
    let mut body = vec![0u8; len as usize];
    let mut filled = 0;
    while filled < body.len() {
        let n = stream.read(&mut body[filled..]).await?;
        if n == 0 {
            anyhow::bail!("connection closed after {filled} of {} bytes", body.len());
        }
        filled += n;
    }
    let msg_type = body[0];
    Ok(Frame { msg_type, body: body[1..].to_vec() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_failure_is_reported_not_panicked() {
        // nothing listening on this ephemeral port
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let msg = Frame::new(1, vec![]).unwrap();
        let code = run_messaging_client(port, "127.0.0.1", &msg, None).await.unwrap();
        assert_eq!(code, ClientReturnCode::FailedToConnect);
    }
}
