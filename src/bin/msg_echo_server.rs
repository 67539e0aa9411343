//! A diagnostic echo server: every message it receives is written straight
//! back as the confirmation. Used to exercise the messaging fabric itself
//! (spec.md §3's framing/shutdown invariants) independent of any catalog.

use roboone::fabric::server::{run_messaging_server, HandlerOutcome, ServerHandler};
use roboone::fabric::wire::Received;

struct Echo;

impl ServerHandler for Echo {
    fn handle(&mut self, received: Received) -> HandlerOutcome {
        match received {
            None => HandlerOutcome::ExitNormally,
            Some(frame) => HandlerOutcome::KeepRunning(Some(frame)),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    roboone::logging::init();
    let port: u16 = std::env::args()
        .nth(1)
        .expect("usage: msg-echo-server <port>")
        .parse()?;
    let code = run_messaging_server(port, Echo).await;
    std::process::exit(code.exit_code());
}
