//! The software timer service binary (spec.md §4.3, default port 5235).

use roboone::fabric::server::run_messaging_server;
use roboone::timer::{TimerHandler, TimerService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    roboone::logging::init();
    let port: u16 = std::env::args()
        .nth(1)
        .expect("usage: timer-server <port>")
        .parse()?;

    let service = TimerService::new();
    service.spawn_expiry_task();

    let code = run_messaging_server(port, TimerHandler::new(service)).await;
    std::process::exit(code.exit_code());
}
