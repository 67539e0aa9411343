//! The Task Handler server binary (spec.md §4.5, default port 5233).

use std::sync::Arc;

use roboone::fabric::server::run_messaging_server;
use roboone::hardware::HardwareClient;
use roboone::task_handler::{NoopMotionHandler, TaskHandler, TaskHandlerServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    roboone::logging::init();
    let port: u16 = std::env::args()
        .nth(1)
        .expect("usage: task-handler-server <port>")
        .parse()?;

    let hardware = Arc::new(HardwareClient::new(roboone::hardware::DEFAULT_PORT));
    let handler = Arc::new(TaskHandler::new(hardware, Arc::new(NoopMotionHandler)));

    let code = run_messaging_server(port, TaskHandlerServer::new(handler)).await;
    std::process::exit(code.exit_code());
}
