//! The Supervisor State Machine server binary (spec.md §4.4, default port
//! 5231). Talks to the Hardware and Battery Manager servers over the
//! messaging fabric and embeds a [`TaskHandler`] directly, since `Mobile`'s
//! entry action must dispatch its causing task synchronously as part of the
//! transition (spec.md §4.4: "dispatch the task that caused the
//! transition").

use std::sync::Arc;

use roboone::battery_manager::BatteryManagerClient;
use roboone::fabric::server::run_messaging_server;
use roboone::hardware::HardwareClient;
use roboone::supervisor::{Supervisor, SupervisorContext, SupervisorServer};
use roboone::task_handler::{NoopMotionHandler, TaskHandler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    roboone::logging::init();
    let port: u16 = std::env::args()
        .nth(1)
        .expect("usage: state-machine-server <port>")
        .parse()?;

    let hardware: Arc<HardwareClient> = Arc::new(HardwareClient::new(roboone::hardware::DEFAULT_PORT));
    let battery = Arc::new(BatteryManagerClient::new(roboone::battery_manager::DEFAULT_PORT));
    let task_handler = Arc::new(TaskHandler::new(hardware.clone(), Arc::new(NoopMotionHandler)));

    let ctx = SupervisorContext { hardware, battery, task_handler };
    let supervisor = Arc::new(Supervisor::new(ctx));

    let code = run_messaging_server(port, SupervisorServer::new(supervisor)).await;
    std::process::exit(code.exit_code());
}
