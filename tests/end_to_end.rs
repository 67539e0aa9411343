//! End-to-end scenarios from spec.md §8: a live Supervisor driving a live
//! Task Handler and real Hardware/Battery Manager wire traffic over
//! loopback TCP, exactly as the four servers would talk to each other in
//! production.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use roboone::battery_manager::*;
use roboone::catalog::FixedStr;
use roboone::fabric::server::{run_messaging_server_on, HandlerOutcome, ServerHandler};
use roboone::fabric::wire::Received;
use roboone::hardware::*;
use roboone::supervisor::{Event, Supervisor, SupervisorContext};
use roboone::task_handler::{NoopMotionHandler, RoboOneTaskBody, RoboOneTaskReq, TaskHandler};
use tokio::net::TcpListener;

struct FakeHardware {
    last_command: Arc<std::sync::Mutex<Option<String>>>,
}

impl ServerHandler for FakeHardware {
    fn handle(&mut self, received: Received) -> HandlerOutcome {
        let Some(frame) = received else {
            return HandlerOutcome::ExitNormally;
        };
        let msg_type = HardwareMsgType::from_code(frame.msg_type).unwrap();
        let msg = HardwareReqMsg::decode_body(msg_type, &frame.body).unwrap();
        let cnf = match msg {
            HardwareReqMsg::HardwareSendOString(req) => {
                *self.last_command.lock().unwrap() = Some(req.command.0);
                HardwareCnfMsg::HardwareSendOString(HardwareSendOStringCnf {
                    success: true,
                    response: FixedStr::new("OK\n"),
                })
            }
            _ => unreachable!("scenario only exercises HardwareSendOString"),
        };
        HandlerOutcome::KeepRunning(Some(cnf.to_frame()))
    }
}

struct FakeBatteryManager {
    charging_permitted: Arc<AtomicBool>,
}

impl ServerHandler for FakeBatteryManager {
    fn handle(&mut self, received: Received) -> HandlerOutcome {
        let Some(frame) = received else {
            return HandlerOutcome::ExitNormally;
        };
        let msg_type = BatteryManagerMsgType::from_code(frame.msg_type).unwrap();
        let msg = BatteryManagerReqMsg::decode_body(msg_type, &frame.body).unwrap();
        let cnf = match msg {
            BatteryManagerReqMsg::BatteryManagerChargingPermitted(req) => {
                self.charging_permitted.store(req.is_permitted, Ordering::SeqCst);
                BatteryManagerCnfMsg::BatteryManagerChargingPermitted(BatteryManagerChargingPermittedCnf {
                    _filler: 0,
                })
            }
            _ => unreachable!("scenario only exercises ChargingPermitted"),
        };
        HandlerOutcome::KeepRunning(Some(cnf.to_frame()))
    }
}

async fn bind_ephemeral() -> (TcpListener, u16) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

#[tokio::test]
async fn init_to_mobile_dispatches_hindbrain_direct_task_over_real_hardware_wire() {
    let last_command = Arc::new(std::sync::Mutex::new(None));
    let (hw_listener, hw_port) = bind_ephemeral().await;
    tokio::spawn(run_messaging_server_on(hw_listener, FakeHardware { last_command: last_command.clone() }));

    let (bm_listener, bm_port) = bind_ephemeral().await;
    let charging_permitted = Arc::new(AtomicBool::new(true));
    tokio::spawn(run_messaging_server_on(
        bm_listener,
        FakeBatteryManager { charging_permitted: charging_permitted.clone() },
    ));

    let hardware = Arc::new(HardwareClient::new(hw_port));
    let battery = Arc::new(BatteryManagerClient::new(bm_port));
    let task_handler = Arc::new(TaskHandler::new(hardware.clone(), Arc::new(NoopMotionHandler)));
    let supervisor = Supervisor::new(SupervisorContext { hardware, battery, task_handler });

    let task = RoboOneTaskReq {
        header: None,
        body: RoboOneTaskBody::HindbrainDirect { command: FixedStr::new("!\n") },
    };
    supervisor.apply(Event::TasksAvailable(task)).await;

    assert_eq!(supervisor.state_name(), "Mobile");
    assert_eq!(last_command.lock().unwrap().as_deref(), Some("!\n"));

    supervisor.apply(Event::Shutdown).await;
    assert_eq!(supervisor.state_name(), "Shutdown");
    assert!(!charging_permitted.load(Ordering::SeqCst), "Shutdown must revoke charging permission");
}
