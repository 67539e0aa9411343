//! A deterministic stand-in for the Hardware and Battery Manager servers
//! (spec.md §1 excludes real GPIO/UART/1-Wire drivers; this binary gives the
//! rest of the control plane something to talk to in tests and demos). Every
//! request succeeds; `HARDWARE_SEND_O_STRING` echoes its command back as the
//! response.

use roboone::battery_manager::*;
use roboone::catalog::FixedStr;
use roboone::fabric::server::{run_messaging_server, HandlerOutcome, ServerHandler};
use roboone::fabric::wire::Received;
use roboone::hardware::*;
use tracing::warn;

struct SimHardware;

impl ServerHandler for SimHardware {
    fn handle(&mut self, received: Received) -> HandlerOutcome {
        let Some(frame) = received else {
            return HandlerOutcome::ExitNormally;
        };
        let Ok(msg_type) = HardwareMsgType::from_code(frame.msg_type) else {
            warn!("hardware-sim: unknown message type {}", frame.msg_type);
            return HandlerOutcome::KeepRunning(None);
        };
        let Ok(msg) = HardwareReqMsg::decode_body(msg_type, &frame.body) else {
            warn!("hardware-sim: malformed {} body", msg_type.name());
            return HandlerOutcome::KeepRunning(None);
        };

        let cnf = match msg {
            HardwareReqMsg::HardwareEnableRelays(_) => {
                HardwareCnfMsg::HardwareEnableRelays(HardwareEnableRelaysCnf { success: true })
            }
            HardwareReqMsg::HardwareDisableRelays(_) => {
                HardwareCnfMsg::HardwareDisableRelays(HardwareDisableRelaysCnf { success: true })
            }
            HardwareReqMsg::HardwareSwitchPiRioPower(_) => {
                HardwareCnfMsg::HardwareSwitchPiRioPower(HardwareSwitchPiRioPowerCnf { success: true })
            }
            HardwareReqMsg::HardwareSwitchHindbrainPower(_) => {
                HardwareCnfMsg::HardwareSwitchHindbrainPower(HardwareSwitchHindbrainPowerCnf { success: true })
            }
            HardwareReqMsg::HardwareSwitchOnHindbrain(_) => {
                HardwareCnfMsg::HardwareSwitchOnHindbrain(HardwareSwitchOnHindbrainCnf { success: true })
            }
            HardwareReqMsg::HardwareSwitchOffHindbrain(_) => {
                HardwareCnfMsg::HardwareSwitchOffHindbrain(HardwareSwitchOffHindbrainCnf { success: true })
            }
            HardwareReqMsg::HardwareSendOString(req) => HardwareCnfMsg::HardwareSendOString(HardwareSendOStringCnf {
                success: true,
                response: FixedStr::new(req.command.0),
            }),
            HardwareReqMsg::HardwareBatterySwapReset(_) => {
                HardwareCnfMsg::HardwareBatterySwapReset(HardwareBatterySwapResetCnf { success: true })
            }
        };
        HandlerOutcome::KeepRunning(Some(cnf.to_frame()))
    }
}

struct SimBatteryManager;

impl ServerHandler for SimBatteryManager {
    fn handle(&mut self, received: Received) -> HandlerOutcome {
        let Some(frame) = received else {
            return HandlerOutcome::ExitNormally;
        };
        let Ok(msg_type) = BatteryManagerMsgType::from_code(frame.msg_type) else {
            warn!("hardware-sim: unknown battery manager message type {}", frame.msg_type);
            return HandlerOutcome::KeepRunning(None);
        };
        let Ok(msg) = BatteryManagerReqMsg::decode_body(msg_type, &frame.body) else {
            warn!("hardware-sim: malformed {} body", msg_type.name());
            return HandlerOutcome::KeepRunning(None);
        };

        let cnf = match msg {
            BatteryManagerReqMsg::BatteryManagerServerStart(_) => {
                BatteryManagerCnfMsg::BatteryManagerServerStart(BatteryManagerServerStartCnf { success: true })
            }
            BatteryManagerReqMsg::BatteryManagerServerStop(_) => return HandlerOutcome::ExitNormally,
            BatteryManagerReqMsg::BatteryManagerDataRio(_) => {
                BatteryManagerCnfMsg::BatteryManagerDataRio(BatteryManagerDataRioCnf { _filler: 0 })
            }
            BatteryManagerReqMsg::BatteryManagerDataO1(_) => {
                BatteryManagerCnfMsg::BatteryManagerDataO1(BatteryManagerDataO1Cnf { _filler: 0 })
            }
            BatteryManagerReqMsg::BatteryManagerDataO2(_) => {
                BatteryManagerCnfMsg::BatteryManagerDataO2(BatteryManagerDataO2Cnf { _filler: 0 })
            }
            BatteryManagerReqMsg::BatteryManagerDataO3(_) => {
                BatteryManagerCnfMsg::BatteryManagerDataO3(BatteryManagerDataO3Cnf { _filler: 0 })
            }
            BatteryManagerReqMsg::BatteryManagerChargingPermitted(_) => {
                BatteryManagerCnfMsg::BatteryManagerChargingPermitted(BatteryManagerChargingPermittedCnf {
                    _filler: 0,
                })
            }
        };
        HandlerOutcome::KeepRunning(Some(cnf.to_frame()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    roboone::logging::init();
    let mut args = std::env::args().skip(1);
    let usage = "usage: hardware-sim <hardware-port> <battery-manager-port>";
    let hardware_port: u16 = args.next().expect(usage).parse()?;
    let battery_manager_port: u16 = args.next().expect(usage).parse()?;

    let hardware = run_messaging_server(hardware_port, SimHardware);
    let battery = run_messaging_server(battery_manager_port, SimBatteryManager);
    let (hardware_code, battery_code) = tokio::join!(hardware, battery);
    warn!("hardware-sim exited: hardware={hardware_code}, battery-manager={battery_code}");
    Ok(())
}
