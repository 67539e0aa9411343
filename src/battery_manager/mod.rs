//! Battery Manager catalog and client façade (port 5232). Grounded on
//! `original_source/RoboOneBatteryManager/api/battery_manager_msgs.h` and
//! `battery_manager_server.h`'s `BatteryData`. The Supervisor's Docked/
//! Shutdown entry actions (spec.md §4.4) call [`BatteryManagerFacade::set_charging_permitted`];
//! the battery-sampling loop that would produce the `DATA_*` indications is
//! explicitly out of scope (spec.md §1) — this module only gives those
//! indications a wire shape.

use crate::fabric::wire::Frame;

/// Default port, named per spec.md §7 for tests/documentation; every binary
/// still takes its port as a CLI argument.
pub const DEFAULT_PORT: u16 = 5232;

crate::declare_catalog! {
    catalog = BatteryManager, no_header, plain_cnf, with_ind;
    BatteryManagerServerStart = 0, BatteryManagerServerStartReq, BatteryManagerServerStartCnf, BatteryManagerServerStartInd {
        req {},
        cnf { success: bool },
        ind {}
    };
    BatteryManagerServerStop = 1, BatteryManagerServerStopReq, BatteryManagerServerStopCnf, BatteryManagerServerStopInd {
        req {},
        cnf { success: bool },
        ind {}
    };
    BatteryManagerDataRio = 2, BatteryManagerDataRioReq, BatteryManagerDataRioCnf, BatteryManagerDataRioInd {
        req {},
        cnf {},
        ind {
            current: i16,
            voltage: u16,
            remaining_capacity: u16,
            charge: u32,
            discharge: u32
        }
    };
    BatteryManagerDataO1 = 3, BatteryManagerDataO1Req, BatteryManagerDataO1Cnf, BatteryManagerDataO1Ind {
        req {},
        cnf {},
        ind {
            current: i16,
            voltage: u16,
            remaining_capacity: u16,
            charge: u32,
            discharge: u32
        }
    };
    BatteryManagerDataO2 = 4, BatteryManagerDataO2Req, BatteryManagerDataO2Cnf, BatteryManagerDataO2Ind {
        req {},
        cnf {},
        ind {
            current: i16,
            voltage: u16,
            remaining_capacity: u16,
            charge: u32,
            discharge: u32
        }
    };
    BatteryManagerDataO3 = 5, BatteryManagerDataO3Req, BatteryManagerDataO3Cnf, BatteryManagerDataO3Ind {
        req {},
        cnf {},
        ind {
            current: i16,
            voltage: u16,
            remaining_capacity: u16,
            charge: u32,
            discharge: u32
        }
    };
    BatteryManagerChargingPermitted = 6, BatteryManagerChargingPermittedReq, BatteryManagerChargingPermittedCnf, BatteryManagerChargingPermittedInd {
        req { is_permitted: bool },
        cnf {},
        ind {}
    };
}

/// The Supervisor's narrow seam onto the Battery Manager server — it only
/// needs to flip charging permission (spec.md §4.4's Docked/Shutdown entry
/// actions); reading back `DATA_*`/broadcasts is a test-harness concern, not
/// something the Supervisor consumes.
#[async_trait::async_trait]
pub trait BatteryManagerFacade: Send + Sync {
    async fn set_charging_permitted(&self, permitted: bool) -> anyhow::Result<bool>;
}

/// A real TCP-backed implementation, talking to a live Battery Manager
/// server via the messaging fabric.
pub struct BatteryManagerClient {
    pub port: u16,
}

impl BatteryManagerClient {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

#[async_trait::async_trait]
impl BatteryManagerFacade for BatteryManagerClient {
    async fn set_charging_permitted(&self, permitted: bool) -> anyhow::Result<bool> {
        let req = BatteryManagerChargingPermittedReq { is_permitted: permitted };
        let frame: Frame = BatteryManagerReqMsg::BatteryManagerChargingPermitted(req).to_frame();
        let mut received = None;
        crate::fabric::client::run_messaging_client(self.port, "127.0.0.1", &frame, Some(&mut received))
            .await?;
        match received {
            Some(resp) => {
                let msg_type = BatteryManagerMsgType::from_code(resp.msg_type)?;
                match BatteryManagerCnfMsg::decode_body(msg_type, &resp.body)? {
                    BatteryManagerCnfMsg::BatteryManagerChargingPermitted(_) => Ok(true),
                    other => anyhow::bail!("unexpected confirmation for ChargingPermitted: {:?}", other.msg_type()),
                }
            }
            None => Ok(false),
        }
    }
}
