//! Hardware server catalog and client façade (port 5234 in its own
//! namespace). Grounded on `original_source/RoboOneHardware/api/hardware_msg_macros.h`
//! (confirmations always begin with `success: bool`) and spec.md §6.2's
//! enumeration of request kinds. The relay/GPIO/UART driving this catalog
//! fronts is out of scope (spec.md §1); this module gives the Supervisor's
//! entry actions (§4.4) and the Task Handler's `HindbrainDirect` dispatch
//! (§4.5) real request/confirmation bodies to build and parse.

use crate::catalog::FixedStr;
use crate::fabric::wire::Frame;

/// Default port, named per spec.md §7 for tests/documentation; every binary
/// still takes its port as a CLI argument.
pub const DEFAULT_PORT: u16 = 5234;

/// Maximum length (including terminator) of an O-string dialogue with the
/// Hindbrain, per spec.md §6.2 ("an up-to-80-byte string").
pub const MAX_LEN_O_STRING: usize = 80;

/// Which relay bank an enable/disable request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RelayBank {
    Internal = 0,
    External = 1,
}

impl crate::catalog::Encode for RelayBank {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(*self as u8);
    }
}
impl crate::catalog::DecodeR for RelayBank {
    fn decode_r(r: &mut crate::catalog::Reader) -> anyhow::Result<Self> {
        match r.u8()? {
            0 => Ok(Self::Internal),
            1 => Ok(Self::External),
            other => anyhow::bail!("unknown relay bank {other}"),
        }
    }
}

/// Which rail/subsystem a power-source switch request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PowerSource {
    Battery = 0,
    Mains = 1,
}

impl crate::catalog::Encode for PowerSource {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(*self as u8);
    }
}
impl crate::catalog::DecodeR for PowerSource {
    fn decode_r(r: &mut crate::catalog::Reader) -> anyhow::Result<Self> {
        match r.u8()? {
            0 => Ok(Self::Battery),
            1 => Ok(Self::Mains),
            other => anyhow::bail!("unknown power source {other}"),
        }
    }
}

crate::declare_catalog! {
    catalog = Hardware, no_header, success_cnf, no_ind;
    HardwareEnableRelays = 0, HardwareEnableRelaysReq, HardwareEnableRelaysCnf {
        req { bank: RelayBank },
        cnf {}
    };
    HardwareDisableRelays = 1, HardwareDisableRelaysReq, HardwareDisableRelaysCnf {
        req { bank: RelayBank },
        cnf {}
    };
    HardwareSwitchPiRioPower = 2, HardwareSwitchPiRioPowerReq, HardwareSwitchPiRioPowerCnf {
        req { source: PowerSource },
        cnf {}
    };
    HardwareSwitchHindbrainPower = 3, HardwareSwitchHindbrainPowerReq, HardwareSwitchHindbrainPowerCnf {
        req { source: PowerSource },
        cnf {}
    };
    HardwareSwitchOnHindbrain = 4, HardwareSwitchOnHindbrainReq, HardwareSwitchOnHindbrainCnf {
        req {},
        cnf {}
    };
    HardwareSwitchOffHindbrain = 5, HardwareSwitchOffHindbrainReq, HardwareSwitchOffHindbrainCnf {
        req {},
        cnf {}
    };
    HardwareSendOString = 6, HardwareSendOStringReq, HardwareSendOStringCnf {
        req { command: FixedStr<80>, wait_for_response: bool },
        cnf { response: FixedStr<80> }
    };
    HardwareBatterySwapReset = 7, HardwareBatterySwapResetReq, HardwareBatterySwapResetCnf {
        req {},
        cnf {}
    };
}

/// The Supervisor/Task Handler's narrow seam onto the Hardware server — a
/// trait so tests can substitute a fixture instead of a live server.
#[async_trait::async_trait]
pub trait HardwareFacade: Send + Sync {
    async fn enable_relays(&self, bank: RelayBank) -> anyhow::Result<bool>;
    async fn disable_relays(&self, bank: RelayBank) -> anyhow::Result<bool>;
    async fn switch_pi_rio_power(&self, source: PowerSource) -> anyhow::Result<bool>;
    async fn switch_hindbrain_power(&self, source: PowerSource) -> anyhow::Result<bool>;
    async fn switch_on_hindbrain(&self) -> anyhow::Result<bool>;
    async fn switch_off_hindbrain(&self) -> anyhow::Result<bool>;
    /// `HARDWARE_SEND_O_STRING`: forwards `command` to the Hindbrain UART
    /// dialogue and, if `wait_for_response` is set, returns its reply.
    async fn send_o_string(&self, command: &str, wait_for_response: bool) -> anyhow::Result<(bool, String)>;
}

/// A real TCP-backed implementation, talking to a live Hardware server via
/// the messaging fabric.
pub struct HardwareClient {
    pub port: u16,
}

impl HardwareClient {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    async fn send_receive(&self, req: HardwareReqMsg) -> anyhow::Result<HardwareCnfMsg> {
        let frame: Frame = req.to_frame();
        let mut received = None;
        crate::fabric::client::run_messaging_client(self.port, "127.0.0.1", &frame, Some(&mut received))
            .await?;
        let resp = received.ok_or_else(|| anyhow::anyhow!("hardware server sent no confirmation"))?;
        let msg_type = HardwareMsgType::from_code(resp.msg_type)?;
        HardwareCnfMsg::decode_body(msg_type, &resp.body)
    }
}

#[async_trait::async_trait]
impl HardwareFacade for HardwareClient {
    async fn enable_relays(&self, bank: RelayBank) -> anyhow::Result<bool> {
        match self.send_receive(HardwareReqMsg::HardwareEnableRelays(HardwareEnableRelaysReq { bank })).await? {
            HardwareCnfMsg::HardwareEnableRelays(cnf) => Ok(cnf.success),
            other => anyhow::bail!("unexpected confirmation {:?}", other.msg_type()),
        }
    }

    async fn disable_relays(&self, bank: RelayBank) -> anyhow::Result<bool> {
        match self.send_receive(HardwareReqMsg::HardwareDisableRelays(HardwareDisableRelaysReq { bank })).await? {
            HardwareCnfMsg::HardwareDisableRelays(cnf) => Ok(cnf.success),
            other => anyhow::bail!("unexpected confirmation {:?}", other.msg_type()),
        }
    }

    async fn switch_pi_rio_power(&self, source: PowerSource) -> anyhow::Result<bool> {
        match self
            .send_receive(HardwareReqMsg::HardwareSwitchPiRioPower(HardwareSwitchPiRioPowerReq { source }))
            .await?
        {
            HardwareCnfMsg::HardwareSwitchPiRioPower(cnf) => Ok(cnf.success),
            other => anyhow::bail!("unexpected confirmation {:?}", other.msg_type()),
        }
    }

    async fn switch_hindbrain_power(&self, source: PowerSource) -> anyhow::Result<bool> {
        match self
            .send_receive(HardwareReqMsg::HardwareSwitchHindbrainPower(HardwareSwitchHindbrainPowerReq {
                source,
            }))
            .await?
        {
            HardwareCnfMsg::HardwareSwitchHindbrainPower(cnf) => Ok(cnf.success),
            other => anyhow::bail!("unexpected confirmation {:?}", other.msg_type()),
        }
    }

    async fn switch_on_hindbrain(&self) -> anyhow::Result<bool> {
        match self
            .send_receive(HardwareReqMsg::HardwareSwitchOnHindbrain(HardwareSwitchOnHindbrainReq { _filler: 0 }))
            .await?
        {
            HardwareCnfMsg::HardwareSwitchOnHindbrain(cnf) => Ok(cnf.success),
            other => anyhow::bail!("unexpected confirmation {:?}", other.msg_type()),
        }
    }

    async fn switch_off_hindbrain(&self) -> anyhow::Result<bool> {
        match self
            .send_receive(HardwareReqMsg::HardwareSwitchOffHindbrain(HardwareSwitchOffHindbrainReq {
                _filler: 0,
            }))
            .await?
        {
            HardwareCnfMsg::HardwareSwitchOffHindbrain(cnf) => Ok(cnf.success),
            other => anyhow::bail!("unexpected confirmation {:?}", other.msg_type()),
        }
    }

    async fn send_o_string(&self, command: &str, wait_for_response: bool) -> anyhow::Result<(bool, String)> {
        let req = HardwareSendOStringReq { command: FixedStr::new(command), wait_for_response };
        match self.send_receive(HardwareReqMsg::HardwareSendOString(req)).await? {
            HardwareCnfMsg::HardwareSendOString(cnf) => Ok((cnf.success, cnf.response.0)),
            other => anyhow::bail!("unexpected confirmation {:?}", other.msg_type()),
        }
    }
}
