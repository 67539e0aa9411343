//! Task Handler catalog and dispatch logic (port 5233). Grounded on
//! `original_source/RoboOneTaskHandler/api/task_handler_msgs.h`,
//! `task_handler_types.h`, `hindbrain_direct_task_protocol.h` and
//! `src/task_handler_responder.c`.

use crate::catalog::FixedStr;
use crate::fabric::server::{HandlerOutcome, ServerHandler};
use crate::fabric::wire::Received;
use crate::hardware::HardwareFacade;
use std::sync::Arc;
use tracing::{info, warn};

/// Default port, named per spec.md §7 for tests/documentation; every binary
/// still takes its port as a CLI argument.
pub const DEFAULT_PORT: u16 = 5233;

/// `MAX_LEN_IP_ADDRESS_STRING`, incl. terminator.
pub const MAX_LEN_IP_ADDRESS: usize = 17;
/// `MAX_LEN_HINDBRAIN_DIRECT_COMMAND_STRING`/`..._RESPONSE_STRING`, incl.
/// terminator (spec.md §4.5's truncation rule).
pub const MAX_LEN_HD_STRING: usize = 30;

/// `RoboOneTaskProtocol`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RoboOneTaskProtocol {
    HindbrainDirect = 0,
    Motion = 1,
}

impl crate::catalog::Encode for RoboOneTaskProtocol {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(*self as u8);
    }
}
impl crate::catalog::DecodeR for RoboOneTaskProtocol {
    fn decode_r(r: &mut crate::catalog::Reader) -> anyhow::Result<Self> {
        match r.u8()? {
            0 => Ok(Self::HindbrainDirect),
            1 => Ok(Self::Motion),
            other => anyhow::bail!("unknown task protocol {other}"),
        }
    }
}

/// `RoboOneTaskReqHeader`: present only when the caller wants progress
/// indications routed back to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoboOneTaskReqHeader {
    pub handle: u32,
    pub source_server_port: i32,
    pub source_server_ip_address: Option<String>,
}

impl crate::catalog::Encode for RoboOneTaskReqHeader {
    fn encode(&self, out: &mut Vec<u8>) {
        crate::fabric::wire::put_u32(out, self.handle);
        crate::fabric::wire::put_i32(out, self.source_server_port);
        crate::fabric::wire::put_bool(out, self.source_server_ip_address.is_some());
        crate::fabric::wire::put_fixed_str(
            out,
            self.source_server_ip_address.as_deref().unwrap_or(""),
            MAX_LEN_IP_ADDRESS,
        );
    }
}
impl crate::catalog::DecodeR for RoboOneTaskReqHeader {
    fn decode_r(r: &mut crate::catalog::Reader) -> anyhow::Result<Self> {
        let handle = r.u32()?;
        let source_server_port = r.i32()?;
        let present = r.bool()?;
        let ip = r.fixed_str(MAX_LEN_IP_ADDRESS)?;
        Ok(Self {
            handle,
            source_server_port,
            source_server_ip_address: if present { Some(ip) } else { None },
        })
    }
}

/// The protocol-tagged task body. Grounded on `RoboOneTaskContainer`'s
/// `{protocol, detail}` pair: the original uses a C union keyed by
/// `protocol`, re-expressed here as a plain enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoboOneTaskBody {
    HindbrainDirect { command: FixedStr<MAX_LEN_HD_STRING> },
    Motion { command_code: u32 },
}

impl RoboOneTaskBody {
    fn protocol(&self) -> RoboOneTaskProtocol {
        match self {
            Self::HindbrainDirect { .. } => RoboOneTaskProtocol::HindbrainDirect,
            Self::Motion { .. } => RoboOneTaskProtocol::Motion,
        }
    }
}

impl crate::catalog::Encode for RoboOneTaskBody {
    fn encode(&self, out: &mut Vec<u8>) {
        crate::catalog::Encode::encode(&self.protocol(), out);
        match self {
            Self::HindbrainDirect { command } => crate::catalog::Encode::encode(command, out),
            Self::Motion { command_code } => crate::fabric::wire::put_u32(out, *command_code),
        }
    }
}
impl crate::catalog::DecodeR for RoboOneTaskBody {
    fn decode_r(r: &mut crate::catalog::Reader) -> anyhow::Result<Self> {
        match crate::catalog::DecodeR::decode_r(r)? {
            RoboOneTaskProtocol::HindbrainDirect => {
                Ok(Self::HindbrainDirect { command: crate::catalog::DecodeR::decode_r(r)? })
            }
            RoboOneTaskProtocol::Motion => Ok(Self::Motion { command_code: r.u32()? }),
        }
    }
}

/// `RoboOneTaskReq`: `headerPresent` plus the header (present or not) plus
/// the task body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoboOneTaskReq {
    pub header: Option<RoboOneTaskReqHeader>,
    pub body: RoboOneTaskBody,
}

impl crate::catalog::Encode for RoboOneTaskReq {
    fn encode(&self, out: &mut Vec<u8>) {
        crate::fabric::wire::put_bool(out, self.header.is_some());
        let empty_header = RoboOneTaskReqHeader { handle: 0, source_server_port: 0, source_server_ip_address: None };
        crate::catalog::Encode::encode(self.header.as_ref().unwrap_or(&empty_header), out);
        crate::catalog::Encode::encode(&self.body, out);
    }
}
impl crate::catalog::DecodeR for RoboOneTaskReq {
    fn decode_r(r: &mut crate::catalog::Reader) -> anyhow::Result<Self> {
        let header_present = r.bool()?;
        let header: RoboOneTaskReqHeader = crate::catalog::DecodeR::decode_r(r)?;
        let body = crate::catalog::DecodeR::decode_r(r)?;
        Ok(Self { header: if header_present { Some(header) } else { None }, body })
    }
}

/// `RoboOneTaskInd`: a progress indication, carrying the same task handle
/// and a protocol-tagged result body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoboOneTaskInd {
    pub handle: u8,
    pub body: RoboOneTaskBody,
}

impl crate::catalog::Encode for RoboOneTaskInd {
    fn encode(&self, out: &mut Vec<u8>) {
        crate::fabric::wire::put_u8(out, self.handle);
        crate::catalog::Encode::encode(&self.body, out);
    }
}
impl crate::catalog::DecodeR for RoboOneTaskInd {
    fn decode_r(r: &mut crate::catalog::Reader) -> anyhow::Result<Self> {
        Ok(Self { handle: r.u8()?, body: crate::catalog::DecodeR::decode_r(r)? })
    }
}

crate::declare_catalog! {
    catalog = TaskHandler, no_header, fixed_success_cnf, with_ind;
    TaskHandlerServerStart = 0, TaskHandlerServerStartReq, TaskHandlerServerStartCnf, TaskHandlerServerStartInd {
        req {},
        ind {}
    };
    TaskHandlerServerStop = 1, TaskHandlerServerStopReq, TaskHandlerServerStopCnf, TaskHandlerServerStopInd {
        req {},
        ind {}
    };
    TaskHandlerTick = 2, TaskHandlerTickReq, TaskHandlerTickCnf, TaskHandlerTickInd {
        req {},
        ind {}
    };
    TaskHandlerNewTask = 3, TaskHandlerTaskReq, TaskHandlerTaskCnf, TaskHandlerTaskReqInd {
        req { task_req: RoboOneTaskReq },
        ind {}
    };
    TaskHandlerTaskInd = 4, TaskHandlerTaskIndReq, TaskHandlerTaskIndCnf, TaskHandlerTaskIndInd {
        req {},
        ind { task_ind: RoboOneTaskInd }
    };
}

/// `RoboOneMotionResult`-equivalent seam (spec.md §4.5: "not specified here
/// beyond this contract").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionResult {
    Accepted,
    Rejected,
}

/// The out-of-scope motion subsystem's boundary.
pub trait MotionHandler: Send + Sync {
    fn dispatch(&self, command_code: u32) -> MotionResult;
}

/// Rejects every command — motion itself is out of scope (spec.md §1);
/// this gives servers something real to wire in until a motion subsystem
/// exists.
pub struct NoopMotionHandler;

impl MotionHandler for NoopMotionHandler {
    fn dispatch(&self, command_code: u32) -> MotionResult {
        warn!("no motion handler configured, rejecting command {command_code}");
        MotionResult::Rejected
    }
}

/// Truncates `s` to `width - 1` bytes and returns it ready for
/// [`FixedStr::new`] — spec.md §4.5: "truncated to fit and re-terminated."
fn truncate_for_wire(s: &str, width: usize) -> String {
    if s.len() > width - 1 {
        s[..width - 1].to_string()
    } else {
        s.to_string()
    }
}

/// Dispatches one task, sending any resulting indication back to the
/// caller's declared source (spec.md §4.5 / `taskHandlerResponder`).
pub struct TaskHandler {
    hardware: Arc<dyn HardwareFacade>,
    motion: Arc<dyn MotionHandler>,
}

impl TaskHandler {
    pub fn new(hardware: Arc<dyn HardwareFacade>, motion: Arc<dyn MotionHandler>) -> Self {
        Self { hardware, motion }
    }

    /// Runs one task to completion, returning `true` on overall success —
    /// the Rust analogue of the original's `taskHandlerServerSendReceive`
    /// plus `taskHandlerResponder` pairing.
    pub async fn dispatch(&self, req: RoboOneTaskReq) -> bool {
        match req.body {
            RoboOneTaskBody::HindbrainDirect { command } => {
                let command = truncate_for_wire(&command.0, MAX_LEN_HD_STRING);
                match self.hardware.send_o_string(&command, true).await {
                    Ok((success, response)) => {
                        let response = truncate_for_wire(&response, MAX_LEN_HD_STRING);
                        self.respond(&req.header, response).await;
                        success
                    }
                    Err(err) => {
                        warn!("hindbrain direct dispatch failed: {err}");
                        false
                    }
                }
            }
            RoboOneTaskBody::Motion { command_code } => {
                matches!(self.motion.dispatch(command_code), MotionResult::Accepted)
            }
        }
    }

    async fn respond(&self, header: &Option<RoboOneTaskReqHeader>, response: String) {
        let Some(header) = header else { return };
        let ind = RoboOneTaskInd {
            handle: header.handle as u8,
            body: RoboOneTaskBody::HindbrainDirect { command: FixedStr::new(response) },
        };
        let frame = TaskHandlerIndMsg::TaskHandlerTaskInd(TaskHandlerTaskIndInd { task_ind: ind }).to_frame();
        let ip = header.source_server_ip_address.as_deref().unwrap_or("127.0.0.1");
        let port = header.source_server_port as u16;
        if let Err(err) = crate::fabric::client::send_fire_and_forget(port, ip, &frame).await {
            warn!("task handler responder failed to reach {ip}:{port}: {err}");
        }
    }
}

/// The messaging-fabric handler for the task handler server.
pub struct TaskHandlerServer {
    handler: Arc<TaskHandler>,
}

impl TaskHandlerServer {
    pub fn new(handler: Arc<TaskHandler>) -> Self {
        Self { handler }
    }
}

impl ServerHandler for TaskHandlerServer {
    fn handle(&mut self, received: Received) -> HandlerOutcome {
        let Some(frame) = received else {
            return HandlerOutcome::ExitNormally;
        };
        let Ok(msg_type) = TaskHandlerMsgType::from_code(frame.msg_type) else {
            warn!("unknown task handler message type {}", frame.msg_type);
            return HandlerOutcome::KeepRunning(None);
        };
        let Ok(msg) = TaskHandlerReqMsg::decode_body(msg_type, &frame.body) else {
            warn!("malformed {} body", msg_type.name());
            return HandlerOutcome::KeepRunning(None);
        };

        match msg {
            TaskHandlerReqMsg::TaskHandlerServerStart(_) => {
                let cnf = TaskHandlerCnfMsg::TaskHandlerServerStart(TaskHandlerServerStartCnf { success: true });
                HandlerOutcome::KeepRunning(Some(cnf.to_frame()))
            }
            TaskHandlerReqMsg::TaskHandlerServerStop(_) => HandlerOutcome::ExitNormally,
            TaskHandlerReqMsg::TaskHandlerTick(_) => {
                let cnf = TaskHandlerCnfMsg::TaskHandlerTick(TaskHandlerTickCnf { success: true });
                HandlerOutcome::KeepRunning(Some(cnf.to_frame()))
            }
            TaskHandlerReqMsg::TaskHandlerNewTask(req) => {
                let handler = self.handler.clone();
                let success = tokio::task::block_in_place(|| {
                    tokio::runtime::Handle::current().block_on(handler.dispatch(req.task_req))
                });
                info!("dispatched task, success={success}");
                let cnf = TaskHandlerCnfMsg::TaskHandlerNewTask(TaskHandlerTaskCnf { success });
                HandlerOutcome::KeepRunning(Some(cnf.to_frame()))
            }
            TaskHandlerReqMsg::TaskHandlerTaskInd(_) => {
                // TASK_HANDLER_TASK_IND's req/cnf pair is unused on the wire — this
                // entry exists only to give the ind struct a type code. Inbound is
                // unexpected, so acknowledge and move on.
                let cnf = TaskHandlerCnfMsg::TaskHandlerTaskInd(TaskHandlerTaskIndCnf { success: true });
                HandlerOutcome::KeepRunning(Some(cnf.to_frame()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{PowerSource, RelayBank};
    use tokio::net::TcpListener;

    struct EchoHardware;

    #[async_trait::async_trait]
    impl HardwareFacade for EchoHardware {
        async fn enable_relays(&self, _bank: RelayBank) -> anyhow::Result<bool> {
            Ok(true)
        }
        async fn disable_relays(&self, _bank: RelayBank) -> anyhow::Result<bool> {
            Ok(true)
        }
        async fn switch_pi_rio_power(&self, _source: PowerSource) -> anyhow::Result<bool> {
            Ok(true)
        }
        async fn switch_hindbrain_power(&self, _source: PowerSource) -> anyhow::Result<bool> {
            Ok(true)
        }
        async fn switch_on_hindbrain(&self) -> anyhow::Result<bool> {
            Ok(true)
        }
        async fn switch_off_hindbrain(&self) -> anyhow::Result<bool> {
            Ok(true)
        }
        async fn send_o_string(&self, command: &str, _wait: bool) -> anyhow::Result<(bool, String)> {
            Ok((true, format!("ECHO:{command}")))
        }
    }

    async fn bind_ephemeral() -> (TcpListener, u16) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    #[tokio::test]
    async fn hindbrain_direct_dispatch_sends_ind_to_headers_source_port() {
        let (catcher_listener, catcher_port) = bind_ephemeral().await;
        let catcher = tokio::spawn(async move {
            let (mut stream, _) = catcher_listener.accept().await.unwrap();
            use tokio::io::AsyncReadExt;
            let len = stream.read_u8().await.unwrap() as usize;
            let mut body = vec![0u8; len];
            stream.read_exact(&mut body).await.unwrap();
            body
        });

        let handler = TaskHandler::new(Arc::new(EchoHardware), Arc::new(NoopMotionHandler));
        let req = RoboOneTaskReq {
            header: Some(RoboOneTaskReqHeader {
                handle: 7,
                source_server_port: catcher_port as i32,
                source_server_ip_address: None,
            }),
            body: RoboOneTaskBody::HindbrainDirect { command: FixedStr::new("PING\n") },
        };

        let success = handler.dispatch(req).await;
        assert!(success);

        let delivered = tokio::time::timeout(std::time::Duration::from_secs(2), catcher)
            .await
            .expect("ind was not delivered to the header's source port")
            .unwrap();

        let msg_type = TaskHandlerMsgType::from_code(delivered[0]).unwrap();
        let ind = TaskHandlerIndMsg::decode_body(msg_type, &delivered[1..]).unwrap();
        match ind {
            TaskHandlerIndMsg::TaskHandlerTaskInd(ind) => {
                assert_eq!(ind.task_ind.handle, 7);
                assert_eq!(
                    ind.task_ind.body,
                    RoboOneTaskBody::HindbrainDirect { command: FixedStr::new("ECHO:PING\n") }
                );
            }
            other => panic!("unexpected ind {:?}", other.msg_type()),
        }
    }

    #[tokio::test]
    async fn hindbrain_direct_dispatch_with_no_header_sends_no_ind() {
        let handler = TaskHandler::new(Arc::new(EchoHardware), Arc::new(NoopMotionHandler));
        let req = RoboOneTaskReq { header: None, body: RoboOneTaskBody::HindbrainDirect { command: FixedStr::new("X\n") } };
        assert!(handler.dispatch(req).await);
    }
}
