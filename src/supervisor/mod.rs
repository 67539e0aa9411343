//! Supervisor State Machine server (port 5231): the robot's power/charging/
//! activity lifecycle, driven by events that arrive as messages. Grounded
//! on `original_source/RoboOneStateMachine/api/state_machine_msg_macros.h`
//! (header on both Req and Cnf), `src/mobile_state.c` (entry-action style —
//! a handful of hardware calls per state, logged, with explicit failure
//! escalation in `Init`/`Mobile` only) and `src/client.c` (the event
//! dispatch loop this module's `Supervisor::apply` replaces).
//!
//! `original_source/RoboOneStateMachine/api/state_machine_msgs.h` never
//! defines `StateMachineMsgHeader`'s fields (only its use is visible in the
//! retrieved source); it is modelled here as a zero-field marker, matching
//! spec.md's description of the catalog as header-tagged but otherwise
//! empty. See DESIGN.md for this and the `InsufficientPower` deviation.

use std::sync::Arc;
use tracing::{info, warn};

use crate::battery_manager::BatteryManagerFacade;
use crate::fabric::server::{HandlerOutcome, ServerHandler};
use crate::fabric::wire::Received;
use crate::hardware::{HardwareFacade, PowerSource, RelayBank};
use crate::task_handler::{RoboOneTaskReq, TaskHandler};

/// Default port, named per spec.md §7 for tests/documentation; every binary
/// still takes its port as a CLI argument.
pub const DEFAULT_PORT: u16 = 5231;

/// Zero-field marker — see the module docs for why.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateMachineMsgHeader;

impl crate::catalog::Encode for StateMachineMsgHeader {
    fn encode(&self, _out: &mut Vec<u8>) {}
}
impl crate::catalog::DecodeR for StateMachineMsgHeader {
    fn decode_r(_r: &mut crate::catalog::Reader) -> anyhow::Result<Self> {
        Ok(Self)
    }
}

crate::declare_catalog! {
    catalog = StateMachine, header = StateMachineMsgHeader, header_cnf, no_ind;
    StateMachineServerStart = 0, StateMachineServerStartReq, StateMachineServerStartCnf {
        req {},
        cnf {}
    };
    StateMachineServerStop = 1, StateMachineServerStopReq, StateMachineServerStopCnf {
        req {},
        cnf {}
    };
    StateMachineEventInit = 2, StateMachineEventInitReq, StateMachineEventInitCnf {
        req {},
        cnf {}
    };
    StateMachineEventInitFailure = 3, StateMachineEventInitFailureReq, StateMachineEventInitFailureCnf {
        req {},
        cnf {}
    };
    StateMachineEventTimerExpiry = 4, StateMachineEventTimerExpiryReq, StateMachineEventTimerExpiryCnf {
        req {},
        cnf {}
    };
    StateMachineEventTasksAvailable = 5, StateMachineEventTasksAvailableReq, StateMachineEventTasksAvailableCnf {
        req { task: RoboOneTaskReq },
        cnf {}
    };
    StateMachineEventNoTasksAvailable = 6, StateMachineEventNoTasksAvailableReq, StateMachineEventNoTasksAvailableCnf {
        req {},
        cnf {}
    };
    StateMachineEventMainsPowerAvailable = 7, StateMachineEventMainsPowerAvailableReq, StateMachineEventMainsPowerAvailableCnf {
        req {},
        cnf {}
    };
    StateMachineEventInsufficientPower = 8, StateMachineEventInsufficientPowerReq, StateMachineEventInsufficientPowerCnf {
        req {},
        cnf {}
    };
    StateMachineEventFullyCharged = 9, StateMachineEventFullyChargedReq, StateMachineEventFullyChargedCnf {
        req {},
        cnf {}
    };
    StateMachineEventShutdown = 10, StateMachineEventShutdownReq, StateMachineEventShutdownCnf {
        req {},
        cnf {}
    };
}

/// The nine events a state may react to (spec.md §4.4), plus the payload
/// `TasksAvailable` carries.
#[derive(Debug, Clone)]
pub enum Event {
    Init,
    InitFailure,
    TimerExpiry,
    TasksAvailable(RoboOneTaskReq),
    NoTasksAvailable,
    MainsPowerAvailable,
    InsufficientPower,
    FullyCharged,
    Shutdown,
}

impl Event {
    fn name(&self) -> &'static str {
        match self {
            Self::Init => "Init",
            Self::InitFailure => "InitFailure",
            Self::TimerExpiry => "TimerExpiry",
            Self::TasksAvailable(_) => "TasksAvailable",
            Self::NoTasksAvailable => "NoTasksAvailable",
            Self::MainsPowerAvailable => "MainsPowerAvailable",
            Self::InsufficientPower => "InsufficientPower",
            Self::FullyCharged => "FullyCharged",
            Self::Shutdown => "Shutdown",
        }
    }
}

/// Shared façades an entry action may call. Cloning is cheap (`Arc`s).
#[derive(Clone)]
pub struct SupervisorContext {
    pub hardware: Arc<dyn HardwareFacade>,
    pub battery: Arc<dyn BatteryManagerFacade>,
    pub task_handler: Arc<TaskHandler>,
}

fn log_unhandled(state: &'static str, event: &'static str) {
    warn!("{state} has no handler for {event}; event dropped");
}

/// One state: a name plus nine event handlers, defaulted to log-and-drop,
/// and an entry action run once on transition into the state. Transition =
/// overwriting the active state with the handler's return value and
/// running its entry action (spec.md §4.0's "Supervisor context" note).
#[async_trait::async_trait]
pub trait State: Send + Sync {
    /// Bounded to 24 printable characters plus terminator (spec.md §4.4).
    fn name(&self) -> &'static str;

    async fn on_init(&self, _ctx: &SupervisorContext) -> Option<Arc<dyn State>> {
        log_unhandled(self.name(), "Init");
        None
    }
    async fn on_init_failure(&self, _ctx: &SupervisorContext) -> Option<Arc<dyn State>> {
        log_unhandled(self.name(), "InitFailure");
        None
    }
    async fn on_timer_expiry(&self, _ctx: &SupervisorContext) -> Option<Arc<dyn State>> {
        log_unhandled(self.name(), "TimerExpiry");
        None
    }
    async fn on_tasks_available(
        &self,
        _ctx: &SupervisorContext,
        _task: RoboOneTaskReq,
    ) -> Option<Arc<dyn State>> {
        log_unhandled(self.name(), "TasksAvailable");
        None
    }
    async fn on_no_tasks_available(&self, _ctx: &SupervisorContext) -> Option<Arc<dyn State>> {
        log_unhandled(self.name(), "NoTasksAvailable");
        None
    }
    async fn on_mains_power_available(&self, _ctx: &SupervisorContext) -> Option<Arc<dyn State>> {
        log_unhandled(self.name(), "MainsPowerAvailable");
        None
    }
    async fn on_insufficient_power(&self, _ctx: &SupervisorContext) -> Option<Arc<dyn State>> {
        log_unhandled(self.name(), "InsufficientPower");
        None
    }
    async fn on_fully_charged(&self, _ctx: &SupervisorContext) -> Option<Arc<dyn State>> {
        log_unhandled(self.name(), "FullyCharged");
        None
    }
    async fn on_shutdown(&self, _ctx: &SupervisorContext) -> Option<Arc<dyn State>> {
        log_unhandled(self.name(), "Shutdown");
        None
    }

    /// Runs once, immediately after this state becomes active. Returns
    /// `false` if a hardware action failed, which the dispatch loop turns
    /// into a cascaded `InitFailure` for the states that escalate it.
    async fn on_enter(&self, _ctx: &SupervisorContext) -> bool {
        true
    }

    async fn dispatch(&self, ctx: &SupervisorContext, event: Event) -> Option<Arc<dyn State>> {
        match event {
            Event::Init => self.on_init(ctx).await,
            Event::InitFailure => self.on_init_failure(ctx).await,
            Event::TimerExpiry => self.on_timer_expiry(ctx).await,
            Event::TasksAvailable(task) => self.on_tasks_available(ctx, task).await,
            Event::NoTasksAvailable => self.on_no_tasks_available(ctx).await,
            Event::MainsPowerAvailable => self.on_mains_power_available(ctx).await,
            Event::InsufficientPower => self.on_insufficient_power(ctx).await,
            Event::FullyCharged => self.on_fully_charged(ctx).await,
            Event::Shutdown => self.on_shutdown(ctx).await,
        }
    }
}

fn hardware_ok(results: Vec<anyhow::Result<bool>>) -> bool {
    let mut ok = true;
    for r in results {
        match r {
            Ok(true) => {}
            Ok(false) => ok = false,
            Err(err) => {
                warn!("hardware entry action failed: {err}");
                ok = false;
            }
        }
    }
    ok
}

pub struct Init;

#[async_trait::async_trait]
impl State for Init {
    fn name(&self) -> &'static str {
        "Init"
    }
    async fn on_init(&self, _ctx: &SupervisorContext) -> Option<Arc<dyn State>> {
        None // self
    }
    async fn on_init_failure(&self, _ctx: &SupervisorContext) -> Option<Arc<dyn State>> {
        Some(Arc::new(Shutdown))
    }
    async fn on_timer_expiry(&self, _ctx: &SupervisorContext) -> Option<Arc<dyn State>> {
        Some(Arc::new(BatteryIdle))
    }
    async fn on_tasks_available(&self, _ctx: &SupervisorContext, task: RoboOneTaskReq) -> Option<Arc<dyn State>> {
        Some(Arc::new(Mobile { task }))
    }
    async fn on_mains_power_available(&self, _ctx: &SupervisorContext) -> Option<Arc<dyn State>> {
        Some(Arc::new(Docked))
    }
    async fn on_insufficient_power(&self, _ctx: &SupervisorContext) -> Option<Arc<dyn State>> {
        Some(Arc::new(Shutdown))
    }
    async fn on_shutdown(&self, _ctx: &SupervisorContext) -> Option<Arc<dyn State>> {
        Some(Arc::new(Shutdown))
    }
    async fn on_enter(&self, ctx: &SupervisorContext) -> bool {
        hardware_ok(vec![
            ctx.hardware.enable_relays(RelayBank::Internal).await,
            ctx.hardware.enable_relays(RelayBank::External).await,
            ctx.hardware.switch_pi_rio_power(PowerSource::Battery).await,
            ctx.hardware.switch_hindbrain_power(PowerSource::Battery).await,
            ctx.hardware.switch_on_hindbrain().await,
        ])
    }
}

pub struct BatteryIdle;

#[async_trait::async_trait]
impl State for BatteryIdle {
    fn name(&self) -> &'static str {
        "BatteryIdle"
    }
    async fn on_tasks_available(&self, _ctx: &SupervisorContext, task: RoboOneTaskReq) -> Option<Arc<dyn State>> {
        Some(Arc::new(Mobile { task }))
    }
    async fn on_mains_power_available(&self, _ctx: &SupervisorContext) -> Option<Arc<dyn State>> {
        Some(Arc::new(Docked))
    }
    async fn on_insufficient_power(&self, _ctx: &SupervisorContext) -> Option<Arc<dyn State>> {
        Some(Arc::new(Shutdown))
    }
    async fn on_shutdown(&self, _ctx: &SupervisorContext) -> Option<Arc<dyn State>> {
        Some(Arc::new(Shutdown))
    }
    async fn on_enter(&self, ctx: &SupervisorContext) -> bool {
        if let Err(err) = ctx.hardware.switch_off_hindbrain().await {
            warn!("BatteryIdle entry action failed (ignored, not escalated): {err}");
        }
        true
    }
}

pub struct Mobile {
    task: RoboOneTaskReq,
}

#[async_trait::async_trait]
impl State for Mobile {
    fn name(&self) -> &'static str {
        "Mobile"
    }
    async fn on_init_failure(&self, _ctx: &SupervisorContext) -> Option<Arc<dyn State>> {
        Some(Arc::new(Init))
    }
    async fn on_tasks_available(&self, _ctx: &SupervisorContext, task: RoboOneTaskReq) -> Option<Arc<dyn State>> {
        Some(Arc::new(Mobile { task }))
    }
    async fn on_no_tasks_available(&self, _ctx: &SupervisorContext) -> Option<Arc<dyn State>> {
        Some(Arc::new(BatteryIdle))
    }
    async fn on_mains_power_available(&self, _ctx: &SupervisorContext) -> Option<Arc<dyn State>> {
        Some(Arc::new(Docked))
    }
    async fn on_shutdown(&self, _ctx: &SupervisorContext) -> Option<Arc<dyn State>> {
        Some(Arc::new(Shutdown))
    }
    async fn on_enter(&self, ctx: &SupervisorContext) -> bool {
        let ok = hardware_ok(vec![
            ctx.hardware.switch_pi_rio_power(PowerSource::Battery).await,
            ctx.hardware.switch_hindbrain_power(PowerSource::Battery).await,
            ctx.hardware.switch_on_hindbrain().await,
        ]);
        let dispatched = ctx.task_handler.dispatch(self.task.clone()).await;
        info!("Mobile dispatched causing task, success={dispatched}");
        ok
    }
}

pub struct Docked;

async fn docked_entry_actions(ctx: &SupervisorContext) -> bool {
    let ok = hardware_ok(vec![
        ctx.hardware.enable_relays(RelayBank::External).await,
        ctx.hardware.switch_pi_rio_power(PowerSource::Mains).await,
        ctx.hardware.switch_hindbrain_power(PowerSource::Mains).await,
        ctx.hardware.switch_off_hindbrain().await,
    ]);
    if let Err(err) = ctx.battery.set_charging_permitted(true).await {
        warn!("failed to notify battery manager that charging is permitted: {err}");
    }
    ok
}

#[async_trait::async_trait]
impl State for Docked {
    fn name(&self) -> &'static str {
        "Docked"
    }
    async fn on_tasks_available(&self, _ctx: &SupervisorContext, task: RoboOneTaskReq) -> Option<Arc<dyn State>> {
        Some(Arc::new(Mobile { task }))
    }
    async fn on_insufficient_power(&self, _ctx: &SupervisorContext) -> Option<Arc<dyn State>> {
        Some(Arc::new(Shutdown))
    }
    async fn on_fully_charged(&self, _ctx: &SupervisorContext) -> Option<Arc<dyn State>> {
        Some(Arc::new(DockedMainsIdle))
    }
    async fn on_shutdown(&self, _ctx: &SupervisorContext) -> Option<Arc<dyn State>> {
        Some(Arc::new(Shutdown))
    }
    async fn on_enter(&self, ctx: &SupervisorContext) -> bool {
        docked_entry_actions(ctx).await
    }
}

/// No transition in spec.md §4.4's table enters this state from another —
/// it is reachable only by direct construction (e.g. a test fixture or a
/// future caller). Its row is implemented in full regardless, since the
/// spec defines its behaviour even without naming its trigger.
pub struct DockedCharging;

#[async_trait::async_trait]
impl State for DockedCharging {
    fn name(&self) -> &'static str {
        "DockedCharging"
    }
    async fn on_insufficient_power(&self, _ctx: &SupervisorContext) -> Option<Arc<dyn State>> {
        Some(Arc::new(Shutdown))
    }
    async fn on_fully_charged(&self, _ctx: &SupervisorContext) -> Option<Arc<dyn State>> {
        Some(Arc::new(DockedMainsIdle))
    }
    async fn on_shutdown(&self, _ctx: &SupervisorContext) -> Option<Arc<dyn State>> {
        Some(Arc::new(Shutdown))
    }
    async fn on_enter(&self, ctx: &SupervisorContext) -> bool {
        docked_entry_actions(ctx).await
    }
}

pub struct DockedMainsIdle;

#[async_trait::async_trait]
impl State for DockedMainsIdle {
    fn name(&self) -> &'static str {
        "DockedMainsIdle"
    }
}

pub struct Shutdown;

#[async_trait::async_trait]
impl State for Shutdown {
    fn name(&self) -> &'static str {
        "Shutdown"
    }
    async fn on_enter(&self, ctx: &SupervisorContext) -> bool {
        if let Err(err) = ctx.battery.set_charging_permitted(false).await {
            warn!("failed to notify battery manager that charging is no longer permitted: {err}");
        }
        hardware_ok(vec![
            ctx.hardware.switch_off_hindbrain().await,
            ctx.hardware.disable_relays(RelayBank::Internal).await,
            ctx.hardware.disable_relays(RelayBank::External).await,
        ])
    }
}

/// Holds the active state and runs events to completion one at a time
/// (spec.md §4.4: "single-threaded ... one event is fully processed before
/// the next is accepted").
pub struct Supervisor {
    state: std::sync::Mutex<Arc<dyn State>>,
    ctx: SupervisorContext,
}

impl Supervisor {
    pub fn new(ctx: SupervisorContext) -> Self {
        Self { state: std::sync::Mutex::new(Arc::new(Init) as Arc<dyn State>), ctx }
    }

    pub fn state_name(&self) -> &'static str {
        self.state.lock().unwrap().name()
    }

    /// Applies one event, including any cascaded `InitFailure` that an
    /// entry action's failure triggers (spec.md §4.4's "On any failure,
    /// post InitFailure to self").
    pub async fn apply(&self, mut event: Event) {
        loop {
            let current = self.state.lock().unwrap().clone();
            info!("{} handling {}", current.name(), event.name());
            let Some(next) = current.dispatch(&self.ctx, event).await else {
                return;
            };
            let entered = next.name();
            let ok = next.on_enter(&self.ctx).await;
            *self.state.lock().unwrap() = next;
            info!("transitioned to {entered}");
            if ok {
                return;
            }
            warn!("{entered} entry action failed, cascading InitFailure");
            event = Event::InitFailure;
        }
    }
}

/// The messaging-fabric handler for the state machine server. Deliberately
/// corrects the original's bug where `InsufficientPower` was routed to the
/// `MainsPowerAvailable` handler (see DESIGN.md).
pub struct SupervisorServer {
    supervisor: Arc<Supervisor>,
}

impl SupervisorServer {
    pub fn new(supervisor: Arc<Supervisor>) -> Self {
        Self { supervisor }
    }

    fn run(&self, event: Event) {
        let supervisor = self.supervisor.clone();
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(supervisor.apply(event))
        });
    }
}

impl ServerHandler for SupervisorServer {
    fn handle(&mut self, received: Received) -> HandlerOutcome {
        let Some(frame) = received else {
            return HandlerOutcome::ExitNormally;
        };
        let Ok(msg_type) = StateMachineMsgType::from_code(frame.msg_type) else {
            warn!("unknown state machine message type {}", frame.msg_type);
            return HandlerOutcome::KeepRunning(None);
        };
        let Ok(msg) = StateMachineReqMsg::decode_body(msg_type, &frame.body) else {
            warn!("malformed {} body", msg_type.name());
            return HandlerOutcome::KeepRunning(None);
        };

        let header = StateMachineMsgHeader;
        match msg {
            StateMachineReqMsg::StateMachineServerStart(_) => {
                let cnf = StateMachineCnfMsg::StateMachineServerStart(StateMachineServerStartCnf { header });
                HandlerOutcome::KeepRunning(Some(cnf.to_frame()))
            }
            StateMachineReqMsg::StateMachineServerStop(_) => HandlerOutcome::ExitNormally,
            StateMachineReqMsg::StateMachineEventInit(_) => {
                self.run(Event::Init);
                let cnf = StateMachineCnfMsg::StateMachineEventInit(StateMachineEventInitCnf { header });
                HandlerOutcome::KeepRunning(Some(cnf.to_frame()))
            }
            StateMachineReqMsg::StateMachineEventInitFailure(_) => {
                self.run(Event::InitFailure);
                let cnf =
                    StateMachineCnfMsg::StateMachineEventInitFailure(StateMachineEventInitFailureCnf { header });
                HandlerOutcome::KeepRunning(Some(cnf.to_frame()))
            }
            StateMachineReqMsg::StateMachineEventTimerExpiry(_) => {
                self.run(Event::TimerExpiry);
                let cnf =
                    StateMachineCnfMsg::StateMachineEventTimerExpiry(StateMachineEventTimerExpiryCnf { header });
                HandlerOutcome::KeepRunning(Some(cnf.to_frame()))
            }
            StateMachineReqMsg::StateMachineEventTasksAvailable(req) => {
                self.run(Event::TasksAvailable(req.task));
                let cnf = StateMachineCnfMsg::StateMachineEventTasksAvailable(
                    StateMachineEventTasksAvailableCnf { header },
                );
                HandlerOutcome::KeepRunning(Some(cnf.to_frame()))
            }
            StateMachineReqMsg::StateMachineEventNoTasksAvailable(_) => {
                self.run(Event::NoTasksAvailable);
                let cnf = StateMachineCnfMsg::StateMachineEventNoTasksAvailable(
                    StateMachineEventNoTasksAvailableCnf { header },
                );
                HandlerOutcome::KeepRunning(Some(cnf.to_frame()))
            }
            StateMachineReqMsg::StateMachineEventMainsPowerAvailable(_) => {
                self.run(Event::MainsPowerAvailable);
                let cnf = StateMachineCnfMsg::StateMachineEventMainsPowerAvailable(
                    StateMachineEventMainsPowerAvailableCnf { header },
                );
                HandlerOutcome::KeepRunning(Some(cnf.to_frame()))
            }
            StateMachineReqMsg::StateMachineEventInsufficientPower(_) => {
                // Corrected: the original routes this to pMainsPowerAvailable.
                self.run(Event::InsufficientPower);
                let cnf = StateMachineCnfMsg::StateMachineEventInsufficientPower(
                    StateMachineEventInsufficientPowerCnf { header },
                );
                HandlerOutcome::KeepRunning(Some(cnf.to_frame()))
            }
            StateMachineReqMsg::StateMachineEventFullyCharged(_) => {
                self.run(Event::FullyCharged);
                let cnf =
                    StateMachineCnfMsg::StateMachineEventFullyCharged(StateMachineEventFullyChargedCnf { header });
                HandlerOutcome::KeepRunning(Some(cnf.to_frame()))
            }
            StateMachineReqMsg::StateMachineEventShutdown(_) => {
                self.run(Event::Shutdown);
                let cnf =
                    StateMachineCnfMsg::StateMachineEventShutdown(StateMachineEventShutdownCnf { header });
                HandlerOutcome::KeepRunning(Some(cnf.to_frame()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battery_manager::BatteryManagerFacade;
    use crate::hardware::HardwareFacade;
    use crate::task_handler::{MotionHandler, MotionResult, RoboOneTaskBody};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeHardware {
        fail_init: AtomicBool,
    }

    #[async_trait]
    impl HardwareFacade for FakeHardware {
        async fn enable_relays(&self, _bank: RelayBank) -> anyhow::Result<bool> {
            Ok(!self.fail_init.load(Ordering::SeqCst))
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
        async fn send_o_string(&self, _command: &str, _wait: bool) -> anyhow::Result<(bool, String)> {
            Ok((true, String::new()))
        }
    }

    struct FakeBattery;
    #[async_trait]
    impl BatteryManagerFacade for FakeBattery {
        async fn set_charging_permitted(&self, _permitted: bool) -> anyhow::Result<bool> {
            Ok(true)
        }
    }

    struct FakeMotion;
    impl MotionHandler for FakeMotion {
        fn dispatch(&self, _command_code: u32) -> MotionResult {
            MotionResult::Accepted
        }
    }

    fn test_ctx(fail_init: bool) -> SupervisorContext {
        SupervisorContext {
            hardware: Arc::new(FakeHardware { fail_init: AtomicBool::new(fail_init) }),
            battery: Arc::new(FakeBattery),
            task_handler: Arc::new(TaskHandler::new(Arc::new(FakeHardware { fail_init: AtomicBool::new(false) }), Arc::new(FakeMotion))),
        }
    }

    fn sample_task() -> RoboOneTaskReq {
        RoboOneTaskReq { header: None, body: RoboOneTaskBody::Motion { command_code: 1 } }
    }

    #[tokio::test]
    async fn init_to_mobile_on_tasks_available() {
        let supervisor = Supervisor::new(test_ctx(false));
        supervisor.apply(Event::TasksAvailable(sample_task())).await;
        assert_eq!(supervisor.state_name(), "Mobile");
    }

    #[tokio::test]
    async fn mobile_to_shutdown_on_shutdown_event() {
        let supervisor = Supervisor::new(test_ctx(false));
        supervisor.apply(Event::TasksAvailable(sample_task())).await;
        assert_eq!(supervisor.state_name(), "Mobile");
        supervisor.apply(Event::Shutdown).await;
        assert_eq!(supervisor.state_name(), "Shutdown");
    }

    #[tokio::test]
    async fn insufficient_power_routes_to_its_own_handler_not_mains_power() {
        let supervisor = Supervisor::new(test_ctx(false));
        supervisor.apply(Event::MainsPowerAvailable).await;
        assert_eq!(supervisor.state_name(), "Docked");
        supervisor.apply(Event::InsufficientPower).await;
        assert_eq!(supervisor.state_name(), "Shutdown");
    }

    #[tokio::test]
    async fn unhandled_event_is_dropped_not_panicked() {
        let supervisor = Supervisor::new(test_ctx(false));
        supervisor.apply(Event::FullyCharged).await;
        assert_eq!(supervisor.state_name(), "Init");
    }
}
