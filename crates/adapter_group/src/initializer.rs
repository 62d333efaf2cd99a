//! Member initialization supervisor
//!
//! `initialize()` may block, so it runs on the blocking pool. A separate
//! watchdog task only warns when the timeout elapses; it never cancels the
//! supervised work.

use std::sync::{Arc, Weak};
use std::time::Duration;

use contracts::{panic_message, ContractError};
use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, instrument, warn};

use crate::group::GroupShared;
use crate::member::Member;

/// Queue background initialization of `member`
///
/// Reports an `InitializationFailure` when there is no runtime to run it on.
pub(crate) fn schedule(shared: &Arc<GroupShared>, member: Member) {
    let Some(runtime) = shared.runtime.clone() else {
        shared.notifier.group_error(ContractError::initialization(
            member.state.name.clone(),
            "failed to queue initialization: no async runtime available",
        ));
        return;
    };

    let group = Arc::downgrade(shared);
    runtime.spawn(supervise(group, member, runtime.clone()));
}

#[instrument(
    name = "member_initialize",
    skip_all,
    fields(component_id = member.state.id, component = %member.state.name)
)]
async fn supervise(group: Weak<GroupShared>, member: Member, runtime: Handle) {
    let watchdog = start_watchdog(&group, &member, &runtime);

    let component = member.component.clone();
    let outcome = runtime
        .spawn_blocking(move || component.initialize())
        .await;

    if let Some(watchdog) = watchdog {
        watchdog.abort();
    }

    let Some(shared) = group.upgrade() else {
        debug!("group dropped before initialization completed");
        return;
    };

    if !member.state.is_attached() {
        debug!("member removed during initialization, ignoring completion");
        return;
    }

    match outcome {
        Ok(Ok(())) => on_initialized(&shared, &member),
        Ok(Err(e)) => shared.notifier.group_error(ContractError::initialization(
            member.state.name.clone(),
            e.to_string(),
        )),
        Err(e) => shared.notifier.group_error(ContractError::initialization(
            member.state.name.clone(),
            join_failure(e),
        )),
    }
}

fn on_initialized(shared: &GroupShared, member: &Member) {
    member.state.mark_initialized();
    info!("component initialized");

    if shared.is_auto_start_delayed() || !member.component.auto_start() {
        return;
    }

    if let Err(e) = member.component.start() {
        shared.notifier.group_error(ContractError::start(
            member.state.name.clone(),
            e.to_string(),
        ));
    }
}

fn start_watchdog(
    group: &Weak<GroupShared>,
    member: &Member,
    runtime: &Handle,
) -> Option<JoinHandle<()>> {
    let timeout = member.state.initialization_timeout;
    if timeout.is_zero() {
        return None;
    }

    let group = group.clone();
    let state = member.state.clone();
    Some(runtime.spawn(async move {
        tokio::time::sleep(timeout).await;

        let Some(shared) = group.upgrade() else {
            return;
        };
        if state.is_attached() && !state.is_initialized() {
            warn!(component = %state.name, timeout_secs = timeout.as_secs_f64(), "initialization timeout exceeded");
            shared.notifier.group_status(timeout_warning(&state.name, timeout));
        }
    }))
}

/// Advisory text emitted by the watchdog
pub fn timeout_warning(name: &str, timeout: Duration) -> String {
    format!(
        "WARNING: Initialization of adapter {name} has exceeded its timeout of {} seconds. \
         The adapter may still initialize, however this may indicate a problem with the adapter. \
         If you consider this to be normal, try adjusting the initialization timeout to suppress \
         this message during normal operations.",
        timeout.as_secs_f64()
    )
}

fn join_failure(err: JoinError) -> String {
    if err.is_panic() {
        format!("panicked: {}", panic_message(&*err.into_panic()))
    } else {
        "initialization task was cancelled".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_warning_text() {
        let text = timeout_warning("pmu_a", Duration::from_millis(1_500));
        assert!(text.starts_with("WARNING: Initialization of adapter pmu_a has exceeded its timeout of 1.5 seconds."));
    }
}
