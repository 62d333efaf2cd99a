//! Group member bookkeeping

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{Component, ComponentId, EventSource};

/// Which notifications of a member reach the group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum Wiring {
    /// Everything
    Wired = 0,
    /// Only `Disposed` (member is being torn down)
    DisposeOnly = 1,
    /// Nothing
    Unwired = 2,
}

impl Wiring {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Wired,
            1 => Self::DisposeOnly,
            _ => Self::Unwired,
        }
    }
}

/// Per-member state tracked by the group
#[derive(Debug)]
pub(crate) struct MemberState {
    pub id: ComponentId,
    pub name: String,
    pub initialization_timeout: Duration,
    initialized: AtomicBool,
    attached: AtomicBool,
    wiring: AtomicU8,
}

impl MemberState {
    pub fn new(id: ComponentId, name: &str, initialization_timeout: Duration) -> Self {
        Self {
            id,
            name: name.to_string(),
            initialization_timeout,
            initialized: AtomicBool::new(false),
            attached: AtomicBool::new(true),
            wiring: AtomicU8::new(Wiring::Wired as u8),
        }
    }

    pub fn source(&self) -> EventSource {
        EventSource::Component {
            id: self.id,
            name: self.name.clone(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::Release);
    }

    /// Still a member of its group
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    pub fn detach(&self) {
        self.attached.store(false, Ordering::Release);
    }

    pub fn wiring(&self) -> Wiring {
        Wiring::from_u8(self.wiring.load(Ordering::Acquire))
    }

    pub fn set_wiring(&self, wiring: Wiring) {
        self.wiring.store(wiring as u8, Ordering::Release);
    }
}

/// Component handle plus its group-side state
#[derive(Clone)]
pub(crate) struct Member {
    pub component: Arc<dyn Component>,
    pub state: Arc<MemberState>,
}

impl Member {
    pub fn new(component: Arc<dyn Component>, initialization_timeout: Duration) -> Self {
        let state = Arc::new(MemberState::new(
            component.id(),
            component.name(),
            initialization_timeout,
        ));
        Self { component, state }
    }

    pub fn id(&self) -> ComponentId {
        self.state.id
    }
}
