/*!
 * Host Events
 * Inbound interface for the host adapter and its serializable replay form
 */

use crate::core::types::{Pid, Score};
use crate::process::core::types::{Identity, SurfaceEventKind, SurfaceToken};
use serde::{Deserialize, Serialize};

/// Callbacks the host adapter delivers to the kernel
pub trait HostEventSink: Send + Sync {
    fn on_surface_event(&self, kind: SurfaceEventKind, identity: Identity, token: SurfaceToken);

    fn on_process_created(&self, pid: Pid, identity: Identity, is_main: bool);

    fn on_process_died(&self, pid: Pid);

    /// Report a score recomputation
    ///
    /// Returns the score the adapter should impose instead, when the
    /// process's application carries a custom main-process score.
    fn on_score_changed(&self, pid: Pid, previous: Score, current: Score) -> Option<Score>;
}

/// One host callback, as read by the replay driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    Surface {
        kind: SurfaceEventKind,
        identity: Identity,
        token: SurfaceToken,
    },
    ProcessCreated {
        pid: Pid,
        identity: Identity,
        #[serde(default)]
        is_main: bool,
    },
    ProcessDied {
        pid: Pid,
    },
    ScoreChanged {
        pid: Pid,
        previous: Score,
        current: Score,
    },
}

impl HostEvent {
    /// Deliver this event to `sink`
    pub fn apply(self, sink: &dyn HostEventSink) -> Option<Score> {
        match self {
            HostEvent::Surface {
                kind,
                identity,
                token,
            } => {
                sink.on_surface_event(kind, identity, token);
                None
            }
            HostEvent::ProcessCreated {
                pid,
                identity,
                is_main,
            } => {
                sink.on_process_created(pid, identity, is_main);
                None
            }
            HostEvent::ProcessDied { pid } => {
                sink.on_process_died(pid);
                None
            }
            HostEvent::ScoreChanged {
                pid,
                previous,
                current,
            } => sink.on_score_changed(pid, previous, current),
        }
    }
}
