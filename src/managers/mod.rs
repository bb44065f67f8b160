// Managers Module
//
// Focused manager classes, each owning one concern of the running application:
// - SessionManager: Session lifecycle, learner operations and the polling task
// - BroadcastChannelManager: Tokio broadcast channel management
// - PositionPoller: Scoped handle on the position polling task

pub mod broadcast_manager;
pub mod position_poller;
pub mod session_manager;

pub use broadcast_manager::{BroadcastChannelManager, StatusUpdate};
pub use position_poller::PositionPoller;
pub use session_manager::{SessionBackends, SessionManager};
