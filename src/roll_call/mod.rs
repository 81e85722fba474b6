pub mod clock;
pub mod leave_validator;
pub mod manager;
pub mod selection;
pub mod status;

pub use clock::{Clock, ManualClock, SystemClock};
pub use leave_validator::{check_approved_leave, is_on_approved_leave};
pub use manager::{MarkOutcome, OpenSessionRequest, RollCallManager, SessionView};
pub use status::RecordStatus;
