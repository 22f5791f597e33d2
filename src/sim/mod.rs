//! 仿真调度模块
//!
//! 在逻辑时钟上驱动发生规则：单步执行、连续运行、暂停与取消。
//! 时间只由调用方推进（[`Scheduler::advance_to`] / [`Scheduler::run`]），不存在真实等待。

pub mod clock;
pub mod delay;
pub mod history;
pub mod policy;
pub mod scheduler;

pub use clock::{Clock, LogicalClock, SimTime, TimerToken};
pub use delay::{firing_delay, sample_exponential};
pub use history::{HistoryEntry, MarkingHistory};
pub use policy::{ParsePolicyError, SelectionPolicy};
pub use scheduler::{PendingFiring, Scheduler, SchedulerError, SchedulerState, SimEvent};
