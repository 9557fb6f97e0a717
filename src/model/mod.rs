//! Domain types shared by the cache, the bucketizer and the sync layer.

mod category;
mod date;
mod task;

pub use category::Category;
pub use date::{CalendarDate, ClockTime};
pub use task::{RepeatType, Task, TaskError};
