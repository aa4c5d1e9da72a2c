
pub mod adaptive;
pub mod combiner;
pub mod receiver;

pub use self::adaptive::{AdaptiveController, OperatingParams, SpeedCategory};
pub use self::combiner::{RakeCombiner, MAX_FINGERS};
pub use self::receiver::{RakeControl, RakeReceiver, MAX_HISTORY};
