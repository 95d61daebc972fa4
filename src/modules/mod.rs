mod flipflop;
pub use flipflop::*;

mod mode;
pub use mode::*;

mod activity;
pub use activity::*;

mod receive;
pub use receive::*;

mod cdc;
pub use cdc::*;

mod transmit;
pub use transmit::*;

mod slave;
pub use slave::*;

mod master;
pub use master::*;

pub use crate::simulator::Tristate;
