pub mod dispatch;
pub mod generator;
pub mod position;

pub use dispatch::{ChannelSink, DispatchError, EdgeKind, EventSink, PulseEvent};
pub use generator::{Phase, PulseGenerator, RunError, StopHandle, MAX_NAP};
pub use position::PositionFeed;
