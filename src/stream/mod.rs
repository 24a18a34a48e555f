mod channel;
mod output;
mod tracker;

pub use channel::{OutputReceiver, OutputSender, RequestEmitter, output_channel};
pub use output::{FinishReason, RequestStreamOutput};
pub use tracker::{CompletedRequest, StreamProgress, StreamTracker};
