pub mod client;
pub mod error;
pub mod job;
pub mod models;
pub mod presets;
pub mod request;
pub mod tensor;
pub mod transport;
pub mod types;
pub mod utils;

pub use client::JobClient;
pub use error::{JobError, Result};
pub use job::{GenerationResult, Job, TaskStatus};
pub use presets::{MAX_SEED, MediaKind, Mode, ModePreset, PollPolicy};
pub use request::{GenerationRequest, MediaSource};
pub use tensor::{ImageTensor, decode_image, encode_png};
pub use transport::{HttpTransport, ThreadSleeper, Transport, Waiter};
pub use types::{ApiKey, Endpoints, Region, Service};
