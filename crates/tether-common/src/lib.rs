pub mod errors;
pub mod id;
pub mod types;

pub use errors::{ConfigError, InvokeError, TetherError, TransportError};
pub use id::{CallbackId, IdAllocator};
pub use types::{ModuleName, WindowDescriptor, WindowScope};

pub type Result<T> = std::result::Result<T, TetherError>;
