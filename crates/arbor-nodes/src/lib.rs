//! Built-in processors for the arbor node tree: signal sources (constant,
//! sine, one-shot sample player) and effects/buses (gain, passthrough,
//! sharpen). All parameters are lock-free [`ParamCell`](arbor_core::ParamCell)s.

mod error;
pub use error::{Error, Result};

mod constant;
pub use constant::Constant;

mod sine;
pub use sine::Sine;

mod oneshot;
pub use oneshot::OneShot;

mod passthrough;
pub use passthrough::Passthrough;

mod gain;
pub use gain::Gain;

mod sharpen;
pub use sharpen::Sharpen;
