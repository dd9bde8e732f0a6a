#![forbid(trivial_numeric_casts)]
#![forbid(unused_qualifications)]
#![forbid(unreachable_pub)]
#![forbid(deprecated_in_future)]

pub mod capi;
pub mod context;
pub mod debug;
pub mod engine;
pub mod perf;
pub mod residual;
pub mod traits;

pub use context::{ContextModel, ContextTable, INIT_VALUES};
pub use debug::{BinRecord, DebugContext, DebugReader};
pub use engine::CabacDecoder;
pub use traits::CabacReader;
