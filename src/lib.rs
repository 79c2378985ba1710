pub mod classify;
pub mod config;
pub mod decode;
pub mod error;
pub mod gaussian;
pub mod grouping;
pub mod hmm;
pub mod io;
pub mod model;
pub mod progress;
pub mod reference;
pub mod states;
pub mod transition;
pub mod utils;

pub use config::DecodeConfig;
pub use decode::{
    DecodedState, decode_allelic_ratio, decode_joint, decode_read_count,
    decode_read_count_fixed_fraction,
};
pub use error::{PloidyError, Result};
pub use model::GaussianHmm;
pub use reference::{ReferenceRecord, ReferenceTable};
