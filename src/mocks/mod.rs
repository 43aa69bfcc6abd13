//! Interface discovery and mock synthesis for Go packages.

pub mod convention;
pub mod synthesizer;

pub use convention::MockConvention;
pub use synthesizer::{find_interface, mock_method_names, synthesize, synthesize_or_template};
