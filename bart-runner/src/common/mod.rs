pub mod source;
pub mod trigger;
pub mod util;

pub use source::FileTableSource;
pub use trigger::TriggerSink;
pub use util::{create_export, split_csv};
