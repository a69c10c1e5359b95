pub mod icons;
pub mod output;
pub mod progress;
pub mod progress_message;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{header, section, status, success, warn};
pub use progress::ProgressManager;
pub use progress_message::ProgressMessage;
pub use table::{stats_table, TableBuilder};
pub use theme::{theme, Theme};
