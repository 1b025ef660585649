pub mod dates;
pub mod logging;
pub mod paths;
pub mod terminal;

pub use dates::{date_stamp, epoch_to_datetime};
pub use logging::init_tracing;
pub use paths::{
    MAX_ENTRY_DEPTH, has_control_chars, is_conversation_file_name, safe_open_file, set_id_from_name, slugify_title,
    strip_wrapper, top_level_segment, validate_entry_path, validate_path_not_symlink,
};
pub use terminal::sanitize_terminal_text;
