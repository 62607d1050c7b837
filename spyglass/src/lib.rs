// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

pub use handlers::{coverage_exit_code, effective_gate_policy, normalize_target_url};

pub use spyglass_core::scan::{
    ScanOptions, discover_targets, extract_url_path, probe_targets,
};
