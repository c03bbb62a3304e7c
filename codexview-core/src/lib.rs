pub mod config;
pub mod decode;
pub mod error;
pub mod html;
pub mod model;
pub mod page;
pub mod render;
pub mod revision;
pub mod server;
pub mod service;
pub mod upload;

pub use config::{ConfigOverrides, DEFAULT_PORT, ViewerConfig, resolve_log_path};
pub use decode::decode_log;
pub use error::{Result, ViewerError};
pub use model::{
    DiffEntry, Entry, EntryStyle, EntryTag, LogLine, Record, RecordKind, UploadSnapshot,
};
pub use render::render_entries;
pub use revision::{GitHistoryBuilder, HistoryBuilder, RevisionBuildError};
pub use server::{AppState, bind, build_router, serve};
pub use service::{LoadedLog, load_log, read_log_raw, render_timeline, render_upload_report};
pub use upload::{DEFAULT_UPLOAD_FUNCTION, extract_uploads};
