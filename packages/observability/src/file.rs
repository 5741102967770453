//! JSONL file sink with size-based rotation.
//!
//! Every process appends to one file. When a write would push it past
//! `max_file_bytes` the file is moved to `<name>.1` (replacing any older
//! generation) and a fresh file is started, so the log never grows without
//! bound. On unix the file is created owner-only.

use crate::json_layer::JsonLayer;
use crate::LogConfig;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Default log file location, `~/.ordersdesk/logs/desk.jsonl`.
fn default_log_path() -> io::Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".ordersdesk").join("logs").join("desk.jsonl"))
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "home directory not found"))
}

fn open_append(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

/// Path of the previous generation, `desk.jsonl` -> `desk.jsonl.1`.
fn rotated_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".1");
    PathBuf::from(name)
}

struct ActiveFile {
    file: File,
    len: u64,
}

/// Appending writer shared by every clone. Each `write` call is one
/// complete log line and goes straight to the file.
#[derive(Clone)]
pub struct RotatingFileWriter {
    path: Arc<PathBuf>,
    max_bytes: u64,
    active: Arc<Mutex<ActiveFile>>,
}

impl RotatingFileWriter {
    pub fn new(path: &Path, max_bytes: u64) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = open_append(path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            path: Arc::new(path.to_path_buf()),
            max_bytes,
            active: Arc::new(Mutex::new(ActiveFile { file, len })),
        })
    }

    fn rotate(&self, active: &mut ActiveFile) -> io::Result<()> {
        std::fs::rename(self.path.as_path(), rotated_path(&self.path))?;
        active.file = open_append(&self.path)?;
        active.len = 0;
        Ok(())
    }
}

impl Write for RotatingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut active = self.active.lock();
        let incoming = buf.len() as u64;
        if self.max_bytes > 0 && active.len > 0 && active.len + incoming > self.max_bytes {
            self.rotate(&mut active)?;
        }

        active.file.write_all(buf)?;
        active.len += incoming;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.active.lock().file.flush()
    }
}

impl<'a> MakeWriter<'a> for RotatingFileWriter {
    type Writer = RotatingFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Install the JSONL file subscriber (plus optional stderr layer).
pub fn init_file_subscriber(config: &LogConfig) -> io::Result<()> {
    let log_path = match config.log_path.clone() {
        Some(path) => path,
        None => default_log_path()?,
    };

    let writer = RotatingFileWriter::new(&log_path, config.max_file_bytes)?;
    let json_layer = JsonLayer::new(config.service_name.clone(), writer);

    let stderr_layer = config.also_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .compact()
            .with_writer(io::stderr)
    });

    let env_filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_level))
    };

    tracing_subscriber::registry()
        .with(json_layer.with_filter(env_filter()))
        .with(stderr_layer.map(|l| l.with_filter(env_filter())))
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e.to_string()))?;

    tracing::debug!(
        log_path = %log_path.display(),
        max_file_bytes = config.max_file_bytes,
        "observability initialized"
    );
    Ok(())
}
