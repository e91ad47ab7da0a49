// src/logging/runtime_logger.rs

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use chrono::{FixedOffset, Utc};
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::oneshot;
use tokio::task;
use tokio::time::{self, Duration};
use tracing_appender::rolling;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::MakeWriter;

/// 日志文件保留时长
const RETENTION_HOURS: u64 = 72;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    const ALL: [LogLevel; 4] = [LogLevel::Debug, LogLevel::Info, LogLevel::Warn, LogLevel::Error];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

enum LogCommand {
    Entry { level: LogLevel, content: String },
    /// 立即落盘并回执
    Flush(oneshot::Sender<()>),
}

/// 运行日志管理器（RuntimeLogger）
/// 将服务运行日志与每次调用的摘要按级别分流写入不同的滚动文件。
pub struct RuntimeLogger {
    sender: Sender<LogCommand>,
}

impl RuntimeLogger {
    /// - `log_dir`: 日志目录
    /// - `file_prefix`: 文件前缀，最终文件名形如 `runtime_info.json`
    /// - `buffer_size`: mpsc 通道容量
    /// - `batch_size`: 单个级别累计多少条后写盘
    /// - `flush_interval`: 定时写盘间隔（毫秒）
    ///
    /// 必须在 tokio 运行时内调用。
    pub fn new(
        log_dir: &str,
        file_prefix: &str,
        buffer_size: usize,
        batch_size: usize,
        flush_interval: u64,
    ) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let log_files: HashMap<LogLevel, Arc<RollingFileAppender>> = LogLevel::ALL
            .iter()
            .map(|level| {
                let file_name = format!("{}_{}.json", file_prefix, level.as_str().to_lowercase());
                (*level, Arc::new(rolling::hourly(log_dir, file_name)))
            })
            .collect();

        tokio::spawn(Self::background_log_writer(log_files, receiver, batch_size, flush_interval));

        let log_dir = log_dir.to_string();
        tokio::spawn(async move {
            let mut sweep = time::interval(Duration::from_secs(3600));
            loop {
                sweep.tick().await;
                Self::cleanup_old_logs(&log_dir, RETENTION_HOURS).await;
            }
        });

        Arc::new(Self { sender })
    }

    pub async fn log(&self, level: LogLevel, message: &str) {
        let content = json!({
            "timestamp": local_timestamp(),
            "level": level.as_str(),
            "message": message,
        })
        .to_string();
        self.send(LogCommand::Entry { level, content }).await;
    }

    /// 结构化记录直接序列化为一行 JSON
    pub async fn log_record<R: Serialize>(&self, level: LogLevel, record: &R) {
        match serde_json::to_string(record) {
            Ok(content) => self.send(LogCommand::Entry { level, content }).await,
            Err(e) => eprintln!("Failed to serialize runtime log record: {}", e),
        }
    }

    /// 等待后台任务把缓冲区全部写盘
    pub async fn shutdown(&self) {
        let (ack, done) = oneshot::channel();
        self.send(LogCommand::Flush(ack)).await;
        let _ = done.await;
    }

    async fn send(&self, command: LogCommand) {
        if let Err(e) = self.sender.send(command).await {
            eprintln!("Failed to send runtime log message: {}", e);
        }
    }

    async fn background_log_writer(
        log_files: HashMap<LogLevel, Arc<RollingFileAppender>>,
        mut receiver: Receiver<LogCommand>,
        batch_size: usize,
        flush_interval: u64,
    ) {
        let mut buffers: HashMap<LogLevel, Vec<String>> = HashMap::new();
        let mut interval = time::interval(Duration::from_millis(flush_interval));
        loop {
            tokio::select! {
                command = receiver.recv() => match command {
                    Some(LogCommand::Entry { level, content }) => {
                        let buffer = buffers.entry(level).or_default();
                        buffer.push(content);
                        if buffer.len() >= batch_size {
                            Self::flush_level(&log_files, level, buffer).await;
                        }
                    }
                    Some(LogCommand::Flush(ack)) => {
                        Self::flush_all(&log_files, &mut buffers).await;
                        let _ = ack.send(());
                    }
                    None => {
                        Self::flush_all(&log_files, &mut buffers).await;
                        break;
                    }
                },
                _ = interval.tick() => {
                    Self::flush_all(&log_files, &mut buffers).await;
                }
            }
        }
    }

    async fn flush_all(
        log_files: &HashMap<LogLevel, Arc<RollingFileAppender>>,
        buffers: &mut HashMap<LogLevel, Vec<String>>,
    ) {
        for (level, buffer) in buffers.iter_mut() {
            Self::flush_level(log_files, *level, buffer).await;
        }
    }

    async fn flush_level(
        log_files: &HashMap<LogLevel, Arc<RollingFileAppender>>,
        level: LogLevel,
        buffer: &mut Vec<String>,
    ) {
        if buffer.is_empty() {
            return;
        }
        let content = buffer.join("\n") + "\n";
        buffer.clear();
        let Some(appender) = log_files.get(&level).cloned() else {
            return;
        };
        let written = task::spawn_blocking(move || {
            let mut writer = MakeWriter::make_writer(appender.as_ref());
            writer.write_all(content.as_bytes())
        })
        .await;
        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => eprintln!("Failed to write runtime logs: {}", e),
            Err(e) => eprintln!("Runtime log writer task failed: {}", e),
        }
    }

    async fn cleanup_old_logs(log_dir: &str, retention_hours: u64) {
        use std::time::{Duration as StdDuration, SystemTime};
        let retention = StdDuration::from_secs(retention_hours * 3600);
        let now = SystemTime::now();
        let mut dir = match tokio::fs::read_dir(log_dir).await {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!("Failed to read log directory {}: {}", log_dir, e);
                return;
            }
        };
        while let Ok(Some(entry)) = dir.next_entry().await {
            let path = entry.path();
            let Ok(modified) = entry.metadata().await.and_then(|m| m.modified()) else {
                continue;
            };
            if now.duration_since(modified).unwrap_or_default() > retention {
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    eprintln!("Failed to delete old log file {:?}: {}", path, e);
                }
            }
        }
    }
}

/// 东八区时间戳
fn local_timestamp() -> String {
    match FixedOffset::east_opt(8 * 3600) {
        Some(tz) => Utc::now().with_timezone(&tz).to_rfc3339(),
        None => Utc::now().to_rfc3339(),
    }
}
