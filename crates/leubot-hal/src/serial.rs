//! [`ArmLinkTransport`] – ArmLink frames over an async byte sink.
//!
//! The controller sits behind a USB serial adapter.  [`ArmLinkTransport::open`]
//! writes to the tty device as a plain file and does not touch the line
//! settings: the host must already run it at [`LINE_SETTINGS`] (for example
//! `stty -F /dev/ttyUSB0 38400 cs8 -cstopb -parenb raw`).  The assumption is
//! logged every time a device is opened.  With no device,
//! [`ArmLinkTransport::dry_run`] encodes and logs every frame but writes it
//! nowhere.

use std::path::Path;

use async_trait::async_trait;
use leubot_types::Pose;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWrite, AsyncWriteExt, Sink};
use tracing::{debug, info};

use crate::armlink::{ArmLinkPacket, Extended};
use crate::transport::{ArmTransport, TransportError};

/// Line settings the ArmLink firmware expects on the serial link.
pub const LINE_SETTINGS: &str = "38400 8N1";

pub struct ArmLinkTransport<W> {
    writer: W,
    label: String,
}

impl<W: AsyncWrite + Unpin + Send> ArmLinkTransport<W> {
    pub fn new(writer: W, label: impl Into<String>) -> Self {
        Self {
            writer,
            label: label.into(),
        }
    }

    async fn write_packet(&mut self, packet: ArmLinkPacket) -> Result<(), TransportError> {
        debug!(device = %self.label, frame = %packet, "ArmLink frame");
        self.writer.write_all(&packet.to_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

impl ArmLinkTransport<tokio::fs::File> {
    /// Open the tty at `path` for writing.
    ///
    /// The line settings are left as the host configured them.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let path = path.as_ref();
        let file = OpenOptions::new().write(true).open(path).await?;
        info!(
            device = %path.display(),
            line = LINE_SETTINGS,
            "ArmLink device opened; line settings are not configured here and must already match"
        );
        Ok(Self::new(file, path.display().to_string()))
    }
}

impl ArmLinkTransport<Sink> {
    /// A transport that only logs the frames it would have sent.
    pub fn dry_run() -> Self {
        info!("no ArmLink device configured; frames are logged only");
        Self::new(tokio::io::sink(), "dry-run")
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> ArmTransport for ArmLinkTransport<W> {
    async fn send_pose(&mut self, pose: &Pose, delta: u8) -> Result<(), TransportError> {
        self.write_packet(ArmLinkPacket::pose(pose, delta)).await
    }

    async fn send_reset(&mut self) -> Result<(), TransportError> {
        self.write_packet(ArmLinkPacket::instruction(Extended::Reset))
            .await
    }

    async fn send_sleep(&mut self) -> Result<(), TransportError> {
        self.write_packet(ArmLinkPacket::instruction(Extended::Sleep))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Log sink shared with a test subscriber.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[tokio::test]
    async fn writes_one_frame_per_command() {
        let mut bytes = Vec::<u8>::new();
        let mut t = ArmLinkTransport::new(&mut bytes, "buffer");
        t.send_reset().await.unwrap();
        t.send_pose(&Pose::HOME, 128).await.unwrap();
        t.send_sleep().await.unwrap();
        drop(t);

        assert_eq!(bytes.len(), 3 * 17);
        assert_eq!(bytes[15], 0x40);
        assert_eq!(
            &bytes[17..34],
            &ArmLinkPacket::pose(&Pose::HOME, 128).to_bytes()
        );
        assert_eq!(bytes[34 + 15], 0x60);
    }

    #[tokio::test]
    async fn dry_run_accepts_everything() {
        let mut t = ArmLinkTransport::dry_run();
        assert!(t.send_pose(&Pose::HOME, 0).await.is_ok());
        assert!(t.send_sleep().await.is_ok());
    }

    #[tokio::test]
    async fn open_writes_to_device_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ttyFAKE");
        std::fs::write(&path, b"").unwrap();

        let mut t = ArmLinkTransport::open(&path).await.unwrap();
        t.send_sleep().await.unwrap();
        drop(t);

        let written = std::fs::read(&path).unwrap();
        assert_eq!(written.len(), 17);
    }

    #[tokio::test]
    async fn open_logs_the_expected_line_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ttyFAKE");
        std::fs::write(&path, b"").unwrap();

        let logs = Captured::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        ArmLinkTransport::open(&path).await.unwrap();

        let text = logs.text();
        assert!(text.contains("ArmLink device opened"), "{text}");
        assert!(text.contains("38400 8N1"), "{text}");
    }

    #[tokio::test]
    async fn open_missing_device_is_io_error() {
        let result = ArmLinkTransport::open("/nonexistent/leubot/ttyUSB9").await;
        assert!(matches!(result, Err(TransportError::Io(_))));
    }
}
