pub mod protocol;
pub mod types;

use anyhow::Result;
use protocol::PoseStreamParser;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpStream;
use tokio::sync::watch;

pub use types::{CameraIntrinsics, Pose};

/// Client for the motion-tracking bridge.
///
/// Connects over TCP, parses the pose stream, and publishes the most
/// recent pose for the render thread to pick up.
pub struct TrackingClient {
    pose_rx: watch::Receiver<Pose>,
    intrinsics: CameraIntrinsics,
    _task: tokio::task::JoinHandle<()>,
}

impl TrackingClient {
    /// Connect to the tracking bridge and start reading poses.
    pub async fn connect(addr: &str, intrinsics: CameraIntrinsics) -> Result<Self> {
        tracing::info!(%addr, "Connecting to tracking service");

        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        tracing::info!("Connected to tracking service");

        Ok(Self::spawn(stream, intrinsics))
    }

    /// Create a client that always reports the identity pose, for running
    /// without a tracking device.
    pub fn mock(intrinsics: CameraIntrinsics) -> Self {
        let (pose_tx, pose_rx) = watch::channel(Pose::default());
        let task = tokio::spawn(async move {
            // Keep the sender alive.
            let _tx = pose_tx;
            tokio::signal::ctrl_c().await.ok();
        });
        Self {
            pose_rx,
            intrinsics,
            _task: task,
        }
    }

    fn spawn<R>(reader: R, intrinsics: CameraIntrinsics) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (pose_tx, pose_rx) = watch::channel(Pose::default());
        let task = tokio::spawn(pose_read_loop(reader, pose_tx));
        Self {
            pose_rx,
            intrinsics,
            _task: task,
        }
    }

    /// Latest received pose (non-blocking).
    pub fn latest_pose(&self) -> Pose {
        *self.pose_rx.borrow()
    }

    /// Whether a pose newer than the last `latest_pose` call has arrived.
    pub fn has_new_pose(&self) -> bool {
        self.pose_rx.has_changed().unwrap_or(false)
    }

    /// Mark the current pose as consumed and return it.
    pub fn take_pose(&mut self) -> Pose {
        *self.pose_rx.borrow_and_update()
    }

    /// Intrinsics of the colour camera the poses refer to.
    pub fn intrinsics(&self) -> CameraIntrinsics {
        self.intrinsics
    }
}

/// Background task: read the stream, parse frames, publish poses.
async fn pose_read_loop<R>(mut reader: R, pose_tx: watch::Sender<Pose>)
where
    R: AsyncRead + Unpin,
{
    let mut parser = PoseStreamParser::new();
    let mut buf = [0u8; 4096];
    let mut pose_count: u64 = 0;

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                tracing::warn!(pose_count, "Tracking connection closed");
                break;
            }
            Ok(n) => {
                parser.push_data(&buf[..n]);

                // Only the newest pose matters to the renderer.
                while let Some(result) = parser.next_pose() {
                    match result {
                        Ok(pose) => {
                            pose_tx.send_replace(pose);
                            pose_count += 1;
                            if pose_count % 1000 == 0 {
                                tracing::debug!(pose_count, "Poses received");
                            }
                        }
                        Err(e) => {
                            tracing::trace!(?e, "Skipping bytes in pose stream");
                        }
                    }
                }
            }
            Err(e) => {
                tracing::error!(?e, "Tracking read error");
                break;
            }
        }
    }
}
