//! WebSocket driver: pumps frames between the socket and a `LocalChannel`.
//!
//! DESIGN
//! ======
//! Everything runs on one task. Each turn flushes the channel outbox to the
//! socket, then waits for either the next inbound message or the outstanding
//! intent's deadline. Inbound frames are parsed into typed events and handed
//! to the channel, which runs the coordinator's handlers inline.

use std::time::Instant;

use futures_util::{SinkExt, StreamExt};
use sketchsync::{Inbound, LocalChannel, RoomCoordinator};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::CliError;
use crate::terminal::Terminal;

pub type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Frame encoding used on the socket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wire {
    /// Protobuf frames in binary messages.
    Binary,
    /// JSON frames in text messages.
    Text,
}

/// Drive `coordinator` until it navigates away or has nothing left to wait for.
///
/// # Errors
///
/// Returns an error if the socket fails or closes before the session settles.
pub async fn run(
    stream: &mut WsStream,
    channel: &LocalChannel,
    coordinator: &RoomCoordinator,
    terminal: &Terminal,
    wire: Wire,
) -> Result<(), CliError> {
    loop {
        flush_outbox(stream, channel, wire).await?;
        if terminal.navigated() || coordinator.is_settled() {
            return Ok(());
        }

        let deadline = coordinator.deadline();
        tokio::select! {
            message = stream.next() => {
                let Some(message) = message else {
                    return Err(CliError::WsClosed);
                };
                match message.map_err(|error| CliError::Ws(Box::new(error)))? {
                    Message::Binary(bytes) => match frames::decode_frame(&bytes) {
                        Ok(frame) => dispatch(channel, &frame),
                        Err(e) => warn!(error = %e, "driver: undecodable binary frame"),
                    },
                    Message::Text(text) => match frames::decode_frame_json(text.as_str()) {
                        Ok(frame) => dispatch(channel, &frame),
                        Err(e) => warn!(error = %e, "driver: undecodable text frame"),
                    },
                    Message::Close(_) => {
                        channel.close();
                        return Err(CliError::WsClosed);
                    }
                    _ => {}
                }
            }
            () = sleep_until(deadline) => {
                coordinator.check_deadline(Instant::now());
            }
        }
    }
}

async fn flush_outbox(stream: &mut WsStream, channel: &LocalChannel, wire: Wire) -> Result<(), CliError> {
    for message in channel.drain_outbox() {
        let frame = message.to_frame();
        info!(event = %frame.event, id = %frame.id, "driver: send frame");
        let outgoing = match wire {
            Wire::Binary => Message::Binary(frames::encode_frame(&frame).into()),
            Wire::Text => Message::Text(frames::encode_frame_json(&frame).into()),
        };
        stream
            .send(outgoing)
            .await
            .map_err(|error| CliError::Ws(Box::new(error)))?;
    }
    Ok(())
}

fn dispatch(channel: &LocalChannel, frame: &frames::Frame) {
    match Inbound::from_frame(frame) {
        Ok(message) => {
            let handled = channel.deliver(&message);
            debug!(event = %frame.event, handled, "driver: recv frame");
        }
        Err(e) => debug!(error = %e, event = %frame.event, "driver: ignoring frame"),
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}
