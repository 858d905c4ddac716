//! Terminal loop: stdin lines and connection events in, screen out.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::connection::{ConnectionEvent, GameConnection, GameSender};
use crate::error::ClientResult;
use crate::frontend::{Effect, FrontEnd, ScreenUpdate};

/// ANSI clear screen and home cursor.
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Drive `frontend` until input ends or the connection is lost.
///
/// The connection is run on its own task; its events arrive on `events`.
pub async fn run_terminal<F, R, W>(
    frontend: &mut F,
    connection: Arc<GameConnection>,
    mut events: mpsc::Receiver<ConnectionEvent>,
    input: R,
    mut output: W,
) -> ClientResult<()>
where
    F: FrontEnd,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let sender = connection.sender();
    let conn = connection.clone();
    let connection_task = tokio::spawn(async move { conn.run().await });

    draw(frontend, &mut output).await?;

    let mut lines = input.lines();
    let mut input_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                match line? {
                    Some(line) => {
                        let effects = frontend.on_input(&line);
                        apply_effects(&sender, effects).await;
                    }
                    None => {
                        info!("Input closed, leaving the market");
                        input_open = false;
                        connection.shutdown();
                        break;
                    }
                }
            }

            event = events.recv() => {
                match event {
                    Some(ConnectionEvent::Connected) => {
                        let effects = frontend.on_connected();
                        apply_effects(&sender, effects).await;
                    }
                    Some(ConnectionEvent::Server(event)) => {
                        let effects = frontend.on_event(event);
                        apply_effects(&sender, effects).await;
                    }
                    Some(ConnectionEvent::Lost { reason }) => {
                        frontend.on_disconnected(&reason);
                        draw(frontend, &mut output).await?;
                        break;
                    }
                    None => break,
                }
            }
        }

        draw(frontend, &mut output).await?;
    }

    if let Err(e) = connection_task.await {
        warn!(error = %e, "Connection task panicked");
    }
    Ok(())
}

/// Perform front-end effects. Send failures are logged; the loss itself is
/// reported through the connection events.
pub async fn apply_effects(sender: &GameSender, effects: Vec<Effect>) {
    for effect in effects {
        match effect {
            Effect::Send(event) => {
                if let Err(e) = sender.send(event).await {
                    warn!(error = %e, "Failed to queue event");
                }
            }
            Effect::SendAfter { event, delay } => {
                debug!(event = event.name(), delay_ms = delay.as_millis() as u64, "Scheduling event");
                sender.send_after(event, delay);
            }
        }
    }
}

async fn draw<F, W>(frontend: &mut F, output: &mut W) -> ClientResult<()>
where
    F: FrontEnd,
    W: AsyncWrite + Unpin,
{
    match frontend.take_screen() {
        ScreenUpdate::Redraw(content) => {
            output.write_all(CLEAR_SCREEN.as_bytes()).await?;
            output.write_all(content.as_bytes()).await?;
        }
        ScreenUpdate::Append(lines) => {
            for line in lines {
                output.write_all(line.as_bytes()).await?;
                output.write_all(b"\n").await?;
            }
        }
        ScreenUpdate::Unchanged => return Ok(()),
    }
    output.flush().await?;
    Ok(())
}
