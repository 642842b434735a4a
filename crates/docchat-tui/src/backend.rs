//! Background task owning the chat channel, document polling and uploads.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use docchat_client::{ChatChannel, ChatFrames, ClientError, HttpClient};

use crate::config::Config;
use crate::event::{BackendCommand, UiEvent};

/// Run the backend loop.
///
/// This function runs in a separate thread with its own tokio runtime. It
/// opens the chat channel once, forwards inbound frames to the UI, polls
/// the document listing and executes commands from the UI. A closed
/// channel stays closed until the UI asks for a remount.
pub async fn run_backend(
    config: Config,
    chat_url: String,
    ui_tx: mpsc::Sender<UiEvent>,
    mut cmd_rx: mpsc::Receiver<BackendCommand>,
) {
    let http = HttpClient::new(&config.server);
    let (mut channel, mut frames) = mount(&chat_url, &ui_tx).await.unzip();

    let mut poll = tokio::time::interval(config.poll_interval);
    let mut listing: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            // Periodic document refresh (first tick fires immediately)
            _ = poll.tick() => {
                spawn_refresh(&http, &ui_tx, &mut listing);
            }

            // Inbound chat frames
            frame = next_frame(&mut frames) => {
                match frame {
                    Some(Ok(raw)) => {
                        debug!(bytes = raw.len(), "Chat frame received");
                        let _ = ui_tx.send(UiEvent::FrameReceived(raw)).await;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Chat channel failed");
                        remote_closed(&mut channel, &mut frames, &ui_tx).await;
                    }
                    None => {
                        remote_closed(&mut channel, &mut frames, &ui_tx).await;
                    }
                }
            }

            // Commands from UI thread
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(BackendCommand::SendQuestion(question)) => {
                        let Some(open) = channel.as_mut() else {
                            warn!("Question dropped, no chat channel");
                            continue;
                        };
                        if let Err(e) = open.send_question(&question).await {
                            warn!(error = %e, "Failed to send question");
                        }
                    }
                    Some(BackendCommand::RefreshDocuments) => {
                        debug!("Manual refresh: documents");
                        spawn_refresh(&http, &ui_tx, &mut listing);
                    }
                    Some(BackendCommand::Upload(path)) => {
                        spawn_upload(&http, path, &ui_tx);
                    }
                    Some(BackendCommand::Remount) => {
                        close(&mut channel).await;
                        let _ = ui_tx.send(UiEvent::SessionReset).await;
                        (channel, frames) = mount(&chat_url, &ui_tx).await.unzip();
                    }
                    Some(BackendCommand::Quit) | None => {
                        info!("Received quit command, shutting down backend");
                        if let Some(task) = listing.take() {
                            task.abort();
                        }
                        close(&mut channel).await;
                        break;
                    }
                }
            }
        }
    }

    info!("Backend shutdown complete");
}

/// Open a chat channel, reporting each lifecycle step to the UI.
async fn mount(url: &str, ui_tx: &mpsc::Sender<UiEvent>) -> Option<(ChatChannel, ChatFrames)> {
    let _ = ui_tx.send(UiEvent::ChannelConnecting).await;
    match ChatChannel::connect(url).await {
        Ok(pair) => {
            let _ = ui_tx.send(UiEvent::ChannelOpened).await;
            Some(pair)
        }
        Err(e) => {
            warn!(url = %url, error = %e, "Chat channel handshake failed");
            let _ = ui_tx.send(UiEvent::ChannelClosed).await;
            None
        }
    }
}

/// Wait for the next frame; never resolves without a channel.
async fn next_frame(frames: &mut Option<ChatFrames>) -> Option<Result<String, ClientError>> {
    match frames {
        Some(frames) => frames.next_frame().await,
        None => std::future::pending().await,
    }
}

async fn remote_closed(
    channel: &mut Option<ChatChannel>,
    frames: &mut Option<ChatFrames>,
    ui_tx: &mpsc::Sender<UiEvent>,
) {
    if let Some(channel) = channel.as_mut() {
        channel.mark_remote_closed();
    }
    *frames = None;
    let _ = ui_tx.send(UiEvent::ChannelClosed).await;
}

async fn close(channel: &mut Option<ChatChannel>) {
    if let Some(open) = channel.as_mut() {
        if let Err(e) = open.close().await {
            warn!(error = %e, "Failed to close chat channel");
        }
    }
}

/// Fetch the listing in its own task so chat frames keep flowing meanwhile.
///
/// At most one fetch runs at a time; a tick that finds one still running is
/// skipped.
fn spawn_refresh(
    http: &HttpClient,
    ui_tx: &mpsc::Sender<UiEvent>,
    listing: &mut Option<JoinHandle<()>>,
) {
    if listing.as_ref().is_some_and(|task| !task.is_finished()) {
        debug!("Document fetch still running, tick skipped");
        return;
    }

    let http = http.clone();
    let ui_tx = ui_tx.clone();
    *listing = Some(tokio::spawn(async move {
        let _ = ui_tx.send(UiEvent::DocumentsFetching).await;
        match http.list_documents().await {
            Ok(documents) => {
                let _ = ui_tx.send(UiEvent::DocumentsUpdated(documents)).await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch documents");
                let _ = ui_tx.send(UiEvent::DocumentsFailed(e.to_string())).await;
            }
        }
    }));
}

/// Upload in its own task so frames keep flowing meanwhile.
fn spawn_upload(http: &HttpClient, path: PathBuf, ui_tx: &mpsc::Sender<UiEvent>) {
    let http = http.clone();
    let ui_tx = ui_tx.clone();

    tokio::spawn(async move {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let _ = ui_tx.send(UiEvent::UploadStarted(filename)).await;

        let progress_tx = ui_tx.clone();
        let result = http
            .upload_document(&path, move |progress| {
                let _ = progress_tx.try_send(UiEvent::UploadProgress(progress.percent()));
            })
            .await
            .map_err(|e| {
                warn!(path = %path.display(), error = %e, "Upload failed");
                e.to_string()
            });

        let _ = ui_tx.send(UiEvent::UploadFinished(result)).await;
    });
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio::time::timeout;
    use tokio_tungstenite::accept_async;
    use tokio_tungstenite::tungstenite::Message;

    use super::*;

    fn config(server: String, poll_interval: Duration) -> Config {
        Config {
            server,
            poll_interval,
            ..Default::default()
        }
    }

    async fn unreachable_chat_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws/chat", listener.local_addr().unwrap());
        drop(listener);
        url
    }

    #[tokio::test]
    async fn test_frames_flow_while_listing_hangs() {
        // Accepts HTTP connections and never answers them.
        let http_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server = format!("http://{}", http_listener.local_addr().unwrap());
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((tcp, _)) = http_listener.accept().await {
                held.push(tcp);
            }
        });

        let ws_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let chat_url = format!("ws://{}/ws/chat", ws_listener.local_addr().unwrap());
        tokio::spawn(async move {
            let (tcp, _) = ws_listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            // Let the first listing request go out before answering.
            tokio::time::sleep(Duration::from_millis(100)).await;
            ws.send(Message::Text(r#"{"answer":"hi"}"#.to_string()))
                .await
                .unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        });

        let (ui_tx, mut ui_rx) = mpsc::channel(64);
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let backend = tokio::spawn(run_backend(
            config(server, Duration::from_secs(60)),
            chat_url,
            ui_tx,
            cmd_rx,
        ));

        let mut saw_fetching = false;
        let frame = timeout(Duration::from_secs(5), async {
            while let Some(event) = ui_rx.recv().await {
                match event {
                    UiEvent::DocumentsFetching => saw_fetching = true,
                    UiEvent::FrameReceived(raw) => return raw,
                    _ => {}
                }
            }
            panic!("backend stopped before forwarding the frame");
        })
        .await
        .expect("frame blocked behind the document listing");

        assert_eq!(frame, r#"{"answer":"hi"}"#);
        assert!(saw_fetching);

        cmd_tx.send(BackendCommand::Quit).await.unwrap();
        timeout(Duration::from_secs(5), backend)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_every_poll_reports_fetching() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/documents")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .expect_at_least(2)
            .create_async()
            .await;

        let (ui_tx, mut ui_rx) = mpsc::channel(64);
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let backend = tokio::spawn(run_backend(
            config(server.url(), Duration::from_millis(50)),
            unreachable_chat_url().await,
            ui_tx,
            cmd_rx,
        ));

        let mut fetching = 0;
        let mut updated = 0;
        timeout(Duration::from_secs(5), async {
            while fetching < 2 || updated < 2 {
                match ui_rx.recv().await {
                    Some(UiEvent::DocumentsFetching) => fetching += 1,
                    Some(UiEvent::DocumentsUpdated(documents)) => {
                        assert!(documents.is_empty());
                        updated += 1;
                    }
                    Some(_) => {}
                    None => break,
                }
            }
        })
        .await
        .unwrap();

        assert!(fetching >= 2);
        assert!(updated >= 2);

        cmd_tx.send(BackendCommand::Quit).await.unwrap();
        timeout(Duration::from_secs(5), backend)
            .await
            .unwrap()
            .unwrap();
    }
}
