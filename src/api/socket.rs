use futures_util::{SinkExt, StreamExt};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::{COOKIE, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::api::events::ChatEvent;
use crate::api::models::OutgoingChat;
use crate::chat::SessionEvent;
use crate::error::Result;

/// Both ends of one chat connection, as seen from the UI.
pub struct SocketChannels {
    pub events: UnboundedReceiver<SessionEvent>,
    /// Dropping this closes the connection.
    pub outbound: UnboundedSender<OutgoingChat>,
}

pub fn handshake_request(url: &Url, cookie: Option<&str>) -> Result<Request> {
    let mut request = url.as_str().into_client_request()?;
    if let Some(cookie) = cookie {
        request.headers_mut().insert(COOKIE, HeaderValue::from_str(cookie)?);
    }
    Ok(request)
}

/// Opens the connection on `runtime`. Connection failures arrive as `SessionEvent::Closed`.
pub fn spawn(runtime: &Handle, url: &Url, cookie: Option<&str>) -> Result<SocketChannels> {
    let request = handshake_request(url, cookie)?;
    let (events_tx, events) = mpsc::unbounded_channel();
    let (outbound, outbound_rx) = mpsc::unbounded_channel();
    runtime.spawn(drive(request, events_tx, outbound_rx));
    Ok(SocketChannels { events, outbound })
}

async fn drive(
    request: Request,
    events: UnboundedSender<SessionEvent>,
    mut outbound: UnboundedReceiver<OutgoingChat>,
) {
    let uri = request.uri().to_string();
    let ws = match connect_async(request).await {
        Ok((ws, _)) => ws,
        Err(e) => {
            log::warn!("websocket connect to {uri} failed: {e}");
            let _ = events.send(SessionEvent::Closed(Some(e.to_string())));
            return;
        }
    };
    log::info!("websocket connected to {uri}");
    let _ = events.send(SessionEvent::Opened);

    let (mut sink, mut stream) = ws.split();
    let reason = loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => match ChatEvent::parse(&text) {
                    Ok(event) => {
                        if events.send(SessionEvent::Envelope(event)).is_err() {
                            let _ = sink.close().await;
                            break None;
                        }
                    }
                    Err(e) => log::warn!("undecodable chat frame: {e}"),
                },
                Some(Ok(Message::Close(frame))) => {
                    // Reading on flushes the queued reply Close; the stream ends once it is sent.
                    while let Some(Ok(_)) = stream.next().await {}
                    break frame.map(|f| f.reason.to_string()).filter(|r| !r.is_empty());
                }
                Some(Ok(other)) => log::debug!("ignoring non-text frame: {other:?}"),
                Some(Err(e)) => break Some(e.to_string()),
                None => break None,
            },
            message = outbound.recv() => match message {
                Some(message) => {
                    let text = match serde_json::to_string(&message) {
                        Ok(text) => text,
                        Err(e) => {
                            log::warn!("could not encode chat frame: {e}");
                            continue;
                        }
                    };
                    log::debug!("-> {text}");
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        break Some(e.to_string());
                    }
                }
                None => {
                    let _ = sink.close().await;
                    break None;
                }
            },
        }
    };

    log::info!("websocket to {uri} closed");
    let _ = events.send(SessionEvent::Closed(reason));
}
