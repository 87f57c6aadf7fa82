//! Text message transport used by sessions.
//!
//! A session only needs an ordered stream of text frames in and a way to
//! push text frames out. The server plugs in WebSocket halves; tests plug in
//! plain `mpsc` channels.

use crate::error::TransportError;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::debug;
use std::future::Future;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::WebSocketStream;

/// Receiving half of a connection.
pub trait Inbound: Send + 'static {
    /// Next text frame. `None` once the peer has closed the connection.
    fn recv(&mut self) -> impl Future<Output = Option<Result<String, TransportError>>> + Send;
}

/// Sending half of a connection.
pub trait Outbound: Send + 'static {
    fn send(&mut self, text: String) -> impl Future<Output = Result<(), TransportError>> + Send;

    fn close(&mut self) -> impl Future<Output = ()> + Send {
        async {}
    }
}

impl Inbound for mpsc::Receiver<String> {
    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        mpsc::Receiver::recv(self).await.map(Ok)
    }
}

impl Outbound for mpsc::Sender<String> {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        mpsc::Sender::send(self, text)
            .await
            .map_err(|_| TransportError::Closed)
    }
}

pub struct WsInbound<S> {
    stream: SplitStream<WebSocketStream<S>>,
}

pub struct WsOutbound<S> {
    sink: SplitSink<WebSocketStream<S>, Message>,
}

/// Splits an upgraded WebSocket into session transport halves.
pub fn split_websocket<S>(socket: WebSocketStream<S>) -> (WsInbound<S>, WsOutbound<S>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (sink, stream) = socket.split();
    (WsInbound { stream }, WsOutbound { sink })
}

impl<S> Inbound for WsInbound<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(_)) => return None,
                Ok(other) => debug!("Skipping non-text frame ({} bytes)", other.len()),
                Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => return None,
                Err(e) => return Some(Err(TransportError::Io(e.to_string()))),
            }
        }
        None
    }
}

impl<S> Outbound for WsOutbound<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.sink.send(Message::Text(text)).await.map_err(|e| match e {
            WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::Closed,
            e => TransportError::Io(e.to_string()),
        })
    }

    async fn close(&mut self) {
        if let Err(e) = self.sink.close().await {
            debug!("Error while closing websocket: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::{accept_async, connect_async};

    #[tokio::test]
    async fn test_channel_transport() {
        let (mut outbound, mut inbound) = mpsc::channel::<String>(4);

        Outbound::send(&mut outbound, "TURN:UP".to_string())
            .await
            .unwrap();
        assert_eq!(
            Inbound::recv(&mut inbound).await,
            Some(Ok("TURN:UP".to_string()))
        );

        drop(outbound);
        assert_eq!(Inbound::recv(&mut inbound).await, None);
    }

    #[tokio::test]
    async fn test_channel_send_after_close() {
        let (mut outbound, inbound) = mpsc::channel::<String>(4);
        drop(inbound);
        assert_eq!(
            Outbound::send(&mut outbound, "CONNECTED".to_string()).await,
            Err(TransportError::Closed)
        );
    }

    #[tokio::test]
    async fn test_websocket_transport() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let socket = accept_async(stream).await.unwrap();
            let (mut inbound, mut outbound) = split_websocket(socket);

            let first = inbound.recv().await;
            outbound.send("CONNECTED".to_string()).await.unwrap();
            let after_close = inbound.recv().await;
            (first, after_close)
        });

        let (client, _) = connect_async(url).await.unwrap();
        let (mut client_in, mut client_out) = split_websocket(client);

        // Binary frames are skipped by the server side
        client_out
            .sink
            .send(Message::Binary(vec![1, 2, 3]))
            .await
            .unwrap();
        client_out.send("REQUEST_STATE".to_string()).await.unwrap();
        assert_eq!(client_in.recv().await, Some(Ok("CONNECTED".to_string())));
        client_out.close().await;

        let (first, after_close) = server.await.unwrap();
        assert_eq!(first, Some(Ok("REQUEST_STATE".to_string())));
        assert_eq!(after_close, None);
    }
}
