use futures::{stream::BoxStream, StreamExt};
use log::{debug, info};
use tokio::{
    io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader, ReadHalf, WriteHalf},
    net::TcpStream,
    sync::Mutex,
};
use tokio_stream::wrappers::LinesStream;

use super::message::Message;
use crate::error::Result;
use crate::tls::{self, BoxedIo};

pub struct Transport {
    read: Mutex<Option<ReadHalf<BoxedIo>>>,
    write: Mutex<WriteHalf<BoxedIo>>,
}

impl Transport {
    pub async fn connect(host: &str, port: u16, secure: bool) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        info!("Connected to {}:{}", host, port);

        let io: BoxedIo = if secure {
            let stream = tls::connector()?.connect(tls::server_name(host)?, stream).await?;
            debug!("TLS established with {}", host);

            Box::new(stream)
        } else {
            Box::new(stream)
        };

        Ok(Self::new(io))
    }

    pub fn new(io: BoxedIo) -> Self {
        let (read, write) = io::split(io);

        Self {
            read: Mutex::new(Some(read)),
            write: Mutex::new(write),
        }
    }

    /// Incoming messages. The read half is handed out once.
    pub async fn stream(&self) -> Option<BoxStream<'static, Result<Message>>> {
        let read = self.read.lock().await.take()?;

        Some(LinesStream::new(BufReader::new(read).lines()).map(parse_line).boxed())
    }

    pub async fn send_message(&self, message: &Message) -> Result<()> {
        debug!("< {}", message);

        let mut write = self.write.lock().await;
        write.write_all(message.raw().as_bytes()).await?;
        write.flush().await?;

        Ok(())
    }
}

fn parse_line(line: io::Result<String>) -> Result<Message> {
    let line = line?;
    debug!("> {}", line);

    Message::from_raw(&line)
}

#[cfg(test)]
mod test {
    use tokio::io::AsyncReadExt;

    use super::*;

    #[tokio::test]
    async fn test_send_and_receive() {
        let (ours, mut theirs) = io::duplex(1024);
        let transport = Transport::new(Box::new(ours));

        transport
            .send_message(&Message::new(None, "NICK", vec!["relay"]))
            .await
            .unwrap();
        let mut buf = [0u8; 12];
        theirs.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"NICK relay\r\n");

        theirs.write_all(b"PING :abc\r\n\r\nPONG x\r\n").await.unwrap();
        drop(theirs);

        let mut stream = transport.stream().await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap().command, "PING");
        assert!(stream.next().await.unwrap().is_err());
        assert_eq!(stream.next().await.unwrap().unwrap().args, vec!["x"]);
        assert!(stream.next().await.is_none());

        assert!(transport.stream().await.is_none());
    }
}
