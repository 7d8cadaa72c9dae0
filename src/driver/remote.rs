//! Remote-proxy driver: each capability call becomes one protocol line on a
//! persistent TCP connection to a receiver process on another host. Used
//! when the sampler must run on different hardware than the browser to avoid
//! self-interference.

use std::io::Write;
use std::net::{Shutdown, TcpStream};

use tracing::{debug, info};

use super::{Browser, DriverError, NavStatus};
use crate::protocol::Message;

pub struct RemoteProxy {
    stream: TcpStream,
    peer: String,
}

impl RemoteProxy {
    /// Connect to the receiver. Failure here is fatal: without the
    /// connection there is nothing to drive.
    pub fn connect(addr: &str) -> Result<Self, DriverError> {
        let stream = TcpStream::connect(addr).map_err(|source| DriverError::ReceiverConnect {
            addr: addr.to_string(),
            source,
        })?;
        info!("connected to receiver at {addr}");
        Ok(Self {
            stream,
            peer: addr.to_string(),
        })
    }

    fn send(&mut self, message: &Message) -> Result<(), DriverError> {
        self.stream.write_all(message.encode().as_bytes())?;
        Ok(())
    }
}

impl Browser for RemoteProxy {
    fn navigate(&mut self, url: &str) -> Result<NavStatus, DriverError> {
        // Fire-and-forget: the receiver swallows navigation failures on its
        // side, and the capture window bounds the run either way.
        self.send(&Message::Navigate(url.to_string()))?;
        Ok(NavStatus::Loaded)
    }

    fn set_load_timeout(&mut self, seconds: u64) -> Result<(), DriverError> {
        self.send(&Message::SetTimeout(seconds))
    }

    fn new_tab(&mut self) {
        if let Err(err) = self.send(&Message::NewTab) {
            debug!("new-tab message to {} failed: {err}", self.peer);
        }
    }

    fn restart(&mut self) -> Result<(), DriverError> {
        self.send(&Message::Restart)
    }

    fn quit(&mut self) {
        // Closing the connection is the quit signal; the receiver tears
        // down its browser on the empty read.
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;

    #[test]
    fn capability_calls_become_protocol_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");

        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut buf = String::new();
            stream.read_to_string(&mut buf).expect("read");
            buf
        });

        let mut proxy = RemoteProxy::connect(&addr.to_string()).expect("connect");
        proxy.set_load_timeout(7).expect("set timeout");
        proxy.navigate("http://a.com").expect("navigate");
        proxy.new_tab();
        proxy.restart().expect("restart");
        proxy.quit();

        let wire = server.join().expect("join");
        assert_eq!(
            wire,
            "biggerfish://set-timeout/7\nhttp://a.com\nbiggerfish://new-tab\nbiggerfish://restart\n"
        );
    }

    #[test]
    fn connect_to_dead_receiver_fails_fatally() {
        // Port 9 (discard) is almost certainly closed.
        let result = RemoteProxy::connect("127.0.0.1:9");
        assert!(matches!(
            result,
            Err(DriverError::ReceiverConnect { .. })
        ));
    }
}
