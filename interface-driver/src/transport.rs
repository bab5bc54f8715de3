//! IPC Transport: one fixed-size request, one fixed-size response, over a `UnixStream`
//! to the device-model process. A connect failure because the model simply isn't there
//! yet is not an error: it is a "soft absence" that lets drivers run, and be observed,
//! before the model attaches.

use std::io::{ErrorKind, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;

use anyhow::{Context, Result};

use crate::protocol::Message;

/// Exchange `request` with the model listening at `socket_path` and return its response.
///
/// Returns `Ok` with a zeroed, `result = 0` response if the socket does not exist or the
/// connection is refused (model not attached yet). Any other failure — a partial send, a
/// short read, or an unexpected disconnect mid-exchange — is fatal to the access and
/// surfaces as `Err`.
pub fn exchange(socket_path: &Path, request: Message) -> Result<Message> {
    let mut stream = match UnixStream::connect(socket_path) {
        Ok(stream) => stream,
        Err(err)
            if err.kind() == ErrorKind::NotFound || err.kind() == ErrorKind::ConnectionRefused =>
        {
            log::debug!("device model not present at {socket_path:?}, returning soft response");
            return Ok(Message::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to connect to {socket_path:?}"))
        }
    };

    stream
        .write_all(&request.to_bytes())
        .context("failed to send request to device model")?;

    let mut buf = [0u8; crate::protocol::MESSAGE_SIZE];
    stream
        .read_exact(&mut buf)
        .context("failed to read response from device model")?;

    Ok(Message::from_bytes(buf))
}

#[cfg(test)]
mod tests {
    use std::io::Read as _;
    use std::os::unix::net::UnixListener;
    use std::thread;

    use super::*;

    fn temp_socket_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!(
            "interface-driver-test-{}-{}-{name}",
            std::process::id(),
            name.len()
        ))
    }

    #[test]
    fn soft_absence_returns_zeroed_success() {
        let path = temp_socket_path("absent");
        let _ = std::fs::remove_file(&path);

        let response = exchange(&path, Message::read_request(0, 0x4000_0000, 4)).unwrap();
        assert_eq!(response, Message::default());
    }

    #[test]
    fn echoes_request_fields_through_a_fake_model() {
        let path = temp_socket_path("echo");
        let _ = std::fs::remove_file(&path);
        let listener = UnixListener::bind(&path).unwrap();

        let handle = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut buf = [0u8; crate::protocol::MESSAGE_SIZE];
            conn.read_exact(&mut buf).unwrap();
            let mut request = Message::from_bytes(buf);
            request.data = 0xDEAD_BEEF;
            request.result = 0;
            conn.write_all(&request.to_bytes()).unwrap();
        });

        let request = Message::read_request(0, 0x4000_0004, 4);
        let response = exchange(&path, request).unwrap();
        handle.join().unwrap();

        assert_eq!(response.data, 0xDEAD_BEEF);
        assert_eq!(response.result, 0);

        let _ = std::fs::remove_file(&path);
    }
}
