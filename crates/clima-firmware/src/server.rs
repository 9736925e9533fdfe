//! The logger main loop
//!
//! One task owns the history. It waits for either an HTTP connection or a
//! due sample and handles whichever comes first to completion before waiting
//! again, so requests always see whole samples.

use clima_core::assets::WEB_UI;
use clima_core::clock::ClockSource;
use clima_core::history::History;
use clima_core::http::{self, Request};
use clima_core::sampler::{SampleTrigger, Sampler};
use clima_core::sensors::ClimateSensor;
use embassy_futures::select::{Either, select};
use embassy_net::Stack;
use embassy_net::tcp::{Error as TcpError, State, TcpSocket};
use embassy_time::{Duration, with_timeout};
use log::{info, warn};

const MAX_REQUEST_SIZE: usize = 1024;

/// Idle time after which a connection is dropped
const SOCKET_TIMEOUT: Duration = Duration::from_secs(5);

/// Serve the API on `port` and run a sample cycle whenever `trigger` fires.
pub async fn run<S, C, const N: usize>(
    stack: Stack<'static>,
    port: u16,
    trigger: &SampleTrigger,
    mut sampler: Sampler<S, C>,
    history: &mut History<N>,
) -> !
where
    S: ClimateSensor,
    C: ClockSource,
{
    let mut rx_buffer = [0u8; MAX_REQUEST_SIZE];
    let mut tx_buffer = [0u8; 2048];
    let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
    socket.set_timeout(Some(SOCKET_TIMEOUT));

    info!("Serving on port {}", port);

    loop {
        // The listener stays up through sample cycles. Re-listening on the
        // same port is a no-op, and a connection that completed its handshake
        // meanwhile is served rather than reset.
        match socket.state() {
            State::Closed | State::Listen => {}
            State::Established => {
                finish_connection(&mut socket, history).await;
                continue;
            }
            state => {
                warn!("Dropping half-open connection in state {:?}", state);
                socket.abort();
            }
        }

        match select(socket.accept(port), trigger.wait()).await {
            Either::First(Ok(())) => finish_connection(&mut socket, history).await,
            Either::First(Err(e)) => {
                warn!("HTTP accept error: {:?}", e);
                socket.abort();
            }
            Either::Second(()) => {
                // Failures are logged by the sampler; the next period retries.
                let _ = sampler.run_cycle(history).await;
            }
        }
    }
}

/// Serve an accepted connection, then close it and return the socket to
/// the closed state.
async fn finish_connection<const N: usize>(socket: &mut TcpSocket<'_>, history: &History<N>) {
    if let Err(e) = serve(socket, history).await {
        warn!("HTTP connection error: {:?}", e);
    }
    socket.close();
    let _ = with_timeout(SOCKET_TIMEOUT, socket.flush()).await;
    socket.abort();
}

/// Answer one request on an accepted connection.
async fn serve<const N: usize>(
    socket: &mut TcpSocket<'_>,
    history: &History<N>,
) -> Result<(), TcpError> {
    let mut buf = [0u8; MAX_REQUEST_SIZE];
    let total = read_request(socket, &mut buf).await?;
    if total == 0 {
        return Ok(());
    }

    let response = match Request::parse(&buf[..total]) {
        Ok(request) => http::handle(&request, history, &WEB_UI),
        Err(e) => http::bad_request(e),
    };

    write_all(socket, response.head().as_bytes()).await?;
    write_all(socket, response.body()).await
}

/// Read until the end of the headers, the buffer is full or the peer closes.
async fn read_request(socket: &mut TcpSocket<'_>, buf: &mut [u8]) -> Result<usize, TcpError> {
    let mut total = 0;
    while total < buf.len() {
        let n = socket.read(&mut buf[total..]).await?;
        if n == 0 {
            break;
        }
        total += n;
        if buf[..total].windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    Ok(total)
}

async fn write_all(socket: &mut TcpSocket<'_>, mut data: &[u8]) -> Result<(), TcpError> {
    while !data.is_empty() {
        let n = socket.write(data).await?;
        if n == 0 {
            return Err(TcpError::ConnectionReset);
        }
        data = &data[n..];
    }
    Ok(())
}
