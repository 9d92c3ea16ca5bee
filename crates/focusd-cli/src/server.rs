//! Socket daemon serving the controller protocol.
//!
//! One JSON request per line, one JSON reply per line. Each connection is
//! handled on its own task; all of them share the single-controller
//! container. Play creates the controller on first use, every other method
//! requires one to exist.

use std::io;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, UnixListener};

use focusd_core::{
    hooks, ContainerError, ControlError, Controller, ControllerConfig, ControllerFactory,
    EventSinks, RuntimeTimer, SingleControllerContainer, StatusReport,
};

use crate::config::Config;
use crate::proto::{Request, Response};

/// Build the container the daemon serves.
///
/// Must be called inside a tokio runtime: each controller's timer arms its
/// waits on the current runtime.
pub fn build_container(config: &Config) -> Result<Arc<SingleControllerContainer>, focusd_core::ConfigError> {
    let cadence = config.cadence()?;
    let durations = config.durations();
    let event_command = config.hooks.event_command.clone();
    let handle = tokio::runtime::Handle::current();

    let factory: ControllerFactory = Box::new(move || {
        let sinks = match &event_command {
            Some(command) => hooks::exec_hook_sinks(command),
            None => EventSinks::default(),
        };
        Controller::new(ControllerConfig {
            cadence,
            durations,
            timer: Arc::new(RuntimeTimer::new(handle.clone())),
            sinks,
        })
    });
    Ok(Arc::new(SingleControllerContainer::new(factory)))
}

/// Bind, serve until SIGINT/SIGTERM, then shut down cleanly.
pub async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let container = build_container(&config)?;

    if let Some(addr) = &config.tcp {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr, "listening");
        tokio::select! {
            _ = shutdown_signal() => {}
            _ = accept_loop_tcp(listener, Arc::clone(&container)) => {}
        }
    } else {
        let listener = UnixListener::bind(&config.socket)?;
        tracing::info!(socket = %config.socket.display(), "listening");
        tokio::select! {
            _ = shutdown_signal() => {}
            _ = accept_loop_unix(listener, Arc::clone(&container)) => {}
        }
    }

    tracing::info!("shutting down");
    shutdown(&container);
    if config.tcp.is_none() {
        remove_socket(&config.socket);
    }
    Ok(())
}

/// Accept unix connections forever, one task per client.
pub async fn accept_loop_unix(listener: UnixListener, container: Arc<SingleControllerContainer>) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => spawn_connection(stream, Arc::clone(&container)),
            Err(err) => {
                tracing::warn!(error = %err, "accept failed");
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            }
        }
    }
}

/// Accept TCP connections forever, one task per client.
pub async fn accept_loop_tcp(listener: TcpListener, container: Arc<SingleControllerContainer>) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => spawn_connection(stream, Arc::clone(&container)),
            Err(err) => {
                tracing::warn!(error = %err, "accept failed");
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            }
        }
    }
}

fn spawn_connection<S>(stream: S, container: Arc<SingleControllerContainer>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(err) = handle_connection(stream, container).await {
            tracing::warn!(error = %err, "client connection failed");
        }
    });
}

async fn handle_connection<S>(
    stream: S,
    container: Arc<SingleControllerContainer>,
) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => dispatch(&container, request),
            Err(err) => Response::Error {
                message: format!("malformed request: {err}"),
            },
        };
        let mut payload = serde_json::to_vec(&response)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        payload.push(b'\n');
        writer.write_all(&payload).await?;
    }
    Ok(())
}

fn dispatch(container: &SingleControllerContainer, request: Request) -> Response {
    let now = Utc::now();
    let result = match request {
        Request::Status => container
            .get()
            .map(|controller| controller.status())
            .map_err(|err| err.to_string()),
        Request::Play => play(container, now),
        Request::Pause => act(container, |controller| controller.pause(now)),
        Request::Skip => act(container, |controller| controller.skip(now)),
        Request::Stop => act(container, |controller| controller.stop(now)),
    };
    match result {
        Ok(status) => Response::Ok { status },
        Err(message) => Response::Error { message },
    }
}

/// Play creates the controller on first use.
fn play(
    container: &SingleControllerContainer,
    now: chrono::DateTime<Utc>,
) -> Result<StatusReport, String> {
    let controller = match container.get() {
        Ok(controller) => controller,
        Err(ContainerError::NoController) => {
            container.create().map_err(|err| err.to_string())?
        }
        Err(err) => return Err(err.to_string()),
    };
    controller.play(now).map_err(|err| err.to_string())?;
    Ok(controller.status())
}

fn act<F>(container: &SingleControllerContainer, action: F) -> Result<StatusReport, String>
where
    F: FnOnce(&Controller) -> Result<(), ControlError>,
{
    let controller = container.get().map_err(|err| err.to_string())?;
    action(&controller).map_err(|err| err.to_string())?;
    Ok(controller.status())
}

/// Stop the controller and drop it from the container so no scheduled
/// callback outlives the daemon.
fn shutdown(container: &SingleControllerContainer) {
    if let Ok(controller) = container.get() {
        match controller.stop(Utc::now()) {
            Ok(()) | Err(ControlError::StoppedTimer) => {}
            Err(err) => tracing::warn!(error = %err, "failed to stop controller"),
        }
        let _ = container.remove();
    }
}

fn remove_socket(path: &Path) {
    if let Err(err) = std::fs::remove_file(path) {
        if err.kind() != io::ErrorKind::NotFound {
            tracing::warn!(socket = %path.display(), error = %err, "failed to remove socket");
        }
    }
}

async fn shutdown_signal() {
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate => {}
    }
}
