//! Unix domain socket server for IPC

use crate::runtime::TimerHandle;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tomato_ipc::{encode_line, Command, Response};
use tracing::{debug, error, info};

/// Bind the control socket, replacing a stale one left by a previous run.
pub fn bind(path: &Path) -> Result<UnixListener> {
    let _ = std::fs::remove_file(path);
    let listener = UnixListener::bind(path)
        .with_context(|| format!("Failed to bind IPC socket at {:?}", path))?;
    info!("IPC server listening on {:?}", path);
    Ok(listener)
}

pub async fn serve(listener: UnixListener, timer: TimerHandle) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let timer = timer.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_client(stream, timer).await {
                        error!("Error handling client: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {}", e);
            }
        }
    }
}

async fn handle_client(stream: UnixStream, timer: TimerHandle) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    reader.read_line(&mut line).await?;
    let response = match serde_json::from_str::<Command>(line.trim_end()) {
        Ok(command) => {
            debug!("IPC command: {:?}", command);
            timer.send(command).await
        }
        Err(e) => Response::Error(format!("invalid command: {}", e)),
    };

    writer.write_all(&encode_line(&response)?).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Durations;
    use crate::runtime;
    use crate::testing::{MemoryStore, RecordingNotifier};
    use tempfile::TempDir;
    use tomato_ipc::{request, Mode};

    fn start_server(dir: &TempDir) -> (String, TimerHandle) {
        let timer = runtime::spawn(
            Durations::default(),
            false,
            Box::new(RecordingNotifier::default()),
            Box::new(MemoryStore::default()),
        );
        let path = dir.path().join("tomato.sock");
        let listener = bind(&path).unwrap();
        tokio::spawn(serve(listener, timer.clone()));
        (path.to_str().unwrap().to_string(), timer)
    }

    #[tokio::test]
    async fn commands_reach_the_timer() {
        let dir = TempDir::new().unwrap();
        let (path, timer) = start_server(&dir);

        assert_eq!(request(&path, &Command::Start).await.unwrap(), Response::Ok);
        assert!(timer.latest().running);

        match request(&path, &Command::Status).await.unwrap() {
            Response::Status(status) => {
                assert_eq!(status.mode, Mode::Work);
                assert!(status.running);
                assert_eq!(status.duration_ms, 25 * 60 * 1000);
            }
            other => panic!("unexpected response {:?}", other),
        }
    }

    #[tokio::test]
    async fn garbage_gets_an_error_response() {
        let dir = TempDir::new().unwrap();
        let (path, _timer) = start_server(&dir);

        let stream = UnixStream::connect(&path).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        writer.write_all(b"\"Explode\"\n").await.unwrap();
        let mut line = String::new();
        BufReader::new(reader).read_line(&mut line).await.unwrap();
        let response: Response = serde_json::from_str(line.trim_end()).unwrap();
        assert!(matches!(response, Response::Error(_)));
    }
}
