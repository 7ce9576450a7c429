use crate::domain::ports::{EmbeddedProcess, MessageChannel, ProcessHandle, ProcessHost};
use crate::domain::protocol::{METHOD_INITIALISE, MethodCall};
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 16;

/// Host end of an in-process bridge channel backed by `tokio::sync::mpsc`.
pub struct InMemoryChannel {
    outbound: mpsc::Sender<MethodCall>,
    inbound: mpsc::Receiver<MethodCall>,
}

/// Embedded end of an in-process bridge channel.
///
/// Plays the part of the embedded payment process in tests and demos.
pub struct EmbeddedEndpoint {
    inbound: mpsc::Receiver<MethodCall>,
    outbound: mpsc::Sender<MethodCall>,
}

/// Creates a connected host/embedded channel pair.
pub fn channel_pair() -> (InMemoryChannel, EmbeddedEndpoint) {
    let (host_tx, embedded_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (embedded_tx, host_rx) = mpsc::channel(CHANNEL_CAPACITY);
    (
        InMemoryChannel {
            outbound: host_tx,
            inbound: host_rx,
        },
        EmbeddedEndpoint {
            inbound: embedded_rx,
            outbound: embedded_tx,
        },
    )
}

#[async_trait]
impl MessageChannel for InMemoryChannel {
    async fn send(&mut self, call: MethodCall) -> Result<()> {
        self.outbound
            .send(call)
            .await
            .map_err(|_| BridgeError::Channel("embedded endpoint dropped".to_string()))
    }

    async fn recv(&mut self) -> Result<Option<MethodCall>> {
        Ok(self.inbound.recv().await)
    }
}

impl EmbeddedEndpoint {
    /// Next call from the host, or `None` once the host end is gone.
    pub async fn next_call(&mut self) -> Option<MethodCall> {
        self.inbound.recv().await
    }

    /// Waits for `initialise` and decodes the JSON text it carries.
    pub async fn expect_initialise(&mut self) -> Result<Value> {
        let call = self.next_call().await.ok_or(BridgeError::ChannelClosed)?;
        if call.method != METHOD_INITIALISE {
            return Err(BridgeError::Channel(format!(
                "expected `{}`, got `{}`",
                METHOD_INITIALISE, call.method
            )));
        }
        match call.arguments {
            Some(Value::String(text)) => Ok(serde_json::from_str(&text)?),
            _ => Err(BridgeError::Channel(
                "initialise carried no JSON text".to_string(),
            )),
        }
    }

    /// Calls a method on the host, e.g. `onPaymentCompleted`.
    pub async fn invoke(&self, method: &str) -> Result<()> {
        self.outbound
            .send(MethodCall::new(method))
            .await
            .map_err(|_| BridgeError::Channel("host channel dropped".to_string()))
    }
}

/// Process host that answers every attempt from a fixed script.
///
/// Each started "process" waits for `initialise`, records the decoded payload and
/// then invokes the scripted methods in order. Afterwards it either stays silent
/// until shut down or hangs up.
#[derive(Clone)]
pub struct ScriptedProcessHost {
    script: Vec<String>,
    hang_up: bool,
    payloads: Arc<Mutex<Vec<Value>>>,
    started: Arc<Mutex<Vec<Arc<InMemoryProcessHandle>>>>,
}

impl ScriptedProcessHost {
    pub fn new<I, S>(script: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: script.into_iter().map(Into::into).collect(),
            hang_up: false,
            payloads: Arc::default(),
            started: Arc::default(),
        }
    }

    /// A host whose processes never answer.
    pub fn silent() -> Self {
        Self::new(Vec::<String>::new())
    }

    /// Closes the channel from the embedded side once the script has run.
    pub fn hang_up_after_script(mut self) -> Self {
        self.hang_up = true;
        self
    }

    /// Payloads received through `initialise`, in arrival order.
    pub async fn received_payloads(&self) -> Vec<Value> {
        self.payloads.lock().await.clone()
    }

    /// Number of processes started that have not been shut down.
    pub async fn running(&self) -> usize {
        self.started
            .lock()
            .await
            .iter()
            .filter(|handle| !handle.is_shut_down())
            .count()
    }
}

#[async_trait]
impl ProcessHost for ScriptedProcessHost {
    async fn start(&self, channel_name: &str) -> Result<EmbeddedProcess> {
        let (host, mut embedded) = channel_pair();
        let script = self.script.clone();
        let hang_up = self.hang_up;
        let payloads = Arc::clone(&self.payloads);

        debug!(channel = channel_name, steps = script.len(), "starting scripted process");
        let task = tokio::spawn(async move {
            let Ok(payload) = embedded.expect_initialise().await else {
                return;
            };
            payloads.lock().await.push(payload);

            for method in &script {
                if embedded.invoke(method).await.is_err() {
                    return;
                }
            }
            if !hang_up {
                std::future::pending::<()>().await;
            }
        });

        let handle = Arc::new(InMemoryProcessHandle::new(task));
        self.started.lock().await.push(Arc::clone(&handle));

        Ok(EmbeddedProcess {
            channel: Box::new(host),
            handle,
        })
    }
}

/// Handle to a scripted in-memory process; shutting down aborts its task.
pub struct InMemoryProcessHandle {
    task: JoinHandle<()>,
    shut_down: AtomicBool,
}

impl InMemoryProcessHandle {
    fn new(task: JoinHandle<()>) -> Self {
        Self {
            task,
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessHandle for InMemoryProcessHandle {
    async fn shutdown(&self) -> Result<()> {
        self.task.abort();
        self.shut_down.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_channel_pair_round_trip() {
        let (mut host, mut embedded) = channel_pair();

        host.send(MethodCall::with_arguments(
            METHOD_INITIALISE,
            json!(r#"{"data":{}}"#),
        ))
        .await
        .unwrap();
        assert_eq!(embedded.expect_initialise().await.unwrap(), json!({ "data": {} }));

        embedded.invoke("onPaymentCancelled").await.unwrap();
        let call = host.recv().await.unwrap().unwrap();
        assert_eq!(call.method, "onPaymentCancelled");
    }

    #[tokio::test]
    async fn test_recv_returns_none_after_hang_up() {
        let (mut host, embedded) = channel_pair();
        drop(embedded);
        assert!(host.recv().await.unwrap().is_none());
        assert!(matches!(
            host.send(MethodCall::new(METHOD_INITIALISE)).await,
            Err(BridgeError::Channel(_))
        ));
    }

    #[tokio::test]
    async fn test_expect_initialise_rejects_other_methods() {
        let (mut host, mut embedded) = channel_pair();
        host.send(MethodCall::new("somethingElse")).await.unwrap();
        assert!(embedded.expect_initialise().await.is_err());
    }

    #[tokio::test]
    async fn test_scripted_host_replays_script() {
        let host = ScriptedProcessHost::new(["onPaymentCompleted"]);
        let mut process = host.start("test/channel").await.unwrap();

        process
            .channel
            .send(MethodCall::with_arguments(
                METHOD_INITIALISE,
                json!(r#"{"data":{"amount":"1.00"}}"#),
            ))
            .await
            .unwrap();

        let call = process.channel.recv().await.unwrap().unwrap();
        assert_eq!(call.method, "onPaymentCompleted");
        assert_eq!(
            host.received_payloads().await,
            vec![json!({ "data": { "amount": "1.00" } })]
        );

        assert_eq!(host.running().await, 1);
        process.handle.shutdown().await.unwrap();
        assert_eq!(host.running().await, 0);
    }
}
