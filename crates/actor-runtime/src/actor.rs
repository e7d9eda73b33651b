use std::future::Future;

use actor_protocol::{ActorError, SystemEvent};
use futures::stream::{Stream, StreamExt};
use futures_channel::mpsc;

/// Actor trait for implementing message-driven components
///
/// Actors are independent, stateful components that communicate through
/// message passing. Each actor has its own message queue and processes
/// messages sequentially.
///
/// # Lifecycle
///
/// 1. **init()** - Called once before message processing starts
/// 2. **handle()** - Called for each received message
/// 3. **shutdown()** - Called when the actor is stopping
///
/// The loop ends when every sender is dropped or when [`Actor::should_stop`]
/// turns true after a message.
///
/// # Send Bounds
///
/// Actors run on the multi-threaded tokio runtime, so the futures returned by
/// the lifecycle methods must be `Send`. Implementations can still use plain
/// `async fn`; the compiler checks the bound at the impl.
///
/// # Example
///
/// ```ignore
/// struct MyActor {
///     state: u32,
///     event_tx: mpsc::Sender<SystemEvent>,
/// }
///
/// impl Actor for MyActor {
///     type Message = MyMessage;
///
///     fn name(&self) -> &'static str {
///         "MyActor"
///     }
///
///     async fn handle(&mut self, msg: Self::Message) -> Result<(), ActorError> {
///         // Process message
///         Ok(())
///     }
/// }
/// ```
pub trait Actor: Send + Sized + 'static {
    /// Message type this actor processes
    type Message: Send + 'static;

    /// Actor name (used for logging and debugging)
    fn name(&self) -> &'static str;

    /// Initialize the actor before processing messages
    ///
    /// Called once when the actor starts. An error here stops the actor
    /// before it handles anything.
    fn init(&mut self) -> impl Future<Output = Result<(), ActorError>> + Send {
        async { Ok(()) }
    }

    /// Handle a single message
    fn handle(
        &mut self,
        msg: Self::Message,
    ) -> impl Future<Output = Result<(), ActorError>> + Send;

    /// Clean up before shutdown
    ///
    /// Called when the actor is stopping. Use this to close connections
    /// and release resources.
    fn shutdown(&mut self) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Checked after every message; `true` ends the run loop.
    fn should_stop(&self) -> bool {
        false
    }

    /// Main actor run loop (provided by runtime)
    ///
    /// `rx` is any message stream, bounded or unbounded receiver alike.
    /// Handler errors are reported as [`SystemEvent::Error`] and do not stop
    /// the actor.
    fn run<S>(
        mut self,
        mut rx: S,
        event_tx: mpsc::Sender<SystemEvent>,
    ) -> impl Future<Output = ()> + Send
    where
        S: Stream<Item = Self::Message> + Unpin + Send + 'static,
    {
        async move {
            if let Err(e) = self.init().await {
                crate::actor_error!("{} init failed: {}", self.name(), e);
                let _ = event_tx.clone().try_send(SystemEvent::Error {
                    message: format!("{} init failed: {}", self.name(), e),
                });
                return;
            }

            crate::actor_debug!("{} started", self.name());

            while let Some(msg) = rx.next().await {
                if let Err(e) = self.handle(msg).await {
                    crate::actor_warn!("{} error: {}", self.name(), e);
                    let _ = event_tx.clone().try_send(SystemEvent::Error {
                        message: format!("{} error: {}", self.name(), e),
                    });
                }
                if self.should_stop() {
                    break;
                }
            }

            self.shutdown().await;

            crate::actor_debug!("{} stopped", self.name());
        }
    }
}

/// Spawn an actor on the current tokio runtime.
pub fn spawn_actor<A, S>(
    actor: A,
    rx: S,
    event_tx: mpsc::Sender<SystemEvent>,
) -> tokio::task::JoinHandle<()>
where
    A: Actor,
    S: Stream<Item = A::Message> + Unpin + Send + 'static,
{
    tokio::spawn(actor.run(rx, event_tx))
}
