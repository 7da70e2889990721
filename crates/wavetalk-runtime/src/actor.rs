//! Single-owner engine task.
//!
//! One tokio task owns the [`ChatEngine`]. Callers hold an [`EngineHandle`]
//! and send closures over an `mpsc` channel; each closure runs against the
//! engine and its result comes back on a `oneshot`. Between commands the task
//! sleeps until the engine's next deadline and ticks it. Commands and ticks
//! are therefore serialized in arrival order.
//!
//! After every command and every tick the engine's events are published on a
//! `broadcast` channel. Slow subscribers lag and miss events; they can always
//! re-read state through the handle.

use std::future;

use thiserror::Error;
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
};
use wavetalk_core::{ChatEngine, EngineEvent, Environment, SessionStorage};

/// Capacity of the command queue.
const COMMAND_CAPACITY: usize = 64;

/// Capacity of the event broadcast buffer.
const EVENT_CAPACITY: usize = 256;

/// Runtime errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The engine task stopped before the command completed.
    #[error("engine task is gone")]
    EngineGone,
}

type Command<E, S> = Box<dyn FnOnce(&mut ChatEngine<E, S>) + Send>;

/// Cloneable handle to a running engine task.
///
/// The task stops once every handle is dropped, returning the engine from its
/// `JoinHandle`.
pub struct EngineHandle<E: Environment, S: SessionStorage> {
    commands: mpsc::Sender<Command<E, S>>,
    events: broadcast::Sender<EngineEvent>,
}

impl<E: Environment, S: SessionStorage> Clone for EngineHandle<E, S> {
    fn clone(&self) -> Self {
        Self { commands: self.commands.clone(), events: self.events.clone() }
    }
}

impl<E: Environment, S: SessionStorage> EngineHandle<E, S> {
    /// Run `f` against the engine and return its result.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::EngineGone` if the task has stopped.
    pub async fn call<R, F>(&self, f: F) -> Result<R, RuntimeError>
    where
        F: FnOnce(&mut ChatEngine<E, S>) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply, result) = oneshot::channel();
        let command: Command<E, S> = Box::new(move |engine| {
            // Caller may have given up waiting.
            let _ = reply.send(f(engine));
        });

        self.commands.send(command).await.map_err(|_| RuntimeError::EngineGone)?;
        result.await.map_err(|_| RuntimeError::EngineGone)
    }

    /// Subscribe to engine events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }
}

/// Spawn a task that owns `engine`.
///
/// Must be called from within a tokio runtime.
pub fn spawn<E, S>(engine: ChatEngine<E, S>) -> (EngineHandle<E, S>, JoinHandle<ChatEngine<E, S>>)
where
    E: Environment,
    S: SessionStorage,
{
    let (commands, inbox) = mpsc::channel(COMMAND_CAPACITY);
    let (events, _) = broadcast::channel(EVENT_CAPACITY);

    let task = tokio::spawn(run(engine, inbox, events.clone()));
    (EngineHandle { commands, events }, task)
}

async fn run<E, S>(
    mut engine: ChatEngine<E, S>,
    mut inbox: mpsc::Receiver<Command<E, S>>,
    events: broadcast::Sender<EngineEvent>,
) -> ChatEngine<E, S>
where
    E: Environment,
    S: SessionStorage,
{
    tracing::debug!("Engine task started");
    let env = engine.env().clone();

    loop {
        publish(&mut engine, &events);

        // Recomputed every iteration: a command may have re-armed or disarmed
        // the simulator.
        let wait = engine.next_deadline().map(|deadline| deadline - env.now());
        let timer = async {
            match wait {
                Some(duration) => env.sleep(duration).await,
                None => future::pending().await,
            }
        };

        tokio::select! {
            command = inbox.recv() => match command {
                Some(command) => command(&mut engine),
                None => break,
            },
            () = timer => engine.tick(),
        }
    }

    publish(&mut engine, &events);
    tracing::debug!("Engine task stopped");
    engine
}

fn publish<E, S>(engine: &mut ChatEngine<E, S>, events: &broadcast::Sender<EngineEvent>)
where
    E: Environment,
    S: SessionStorage,
{
    for event in engine.take_events() {
        // No subscribers is fine.
        let _ = events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wavetalk_core::{
        ChatId, Credentials, Dataset, EngineConfig, EngineError, MemoryStorage, PresenceConfig, UserId,
    };

    use super::*;
    use crate::SystemEnv;

    fn demo_engine(config: EngineConfig) -> ChatEngine<SystemEnv, MemoryStorage> {
        ChatEngine::new(SystemEnv::new(), MemoryStorage::new(), config, Dataset::demo())
    }

    #[tokio::test]
    async fn call_returns_result() {
        let (handle, _task) = spawn(demo_engine(EngineConfig::default()));

        let count = handle.call(|engine| engine.chats().len()).await.unwrap();

        assert_eq!(count, 4);
    }

    #[tokio::test]
    async fn mutations_flow_through_handle() {
        let (handle, _task) = spawn(demo_engine(EngineConfig::default()));

        let denied = handle.call(|engine| engine.send(&ChatId::from("chat2"), &UserId::from("6"), "hi")).await.unwrap();
        assert_eq!(denied.unwrap_err(), EngineError::Unauthenticated);

        handle.call(|engine| engine.login(&Credentials::default())).await.unwrap().unwrap();
        let sent = handle.call(|engine| engine.send(&ChatId::from("chat2"), &UserId::from("6"), "hi")).await.unwrap();

        assert_eq!(sent.unwrap().body, "hi");
    }

    #[tokio::test]
    async fn events_are_broadcast() {
        let (handle, _task) = spawn(demo_engine(EngineConfig::default()));
        let mut events = handle.subscribe();

        handle.call(|engine| engine.login(&Credentials::default())).await.unwrap().unwrap();

        assert_eq!(events.recv().await.unwrap(), EngineEvent::SessionChanged { authenticated: true });
    }

    #[tokio::test(start_paused = true)]
    async fn timers_fire_without_commands() {
        let config = EngineConfig { presence: PresenceConfig::always_fire(), ..EngineConfig::default() };
        let (handle, _task) = spawn(demo_engine(config));
        let mut events = handle.subscribe();
        handle.call(|engine| engine.login(&Credentials::default())).await.unwrap().unwrap();

        // Typing tick at 8s.
        tokio::time::sleep(Duration::from_secs(9)).await;

        let typing = handle.call(|engine| engine.users().any(|user| user.is_typing)).await.unwrap();
        assert!(typing);

        let mut saw_typing = false;
        while let Ok(event) = events.try_recv() {
            saw_typing |= matches!(event, EngineEvent::TypingChanged { typing: true, .. });
        }
        assert!(saw_typing);
    }

    #[tokio::test(start_paused = true)]
    async fn logout_stops_timers() {
        let config = EngineConfig { presence: PresenceConfig::always_fire(), ..EngineConfig::default() };
        let (handle, _task) = spawn(demo_engine(config));
        handle.call(|engine| engine.login(&Credentials::default())).await.unwrap().unwrap();
        handle.call(|engine| engine.logout()).await.unwrap();

        tokio::time::sleep(Duration::from_secs(120)).await;

        let unread = handle.call(|engine| engine.chats().iter().map(|chat| chat.unread_count).sum::<u32>()).await.unwrap();
        // Login read chat1; chat3 keeps its seeded unread message.
        assert_eq!(unread, 1);
        assert!(handle.call(|engine| engine.next_deadline().is_none()).await.unwrap());
    }

    #[tokio::test]
    async fn task_returns_engine_when_handles_drop() {
        let (handle, task) = spawn(demo_engine(EngineConfig::default()));
        handle.call(|engine| engine.login(&Credentials::default())).await.unwrap().unwrap();

        drop(handle);
        let engine = task.await.unwrap();

        assert!(engine.session().is_authenticated());
    }

    #[tokio::test]
    async fn call_after_stop_is_engine_gone() {
        let (handle, task) = spawn(demo_engine(EngineConfig::default()));
        task.abort();
        let _ = task.await;

        let result = handle.call(|engine| engine.chats().len()).await;

        assert!(matches!(result, Err(RuntimeError::EngineGone)));
    }
}
